// Entrypoint for the CLI application.
// Transport errors propagate out of `main` and are printed by anyhow as
// `Error: ...` with exit code 1.

use clap::Parser;
use std::process::ExitCode;
use todo_cli::api::ApiClient;
use todo_cli::cli::Cli;
use todo_cli::session::Session;
use todo_cli::{telemetry, ui};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    telemetry::init_tracing(telemetry::default_level(cli.verbose));

    let api = ApiClient::new(&cli.base_url)?;
    let session = Session::from_env();

    let outcome = ui::dispatch(api, &session, cli.command)?;
    Ok(outcome.exit_code())
}
