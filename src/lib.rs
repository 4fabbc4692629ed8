// Library root
// -----------
// The binary (`main.rs`) parses arguments and hands the command to `ui`.
//
// Module responsibilities:
// - `api`: HTTP interactions with the Todo backend and the JSON shapes it
//   speaks.
// - `cli`: command-line definitions.
// - `session`: the saved token file.
// - `telemetry`: tracing subscriber setup.
// - `ui`: runs a command and prints its outcome.
pub mod api;
pub mod cli;
pub mod session;
pub mod telemetry;
pub mod ui;
