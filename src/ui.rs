// UI layer: turns parsed commands into API calls and prints the outcome.
// Success and rejection messages go to stdout; the spinner and logs go to
// stderr.

use crate::api::{ApiClient, LoginRequest, LoginResponse, Profile, Reply, Task, TaskQuery, User};
use crate::cli::Commands;
use crate::session::Session;
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

/// Whether the server accepted the request. Transport failures never get
/// this far; they surface as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Rejected,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Rejected => ExitCode::FAILURE,
        }
    }
}

/// Run one command against the backend.
pub fn dispatch(mut api: ApiClient, session: &Session, command: Commands) -> Result<Outcome> {
    let color = std::io::stdout().is_terminal();
    match command {
        Commands::Register {
            name,
            email,
            password,
        } => {
            let user = User {
                name,
                email,
                password: password_or_prompt(password)?,
            };
            handle_register(&api, session, &user)
        }
        Commands::Login { email, password } => {
            let creds = LoginRequest {
                email,
                password: password_or_prompt(password)?,
            };
            handle_login(&api, session, &creds)
        }
        Commands::Add { token, description } => {
            authorize(&mut api, session, &token)?;
            handle_add(&api, &description)
        }
        Commands::List { token, filter } => {
            authorize(&mut api, session, &token)?;
            handle_list(&api, &TaskQuery::from(filter), color)
        }
        Commands::Complete { token, task_id } => {
            authorize(&mut api, session, &token)?;
            handle_complete(&api, &task_id)
        }
        Commands::Show { token, task_id } => {
            authorize(&mut api, session, &token)?;
            handle_show(&api, &task_id, color)
        }
        Commands::Delete { token, task_id } => {
            authorize(&mut api, session, &token)?;
            handle_delete(&api, &task_id)
        }
        Commands::Me { token } => {
            authorize(&mut api, session, &token)?;
            handle_me(&api)
        }
        Commands::Logout { token } => {
            let token = authorize(&mut api, session, &token)?;
            handle_logout(&api, session, &token)
        }
    }
}

/// Resolve the token argument (`-` means the saved one) and attach it to
/// the client.
fn authorize(api: &mut ApiClient, session: &Session, arg: &str) -> Result<String> {
    let token = session.resolve(arg)?;
    api.set_token(&token);
    Ok(token)
}

/// `Password` hides input in the terminal.
fn password_or_prompt(password: Option<String>) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password"),
    }
}

/// Show a spinner on stderr while `call` runs. indicatif hides it when
/// stderr is not a terminal.
fn with_spinner<T>(message: &str, call: impl FnOnce() -> Result<T>) -> Result<T> {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner} {msg}").context("Invalid spinner template")?;
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    let result = call();
    spinner.finish_and_clear();
    result
}

/// Print the success rendering or the server body behind `failure`.
fn report<T>(
    reply: Reply<T>,
    failure: &str,
    on_success: impl FnOnce(T) -> Result<String>,
) -> Result<Outcome> {
    match reply {
        Reply::Accepted(value) => {
            println!("{}", on_success(value)?);
            Ok(Outcome::Success)
        }
        Reply::Rejected { body, .. } => {
            println!("{}", render_rejection(failure, &body));
            Ok(Outcome::Rejected)
        }
    }
}

fn handle_register(api: &ApiClient, session: &Session, user: &User) -> Result<Outcome> {
    let reply = with_spinner("Registering...", || api.register(user))?;
    let token = accepted_token(&reply);
    let outcome = report(reply, "Registration failed", |resp| {
        info!(email = %user.email, "registered");
        Ok(render_token("Registration successful!", &resp.token))
    })?;
    if let Some(token) = token {
        remember_token(session, &token);
    }
    Ok(outcome)
}

fn handle_login(api: &ApiClient, session: &Session, creds: &LoginRequest) -> Result<Outcome> {
    let reply = with_spinner("Logging in...", || api.login(creds))?;
    let token = accepted_token(&reply);
    let outcome = report(reply, "Login failed", |resp| {
        info!(email = %creds.email, "logged in");
        Ok(render_token("Login successful!", &resp.token))
    })?;
    if let Some(token) = token {
        remember_token(session, &token);
    }
    Ok(outcome)
}

fn accepted_token(reply: &Reply<LoginResponse>) -> Option<String> {
    match reply {
        Reply::Accepted(resp) => Some(resp.token.clone()),
        Reply::Rejected { .. } => None,
    }
}

/// Save the token for `-`. The token has already been printed, so a write
/// failure only costs the shortcut.
fn remember_token(session: &Session, token: &str) {
    if let Err(err) = session.persist(token) {
        warn!(
            path = %session.path().display(),
            error = %format!("{:#}", err),
            "could not save token"
        );
    }
}

fn handle_add(api: &ApiClient, description: &str) -> Result<Outcome> {
    let reply = with_spinner("Adding task...", || api.add_task(description))?;
    report(reply, "Failed to add task", |task| Ok(render_task_added(&task)))
}

fn handle_list(api: &ApiClient, query: &TaskQuery, color: bool) -> Result<Outcome> {
    let reply = with_spinner("Fetching tasks...", || api.list_tasks(query))?;
    report(reply, "Failed to get tasks", |tasks| Ok(render_task_list(&tasks, color)))
}

fn handle_complete(api: &ApiClient, task_id: &str) -> Result<Outcome> {
    let reply = with_spinner("Updating task...", || api.complete_task(task_id))?;
    report(reply, "Failed to update task", |()| Ok("Task marked as complete!".into()))
}

fn handle_show(api: &ApiClient, task_id: &str, color: bool) -> Result<Outcome> {
    let reply = with_spinner("Fetching task...", || api.get_task(task_id))?;
    report(reply, "Failed to get task", |task| Ok(render_task(&task, color)))
}

fn handle_delete(api: &ApiClient, task_id: &str) -> Result<Outcome> {
    let reply = with_spinner("Deleting task...", || api.delete_task(task_id))?;
    report(reply, "Failed to delete task", |()| Ok("Task deleted!".into()))
}

fn handle_me(api: &ApiClient) -> Result<Outcome> {
    let reply = with_spinner("Fetching profile...", || api.profile())?;
    report(reply, "Failed to get profile", |profile| Ok(render_profile(&profile)))
}

fn handle_logout(api: &ApiClient, session: &Session, token: &str) -> Result<Outcome> {
    let reply = with_spinner("Logging out...", || api.logout())?;
    report(reply, "Logout failed", |()| {
        if session.forget(token)? {
            info!("saved token removed");
        }
        Ok("Logged out.".into())
    })
}

fn render_token(headline: &str, token: &str) -> String {
    format!("{}\nToken: {}", headline, token)
}

fn render_rejection(failure: &str, body: &str) -> String {
    format!("{}: {}", failure, body)
}

fn render_task_added(task: &Task) -> String {
    format!(
        "Task added successfully!\nID: {}\nDescription: {}",
        task.id, task.description
    )
}

fn status_marker(completed: bool, color: bool) -> String {
    match (completed, color) {
        (true, true) => "[X]".green().to_string(),
        (true, false) => "[X]".to_string(),
        (false, true) => "[ ]".dark_grey().to_string(),
        (false, false) => "[ ]".to_string(),
    }
}

fn render_task(task: &Task, color: bool) -> String {
    format!(
        "{} {} (ID: {})",
        status_marker(task.completed, color),
        task.description,
        task.id
    )
}

/// Numbered listing, starting at 1, under a blank line and a header.
fn render_task_list(tasks: &[Task], color: bool) -> String {
    let mut out = String::from("\nYour Tasks:\n===========");
    for (i, task) in tasks.iter().enumerate() {
        out.push_str(&format!("\n{}. {}", i + 1, render_task(task, color)));
    }
    out
}

fn render_profile(profile: &Profile) -> String {
    let mut out = format!("Name: {}\nEmail: {}", profile.name, profile.email);
    if let Some(age) = profile.age {
        out.push_str(&format!("\nAge: {}", age));
    }
    out
}
