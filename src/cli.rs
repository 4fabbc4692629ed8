use clap::{Args, Parser, Subcommand};

use crate::api::{TaskQuery, DEFAULT_BASE_URL};

#[derive(Parser, Debug)]
#[command(name = "todo", bin_name = "todo", version, arg_required_else_help = true)]
#[command(about = "Todo CLI - A Rust client for the Todo Backend API", long_about = None)]
#[command(after_help = "Any <TOKEN> may be given as '-' to use the token saved by the last login.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the Todo backend
    #[arg(
        long,
        global = true,
        value_name = "URL",
        env = "TODO_API_URL",
        default_value = DEFAULT_BASE_URL
    )]
    pub base_url: String,

    /// Verbose output (debug logs on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new account
    Register {
        name: String,
        email: String,
        /// Prompted for when omitted
        password: Option<String>,
    },

    /// Login and get token
    Login {
        email: String,
        /// Prompted for when omitted
        password: Option<String>,
    },

    /// Add a new task
    Add { token: String, description: String },

    /// List all tasks
    List {
        token: String,
        #[command(flatten)]
        filter: ListFilter,
    },

    /// Mark task as complete
    Complete { token: String, task_id: String },

    /// Show a single task
    Show { token: String, task_id: String },

    /// Delete a task
    Delete { token: String, task_id: String },

    /// Show the logged-in account
    Me { token: String },

    /// Invalidate a token
    Logout { token: String },
}

#[derive(Args, Debug, Default, Clone)]
pub struct ListFilter {
    /// Only tasks with this completion state
    #[arg(long)]
    pub completed: Option<bool>,

    /// Sort order, e.g. `createdAt:desc`
    #[arg(long, value_name = "FIELD:ORDER")]
    pub sort_by: Option<String>,

    /// Maximum number of tasks
    #[arg(long)]
    pub limit: Option<u32>,

    /// Number of tasks to skip
    #[arg(long)]
    pub skip: Option<u32>,
}

impl From<ListFilter> for TaskQuery {
    fn from(filter: ListFilter) -> Self {
        TaskQuery {
            completed: filter.completed,
            sort_by: filter.sort_by,
            limit: filter.limit,
            skip: filter.skip,
        }
    }
}
