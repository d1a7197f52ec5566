use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "bug-workflow")]
#[command(about = "Bug status workflow: lifecycle rules, role policy and transition history")]
#[command(long_about = "bug-workflow applies status transitions to tracked bugs under a fixed \
                       lifecycle and role policy, and keeps an append-only history of every change. \
                       Start with 'bug-workflow statuses' to see the lifecycle.")]
pub struct Cli {
    /// Database URL, overriding the configured one
    #[arg(long, global = true, help = "SQLite URL, e.g. sqlite://bugs.db")]
    pub database: Option<String>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every status with its description
    Statuses,
    /// Show the statuses reachable from a status
    Transitions {
        /// Status name, e.g. InProgress or "In Progress"
        status: String,
    },
    /// Print the workflow graph as nodes and edges
    Diagram,
    /// Write a default bug-workflow.toml in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Register a bug (stand-in for the CRUD layer)
    Create {
        #[arg(long, help = "User id of the reporter")]
        created_by: String,
        #[arg(long, help = "User id of the assignee")]
        assigned_to: Option<String>,
        #[arg(long, default_value = "Open")]
        status: String,
    },
    /// Move a bug to a new status
    Transition {
        bug_id: i64,
        status: String,
        #[arg(long, help = "Acting user id")]
        user: String,
        #[arg(long, default_value = "user", help = "Role claim of the acting user")]
        role: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Show the transition history of a bug
    History { bug_id: i64 },
    /// Current status, permitted next steps and history for a user
    Info {
        bug_id: i64,
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "user")]
        role: String,
    },
    /// Status distribution and most common transitions (admin only)
    Stats {
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "user")]
        role: String,
    },
}
