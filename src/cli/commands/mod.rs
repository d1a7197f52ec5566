use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::cli::{Cli, Commands};
use bug_workflow::config::BugWorkflowConfig;
use bug_workflow::{SqliteStore, WorkflowEngine};

pub mod bugs;
pub mod catalog;
pub mod init;

/// Settings every command can see.
pub struct CommandContext {
    pub config: BugWorkflowConfig,
    pub database_override: Option<String>,
    pub json: bool,
}

impl CommandContext {
    pub fn database_url(&self) -> String {
        self.database_override
            .clone()
            .or_else(|| self.config.database.as_ref().map(|db| db.url.clone()))
            .unwrap_or_else(|| bug_workflow::config::DatabaseConfig::default().url)
    }

    pub async fn open_engine(&self) -> Result<WorkflowEngine<SqliteStore>> {
        let db = self.config.database.clone().unwrap_or_default();
        let url = self.database_url();
        tracing::debug!(url = %url, "Opening bug database");

        if let Some(parent) = url
            .strip_prefix("sqlite://")
            .filter(|path| !path.starts_with(':'))
            .and_then(|path| Path::new(path).parent())
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)?;
        }

        let store = SqliteStore::connect(&url, db.max_connections, db.auto_migrate).await?;
        Ok(WorkflowEngine::new(store, self.config.workflow.clone())?)
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run(cli: Cli, config: BugWorkflowConfig) -> Result<()> {
    let ctx = CommandContext {
        config,
        database_override: cli.database,
        json: cli.json,
    };

    match cli.command {
        Commands::Statuses => catalog::StatusesCommand.execute(&ctx),
        Commands::Transitions { status } => catalog::TransitionsCommand { status }.execute(&ctx),
        Commands::Diagram => catalog::DiagramCommand.execute(&ctx),
        Commands::Init { force } => init::InitCommand::new().with_force(force).execute(&ctx),
        Commands::Create {
            created_by,
            assigned_to,
            status,
        } => {
            bugs::CreateCommand {
                created_by,
                assigned_to,
                status,
            }
            .execute(&ctx)
            .await
        }
        Commands::Transition {
            bug_id,
            status,
            user,
            role,
            comment,
        } => {
            bugs::TransitionCommand {
                bug_id,
                status,
                user,
                role,
                comment,
            }
            .execute(&ctx)
            .await
        }
        Commands::History { bug_id } => bugs::HistoryCommand { bug_id }.execute(&ctx).await,
        Commands::Info { bug_id, user, role } => {
            bugs::InfoCommand { bug_id, user, role }.execute(&ctx).await
        }
        Commands::Stats { user, role } => bugs::StatsCommand { user, role }.execute(&ctx).await,
    }
}
