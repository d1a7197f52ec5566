use anyhow::Result;
use clap::Parser;

mod cli;

use bug_workflow::config::BugWorkflowConfig;
use bug_workflow::{config, telemetry, workflow_metrics};
use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config: BugWorkflowConfig = config::config()?.clone();
    telemetry::init_telemetry(&config.observability)?;
    config::init_config()?;

    let metrics_enabled = config.observability.metrics_enabled;
    let result = cli::commands::run(cli, config).await;

    if metrics_enabled {
        workflow_metrics().log_stats();
    }
    result
}
