use anyhow::Result;

use super::{print_json, CommandContext};
use bug_workflow::workflow::{all_statuses, allowed_targets, diagram, BugStatus};

pub struct StatusesCommand;

impl StatusesCommand {
    pub fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let statuses = all_statuses();
        if ctx.json {
            return print_json(&statuses);
        }

        for info in statuses {
            println!("{:<12} {:<12} {}", info.value.as_str(), info.display_name, info.description);
        }
        Ok(())
    }
}

pub struct TransitionsCommand {
    pub status: String,
}

impl TransitionsCommand {
    pub fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let from: BugStatus = self.status.parse()?;
        let targets: Vec<&str> = allowed_targets(from).iter().map(|s| s.display_name()).collect();

        if ctx.json {
            return print_json(&targets);
        }

        println!("From {}: {}", from.display_name(), targets.join(", "));
        Ok(())
    }
}

pub struct DiagramCommand;

impl DiagramCommand {
    pub fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let diagram = diagram();
        if ctx.json {
            return print_json(&diagram);
        }

        for edge in &diagram.edges {
            println!("{}", edge.label);
        }
        Ok(())
    }
}
