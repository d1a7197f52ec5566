use anyhow::Result;

use super::{print_json, CommandContext};
use bug_workflow::workflow::{BugStatus, HistoryEntry, Principal};
use bug_workflow::{BugId, NewBug, UserId};

pub struct CreateCommand {
    pub created_by: String,
    pub assigned_to: Option<String>,
    pub status: String,
}

impl CreateCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let status: BugStatus = self.status.parse()?;
        let engine = ctx.open_engine().await?;

        let bug = engine
            .store()
            .create_bug(NewBug {
                status,
                created_by: Some(UserId::new(&self.created_by)),
                assigned_to: self.assigned_to.as_deref().map(UserId::from),
            })
            .await?;

        if ctx.json {
            return print_json(&bug);
        }
        println!("Created bug {} ({})", bug.id, bug.status.display_name());
        Ok(())
    }
}

pub struct TransitionCommand {
    pub bug_id: i64,
    pub status: String,
    pub user: String,
    pub role: String,
    pub comment: Option<String>,
}

impl TransitionCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        // Reject unknown statuses before touching the database.
        let target: BugStatus = self.status.parse()?;
        let principal = Principal::from_claims(&self.user, &self.role);
        let engine = ctx.open_engine().await?;

        let outcome = engine
            .transition(BugId(self.bug_id), target, &principal, self.comment.clone())
            .await?;

        if ctx.json {
            return print_json(&outcome.bug);
        }
        println!(
            "Bug {}: {} → {}",
            outcome.bug.id,
            outcome.record.from_status.display_name(),
            outcome.record.to_status.display_name()
        );
        Ok(())
    }
}

pub struct HistoryCommand {
    pub bug_id: i64,
}

impl HistoryCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let engine = ctx.open_engine().await?;
        let history = engine.history(BugId(self.bug_id)).await?;
        let entries: Vec<HistoryEntry> = history.iter().map(HistoryEntry::from).collect();

        if ctx.json {
            return print_json(&entries);
        }
        if entries.is_empty() {
            println!("Bug {} has no status changes", self.bug_id);
            return Ok(());
        }
        for entry in entries {
            let who = entry
                .changed_by
                .as_ref()
                .map(UserId::to_string)
                .unwrap_or_else(|| "system".to_string());
            let comment = entry.comment.as_deref().unwrap_or("");
            println!(
                "{}  {} → {}  by {}  {}",
                entry.transitioned_at.format("%Y-%m-%d %H:%M:%S"),
                entry.from_status,
                entry.to_status,
                who,
                comment
            );
        }
        Ok(())
    }
}

pub struct InfoCommand {
    pub bug_id: i64,
    pub user: String,
    pub role: String,
}

impl InfoCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let engine = ctx.open_engine().await?;
        let principal = Principal::from_claims(&self.user, &self.role);
        let info = engine.workflow_info(BugId(self.bug_id), &principal).await?;

        if ctx.json {
            return print_json(&info);
        }
        println!("Bug {}: {}", info.bug_id, info.current_status);
        if info.allowed_transitions.is_empty() {
            println!("No transitions available to {}", principal.user_id);
        } else {
            println!("Next: {}", info.allowed_transitions.join(", "));
        }
        println!("History entries: {}", info.status_history.len());
        Ok(())
    }
}

pub struct StatsCommand {
    pub user: String,
    pub role: String,
}

impl StatsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let engine = ctx.open_engine().await?;
        let principal = Principal::from_claims(&self.user, &self.role);
        let stats = engine.statistics(&principal).await?;

        if ctx.json {
            return print_json(&stats);
        }
        println!("Total bugs: {}", stats.total_bugs);
        for (status, count) in &stats.status_distribution {
            println!("  {status:<12} {count}");
        }
        for t in &stats.most_common_transitions {
            println!("  {} → {}: {}", t.from, t.to, t.count);
        }
        Ok(())
    }
}
