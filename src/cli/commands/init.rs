use anyhow::{bail, Result};
use std::path::PathBuf;

use super::CommandContext;

pub struct InitCommand {
    pub force: bool,
    pub path: PathBuf,
}

impl InitCommand {
    pub fn new() -> Self {
        Self {
            force: false,
            path: PathBuf::from("bug-workflow.toml"),
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn execute(&self, ctx: &CommandContext) -> Result<()> {
        if self.path.exists() && !self.force {
            bail!("{} already exists (use --force to overwrite)", self.path.display());
        }

        ctx.config.save_to_file(&self.path)?;
        println!("Wrote {}", self.path.display());
        Ok(())
    }
}
