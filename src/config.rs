use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the bug workflow service
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BugWorkflowConfig {
    /// Database settings (optional)
    pub database: Option<DatabaseConfig>,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Workflow engine behaviour
    pub workflow: WorkflowSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://.bug-workflow/bugs.db".to_string(),
            max_connections: 10,
            auto_migrate: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
    /// Enable workflow counters
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkflowSettings {
    /// Report graph violations as authorization failures so callers cannot
    /// probe the workflow topology
    #[serde(default)]
    pub conceal_topology: bool,
}

impl BugWorkflowConfig {
    pub fn with_database_defaults() -> Self {
        Self {
            database: Some(DatabaseConfig::default()),
            ..Self::default()
        }
    }

    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (bug-workflow.toml, .bug-workflow-rc)
    /// 3. Environment variables (prefixed with BUG_WORKFLOW__)
    pub fn load() -> Result<Self> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&Self::with_database_defaults())?);

        if Path::new("bug-workflow.toml").exists() {
            builder = builder.add_source(File::with_name("bug-workflow"));
        }

        if Path::new(".bug-workflow-rc").exists() {
            builder = builder.add_source(File::with_name(".bug-workflow-rc").format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("BUG_WORKFLOW")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<BugWorkflowConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = BugWorkflowConfig::load_env_file();
        BugWorkflowConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static BugWorkflowConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BugWorkflowConfig::with_database_defaults();
        let db = config.database.unwrap();
        assert_eq!(db.url, "sqlite://.bug-workflow/bugs.db");
        assert!(db.auto_migrate);
        assert!(!config.workflow.conceal_topology);
        assert_eq!(config.observability.log_level, "warn");
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = BugWorkflowConfig::with_database_defaults();
        config.workflow.conceal_topology = true;

        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("conceal_topology = true"));

        let parsed: BugWorkflowConfig = toml::from_str(&text).unwrap();
        assert!(parsed.workflow.conceal_topology);
        assert_eq!(parsed.database.unwrap().max_connections, 10);
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bug-workflow.toml");
        BugWorkflowConfig::default().save_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[observability]"));
        assert!(text.contains("[workflow]"));
    }
}
