//! CLI module for the ClaimDesk command-line interface.
//!
//! With no subcommand the binary starts the API server. Other subcommands:
//! - `config check` - Validate configuration file
//! - `db migrate` - Create or upgrade the database and exit

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "claimdesk")]
#[command(author, version, about = "Expense submission and approval service", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "CLAIMDESK_CONFIG", default_value = "claimdesk.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the API server
    Serve,

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),
}

/// Config subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

/// Database subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum DbCommands {
    /// Apply pending migrations and exit
    Migrate,
}

impl Cli {
    /// Whether this invocation should start the server
    pub fn is_serve(&self) -> bool {
        matches!(self.command, None | Some(Commands::Serve))
    }

    /// Whether the command reads and reports on the config file itself, so the
    /// config must not be loaded up front
    pub fn checks_config(&self) -> bool {
        matches!(self.command, Some(Commands::Config(ConfigCommands::Check)))
    }
}

/// Run a non-server CLI command
pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli),
        Some(Commands::Db(DbCommands::Migrate)) => cmd_db_migrate(cli).await,
        // Serving is handled in main.rs
        None | Some(Commands::Serve) => Ok(()),
    }
}

fn cmd_config_check(cli: &Cli) -> Result<()> {
    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!(
            "[!!] Configuration file not found: {}",
            config_path.display()
        );
        println!();
        println!("A default configuration will be used when starting the server.");
        return Ok(());
    }

    match Config::load(config_path) {
        Ok(config) => {
            println!("[OK] Configuration file is valid!");
            println!();
            print!("{}", config_summary(&config));

            let warnings = config_warnings(&config);
            if !warnings.is_empty() {
                println!("Warnings:");
                for warning in warnings {
                    println!("  [!] {}", warning);
                }
                println!();
            }

            Ok(())
        }
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {:#}", e);
            println!();
            println!("Please check the configuration file syntax and try again.");
            anyhow::bail!("Invalid configuration file");
        }
    }
}

fn config_summary(config: &Config) -> String {
    let mut out = String::new();
    out.push_str("=== Configuration Summary ===\n\n");
    out.push_str("Server:\n");
    out.push_str(&format!("  Listen:       {}\n", config.bind_addr()));
    out.push_str(&format!(
        "  Data Dir:     {}\n",
        config.server.data_dir.display()
    ));
    out.push_str(&format!(
        "  CORS Origins: {}\n\n",
        config.server.cors_origins.join(", ")
    ));
    out.push_str("Auth:\n");
    match config.auth.fallback_caller_id() {
        Some(id) => out.push_str(&format!("  Default Caller: user {}\n", id)),
        None => out.push_str("  Default Caller: none (X-User-Id required)\n"),
    }
    out.push_str(&format!(
        "  Bootstrap Admin: {}\n\n",
        config.auth.bootstrap_admin_name
    ));
    out.push_str(&format!("Logging:\n  Level:        {}\n\n", config.logging.level));
    out
}

fn config_warnings(config: &Config) -> Vec<&'static str> {
    let mut warnings = Vec::new();

    if config.auth.fallback_caller_id().is_some() {
        warnings.push("Requests without X-User-Id run as the default caller");
    }
    if config.server.cors_origins.iter().any(|o| o == "*") {
        warnings.push("CORS allows any origin");
    }

    warnings
}

async fn cmd_db_migrate(cli: &Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;

    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data directory: {}",
            config.server.data_dir.display()
        )
    })?;

    // init() runs every pending migration
    let pool = crate::db::init(&config.server.data_dir).await?;
    pool.close().await;

    println!(
        "[OK] Database is up to date: {}",
        config
            .server
            .data_dir
            .join(crate::db::DB_FILE_NAME)
            .display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_serves() {
        let cli = Cli::try_parse_from(["claimdesk"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.is_serve());
        assert_eq!(cli.config, PathBuf::from("claimdesk.toml"));
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["claimdesk", "-c", "custom.toml", "serve"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Serve));
        assert_eq!(cli.config, PathBuf::from("custom.toml"));

        let cli = Cli::try_parse_from(["claimdesk", "config", "check"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Config(ConfigCommands::Check)));
        assert!(!cli.is_serve());
        assert!(cli.checks_config());

        let cli =
            Cli::try_parse_from(["claimdesk", "--log-level", "debug", "db", "migrate"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Db(DbCommands::Migrate)));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(!cli.checks_config());
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["claimdesk", "deploy"]).is_err());
    }

    #[test]
    fn test_config_summary_and_warnings() {
        let mut config = Config::default();
        let summary = config_summary(&config);
        assert!(summary.contains("0.0.0.0:8000"));
        assert!(summary.contains("Default Caller: user 1"));
        assert_eq!(config_warnings(&config).len(), 1);

        config.auth.require_caller_header = true;
        config.server.cors_origins = vec!["*".to_string()];
        assert!(config_summary(&config).contains("X-User-Id required"));
        assert_eq!(config_warnings(&config), vec!["CORS allows any origin"]);
    }

    #[tokio::test]
    async fn test_config_check_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claimdesk.toml");
        std::fs::write(&path, "[server]\nport = 0\n").unwrap();

        let cli = Cli::try_parse_from([
            "claimdesk",
            "--config",
            path.to_str().unwrap(),
            "config",
            "check",
        ])
        .unwrap();
        assert!(cli.checks_config());
        assert!(Config::load(&cli.config).is_err());
        assert!(run_command(&cli).await.is_err());
    }

    #[tokio::test]
    async fn test_db_migrate_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claimdesk.toml");
        let data_dir = dir.path().join("data");
        std::fs::write(
            &path,
            format!("[server]\ndata_dir = {:?}\n", data_dir.to_str().unwrap()),
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "claimdesk",
            "--config",
            path.to_str().unwrap(),
            "db",
            "migrate",
        ])
        .unwrap();
        run_command(&cli).await.unwrap();

        assert!(data_dir.join(crate::db::DB_FILE_NAME).exists());
    }
}
