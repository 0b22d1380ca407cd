//! ThoughtBuffer - Buffer of Thoughts agent
//!
//! CLI entry point: answer one question and update the template library.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use thoughtbuffer::cli::{Cli, Command};
use thoughtbuffer::config::Config;
use thoughtbuffer::gateway::create_gateway;
use thoughtbuffer::pipeline::{BufferOfThoughts, DEFAULT_QUESTION};
use thoughtbuffer::store::TemplateStore;

fn parse_level(s: &str) -> Option<tracing::Level> {
    match s.to_uppercase().as_str() {
        "TRACE" => Some(tracing::Level::TRACE),
        "DEBUG" => Some(tracing::Level::DEBUG),
        "INFO" => Some(tracing::Level::INFO),
        "WARN" | "WARNING" => Some(tracing::Level::WARN),
        "ERROR" => Some(tracing::Level::ERROR),
        _ => None,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => parse_level(s).unwrap_or_else(|| {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
            tracing::Level::INFO
        }),
        None => tracing::Level::INFO,
    };

    // Logs go to a file so stdout only carries the answer
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("thoughtbuffer")
        .join("logs");

    let writer = match fs::create_dir_all(&log_dir).and_then(|_| fs::File::create(log_dir.join("thoughtbuffer.log"))) {
        Ok(file) => BoxMakeWriter::new(file),
        Err(e) => {
            eprintln!("Warning: cannot write log file in {}: {}", log_dir.display(), e);
            BoxMakeWriter::new(std::io::stderr)
        }
    };

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(store) = cli.store {
        config.store.path = store;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Templates) => cmd_templates(&config),
        None => cmd_ask(&config, cli.question.as_deref().unwrap_or(DEFAULT_QUESTION)).await,
    }
}

async fn cmd_ask(config: &Config, question: &str) -> Result<()> {
    info!(provider = %config.gateway.provider, store = ?config.store.path, "thoughtbuffer starting");
    let gateway = create_gateway(&config.gateway).context("Failed to create model gateway")?;
    let mut bot = BufferOfThoughts::from_config(config, gateway)?;

    let outcome = bot.run(question).await?;
    println!("{}", outcome.answer);
    Ok(())
}

fn cmd_templates(config: &Config) -> Result<()> {
    let store = TemplateStore::open(&config.store.path)?;
    let templates = store.list_all()?;
    if templates.is_empty() {
        println!("No thought templates stored in {}", store.path().display());
        return Ok(());
    }
    for template in templates {
        let slot = template.slot.map(|s| s.to_string()).unwrap_or_default();
        println!("{} {}", slot.yellow(), template.title.cyan());
    }
    Ok(())
}
