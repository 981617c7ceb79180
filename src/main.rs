/*!
 * Skinguard CLI - configuration and ledger tooling
 *
 * Version: 0.1.0
 * Author: Shane Wall <shaneawall@gmail.com>
 */

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use serde::Serialize;
use skinguard::{config::GuardConfig, LedgerStore, OutfitTemplate};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "skinguard")]
#[command(version, about = "Cosmetic restriction engine for game servers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file with default values
    Init {
        /// Config file path (default: ~/.skinguard/skinguard.toml)
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Load a configuration file and report the effective settings
    Validate {
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Print the effective settings as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the entities recorded in the first-contact ledger
    Ledger {
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

/// Settings as the service will actually apply them
#[derive(Debug, Serialize)]
struct EffectiveConfig {
    monitor_interval_seconds: f32,
    save_interval_seconds: f32,
    block_cosmetics: bool,
    block_skins: bool,
    block_mythics: bool,
    remove_wearables_on_first_join: bool,
    cosmetic_flags: Vec<String>,
    cosmetic_name_keywords: Vec<String>,
    starter_outfit: OutfitTemplate,
    ledger_path: PathBuf,
    warnings: Vec<String>,
}

impl EffectiveConfig {
    fn from_config(config: &GuardConfig) -> Self {
        let mut starter_outfit = config.starter_outfit.clone();
        starter_outfit.quality = starter_outfit.effective_quality();

        Self {
            monitor_interval_seconds: config.monitor_interval_secs(),
            save_interval_seconds: config.save_interval_secs(),
            block_cosmetics: config.block_cosmetics,
            block_skins: config.block_skins,
            block_mythics: config.block_mythics,
            remove_wearables_on_first_join: config.remove_wearables_on_first_join,
            cosmetic_flags: config.effective_cosmetic_flags(),
            cosmetic_name_keywords: config.effective_name_keywords(),
            starter_outfit,
            ledger_path: config.ledger_path(),
            warnings: config.warnings(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { config, force } => run_init(resolve_config_path(config)?, force),
        Commands::Validate { config, json } => run_validate(&resolve_config_path(config)?, json),
        Commands::Ledger { config } => run_ledger(&resolve_config_path(config)?).await,
    }
}

fn resolve_config_path(config: Option<PathBuf>) -> Result<PathBuf> {
    match config {
        Some(path) => Ok(path),
        None => default_config_path(),
    }
}

/// Get the default configuration file path
fn default_config_path() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home.join(".skinguard").join("skinguard.toml"))
}

fn load_config(path: &Path) -> Result<GuardConfig> {
    GuardConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Install the configured subscriber; failure only costs log output
fn init_logging(config: &GuardConfig) {
    if let Err(e) = skinguard::logging::init_logging(config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
}

fn run_init(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    GuardConfig::default()
        .to_file(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "{} Configuration written to {}",
        style("✓").green().bold(),
        style(path.display()).cyan()
    );
    Ok(())
}

fn run_validate(path: &Path, json: bool) -> Result<()> {
    let config = load_config(path)?;
    init_logging(&config);
    let effective = EffectiveConfig::from_config(&config);

    if json {
        println!("{}", serde_json::to_string_pretty(&effective)?);
        return Ok(());
    }

    println!("{}", style(format!("Configuration: {}", path.display())).bold());
    println!(
        "  Monitor interval: {}s | Save debounce: {}s",
        effective.monitor_interval_seconds, effective.save_interval_seconds
    );
    println!(
        "  Block cosmetics: {} | skins: {} | mythics: {} | strip on first join: {}",
        effective.block_cosmetics,
        effective.block_skins,
        effective.block_mythics,
        effective.remove_wearables_on_first_join
    );
    println!("  Cosmetic flags: {}", effective.cosmetic_flags.join(", "));
    println!(
        "  Name keywords: {}",
        effective.cosmetic_name_keywords.join(", ")
    );

    let outfit = &effective.starter_outfit;
    println!(
        "  Starter outfit: shirt {} | pants {} | hat {} | backpack {} | vest {} | mask {} | glasses {} | quality {}",
        outfit.shirt_id,
        outfit.pants_id,
        outfit.hat_id,
        outfit.backpack_id,
        outfit.vest_id,
        outfit.mask_id,
        outfit.glasses_id,
        outfit.quality
    );
    println!("  Ledger: {}", effective.ledger_path.display());

    if effective.warnings.is_empty() {
        println!("{} Configuration is valid", style("✓").green().bold());
    } else {
        for warning in &effective.warnings {
            println!("{} {}", style("!").yellow().bold(), warning);
        }
    }
    Ok(())
}

async fn run_ledger(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    init_logging(&config);
    let ledger = LedgerStore::load(config.ledger_path(), config.save_interval()).await;

    println!(
        "{} entries in {}",
        style(ledger.len().await).bold(),
        ledger.path().display()
    );
    for id in ledger.ids().await {
        println!("{}", id);
    }
    Ok(())
}
