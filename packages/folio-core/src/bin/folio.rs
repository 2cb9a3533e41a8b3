//! Folio CLI - portfolio metrics and rebalance recommendations.
//!
//! Every command prints a JSON envelope: `{"ok": true, "data": ...}` or
//! `{"ok": false, "error": "..."}`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use folio_core::{
    ApiResponse, AppConfig, AssetClass, Holding, MetricsEngine, PortfolioStore, RiskProfile,
    RiskProfileTable,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Portfolio metrics and rebalance recommendations")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.folio/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Portfolio snapshot file (defaults to ~/.folio/portfolio.json)
    #[arg(long, global = true)]
    portfolio: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute valuation, risk metrics and rebalance directives
    Analyze {
        /// Risk profile to compare against (defaults to the portfolio's)
        #[arg(short, long)]
        profile: Option<RiskProfile>,
        /// Drift threshold in percentage points
        #[arg(short, long)]
        threshold: Option<f64>,
        /// Risk-free rate per return period
        #[arg(short, long)]
        risk_free_rate: Option<f64>,
    },
    /// Holding management commands
    Holding {
        #[command(subcommand)]
        action: HoldingAction,
    },
    /// Price history commands
    Price {
        #[command(subcommand)]
        action: PriceAction,
    },
    /// Risk profile commands
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum HoldingAction {
    /// List all holdings
    List,
    /// Add a holding (merges with cost averaging if the symbol exists)
    Add {
        /// Ticker symbol
        #[arg(short, long)]
        symbol: String,
        /// Number of units
        #[arg(short = 'n', long)]
        quantity: f64,
        /// Cost per unit
        #[arg(short, long)]
        cost: f64,
        /// Asset class: stock, bond or cash
        #[arg(short = 'a', long, default_value = "stock")]
        class: AssetClass,
        /// Sector label
        #[arg(long)]
        sector: Option<String>,
    },
    /// Remove a holding
    Remove {
        /// Ticker symbol
        #[arg(short, long)]
        symbol: String,
    },
}

#[derive(Subcommand)]
enum PriceAction {
    /// Record a price point
    Record {
        /// Ticker symbol
        #[arg(short, long)]
        symbol: String,
        /// Price per unit
        #[arg(short, long)]
        price: f64,
        /// RFC 3339 timestamp (defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Show recorded prices for a symbol
    Show {
        /// Ticker symbol
        #[arg(short, long)]
        symbol: String,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// List risk profiles and their targets
    List,
    /// Show one risk profile
    Show {
        /// Profile name
        name: RiskProfile,
    },
    /// Set the portfolio's risk profile
    Set {
        /// Profile name
        name: RiskProfile,
    },
    /// Write the built-in profile table to a JSON or TOML file
    Init {
        /// Output path
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(data) => println!("{}", render(&ApiResponse::ok(data))),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            println!("{}", render(&ApiResponse::<()>::err(format!("{e:#}"))));
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn render<T: Serialize>(response: &ApiResponse<T>) -> String {
    serde_json::to_string_pretty(response)
        .unwrap_or_else(|e| json!({ "ok": false, "error": e.to_string() }).to_string())
}

fn run(cli: Cli) -> Result<Value> {
    let config = match cli.config {
        Some(path) => AppConfig::load_from_path(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load().context("Failed to load config")?,
    };

    let mut store = match cli.portfolio.or_else(|| config.portfolio_path.clone()) {
        Some(path) => PortfolioStore::with_path(path.clone())
            .with_context(|| format!("Failed to open portfolio {}", path.display()))?,
        None => PortfolioStore::new().context("Failed to open portfolio")?,
    };
    if !store.path().exists() {
        store.set_risk_profile(config.default_profile);
    }

    match cli.command {
        Commands::Analyze {
            profile,
            threshold,
            risk_free_rate,
        } => handle_analyze(&config, &store, profile, threshold, risk_free_rate),
        Commands::Holding { action } => handle_holding(store, action),
        Commands::Price { action } => handle_price(store, action),
        Commands::Profile { action } => handle_profile(&config, store, action),
    }
}

fn handle_analyze(
    config: &AppConfig,
    store: &PortfolioStore,
    profile: Option<RiskProfile>,
    threshold: Option<f64>,
    risk_free_rate: Option<f64>,
) -> Result<Value> {
    let mut engine_config = config.engine.clone();
    if let Some(threshold) = threshold {
        engine_config.drift_threshold_pct = threshold;
    }
    if let Some(rate) = risk_free_rate {
        engine_config.risk_free_rate = rate;
    }

    let profiles = config
        .risk_profiles()
        .context("Failed to load risk profiles")?;
    let engine = MetricsEngine::new(engine_config).with_profiles(profiles);

    let snapshot = store.get();
    let profile = profile.unwrap_or(snapshot.risk_profile);
    let result = engine.compute(&snapshot.request_with(profile))?;

    Ok(serde_json::to_value(result)?)
}

fn handle_holding(mut store: PortfolioStore, action: HoldingAction) -> Result<Value> {
    match action {
        HoldingAction::List => Ok(json!({
            "holdings": store.holdings(),
            "holding_count": store.holdings().len(),
        })),
        HoldingAction::Add {
            symbol,
            quantity,
            cost,
            class,
            sector,
        } => {
            let mut holding = Holding::try_new(&symbol, quantity, cost, class)?;
            if let Some(sector) = sector {
                holding = holding.with_sector(sector);
            }

            let (holding, was_update) = store.add_holding(holding)?;
            store.save()?;
            Ok(json!({
                "holding": holding,
                "action": if was_update { "updated" } else { "added" },
            }))
        }
        HoldingAction::Remove { symbol } => {
            let removed = store.remove_holding(&symbol)?;
            store.save()?;
            Ok(json!({ "removed": removed }))
        }
    }
}

fn handle_price(mut store: PortfolioStore, action: PriceAction) -> Result<Value> {
    match action {
        PriceAction::Record { symbol, price, at } => {
            let timestamp = at.unwrap_or_else(Utc::now);
            store.record_price(&symbol, timestamp, price)?;
            store.save()?;
            Ok(json!({
                "symbol": symbol.to_uppercase(),
                "points": store.price_history(&symbol).len(),
            }))
        }
        PriceAction::Show { symbol } => Ok(json!({
            "symbol": symbol.to_uppercase(),
            "prices": store.price_history(&symbol),
        })),
    }
}

fn handle_profile(
    config: &AppConfig,
    mut store: PortfolioStore,
    action: ProfileAction,
) -> Result<Value> {
    match action {
        ProfileAction::List => {
            let profiles = config.risk_profiles()?;
            let entries: Vec<Value> = profiles
                .iter()
                .map(|(profile, target)| {
                    json!({
                        "name": profile,
                        "description": target.description,
                        "targets": target.targets,
                        "valid": target.validate(profile, config.engine.profile_tolerance).is_ok(),
                    })
                })
                .collect();
            Ok(json!({ "profiles": entries, "default": config.default_profile }))
        }
        ProfileAction::Show { name } => {
            let profiles = config.risk_profiles()?;
            let target = profiles.resolve(name, config.engine.profile_tolerance)?;
            Ok(json!({ "name": name, "profile": target }))
        }
        ProfileAction::Set { name } => {
            store.set_risk_profile(name);
            store.save()?;
            Ok(json!({ "risk_profile": name }))
        }
        ProfileAction::Init { path } => {
            RiskProfileTable::builtin()
                .save_to_path(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(json!({ "written": path }))
        }
    }
}
