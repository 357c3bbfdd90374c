//! Risk Desk
//!
//! Manual crypto-futures order desk that sizes every position to a fixed
//! fraction of unutilized capital and enforces daily trade limits.

mod api;
mod desk;
mod models;
mod session;
mod trading;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::api::{HttpPriceSource, PaperBroker, SimulatedPriceSource};
use crate::desk::Desk;
use crate::models::{OrderTicket, Side, StopMode};
use crate::session::Session;
use crate::trading::{RiskConfig, SizingStatus};

/// Risk-bounded futures order desk CLI.
#[derive(Parser)]
#[command(name = "riskdesk")]
#[command(about = "Size futures orders to a fixed fraction of unutilized capital", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(flatten)]
    risk: RiskArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides layered on top of the config file (or the defaults).
#[derive(Args)]
struct RiskArgs {
    /// JSON config file
    #[arg(short, long, env = "RISKDESK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Account balance when the broker does not report one
    #[arg(long, env = "STARTING_BALANCE", global = true)]
    starting_balance: Option<Decimal>,

    /// Percent of unutilized capital risked per trade
    #[arg(long, env = "RISK_PERCENT", global = true)]
    risk_percent: Option<Decimal>,

    /// Price units added to a points stop
    #[arg(long, env = "POINTS_BUFFER", global = true)]
    points_buffer: Option<Decimal>,

    /// Percentage points added to a percent stop
    #[arg(long, env = "PERCENT_BUFFER", global = true)]
    percent_buffer: Option<Decimal>,

    /// Maximum trades per UTC day
    #[arg(long, env = "DAILY_MAX_TRADES", global = true)]
    daily_max_trades: Option<u32>,

    /// Maximum trades per symbol per UTC day
    #[arg(long, env = "DAILY_MAX_PER_SYMBOL", global = true)]
    daily_max_per_symbol: Option<u32>,
}

impl RiskArgs {
    fn resolve(&self) -> Result<RiskConfig> {
        let mut config = match &self.config {
            Some(path) => RiskConfig::load(path)?,
            None => RiskConfig::default(),
        };

        if let Some(v) = self.starting_balance {
            config.starting_balance = v;
        }
        if let Some(v) = self.risk_percent {
            config.risk_percent = v;
        }
        if let Some(v) = self.points_buffer {
            config.points_buffer = v;
        }
        if let Some(v) = self.percent_buffer {
            config.percent_buffer = v;
        }
        if let Some(v) = self.daily_max_trades {
            config.daily_max_trades = v;
        }
        if let Some(v) = self.daily_max_per_symbol {
            config.daily_max_per_symbol = v;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the suggested size for one entry and stop
    Size {
        /// Instrument symbol, e.g. BTCUSDT
        #[arg(short, long)]
        symbol: String,

        /// LONG or SHORT
        #[arg(long, default_value = "long", value_parser = parse_side)]
        side: Side,

        /// Entry price
        #[arg(short, long)]
        entry: Decimal,

        /// Stop mode (points, percent)
        #[arg(short = 'm', long, default_value = "points", value_parser = parse_stop_mode)]
        stop_mode: StopMode,

        /// Stop distance in points or percent
        #[arg(long)]
        stop: Decimal,

        /// Account balance (defaults to the configured starting balance)
        #[arg(short, long)]
        balance: Option<Decimal>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show current configuration
    Config,

    /// Start an interactive paper-trading desk
    Desk {
        /// Quote for the simulated price source, e.g. BTCUSDT=27050
        #[arg(short, long = "price", value_parser = parse_quote)]
        prices: Vec<(String, Decimal)>,

        /// Fetch prices from the public spot ticker instead
        #[arg(long)]
        live_prices: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = cli.risk.resolve()?;

    match cli.command {
        Commands::Size {
            symbol,
            side,
            entry,
            stop_mode,
            stop,
            balance,
            json,
        } => {
            let balance = balance.unwrap_or(config.starting_balance);
            let ticket = OrderTicket::new(&symbol, side, entry, stop_mode, stop);

            let mut session = Session::new(config);
            let sizing = session.size(balance, entry, stop_mode, stop, chrono::Utc::now());

            if json {
                println!("{}", serde_json::to_string_pretty(&sizing)?);
                return Ok(());
            }

            println!("\n=== {} {} ===", ticket.side.as_str(), ticket.symbol);
            let status = match sizing.status {
                SizingStatus::Sized => "SIZED",
                SizingStatus::InvalidInput => "INVALID_INPUT",
            };
            println!("Status:             {}", status);
            println!("Entry:              {}", ticket.entry_price);
            println!(
                "Stop Loss:          {}",
                stop_mode.stop_price(side, entry, stop)
            );
            println!("Risk Amount:        ${:.2}", sizing.risk_amount);
            println!("Suggested Lot:      {}", sizing.units.round_dp(6).normalize());
            println!("Suggested Leverage: {:.2}x", sizing.suggested_leverage);
            println!("Max Leverage:       {:.2}x", sizing.max_leverage);
            println!("Notional:           ${:.2}", sizing.notional);
            println!("Unutilized:         ${:.2}", sizing.unutilized_capital);
        }

        Commands::Config => {
            println!("\n=== Risk Configuration ===\n");
            println!("Capital:");
            println!("  Starting Balance:     ${}", config.starting_balance);
            println!("  Risk Per Trade:       {}%", config.risk_percent);

            println!("\nStop Buffers:");
            println!("  Points Buffer:        {}", config.points_buffer);
            println!("  Percent Buffer:       {}%", config.percent_buffer);

            println!("\nDaily Limits:");
            println!("  Max Trades:           {}", config.daily_max_trades);
            println!("  Max Per Symbol:       {}", config.daily_max_per_symbol);
        }

        Commands::Desk {
            prices,
            live_prices,
        } => {
            info!(
                balance = %config.starting_balance,
                live_prices = live_prices,
                "Starting desk"
            );

            let broker = PaperBroker::new(config.starting_balance);
            let session = Session::new(config);

            println!("\n=== Risk Desk (paper) ===");
            println!("Price source: {}", if live_prices { "live ticker" } else { "simulated" });
            println!("Press Ctrl+C to stop.\n");

            if live_prices {
                Desk::new(session, HttpPriceSource::new()?, broker).run().await?;
            } else {
                let source = prices
                    .into_iter()
                    .fold(SimulatedPriceSource::new(), |source, (symbol, price)| {
                        source.with_price(&symbol, price)
                    });
                Desk::new(session, source, broker).run().await?;
            }
        }
    }

    Ok(())
}

fn parse_side(s: &str) -> Result<Side> {
    Side::parse(s).ok_or_else(|| anyhow!("expected long or short, got '{}'", s))
}

fn parse_stop_mode(s: &str) -> Result<StopMode> {
    StopMode::parse(s).ok_or_else(|| anyhow!("expected points or percent, got '{}'", s))
}

/// Parse `SYMBOL=PRICE`.
fn parse_quote(s: &str) -> Result<(String, Decimal)> {
    let (symbol, price) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected SYMBOL=PRICE, got '{}'", s))?;
    Ok((symbol.trim().to_uppercase(), price.trim().parse()?))
}
