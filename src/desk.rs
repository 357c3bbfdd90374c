//! Interactive order desk: reads commands from stdin and drives a session.
//!
//! Commands:
//!   price SYMBOL
//!   size SYMBOL points|percent|price STOP [entry=PRICE] [side=long|short]
//!   long|short SYMBOL points|percent|price STOP [entry=PRICE] [units=N] [lev=N]
//!              [type=market|limit|stop] [tp=PRICE:PCT ...]
//!   log | stats | balance | reset | export PATH | help | quit

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::api::{BrokerGateway, PriceSource};
use crate::models::{normalize_symbol, OrderTicket, OrderType, Side, StopMode};
use crate::session::Session;
use crate::trading::SizingResult;

const HELP: &str = "\
Commands:
  price SYMBOL
  size SYMBOL points|percent|price STOP [entry=PRICE] [side=long|short]
  long|short SYMBOL points|percent|price STOP [entry=PRICE] [units=N] [lev=N]
             [type=market|limit|stop] [tp=PRICE:PCT ...]
  log | stats | balance | reset | export PATH | help | quit";

/// How the stop was typed at the desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopInput {
    Mode(StopMode),
    /// Absolute stop price, converted to a points distance from entry
    Price,
}

/// Entry, stop and optional extras shared by `size` and order commands.
#[derive(Debug, Clone, PartialEq)]
struct OrderArgs {
    symbol: String,
    side: Side,
    stop: StopInput,
    stop_value: Decimal,
    entry: Option<Decimal>,
    order_type: OrderType,
    units: Option<Decimal>,
    leverage: Option<Decimal>,
    take_profits: Vec<(Decimal, Decimal)>,
}

/// A parsed desk command.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Price(String),
    Size(OrderArgs),
    Order(OrderArgs),
    Log,
    Stats,
    Balance,
    Reset,
    Export(PathBuf),
    Help,
    Quit,
}

/// Terminal front end over one session and its collaborators.
pub struct Desk<P, B> {
    session: Session,
    prices: P,
    broker: B,
}

impl<P: PriceSource, B: BrokerGateway> Desk<P, B> {
    pub fn new(session: Session, prices: P, broker: B) -> Self {
        Self {
            session,
            prices,
            broker,
        }
    }

    /// Read commands until `quit`, end of input, or Ctrl+C.
    pub async fn run(&mut self) -> Result<()> {
        println!("{}\n", HELP);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!("\nStopping desk...");
                    break;
                }
                line = lines.next_line() => line.context("Failed to read input")?,
            };
            let Some(line) = line else { break };

            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    println!("error: {}", e);
                    continue;
                }
            };

            match self.handle(command, Utc::now()).await {
                Ok(Some(output)) => println!("{}", output),
                Ok(None) => break,
                Err(e) => println!("error: {:#}", e),
            }
        }

        info!(trades = self.session.ledger().len(), "Desk closed");
        Ok(())
    }

    /// Run one command; `None` means the desk should stop.
    async fn handle(&mut self, command: Command, now: DateTime<Utc>) -> Result<Option<String>> {
        let output = match command {
            Command::Price(symbol) => {
                let price = self.prices.get_price(&symbol).await?;
                format!("{} {}", normalize_symbol(&symbol), price)
            }

            Command::Size(args) => {
                let balance = self.balance().await;
                let ticket = self.ticket(&args).await?;
                let sizing = self.session.size(
                    balance,
                    ticket.entry_price,
                    ticket.stop_mode,
                    ticket.stop_value,
                    now,
                );
                format_sizing(&ticket, &sizing)
            }

            Command::Order(args) => {
                let balance = self.balance().await;
                let ticket = self.ticket(&args).await?;

                match self.session.execute(&ticket, balance, &self.broker, now).await {
                    Ok(exec) => format!(
                        "Order placed: {} {} {} units @ {} x{} (notional ${:.2}) [{}]",
                        exec.trade.side.as_str(),
                        exec.trade.symbol,
                        exec.trade.units.round_dp(6).normalize(),
                        exec.trade.entry_price,
                        exec.trade.leverage.normalize(),
                        exec.trade.notional,
                        exec.broker_status
                    ),
                    Err(e) => format!("REJECTED [{}] {}", e.code(), e),
                }
            }

            Command::Log => self.format_log(),

            Command::Stats => {
                let today = now.date_naive();
                let config = self.session.config().clone();
                let stats = self.session.stats_for(today).clone();

                let mut out = format!(
                    "{}: {}/{} trades",
                    today, stats.total_count, config.daily_max_trades
                );
                let mut symbols: Vec<_> = stats.by_symbol_count.iter().collect();
                symbols.sort();
                for (symbol, count) in symbols {
                    out.push_str(&format!(
                        "\n  {:<12} {}/{}",
                        symbol, count, config.daily_max_per_symbol
                    ));
                }
                out
            }

            Command::Balance => {
                let balance = self.balance().await;
                format!(
                    "Balance: ${:.2}  Used margin: ${:.2}  Unutilized: ${:.2}",
                    balance,
                    self.session.ledger().used_margin(),
                    self.session.unutilized_capital(balance)
                )
            }

            Command::Reset => {
                let removed = self.session.reset_daily(now.date_naive());
                format!("Daily limits reset ({} trades removed)", removed)
            }

            Command::Export(path) => {
                let json = serde_json::to_string_pretty(self.session.ledger().trades())?;
                tokio::fs::write(&path, json)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                format!(
                    "Exported {} trades to {}",
                    self.session.ledger().len(),
                    path.display()
                )
            }

            Command::Help => HELP.to_string(),

            Command::Quit => return Ok(None),
        };

        Ok(Some(output))
    }

    /// Broker balance, falling back to the configured starting balance.
    async fn balance(&self) -> Decimal {
        match self.broker.fetch_balance().await {
            Ok(balance) => balance,
            Err(e) => {
                warn!(error = %e, "Balance unavailable, using starting balance");
                self.session.config().starting_balance
            }
        }
    }

    /// Build a ticket, pricing the entry from the price source when not given.
    async fn ticket(&self, args: &OrderArgs) -> Result<OrderTicket> {
        let entry = match args.entry {
            Some(entry) => entry,
            None => self.prices.get_price(&args.symbol).await?,
        };

        let mut ticket = match args.stop {
            StopInput::Mode(mode) => {
                OrderTicket::new(&args.symbol, args.side, entry, mode, args.stop_value)
            }
            StopInput::Price => {
                OrderTicket::from_stop_price(&args.symbol, args.side, entry, args.stop_value)
            }
        }
        .with_order_type(args.order_type);

        if let Some(units) = args.units {
            ticket = ticket.with_units(units);
        }
        if let Some(leverage) = args.leverage {
            ticket = ticket.with_leverage(leverage);
        }
        for (price, pct) in &args.take_profits {
            ticket = ticket.with_take_profit(*price, *pct);
        }

        Ok(ticket)
    }

    fn format_log(&self) -> String {
        let trades = self.session.ledger().trades();
        if trades.is_empty() {
            return "No trades placed yet.".to_string();
        }

        let mut out = format!(
            "{:<10} {:<10} {:<6} {:<7} {:>12} {:>12} {:>6} {:>12}",
            "TIME", "SYMBOL", "SIDE", "TYPE", "ENTRY", "UNITS", "LEV", "NOTIONAL"
        );
        out.push('\n');
        out.push_str(&"-".repeat(82));

        for t in trades {
            out.push_str(&format!(
                "\n{:<10} {:<10} {:<6} {:<7} {:>12} {:>12} {:>6} {:>12.2}",
                t.time.format("%H:%M:%S").to_string(),
                t.symbol,
                t.side.as_str(),
                t.order_type.as_str(),
                t.entry_price.to_string(),
                t.units.round_dp(6).normalize().to_string(),
                t.leverage.normalize().to_string(),
                t.notional
            ));
        }
        out
    }
}

fn format_sizing(ticket: &OrderTicket, sizing: &SizingResult) -> String {
    if !sizing.is_sized() {
        return format!(
            "Cannot size {}: unutilized ${:.2}, entry {}, stop {} (INVALID_INPUT)",
            ticket.symbol, sizing.unutilized_capital, ticket.entry_price, ticket.stop_value
        );
    }

    format!(
        "{} {} entry {} stop {}\n  Suggested Lot:      {}\n  Suggested Leverage: {:.2}x\n  Max Leverage:       {:.2}x\n  Notional:           ${:.2}\n  Risk Amount:        ${:.2}\n  Unutilized:         ${:.2}",
        ticket.side.as_str(),
        ticket.symbol,
        ticket.entry_price,
        ticket
            .stop_mode
            .stop_price(ticket.side, ticket.entry_price, ticket.stop_value),
        sizing.units.round_dp(6).normalize(),
        sizing.suggested_leverage,
        sizing.max_leverage,
        sizing.notional,
        sizing.risk_amount,
        sizing.unutilized_capital
    )
}

// ==================== Parsing ====================

fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match head.to_lowercase().as_str() {
        "price" => Command::Price(normalize_symbol(
            rest.first().ok_or_else(|| anyhow!("usage: price SYMBOL"))?,
        )),
        "size" => Command::Size(parse_order_args(Side::Long, &rest)?),
        "long" | "buy" => Command::Order(parse_order_args(Side::Long, &rest)?),
        "short" | "sell" => Command::Order(parse_order_args(Side::Short, &rest)?),
        "log" => Command::Log,
        "stats" => Command::Stats,
        "balance" => Command::Balance,
        "reset" => Command::Reset,
        "export" => Command::Export(PathBuf::from(
            *rest.first().ok_or_else(|| anyhow!("usage: export PATH"))?,
        )),
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command '{}', try 'help'", other),
    };

    Ok(Some(command))
}

fn parse_order_args(side: Side, words: &[&str]) -> Result<OrderArgs> {
    let [symbol, mode, stop_value, options @ ..] = words else {
        bail!("expected SYMBOL points|percent|price STOP");
    };

    let stop = match mode.to_lowercase().as_str() {
        "price" => StopInput::Price,
        other => StopInput::Mode(
            StopMode::parse(other).ok_or_else(|| anyhow!("unknown stop mode '{}'", other))?,
        ),
    };

    let mut args = OrderArgs {
        symbol: normalize_symbol(symbol),
        side,
        stop,
        stop_value: parse_decimal("stop", stop_value)?,
        entry: None,
        order_type: OrderType::default(),
        units: None,
        leverage: None,
        take_profits: Vec::new(),
    };

    for option in options {
        let (key, value) = option
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=value, got '{}'", option))?;

        match key.to_lowercase().as_str() {
            "entry" => args.entry = Some(parse_decimal(key, value)?),
            "units" => args.units = Some(parse_decimal(key, value)?),
            "lev" | "leverage" => args.leverage = Some(parse_decimal(key, value)?),
            "side" => {
                args.side = Side::parse(value).ok_or_else(|| anyhow!("unknown side '{}'", value))?
            }
            "type" => {
                args.order_type = OrderType::parse(value)
                    .ok_or_else(|| anyhow!("unknown order type '{}'", value))?
            }
            "tp" => {
                let (price, pct) = value
                    .split_once(':')
                    .ok_or_else(|| anyhow!("expected tp=PRICE:PCT, got '{}'", value))?;
                args.take_profits
                    .push((parse_decimal("tp price", price)?, parse_decimal("tp pct", pct)?));
            }
            other => bail!("unknown option '{}'", other),
        }
    }

    Ok(args)
}

fn parse_decimal(name: &str, value: &str) -> Result<Decimal> {
    value
        .parse::<Decimal>()
        .with_context(|| format!("invalid {} '{}'", name, value))
}
