//! CLI entry point for the divfolio tracker.

use std::path::PathBuf;
use std::process;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use divfolio::{Exposure, Holding, Period, round2};
use divfolio_tracker::commands::{self, Tracker};
use divfolio_tracker::config::Config;
use divfolio_tracker::error::Result;

#[derive(Parser)]
#[command(name = "divfolio")]
#[command(about = "Multi-currency dividend portfolio tracker")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Value holdings in the reporting currency
    Value,

    /// Rank underweight holdings and size purchases
    Advise {
        /// Capital to deploy (defaults to advisor.available_capital)
        #[arg(long)]
        capital: Option<f64>,

        /// Show every underweight holding, not just the top N
        #[arg(long)]
        all: bool,
    },

    /// Project upcoming dividends by month
    Forecast {
        /// First day counted (defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Record realized dividend income for a month (YYYY-MM)
    Record {
        period: String,

        /// Amount in the reporting currency (defaults to the month's forecast)
        #[arg(long)]
        amount: Option<f64>,
    },

    /// Show recorded dividend history
    History,

    /// Add a holding, or update the one with the same ticker
    Add {
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        shares: f64,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        currency: String,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long)]
        target: Option<f64>,
        #[arg(long)]
        dividend: Option<f64>,
        #[arg(long, default_value = "")]
        dividend_date: String,
        #[arg(long, default_value = "")]
        comment: String,
    },

    /// Remove a holding by ticker (or exact company name)
    Remove { ticker: String },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Value => "value",
            Command::Advise { .. } => "advise",
            Command::Forecast { .. } => "forecast",
            Command::Record { .. } => "record",
            Command::History => "history",
            Command::Add { .. } => "add",
            Command::Remove { .. } => "remove",
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(&config, cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(config: &Config, command: Command) -> Result<()> {
    let source = commands::http_source(config)?;
    let mut tracker = Tracker::open(config, &source, command.name())?;

    match command {
        Command::Value => {
            let snapshot = tracker.value()?;
            print!("{snapshot}");
            print_exposure("CATEGORY", &snapshot.exposure_by_category());
            print_exposure("CURRENCY", &snapshot.exposure_by_currency());
            if !snapshot.issues().is_empty() {
                println!("\n{} row issue(s), see log", snapshot.issues().len());
            }
        }
        Command::Advise { capital, all } => {
            let recs = tracker.advise(capital)?;
            if all {
                for (rank, r) in recs.all().iter().enumerate() {
                    println!(
                        "{:>3}. {:<10} {:>7.2}% of {:>6.2}%  buy {:>12.2} {}",
                        rank + 1,
                        r.ticker,
                        round2(r.weight_pct),
                        r.target_weight_pct,
                        r.suggested_buy_reporting,
                        recs.reporting(),
                    );
                }
            } else {
                print!("{recs}");
            }
        }
        Command::Forecast { as_of } => {
            let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
            print!("{}", tracker.forecast(as_of)?);
        }
        Command::Record { period, amount } => {
            let period: Period = period.parse()?;
            let write = tracker.record(period, amount)?;
            let verb = if write.appended { "added" } else { "updated" };
            println!("{verb} {} = {:.2}", write.period, write.amount);
        }
        Command::History => {
            print!("{}", tracker.ledger()?);
        }
        Command::Add {
            ticker,
            name,
            shares,
            price,
            currency,
            category,
            target,
            dividend,
            dividend_date,
            comment,
        } => {
            let mut holding = Holding::new(&ticker, shares, price, &currency)
                .with_name(&name)
                .with_category(&category)
                .with_comment(&comment);
            if let Some(t) = target {
                holding = holding.with_target(t);
            }
            if let Some(d) = dividend {
                holding = holding.with_dividend(d, &dividend_date);
            }
            let change = tracker.add(holding)?;
            println!("{ticker}: {change:?}");
        }
        Command::Remove { ticker } => {
            let change = tracker.remove(&ticker)?;
            println!("removed row {}", change.index());
        }
    }
    Ok(())
}

fn print_exposure(title: &str, groups: &[Exposure]) {
    if groups.is_empty() {
        return;
    }
    println!("\n{:<16} {:>14} {:>8} {:>4}", title, "VALUE", "WEIGHT", "N");
    for g in groups {
        println!(
            "{:<16} {:>14.2} {:>7.2}% {:>4}",
            g.key,
            g.value_reporting,
            round2(g.weight_pct),
            g.holdings
        );
    }
}
