//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_adapter::SqliteAdapter;
use crate::adapters::text_report_adapter::{self, TextReportAdapter};
use crate::domain::accountant::{ReplayState, ReplayTrace};
use crate::domain::engine::Engine;
use crate::domain::error::BandcostError;
use crate::domain::instrument::{Instrument, InstrumentPatch};
use crate::domain::trade::{FundSource, Trade, TradeSide, DEFAULT_TRADE_FEE};
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "bandcost", about = "Negative-cost position strategy tracker")]
pub struct Cli {
    /// Path to the INI config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the replay trace while computing
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize the ledger database
    Init,
    /// Add a stock to track
    AddStock {
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        market: String,
        #[arg(long, default_value_t = 100)]
        target_shares: i64,
        #[arg(long, default_value_t = 0.0)]
        initial_investment: f64,
        /// Shares already held when tracking starts
        #[arg(long, default_value_t = 0)]
        shares: i64,
        /// Average cost of the pre-existing holding
        #[arg(long, default_value_t = 0.0)]
        avg_cost: f64,
        /// Fees already paid on the pre-existing holding
        #[arg(long, default_value_t = 0.0)]
        fees: f64,
        #[arg(long, default_value_t = 0.0)]
        price: f64,
    },
    /// Update a stock's mutable fields
    UpdateStock {
        code: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        market: Option<String>,
        #[arg(long)]
        target_shares: Option<i64>,
        #[arg(long)]
        initial_investment: Option<f64>,
        #[arg(long)]
        price: Option<f64>,
    },
    /// Remove a stock and its trade history
    RemoveStock { code: String },
    /// Record a trade
    AddTrade {
        code: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        side: String,
        #[arg(long)]
        shares: i64,
        #[arg(long)]
        price: f64,
        /// Defaults to [trading] default_fee from config
        #[arg(long)]
        fee: Option<f64>,
        /// Funding source: band, capital, or free text
        #[arg(long, default_value = "capital")]
        source: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Delete a trade by id
    DeleteTrade { id: i64 },
    /// List recorded trades
    ListTrades {
        #[arg(long)]
        code: Option<String>,
    },
    /// Set the extra fund pool
    SetFunds { amount: f64 },
    /// Show a stock or portfolio summary
    Summary {
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Generate strategy suggestions
    Suggest {
        #[arg(long)]
        json: bool,
    },
    /// Write the full text report
    Report {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import trades for a stock from CSV
    ImportTrades {
        code: String,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Export trades to CSV
    ExportTrades {
        #[arg(long)]
        code: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(cli.config.as_ref()) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let verbose = cli.verbose;

    match cli.command {
        Command::Init => run_init(&config),
        Command::AddStock {
            code,
            name,
            market,
            target_shares,
            initial_investment,
            shares,
            avg_cost,
            fees,
            price,
        } => run_add_stock(
            &config,
            Instrument {
                code: code.trim().to_uppercase(),
                name,
                market,
                target_shares,
                initial_investment,
                seed_shares: shares,
                seed_avg_cost: avg_cost,
                seed_fees: fees,
                last_price: price,
            },
        ),
        Command::UpdateStock {
            code,
            name,
            market,
            target_shares,
            initial_investment,
            price,
        } => run_update_stock(
            &config,
            &code.trim().to_uppercase(),
            InstrumentPatch {
                name,
                market,
                target_shares,
                initial_investment,
                last_price: price,
            },
        ),
        Command::RemoveStock { code } => run_remove_stock(&config, &code.trim().to_uppercase()),
        Command::AddTrade {
            code,
            date,
            side,
            shares,
            price,
            fee,
            source,
            notes,
        } => run_add_trade(
            &config,
            &code.trim().to_uppercase(),
            &date,
            &side,
            shares,
            price,
            fee,
            &source,
            notes,
        ),
        Command::DeleteTrade { id } => run_delete_trade(&config, id),
        Command::ListTrades { code } => {
            run_list_trades(&config, code.map(|c| c.trim().to_uppercase()).as_deref())
        }
        Command::SetFunds { amount } => run_set_funds(&config, amount),
        Command::Summary { code, json } => run_summary(
            &config,
            code.map(|c| c.trim().to_uppercase()).as_deref(),
            json,
            verbose,
        ),
        Command::Suggest { json } => run_suggest(&config, json, verbose),
        Command::Report { output } => run_report(&config, output.as_ref(), verbose),
        Command::ImportTrades { code, csv } => {
            run_import_trades(&config, &code.trim().to_uppercase(), &csv)
        }
        Command::ExportTrades { code, output } => run_export_trades(
            &config,
            code.map(|c| c.trim().to_uppercase()).as_deref(),
            &output,
        ),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, ExitCode> {
    match path {
        Some(p) => FileConfigAdapter::from_file(p).map_err(|e| {
            let err = BandcostError::ConfigParse {
                file: p.display().to_string(),
                reason: e.to_string(),
            };
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }),
        None => Ok(FileConfigAdapter::empty()),
    }
}

fn open_ledger(config: &dyn ConfigPort) -> Result<SqliteAdapter, BandcostError> {
    let adapter = SqliteAdapter::from_config(config)?;
    adapter.initialize_schema()?;
    Ok(adapter)
}

fn fail(err: &BandcostError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

/// Replay trace wired to stderr for `--verbose` runs.
struct StderrTrace;

impl ReplayTrace for StderrTrace {
    fn trade_applied(&self, trade: &Trade, state: &ReplayState) {
        eprintln!(
            "  {} {} {} x {:.2} fee {:.2} -> shares {}, profit {:.2}, band {:.2}",
            trade.date,
            trade.side,
            trade.shares,
            trade.price,
            trade.fee,
            state.current_shares,
            state.total_profit,
            state.band_profit,
        );
    }
}

static STDERR_TRACE: StderrTrace = StderrTrace;

fn build_engine(ledger: &SqliteAdapter, verbose: bool) -> Engine<'_> {
    if verbose {
        Engine::with_trace(ledger, &STDERR_TRACE)
    } else {
        Engine::new(ledger)
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to encode JSON: {e}");
            ExitCode::from(1)
        }
    }
}

fn run_init(config: &dyn ConfigPort) -> ExitCode {
    match open_ledger(config) {
        Ok(_) => {
            eprintln!("Ledger schema initialized");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_add_stock(config: &dyn ConfigPort, instrument: Instrument) -> ExitCode {
    let ledger = match open_ledger(config) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };

    match ledger.add_instrument(&instrument) {
        Ok(()) => {
            eprintln!("Added {} ({})", instrument.code, instrument.name);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_update_stock(config: &dyn ConfigPort, code: &str, patch: InstrumentPatch) -> ExitCode {
    if patch.is_empty() {
        eprintln!("error: nothing to update (pass at least one field)");
        return ExitCode::from(2);
    }

    let ledger = match open_ledger(config) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };

    match ledger.update_instrument(code, &patch) {
        Ok(()) => {
            eprintln!("Updated {code}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_remove_stock(config: &dyn ConfigPort, code: &str) -> ExitCode {
    let ledger = match open_ledger(config) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };

    match ledger.remove_instrument(code) {
        Ok(()) => {
            eprintln!("Removed {code} and its trade history");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_add_trade(
    config: &dyn ConfigPort,
    code: &str,
    date: &str,
    side: &str,
    shares: i64,
    price: f64,
    fee: Option<f64>,
    source: &str,
    notes: String,
) -> ExitCode {
    let date = match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => {
            eprintln!("error: invalid date {date:?} (expected YYYY-MM-DD)");
            return ExitCode::from(4);
        }
    };
    let side: TradeSide = match side.parse() {
        Ok(s) => s,
        Err(e) => return fail(&BandcostError::from(e)),
    };
    let fee = fee.unwrap_or_else(|| config.get_double("trading", "default_fee", DEFAULT_TRADE_FEE));

    let trade = Trade {
        id: 0,
        code: code.to_string(),
        date,
        side,
        shares,
        price,
        fee,
        fund_source: FundSource::parse(source),
        notes,
    };

    let ledger = match open_ledger(config) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };

    match ledger.add_trade(&trade) {
        Ok(id) => {
            eprintln!(
                "Recorded trade {id}: {} {} {} @ {:.2}",
                trade.side, trade.shares, trade.code, trade.price
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_delete_trade(config: &dyn ConfigPort, id: i64) -> ExitCode {
    let ledger = match open_ledger(config) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };

    match ledger.delete_trade(id) {
        Ok(()) => {
            eprintln!("Deleted trade {id}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn collect_trades(
    ledger: &SqliteAdapter,
    code: Option<&str>,
) -> Result<Vec<Trade>, BandcostError> {
    match code {
        Some(code) => {
            if ledger.get_instrument(code)?.is_none() {
                return Err(BandcostError::UnknownInstrument { code: code.into() });
            }
            ledger.get_trades(code)
        }
        None => {
            let mut all = Vec::new();
            for instrument in ledger.list_instruments()? {
                all.extend(ledger.get_trades(&instrument.code)?);
            }
            Ok(all)
        }
    }
}

fn run_list_trades(config: &dyn ConfigPort, code: Option<&str>) -> ExitCode {
    let ledger = match open_ledger(config) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };

    let trades = match collect_trades(&ledger, code) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    if trades.is_empty() {
        eprintln!("No trades recorded");
        return ExitCode::SUCCESS;
    }

    for trade in &trades {
        println!(
            "{:>4}  {}  {:4}  {:>6} {} @ {:.2}  fee {:.2}  [{}]  {}",
            trade.id,
            trade.date,
            trade.side,
            trade.shares,
            trade.code,
            trade.price,
            trade.fee,
            trade.fund_source,
            trade.notes,
        );
    }
    eprintln!("{} trades", trades.len());
    ExitCode::SUCCESS
}

fn run_set_funds(config: &dyn ConfigPort, amount: f64) -> ExitCode {
    let ledger = match open_ledger(config) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };

    match ledger.set_extra_funds(amount) {
        Ok(()) => {
            eprintln!("Fund pool set to ${amount:.2}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_summary(config: &dyn ConfigPort, code: Option<&str>, json: bool, verbose: bool) -> ExitCode {
    let ledger = match open_ledger(config) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };
    let engine = build_engine(&ledger, verbose);

    match code {
        Some(code) => {
            let summary = match engine.summarize_instrument(code) {
                Ok(Some(s)) => s,
                Ok(None) => return fail(&BandcostError::UnknownInstrument { code: code.into() }),
                Err(e) => return fail(&e),
            };
            if json {
                return print_json(&summary);
            }
            println!("{code}");
            println!("  shares:        {}", summary.current_shares);
            println!("  avg cost:      ${:.2}", summary.avg_cost);
            println!("  total cost:    ${:.2}", summary.total_cost);
            println!("  total fees:    ${:.2}", summary.total_fees);
            println!("  total profit:  ${:.2}", summary.total_profit);
            println!("  band profit:   ${:.2}", summary.band_profit);
            ExitCode::SUCCESS
        }
        None => {
            let portfolio = match engine.summarize_portfolio() {
                Ok(p) => p,
                Err(e) => return fail(&e),
            };
            if json {
                return print_json(&portfolio);
            }
            print!("{}", text_report_adapter::render(&portfolio, &[]));
            ExitCode::SUCCESS
        }
    }
}

fn run_suggest(config: &dyn ConfigPort, json: bool, verbose: bool) -> ExitCode {
    let ledger = match open_ledger(config) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };
    let engine = build_engine(&ledger, verbose);

    let suggestions = match engine.generate_suggestions() {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if json {
        return print_json(&suggestions);
    }

    if suggestions.is_empty() {
        eprintln!("No instruments tracked yet");
        return ExitCode::SUCCESS;
    }

    for bundle in &suggestions {
        println!("{} ({})", bundle.code, bundle.name);
        println!("  price:         {}", bundle.price.advice);
        println!("  holding:       {}", bundle.accumulation.action);
        println!("  band:          {}", bundle.band.advice);
        println!("  funding:       {}", bundle.funding.advice);
        println!("  negative cost: {}", bundle.negative_cost.advice);
        println!("  timeline:      {}", bundle.completion);
        for (i, step) in bundle.action_steps.iter().enumerate() {
            println!("  {}. {}", i + 1, step);
        }
        println!();
    }
    ExitCode::SUCCESS
}

fn run_report(config: &dyn ConfigPort, output: Option<&PathBuf>, verbose: bool) -> ExitCode {
    let ledger = match open_ledger(config) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };
    let engine = build_engine(&ledger, verbose);

    let portfolio = match engine.summarize_portfolio() {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let suggestions = crate::domain::advisor::generate_suggestions(&portfolio);

    let output = output.cloned().unwrap_or_else(|| {
        PathBuf::from(
            config
                .get_string("report", "output_path")
                .unwrap_or_else(|| "report.txt".to_string()),
        )
    });

    match TextReportAdapter.write(&portfolio, &suggestions, &output) {
        Ok(()) => {
            eprintln!("Report written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_import_trades(config: &dyn ConfigPort, code: &str, csv_path: &PathBuf) -> ExitCode {
    let default_fee = config.get_double("trading", "default_fee", DEFAULT_TRADE_FEE);

    let trades = match csv_adapter::import_trades(csv_path, code, default_fee) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    let ledger = match open_ledger(config) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };

    for trade in &trades {
        if let Err(e) = ledger.add_trade(trade) {
            return fail(&e);
        }
    }

    eprintln!("Imported {} trades for {code}", trades.len());
    ExitCode::SUCCESS
}

fn run_export_trades(config: &dyn ConfigPort, code: Option<&str>, output: &PathBuf) -> ExitCode {
    let ledger = match open_ledger(config) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };

    let trades = match collect_trades(&ledger, code) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    match csv_adapter::export_trades(output, &trades) {
        Ok(()) => {
            eprintln!("Exported {} trades to {}", trades.len(), output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}
