//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{
    BacktestConfig, BacktestEngine, BacktestResult, DEFAULT_COMMISSION_RATE,
    DEFAULT_INITIAL_CAPITAL, TRADING_DAYS_PER_YEAR,
};
use crate::domain::config_validation::{
    validate_config, DEFAULT_DAYS, DEFAULT_LONG_MA_PERIOD, DEFAULT_SHORT_MA_PERIOD,
    DEFAULT_SYMBOL,
};
use crate::domain::error::MacrossError;
use crate::domain::metrics::{format_pct, PerformanceMetrics};
use crate::domain::signal::{IndicatorRow, Signal, SignalEngine};
use crate::domain::trade_log::{TradeRecord, TradeType};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

/// Extra bars fetched beyond `days + long_window` so the MAs are warm.
pub const WARMUP_PADDING: usize = 10;

/// Number of trailing trades printed after a backtest.
pub const RECENT_TRADES: usize = 5;

/// Bars shown by `chart` when `--days` is not given.
pub const DEFAULT_CHART_DAYS: usize = 60;

#[derive(Parser, Debug)]
#[command(name = "macross", about = "Moving-average crossover signals and backtester")]
pub struct Cli {
    /// Log at DEBUG instead of INFO
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over the most recent bars of a symbol
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Trading days to simulate
        #[arg(long)]
        days: Option<usize>,
        /// Initial capital
        #[arg(long)]
        capital: Option<f64>,
        /// Directory for CSV reports
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Evaluate the crossover signal on the latest bar
    Signal {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Print close and both moving averages over the most recent bars
    Chart {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Bars to show
        #[arg(long, default_value_t = DEFAULT_CHART_DAYS)]
        days: usize,
        /// Directory to write chart.csv into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            symbol,
            days,
            capital,
            output,
        } => run_backtest(
            &config,
            &BacktestOverrides {
                symbol,
                days,
                capital,
                output,
            },
        ),
        Command::Signal { config, symbol } => run_signal(&config, symbol.as_deref()),
        Command::Chart {
            config,
            symbol,
            days,
            output,
        } => run_chart(&config, symbol.as_deref(), days, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct BacktestOverrides {
    pub symbol: Option<String>,
    pub days: Option<usize>,
    pub capital: Option<f64>,
    pub output: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, MacrossError> {
    info!(path = %path.display(), "loading config");
    let config = FileConfigAdapter::from_file(path)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn build_signal_engine(config: &dyn ConfigPort) -> Result<SignalEngine, MacrossError> {
    let short = config.get_int("strategy", "short_ma_period", DEFAULT_SHORT_MA_PERIOD);
    let long = config.get_int("strategy", "long_ma_period", DEFAULT_LONG_MA_PERIOD);
    SignalEngine::new(to_window("short_ma_period", short)?, to_window("long_ma_period", long)?)
}

fn to_window(name: &str, value: i64) -> Result<usize, MacrossError> {
    usize::try_from(value).map_err(|_| {
        MacrossError::invalid_parameter(name, format!("{value} is not a window length"))
    })
}

pub fn build_backtest_config(
    config: &dyn ConfigPort,
    capital_override: Option<f64>,
) -> Result<BacktestConfig, MacrossError> {
    let capital = capital_override.unwrap_or_else(|| {
        config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)
    });
    let commission = config.get_double("backtest", "commission_rate", DEFAULT_COMMISSION_RATE);
    let periods = config.get_double("backtest", "periods_per_year", TRADING_DAYS_PER_YEAR);

    BacktestConfig::new(capital, commission)?.with_periods_per_year(periods)
}

pub fn resolve_symbol(symbol_override: Option<&str>, config: &dyn ConfigPort) -> String {
    symbol_override
        .map(str::to_string)
        .or_else(|| {
            config
                .get_string("backtest", "symbol")
                .filter(|s| !s.trim().is_empty())
        })
        .unwrap_or_else(|| DEFAULT_SYMBOL.to_string())
}

pub fn resolve_days(
    days_override: Option<usize>,
    config: &dyn ConfigPort,
) -> Result<usize, MacrossError> {
    let days = match days_override {
        Some(d) => d,
        None => usize::try_from(config.get_int("backtest", "days", DEFAULT_DAYS)).unwrap_or(0),
    };
    if days == 0 {
        return Err(MacrossError::invalid_parameter("days", "must be at least 1"));
    }
    Ok(days)
}

pub fn resolve_output_dir(
    output_override: Option<&Path>,
    config: &dyn ConfigPort,
) -> Option<PathBuf> {
    output_override.map(Path::to_path_buf).or_else(|| {
        config
            .get_string("report", "output_dir")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    })
}

pub fn data_port_from_config(config: &dyn ConfigPort) -> Result<CsvAdapter, MacrossError> {
    let dir = config.require_string("data", "dir")?;
    Ok(CsvAdapter::new(PathBuf::from(dir)))
}

/// Fetch the window, run the simulation and compute metrics.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    engine: &BacktestEngine,
    symbol: &str,
    days: usize,
) -> Result<(BacktestResult, PerformanceMetrics), MacrossError> {
    let signal_engine = engine.signal_engine();
    let count = days
        .saturating_add(signal_engine.long_window())
        .saturating_add(WARMUP_PADDING);

    info!(symbol, count, "fetching bars");
    let bars = data_port.fetch_latest(symbol, count)?;
    if bars.is_empty() {
        return Err(MacrossError::NoData {
            symbol: symbol.to_string(),
        });
    }
    if bars.len() < signal_engine.min_bars() {
        return Err(MacrossError::InsufficientData {
            symbol: symbol.to_string(),
            bars: bars.len(),
            minimum: signal_engine.min_bars(),
        });
    }

    info!(
        symbol,
        bars = bars.len(),
        short = signal_engine.short_window(),
        long = signal_engine.long_window(),
        "running backtest"
    );
    let result = engine.run(&bars);
    let metrics = result
        .metrics()
        .ok_or_else(|| MacrossError::InsufficientData {
            symbol: symbol.to_string(),
            bars: bars.len(),
            minimum: signal_engine.min_bars(),
        })?;

    Ok((result, metrics))
}

fn run_backtest(config_path: &Path, overrides: &BacktestOverrides) -> Result<(), MacrossError> {
    let config = load_config(config_path)?;
    let signal_engine = build_signal_engine(&config)?;
    let bt_config = build_backtest_config(&config, overrides.capital)?;
    let symbol = resolve_symbol(overrides.symbol.as_deref(), &config);
    let days = resolve_days(overrides.days, &config)?;
    let data_port = data_port_from_config(&config)?;

    let engine = BacktestEngine::new(signal_engine, bt_config);
    let (result, metrics) = run_backtest_pipeline(&data_port, &engine, &symbol, days)?;
    let trades = result.trade_log();

    print!("{}", render_report(&symbol, &signal_engine, &metrics, &trades));

    if let Some(dir) = resolve_output_dir(overrides.output.as_deref(), &config) {
        CsvReportAdapter::new().write(&result, &metrics, &trades, &dir)?;
        println!("\nReport written to: {}", dir.display());
    }
    Ok(())
}

/// Console summary: metric rows, strategy vs benchmark, last few trades.
pub fn render_report(
    symbol: &str,
    engine: &SignalEngine,
    metrics: &PerformanceMetrics,
    trades: &[TradeRecord],
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "=== Backtest: {} ({}/{}) ===",
        symbol,
        engine.short_label(),
        engine.long_label()
    );
    for (name, value) in metrics.report_rows() {
        let _ = writeln!(out, "{:<18}{}", format!("{name}:"), value);
    }

    let benchmark_equity = metrics.initial_capital * (1.0 + metrics.benchmark_return);
    let verdict = if metrics.final_equity >= benchmark_equity {
        "outperformed"
    } else {
        "underperformed"
    };
    let _ = writeln!(
        out,
        "\nStrategy {} buy-and-hold: {:.2} vs {:.2}",
        verdict, metrics.final_equity, benchmark_equity
    );

    if !trades.is_empty() {
        let shown = trades.len().min(RECENT_TRADES);
        let _ = writeln!(out, "\n=== Last {} Trades ===", shown);
        for trade in &trades[trades.len() - shown..] {
            let pnl = match (trade.trade_type, trade.pnl_pct) {
                (TradeType::Sell, Some(pct)) => format_pct(pct),
                _ => "-".to_string(),
            };
            let _ = writeln!(
                out,
                "  {:<4}  {}  {:>10.2}  {:>8}",
                trade.trade_type.to_string(),
                trade.date.format("%Y-%m-%d"),
                trade.price,
                pnl
            );
        }
    }
    out
}

fn run_signal(config_path: &Path, symbol_override: Option<&str>) -> Result<(), MacrossError> {
    let config = load_config(config_path)?;
    let engine = build_signal_engine(&config)?;
    let symbol = resolve_symbol(symbol_override, &config);
    let data_port = data_port_from_config(&config)?;

    let count = engine.min_bars() + WARMUP_PADDING;
    info!(symbol = %symbol, count, "fetching bars");
    let bars = data_port.fetch_latest(&symbol, count)?;
    if bars.is_empty() {
        return Err(MacrossError::NoData { symbol });
    }

    let signal = engine.check_signal(&bars);
    print!("{}", render_signal(&symbol, &engine, &signal));
    Ok(())
}

/// Strategy status: one labelled row per field of the latest signal.
pub fn render_signal(symbol: &str, engine: &SignalEngine, signal: &Signal) -> String {
    let date = signal
        .date
        .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string());
    let rows = [
        ("Symbol".to_string(), symbol.to_string()),
        ("Date".to_string(), date),
        ("Price".to_string(), format!("{:.2}", signal.price)),
        (engine.short_label().to_string(), format!("{:.2}", signal.short_ma)),
        (engine.long_label().to_string(), format!("{:.2}", signal.long_ma)),
        ("Signal".to_string(), signal.signal_type.to_string()),
        ("Reason".to_string(), signal.reason.clone()),
    ];

    let mut out = format!("=== Strategy Status: {symbol} ===\n");
    for (name, value) in rows {
        let _ = writeln!(out, "{:<8}{}", format!("{name}:"), value);
    }
    out
}

/// The last `days` rows with both averages defined.
pub fn chart_rows(
    data_port: &dyn DataPort,
    engine: &SignalEngine,
    symbol: &str,
    days: usize,
) -> Result<Vec<IndicatorRow>, MacrossError> {
    if days == 0 {
        return Err(MacrossError::invalid_parameter("days", "must be at least 1"));
    }
    let count = days.saturating_add(engine.long_window());
    info!(symbol, count, "fetching bars");
    let bars = data_port.fetch_latest(symbol, count)?;
    if bars.is_empty() {
        return Err(MacrossError::NoData {
            symbol: symbol.to_string(),
        });
    }

    let mut rows: Vec<IndicatorRow> = engine
        .calculate_indicators(&bars)
        .into_iter()
        .filter(|row| row.mas().is_some())
        .collect();
    if rows.is_empty() {
        return Err(MacrossError::InsufficientData {
            symbol: symbol.to_string(),
            bars: bars.len(),
            minimum: engine.long_window(),
        });
    }
    let skip = rows.len().saturating_sub(days);
    rows.drain(..skip);
    Ok(rows)
}

pub fn render_chart(symbol: &str, engine: &SignalEngine, rows: &[IndicatorRow]) -> String {
    let mut out = format!("=== {symbol} Daily Chart ({} bars) ===\n", rows.len());
    let _ = writeln!(
        out,
        "{:<10}  {:>10}  {:>10}  {:>10}",
        "Date",
        "Close",
        engine.short_label().to_string(),
        engine.long_label().to_string()
    );
    for row in rows {
        let Some((short_ma, long_ma)) = row.mas() else {
            continue;
        };
        let _ = writeln!(
            out,
            "{}  {:>10.2}  {:>10.2}  {:>10.2}",
            row.bar.date.format("%Y-%m-%d"),
            row.bar.close,
            short_ma,
            long_ma
        );
    }
    out
}

fn run_chart(
    config_path: &Path,
    symbol_override: Option<&str>,
    days: usize,
    output: Option<&Path>,
) -> Result<(), MacrossError> {
    let config = load_config(config_path)?;
    let engine = build_signal_engine(&config)?;
    let symbol = resolve_symbol(symbol_override, &config);
    let data_port = data_port_from_config(&config)?;

    let rows = chart_rows(&data_port, &engine, &symbol, days)?;
    print!("{}", render_chart(&symbol, &engine, &rows));

    if let Some(dir) = output {
        let path = CsvReportAdapter::new().write_chart(&rows, &engine, dir)?;
        println!("\nChart written to: {}", path.display());
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), MacrossError> {
    let config = load_config(config_path)?;
    let engine = build_signal_engine(&config)?;
    let bt_config = build_backtest_config(&config, None)?;

    println!("Config valid: {}", config_path.display());
    println!("  symbol:           {}", resolve_symbol(None, &config));
    println!(
        "  windows:          {}/{}",
        engine.short_label(),
        engine.long_label()
    );
    println!("  initial capital:  {:.2}", bt_config.initial_capital());
    println!("  commission rate:  {}", bt_config.commission_rate());
    println!("  periods per year: {}", bt_config.periods_per_year());
    println!("  days:             {}", resolve_days(None, &config)?);
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), MacrossError> {
    let config = load_config(config_path)?;
    let data_port = data_port_from_config(&config)?;

    let symbols = data_port.list_symbols()?;
    if symbols.is_empty() {
        info!("no symbols found");
    }
    for symbol in &symbols {
        println!("{}", symbol);
    }
    info!(count = symbols.len(), "symbols listed");
    Ok(())
}

fn run_info(config_path: &Path, symbol: Option<&str>) -> Result<(), MacrossError> {
    let config = load_config(config_path)?;
    let data_port = data_port_from_config(&config)?;

    let symbols = match symbol {
        Some(s) => vec![s.to_string()],
        None => data_port.list_symbols()?,
    };

    for symbol in &symbols {
        match data_port.get_data_range(symbol)? {
            Some((first, last, count)) => {
                println!("{}: {} to {} ({} bars)", symbol, first, last, count)
            }
            None => println!("{}: no data", symbol),
        }
    }
    Ok(())
}
