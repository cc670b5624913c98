//! CLI definition and dispatch.

use chrono::FixedOffset;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::{write_enriched, CsvBarSource, CsvTradeLog};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::tracing_observer::TracingObserver;
use crate::domain::backtest::{run_backtest, run_tracks, BacktestResult, Track, TrackResult};
use crate::domain::bar::{validate_sequence, Bar};
use crate::domain::config_validation::{parse_session_time, parse_utc_offset, validate_strategy_config};
use crate::domain::error::ScalptraderError;
use crate::domain::indicator::{enrich, IndicatorParams};
use crate::domain::ledger::TradeLedger;
use crate::domain::position::{ExitReason, Side};
use crate::domain::strategy::{EntryRules, ExitRules, LockOffset, SessionWindow, StrategyConfig};
use crate::ports::bar_source::BarSource;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_UTC_OFFSET: &str = "+05:30";
pub const DEFAULT_TRADE_LOG: &str = "trade_log.csv";

#[derive(Parser, Debug)]
#[command(name = "scalptrader", about = "Intraday options scalping engine")]
pub struct Cli {
    /// Log level for scalptrader targets; RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
    LongCall,
    ShortPut,
}

impl From<SideArg> for Side {
    fn from(arg: SideArg) -> Self {
        match arg {
            SideArg::LongCall => Side::LongCall,
            SideArg::ShortPut => Side::ShortPut,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay one bar file through the engine
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long, default_value = DEFAULT_TRADE_LOG)]
        output: PathBuf,
        /// Only take entries on this side
        #[arg(long, value_enum)]
        side: Option<SideArg>,
    },
    /// Run the long-call track on call bars and the short-put track on put bars
    Tracks {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        call_data: PathBuf,
        #[arg(long)]
        put_data: PathBuf,
        #[arg(short, long, default_value = DEFAULT_TRADE_LOG)]
        output: PathBuf,
    },
    /// Validate a configuration and print the resolved values
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Write the enriched bar sequence as CSV to stdout
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(&cli.log_level);

    let result = match cli.command {
        Command::Backtest {
            config,
            data,
            output,
            side,
        } => run_backtest_file(&config, &data, &output, side.map(Side::from)).map(|result| {
            print_summary(&label_for(&data), &result.ledger);
        }),
        Command::Tracks {
            config,
            call_data,
            put_data,
            output,
        } => run_track_files(&config, &call_data, &put_data, &output).map(|results| {
            for track in &results {
                print_summary(track.side.label(), &track.result.ledger);
            }
            let combined = TradeLedger::merged(results.iter().map(|t| &t.result.ledger));
            print_summary("combined", &combined);
        }),
        Command::Validate { config } => run_validate(&config),
        Command::Indicators { config, data } => run_indicators(&config, &data),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Install the fmt subscriber on stderr. Safe to call more than once.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("scalptrader={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

/// Load, validate and build the strategy configuration in one step.
pub fn load_config(path: &Path) -> Result<(FileConfigAdapter, StrategyConfig), ScalptraderError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_strategy_config(&adapter)?;
    let config = build_strategy_config(&adapter)?;
    Ok((adapter, config))
}

fn usize_key(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, ScalptraderError> {
    let value = adapter.get_int(section, key, default as i64);
    usize::try_from(value)
        .map_err(|_| ScalptraderError::invalid(section, key, "must be a non-negative integer"))
}

pub fn build_strategy_config(adapter: &dyn ConfigPort) -> Result<StrategyConfig, ScalptraderError> {
    let defaults = StrategyConfig::default();

    let session = SessionWindow {
        entry_start: parse_session_time(adapter, "entry_start", defaults.session.entry_start)?,
        entry_end: parse_session_time(adapter, "entry_end", defaults.session.entry_end)?,
        force_exit: parse_session_time(adapter, "force_exit", defaults.session.force_exit)?,
    };

    let ind = &defaults.indicators;
    let warmup_override = match adapter.get_string("indicators", "warmup") {
        Some(_) => Some(usize_key(adapter, "indicators", "warmup", ind.warmup())?),
        None => None,
    };
    let indicators = IndicatorParams {
        ema_period: usize_key(adapter, "indicators", "ema_period", ind.ema_period)?,
        macd_fast: usize_key(adapter, "indicators", "macd_fast", ind.macd_fast)?,
        macd_slow: usize_key(adapter, "indicators", "macd_slow", ind.macd_slow)?,
        macd_signal: usize_key(adapter, "indicators", "macd_signal", ind.macd_signal)?,
        atr_period: usize_key(adapter, "indicators", "atr_period", ind.atr_period)?,
        warmup_override,
    };

    let e = EntryRules::default();
    let entry = EntryRules {
        macd_gap: adapter.get_double("entry", "macd_gap", e.macd_gap),
        min_atr_ratio: adapter.get_double("entry", "min_atr_ratio", e.min_atr_ratio),
        min_bar_strength: adapter
            .get_string("entry", "min_bar_strength")
            .map(|_| adapter.get_double("entry", "min_bar_strength", 0.0)),
        allow_macd_cross: adapter.get_bool("entry", "allow_macd_cross", e.allow_macd_cross),
    };

    let x = ExitRules::default();
    let lock_offset = if adapter.get_string("exit", "lock_offset_atr_mult").is_some() {
        LockOffset::AtrMultiple(adapter.get_double("exit", "lock_offset_atr_mult", 0.0))
    } else {
        LockOffset::Points(adapter.get_double("exit", "lock_offset_points", x.lock_offset.distance(0.0)))
    };
    let exit = ExitRules {
        initial_sl_atr_mult: adapter.get_double("exit", "initial_sl_atr_mult", x.initial_sl_atr_mult),
        take_profit_points: adapter.get_double("exit", "take_profit_points", x.take_profit_points),
        lock_offset,
        trail_floor_points: adapter.get_double("exit", "trail_floor_points", x.trail_floor_points),
        trail_atr_mult: adapter.get_double("exit", "trail_atr_mult", x.trail_atr_mult),
        tp1_only_label: adapter.get_bool("exit", "tp1_only_label", x.tp1_only_label),
    };

    let lot_size = adapter.get_int("contract", "lot_size", defaults.lot_size as i64);
    let lot_size = u32::try_from(lot_size)
        .map_err(|_| ScalptraderError::invalid("contract", "lot_size", "lot_size out of range"))?;

    Ok(StrategyConfig {
        session,
        indicators,
        entry,
        exit,
        lot_size,
    })
}

/// Offset applied to CSV timestamps written without one.
pub fn data_offset(adapter: &dyn ConfigPort) -> Result<FixedOffset, ScalptraderError> {
    let raw = adapter
        .get_string("data", "utc_offset")
        .unwrap_or_else(|| DEFAULT_UTC_OFFSET.to_string());
    parse_utc_offset(&raw)
        .ok_or_else(|| ScalptraderError::invalid("data", "utc_offset", "invalid offset, expected +HH:MM"))
}

fn label_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn load_bars(path: &Path, offset: FixedOffset) -> Result<Vec<Bar>, ScalptraderError> {
    let bars = CsvBarSource::new(path, offset).load_bars()?;
    tracing::info!(file = %path.display(), bars = bars.len(), "loaded bars");
    Ok(bars)
}

/// Backtest one bar file and append its trades to `output`.
pub fn run_backtest_file(
    config_path: &Path,
    data_path: &Path,
    output_path: &Path,
    side: Option<Side>,
) -> Result<BacktestResult, ScalptraderError> {
    let (adapter, config) = load_config(config_path)?;
    let bars = load_bars(data_path, data_offset(&adapter)?)?;
    tracing::info!(indicators = %config.indicators, "running backtest");

    let mut observer = TracingObserver::new(label_for(data_path));
    let result = run_backtest(&bars, &config, side, &mut observer)?;
    if let Some(position) = &result.open_position {
        tracing::warn!(
            side = %position.side,
            entry = position.entry_price,
            "data ended with an open position"
        );
    }

    let mut log = CsvTradeLog::open(output_path)?;
    log.record_all(result.ledger.trades())?;
    eprintln!(
        "Wrote {} trades to {}",
        result.ledger.count(),
        output_path.display()
    );
    Ok(result)
}

/// Run both tracks and append the combined trades, ordered by exit time.
pub fn run_track_files(
    config_path: &Path,
    call_path: &Path,
    put_path: &Path,
    output_path: &Path,
) -> Result<Vec<TrackResult>, ScalptraderError> {
    let (adapter, config) = load_config(config_path)?;
    let offset = data_offset(&adapter)?;

    let tracks = vec![
        Track {
            side: Side::LongCall,
            bars: load_bars(call_path, offset)?,
        },
        Track {
            side: Side::ShortPut,
            bars: load_bars(put_path, offset)?,
        },
    ];
    let results = run_tracks(&tracks, &config, |side| TracingObserver::new(side.label()))?;

    let combined = TradeLedger::merged(results.iter().map(|t| &t.result.ledger));
    let mut log = CsvTradeLog::open(output_path)?;
    log.record_all(combined.trades())?;
    eprintln!(
        "Wrote {} trades to {}",
        combined.count(),
        output_path.display()
    );
    Ok(results)
}

fn run_validate(config_path: &Path) -> Result<(), ScalptraderError> {
    let (adapter, config) = load_config(config_path)?;
    let offset = data_offset(&adapter)?;

    eprintln!("\nResolved configuration:");
    for line in describe_config(&config) {
        eprintln!("  {}", line);
    }
    eprintln!("  data utc_offset: {}", offset);
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_indicators(config_path: &Path, data_path: &Path) -> Result<(), ScalptraderError> {
    let (adapter, config) = load_config(config_path)?;
    let bars = load_bars(data_path, data_offset(&adapter)?)?;
    validate_sequence(&bars)?;
    let enriched = enrich(&bars, &config.indicators);
    write_enriched(std::io::stdout().lock(), &enriched)
}

/// Human-readable lines for the resolved configuration.
pub fn describe_config(config: &StrategyConfig) -> Vec<String> {
    let s = &config.session;
    let e = &config.entry;
    let x = &config.exit;
    vec![
        format!(
            "session: entries {}-{}, force exit {}",
            s.entry_start.format("%H:%M"),
            s.entry_end.format("%H:%M"),
            s.force_exit.format("%H:%M")
        ),
        format!("indicators: {}", config.indicators),
        format!(
            "entry: macd_gap {}, min_atr_ratio {}, bar strength {}, macd cross {}",
            e.macd_gap,
            e.min_atr_ratio,
            e.min_bar_strength
                .map(|v| v.to_string())
                .unwrap_or_else(|| "off".to_string()),
            if e.allow_macd_cross { "on" } else { "off" }
        ),
        format!(
            "exit: initial SL {} x ATR, TP {} pts, lock {}, trail max({} pts, {} x ATR)",
            x.initial_sl_atr_mult,
            x.take_profit_points,
            x.lock_offset,
            x.trail_floor_points,
            x.trail_atr_mult
        ),
        format!("contract: lot size {}", config.lot_size),
    ]
}

fn print_summary(label: &str, ledger: &TradeLedger) {
    let s = ledger.summary();
    eprintln!("\n=== {} ===", label);
    eprintln!("  Trades:        {}", s.total_trades);
    eprintln!("  Wins:          {} ({:.1}%)", s.wins, s.win_rate * 100.0);
    eprintln!("  Losses:        {}", s.losses);
    eprintln!("  Net P&L:       {:.2} ({:.2} pts)", s.net_pnl, s.net_points);
    eprintln!("  Profit factor: {:.2}", s.profit_factor);
    for reason in ExitReason::ALL {
        let count = s.count_for(reason);
        if count > 0 {
            eprintln!("  {:<15}{}", format!("{}:", reason), count);
        }
    }
}
