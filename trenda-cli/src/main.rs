//! Trenda CLI: analysis, replay, trading lock, and config commands.
//!
//! Commands:
//! - `analyze`: one trend → AOI → entry pass at the current (or given) time
//! - `replay`: walk a historical period and report signals with a digest
//! - `generate`: write seeded synthetic candles as CSV for demos
//! - `lock status|create|clear`: inspect or change the trading lock
//! - `config`: print the effective configuration and its fingerprint

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trenda_core::domain::Timeframe;
use trenda_core::synthetic::{random_walk, WalkParams};
use trenda_runner::source::{csv_path, write_candles};
use trenda_runner::{
    replay, CandleSource, Clock, CsvSource, CycleContext, CycleReport, ExecutionGate, FileLock,
    JsonlSignalSink, LockStatus, MemoryAoiStore, MemoryPositionBook, MemoryTrendStore, ReplayClock,
    RunConfig, SyntheticSource, SystemClock, TradingLock, UnitOutcome,
};

#[derive(Parser)]
#[command(name = "trenda", about = "Trenda CLI: forex market-structure analysis")]
struct Cli {
    /// Path to a TOML run config. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one trend → AOI → entry pass.
    Analyze {
        /// Decision time (RFC 3339 or YYYY-MM-DD). Defaults to now.
        #[arg(long)]
        at: Option<String>,

        /// Use seeded synthetic candles instead of the data directory.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Replay a historical period.
    Replay {
        /// Start (RFC 3339 or YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// End, inclusive (RFC 3339 or YYYY-MM-DD).
        #[arg(long)]
        end: String,

        /// Use seeded synthetic candles instead of the data directory.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Write the full report as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write synthetic CSV candles for every configured symbol.
    Generate {
        /// Open time of the forming candle; data ends before it. Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Candles per timeframe.
        #[arg(long, default_value_t = 500)]
        count: usize,

        /// Output directory. Defaults to the configured data directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Trading lock management.
    Lock {
        #[command(subcommand)]
        action: LockAction,
    },
    /// Print the effective config and its fingerprint.
    Config,
}

#[derive(Subcommand)]
enum LockAction {
    /// Report whether trading is paused.
    Status,
    /// Pause trading.
    Create {
        #[arg(long)]
        reason: String,

        /// Expire after this many hours. Without it the lock holds until cleared.
        #[arg(long)]
        hours: Option<i64>,
    },
    /// Resume trading.
    Clear,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RunConfig::default(),
    };

    match cli.command {
        Commands::Analyze { at, synthetic } => run_analyze(&config, at.as_deref(), synthetic),
        Commands::Replay {
            start,
            end,
            synthetic,
            output,
        } => run_replay(&config, &start, &end, synthetic, output.as_deref()),
        Commands::Generate { end, count, out } => run_generate(&config, end.as_deref(), count, out),
        Commands::Lock { action } => run_lock(&config, action),
        Commands::Config => run_config(&config),
    }
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid time '{value}' (expected RFC 3339 or YYYY-MM-DD)"))?;
    match date.and_hms_opt(0, 0, 0) {
        Some(t) => Ok(t.and_utc()),
        None => bail!("invalid date '{value}'"),
    }
}

fn candle_source(config: &RunConfig, synthetic: bool) -> Box<dyn CandleSource> {
    if synthetic {
        Box::new(SyntheticSource::new(config.seed))
    } else {
        Box::new(CsvSource::new(&config.data_dir))
    }
}

fn run_analyze(config: &RunConfig, at: Option<&str>, synthetic: bool) -> Result<()> {
    let settings = config.settings_table()?;
    let gates = config.gates.build();
    let source = candle_source(config, synthetic);
    let trends = MemoryTrendStore::new();
    let zones = MemoryAoiStore::new();
    let sink = JsonlSignalSink::new(&config.signal_file);

    let replay_clock;
    let system_clock = SystemClock;
    let clock: &dyn Clock = match at {
        Some(value) => {
            replay_clock = ReplayClock::new(parse_time(value)?);
            &replay_clock
        }
        None => &system_clock,
    };

    let ctx = CycleContext {
        symbols: &config.symbols,
        settings: &settings,
        entry: &config.entry,
        gates: &gates,
        alignment: &config.alignment,
        entry_timeframe: config.entry_timeframe,
        source: source.as_ref(),
        trends: &trends,
        zones: &zones,
        sink: &sink,
        clock,
        parallel: config.parallel,
    };
    info!(symbols = config.symbols.len(), at = %clock.now(), "analysis pass");
    let reports = ctx.run_all(&config.trend_timeframes);
    for report in &reports {
        print_cycle(report);
    }

    let lock = FileLock::new(&config.lock_file);
    let positions = MemoryPositionBook::new();
    let gate = ExecutionGate::new(&lock, &positions);
    for report in &reports {
        for signal in report.signals() {
            let verdict = gate.admit(signal, clock.now())?;
            println!(
                "signal {} {} {} @ {:.5}  score {:.2}  quality {:.2} ({:?})  sl {:.2} ATR  tp {:.2} ATR  -> {:?}",
                signal.id,
                signal.symbol,
                signal.direction,
                signal.entry_price,
                signal.score.total,
                signal.score.quality.score,
                signal.score.quality.tier,
                signal.score.plan.sl_atr,
                signal.score.plan.tp_atr,
                verdict,
            );
        }
    }
    Ok(())
}

fn print_cycle(report: &CycleReport) {
    println!("{:?} {} @ {}", report.kind, report.timeframe, report.at);
    for unit in &report.units {
        let outcome = match &unit.outcome {
            UnitOutcome::TrendUpdated(t) => format!("trend {t}"),
            UnitOutcome::ZonesReplaced(n) => format!("{n} zones"),
            UnitOutcome::Signal(s) => format!("signal {}", s.id),
            UnitOutcome::Rejected(r) => format!("rejected by {}: {}", r.gate, r.reason),
            UnitOutcome::Failed(e) => format!("FAILED: {e}"),
            other => format!("{other:?}"),
        };
        println!("  {:<8} {outcome}", unit.symbol);
    }
}

fn run_replay(
    config: &RunConfig,
    start: &str,
    end: &str,
    synthetic: bool,
    output: Option<&Path>,
) -> Result<()> {
    let start = parse_time(start)?;
    let end = parse_time(end)?;
    if end < start {
        bail!("--end is before --start");
    }

    let settings = config.settings_table()?;
    let gates = config.gates.build();
    let source = candle_source(config, synthetic);
    let trends = MemoryTrendStore::new();
    let zones = MemoryAoiStore::new();
    let sink = JsonlSignalSink::new(&config.signal_file);
    let clock = ReplayClock::new(start);
    let ctx = CycleContext {
        symbols: &config.symbols,
        settings: &settings,
        entry: &config.entry,
        gates: &gates,
        alignment: &config.alignment,
        entry_timeframe: config.entry_timeframe,
        source: source.as_ref(),
        trends: &trends,
        zones: &zones,
        sink: &sink,
        clock: &clock,
        parallel: config.parallel,
    };

    let report = replay(&ctx, &config.trend_timeframes, start, end)?;
    println!("Replay {} → {}", report.start, report.end);
    println!("  steps:    {}", report.steps);
    println!("  cycles:   {}", report.cycles);
    println!("  failures: {}", report.failures);
    println!("  zones:    {}", report.zones_stored);
    println!("  signals:  {}", report.signals.len());
    println!("  digest:   {}", report.digest);
    println!("  config:   {}", config.fingerprint()?);
    for signal in &report.signals {
        println!(
            "  {} {} {} {} @ {:.5} score {:.2}",
            signal.signal_time, signal.id, signal.symbol, signal.direction, signal.entry_price, signal.score.total
        );
    }

    if let Some(path) = output {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn run_generate(config: &RunConfig, end: Option<&str>, count: usize, out: Option<PathBuf>) -> Result<()> {
    let end = match end {
        Some(value) => parse_time(value)?,
        None => Timeframe::D1.last_close(Utc::now()),
    };
    let dir = out.unwrap_or_else(|| config.data_dir.clone());
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    for symbol in &config.symbols {
        for tf in Timeframe::ALL {
            let candles = random_walk(config.seed, symbol, tf, end, count, &WalkParams::default());
            let path = csv_path(&dir, symbol, tf);
            let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
            write_candles(file, &candles)?;
            info!(symbol = %symbol, timeframe = %tf, rows = candles.len(), path = %path.display(), "wrote candles");
        }
    }
    println!(
        "Wrote {} symbols × {} timeframes to {}",
        config.symbols.len(),
        Timeframe::ALL.len(),
        dir.display()
    );
    Ok(())
}

fn run_lock(config: &RunConfig, action: LockAction) -> Result<()> {
    let lock = FileLock::new(&config.lock_file);
    let now = Utc::now();
    match action {
        LockAction::Status => match lock.status(now)? {
            LockStatus::Unlocked => println!("Trading allowed ({} not active)", lock.path().display()),
            LockStatus::Locked(record) => {
                println!("Trading PAUSED: {}", record.reason);
                println!("  since:   {}", record.created_at);
                match record.expires_at {
                    Some(exp) => println!("  expires: {exp}"),
                    None => println!("  expires: never (clear manually)"),
                }
            }
        },
        LockAction::Create { reason, hours } => {
            if matches!(hours, Some(h) if h <= 0) {
                bail!("--hours must be positive");
            }
            let expires_at = hours.map(|h| now + Duration::hours(h));
            lock.acquire(&reason, now, expires_at)?;
            println!("Trading paused: {reason}");
        }
        LockAction::Clear => {
            lock.release()?;
            println!("Trading lock cleared");
        }
    }
    Ok(())
}

fn run_config(config: &RunConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    println!();
    println!("# fingerprint: {}", config.fingerprint()?);
    Ok(())
}
