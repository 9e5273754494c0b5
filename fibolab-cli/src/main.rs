//! Fibolab CLI: run, compare, grid, and level inspection commands.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file or a named strategy
//! - `compare`: run every strategy over the same bars in parallel
//! - `grid`: search Retracement entry-level combinations
//! - `levels price|zeckendorf|time`: inspect the Fibonacci/Lucas level encoder

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fibolab_core::levels::{price_to_ticks, zeckendorf, LevelEncoder};
use fibolab_core::strategy::Retracement;
use fibolab_runner::export::{generate_comparison, save_artifacts};
use fibolab_runner::{
    best_by_sharpe, compare, default_level_grid, grid_search_retracement, run_single,
    submit_if_qualified, BacktestConfig, BacktestReport, CommandSink, RunSettings, StrategyConfig,
};

#[derive(Parser)]
#[command(name = "fibolab", about = "Fibolab CLI: Fibonacci-level backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every backtesting command.
#[derive(clap::Args)]
struct DataArgs {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV with timestamp, open, high, low, close, volume. Overrides the config's data source.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Synthetic series seed, used when no CSV is given.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one backtest.
    Run {
        #[command(flatten)]
        data: DataArgs,

        /// Strategy: retracement, momentum, mean_reversion, breakout. Overrides the config.
        #[arg(long)]
        strategy: Option<String>,

        /// Write report.json, trades.csv, equity.csv, summary.md under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Hand a qualifying run to the configured learning command.
        #[arg(long, default_value_t = false)]
        learn: bool,
    },
    /// Run every strategy with default parameters over the same bars.
    Compare {
        #[command(flatten)]
        data: DataArgs,

        /// Write comparison.md under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Search Retracement entry-level combinations.
    Grid {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Inspect the level encoder.
    Levels {
        #[command(subcommand)]
        action: LevelsAction,
    },
}

#[derive(Subcommand)]
enum LevelsAction {
    /// Fibonacci index, support and resistance around a price.
    Price {
        price: f64,

        /// Ticks per price unit (100 = cents).
        #[arg(long, default_value_t = 100)]
        ticks: u32,

        /// Levels on each side.
        #[arg(long, default_value_t = 3)]
        levels: usize,
    },
    /// Zeckendorf representation of a non-negative integer.
    Zeckendorf { value: i128 },
    /// Lucas time index and next equilibrium for a number of elapsed units.
    Time { units: i64 },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            strategy,
            output_dir,
            learn,
        } => run_backtest_cmd(data, strategy, output_dir, learn),
        Commands::Compare { data, output_dir } => run_compare_cmd(data, output_dir),
        Commands::Grid { data } => run_grid_cmd(data),
        Commands::Levels { action } => run_levels_cmd(action),
    }
}

fn load_config(data: &DataArgs) -> Result<BacktestConfig> {
    let mut config = match &data.config {
        Some(path) => BacktestConfig::from_file(path)?,
        None => BacktestConfig::default(),
    };
    if let Some(csv) = &data.csv {
        config.data.csv = Some(csv.clone());
    }
    if let Some(seed) = data.seed {
        config.data.synthetic.seed = seed;
    }
    tracing::debug!(path = ?data.config, csv = ?config.data.csv, "config resolved");
    Ok(config)
}

fn run_backtest_cmd(
    data: DataArgs,
    strategy: Option<String>,
    output_dir: Option<PathBuf>,
    learn: bool,
) -> Result<()> {
    let mut config = load_config(&data)?;
    if let Some(name) = strategy {
        config.strategy = StrategyConfig::from_name(&name)?;
    }
    let bars = config.data.load().context("failed to load bars")?;
    let report = run_single(&config, &bars)?;

    print_summary(&report);

    if learn {
        let Some(sink) = CommandSink::from_config(&config.learning) else {
            bail!("--learn requires [learning] command in the config");
        };
        match submit_if_qualified(&sink, &report, &config.learning) {
            Some(record) => println!("Stored in learning sink (verdict {:.3})", record.verdict),
            None => println!("Run did not qualify for the learning sink"),
        }
    }

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&report, &dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_compare_cmd(data: DataArgs, output_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config(&data)?;
    let bars = config.data.load().context("failed to load bars")?;
    let reports = compare(
        &StrategyConfig::all_defaults(),
        &bars,
        &RunSettings::from_config(&config),
    )?;

    println!(
        "{:<16} {:>10} {:>8} {:>10} {:>9} {:>7}",
        "Strategy", "Return", "Sharpe", "Max DD", "Win Rate", "Trades"
    );
    println!("{}", "-".repeat(65));
    for r in &reports {
        let m = &r.metrics;
        println!(
            "{:<16} {:>9.2}% {:>8.3} {:>9.2}% {:>8.1}% {:>7}",
            r.strategy_name(),
            m.total_return * 100.0,
            m.sharpe_ratio,
            m.max_drawdown * 100.0,
            m.win_rate * 100.0,
            m.total_trades
        );
    }

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join("comparison.md");
        std::fs::write(&path, generate_comparison(&reports))?;
        println!("Comparison saved to: {}", path.display());
    }
    Ok(())
}

fn run_grid_cmd(data: DataArgs) -> Result<()> {
    let config = load_config(&data)?;
    let base = match &config.strategy {
        StrategyConfig::Retracement(r) => r.clone(),
        _ => Retracement::default(),
    };
    let bars = config.data.load().context("failed to load bars")?;
    let points = grid_search_retracement(
        &base,
        &default_level_grid(),
        &bars,
        &RunSettings::from_config(&config),
    )?;

    println!("{:<36} {:>10} {:>8} {:>7}", "Levels", "Return", "Sharpe", "Trades");
    println!("{}", "-".repeat(64));
    for p in &points {
        println!(
            "{:<36} {:>9.2}% {:>8.3} {:>7}",
            format!("{:?}", p.levels),
            p.metrics.total_return * 100.0,
            p.metrics.sharpe_ratio,
            p.metrics.total_trades
        );
    }
    if let Some(best) = best_by_sharpe(&points) {
        println!();
        println!("Best by Sharpe: {:?}", best.levels);
    }
    Ok(())
}

fn run_levels_cmd(action: LevelsAction) -> Result<()> {
    let encoder = LevelEncoder::shared();
    match action {
        LevelsAction::Price {
            price,
            ticks,
            levels,
        } => {
            let ticks_value = price_to_ticks(price, ticks)?;
            let index = encoder.encode_price(ticks_value);
            let (support, resistance) = encoder.support_resistance(ticks_value, levels);
            let scale = f64::from(ticks);
            let fmt = |v: &[u128]| {
                v.iter()
                    .map(|t| format!("{:.2}", *t as f64 / scale))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!("Price:      {price} ({ticks_value} ticks)");
            println!("Index:      F({index})");
            println!("Support:    {}", fmt(&support));
            println!("Resistance: {}", fmt(&resistance));
        }
        LevelsAction::Zeckendorf { value } => {
            let indices = zeckendorf::compress(value)?;
            let terms: Vec<String> = indices
                .iter()
                .map(|&i| encoder.fibonacci(i).map(|f| f.to_string()))
                .collect::<Result<_, _>>()?;
            println!("{value} = {}", terms.join(" + "));
            println!("Indices: {indices:?}");
        }
        LevelsAction::Time { units } => {
            let index = encoder.encode_time(units);
            println!("Lucas index:  L({index})");
            println!("Equilibrium:  {}", encoder.is_equilibrium(index));
            match encoder.next_equilibrium(units) {
                Some(next) => println!("Next equilibrium: {next}"),
                None => println!("Next equilibrium: none within table"),
            }
        }
    }
    Ok(())
}

fn print_summary(report: &BacktestReport) {
    let r = &report.result;
    let m = &report.metrics;
    println!("=== Backtest: {} ===", r.strategy_name);
    println!("Bars:           {} ({} warmup)", r.bar_count, r.warmup_bars);
    println!("Initial:        ${:.2}", r.initial_capital);
    println!("Final equity:   ${:.2}", r.final_equity);
    println!("Total return:   {:.2}%", m.total_return * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe_ratio);
    println!("Sortino:        {:.3}", m.sortino_ratio);
    println!("Max drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Win rate:       {:.1}%", m.win_rate * 100.0);
    if m.profit_factor.is_infinite() {
        println!("Profit factor:  inf");
    } else {
        println!("Profit factor:  {:.2}", m.profit_factor);
    }
    println!(
        "Trades:         {} ({} rejected, {} dropped)",
        m.total_trades,
        r.rejections.len(),
        r.dropped_orders
    );
}
