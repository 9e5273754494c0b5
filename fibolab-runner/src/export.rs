//! Reporting and export: JSON, CSV, and Markdown artifacts.
//!
//! - **JSON**: the full [`BacktestReport`], round-trippable
//! - **CSV**: trade ledger and equity curve for external tools
//! - **Markdown**: single-run summary and multi-strategy comparison table

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fibolab_core::domain::ClosedTrade;
use fibolab_core::engine::RunResult;

use crate::runner::BacktestReport;

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

pub fn import_json(json: &str) -> Result<BacktestReport> {
    serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Trade ledger, one row per closed trade.
pub fn export_trades_csv(trades: &[ClosedTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_index",
        "entry_time",
        "entry_price",
        "exit_index",
        "exit_time",
        "exit_price",
        "shares",
        "stop_loss",
        "take_profit",
        "commission",
        "pnl",
        "pnl_pct",
        "bars_held",
        "exit_reason",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.entry_index.to_string(),
            &t.entry_time.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_index.to_string(),
            &t.exit_time.to_string(),
            &format!("{:.6}", t.exit_price),
            &format!("{:.6}", t.shares),
            &format!("{:.6}", t.stop_loss),
            &format!("{:.6}", t.take_profit),
            &format!("{:.2}", t.commission),
            &format!("{:.2}", t.pnl),
            &format!("{:.6}", t.pnl_pct),
            &t.bars_held().to_string(),
            t.exit_reason.as_str(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Equity curve as `timestamp,equity`, one row per bar.
///
/// The leading initial-capital point has no bar and is not written.
pub fn export_equity_csv(result: &RunResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "equity"])?;
    for (ts, eq) in result.equity_points() {
        wtr.write_record([&ts.to_string(), &format!("{:.2}", eq)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one run.
///
/// Creates `{strategy}_{timestamp}/` under `output_dir` containing
/// `report.json`, `trades.csv`, `equity.csv`, and `summary.md`. Returns the
/// created directory.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        report.strategy_name(),
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&report.result.trades)?)?;
    std::fs::write(run_dir.join("equity.csv"), export_equity_csv(&report.result)?)?;
    std::fs::write(run_dir.join("summary.md"), generate_report(report))?;

    Ok(run_dir)
}

pub fn load_artifacts(dir: &Path) -> Result<BacktestReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

pub fn generate_report(report: &BacktestReport) -> String {
    let r = &report.result;
    let m = &report.metrics;
    let mut md = String::with_capacity(1024);

    md.push_str(&format!("# Backtest Report: {}\n\n", r.strategy_name));

    md.push_str("## Run\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    if let (Some(first), Some(last)) = (r.timestamps.first(), r.timestamps.last()) {
        md.push_str(&format!("| Period | {} to {} |\n", first, last));
    }
    md.push_str(&format!("| Initial Capital | ${:.0} |\n", r.initial_capital));
    md.push_str(&format!("| Final Equity | ${:.2} |\n", r.final_equity));
    md.push_str(&format!(
        "| Bars | {} ({} warmup) |\n",
        r.bar_count, r.warmup_bars
    ));
    md.push_str(&format!(
        "| Signals | {} buy / {} sell |\n",
        r.signal_counts.buy, r.signal_counts.sell
    ));
    md.push_str(&format!(
        "| Rejected / Dropped | {} / {} |\n",
        r.rejections.len(),
        r.dropped_orders
    ));
    md.push('\n');

    md.push_str("## Performance\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Total Return | {:.2}% |\n", m.total_return * 100.0));
    md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe_ratio));
    md.push_str(&format!("| Sortino | {:.3} |\n", m.sortino_ratio));
    md.push_str(&format!("| Calmar | {:.3} |\n", m.calmar_ratio));
    md.push_str(&format!(
        "| Max Drawdown | {:.2}% ({} bars) |\n",
        m.max_drawdown * 100.0,
        m.max_drawdown_duration
    ));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate * 100.0));
    md.push_str(&format!("| Profit Factor | {} |\n", format_ratio(m.profit_factor)));
    md.push_str(&format!("| Expectancy | {:.2} |\n", m.expectancy));
    md.push_str(&format!(
        "| Trades | {} ({} W / {} L) |\n",
        m.total_trades, m.winning_trades, m.losing_trades
    ));
    md.push_str(&format!("| Avg Bars Held | {:.1} |\n", m.avg_bars_held));
    md.push_str(&format!("| Sharpe (Zeckendorf) | {:?} |\n", m.encoded_sharpe));
    md.push('\n');

    md
}

/// Side-by-side table of several runs, in the given order.
pub fn generate_comparison(reports: &[BacktestReport]) -> String {
    let mut md = String::with_capacity(256 + reports.len() * 128);
    md.push_str("# Strategy Comparison\n\n");
    md.push_str("| Strategy | Return | Sharpe | Max DD | Win Rate | Profit Factor | Trades |\n");
    md.push_str("| --- | --- | --- | --- | --- | --- | --- |\n");
    for report in reports {
        let m = &report.metrics;
        md.push_str(&format!(
            "| {} | {:.2}% | {:.3} | {:.2}% | {:.1}% | {} | {} |\n",
            report.strategy_name(),
            m.total_return * 100.0,
            m.sharpe_ratio,
            m.max_drawdown * 100.0,
            m.win_rate * 100.0,
            format_ratio(m.profit_factor),
            m.total_trades,
        ));
    }
    md
}

fn format_ratio(value: f64) -> String {
    if value.is_infinite() {
        "inf".to_string()
    } else {
        format!("{value:.2}")
    }
}
