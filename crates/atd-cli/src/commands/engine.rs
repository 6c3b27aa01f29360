//! Engine-only commands. No database, no venue.

use std::fs;

use anyhow::{Context, Result};
use atd_strategy::TickInput;
use tracing::warn;

/// Execute `atd decide --input <path>`: parse a tick input, print the
/// decision as pretty JSON.
pub fn decide_file(path: &str) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("read tick input failed: {path}"))?;
    // Strip UTF-8 BOM if present.
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);

    let input: TickInput =
        serde_json::from_slice(bytes).context("parse tick input json failed")?;
    input
        .config
        .validate()
        .context("tick input carries an invalid strategy config")?;

    let decision = atd_strategy::decide(&input);
    let json = serde_json::to_string_pretty(&decision).context("serialize decision failed")?;
    println!("{json}");
    Ok(())
}

/// Execute `atd parity`.
pub async fn parity() -> Result<()> {
    let battery = atd_testkit::parity_battery();
    let report = atd_testkit::run_parity(&battery).await;

    for (name, d) in &report.decisions {
        println!(
            "scenario={} action={} orders={}",
            name,
            d.action.as_str(),
            d.orders.len()
        );
    }
    for diff in &report.diffs {
        warn!(
            scenario = %diff.scenario,
            field = %diff.field,
            virtual_value = %diff.virtual_value,
            live_value = %diff.live_value,
            "parity diff"
        );
    }
    println!(
        "parity_scenarios={} parity_diffs={}",
        report.scenarios,
        report.diffs.len()
    );

    if !report.is_clean() {
        anyhow::bail!("PARITY FAILED: {} diff(s)", report.diffs.len());
    }
    Ok(())
}
