//! The validation pipeline once the application is ready.
//!
//! League check, entry-point call, normalization, range checks, and the
//! report, in that order. Any error stops the run before later stages.

use colored::Colorize;
use serde_json::Value;
use std::io::Write;
use std::time::Duration;
use tracing::info;

use crate::bridge::{ensure_league, run_validation, ScriptHost};
use crate::normalize::normalize;
use crate::ranges::{validate, RangeTable, VerdictReport};
use crate::report::{render, render_captured};
use crate::types::HarnessError;

/// Options for [`run`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub num_games: u32,
    pub settle: Duration,
    /// Echo captured console output before the report.
    pub show_log: bool,
}

/// Drives a ready application through one validation run and reports it.
pub fn run(
    host: &impl ScriptHost,
    table: &RangeTable,
    options: &RunOptions,
    out: &mut impl Write,
) -> Result<VerdictReport, HarnessError> {
    ensure_league(host, options.settle)?;
    writeln!(out, "{} League initialized", "✓".green())?;

    writeln!(out)?;
    writeln!(
        out,
        "Running {}-game validation simulation...",
        options.num_games
    )?;
    writeln!(out)?;

    let run = run_validation(host, options.num_games)?;
    if options.show_log {
        render_captured(out, &run.log)?;
    }

    check_results(&run.raw, table, options.num_games, out)
}

/// Normalizes a raw result, checks it against `table`, and renders the
/// report. Nothing is rendered when normalization fails.
pub fn check_results(
    raw: &Value,
    table: &RangeTable,
    num_games: u32,
    out: &mut impl Write,
) -> Result<VerdictReport, HarnessError> {
    let results = normalize(raw)?;
    let verdict = validate(&results, table);
    info!(
        teams = verdict.teams.len(),
        failures = verdict.failures(),
        passed = verdict.all_in_range,
        "validation complete"
    );

    render(out, &results, &verdict, num_games)?;
    Ok(verdict)
}
