//! Console report for a validation run.
//!
//! Rendering only reads the results and verdict; the PASS/FAIL banner comes
//! straight from [`VerdictReport::all_in_range`].

use colored::Colorize;
use std::io::{self, Write};

use crate::ranges::{StatCheck, VerdictReport};
use crate::types::{CapturedLog, HarnessError, LogEvent, ResultSet};

pub const PASS_BANNER: &str = "✓ ALL STATS WITHIN RANGE - VALIDATION PASSED!";
pub const FAIL_BANNER: &str = "✗ SOME STATS OUT OF RANGE - TUNING NEEDED";

const RULE_WIDTH: usize = 80;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn target(check: &StatCheck) -> String {
    let unit = if check.stat.is_percentage() { "%" } else { "" };
    format!("{}-{}{unit}", check.range.min, check.range.max)
}

/// Writes the raw-stats section, the range-check section, and the banner.
pub fn render(
    out: &mut impl Write,
    results: &ResultSet,
    verdict: &VerdictReport,
    num_games: u32,
) -> io::Result<()> {
    writeln!(out, "{}", rule())?;
    writeln!(out, "VALIDATION TEST RESULTS - {num_games} GAME SIMULATION")?;
    writeln!(out, "{}", rule())?;
    writeln!(out)?;

    for team in &verdict.teams {
        let Some(stats) = results.get(&team.id) else {
            continue;
        };
        writeln!(out, "Team: {}", stats.team.bold())?;
        writeln!(out, "{}", "-".repeat(40))?;
        for check in &team.checks {
            let label = format!("{}:", check.stat);
            let value = format!("{:?}", stats.get(check.stat));
            writeln!(out, "  {label:<8}{value:<6} (Target: {})", target(check))?;
        }
        writeln!(out)?;
    }

    writeln!(out, "{}", rule())?;
    writeln!(out, "RANGE VALIDATION")?;
    writeln!(out, "{}", rule())?;

    for team in &verdict.teams {
        writeln!(out)?;
        writeln!(out, "{}:", team.team)?;
        for check in &team.checks {
            if check.in_range {
                writeln!(out, "  {} {}: {:?}", "✓".green(), check.stat, check.value)?;
            } else {
                writeln!(
                    out,
                    "  {} {}: {:?} (OUTSIDE {}-{})",
                    "✗".red(),
                    check.stat,
                    check.value,
                    check.range.min,
                    check.range.max
                )?;
            }
        }
    }

    writeln!(out)?;
    render_banner(out, verdict.all_in_range)
}

/// Writes the framed PASS or FAIL banner.
pub fn render_banner(out: &mut impl Write, all_in_range: bool) -> io::Result<()> {
    writeln!(out, "{}", rule())?;
    if all_in_range {
        writeln!(out, "{}", PASS_BANNER.green().bold())?;
    } else {
        writeln!(out, "{}", FAIL_BANNER.red().bold())?;
    }
    writeln!(out, "{}", rule())
}

/// Writes the short failure indicator for a fatal error.
pub fn render_failure(out: &mut impl Write, err: &HarnessError) -> io::Result<()> {
    writeln!(out, "{} Validation failed - {err}", "✗".red())
}

/// Echoes console output captured from the application.
pub fn render_captured(out: &mut impl Write, log: &CapturedLog) -> io::Result<()> {
    writeln!(out, "{}", rule())?;
    writeln!(out, "CAPTURED APP OUTPUT ({} events)", log.len())?;
    writeln!(out, "{}", rule())?;
    for event in log {
        match event {
            LogEvent::Line { msg } => writeln!(out, "{msg}")?,
            LogEvent::Table { data } => writeln!(out, "{} {data}", "[table]".dimmed())?,
        }
    }
    writeln!(out)
}
