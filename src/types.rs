//! Common types for hoopsim-e2e.
//!
//! Defines the team statistics returned by the simulation, the captured
//! console output, and the harness error type.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// One of the twelve per-team statistics, in canonical report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stat {
    /// Points per game.
    Ppg,
    /// Field-goal attempts.
    Fga,
    /// Field-goal percentage (0-100).
    FgPct,
    /// Three-point attempts.
    Tpa,
    /// Three-point percentage (0-100).
    TpPct,
    /// Free-throw attempts.
    Fta,
    /// Free-throw percentage (0-100).
    FtPct,
    /// Rebounds per game.
    Rpg,
    /// Assists per game.
    Apg,
    /// Steals per game.
    Spg,
    /// Blocks per game.
    Bpg,
    /// Turnovers per game.
    Topg,
}

impl Stat {
    /// All statistics in canonical order.
    pub const ALL: [Self; 12] = [
        Self::Ppg,
        Self::Fga,
        Self::FgPct,
        Self::Tpa,
        Self::TpPct,
        Self::Fta,
        Self::FtPct,
        Self::Rpg,
        Self::Apg,
        Self::Spg,
        Self::Bpg,
        Self::Topg,
    ];

    /// Key used by the simulation when it returns this statistic.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Ppg => "PPG",
            Self::Fga => "FGA",
            Self::FgPct => "FG%",
            Self::Tpa => "3PA",
            Self::TpPct => "3P%",
            Self::Fta => "FTA",
            Self::FtPct => "FT%",
            Self::Rpg => "RPG",
            Self::Apg => "APG",
            Self::Spg => "SPG",
            Self::Bpg => "BPG",
            Self::Topg => "TOPG",
        }
    }

    pub const fn is_percentage(self) -> bool {
        matches!(self, Self::FgPct | Self::TpPct | Self::FtPct)
    }

    /// Position in [`Stat::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Aggregate statistics for one simulated team.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamStats {
    /// Display name.
    pub team: String,
    values: [f64; 12],
}

impl TeamStats {
    /// Builds a record from values given in [`Stat::ALL`] order.
    pub fn new(team: impl Into<String>, values: [f64; 12]) -> Self {
        Self {
            team: team.into(),
            values,
        }
    }

    pub const fn get(&self, stat: Stat) -> f64 {
        self.values[stat.index()]
    }

    #[cfg(test)]
    pub fn set(&mut self, stat: Stat, value: f64) {
        self.values[stat.index()] = value;
    }
}

/// Per-team results of one validation run, in the order the simulation
/// returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    teams: Vec<(String, TeamStats)>,
}

impl ResultSet {
    pub const fn new() -> Self {
        Self { teams: Vec::new() }
    }

    /// Adds a team, replacing any earlier record with the same id.
    pub fn insert(&mut self, id: impl Into<String>, stats: TeamStats) {
        let id = id.into();
        if let Some(slot) = self.teams.iter_mut().find(|(k, _)| *k == id) {
            slot.1 = stats;
        } else {
            self.teams.push((id, stats));
        }
    }

    pub fn get(&self, id: &str) -> Option<&TeamStats> {
        self.teams.iter().find(|(k, _)| k == id).map(|(_, s)| s)
    }

    #[cfg(test)]
    pub fn get_mut(&mut self, id: &str) -> Option<&mut TeamStats> {
        self.teams.iter_mut().find(|(k, _)| k == id).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TeamStats)> {
        self.teams.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

/// One intercepted console event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogEvent {
    /// A `console.log` line.
    #[serde(rename = "log")]
    Line { msg: String },
    /// A `console.table` payload.
    Table {
        #[serde(default)]
        data: serde_json::Value,
    },
}

/// Console output captured during the entry-point call, in emission order.
pub type CapturedLog = Vec<LogEvent>;

/// What was wrong with a statistic field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldProblem {
    Missing,
    NotNumeric(String),
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing"),
            Self::NotNumeric(found) => write!(f, "not numeric (found {found})"),
        }
    }
}

/// Errors that abort a harness run.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// The browser started but the entry document could not be opened.
    #[error("failed to open application: {0}")]
    Open(String),

    #[error("timed out after {waited:?} waiting for #{marker}")]
    Timeout { marker: String, waited: Duration },

    #[error("validation entry point failed: {0}")]
    Invocation(String),

    #[error("malformed stats for team {team}: field {field} is {problem}")]
    MalformedStats {
        team: String,
        field: String,
        problem: FieldProblem,
    },

    #[error("malformed stats for team {team}: expected a record, found {found}")]
    MalformedRecord { team: String, found: String },

    #[error("no results returned")]
    EmptyResult,

    #[error("invalid config: {0}")]
    Config(String),

    #[error("failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

impl HarnessError {
    /// Whether the error happened before a browser was running.
    pub const fn is_launch(&self) -> bool {
        matches!(self, Self::Launch(_) | Self::Config(_))
    }
}
