//! Acceptance bounds and range validation.
//!
//! Checks every statistic of every team against an inclusive `[min, max]`
//! bound. Validation is pure: the same inputs always give the same report.

use crate::types::{ResultSet, Stat};

/// Inclusive acceptance bound for one statistic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Both ends are in range.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        within_range(value, self.min, self.max)
    }
}

/// Checks `min <= value <= max`. NaN is never in range.
#[inline]
#[must_use]
pub fn within_range(value: f64, min: f64, max: f64) -> bool {
    min <= value && value <= max
}

/// Bounds for all twelve statistics, indexed in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeTable {
    bounds: [Range; 12],
}

/// Target ranges the simulation is tuned to.
pub const CANONICAL_RANGES: RangeTable = RangeTable {
    bounds: [
        Range::new(100.0, 125.0), // PPG
        Range::new(80.0, 95.0),   // FGA
        Range::new(47.0, 49.0),   // FG%
        Range::new(25.0, 40.0),   // 3PA
        Range::new(33.0, 36.0),   // 3P%
        Range::new(18.0, 30.0),   // FTA
        Range::new(76.0, 78.0),   // FT%
        Range::new(42.0, 55.0),   // RPG
        Range::new(20.0, 32.0),   // APG
        Range::new(6.0, 10.0),    // SPG
        Range::new(3.0, 7.0),     // BPG
        Range::new(11.0, 17.0),   // TOPG
    ],
};

impl RangeTable {
    pub const fn get(&self, stat: Stat) -> Range {
        self.bounds[stat.index()]
    }

    /// Iterates `(stat, range)` in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Stat, Range)> + '_ {
        Stat::ALL.iter().map(|&stat| (stat, self.get(stat)))
    }
}

/// Verdict for one statistic of one team.
#[derive(Debug, Clone, PartialEq)]
pub struct StatCheck {
    pub stat: Stat,
    pub value: f64,
    pub range: Range,
    pub in_range: bool,
}

/// Verdicts for every statistic of one team.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamVerdict {
    pub id: String,
    pub team: String,
    pub checks: Vec<StatCheck>,
}

impl TeamVerdict {
    pub fn all_in_range(&self) -> bool {
        self.checks.iter().all(|c| c.in_range)
    }

    pub fn out_of_range(&self) -> impl Iterator<Item = &StatCheck> {
        self.checks.iter().filter(|c| !c.in_range)
    }
}

/// Outcome of checking a result set against a range table.
#[derive(Debug, Clone, PartialEq)]
pub struct VerdictReport {
    /// True iff every (team, statistic) pair is in range and at least one
    /// team was checked.
    pub all_in_range: bool,
    pub teams: Vec<TeamVerdict>,
}

impl VerdictReport {
    pub fn failures(&self) -> usize {
        self.teams.iter().map(|t| t.out_of_range().count()).sum()
    }
}

/// Checks every statistic of every team against `table`.
#[must_use]
pub fn validate(results: &ResultSet, table: &RangeTable) -> VerdictReport {
    let teams: Vec<TeamVerdict> = results
        .iter()
        .map(|(id, stats)| TeamVerdict {
            id: id.to_string(),
            team: stats.team.clone(),
            checks: table
                .iter()
                .map(|(stat, range)| {
                    let value = stats.get(stat);
                    StatCheck {
                        stat,
                        value,
                        range,
                        in_range: range.contains(value),
                    }
                })
                .collect(),
        })
        .collect();

    let all_in_range = !teams.is_empty() && teams.iter().all(TeamVerdict::all_in_range);

    VerdictReport {
        all_in_range,
        teams,
    }
}
