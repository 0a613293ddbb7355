//! Bridge into the application under test.
//!
//! Everything the harness does inside the page goes through [`ScriptHost`]:
//! one script evaluation per call, with the page's globals as the only
//! shared state.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::types::{CapturedLog, HarnessError, LogEvent};

/// Something that can run a script in the application's global scope.
pub trait ScriptHost {
    /// Evaluates `script` and returns its completion value (`null` when the
    /// script produced `undefined`). A thrown exception is an error.
    fn evaluate(&self, script: &str) -> Result<Value, HarnessError>;

    /// Waits for `delay` while the application keeps running.
    fn settle(&self, delay: Duration);
}

/// Raw output of one validation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRun {
    /// Return value of the entry point, not yet normalized.
    pub raw: Value,
    /// Console output emitted while the entry point ran.
    pub log: CapturedLog,
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    #[serde(default)]
    results: Value,
    #[serde(default)]
    logs: Vec<LogEvent>,
}

const ENSURE_LEAGUE_SCRIPT: &str = r"
(() => {
    if (typeof state !== 'undefined' && state.league && state.league.teams) {
        return false;
    }
    if (typeof createNewLeague !== 'function') {
        throw new Error('createNewLeague is not defined');
    }
    createNewLeague();
    return true;
})()
";

/// Builds the capture-and-run script for `num_games`.
///
/// The console wrappers are installed, the entry point called, and the
/// wrappers removed within one evaluation, so no output from the call can
/// be missed or reordered.
fn validation_script(num_games: u32) -> String {
    format!(
        r"
(() => {{
    if (typeof simulateValidation !== 'function') {{
        throw new Error('simulateValidation is not defined');
    }}
    const originalLog = console.log;
    const originalTable = console.table;
    const captured = [];

    console.log = function (...args) {{
        captured.push({{ type: 'log', msg: args.join(' ') }});
        originalLog.apply(console, args);
    }};
    console.table = function (data) {{
        captured.push({{ type: 'table', data: data === undefined ? null : data }});
        originalTable.apply(console, [data]);
    }};

    try {{
        const results = simulateValidation({num_games});
        return {{ results: results === undefined ? null : results, logs: captured }};
    }} finally {{
        console.log = originalLog;
        console.table = originalTable;
    }}
}})()
"
    )
}

/// Creates a league if the application has none yet.
///
/// Waits `settle` before checking (the app initializes asynchronously after
/// load) and again after the check so league creation can finish. Returns
/// whether a league was created.
pub fn ensure_league(host: &impl ScriptHost, settle: Duration) -> Result<bool, HarnessError> {
    host.settle(settle);

    let created = match host.evaluate(ENSURE_LEAGUE_SCRIPT)? {
        Value::Bool(created) => created,
        other => {
            return Err(HarnessError::Invocation(format!(
                "league check returned {other}, expected a boolean"
            )))
        }
    };
    if created {
        info!("no league found, created a new one");
    } else {
        debug!("league already initialized");
    }

    host.settle(settle);
    Ok(created)
}

/// Runs the application's validation entry point for `num_games` games.
pub fn run_validation(host: &impl ScriptHost, num_games: u32) -> Result<ValidationRun, HarnessError> {
    info!(num_games, "calling simulateValidation");

    let reply = host.evaluate(&validation_script(num_games))?;
    let reply: BridgeReply = serde_json::from_value(reply)
        .map_err(|e| HarnessError::Invocation(format!("unexpected bridge reply: {e}")))?;

    debug!(events = reply.logs.len(), "captured console output");

    Ok(ValidationRun {
        raw: reply.results,
        log: reply.logs,
    })
}
