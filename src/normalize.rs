//! Converts the raw value returned by the simulation into a [`ResultSet`].

use serde_json::Value;

use crate::types::{FieldProblem, HarnessError, ResultSet, Stat, TeamStats};

/// Normalizes a raw `{team_id: {team, PPG, FGA, ...}}` object.
///
/// Every team must carry a string `team` name and all twelve statistics as
/// numbers or numeric strings. The first problem found aborts the whole run.
pub fn normalize(raw: &Value) -> Result<ResultSet, HarnessError> {
    let teams = match raw {
        Value::Null => return Err(HarnessError::EmptyResult),
        Value::Array(items) if items.is_empty() => return Err(HarnessError::EmptyResult),
        Value::Object(map) => map,
        other => {
            return Err(HarnessError::Invocation(format!(
                "expected an object keyed by team, got {}",
                kind_of(other)
            )))
        }
    };

    let mut results = ResultSet::new();
    for (id, record) in teams {
        results.insert(id.clone(), normalize_team(id, record)?);
    }

    if results.is_empty() {
        return Err(HarnessError::EmptyResult);
    }

    Ok(results)
}

fn normalize_team(id: &str, record: &Value) -> Result<TeamStats, HarnessError> {
    let Some(fields) = record.as_object() else {
        return Err(HarnessError::MalformedRecord {
            team: id.to_string(),
            found: kind_of(record).to_string(),
        });
    };

    let name = match fields.get("team") {
        Some(Value::String(name)) => name.clone(),
        Some(other) => {
            return Err(HarnessError::MalformedRecord {
                team: id.to_string(),
                found: format!("a {} team name", kind_of(other)),
            })
        }
        None => {
            return Err(HarnessError::MalformedStats {
                team: id.to_string(),
                field: "team".to_string(),
                problem: FieldProblem::Missing,
            })
        }
    };

    let mut values = [0.0; 12];
    for stat in Stat::ALL {
        let value = fields.get(stat.key()).ok_or_else(|| HarnessError::MalformedStats {
            team: name.clone(),
            field: stat.key().to_string(),
            problem: FieldProblem::Missing,
        })?;
        values[stat.index()] = coerce(value).ok_or_else(|| HarnessError::MalformedStats {
            team: name.clone(),
            field: stat.key().to_string(),
            problem: FieldProblem::NotNumeric(describe(value)),
        })?;
    }

    Ok(TeamStats::new(name, values))
}

/// Coerces a JSON number or numeric string to a finite `f64`.
fn coerce(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        other => kind_of(other).to_string(),
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn alpha() -> Value {
        json!({
            "team": "Alpha",
            "PPG": 112.3, "FGA": 88, "FG%": "48.1", "3PA": 30, "3P%": "34.5",
            "FTA": 22, "FT%": "77.0", "RPG": 48, "APG": 25, "SPG": 8, "BPG": 5, "TOPG": 14
        })
    }

    #[test]
    fn normalizes_numbers_and_numeric_strings() {
        let results = normalize(&json!({ "T1": alpha() })).unwrap();
        let stats = results.get("T1").unwrap();
        assert_eq!(stats.team, "Alpha");
        assert!((stats.get(Stat::Ppg) - 112.3).abs() < f64::EPSILON);
        assert!((stats.get(Stat::FgPct) - 48.1).abs() < f64::EPSILON);
        assert!((stats.get(Stat::Topg) - 14.0).abs() < f64::EPSILON);
    }

    #[test]
    fn keeps_returned_team_order() {
        let mut beta = alpha();
        beta["team"] = json!("Beta");
        let results = normalize(&json!({ "z": alpha(), "a": beta })).unwrap();
        let ids: Vec<_> = results.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["z", "a"]);
    }

    #[test]
    fn missing_field_names_team_and_field() {
        let mut record = alpha();
        record.as_object_mut().unwrap().remove("TOPG");
        let err = normalize(&json!({ "T1": record })).unwrap_err();
        match err {
            HarnessError::MalformedStats { team, field, problem } => {
                assert_eq!(team, "Alpha");
                assert_eq!(field, "TOPG");
                assert_eq!(problem, FieldProblem::Missing);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn every_missing_field_is_rejected() {
        for stat in Stat::ALL {
            let mut record = alpha();
            record.as_object_mut().unwrap().remove(stat.key());
            let err = normalize(&json!({ "T1": record })).unwrap_err();
            assert!(
                matches!(&err, HarnessError::MalformedStats { field, .. } if field == stat.key()),
                "{stat}: {err}"
            );
        }
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let mut record = alpha();
        record["3P%"] = json!("n/a");
        let err = normalize(&json!({ "T1": record })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed stats for team Alpha: field 3P% is not numeric (found \"n/a\")"
        );

        let mut record = alpha();
        record["SPG"] = Value::Null;
        assert!(normalize(&json!({ "T1": record })).is_err());
    }

    #[test]
    fn missing_team_name_is_rejected() {
        let mut record = alpha();
        record.as_object_mut().unwrap().remove("team");
        let err = normalize(&json!({ "T7": record })).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::MalformedStats { ref team, ref field, .. } if team == "T7" && field == "team"
        ));
    }

    #[test]
    fn non_record_team_is_rejected() {
        let err = normalize(&json!({ "T1": 42 })).unwrap_err();
        assert!(matches!(err, HarnessError::MalformedRecord { .. }));
    }

    #[test]
    fn empty_or_absent_results_are_errors() {
        assert!(matches!(normalize(&json!({})), Err(HarnessError::EmptyResult)));
        assert!(matches!(normalize(&Value::Null), Err(HarnessError::EmptyResult)));
        assert!(matches!(normalize(&json!([])), Err(HarnessError::EmptyResult)));
        assert!(matches!(normalize(&json!([1, 2])), Err(HarnessError::Invocation(_))));
        assert!(matches!(normalize(&json!("T1")), Err(HarnessError::Invocation(_))));
    }
}
