//! Transition evaluator: maps a node's transition string to a next
//! task id using typed operators plus a `default` tie-break.

use serde::{Deserialize, Serialize};

use crate::errors::RunnerError;

/// Comparison operator a [`Branch`] evaluates against the transition string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    #[serde(rename = ">", alias = "gt")]
    Gt,
    #[serde(rename = "<", alias = "lt")]
    Lt,
    InRange,
    Default,
}

/// One routing rule on a task's `transition.branches` list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Branch {
    pub operator: Operator,
    /// Comparison operand; unused by `Default`. For `InRange` this is
    /// `"lo-hi"`.
    #[serde(default)]
    pub when: String,
    /// Target task id, or the reserved terminal `"end"`.
    pub goto: String,
}

/// Evaluates `branches` against `transition` per the declared order,
/// excluding `Default` branches from the first pass:
///
/// 1. The first non-`default` branch whose operator matches wins.
/// 2. If none matched, the first `default` branch's `goto` wins.
/// 3. If neither yields a target, fails [`RunnerError::NoMatchingTransition`].
///
/// Parse failures in numeric/range operators are surfaced to the caller
/// (as a `Result::Err` variant distinct from "no match") rather than
/// silently falling through to `default`.
pub fn next(task_id: &str, branches: &[Branch], transition: &str) -> Result<String, RunnerError> {
    for branch in branches.iter().filter(|b| b.operator != Operator::Default) {
        if matches(task_id, branch.operator, &branch.when, transition)? {
            return Ok(branch.goto.clone());
        }
    }
    if let Some(branch) = branches.iter().find(|b| b.operator == Operator::Default) {
        return Ok(branch.goto.clone());
    }
    Err(RunnerError::NoMatchingTransition {
        task_id: task_id.to_string(),
        transition: transition.to_string(),
    })
}

fn matches(task_id: &str, operator: Operator, when: &str, transition: &str) -> Result<bool, RunnerError> {
    match operator {
        Operator::Equals => Ok(transition == when),
        Operator::Contains => Ok(transition.contains(when)),
        Operator::StartsWith => Ok(transition.starts_with(when)),
        Operator::EndsWith => Ok(transition.ends_with(when)),
        Operator::Gt => Ok(parse_number(task_id, when)? > parse_number(task_id, transition)?),
        Operator::Lt => Ok(parse_number(task_id, when)? < parse_number(task_id, transition)?),
        Operator::InRange => {
            let (lo, hi) = parse_range_bounds(task_id, when)?;
            let x = parse_number(task_id, transition)?;
            Ok(lo <= x && x <= hi)
        }
        Operator::Default => Ok(false),
    }
}

/// Note: operator semantics compare `transition OP when` for `Gt`/`Lt`
/// (transition is the subject); parsing int first, falling back to float.
/// A parse failure here is a distinct outcome from "no branch matched" —
/// it surfaces as [`RunnerError::TransitionOperandParseFailure`], not a
/// silent fallthrough to the chain's `default` branch.
fn parse_number(task_id: &str, raw: &str) -> Result<f64, RunnerError> {
    if let Ok(i) = raw.trim().parse::<i64>() {
        return Ok(i as f64);
    }
    raw.trim()
        .parse::<f64>()
        .map_err(|_| RunnerError::TransitionOperandParseFailure {
            task_id: task_id.to_string(),
            raw: raw.to_string(),
        })
}

fn parse_range_bounds(task_id: &str, when: &str) -> Result<(f64, f64), RunnerError> {
    let (lo, hi) = when
        .split_once('-')
        .ok_or_else(|| RunnerError::TransitionOperandParseFailure {
            task_id: task_id.to_string(),
            raw: when.to_string(),
        })?;
    Ok((parse_number(task_id, lo)?, parse_number(task_id, hi)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(operator: Operator, when: &str, goto: &str) -> Branch {
        Branch {
            operator,
            when: when.to_string(),
            goto: goto.to_string(),
        }
    }

    #[test]
    fn equals_matches_exact() {
        let branches = vec![branch(Operator::Equals, "yes", "a"), branch(Operator::Default, "", "b")];
        assert_eq!(next("t", &branches, "yes").unwrap(), "a");
        assert_eq!(next("t", &branches, "no").unwrap(), "b");
    }

    #[test]
    fn numeric_gt_compares_subject_against_when() {
        let branches = vec![branch(Operator::Gt, "5", "big"), branch(Operator::Default, "", "small")];
        assert_eq!(next("t", &branches, "7").unwrap(), "big");
        assert_eq!(next("t", &branches, "3").unwrap(), "small");
    }

    #[test]
    fn in_range_inclusive_bounds() {
        let branches = vec![branch(Operator::InRange, "1-10", "hit"), branch(Operator::Default, "", "miss")];
        assert_eq!(next("t", &branches, "1").unwrap(), "hit");
        assert_eq!(next("t", &branches, "10").unwrap(), "hit");
        assert_eq!(next("t", &branches, "11").unwrap(), "miss");
    }

    #[test]
    fn default_only_considered_after_all_others_fail() {
        let branches = vec![
            branch(Operator::Equals, "x", "never"),
            branch(Operator::Default, "", "fallback"),
        ];
        assert_eq!(next("t", &branches, "y").unwrap(), "fallback");
    }

    #[test]
    fn no_branches_match_and_no_default_fails() {
        let branches = vec![branch(Operator::Equals, "x", "a")];
        assert!(next("t", &branches, "y").is_err());
    }

    #[test]
    fn unparseable_numeric_operand_is_a_distinct_error_from_no_match() {
        let branches = vec![branch(Operator::Gt, "5", "big"), branch(Operator::Default, "", "small")];
        let err = next("t7", &branches, "not-a-number").unwrap_err();
        match err {
            RunnerError::TransitionOperandParseFailure { task_id, raw } => {
                assert_eq!(task_id, "t7");
                assert_eq!(raw, "not-a-number");
            }
            other => panic!("expected TransitionOperandParseFailure, got {other:?}"),
        }
    }

    #[test]
    fn determinism_is_a_pure_function_of_inputs() {
        let branches = vec![branch(Operator::Contains, "err", "fail"), branch(Operator::Default, "", "ok")];
        let a = next("t", &branches, "an error occurred").unwrap();
        let b = next("t", &branches, "an error occurred").unwrap();
        assert_eq!(a, b);
    }
}
