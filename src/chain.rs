//! Chain definition data model: tasks, branches, and the validation the
//! runner performs before executing a chain.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::RunnerError;
use crate::message::HookCall;
use crate::transition::Branch;

/// The reserved terminal task id. A transition target equal to this (or
/// empty) ends the chain, returning the current output as final.
pub const END: &str = "end";

/// Discriminates a [`ChainTask`]'s dispatch behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    RawString,
    ConditionKey,
    ParseNumber,
    ParseScore,
    ParseRange,
    ParseTransition,
    RaiseError,
    ModelExecution,
    Hook,
    Noop,
}

/// Model/provider preferences consulted by prompting and chat kinds.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecuteConfig {
    #[serde(default)]
    pub provider_types: Vec<String>,
    #[serde(default)]
    pub model_names: Vec<String>,
    #[serde(default)]
    pub context_length: u64,
}

/// `{onFailure, branches}` — the post-step routing a task declares.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Transition {
    /// Unconditional rescue target consulted once retries are exhausted.
    #[serde(default)]
    pub on_failure: Option<String>,
    #[serde(default)]
    pub branches: Vec<Branch>,
}

/// One node in a chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainTask {
    pub id: String,
    pub kind: TaskKind,
    #[serde(default)]
    pub system_instruction: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub print: Option<String>,
    #[serde(default)]
    pub input_var: Option<String>,
    /// Mapping string→bool; required for `ConditionKey`.
    #[serde(default)]
    pub valid_conditions: std::collections::BTreeMap<String, bool>,
    #[serde(default)]
    pub hook: Option<HookCall>,
    #[serde(default)]
    pub execute_config: Option<ExecuteConfig>,
    #[serde(default)]
    pub transition: Transition,
    /// Raw duration text (e.g. `"30s"`); parsed lazily by the dispatcher
    /// so an invalid value surfaces as a per-attempt error, not a
    /// load-time one.
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub retry_on_failure: u32,
}

impl ChainTask {
    /// Parses [`Self::timeout`] if set.
    pub fn parse_timeout(&self) -> Result<Option<Duration>, crate::errors::DispatchError> {
        let Some(raw) = &self.timeout else {
            return Ok(None);
        };
        parse_duration(raw)
            .map(Some)
            .map_err(|reason| crate::errors::DispatchError::TimeoutInvalid {
                raw: raw.clone(),
                reason,
            })
    }
}

/// Parses a duration like `"30s"`, `"500ms"`, `"2m"`, `"1h"`, or a bare
/// integer (seconds).
fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty duration".to_string());
    }
    let (digits, suffix) = raw
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit() && *c != '.')
        .map(|(i, _)| raw.split_at(i))
        .unwrap_or((raw, ""));
    let value: f64 = digits
        .parse()
        .map_err(|_| format!("non-numeric duration {raw:?}"))?;
    let seconds = match suffix {
        "" | "s" => value,
        "ms" => value / 1000.0,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        other => return Err(format!("unrecognized duration suffix {other:?}")),
    };
    if seconds < 0.0 {
        return Err("negative duration".to_string());
    }
    Ok(Duration::from_secs_f64(seconds))
}

/// `{id, description?, tasks, tokenLimit, routingStrategy?}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainDefinition {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub tasks: Vec<ChainTask>,
    #[serde(default)]
    pub token_limit: i64,
    #[serde(default)]
    pub routing_strategy: Option<String>,
}

impl ChainDefinition {
    /// The first task, i.e. the start node. Only meaningful once
    /// [`Self::validate`] has confirmed `tasks` is non-empty.
    #[must_use]
    pub fn start_task(&self) -> &ChainTask {
        &self.tasks[0]
    }

    pub fn find(&self, id: &str) -> Option<&ChainTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Validates: non-empty tasks; every id non-empty and `!= "end"`;
    /// ids unique; every `goto`/`onFailure` target resolves to an
    /// existing task id or `"end"`.
    pub fn validate(&self) -> Result<(), RunnerError> {
        if self.tasks.is_empty() {
            return Err(RunnerError::EmptyChain(self.id.clone()));
        }
        let mut seen = std::collections::HashSet::new();
        for task in &self.tasks {
            if task.id.is_empty() || task.id == END {
                return Err(RunnerError::InvalidTaskId(task.id.clone()));
            }
            if !seen.insert(task.id.as_str()) {
                return Err(RunnerError::DuplicateTaskId(task.id.clone()));
            }
        }
        for task in &self.tasks {
            if let Some(target) = &task.transition.on_failure {
                self.resolve_target(target)?;
            }
            for branch in &task.transition.branches {
                self.resolve_target(&branch.goto)?;
            }
        }
        Ok(())
    }

    fn resolve_target(&self, target: &str) -> Result<(), RunnerError> {
        if target.is_empty() || target == END || self.find(target).is_some() {
            Ok(())
        } else {
            Err(RunnerError::UnresolvedTarget(target.to_string()))
        }
    }
}
