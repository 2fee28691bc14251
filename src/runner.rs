//! Chain Runner: `execEnv` — validates a chain, maintains variable
//! bindings, applies retry/timeout, routes transitions, and emits the
//! final output together with the inspector's trace.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use crate::cancellation::CancellationToken;
use crate::chain::{ChainDefinition, ChainTask, END};
use crate::config::EngineConfig;
use crate::dispatcher::{select_input, task_exec, DispatchServices};
use crate::errors::{DispatchError, RunnerError};
use crate::inspector::{capture, CapturedStateUnit, StackTrace};
use crate::print_sink::PrintSink;
use crate::resolver::ResolverPolicy;
use crate::template;
use crate::transition;
use crate::value::{DataType, Value};

/// Everything one `execEnv` call needs beyond the chain and its input.
pub struct RunnerEnv {
    pub services: DispatchServices,
    pub inspector: Arc<dyn StackTrace>,
    pub print_sink: Arc<dyn PrintSink>,
    pub config: EngineConfig,
    pub cancellation: CancellationToken,
}

/// Result of a completed (successful) execution: the final typed output
/// plus the full recorded trace.
pub struct ExecutionOutcome {
    pub output: Value,
    pub output_type: DataType,
    pub trace: Vec<CapturedStateUnit>,
}

type Variables = BTreeMap<String, (Value, DataType)>;

/// `execEnv(ctx, chain, input, inputType) → (finalOutput, trace, error?)`.
///
/// On failure the trace up to and including the failing attempt is still
/// retrievable via `env.inspector.history()` — this function returns
/// `Err` rather than a `(None, trace, Some(error))` triple because Rust's
/// `Result` already carries that distinction; callers who need the
/// partial trace read it off `env.inspector`.
#[instrument(skip(env, chain, input), fields(chain_id = %chain.id), err)]
pub async fn exec_env(
    env: &RunnerEnv,
    chain: &ChainDefinition,
    input: Value,
    input_type: DataType,
) -> Result<ExecutionOutcome, RunnerError> {
    chain.validate()?;
    let policy = ResolverPolicy::from_routing_strategy(
        chain
            .routing_strategy
            .as_deref()
            .or(env.config.default_routing_strategy.as_deref()),
    )?;

    let mut variables: Variables = BTreeMap::new();
    variables.insert("input".to_string(), (input.clone(), input_type));
    let mut previous_output: (Value, DataType) = (input, input_type);
    let mut current_task_id = chain.start_task().id.clone();

    loop {
        let task = chain
            .find(&current_task_id)
            .expect("validated chain guarantees every referenced id exists");

        let (mut effective_value, mut effective_type) = select_input(task, &variables, &previous_output)
            .map_err(|source| RunnerError::TaskFailed {
                task_id: task.id.clone(),
                source,
            })?
            .clone();

        if effective_type == DataType::String {
            if let Some(template) = &task.template {
                let text_vars: BTreeMap<String, String> = variables
                    .iter()
                    .map(|(k, (v, _))| (k.clone(), v.as_text()))
                    .collect();
                let rendered = template::render(template, &text_vars)
                    .map_err(DispatchError::TemplateError)
                    .map_err(|source| RunnerError::TaskFailed {
                        task_id: task.id.clone(),
                        source,
                    })?;
                effective_value = Value::String(rendered);
                effective_type = DataType::String;
            }
        }

        let attempt_result = run_with_retry(env, policy, chain.token_limit, task, effective_value, effective_type).await;

        let (output, output_type, transition_str) = match attempt_result {
            Ok(ok) => ok,
            Err(DispatchError::BreakpointHit) => {
                return Err(RunnerError::BreakpointHit(task.id.clone()));
            }
            Err(last_error) => {
                if let Some(target) = &task.transition.on_failure {
                    current_task_id = target.clone();
                    continue;
                }
                return Err(RunnerError::TaskFailed {
                    task_id: task.id.clone(),
                    source: last_error,
                });
            }
        };

        variables.insert("previous_output".to_string(), (output.clone(), output_type));
        variables.insert(task.id.clone(), (output.clone(), output_type));
        previous_output = (output.clone(), output_type);

        if let Some(print_template) = &task.print {
            let text_vars: BTreeMap<String, String> = variables
                .iter()
                .map(|(k, (v, _))| (k.clone(), v.as_text()))
                .collect();
            if let Ok(rendered) = template::render(print_template, &text_vars) {
                env.print_sink.print_line(&rendered);
            }
        }

        let target = transition::next(&task.id, &task.transition.branches, &transition_str)?;
        if target.is_empty() || target == END {
            return Ok(ExecutionOutcome {
                output,
                output_type,
                trace: env.inspector.history(),
            });
        }
        if chain.find(&target).is_none() {
            return Err(RunnerError::TargetNotFound {
                task_id: task.id.clone(),
                target,
            });
        }
        current_task_id = target;
    }
}

/// Runs one task's retry loop: up to `retryOnFailure + 1` attempts,
/// recording a [`CapturedStateUnit`] per attempt and honoring
/// break-points and cancellation ahead of each attempt.
async fn run_with_retry(
    env: &RunnerEnv,
    policy: ResolverPolicy,
    chain_token_limit: i64,
    task: &ChainTask,
    input: Value,
    input_type: DataType,
) -> Result<(Value, DataType, String), DispatchError> {
    let attempts = task.retry_on_failure.saturating_add(1);
    let mut last_error: Option<DispatchError> = None;

    for _ in 0..attempts {
        if env.inspector.has_breakpoint(&task.id) {
            return Err(DispatchError::BreakpointHit);
        }
        if env.cancellation.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }

        let timeout = task.parse_timeout()?.unwrap_or(env.config.default_task_timeout);
        let started = Utc::now();
        let input_text = input.as_text();

        let call = task_exec(
            &env.services,
            started,
            policy,
            chain_token_limit,
            task,
            input.clone(),
            input_type,
        );

        let outcome = tokio::select! {
            result = tokio::time::timeout(timeout, call) => match result {
                Ok(inner) => inner,
                Err(_) => Err(DispatchError::Cancelled),
            },
            () = env.cancellation.cancelled() => Err(DispatchError::Cancelled),
        };

        let finished = Utc::now();
        match &outcome {
            Ok((output, output_type, transition)) => {
                env.inspector
                    .record_step(capture(
                        &task.id,
                        task_kind_name(task),
                        input_type,
                        started,
                        finished,
                        &input_text,
                        Ok((*output_type, transition.clone(), output.as_text())),
                    ))
                    .await;
            }
            Err(err) => {
                env.inspector
                    .record_step(capture(
                        &task.id,
                        task_kind_name(task),
                        input_type,
                        started,
                        finished,
                        &input_text,
                        Err(err.to_string()),
                    ))
                    .await;
            }
        }

        match outcome {
            Ok((output, output_type, transition)) => return Ok((output, output_type, transition)),
            Err(err) => last_error = Some(err),
        }
    }

    Err(last_error.expect("attempts is always >= 1"))
}

fn task_kind_name(task: &ChainTask) -> &'static str {
    match task.kind {
        crate::chain::TaskKind::RawString => "raw_string",
        crate::chain::TaskKind::ConditionKey => "condition_key",
        crate::chain::TaskKind::ParseNumber => "parse_number",
        crate::chain::TaskKind::ParseScore => "parse_score",
        crate::chain::TaskKind::ParseRange => "parse_range",
        crate::chain::TaskKind::ParseTransition => "parse_transition",
        crate::chain::TaskKind::RaiseError => "raise_error",
        crate::chain::TaskKind::ModelExecution => "model_execution",
        crate::chain::TaskKind::Hook => "hook",
        crate::chain::TaskKind::Noop => "noop",
    }
}
