//! Node dispatcher / executor: runs one node to completion,
//! selecting behavior by [`TaskKind`] and talking to the model resolver,
//! tokenizer, and hook registry as needed.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::chain::{ChainTask, TaskKind};
use crate::errors::DispatchError;
use crate::hooks::HookRegistry;
use crate::message::{ChatHistory, Message};
use crate::resolver::{ChatClient, ModelResolver, ResolveRequest, ResolverPolicy, Tokenizer};
use crate::value::{with_leading_system_message, DataType, Value};

/// The collaborators a dispatch call needs, bundled so `task_exec`'s
/// signature stays manageable. Cheap to clone (everything is `Arc`).
#[derive(Clone)]
pub struct DispatchServices {
    pub resolver: Arc<dyn ModelResolver>,
    pub tokenizer: Arc<dyn Tokenizer>,
    pub hooks: Arc<HookRegistry>,
}

/// `taskExec(ctx, startingTime, resolverPolicy, chainTokenLimit, task, input, inputType)`.
#[tracing::instrument(skip(services, task, input), fields(task_id = %task.id, kind = ?task.kind), err)]
pub async fn task_exec(
    services: &DispatchServices,
    starting_time: DateTime<Utc>,
    resolver_policy: ResolverPolicy,
    chain_token_limit: i64,
    task: &ChainTask,
    input: Value,
    input_type: DataType,
) -> Result<(Value, DataType, String), DispatchError> {
    match task.kind {
        TaskKind::Noop => Ok((input, input_type, "noop".to_string())),

        TaskKind::RawString => {
            let text = prompt(services, resolver_policy, task, &with_system_instruction(task, &input.as_text())).await?;
            let text = text.trim_end().to_string();
            Ok((Value::String(text.clone()), DataType::String, text))
        }

        TaskKind::ConditionKey => {
            let text = prompt(services, resolver_policy, task, &with_system_instruction(task, &input.as_text())).await?;
            let trimmed = text.trim();
            let value = task.valid_conditions.get(trimmed).copied().ok_or_else(|| {
                DispatchError::ConditionUnmatched {
                    response: trimmed.to_string(),
                }
            })?;
            let transition = if value { "true" } else { "false" };
            Ok((Value::Bool(value), DataType::Bool, transition.to_string()))
        }

        TaskKind::ParseNumber => {
            let text = prompt(services, resolver_policy, task, &with_system_instruction(task, &input.as_text())).await?;
            let raw = text.trim();
            let n: i64 = raw.parse().map_err(|_| DispatchError::NumberParseFailure {
                raw: raw.to_string(),
            })?;
            Ok((Value::Int(n), DataType::Int, n.to_string()))
        }

        TaskKind::ParseScore => {
            let text = prompt(services, resolver_policy, task, &with_system_instruction(task, &input.as_text())).await?;
            let raw = text.trim();
            let f: f64 = raw.parse().map_err(|_| DispatchError::NumberParseFailure {
                raw: raw.to_string(),
            })?;
            Ok((Value::Float(f), DataType::Float, format!("{f:.2}")))
        }

        TaskKind::ParseRange => {
            let text = prompt(services, resolver_policy, task, &with_system_instruction(task, &input.as_text())).await?;
            let raw: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            let (lo, hi) = parse_range(&raw)?;
            let canonical = format!("{lo}-{hi}");
            Ok((Value::String(canonical.clone()), DataType::String, canonical))
        }

        TaskKind::ParseTransition => {
            let text = input.as_text();
            let transition = if text.is_empty() {
                String::new()
            } else if let Some(rest) = text.strip_prefix('/') {
                rest.split_whitespace().next().unwrap_or("").to_string()
            } else {
                "pass".to_string()
            };
            Ok((input, input_type, transition))
        }

        TaskKind::RaiseError => Err(DispatchError::Raised(input.as_text())),

        TaskKind::ModelExecution => run_model_execution(services, resolver_policy, chain_token_limit, task, input, input_type).await,

        TaskKind::Hook => {
            let call = task
                .hook
                .clone()
                .ok_or_else(|| DispatchError::HookNotRegistered(String::new()))?;
            let (output, transition) = services
                .hooks
                .exec(starting_time, &input, input_type, "", &call)
                .await?;
            let output_type = output.data_type();
            Ok((output, output_type, transition))
        }
    }
}

fn with_system_instruction(task: &ChainTask, text: &str) -> String {
    match &task.system_instruction {
        Some(instruction) if !instruction.is_empty() => format!("{instruction}\n{text}"),
        _ => text.to_string(),
    }
}

async fn prompt(
    services: &DispatchServices,
    policy: ResolverPolicy,
    task: &ChainTask,
    text: &str,
) -> Result<String, DispatchError> {
    let client = resolve_client(services, policy, task).await?;
    client.prompt(text).await
}

async fn resolve_client(
    services: &DispatchServices,
    policy: ResolverPolicy,
    task: &ChainTask,
) -> Result<Arc<dyn ChatClient>, DispatchError> {
    let request = task
        .execute_config
        .as_ref()
        .map(|cfg| ResolveRequest {
            provider_types: cfg.provider_types.clone(),
            model_names: cfg.model_names.clone(),
            context_length: cfg.context_length,
        })
        .unwrap_or_default();
    let (client, _model_name) = services
        .resolver
        .resolve(policy, &request)
        .await
        .map_err(|e| DispatchError::ResolveFailure(e.to_string()))?;
    Ok(client)
}

fn parse_range(raw: &str) -> Result<(i64, i64), DispatchError> {
    if let Some((lo, hi)) = raw.split_once('-') {
        let lo: i64 = lo
            .parse()
            .map_err(|_| DispatchError::RangeParseFailure { raw: raw.to_string() })?;
        let hi: i64 = hi
            .parse()
            .map_err(|_| DispatchError::RangeParseFailure { raw: raw.to_string() })?;
        Ok((lo, hi))
    } else {
        let n: i64 = raw
            .parse()
            .map_err(|_| DispatchError::RangeParseFailure { raw: raw.to_string() })?;
        Ok((n, n))
    }
}

async fn run_model_execution(
    services: &DispatchServices,
    policy: ResolverPolicy,
    chain_token_limit: i64,
    task: &ChainTask,
    input: Value,
    input_type: DataType,
) -> Result<(Value, DataType, String), DispatchError> {
    if input_type != DataType::ChatHistory {
        return Err(DispatchError::InvalidInputType {
            expected: DataType::ChatHistory,
            actual: input_type,
        });
    }
    task.execute_config
        .as_ref()
        .ok_or_else(|| DispatchError::ResolveFailure("ModelExecution requires executeConfig".to_string()))?;
    let mut history = match input {
        Value::ChatHistory(h) => h,
        _ => unreachable!("checked above"),
    };

    if let Some(instruction) = &task.system_instruction {
        if !instruction.is_empty() {
            history = with_leading_system_message(history, instruction);
        }
    }

    if history.input_tokens <= 0 {
        let joined: String = history
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        history.input_tokens = services
            .tokenizer
            .count_tokens("tiny", &joined)
            .await
            .map_err(|e| DispatchError::TokenizerFailure(e.to_string()))?;
    }
    if chain_token_limit > 0 && history.input_tokens > chain_token_limit {
        return Err(DispatchError::TokenBudgetExceeded {
            tokens: history.input_tokens,
            limit: chain_token_limit,
        });
    }

    let client = resolve_client(services, policy, task).await?;
    let reply = client
        .chat(&history.messages)
        .await
        .map_err(|e| DispatchError::ModelCallFailure(e.to_string()))?;
    history.messages.push(reply.clone());

    let tokenizer_model = services
        .tokenizer
        .optimal_model(&history.model)
        .await
        .map_err(|e| DispatchError::TokenizerFailure(e.to_string()))?;
    history.output_tokens = services
        .tokenizer
        .count_tokens(&tokenizer_model, &reply.content)
        .await
        .map_err(|e| DispatchError::TokenizerFailure(e.to_string()))?;

    Ok((Value::ChatHistory(history), DataType::ChatHistory, "executed".to_string()))
}

/// Selects effective input for a task: `inputVar` override when set
/// (lookup failure is fatal), otherwise the running output.
pub fn select_input<'a>(
    task: &ChainTask,
    variables: &'a std::collections::BTreeMap<String, (Value, DataType)>,
    previous_output: &'a (Value, DataType),
) -> Result<&'a (Value, DataType), DispatchError> {
    match &task.input_var {
        Some(name) if !name.is_empty() => variables
            .get(name)
            .ok_or_else(|| DispatchError::MissingVariable(name.clone())),
        _ => Ok(previous_output),
    }
}
