//! Error taxonomy for the execution engine.
//!
//! [`DispatchError`] covers every failure a single node attempt can
//! produce (template rendering, transition evaluation, dispatcher
//! kind-behaviors, hook invocation). [`RunnerError`] covers structural
//! failures of the chain itself — things wrong before or around any
//! single attempt, which are never retried.

use miette::Diagnostic;
use thiserror::Error;

use crate::value::DataType;

/// Failures that can occur while dispatching or evaluating a single node
/// attempt. These are recorded on the attempt's [`crate::inspector::CapturedStateUnit`]
/// and are subject to `retryOnFailure`/`onFailure` routing.
#[derive(Debug, Error, Diagnostic)]
pub enum DispatchError {
    #[error("expected a {expected} value, got {actual}")]
    #[diagnostic(
        code(chainforge::dispatch::invalid_input_type),
        help("Check the producing node's outputType or this task's inputVar binding.")
    )]
    InvalidInputType {
        expected: DataType,
        actual: DataType,
    },

    #[error("template error: {0}")]
    #[diagnostic(code(chainforge::dispatch::template))]
    TemplateError(#[from] crate::template::TemplateError),

    #[error("invalid timeout duration {raw:?}: {reason}")]
    #[diagnostic(code(chainforge::dispatch::timeout_invalid))]
    TimeoutInvalid { raw: String, reason: String },

    #[error("chat history token count {tokens} exceeds chain token limit {limit}")]
    #[diagnostic(
        code(chainforge::dispatch::token_budget_exceeded),
        help("Either raise tokenLimit or trim the chat history before this node.")
    )]
    TokenBudgetExceeded { tokens: i64, limit: i64 },

    #[error("model resolution failed: {0}")]
    #[diagnostic(code(chainforge::dispatch::resolve_failure))]
    ResolveFailure(String),

    #[error("model call failed: {0}")]
    #[diagnostic(code(chainforge::dispatch::model_call_failure))]
    ModelCallFailure(String),

    #[error("tokenizer call failed: {0}")]
    #[diagnostic(code(chainforge::dispatch::tokenizer_failure))]
    TokenizerFailure(String),

    #[error("no hook registered for type {0:?}")]
    #[diagnostic(
        code(chainforge::dispatch::hook_not_registered),
        help("Register a provider under this type name before executing this chain.")
    )]
    HookNotRegistered(String),

    #[error("hook {hook_type:?} failed: {message}")]
    #[diagnostic(code(chainforge::dispatch::hook_failed))]
    HookFailed { hook_type: String, message: String },

    #[error("model response {response:?} does not match any key of validConditions")]
    #[diagnostic(
        code(chainforge::dispatch::condition_unmatched),
        help("validConditions keys are matched exact, case-sensitive.")
    )]
    ConditionUnmatched { response: String },

    #[error("could not parse {raw:?} as a signed integer")]
    #[diagnostic(code(chainforge::dispatch::number_parse_failure))]
    NumberParseFailure { raw: String },

    #[error("could not parse {raw:?} as a range")]
    #[diagnostic(code(chainforge::dispatch::range_parse_failure))]
    RangeParseFailure { raw: String },

    #[error("node raised an error: {0}")]
    #[diagnostic(code(chainforge::dispatch::raised))]
    Raised(String),

    #[error("unknown task kind {0:?}")]
    #[diagnostic(code(chainforge::dispatch::unknown_task_kind))]
    UnknownTaskKind(String),

    #[error("variable {0:?} is not bound")]
    #[diagnostic(code(chainforge::dispatch::missing_variable))]
    MissingVariable(String),

    #[error("execution was cancelled")]
    #[diagnostic(code(chainforge::dispatch::cancelled))]
    Cancelled,

    #[error("execution halted: break-point hit")]
    #[diagnostic(
        code(chainforge::dispatch::breakpoint_hit),
        help("Clear or move the break-point and resume execution from this task.")
    )]
    BreakpointHit,
}

/// Structural failures of the chain runner itself: validation, transition
/// routing, and break-point interruption. These are never retried and
/// are not attempt-scoped.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    #[error("chain {0:?} has no tasks")]
    #[diagnostic(code(chainforge::runner::empty_chain))]
    EmptyChain(String),

    #[error("task id {0:?} is empty or equal to the reserved terminal \"end\"")]
    #[diagnostic(code(chainforge::runner::invalid_task_id))]
    InvalidTaskId(String),

    #[error("duplicate task id {0:?}")]
    #[diagnostic(code(chainforge::runner::duplicate_task_id))]
    DuplicateTaskId(String),

    #[error("transition target {0:?} does not resolve to any task id or \"end\"")]
    #[diagnostic(code(chainforge::runner::unresolved_target))]
    UnresolvedTarget(String),

    #[error("unknown routing strategy {0:?}")]
    #[diagnostic(
        code(chainforge::runner::unknown_routing_strategy),
        help("routingStrategy must be \"random\", \"low-latency\", \"auto\", or omitted.")
    )]
    UnknownRoutingStrategy(String),

    #[error("no branch matched transition {transition:?} for task {task_id:?}")]
    #[diagnostic(code(chainforge::runner::no_matching_transition))]
    NoMatchingTransition { task_id: String, transition: String },

    #[error("task {task_id:?} transition operand {raw:?} is not a valid number or range")]
    #[diagnostic(code(chainforge::runner::transition_operand_parse_failure))]
    TransitionOperandParseFailure { task_id: String, raw: String },

    #[error("transition target {target:?} from task {task_id:?} does not exist")]
    #[diagnostic(code(chainforge::runner::target_not_found))]
    TargetNotFound { task_id: String, target: String },

    #[error("execution halted: break-point hit on task {0:?}")]
    #[diagnostic(
        code(chainforge::runner::breakpoint_hit),
        help("Clear or move the break-point and resume execution from this task.")
    )]
    BreakpointHit(String),

    #[error("execution was cancelled")]
    #[diagnostic(code(chainforge::runner::cancelled))]
    Cancelled,

    #[error("task {task_id:?} failed: {source}")]
    #[diagnostic(code(chainforge::runner::task_failed))]
    TaskFailed {
        task_id: String,
        #[source]
        source: DispatchError,
    },
}
