//! # chainforge: a task-chain execution engine
//!
//! `chainforge` runs directed workflow "chains" whose nodes interleave LLM
//! prompts, deterministic parsers, side-effecting hooks, and conditional
//! routing. A chain is a flat list of [`chain::ChainTask`]s wired together by
//! [`transition::Branch`]es; the [`runner::exec_env`] function drives one
//! chain to completion against a caller-supplied [`runner::RunnerEnv`] of
//! collaborators (model resolver, tokenizer, chat store, hook registry, KV
//! store, print sink).
//!
//! ## Core concepts
//!
//! - **[`value`]** — the typed [`value::Value`]/[`value::DataType`] pair
//!   that flows between tasks.
//! - **[`chain`]** — [`chain::ChainTask`], [`chain::ChainDefinition`], and
//!   the ten [`chain::TaskKind`] node behaviors.
//! - **[`transition`]** — branch evaluation: which task runs next.
//! - **[`template`]** — `{{variable}}` substitution for prompts and
//!   printed output.
//! - **[`dispatcher`]** — `task_exec`, the per-kind dispatch function.
//! - **[`inspector`]** — the recorded trace (`StackTrace`) and breakpoints.
//! - **[`runner`]** — `exec_env`, the chain-level retry/timeout/routing loop.
//! - **[`hooks`]** — the hook provider registry plus built-in providers
//!   (echo, chat-append, webhook, mux, remote).
//! - **[`resolver`]**, **[`chatstore`]**, **[`kv`]**, **[`tracker`]**,
//!   **[`print_sink`]** — the external collaborator interfaces a caller
//!   implements against their own infrastructure.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use chainforge::chain::{ChainDefinition, ChainTask, TaskKind, Transition};
//! use chainforge::transition::{Branch, Operator};
//! use chainforge::dispatcher::DispatchServices;
//! use chainforge::hooks::HookRegistry;
//! use chainforge::inspector::SimpleInspector;
//! use chainforge::print_sink::VecPrintSink;
//! use chainforge::resolver::testing::{EchoClient, InMemoryResolver, WordCountTokenizer};
//! use chainforge::runner::{exec_env, RunnerEnv};
//! use chainforge::value::{DataType, Value};
//! use chainforge::cancellation::CancellationToken;
//! use chainforge::config::EngineConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let chain = ChainDefinition {
//!     id: "greet".to_string(),
//!     description: None,
//!     tasks: vec![ChainTask {
//!         id: "say_hi".to_string(),
//!         kind: TaskKind::RawString,
//!         system_instruction: None,
//!         template: Some("hello {{.input}}".to_string()),
//!         print: None,
//!         input_var: None,
//!         valid_conditions: Default::default(),
//!         hook: None,
//!         execute_config: None,
//!         transition: Transition {
//!             on_failure: None,
//!             branches: vec![Branch {
//!                 operator: Operator::Default,
//!                 when: String::new(),
//!                 goto: "end".to_string(),
//!             }],
//!         },
//!         timeout: None,
//!         retry_on_failure: 0,
//!     }],
//!     token_limit: 0,
//!     routing_strategy: None,
//! };
//!
//! let services = DispatchServices {
//!     resolver: Arc::new(InMemoryResolver::new(Arc::new(EchoClient::echo()), "echo-model")),
//!     tokenizer: Arc::new(WordCountTokenizer),
//!     hooks: Arc::new(HookRegistry::new()),
//! };
//! let env = RunnerEnv {
//!     services,
//!     inspector: Arc::new(SimpleInspector::new("req-1")),
//!     print_sink: Arc::new(VecPrintSink::new()),
//!     config: EngineConfig::default(),
//!     cancellation: CancellationToken::new(),
//! };
//!
//! let outcome = exec_env(&env, &chain, Value::String("world".to_string()), DataType::String).await?;
//! assert_eq!(outcome.output.as_text(), "hello world");
//! # Ok(())
//! # }
//! ```

pub mod cancellation;
pub mod chain;
pub mod chatstore;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod hooks;
pub mod inspector;
pub mod kv;
pub mod message;
pub mod print_sink;
pub mod resolver;
pub mod runner;
pub mod telemetry;
pub mod template;
pub mod tracker;
pub mod transition;
pub mod value;
