//! End-to-end chain executions against the in-memory collaborator fakes.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chainforge::cancellation::CancellationToken;
use chainforge::chain::{ChainDefinition, ChainTask, ExecuteConfig, TaskKind, Transition};
use chainforge::config::EngineConfig;
use chainforge::dispatcher::DispatchServices;
use chainforge::errors::{DispatchError, RunnerError};
use chainforge::hooks::HookRegistry;
use chainforge::inspector::SimpleInspector;
use chainforge::message::{ChatHistory, Message};
use chainforge::print_sink::VecPrintSink;
use chainforge::resolver::testing::{Candidate, CandidateResolver, EchoClient, InMemoryResolver, WordCountTokenizer};
use chainforge::resolver::{ChatClient, ResolverPolicy};
use chainforge::runner::{exec_env, RunnerEnv};
use chainforge::transition::{Branch, Operator};
use chainforge::value::{DataType, Value};

fn blank_task(id: &str, kind: TaskKind) -> ChainTask {
    ChainTask {
        id: id.to_string(),
        kind,
        system_instruction: None,
        template: None,
        print: None,
        input_var: None,
        valid_conditions: BTreeMap::new(),
        hook: None,
        execute_config: None,
        transition: Transition::default(),
        timeout: None,
        retry_on_failure: 0,
    }
}

fn env_with(resolver: Arc<dyn chainforge::resolver::ModelResolver>) -> RunnerEnv {
    let services = DispatchServices {
        resolver,
        tokenizer: Arc::new(WordCountTokenizer),
        hooks: Arc::new(HookRegistry::new()),
    };
    RunnerEnv {
        services,
        inspector: Arc::new(SimpleInspector::new("req-1")),
        print_sink: Arc::new(VecPrintSink::new()),
        config: EngineConfig::default(),
        cancellation: CancellationToken::new(),
    }
}

fn echo_env() -> RunnerEnv {
    env_with(Arc::new(InMemoryResolver::new(Arc::new(EchoClient::echo()), "echo-model")))
}

fn fixed_reply_env(reply: &str) -> RunnerEnv {
    env_with(Arc::new(InMemoryResolver::new(
        Arc::new(EchoClient::fixed(reply)),
        "fixed-model",
    )))
}

#[tokio::test]
async fn echoes_a_raw_string() {
    let mut task = blank_task("t", TaskKind::RawString);
    task.template = Some("{{.input}}".to_string());
    task.transition.branches = vec![Branch {
        operator: Operator::Default,
        when: String::new(),
        goto: "end".to_string(),
    }];
    let chain = ChainDefinition {
        id: "echo".to_string(),
        description: None,
        tasks: vec![task],
        token_limit: 0,
        routing_strategy: None,
    };

    let env = echo_env();
    let outcome = exec_env(&env, &chain, Value::String("Hello".to_string()), DataType::String)
        .await
        .unwrap();

    assert_eq!(outcome.output.as_text(), "Hello");
    assert_eq!(outcome.trace.len(), 1);
    assert_eq!(outcome.trace[0].transition.as_deref(), Some("Hello"));
}

#[tokio::test]
async fn branches_on_a_parsed_number() {
    let mut task = blank_task("t", TaskKind::ParseNumber);
    task.transition.branches = vec![
        Branch {
            operator: Operator::Gt,
            when: "5".to_string(),
            goto: "big".to_string(),
        },
        Branch {
            operator: Operator::Default,
            when: String::new(),
            goto: "small".to_string(),
        },
    ];
    let big = blank_task("big", TaskKind::Noop);
    let small = blank_task("small", TaskKind::Noop);
    let chain = ChainDefinition {
        id: "branch".to_string(),
        description: None,
        tasks: vec![task, big, small],
        token_limit: 0,
        routing_strategy: None,
    };

    let env = fixed_reply_env("7");
    let outcome = exec_env(&env, &chain, Value::String("ignored".to_string()), DataType::String)
        .await
        .unwrap();

    assert_eq!(outcome.trace[0].transition.as_deref(), Some("7"));
    assert_eq!(outcome.trace.last().unwrap().task_id, "big");
}

struct AlwaysFailClient;

#[async_trait]
impl ChatClient for AlwaysFailClient {
    async fn prompt(&self, _text: &str) -> Result<String, DispatchError> {
        Err(DispatchError::ModelCallFailure("deliberate failure".to_string()))
    }

    async fn chat(&self, _messages: &[Message]) -> Result<Message, DispatchError> {
        Err(DispatchError::ModelCallFailure("deliberate failure".to_string()))
    }
}

#[tokio::test]
async fn retries_then_routes_to_on_failure() {
    let mut flaky = blank_task("flaky", TaskKind::RawString);
    flaky.retry_on_failure = 1;
    flaky.transition.on_failure = Some("rescue".to_string());
    flaky.execute_config = Some(ExecuteConfig {
        model_names: vec!["bad".to_string()],
        ..Default::default()
    });
    flaky.transition.branches = vec![Branch {
        operator: Operator::Default,
        when: String::new(),
        goto: "end".to_string(),
    }];

    let mut rescue = blank_task("rescue", TaskKind::RawString);
    rescue.execute_config = Some(ExecuteConfig {
        model_names: vec!["good".to_string()],
        ..Default::default()
    });
    rescue.transition.branches = vec![Branch {
        operator: Operator::Default,
        when: String::new(),
        goto: "end".to_string(),
    }];

    let chain = ChainDefinition {
        id: "retry".to_string(),
        description: None,
        tasks: vec![flaky, rescue],
        token_limit: 0,
        routing_strategy: None,
    };

    let resolver = CandidateResolver::new(vec![
        Candidate {
            client: Arc::new(AlwaysFailClient),
            model_name: "bad".to_string(),
            provider_type: "local".to_string(),
            context_length: 0,
        },
        Candidate {
            client: Arc::new(EchoClient::fixed("ok")),
            model_name: "good".to_string(),
            provider_type: "local".to_string(),
            context_length: 0,
        },
    ]);
    let env = env_with(Arc::new(resolver));

    let outcome = exec_env(&env, &chain, Value::String("go".to_string()), DataType::String)
        .await
        .unwrap();

    assert_eq!(outcome.output.as_text(), "ok");
    let failing_steps: Vec<_> = outcome.trace.iter().filter(|s| s.task_id == "flaky").collect();
    assert_eq!(failing_steps.len(), 2);
    assert!(failing_steps.iter().all(|s| s.error.is_some()));
    let rescue_steps: Vec<_> = outcome.trace.iter().filter(|s| s.task_id == "rescue").collect();
    assert_eq!(rescue_steps.len(), 1);
    assert!(rescue_steps[0].error.is_none());
}

#[tokio::test]
async fn breakpoint_halts_execution_before_the_marked_task() {
    let mut t1 = blank_task("t1", TaskKind::RawString);
    t1.transition.branches = vec![Branch {
        operator: Operator::Default,
        when: String::new(),
        goto: "t2".to_string(),
    }];
    let mut t2 = blank_task("t2", TaskKind::RawString);
    t2.transition.branches = vec![Branch {
        operator: Operator::Default,
        when: String::new(),
        goto: "end".to_string(),
    }];
    let chain = ChainDefinition {
        id: "breakpoint".to_string(),
        description: None,
        tasks: vec![t1, t2],
        token_limit: 0,
        routing_strategy: None,
    };

    let inspector = Arc::new(SimpleInspector::new("req-bp"));
    inspector.set_breakpoint("t2");
    let mut env = echo_env();
    env.inspector = inspector.clone();

    let err = exec_env(&env, &chain, Value::String("hi".to_string()), DataType::String)
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::BreakpointHit(task_id) if task_id == "t2"));
    let history = inspector.history();
    assert!(history.iter().any(|s| s.task_id == "t1" && s.error.is_none()));
    assert!(history.iter().all(|s| s.task_id != "t2"));
}

#[tokio::test]
async fn condition_mismatch_surfaces_as_a_failure() {
    let mut task = blank_task("t", TaskKind::ConditionKey);
    task.valid_conditions.insert("yes".to_string(), true);
    task.valid_conditions.insert("no".to_string(), false);
    task.transition.branches = vec![Branch {
        operator: Operator::Default,
        when: String::new(),
        goto: "end".to_string(),
    }];
    let chain = ChainDefinition {
        id: "condition".to_string(),
        description: None,
        tasks: vec![task],
        token_limit: 0,
        routing_strategy: None,
    };

    let env = fixed_reply_env("maybe");
    let err = exec_env(&env, &chain, Value::String("decide".to_string()), DataType::String)
        .await
        .unwrap_err();

    match err {
        RunnerError::TaskFailed { task_id, source } => {
            assert_eq!(task_id, "t");
            assert!(matches!(source, DispatchError::ConditionUnmatched { .. }));
        }
        other => panic!("expected TaskFailed/ConditionUnmatched, got {other:?}"),
    }
}

#[tokio::test]
async fn chat_execution_appends_a_reply_and_counts_tokens() {
    let mut task = blank_task("chat", TaskKind::ModelExecution);
    task.execute_config = Some(ExecuteConfig::default());
    task.transition.branches = vec![Branch {
        operator: Operator::Default,
        when: String::new(),
        goto: "end".to_string(),
    }];
    let chain = ChainDefinition {
        id: "chat".to_string(),
        description: None,
        tasks: vec![task],
        token_limit: 1000,
        routing_strategy: None,
    };

    let env = fixed_reply_env("hello");
    let history = ChatHistory::new(vec![Message::user("hi")]);
    let outcome = exec_env(&env, &chain, Value::ChatHistory(history), DataType::ChatHistory)
        .await
        .unwrap();

    assert_eq!(outcome.output_type, DataType::ChatHistory);
    let history = outcome.output.as_chat_history().unwrap();
    assert_eq!(history.messages.len(), 2);
    assert_eq!(history.messages[1].role, Message::ASSISTANT);
    assert_eq!(history.messages[1].content, "hello");
    assert!(history.output_tokens > 0);
    assert_eq!(outcome.trace.last().unwrap().transition.as_deref(), Some("executed"));
}
