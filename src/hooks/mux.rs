//! Command-routing ("mux") hook:
//! no special case lives in the dispatcher for this — it is just another
//! [`HookProvider`] that delegates to a sub-registry.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::message::HookCall;
use crate::value::{DataType, Value};

use super::{HookOutcome, HookProvider, HookRegistry};

/// If the latest input text begins with `"/<name>"`, dispatches to the
/// sub-hook registered under `<name>` in `sub_registry`; arguments after
/// the first space become the sub-hook's text input. Otherwise passes
/// the input through unchanged.
pub struct MuxHook {
    sub_registry: Arc<HookRegistry>,
}

impl MuxHook {
    #[must_use]
    pub fn new(sub_registry: Arc<HookRegistry>) -> Self {
        Self { sub_registry }
    }
}

#[async_trait]
impl HookProvider for MuxHook {
    fn supports(&self) -> Vec<String> {
        vec!["mux".to_string()]
    }

    async fn exec(
        &self,
        starting_time: DateTime<Utc>,
        input: &Value,
        input_type: DataType,
        transition: &str,
        call: &HookCall,
    ) -> HookOutcome {
        let text = input.as_text();
        let Some(rest) = text.strip_prefix('/') else {
            return HookOutcome::success(input.clone(), transition.to_string());
        };
        let (name, args_text) = rest.split_once(' ').unwrap_or((rest, ""));
        let sub_input = Value::String(args_text.to_string());
        let sub_call = HookCall {
            hook_type: name.to_string(),
            args: call.args.clone(),
        };
        match self
            .sub_registry
            .exec(starting_time, &sub_input, DataType::String, transition, &sub_call)
            .await
        {
            Ok((output, next_transition)) => HookOutcome::success(output, next_transition),
            Err(err) => HookOutcome::error(input.clone(), err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::builtin::EchoHook;

    #[tokio::test]
    async fn routes_slash_commands_to_subhook() {
        let sub = Arc::new(HookRegistry::new().with_provider(Arc::new(EchoHook)));
        let mux = MuxHook::new(sub);
        let call = HookCall {
            hook_type: "mux".into(),
            args: Default::default(),
        };
        let outcome = mux
            .exec(
                Utc::now(),
                &Value::String("/echo hello world".into()),
                DataType::String,
                "",
                &call,
            )
            .await;
        assert_eq!(outcome.transition, "hello world");
    }

    #[tokio::test]
    async fn passes_through_when_no_slash_prefix() {
        let sub = Arc::new(HookRegistry::new());
        let mux = MuxHook::new(sub);
        let call = HookCall {
            hook_type: "mux".into(),
            args: Default::default(),
        };
        let outcome = mux
            .exec(Utc::now(), &Value::String("plain text".into()), DataType::String, "t", &call)
            .await;
        assert_eq!(outcome.output.as_text(), "plain text");
        assert_eq!(outcome.transition, "t");
    }
}
