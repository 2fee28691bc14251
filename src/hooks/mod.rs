//! Hook interface: the uniform call-out for side effects and data
//! shaping that `Hook`-kind tasks invoke.
//!
//! Each provider declares the `type` names it supports; the registry
//! dispatches by name and treats a non-`Success` status as a node error.

pub mod builtin;
pub mod mux;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::DispatchError;
use crate::message::HookCall;
use crate::value::{DataType, Value};

/// Outcome discriminant a provider reports for one invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookStatus {
    Success,
    UnknownProvider,
    Error,
}

/// The full result of a hook invocation, mirroring
/// `(status, output, outputType, transition, error?)`.
pub struct HookOutcome {
    pub status: HookStatus,
    pub output: Value,
    pub transition: String,
    pub error: Option<String>,
}

impl HookOutcome {
    #[must_use]
    pub fn success(output: Value, transition: impl Into<String>) -> Self {
        Self {
            status: HookStatus::Success,
            output,
            transition: transition.into(),
            error: None,
        }
    }

    #[must_use]
    pub fn error(output: Value, message: impl Into<String>) -> Self {
        Self {
            status: HookStatus::Error,
            output,
            transition: String::new(),
            error: Some(message.into()),
        }
    }
}

/// One hook implementation; providers register under one or more `type`
/// names via [`HookProvider::supports`].
#[async_trait]
pub trait HookProvider: Send + Sync {
    /// The hook `type` names this provider answers to.
    fn supports(&self) -> Vec<String>;

    async fn exec(
        &self,
        starting_time: DateTime<Utc>,
        input: &Value,
        input_type: DataType,
        transition: &str,
        call: &HookCall,
    ) -> HookOutcome;
}

/// Dispatches a hook call by `type` name to the provider that declared
/// support for it.
#[derive(Default, Clone)]
pub struct HookRegistry {
    providers: Vec<Arc<dyn HookProvider>>,
}

impl HookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn HookProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    #[must_use]
    pub fn supports(&self) -> Vec<String> {
        self.providers.iter().flat_map(|p| p.supports()).collect()
    }

    fn find(&self, hook_type: &str) -> Option<&Arc<dyn HookProvider>> {
        self.providers
            .iter()
            .find(|p| p.supports().iter().any(|n| n == hook_type))
    }

    /// Looks up `call.hook_type` and invokes it; a lookup miss or a
    /// non-`Success` outcome both become a [`DispatchError::HookFailed`]
    /// (lookup misses are reported as `HookNotRegistered`).
    pub async fn exec(
        &self,
        starting_time: DateTime<Utc>,
        input: &Value,
        input_type: DataType,
        transition: &str,
        call: &HookCall,
    ) -> Result<(Value, String), DispatchError> {
        let Some(provider) = self.find(&call.hook_type) else {
            return Err(DispatchError::HookNotRegistered(call.hook_type.clone()));
        };
        let outcome = provider
            .exec(starting_time, input, input_type, transition, call)
            .await;
        match outcome.status {
            HookStatus::Success => Ok((outcome.output, outcome.transition)),
            HookStatus::UnknownProvider => Err(DispatchError::HookNotRegistered(call.hook_type.clone())),
            HookStatus::Error => Err(DispatchError::HookFailed {
                hook_type: call.hook_type.clone(),
                message: outcome.error.unwrap_or_else(|| "hook failed".to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::builtin::EchoHook;

    #[tokio::test]
    async fn unregistered_hook_is_an_error() {
        let registry = HookRegistry::new();
        let call = HookCall {
            hook_type: "missing".into(),
            args: Default::default(),
        };
        let err = registry
            .exec(Utc::now(), &Value::String(String::new()), DataType::String, "", &call)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::HookNotRegistered(_)));
    }

    #[tokio::test]
    async fn registered_hook_dispatches() {
        let registry = HookRegistry::new().with_provider(Arc::new(EchoHook));
        let call = HookCall {
            hook_type: "echo".into(),
            args: [("message".to_string(), "hi".to_string())].into(),
        };
        let (output, _) = registry
            .exec(Utc::now(), &Value::String(String::new()), DataType::String, "", &call)
            .await
            .unwrap();
        assert_eq!(output.as_text(), "hi");
    }
}
