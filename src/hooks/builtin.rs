//! Built-in hook providers: echo, chat-append, and webhook.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::chatstore::ChatStore;
use crate::message::HookCall;
use crate::value::{DataType, Value};

use super::{HookOutcome, HookProvider};

/// Print/echo-style hook: reads `args["message"]` (falling back to the
/// running input's text form) and returns it unchanged as output and
/// transition.
pub struct EchoHook;

#[async_trait]
impl HookProvider for EchoHook {
    fn supports(&self) -> Vec<String> {
        vec!["echo".to_string()]
    }

    async fn exec(
        &self,
        _starting_time: DateTime<Utc>,
        input: &Value,
        _input_type: DataType,
        _transition: &str,
        call: &HookCall,
    ) -> HookOutcome {
        let text = call
            .args
            .get("message")
            .cloned()
            .unwrap_or_else(|| input.as_text());
        HookOutcome::success(Value::String(text.clone()), text)
    }
}

/// Chat-store hook: appends the running input's text as a message with
/// role `"user"` to the chat thread named by `args["subject_id"]`.
pub struct ChatAppendHook {
    store: Arc<dyn ChatStore>,
}

impl ChatAppendHook {
    #[must_use]
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HookProvider for ChatAppendHook {
    fn supports(&self) -> Vec<String> {
        vec!["chat_append".to_string()]
    }

    async fn exec(
        &self,
        _starting_time: DateTime<Utc>,
        input: &Value,
        _input_type: DataType,
        _transition: &str,
        call: &HookCall,
    ) -> HookOutcome {
        let Some(subject_id) = call.args.get("subject_id") else {
            return HookOutcome::error(
                Value::String(String::new()),
                "chat_append requires args[\"subject_id\"]",
            );
        };
        let content = input.as_text();
        match self
            .store
            .append_message(subject_id, &content, crate::message::Message::USER)
            .await
        {
            Ok(messages) => {
                let history = crate::message::ChatHistory::new(messages);
                HookOutcome::success(Value::ChatHistory(history), "appended")
            }
            Err(err) => HookOutcome::error(Value::String(String::new()), err.to_string()),
        }
    }
}

/// Generic webhook hook: issues an HTTP request built from
/// `args["url"]`/`args["method"]`, with the running input wrapped as a
/// JSON body (`{message, data}` when the input is not already JSON).
pub struct WebhookHook {
    client: reqwest::Client,
}

impl Default for WebhookHook {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookHook {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HookProvider for WebhookHook {
    fn supports(&self) -> Vec<String> {
        vec!["webhook".to_string()]
    }

    async fn exec(
        &self,
        _starting_time: DateTime<Utc>,
        input: &Value,
        _input_type: DataType,
        _transition: &str,
        call: &HookCall,
    ) -> HookOutcome {
        let Some(url) = call.args.get("url") else {
            return HookOutcome::error(Value::String(String::new()), "webhook requires args[\"url\"]");
        };
        let method = call
            .args
            .get("method")
            .map(String::as_str)
            .unwrap_or("POST")
            .to_uppercase();
        let body = match input {
            Value::Json(j) => j.clone(),
            other => json!({ "message": other.as_text(), "data": other.as_text() }),
        };
        let method = match method.as_str() {
            "GET" => reqwest::Method::GET,
            "PUT" => reqwest::Method::PUT,
            "PATCH" => reqwest::Method::PATCH,
            _ => reqwest::Method::POST,
        };
        let response = self.client.request(method, url).json(&body).send().await;
        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<serde_json::Value>().await {
                Ok(value) => HookOutcome::success(Value::Json(value), "ok"),
                Err(err) => HookOutcome::error(Value::String(String::new()), err.to_string()),
            },
            Ok(resp) => HookOutcome::error(
                Value::String(String::new()),
                format!("webhook returned status {}", resp.status()),
            ),
            Err(err) => HookOutcome::error(Value::String(String::new()), err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatstore::testing::InMemoryChatStore;

    #[tokio::test]
    async fn echo_hook_uses_message_arg() {
        let hook = EchoHook;
        let call = HookCall {
            hook_type: "echo".into(),
            args: [("message".to_string(), "hi".to_string())].into(),
        };
        let outcome = hook
            .exec(Utc::now(), &Value::String(String::new()), DataType::String, "", &call)
            .await;
        assert_eq!(outcome.transition, "hi");
    }

    #[tokio::test]
    async fn chat_append_requires_subject_id() {
        let hook = ChatAppendHook::new(Arc::new(InMemoryChatStore::new()));
        let call = HookCall {
            hook_type: "chat_append".into(),
            args: Default::default(),
        };
        let outcome = hook
            .exec(Utc::now(), &Value::String("hi".into()), DataType::String, "", &call)
            .await;
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn chat_append_appends_to_store() {
        let store = Arc::new(InMemoryChatStore::new());
        let hook = ChatAppendHook::new(store.clone());
        let call = HookCall {
            hook_type: "chat_append".into(),
            args: [("subject_id".to_string(), "s1".to_string())].into(),
        };
        let outcome = hook
            .exec(Utc::now(), &Value::String("hi".into()), DataType::String, "", &call)
            .await;
        assert!(outcome.error.is_none());
        let messages = store.list_messages("s1").await.unwrap();
        assert_eq!(messages.len(), 1);
    }
}
