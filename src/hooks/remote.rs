//! Remote hook provider: POSTs a JSON envelope describing the
//! call and interprets the response envelope symmetrically. The server
//! selects its handler by URL path; success is HTTP 2xx with a well-formed
//! response envelope, anything else is a node error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{ChatHistory, HookCall, OpenAIChatRequest, OpenAIChatResponse, SearchResult};
use crate::value::{DataType, Value};

use super::{HookOutcome, HookProvider};

#[derive(Serialize)]
struct RequestEnvelope<'a> {
    starting_time: DateTime<Utc>,
    input: serde_json::Value,
    data_type: &'a str,
    transition: &'a str,
    args: &'a std::collections::BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct ResponseEnvelope {
    output: serde_json::Value,
    data_type: String,
    transition: String,
    #[serde(default)]
    error: Option<String>,
}

/// A single remote provider: POSTs to `url`, and answers `type` under
/// `hook_type` in the local registry.
pub struct RemoteHook {
    client: reqwest::Client,
    url: String,
    hook_type: String,
}

impl RemoteHook {
    #[must_use]
    pub fn new(url: impl Into<String>, hook_type: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            hook_type: hook_type.into(),
        }
    }
}

#[async_trait]
impl HookProvider for RemoteHook {
    fn supports(&self) -> Vec<String> {
        vec![self.hook_type.clone()]
    }

    async fn exec(
        &self,
        starting_time: DateTime<Utc>,
        input: &Value,
        input_type: DataType,
        transition: &str,
        call: &HookCall,
    ) -> HookOutcome {
        let envelope = RequestEnvelope {
            starting_time,
            input: value_to_json(input),
            data_type: input_type.as_str(),
            transition,
            args: &call.args,
        };
        let response = self.client.post(&self.url).json(&envelope).send().await;
        let response = match response {
            Ok(r) => r,
            Err(err) => return HookOutcome::error(input.clone(), err.to_string()),
        };
        if !response.status().is_success() {
            return HookOutcome::error(
                input.clone(),
                format!("remote hook returned status {}", response.status()),
            );
        }
        let body: ResponseEnvelope = match response.json().await {
            Ok(b) => b,
            Err(err) => return HookOutcome::error(input.clone(), format!("decode failure: {err}")),
        };
        if let Some(error) = body.error {
            return HookOutcome::error(input.clone(), error);
        }
        let data_type = match parse_data_type(&body.data_type) {
            Ok(t) => t,
            Err(err) => return HookOutcome::error(input.clone(), err),
        };
        match json_to_value(data_type, body.output) {
            Ok(value) => HookOutcome::success(value, body.transition),
            Err(err) => HookOutcome::error(input.clone(), err),
        }
    }
}

fn parse_data_type(raw: &str) -> Result<DataType, String> {
    match raw {
        "any" => Ok(DataType::Any),
        "string" => Ok(DataType::String),
        "bool" => Ok(DataType::Bool),
        "int" => Ok(DataType::Int),
        "float" => Ok(DataType::Float),
        "search_results" => Ok(DataType::SearchResults),
        "json" => Ok(DataType::Json),
        "chat_history" => Ok(DataType::ChatHistory),
        "openai_chat" => Ok(DataType::OpenAIChat),
        "openai_chat_response" => Ok(DataType::OpenAIChatResponse),
        other => Err(format!("unknown dataType {other:?} in remote hook response")),
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::json!(i),
        Value::Float(f) => serde_json::json!(f),
        Value::SearchResults(r) => serde_json::to_value(r).unwrap_or(serde_json::Value::Null),
        Value::Json(j) => j.clone(),
        Value::ChatHistory(h) => serde_json::to_value(h).unwrap_or(serde_json::Value::Null),
        Value::OpenAIChat(r) => serde_json::to_value(r).unwrap_or(serde_json::Value::Null),
        Value::OpenAIChatResponse(r) => serde_json::to_value(r).unwrap_or(serde_json::Value::Null),
    }
}

fn json_to_value(data_type: DataType, json: serde_json::Value) -> Result<Value, String> {
    match data_type {
        DataType::Any | DataType::String => Ok(Value::String(
            json.as_str().map(str::to_string).unwrap_or_else(|| json.to_string()),
        )),
        DataType::Bool => json.as_bool().map(Value::Bool).ok_or_else(|| "expected bool".to_string()),
        DataType::Int => json.as_i64().map(Value::Int).ok_or_else(|| "expected int".to_string()),
        DataType::Float => json.as_f64().map(Value::Float).ok_or_else(|| "expected float".to_string()),
        DataType::SearchResults => serde_json::from_value::<Vec<SearchResult>>(json)
            .map(Value::SearchResults)
            .map_err(|e| e.to_string()),
        DataType::Json => Ok(Value::Json(json)),
        DataType::ChatHistory => serde_json::from_value::<ChatHistory>(json)
            .map(Value::ChatHistory)
            .map_err(|e| e.to_string()),
        DataType::OpenAIChat => serde_json::from_value::<OpenAIChatRequest>(json)
            .map(Value::OpenAIChat)
            .map_err(|e| e.to_string()),
        DataType::OpenAIChatResponse => serde_json::from_value::<OpenAIChatResponse>(json)
            .map(Value::OpenAIChatResponse)
            .map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn success_envelope_round_trips() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/hook");
            then.status(200).json_body(serde_json::json!({
                "output": "done",
                "data_type": "string",
                "transition": "ok",
            }));
        });

        let hook = RemoteHook::new(server.url("/hook"), "remote_thing");
        let call = HookCall {
            hook_type: "remote_thing".into(),
            args: Default::default(),
        };
        let outcome = hook
            .exec(Utc::now(), &Value::String("in".into()), DataType::String, "", &call)
            .await;
        mock.assert();
        assert_eq!(outcome.transition, "ok");
        assert_eq!(outcome.output.as_text(), "done");
    }

    #[tokio::test]
    async fn non_2xx_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/hook");
            then.status(500);
        });

        let hook = RemoteHook::new(server.url("/hook"), "remote_thing");
        let call = HookCall {
            hook_type: "remote_thing".into(),
            args: Default::default(),
        };
        let outcome = hook
            .exec(Utc::now(), &Value::String("in".into()), DataType::String, "", &call)
            .await;
        assert!(outcome.error.is_some());
    }
}
