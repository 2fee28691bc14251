//! Tagged values flowing through a chain execution.
//!
//! Every node consumes and produces a [`Value`]: a single discriminated
//! union covering every admissible shape in the engine (scalars, chat
//! history, search results, raw JSON, and the two OpenAI-shaped chat
//! wire types). The tag is authoritative — dispatch code matches on it
//! explicitly and rejects mismatches as [`crate::errors::DispatchError::InvalidInputType`]
//! rather than attempting runtime coercion.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::message::{ChatHistory, Message, OpenAIChatRequest, OpenAIChatResponse, SearchResult};

/// The tag half of a [`Value`]. Kept as its own enum so dispatch code can
/// compare/require a shape without holding a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Any,
    String,
    Bool,
    Int,
    Float,
    SearchResults,
    Json,
    ChatHistory,
    OpenAIChat,
    OpenAIChatResponse,
}

impl DataType {
    /// Human-readable name, used in error messages and trace rendering.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Any => "any",
            DataType::String => "string",
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::SearchResults => "search_results",
            DataType::Json => "json",
            DataType::ChatHistory => "chat_history",
            DataType::OpenAIChat => "openai_chat",
            DataType::OpenAIChatResponse => "openai_chat_response",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged runtime value. The tag (obtainable via [`Value::data_type`])
/// always matches the active variant; there is no untagged/null state —
/// absence of a value is modeled by the caller not holding one.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    SearchResults(Vec<SearchResult>),
    Json(Json),
    ChatHistory(ChatHistory),
    OpenAIChat(OpenAIChatRequest),
    OpenAIChatResponse(OpenAIChatResponse),
}

impl Value {
    /// Tag of this value. `Any` never appears as a concrete tag — it is
    /// only used in contracts that accept every shape.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Value::String(_) => DataType::String,
            Value::Bool(_) => DataType::Bool,
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::SearchResults(_) => DataType::SearchResults,
            Value::Json(_) => DataType::Json,
            Value::ChatHistory(_) => DataType::ChatHistory,
            Value::OpenAIChat(_) => DataType::OpenAIChat,
            Value::OpenAIChatResponse(_) => DataType::OpenAIChatResponse,
        }
    }

    /// Canonical text form used for prompting and for the `print` step.
    ///
    /// `String` passes through verbatim; `Int`/`Float`/`Bool` render as
    /// canonical decimal/`true`/`false`; `ChatHistory` renders as the
    /// content of its last message (empty string if there is none).
    /// Every other shape renders via its `Display`/debug-ish JSON form,
    /// since the engine never needs to prompt from them directly.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::ChatHistory(history) => history
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
            Value::SearchResults(results) => {
                serde_json::to_string(results).unwrap_or_default()
            }
            Value::Json(json) => json.to_string(),
            Value::OpenAIChat(req) => serde_json::to_string(req).unwrap_or_default(),
            Value::OpenAIChatResponse(resp) => serde_json::to_string(resp).unwrap_or_default(),
        }
    }

    /// Borrow as a string, or `None` if this value is not tagged `String`.
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a chat history, or `None` if not tagged `ChatHistory`.
    #[must_use]
    pub fn as_chat_history(&self) -> Option<&ChatHistory> {
        match self {
            Value::ChatHistory(h) => Some(h),
            _ => None,
        }
    }

    /// Mutably borrow as a chat history, or `None` if not tagged `ChatHistory`.
    pub fn as_chat_history_mut(&mut self) -> Option<&mut ChatHistory> {
        match self {
            Value::ChatHistory(h) => Some(h),
            _ => None,
        }
    }
}

/// Canonical decimal rendering for floats: shortest form that round-trips,
/// without a trailing `.0` suffix ambiguity for whole numbers.
fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{f:.0}")
    } else {
        f.to_string()
    }
}

/// Appends a system message to a chat history if not already present verbatim.
#[must_use]
pub fn with_leading_system_message(mut history: ChatHistory, text: &str) -> ChatHistory {
    let already_present = history
        .messages
        .first()
        .is_some_and(|m| m.role == Message::SYSTEM && m.content == text);
    if !already_present {
        history.messages.insert(0, Message::system(text));
    }
    history
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_form_of_scalars() {
        assert_eq!(Value::String("hi".into()).as_text(), "hi");
        assert_eq!(Value::Int(7).as_text(), "7");
        assert_eq!(Value::Float(2.5).as_text(), "2.5");
        assert_eq!(Value::Float(3.0).as_text(), "3");
        assert_eq!(Value::Bool(true).as_text(), "true");
        assert_eq!(Value::Bool(false).as_text(), "false");
    }

    #[test]
    fn text_form_of_chat_history_is_last_message() {
        let history = ChatHistory {
            messages: vec![Message::user("hi"), Message::assistant("hello")],
            model: String::new(),
            input_tokens: 0,
            output_tokens: 0,
        };
        assert_eq!(Value::ChatHistory(history).as_text(), "hello");
    }

    #[test]
    fn text_form_of_empty_chat_history_is_empty() {
        let history = ChatHistory::default();
        assert_eq!(Value::ChatHistory(history).as_text(), "");
    }

    #[test]
    fn data_type_matches_variant() {
        assert_eq!(Value::Int(1).data_type(), DataType::Int);
        assert_eq!(
            Value::ChatHistory(ChatHistory::default()).data_type(),
            DataType::ChatHistory
        );
    }
}
