//! Chat-oriented data types: messages, chat history, search results, and
//! the OpenAI-shaped request/response wire types a `ModelExecution` node
//! and its hooks exchange with the model resolver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single turn in a conversation.
///
/// Roles of interest are [`Message::SYSTEM`], [`Message::USER`], and
/// [`Message::ASSISTANT`], but any role string is accepted — the engine
/// never validates role values outside of `ConditionKey`'s response
/// matching.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender (e.g. `"user"`, `"assistant"`, `"system"`).
    pub role: String,
    /// The text content of the message.
    pub content: String,
    /// When this message was produced.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// System prompt or instruction message role.
    pub const SYSTEM: &'static str = "system";
    /// User input message role.
    pub const USER: &'static str = "user";
    /// AI assistant response message role.
    pub const ASSISTANT: &'static str = "assistant";

    /// Creates a new message with the specified role and content, timestamped now.
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

/// Ordered conversation plus token accounting for a `ModelExecution` node.
///
/// Order is append-only within a node; token counts are always
/// non-negative; `model` may be empty when undetermined (the dispatcher
/// fills it in once a chat client resolves).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatHistory {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub input_tokens: i64,
    #[serde(default)]
    pub output_tokens: i64,
}

impl ChatHistory {
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }
}

/// A single ranked search hit, as produced by search/vector-search hooks.
///
/// Lists preserve rank order from the producer; the engine never re-sorts
/// a `SearchResults` value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub resource_type: String,
    pub distance: f64,
}

/// The outbound, OpenAI-chat-shaped request a resolved chat client is
/// sent. Mirrors only the fields the engine itself produces or reads;
/// a concrete resolver implementation may accept a superset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenAIChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
}

/// A single choice within an [`OpenAIChatResponse`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpenAIChatChoice {
    pub index: u32,
    pub message: Message,
    pub finish_reason: String,
}

/// The OpenAI-chat-shaped response a chat client returns.
///
/// `id`/`fingerprint` are opaque, randomly generated identifiers; callers
/// should only verify they are well-formed non-empty strings, not that
/// they match a fixed value (see the design notes on random-id fields).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpenAIChatResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<OpenAIChatChoice>,
    pub system_fingerprint: String,
}

impl OpenAIChatResponse {
    /// Builds a single-choice response wrapping an assistant reply, with
    /// freshly generated `id`/`system_fingerprint` identifiers.
    #[must_use]
    pub fn single(model: &str, reply: Message) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            model: model.to_string(),
            choices: vec![OpenAIChatChoice {
                index: 0,
                message: reply,
                finish_reason: "stop".to_string(),
            }],
            system_fingerprint: format!("fp_{}", uuid::Uuid::new_v4().simple()),
        }
    }
}

/// A hook invocation descriptor attached to a `Hook` task.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HookCall {
    /// The registered hook type name.
    #[serde(rename = "type")]
    pub hook_type: String,
    /// Arguments recognized by the invoked hook; see the hook argument
    /// vocabulary for well-known keys (`subject_id`, `top_k`, `url`, ...).
    #[serde(default)]
    pub args: std::collections::BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_and_roles() {
        let msg = Message::user("hi");
        assert!(msg.has_role(Message::USER));
        assert!(!msg.has_role(Message::ASSISTANT));
    }

    #[test]
    fn chat_history_append_only_in_practice() {
        let mut history = ChatHistory::new(vec![Message::user("hi")]);
        history.messages.push(Message::assistant("hello"));
        assert_eq!(history.messages.len(), 2);
        assert_eq!(history.messages[1].content, "hello");
    }

    #[test]
    fn openai_response_ids_are_nonempty() {
        let resp = OpenAIChatResponse::single("gpt", Message::assistant("hi"));
        assert!(!resp.id.is_empty());
        assert!(!resp.system_fingerprint.is_empty());
    }

    #[test]
    fn serialization_round_trip() {
        let msg = Message::user("test");
        let json = serde_json::to_string(&msg).expect("serialize");
        let parsed: Message = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(msg.role, parsed.role);
        assert_eq!(msg.content, parsed.content);
    }
}
