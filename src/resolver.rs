//! Model resolver and tokenizer contracts: thin, testable interfaces
//! to the external model-provider registry the engine never owns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::DispatchError;
use crate::message::Message;

/// Strategy for choosing among candidate model providers/backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolverPolicy {
    /// Uniform over candidates and backends.
    Random,
    /// Maximum `contextLength`, ties broken by random backend.
    HighestContext,
}

impl ResolverPolicy {
    /// Maps a chain's `routingStrategy` string to a policy:
    /// `"random"` → `Random`; `"low-latency"`/`"auto"` (or unset) → `HighestContext`;
    /// anything else is an error.
    pub fn from_routing_strategy(strategy: Option<&str>) -> Result<Self, crate::errors::RunnerError> {
        match strategy {
            None => Ok(ResolverPolicy::HighestContext),
            Some("random") => Ok(ResolverPolicy::Random),
            Some("low-latency") | Some("auto") => Ok(ResolverPolicy::HighestContext),
            Some(other) => Err(crate::errors::RunnerError::UnknownRoutingStrategy(
                other.to_string(),
            )),
        }
    }
}

/// A resolution request: candidate filters plus the minimum context
/// length the chosen backend must support.
#[derive(Clone, Debug, Default)]
pub struct ResolveRequest {
    pub provider_types: Vec<String>,
    pub model_names: Vec<String>,
    pub context_length: u64,
}

/// A resolved client capable of single-shot prompting and multi-turn chat.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends a single rendered prompt, returning the raw text reply.
    async fn prompt(&self, text: &str) -> Result<String, DispatchError>;

    /// Sends a full message list, returning the assistant's reply.
    async fn chat(&self, messages: &[Message]) -> Result<Message, DispatchError>;
}

/// `resolve(policy, request) → (client, modelName)`.
///
/// A request with no model or provider names falls back to a "default
/// system provider" at the implementation's discretion.
#[async_trait]
pub trait ModelResolver: Send + Sync {
    async fn resolve(
        &self,
        policy: ResolverPolicy,
        request: &ResolveRequest,
    ) -> Result<(std::sync::Arc<dyn ChatClient>, String), DispatchError>;
}

/// `countTokens`/`optimalModel`. `modelHint == "tiny"` is a supported
/// cheap path used for pre-check accounting before a chat client resolves.
#[async_trait]
pub trait Tokenizer: Send + Sync {
    async fn count_tokens(&self, model_hint: &str, text: &str) -> Result<i64, DispatchError>;
    async fn optimal_model(&self, provider_model_name: &str) -> Result<String, DispatchError>;
}

/// Normalizes a model name for matching: lowercased, stripped of
/// spaces/`-`/`_`/`.`; any `org/name` prefix reduced to `name`;
/// quantization suffixes removed; anything after the final `:` stripped.
#[must_use]
pub fn normalize_model_name(name: &str) -> String {
    let name = name.rsplit('/').next().unwrap_or(name);
    let name = name.rsplit_once(':').map_or(name, |(base, _)| base);
    let mut out: String = name
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_' | '.'))
        .collect();
    for suffix in ["awq", "gptq", "4bit", "fp16"] {
        if let Some(stripped) = out.strip_suffix(suffix) {
            out = stripped.to_string();
        }
    }
    out
}

/// In-memory fakes for tests and for consumers exercising the engine
/// without a network-backed provider registry.
pub mod testing {
    use super::*;
    use std::sync::Arc;

    /// A [`ChatClient`] that returns a fixed reply to every call, or
    /// echoes the input back when no fixed reply is configured.
    pub struct EchoClient {
        pub fixed_reply: Option<String>,
    }

    impl EchoClient {
        #[must_use]
        pub fn echo() -> Self {
            Self { fixed_reply: None }
        }

        #[must_use]
        pub fn fixed(reply: impl Into<String>) -> Self {
            Self {
                fixed_reply: Some(reply.into()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for EchoClient {
        async fn prompt(&self, text: &str) -> Result<String, DispatchError> {
            Ok(self.fixed_reply.clone().unwrap_or_else(|| text.to_string()))
        }

        async fn chat(&self, messages: &[Message]) -> Result<Message, DispatchError> {
            let reply = self
                .fixed_reply
                .clone()
                .unwrap_or_else(|| messages.last().map(|m| m.content.clone()).unwrap_or_default());
            Ok(Message::assistant(&reply))
        }
    }

    /// A resolver that always hands back the same client under a fixed
    /// model name, ignoring policy/request filters.
    pub struct InMemoryResolver {
        pub client: Arc<dyn ChatClient>,
        pub model_name: String,
    }

    impl InMemoryResolver {
        #[must_use]
        pub fn new(client: Arc<dyn ChatClient>, model_name: impl Into<String>) -> Self {
            Self {
                client,
                model_name: model_name.into(),
            }
        }
    }

    #[async_trait]
    impl ModelResolver for InMemoryResolver {
        async fn resolve(
            &self,
            _policy: ResolverPolicy,
            _request: &ResolveRequest,
        ) -> Result<(Arc<dyn ChatClient>, String), DispatchError> {
            Ok((self.client.clone(), self.model_name.clone()))
        }
    }

    /// One candidate backend a [`CandidateResolver`] can hand out.
    pub struct Candidate {
        pub client: Arc<dyn ChatClient>,
        pub model_name: String,
        pub provider_type: String,
        pub context_length: u64,
    }

    /// A resolver choosing among several candidates: `Random` picks
    /// uniformly over candidates passing the filters; `HighestContext`
    /// picks the maximum `context_length`, breaking ties randomly.
    pub struct CandidateResolver {
        candidates: Vec<Candidate>,
    }

    impl CandidateResolver {
        #[must_use]
        pub fn new(candidates: Vec<Candidate>) -> Self {
            Self { candidates }
        }

        fn eligible(&self, request: &ResolveRequest) -> Vec<&Candidate> {
            self.candidates
                .iter()
                .filter(|c| {
                    (request.provider_types.is_empty() || request.provider_types.contains(&c.provider_type))
                        && (request.model_names.is_empty()
                            || request
                                .model_names
                                .iter()
                                .any(|n| normalize_model_name(n) == normalize_model_name(&c.model_name)))
                        && c.context_length >= request.context_length
                })
                .collect()
        }
    }

    #[async_trait]
    impl ModelResolver for CandidateResolver {
        async fn resolve(
            &self,
            policy: ResolverPolicy,
            request: &ResolveRequest,
        ) -> Result<(Arc<dyn ChatClient>, String), DispatchError> {
            let eligible = self.eligible(request);
            if eligible.is_empty() {
                return Err(DispatchError::ResolveFailure(
                    "no candidate backend meets the request's filters".to_string(),
                ));
            }
            let chosen = match policy {
                ResolverPolicy::Random => {
                    let idx = rand::random::<u32>() as usize % eligible.len();
                    eligible[idx]
                }
                ResolverPolicy::HighestContext => {
                    let max_context = eligible.iter().map(|c| c.context_length).max().unwrap_or(0);
                    let tied: Vec<&&Candidate> = eligible
                        .iter()
                        .filter(|c| c.context_length == max_context)
                        .collect();
                    let idx = rand::random::<u32>() as usize % tied.len();
                    tied[idx]
                }
            };
            Ok((chosen.client.clone(), chosen.model_name.clone()))
        }
    }

    /// A tokenizer that counts whitespace-delimited words as tokens.
    pub struct WordCountTokenizer;

    #[async_trait]
    impl Tokenizer for WordCountTokenizer {
        async fn count_tokens(&self, _model_hint: &str, text: &str) -> Result<i64, DispatchError> {
            Ok(text.split_whitespace().count() as i64)
        }

        async fn optimal_model(&self, provider_model_name: &str) -> Result<String, DispatchError> {
            Ok(normalize_model_name(provider_model_name))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn candidate(model: &str, context: u64) -> Candidate {
            Candidate {
                client: Arc::new(EchoClient::echo()),
                model_name: model.to_string(),
                provider_type: "local".to_string(),
                context_length: context,
            }
        }

        #[tokio::test]
        async fn highest_context_picks_the_maximum() {
            let resolver = CandidateResolver::new(vec![candidate("a", 2048), candidate("b", 8192)]);
            let (_, model) = resolver
                .resolve(ResolverPolicy::HighestContext, &ResolveRequest::default())
                .await
                .unwrap();
            assert_eq!(model, "b");
        }

        #[tokio::test]
        async fn no_eligible_candidate_is_a_resolve_failure() {
            let resolver = CandidateResolver::new(vec![candidate("a", 1024)]);
            let request = ResolveRequest {
                context_length: 999_999,
                ..Default::default()
            };
            let err = resolver.resolve(ResolverPolicy::Random, &request).await.unwrap_err();
            assert!(matches!(err, DispatchError::ResolveFailure(_)));
        }
    }
}
