//! Chat store contract: the persistent chat thread the engine
//! consults only through hooks, keyed by `hook.args["subject_id"]`.

use async_trait::async_trait;

use crate::errors::DispatchError;
use crate::message::Message;

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn list_messages(&self, subject_id: &str) -> Result<Vec<Message>, DispatchError>;

    /// Appends a single message of `role` with `content` to `subject_id`'s
    /// thread, returning the updated list.
    async fn append_message(
        &self,
        subject_id: &str,
        content: &str,
        role: &str,
    ) -> Result<Vec<Message>, DispatchError>;

    async fn append_messages(
        &self,
        subject_id: &str,
        messages: &[Message],
    ) -> Result<Vec<Message>, DispatchError>;

    async fn add_instruction(&self, subject_id: &str, text: &str) -> Result<(), DispatchError>;
}

/// In-memory fake backed by a mutex-guarded map, for tests and for
/// consumers without a real persistent store.
pub mod testing {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryChatStore {
        threads: Mutex<BTreeMap<String, Vec<Message>>>,
    }

    impl InMemoryChatStore {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl ChatStore for InMemoryChatStore {
        async fn list_messages(&self, subject_id: &str) -> Result<Vec<Message>, DispatchError> {
            Ok(self
                .threads
                .lock()
                .expect("chat store mutex poisoned")
                .get(subject_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn append_message(
            &self,
            subject_id: &str,
            content: &str,
            role: &str,
        ) -> Result<Vec<Message>, DispatchError> {
            let mut threads = self.threads.lock().expect("chat store mutex poisoned");
            let thread = threads.entry(subject_id.to_string()).or_default();
            thread.push(Message::new(role, content));
            Ok(thread.clone())
        }

        async fn append_messages(
            &self,
            subject_id: &str,
            messages: &[Message],
        ) -> Result<Vec<Message>, DispatchError> {
            let mut threads = self.threads.lock().expect("chat store mutex poisoned");
            let thread = threads.entry(subject_id.to_string()).or_default();
            thread.extend_from_slice(messages);
            Ok(thread.clone())
        }

        async fn add_instruction(&self, subject_id: &str, text: &str) -> Result<(), DispatchError> {
            let mut threads = self.threads.lock().expect("chat store mutex poisoned");
            let thread = threads.entry(subject_id.to_string()).or_default();
            thread.insert(0, Message::system(text));
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn append_and_list_round_trip() {
            let store = InMemoryChatStore::new();
            store.append_message("s1", "hi", Message::USER).await.unwrap();
            let msgs = store.list_messages("s1").await.unwrap();
            assert_eq!(msgs.len(), 1);
            assert_eq!(msgs[0].content, "hi");
        }

        #[tokio::test]
        async fn instruction_is_prepended() {
            let store = InMemoryChatStore::new();
            store.append_message("s1", "hi", Message::USER).await.unwrap();
            store.add_instruction("s1", "be nice").await.unwrap();
            let msgs = store.list_messages("s1").await.unwrap();
            assert_eq!(msgs[0].role, Message::SYSTEM);
        }
    }
}
