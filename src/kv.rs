//! Optional key-value store contract, used only by the inspector
//! for bounded trace persistence.

use async_trait::async_trait;

use crate::errors::DispatchError;

/// `listPush/listLength/listTrim/setAdd`, as returned by `executor(ctx)`.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn list_push(&self, key: &str, value: &str) -> Result<(), DispatchError>;
    async fn list_length(&self, key: &str) -> Result<u64, DispatchError>;
    /// Trims the list at `key` to its `keep_last` most recent entries.
    async fn list_trim(&self, key: &str, keep_last: u64) -> Result<(), DispatchError>;
    async fn set_add(&self, key: &str, member: &str) -> Result<(), DispatchError>;
}

/// In-memory fake, for tests and for running the inspector without a
/// real KV backend.
pub mod testing {
    use super::*;
    use std::collections::{BTreeSet, VecDeque};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryKvStore {
        lists: Mutex<std::collections::BTreeMap<String, VecDeque<String>>>,
        sets: Mutex<std::collections::BTreeMap<String, BTreeSet<String>>>,
    }

    impl InMemoryKvStore {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn list_snapshot(&self, key: &str) -> Vec<String> {
            self.lists
                .lock()
                .expect("kv mutex poisoned")
                .get(key)
                .map(|d| d.iter().cloned().collect())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl KvStore for InMemoryKvStore {
        async fn list_push(&self, key: &str, value: &str) -> Result<(), DispatchError> {
            self.lists
                .lock()
                .expect("kv mutex poisoned")
                .entry(key.to_string())
                .or_default()
                .push_back(value.to_string());
            Ok(())
        }

        async fn list_length(&self, key: &str) -> Result<u64, DispatchError> {
            Ok(self
                .lists
                .lock()
                .expect("kv mutex poisoned")
                .get(key)
                .map_or(0, |d| d.len() as u64))
        }

        async fn list_trim(&self, key: &str, keep_last: u64) -> Result<(), DispatchError> {
            let mut lists = self.lists.lock().expect("kv mutex poisoned");
            if let Some(list) = lists.get_mut(key) {
                while list.len() as u64 > keep_last {
                    list.pop_front();
                }
            }
            Ok(())
        }

        async fn set_add(&self, key: &str, member: &str) -> Result<(), DispatchError> {
            self.sets
                .lock()
                .expect("kv mutex poisoned")
                .entry(key.to_string())
                .or_default()
                .insert(member.to_string());
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn trims_to_bound() {
            let kv = InMemoryKvStore::new();
            for i in 0..5 {
                kv.list_push("k", &i.to_string()).await.unwrap();
            }
            kv.list_trim("k", 3).await.unwrap();
            assert_eq!(kv.list_length("k").await.unwrap(), 3);
            assert_eq!(kv.list_snapshot("k"), vec!["2", "3", "4"]);
        }
    }
}
