//! Inspector / StackTrace: records one capture per attempt,
//! optionally persists to a KV store, and owns break-points.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::kv::KvStore;
use crate::value::DataType;

/// The KV persistence bound.
pub const TRACE_RETENTION_BOUND: u64 = 1000;

/// The internal deadline for a KV persistence call.
pub const KV_OPERATION_DEADLINE: Duration = Duration::from_secs(10);

/// One recorded attempt.
#[derive(Clone, Debug)]
pub struct CapturedStateUnit {
    pub task_id: String,
    pub task_kind: String,
    pub input_type: DataType,
    pub output_type: Option<DataType>,
    pub transition: Option<String>,
    pub duration: Duration,
    pub error: Option<String>,
    pub input: String,
    pub output: Option<String>,
}

/// `Start(ctx) → StackTrace`.
#[async_trait::async_trait]
pub trait StackTrace: Send + Sync {
    async fn record_step(&self, unit: CapturedStateUnit);
    fn history(&self) -> Vec<CapturedStateUnit>;
    fn set_breakpoint(&self, task_id: &str);
    fn clear_breakpoints(&self);
    fn has_breakpoint(&self, task_id: &str) -> bool;
    fn current_state(&self) -> Vec<CapturedStateUnit> {
        self.history()
    }
}

/// In-memory inspector with an optional KV persistence sink.
pub struct SimpleInspector {
    request_id: String,
    history: Mutex<Vec<CapturedStateUnit>>,
    breakpoints: Mutex<HashSet<String>>,
    kv: Option<Arc<dyn KvStore>>,
    retention_bound: u64,
    kv_deadline: Duration,
}

impl SimpleInspector {
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            history: Mutex::new(Vec::new()),
            breakpoints: Mutex::new(HashSet::new()),
            kv: None,
            retention_bound: TRACE_RETENTION_BOUND,
            kv_deadline: KV_OPERATION_DEADLINE,
        }
    }

    #[must_use]
    pub fn with_kv(mut self, kv: Arc<dyn KvStore>) -> Self {
        self.kv = Some(kv);
        self
    }

    /// Overrides the KV list-trim bound, normally [`TRACE_RETENTION_BOUND`].
    #[must_use]
    pub fn with_retention_bound(mut self, bound: u64) -> Self {
        self.retention_bound = bound;
        self
    }

    /// Overrides the per-call KV timeout, normally [`KV_OPERATION_DEADLINE`].
    #[must_use]
    pub fn with_kv_deadline(mut self, deadline: Duration) -> Self {
        self.kv_deadline = deadline;
        self
    }

    fn persistence_key(&self) -> String {
        format!("state:{}", self.request_id)
    }

    async fn persist(&self, unit: &CapturedStateUnit) {
        let Some(kv) = &self.kv else { return };
        let key = self.persistence_key();
        let encoded = format!(
            "{}|{}|{}",
            unit.task_id,
            unit.transition.clone().unwrap_or_default(),
            unit.error.clone().unwrap_or_default()
        );
        let deadline = self.kv_deadline;
        let _ = tokio::time::timeout(deadline, kv.list_push(&key, &encoded)).await;
        let _ = tokio::time::timeout(deadline, kv.list_trim(&key, self.retention_bound)).await;
        let _ = tokio::time::timeout(deadline, kv.set_add("state:requests", &self.request_id)).await;
    }
}

#[async_trait::async_trait]
impl StackTrace for SimpleInspector {
    async fn record_step(&self, unit: CapturedStateUnit) {
        self.persist(&unit).await;
        self.history.lock().expect("inspector mutex poisoned").push(unit);
    }

    fn history(&self) -> Vec<CapturedStateUnit> {
        self.history.lock().expect("inspector mutex poisoned").clone()
    }

    fn set_breakpoint(&self, task_id: &str) {
        self.breakpoints
            .lock()
            .expect("inspector mutex poisoned")
            .insert(task_id.to_string());
    }

    fn clear_breakpoints(&self) {
        self.breakpoints.lock().expect("inspector mutex poisoned").clear();
    }

    fn has_breakpoint(&self, task_id: &str) -> bool {
        self.breakpoints
            .lock()
            .expect("inspector mutex poisoned")
            .contains(task_id)
    }
}

/// Helper to stamp a [`CapturedStateUnit`] from attempt bookkeeping,
/// keeping `task_exec` call sites free of struct-literal noise.
#[must_use]
pub fn capture(
    task_id: &str,
    task_kind: &str,
    input_type: DataType,
    started: DateTime<Utc>,
    finished: DateTime<Utc>,
    input: &str,
    outcome: Result<(DataType, String, String), String>,
) -> CapturedStateUnit {
    let duration = (finished - started)
        .to_std()
        .unwrap_or(Duration::from_secs(0));
    match outcome {
        Ok((output_type, transition, output)) => CapturedStateUnit {
            task_id: task_id.to_string(),
            task_kind: task_kind.to_string(),
            input_type,
            output_type: Some(output_type),
            transition: Some(transition),
            duration,
            error: None,
            input: input.to_string(),
            output: Some(output),
        },
        Err(error) => CapturedStateUnit {
            task_id: task_id.to_string(),
            task_kind: task_kind.to_string(),
            input_type,
            output_type: None,
            transition: None,
            duration,
            error: Some(error),
            input: input.to_string(),
            output: None,
        },
    }
}
