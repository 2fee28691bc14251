//! Optional observability hook: pure, engine behavior never depends
//! on it. `start(action, subject) → (report_error, report_change, end)`.

/// A live tracking span returned by [`Tracker::start`].
pub trait TrackerSpan: Send {
    fn report_error(&mut self, error: &str);
    fn report_change(&mut self, field: &str, value: &str);
    fn end(self: Box<Self>);
}

pub trait Tracker: Send + Sync {
    fn start(&self, action: &str, subject: &str) -> Box<dyn TrackerSpan>;
}

/// A [`Tracker`] that discards everything; the default when no caller
/// supplies one.
pub struct NullTracker;

struct NullSpan;

impl TrackerSpan for NullSpan {
    fn report_error(&mut self, _error: &str) {}
    fn report_change(&mut self, _field: &str, _value: &str) {}
    fn end(self: Box<Self>) {}
}

impl Tracker for NullTracker {
    fn start(&self, _action: &str, _subject: &str) -> Box<dyn TrackerSpan> {
        Box::new(NullSpan)
    }
}

pub mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every reported action/error/change for assertions in tests.
    #[derive(Default)]
    pub struct RecordingTracker {
        pub events: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingTracker {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    struct RecordingSpan {
        subject: String,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl TrackerSpan for RecordingSpan {
        fn report_error(&mut self, error: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}: error {error}", self.subject));
        }

        fn report_change(&mut self, field: &str, value: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}: {field}={value}", self.subject));
        }

        fn end(self: Box<Self>) {
            self.events.lock().unwrap().push(format!("{}: end", self.subject));
        }
    }

    impl Tracker for RecordingTracker {
        fn start(&self, action: &str, subject: &str) -> Box<dyn TrackerSpan> {
            self.events
                .lock()
                .unwrap()
                .push(format!("{subject}: start {action}"));
            Box::new(RecordingSpan {
                subject: subject.to_string(),
                events: self.events.clone(),
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn records_lifecycle() {
            let tracker = RecordingTracker::new();
            let span = tracker.start("action", "subj");
            span.end();
            let events = tracker.events.lock().unwrap();
            assert_eq!(events.as_slice(), ["subj: start action", "subj: end"]);
        }
    }
}
