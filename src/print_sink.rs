//! Print sink contract: a line-oriented writer receiving rendered
//! `print` strings emitted by the runner each step.

use std::sync::Mutex;

pub trait PrintSink: Send + Sync {
    fn print_line(&self, line: &str);
}

/// Writes every line to stdout.
pub struct StdoutPrintSink;

impl PrintSink for StdoutPrintSink {
    fn print_line(&self, line: &str) {
        println!("{line}");
    }
}

/// Collects lines in-memory, for tests and for embedding consumers that
/// want to inspect printed output rather than see it on stdout.
#[derive(Default)]
pub struct VecPrintSink {
    lines: Mutex<Vec<String>>,
}

impl VecPrintSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("print sink mutex poisoned").clone()
    }
}

impl PrintSink for VecPrintSink {
    fn print_line(&self, line: &str) {
        self.lines
            .lock()
            .expect("print sink mutex poisoned")
            .push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_collects_lines() {
        let sink = VecPrintSink::new();
        sink.print_line("a");
        sink.print_line("b");
        assert_eq!(sink.lines(), vec!["a".to_string(), "b".to_string()]);
    }
}
