//! Plain-text rendering of a chain's recorded trace and error chains, for
//! CLI/log consumers that want something friendlier than `Debug`.

use std::io::IsTerminal;

use crate::errors::RunnerError;
use crate::inspector::CapturedStateUnit;

pub const CONTEXT_COLOR: &str = "\x1b[32m"; // green
pub const LINE_COLOR: &str = "\x1b[35m"; // magenta / dark pink
pub const RESET_COLOR: &str = "\x1b[0m";

/// Controls whether a [`PlainFormatter`] emits ANSI color codes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatterMode {
    /// Colorize only when stdout is a TTY.
    #[default]
    Auto,
    /// Always emit ANSI color codes, regardless of TTY state.
    Always,
    /// Never emit ANSI color codes; for plain-text log files.
    Plain,
}

impl FormatterMode {
    fn colors_enabled(self) -> bool {
        match self {
            FormatterMode::Auto => std::io::stdout().is_terminal(),
            FormatterMode::Always => true,
            FormatterMode::Plain => false,
        }
    }
}

/// Rendered output for a trace step or error that can be consumed by sinks.
#[derive(Clone, Debug, Default)]
pub struct EventRender {
    pub context: Option<String>,
    pub lines: Vec<String>,
}

impl EventRender {
    pub fn join_lines(&self) -> String {
        self.lines.join("")
    }
}

pub trait TelemetryFormatter: Send + Sync {
    fn render_step(&self, step: &CapturedStateUnit) -> EventRender;
    fn render_trace(&self, trace: &[CapturedStateUnit]) -> Vec<EventRender>;
    fn render_runner_error(&self, error: &RunnerError) -> EventRender;
}

#[derive(Clone, Copy, Debug)]
pub struct PlainFormatter {
    mode: FormatterMode,
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new(FormatterMode::default())
    }
}

impl PlainFormatter {
    #[must_use]
    pub fn new(mode: FormatterMode) -> Self {
        Self { mode }
    }

    fn wrap(&self, color: &str, text: &str) -> String {
        if self.mode.colors_enabled() {
            format!("{color}{text}{RESET_COLOR}")
        } else {
            text.to_string()
        }
    }
}

impl TelemetryFormatter for PlainFormatter {
    fn render_step(&self, step: &CapturedStateUnit) -> EventRender {
        let mut lines = Vec::new();
        lines.push(format!(
            "{}\n",
            self.wrap(CONTEXT_COLOR, &format!("[{}] {}", step.task_id, step.task_kind))
        ));
        let output_type_str = step
            .output_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "{}\n",
            self.wrap(
                LINE_COLOR,
                &format!("  {} -> {} ({} ms)", step.input_type, output_type_str, step.duration.as_millis())
            )
        ));
        if let Some(transition) = &step.transition {
            lines.push(format!("{}\n", self.wrap(LINE_COLOR, &format!("  transition: {transition}"))));
        }
        if let Some(error) = &step.error {
            lines.push(format!("{}\n", self.wrap(LINE_COLOR, &format!("  error: {error}"))));
        }
        EventRender {
            context: Some(step.task_id.clone()),
            lines,
        }
    }

    fn render_trace(&self, trace: &[CapturedStateUnit]) -> Vec<EventRender> {
        trace.iter().map(|step| self.render_step(step)).collect()
    }

    fn render_runner_error(&self, error: &RunnerError) -> EventRender {
        let mut lines = vec![format!("{}\n", self.wrap(LINE_COLOR, &format!("error: {error}")))];
        let mut source = std::error::Error::source(error);
        let mut indent = 1;
        while let Some(cause) = source {
            let indent_str = "  ".repeat(indent);
            lines.push(format!(
                "{}\n",
                self.wrap(LINE_COLOR, &format!("{indent_str}caused by: {cause}"))
            ));
            source = cause.source();
            indent += 1;
        }
        EventRender {
            context: None,
            lines,
        }
    }
}
