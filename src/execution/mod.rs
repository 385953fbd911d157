//! Per-turn output: stdout/stderr lines and an optional canvas.

use serde::Serialize;

pub mod canvas;

pub use canvas::{Canvas, DrawOp, DrawOpError, DEFAULT_CANVAS_SIZE};

/// Everything one turn produced.
///
/// A fresh, empty collector is created for every turn; the queue fills it
/// while draining the session and hands it to the caller once the turn
/// resolves. Both line sequences are always present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputCollector {
    stdout: Vec<String>,
    stderr: Vec<String>,
    graphics: Option<Canvas>,
}

/// What a caller should show for a finished turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered<'a> {
    Text(String),
    Graphics(&'a Canvas),
}

impl OutputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout(&self) -> &[String] {
        &self.stdout
    }

    pub fn stderr(&self) -> &[String] {
        &self.stderr
    }

    pub fn graphics(&self) -> Option<&Canvas> {
        self.graphics.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty() && self.graphics.is_none()
    }

    pub(crate) fn push_stdout(&mut self, line: String) {
        self.stdout.push(line);
    }

    pub(crate) fn push_stderr(&mut self, line: String) {
        self.stderr.push(line);
    }

    /// Replay one drawing operation, creating the canvas on first use.
    ///
    /// An operation that does not parse is reported on stderr; the canvas
    /// still exists afterwards.
    pub(crate) fn push_graphics(&mut self, op: &str, canvas_size: u32) {
        let canvas = self
            .graphics
            .get_or_insert_with(|| Canvas::square(canvas_size));
        match op.parse::<DrawOp>() {
            Ok(op) => canvas.apply(op),
            Err(e) => self.stderr.push(format!("graphics: {e}")),
        }
    }

    /// Stdout lines followed by stderr lines, newline separated.
    pub fn text(&self) -> String {
        self.stdout
            .iter()
            .chain(self.stderr.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Pick text or canvas for display.
    ///
    /// Any stderr output means text wins, so a warning printed before a
    /// plot is never hidden behind the plot. Otherwise a canvas, if one was
    /// drawn, is shown instead of stdout.
    pub fn display(&self) -> Rendered<'_> {
        match &self.graphics {
            Some(canvas) if self.stderr.is_empty() => Rendered::Graphics(canvas),
            _ => Rendered::Text(self.text()),
        }
    }
}
