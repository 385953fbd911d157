//! Interpreter session boundary (startup/IO/teardown).

use futures::future::{self, BoxFuture};
use std::fmt;

pub mod r;

pub use r::RProcess;

/// One item of the interpreter's output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A line written to standard output.
    Stdout(String),
    /// A line written to standard error.
    Stderr(String),
    /// A canvas drawing operation, e.g. `fillRect(0, 0, 10, 10)`.
    Graphics(String),
    /// The interpreter finished the last input and is waiting for more.
    Ready,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Stdout(s) => write!(f, "stdout: {s}"),
            SessionEvent::Stderr(s) => write!(f, "stderr: {s}"),
            SessionEvent::Graphics(s) => write!(f, "graphics: {s}"),
            SessionEvent::Ready => f.write_str("ready"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("interpreter session has not been started")]
    NotStarted,
    #[error("interpreter session closed its output stream")]
    Closed,
    #[error("failed to start interpreter `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("interpreter I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// A stateful, line-oriented interpreter that signals completion in-band.
///
/// Implementations process one line at a time: after each `write` the
/// caller is expected to `read` until [`SessionEvent::Ready`] comes back.
/// The queue is the only caller, so implementations need no locking.
pub trait InterpreterSession: Send + 'static {
    /// Start the interpreter. Any banner it prints is followed by `Ready`.
    fn init(&mut self) -> BoxFuture<'_, Result<(), SessionError>>;

    /// Feed one line of source text into the interpreter's input.
    fn write(&mut self, line: String) -> BoxFuture<'_, Result<(), SessionError>>;

    /// Wait for the next event the interpreter emits.
    fn read(&mut self) -> BoxFuture<'_, Result<SessionEvent, SessionError>>;

    /// Release the interpreter. The default does nothing.
    fn close(&mut self) -> BoxFuture<'_, Result<(), SessionError>> {
        Box::pin(future::ready(Ok(())))
    }
}

impl<S: InterpreterSession + ?Sized> InterpreterSession for Box<S> {
    fn init(&mut self) -> BoxFuture<'_, Result<(), SessionError>> {
        (**self).init()
    }

    fn write(&mut self, line: String) -> BoxFuture<'_, Result<(), SessionError>> {
        (**self).write(line)
    }

    fn read(&mut self) -> BoxFuture<'_, Result<SessionEvent, SessionError>> {
        (**self).read()
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), SessionError>> {
        (**self).close()
    }
}
