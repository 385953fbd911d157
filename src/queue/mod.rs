//! Single-writer execution queue over one interpreter session.
//!
//! All interaction with the session goes through one FIFO channel read by
//! one worker task that owns the session. A turn writes one line, then
//! drains events into a fresh [`OutputCollector`] until the session reports
//! it is ready again, so output never leaks between turns.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::execution::{OutputCollector, DEFAULT_CANVAS_SIZE};
use crate::session::{InterpreterSession, SessionError, SessionEvent};

pub mod scope;

pub use scope::EnvironmentId;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("interpreter failed to initialize: {0}")]
    Init(String),
    /// The turn could not complete against the session. `partial` holds
    /// whatever was collected before the failure.
    #[error("interpreter transport failed: {source}")]
    Transport {
        #[source]
        source: SessionError,
        partial: OutputCollector,
    },
    #[error("execution queue has shut down")]
    Closed,
}

impl QueueError {
    pub fn partial(&self) -> Option<&OutputCollector> {
        match self {
            QueueError::Transport { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOptions {
    pub canvas_size: u32,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self { canvas_size: DEFAULT_CANVAS_SIZE }
    }
}

impl QueueOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self { canvas_size: cfg.canvas_size() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InitState {
    Pending,
    Ready,
    Failed(String),
}

type Reply = oneshot::Sender<Result<OutputCollector, QueueError>>;

enum Turn {
    Bind(EnvironmentId),
    Run {
        code: String,
        env: EnvironmentId,
        reply: Reply,
    },
}

/// Handle to the worker that owns the interpreter session.
pub struct ExecutionQueue {
    turns: mpsc::UnboundedSender<Turn>,
    next_env: AtomicU32,
    init: watch::Receiver<InitState>,
    worker: JoinHandle<()>,
}

impl ExecutionQueue {
    /// Start the worker. It initializes the session before taking any
    /// turn, so turns enqueued right away wait behind initialization.
    pub fn spawn<S: InterpreterSession>(session: S, opts: QueueOptions) -> Self {
        let (turns, rx) = mpsc::unbounded_channel();
        let (init_tx, init) = watch::channel(InitState::Pending);
        let worker = tokio::spawn(run_worker(session, rx, init_tx, opts));
        Self {
            turns,
            next_env: AtomicU32::new(0),
            init,
            worker,
        }
    }

    /// Start the worker and wait until the session is ready for input.
    pub async fn initialize<S: InterpreterSession>(
        session: S,
        opts: QueueOptions,
    ) -> Result<Self, QueueError> {
        let queue = Self::spawn(session, opts);
        queue.initialized().await?;
        Ok(queue)
    }

    /// Resolve once startup has finished, with its outcome.
    pub async fn initialized(&self) -> Result<(), QueueError> {
        let mut init = self.init.clone();
        let state = init
            .wait_for(|s| *s != InitState::Pending)
            .await
            .map_err(|_| QueueError::Closed)?;
        match &*state {
            InitState::Failed(msg) => Err(QueueError::Init(msg.clone())),
            _ => Ok(()),
        }
    }

    /// Allocate a new environment handle and enqueue its binding.
    ///
    /// The handle can be used immediately: any turn enqueued after this
    /// call runs after the binding.
    pub fn create_environment(&self) -> EnvironmentId {
        let env = EnvironmentId(self.next_env.fetch_add(1, Ordering::Relaxed));
        if self.turns.send(Turn::Bind(env)).is_err() {
            debug!(%env, "queue closed before environment could be bound");
        }
        env
    }

    /// Enqueue `code` to run inside `env`.
    ///
    /// The turn is enqueued when this is called, not when the returned
    /// future is first polled, so call order is execution order.
    pub fn run(&self, code: impl Into<String>, env: EnvironmentId) -> PendingTurn {
        let (reply, rx) = oneshot::channel();
        let turn = Turn::Run {
            code: code.into(),
            env,
            reply,
        };
        // On failure the reply sender is dropped and the turn resolves to Closed.
        let _ = self.turns.send(turn);
        PendingTurn { rx }
    }

    /// Stop accepting turns, finish the ones already queued, and close
    /// the session.
    pub async fn shutdown(self) {
        let Self { turns, worker, .. } = self;
        drop(turns);
        if let Err(e) = worker.await {
            warn!("execution queue worker failed: {e}");
        }
    }
}

/// The eventual result of one queued turn.
#[must_use = "a turn's output is only observable by awaiting it"]
pub struct PendingTurn {
    rx: oneshot::Receiver<Result<OutputCollector, QueueError>>,
}

impl Future for PendingTurn {
    type Output = Result<OutputCollector, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or_else(|_| Err(QueueError::Closed)))
    }
}

async fn run_worker<S: InterpreterSession>(
    mut session: S,
    mut turns: mpsc::UnboundedReceiver<Turn>,
    init: watch::Sender<InitState>,
    opts: QueueOptions,
) {
    let state = match start(&mut session, opts.canvas_size).await {
        Ok(()) => {
            info!("interpreter session ready");
            InitState::Ready
        }
        Err(e) => {
            warn!("interpreter session failed to start: {e}");
            InitState::Failed(e.to_string())
        }
    };
    init.send_replace(state);

    let mut seq: u64 = 0;
    while let Some(turn) = turns.recv().await {
        seq += 1;
        match turn {
            Turn::Bind(env) => {
                debug!(turn = seq, %env, "binding environment");
                let mut out = OutputCollector::new();
                match execute(&mut session, scope::bind_line(env), &mut out, opts.canvas_size).await {
                    Ok(()) if out.stderr().is_empty() => {}
                    Ok(()) => warn!(%env, stderr = ?out.stderr(), "environment binding reported errors"),
                    Err(e) => warn!(%env, "failed to bind environment: {e}"),
                }
            }
            Turn::Run { code, env, reply } => {
                debug!(turn = seq, %env, bytes = code.len(), "running code");
                let mut out = OutputCollector::new();
                let line = scope::scoped_line(&code, env);
                let result = match execute(&mut session, line, &mut out, opts.canvas_size).await {
                    Ok(()) => Ok(out),
                    Err(source) => {
                        warn!(turn = seq, %env, "turn failed: {source}");
                        Err(QueueError::Transport { source, partial: out })
                    }
                };
                if reply.send(result).is_err() {
                    debug!(turn = seq, "caller went away before the turn resolved");
                }
            }
        }
    }

    debug!(turns = seq, "execution queue drained, closing session");
    if let Err(e) = session.close().await {
        warn!("failed to close interpreter session: {e}");
    }
}

/// Start the session and discard its startup output.
async fn start<S: InterpreterSession>(session: &mut S, canvas_size: u32) -> Result<(), SessionError> {
    session.init().await?;
    let mut banner = OutputCollector::new();
    drain(session, &mut banner, canvas_size).await?;
    debug!(
        stdout = banner.stdout().len(),
        stderr = banner.stderr().len(),
        "discarded startup output"
    );
    Ok(())
}

async fn execute<S: InterpreterSession>(
    session: &mut S,
    line: String,
    out: &mut OutputCollector,
    canvas_size: u32,
) -> Result<(), SessionError> {
    session.write(line).await?;
    drain(session, out, canvas_size).await
}

/// Read events into `out` until the session is ready for the next input.
pub async fn drain<S: InterpreterSession + ?Sized>(
    session: &mut S,
    out: &mut OutputCollector,
    canvas_size: u32,
) -> Result<(), SessionError> {
    loop {
        match session.read().await? {
            SessionEvent::Stdout(line) => out.push_stdout(line),
            SessionEvent::Stderr(line) => out.push_stderr(line),
            SessionEvent::Graphics(op) => out.push_graphics(&op, canvas_size),
            SessionEvent::Ready => return Ok(()),
        }
    }
}
