//! R interpreter process bootstrap and I/O glue.

use std::process::Stdio;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{InterpreterSession, SessionError, SessionEvent};
use crate::config::Config;
use crate::utils::r_quote;

/// Stdout lines starting with this prefix carry a canvas operation.
pub const GRAPHICS_MARKER: &str = "#!rsnip-canvas ";

const BOOTSTRAP: &str = r#"
.rsnip_ready <- function() {
  cat("@READY@\n", sep = "")
  flush(stdout())
  cat("@READY@\n", sep = "", file = stderr())
  flush(stderr())
  invisible(NULL)
}
.rsnip_draw <- function(...) {
  cat("@MARKER@", ..., "\n", sep = "")
  flush(stdout())
  invisible(NULL)
}
.rsnip_console <- function(text) {
  tryCatch(
    withCallingHandlers(
      {
        for (expr in parse(text = text, keep.source = FALSE)) {
          res <- withVisible(eval(expr, envir = globalenv()))
          if (res$visible) print(res$value)
        }
      },
      warning = function(w) {
        message("Warning message:\n", conditionMessage(w))
        invokeRestart("muffleWarning")
      }
    ),
    error = function(e) {
      call <- conditionCall(e)
      if (is.null(call)) {
        message("Error: ", conditionMessage(e))
      } else {
        message("Error in ", paste(deparse(call), collapse = " "), " : ", conditionMessage(e))
      }
    }
  )
  flush(stdout())
  .rsnip_ready()
}
.rsnip_ready()
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug)]
struct Line {
    stream: Stream,
    text: String,
}

#[derive(Debug, Clone)]
pub struct RProcessOptions {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl RProcessOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            program: cfg.r_binary(),
            args: cfg.r_args(),
            env: cfg.r_env(),
        }
    }
}

struct Running {
    child: Child,
    stdin: ChildStdin,
    lines: mpsc::UnboundedReceiver<Line>,
    ready_stdout: bool,
    ready_stderr: bool,
}

/// An R subprocess speaking the console protocol over piped stdio.
///
/// Every written line is evaluated by a console helper installed at
/// startup, which prints a per-process sentinel on both output streams
/// once evaluation finishes. `read` turns the pair of sentinels into a
/// single [`SessionEvent::Ready`].
pub struct RProcess {
    opts: RProcessOptions,
    sentinel: String,
    running: Option<Running>,
}

impl RProcess {
    pub fn new(opts: RProcessOptions) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Self {
            opts,
            sentinel: format!("<<rsnip-ready-{}-{}>>", std::process::id(), nanos),
            running: None,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(RProcessOptions::from_config(cfg))
    }

    fn bootstrap(&self) -> String {
        BOOTSTRAP
            .replace("@READY@", &self.sentinel)
            .replace("@MARKER@", GRAPHICS_MARKER)
    }

    async fn start(&mut self) -> Result<(), SessionError> {
        if self.running.is_some() {
            return Err(SessionError::Other("R session already started".into()));
        }
        let mut cmd = Command::new(&self.opts.program);
        cmd.args(&self.opts.args)
            .envs(self.opts.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| SessionError::Spawn {
            program: self.opts.program.clone(),
            source,
        })?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::Other("no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::Other("no stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SessionError::Other("no stderr".into()))?;
        info!(program = %self.opts.program, pid = ?child.id(), "started R process");

        let (tx, rx) = mpsc::unbounded_channel();
        forward(stdout, Stream::Stdout, tx.clone());
        forward(stderr, Stream::Stderr, tx);

        stdin.write_all(self.bootstrap().as_bytes()).await?;
        stdin.flush().await?;

        self.running = Some(Running {
            child,
            stdin,
            lines: rx,
            ready_stdout: false,
            ready_stderr: false,
        });
        Ok(())
    }

    async fn send(&mut self, line: String) -> Result<(), SessionError> {
        let running = self.running.as_mut().ok_or(SessionError::NotStarted)?;
        let wrapped = format!(".rsnip_console({})\n", r_quote(&line));
        running.stdin.write_all(wrapped.as_bytes()).await?;
        running.stdin.flush().await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Result<SessionEvent, SessionError> {
        let running = self.running.as_mut().ok_or(SessionError::NotStarted)?;
        loop {
            if running.ready_stdout && running.ready_stderr {
                running.ready_stdout = false;
                running.ready_stderr = false;
                return Ok(SessionEvent::Ready);
            }
            let Line { stream, text } = running.lines.recv().await.ok_or(SessionError::Closed)?;

            // Output without a trailing newline shares a line with the sentinel.
            let text = match text.strip_suffix(self.sentinel.as_str()) {
                Some(prefix) => {
                    match stream {
                        Stream::Stdout => running.ready_stdout = true,
                        Stream::Stderr => running.ready_stderr = true,
                    }
                    if prefix.is_empty() {
                        continue;
                    }
                    prefix.to_string()
                }
                None => text,
            };

            return Ok(match stream {
                Stream::Stdout => match text.strip_prefix(GRAPHICS_MARKER) {
                    Some(op) => SessionEvent::Graphics(op.to_string()),
                    None => SessionEvent::Stdout(text),
                },
                Stream::Stderr => SessionEvent::Stderr(text),
            });
        }
    }

    async fn shutdown(&mut self) -> Result<(), SessionError> {
        let Some(mut running) = self.running.take() else {
            return Ok(());
        };
        if let Err(e) = running.stdin.write_all(b"quit(save = \"no\")\n").await {
            debug!("R stdin already closed: {e}");
        }
        drop(running.stdin);
        let status = running.child.wait().await?;
        info!(%status, "R process exited");
        Ok(())
    }
}

impl InterpreterSession for RProcess {
    fn init(&mut self) -> BoxFuture<'_, Result<(), SessionError>> {
        Box::pin(self.start())
    }

    fn write(&mut self, line: String) -> BoxFuture<'_, Result<(), SessionError>> {
        Box::pin(self.send(line))
    }

    fn read(&mut self) -> BoxFuture<'_, Result<SessionEvent, SessionError>> {
        Box::pin(self.next_event())
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), SessionError>> {
        Box::pin(self.shutdown())
    }
}

fn forward<R>(reader: R, stream: Stream, tx: mpsc::UnboundedSender<Line>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Line { stream, text: decode_line(&buf) }).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(?stream, "failed to read R output: {e}");
                    break;
                }
            }
        }
        debug!(?stream, "R output stream ended");
    });
}

/// R writes in the session locale, which need not be UTF-8.
fn decode_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
