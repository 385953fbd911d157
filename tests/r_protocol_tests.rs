//! `RProcess` against a shell stand-in for R that speaks the same console
//! protocol: it learns the ready sentinel from the bootstrap and answers
//! each `.rsnip_console(...)` call with canned output.
#![cfg(unix)]

use std::fs;

use anyhow::Result;
use rsnip::queue::{ExecutionQueue, QueueOptions};
use rsnip::session::r::{RProcess, RProcessOptions};
use rsnip::session::{InterpreterSession, SessionError, SessionEvent};
use tempfile::TempDir;

const FAKE_R: &str = r#"
S=
emit_ready() {
  printf '%s\n' "$S"
  printf '%s\n' "$S" >&2
}
while IFS= read -r line; do
  if [ -z "$S" ]; then
    S=$(printf '%s\n' "$line" | sed -n 's/.*\(<<rsnip-ready-[0-9]*-[0-9]*>>\).*/\1/p')
  fi
  case "$line" in
    '.rsnip_ready()') emit_ready ;;
    quit*) exit 0 ;;
    '.rsnip_console('*)
      case "$line" in
        *latin1*) printf 'caf\351\n' ;;
        *inline*) printf 'partial%s\n' "$S"; printf '%s\n' "$S" >&2; continue ;;
        *late*) printf '%s\n' "$S" >&2; sleep 0.2; printf 'late\n'; printf '%s\n' "$S"; continue ;;
        *noisy*) printf '[1] 2\n'; printf '%s\n' "$S"; sleep 0.2; printf 'note\n' >&2; printf '%s\n' "$S" >&2; continue ;;
        *plot*) printf '#!rsnip-canvas fillRect(0, 0, 4, 4)\n' ;;
        *exit*) exit 0 ;;
        *1+1*) printf '[1] 2\n' ;;
      esac
      emit_ready ;;
  esac
done
"#;

fn fake_r() -> Result<(TempDir, RProcess)> {
    let dir = tempfile::tempdir()?;
    let script = dir.path().join("fake-r.sh");
    fs::write(&script, FAKE_R)?;
    let session = RProcess::new(RProcessOptions {
        program: "sh".into(),
        args: vec![script.to_string_lossy().into_owned()],
        env: vec![],
    });
    Ok((dir, session))
}

/// Events of one turn, up to but excluding `Ready`.
async fn turn(session: &mut RProcess, code: &str) -> Result<Vec<SessionEvent>, SessionError> {
    session.write(code.to_string()).await?;
    until_ready(session).await
}

async fn until_ready(session: &mut RProcess) -> Result<Vec<SessionEvent>, SessionError> {
    let mut events = Vec::new();
    loop {
        match session.read().await? {
            SessionEvent::Ready => return Ok(events),
            event => events.push(event),
        }
    }
}

async fn started() -> Result<(TempDir, RProcess)> {
    let (dir, mut session) = fake_r()?;
    session.init().await?;
    assert!(until_ready(&mut session).await?.is_empty());
    Ok((dir, session))
}

#[tokio::test]
async fn test_plain_output_then_ready() -> Result<()> {
    let (_dir, mut session) = started().await?;
    assert_eq!(turn(&mut session, "1+1").await?, [SessionEvent::Stdout("[1] 2".into())]);
    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_output_sharing_a_line_with_the_sentinel() -> Result<()> {
    let (_dir, mut session) = started().await?;
    assert_eq!(
        turn(&mut session, "inline").await?,
        [SessionEvent::Stdout("partial".into())]
    );
    // The next turn starts clean.
    assert_eq!(turn(&mut session, "1+1").await?, [SessionEvent::Stdout("[1] 2".into())]);
    Ok(())
}

#[tokio::test]
async fn test_marker_lines_become_graphics() -> Result<()> {
    let (_dir, mut session) = started().await?;
    assert_eq!(
        turn(&mut session, "plot").await?,
        [SessionEvent::Graphics("fillRect(0, 0, 4, 4)".into())]
    );
    Ok(())
}

#[tokio::test]
async fn test_ready_waits_for_stdout_sentinel() -> Result<()> {
    let (_dir, mut session) = started().await?;
    // stderr finishes first; stdout output still belongs to this turn.
    assert_eq!(turn(&mut session, "late").await?, [SessionEvent::Stdout("late".into())]);
    Ok(())
}

#[tokio::test]
async fn test_ready_waits_for_stderr_sentinel() -> Result<()> {
    let (_dir, mut session) = started().await?;
    assert_eq!(
        turn(&mut session, "noisy").await?,
        [
            SessionEvent::Stdout("[1] 2".into()),
            SessionEvent::Stderr("note".into()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_process_exit_reports_closed() -> Result<()> {
    let (_dir, mut session) = started().await?;
    match turn(&mut session, "exit").await {
        Err(SessionError::Closed) => {}
        other => panic!("expected closed session, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_non_utf8_output_does_not_stall_the_queue() -> Result<()> {
    let (_dir, session) = fake_r()?;
    let queue = ExecutionQueue::initialize(session, QueueOptions::default()).await?;
    let env = queue.create_environment();

    let latin1 = queue.run("latin1", env);
    let after = queue.run("1+1", env);

    assert_eq!(latin1.await?.stdout(), ["caf\u{fffd}"]);
    assert_eq!(after.await?.stdout(), ["[1] 2"]);
    queue.shutdown().await;
    Ok(())
}
