//! REPL handler: read R lines from stdin and run each in one environment.

use std::io::{self, Write};

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::{
    config::Config,
    printer::OutputPrinter,
    queue::{ExecutionQueue, QueueOptions},
    session::RProcess,
};

pub async fn run(cfg: &Config, printer: &OutputPrinter) -> Result<()> {
    let interactive = io::stdin().is_terminal();
    let session = RProcess::from_config(cfg);
    let queue = ExecutionQueue::initialize(session, QueueOptions::from_config(cfg))
        .await
        .with_context(|| format!("Failed to start R ({})", cfg.r_binary()))?;

    if interactive {
        println!("{}", "R session ready. Each line runs as one submission; Ctrl-D to exit.".dimmed());
    }
    let stdin = BufReader::new(tokio::io::stdin());
    let outcome = serve(&queue, stdin, printer, interactive).await;
    queue.shutdown().await;
    let turns = outcome?;
    tracing::debug!(turns, "repl finished");
    Ok(())
}

/// Run each non-empty input line as its own turn.
///
/// The prompt only comes back once the previous turn has resolved.
pub async fn serve<R>(
    queue: &ExecutionQueue,
    input: R,
    printer: &OutputPrinter,
    prompt: bool,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let env = queue.create_environment();
    let mut lines = input.lines();
    let mut turns = 0;

    loop {
        if prompt {
            print!("{}", "> ".green());
            io::stdout().flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        turns += 1;
        let result = queue.run(line, env).await;
        printer.print_result(&result, &format!("repl-{turns}"))?;
    }
    Ok(turns)
}
