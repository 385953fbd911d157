//! Document handler: run every R snippet of one or more documents.

use anyhow::{Context, Result};
use serde_json::json;

use crate::{
    config::Config,
    execution::OutputCollector,
    printer::{MarkdownPrinter, OutputPrinter},
    queue::{EnvironmentId, ExecutionQueue, PendingTurn, QueueError, QueueOptions},
    session::RProcess,
    snippets::{self, Snippet},
    utils::read_document,
};

/// Which environment each snippet of a document runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentPolicy {
    /// One environment per document, so later snippets see earlier variables.
    Shared,
    /// A fresh environment for every snippet.
    PerSnippet,
}

#[derive(Debug, Clone)]
pub struct DocumentOptions {
    pub policy: EnvironmentPolicy,
    pub json: bool,
    pub markdown: bool,
    pub printer: OutputPrinter,
}

pub async fn run(files: &[String], cfg: &Config, opts: &DocumentOptions) -> Result<()> {
    let session = RProcess::from_config(cfg);
    let queue = ExecutionQueue::initialize(session, QueueOptions::from_config(cfg))
        .await
        .with_context(|| format!("Failed to start R ({})", cfg.r_binary()))?;
    let outcome = run_files(&queue, files, opts).await;
    queue.shutdown().await;
    outcome
}

pub async fn run_files(queue: &ExecutionQueue, files: &[String], opts: &DocumentOptions) -> Result<()> {
    let mut report = Vec::new();

    for file in files {
        let (kind, content) = read_document(file)?;
        let snippets = snippets::extract(kind, &content);
        tracing::info!(file = %file, snippets = snippets.len(), "running document");

        let pending = enqueue(queue, &snippets, opts.policy);
        for (snippet, (env, turn)) in snippets.iter().zip(pending) {
            let result = turn.await;
            if opts.json {
                report.push(json_entry(file, snippet, env, &result));
                continue;
            }
            if opts.markdown {
                MarkdownPrinter::default().print_code(&format!("{} {}", file, snippet.title()), &snippet.code);
            } else {
                println!("## {} {}", file, snippet.title());
            }
            opts.printer.print_result(&result, &plot_name(file, snippet))?;
            println!();
        }
    }

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

/// Allocate environments and enqueue every snippet without waiting, so the
/// queue runs them in document order.
pub fn enqueue(
    queue: &ExecutionQueue,
    snippets: &[Snippet],
    policy: EnvironmentPolicy,
) -> Vec<(EnvironmentId, PendingTurn)> {
    let shared = match policy {
        EnvironmentPolicy::Shared if !snippets.is_empty() => Some(queue.create_environment()),
        _ => None,
    };
    snippets
        .iter()
        .map(|s| {
            let env = shared.unwrap_or_else(|| queue.create_environment());
            (env, queue.run(s.code.clone(), env))
        })
        .collect()
}

pub fn list(files: &[String], as_json: bool) -> Result<()> {
    let mut all = Vec::new();
    for file in files {
        let (kind, content) = read_document(file)?;
        let snippets = snippets::extract(kind, &content);
        if as_json {
            all.push(json!({ "file": file, "snippets": snippets }));
            continue;
        }
        println!("{}: {} R snippet(s)", file, snippets.len());
        for s in &snippets {
            let first = s.code.lines().next().unwrap_or("");
            println!("  {} {}", s.title(), first);
        }
    }
    if as_json {
        println!("{}", serde_json::to_string_pretty(&all)?);
    }
    Ok(())
}

fn plot_name(file: &str, snippet: &Snippet) -> String {
    let stem = std::path::Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("snippet");
    format!("{}-{}", stem, snippet.index + 1)
}

/// One snippet's entry in the `--json` report.
pub fn json_entry(
    file: &str,
    snippet: &Snippet,
    env: EnvironmentId,
    result: &Result<OutputCollector, QueueError>,
) -> serde_json::Value {
    match result {
        Ok(out) => json!({
            "file": file,
            "index": snippet.index,
            "label": snippet.label,
            "environment": env,
            "ok": true,
            "output": out,
        }),
        Err(err) => json!({
            "file": file,
            "index": snippet.index,
            "label": snippet.label,
            "environment": env,
            "ok": false,
            "error": err.to_string(),
            "output": err.partial(),
        }),
    }
}
