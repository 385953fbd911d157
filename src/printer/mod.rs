//! Printers: turn output (owo-colors) and snippet source (termimad).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use termimad::MadSkin;

use crate::execution::{OutputCollector, Rendered};
use crate::queue::QueueError;

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
    }

    pub fn print_code(&self, title: &str, code: &str) {
        self.print(&format!("### {}\n\n```r\n{}\n```\n", title, code.trim_end()));
    }
}

/// Prints one turn's result, choosing text or canvas per
/// [`OutputCollector::display`].
#[derive(Debug, Clone, Default)]
pub struct OutputPrinter {
    /// Where canvases are written as SVG; summarized when unset.
    pub plots_dir: Option<PathBuf>,
}

impl OutputPrinter {
    pub fn print(&self, out: &OutputCollector, plot_name: &str) -> Result<()> {
        match out.display() {
            Rendered::Graphics(canvas) => match &self.plots_dir {
                Some(dir) => {
                    fs::create_dir_all(dir)
                        .with_context(|| format!("Failed to create plots dir {}", dir.display()))?;
                    let path = dir.join(format!("{plot_name}.svg"));
                    fs::write(&path, canvas.to_svg())
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{}", format!("[plot written to {}]", path.display()).cyan());
                }
                None => println!(
                    "{}",
                    format!(
                        "[plot {}x{}, {} drawing operations; set PLOTS_DIR to save it]",
                        canvas.width(),
                        canvas.height(),
                        canvas.ops_applied()
                    )
                    .cyan()
                ),
            },
            Rendered::Text(_) => {
                for line in out.stdout() {
                    println!("{line}");
                }
                for line in out.stderr() {
                    println!("{}", line.yellow());
                }
            }
        }
        Ok(())
    }

    /// Print a failed turn so it cannot be mistaken for empty output.
    pub fn print_error(&self, err: &QueueError, plot_name: &str) -> Result<()> {
        println!("{}", format!("Error: {err}").red());
        if let Some(partial) = err.partial().filter(|p| !p.is_empty()) {
            println!("{}", "(partial output)".dimmed());
            self.print(partial, plot_name)?;
        }
        Ok(())
    }

    pub fn print_result(&self, result: &Result<OutputCollector, QueueError>, plot_name: &str) -> Result<()> {
        match result {
            Ok(out) => self.print(out, plot_name),
            Err(err) => self.print_error(err, plot_name),
        }
    }
}
