use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "rsnip", about = "Run R code blocks from documentation in one R session", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log queue and interpreter activity at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// R executable to start (overrides R_BINARY).
    #[arg(long = "r-binary", global = true)]
    pub r_binary: Option<String>,

    /// Side length of the square canvas, in logical units (overrides CANVAS_SIZE).
    #[arg(long = "canvas-size", global = true)]
    pub canvas_size: Option<u32>,

    /// Write canvases as SVG files into this directory (overrides PLOTS_DIR).
    #[arg(long = "plots-dir", global = true)]
    pub plots_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run every R snippet in the given documents, in document order.
    #[command(group(ArgGroup::new("env_switch").args(["shared", "isolated"]).multiple(false)))]
    #[command(group(ArgGroup::new("md_switch").args(["md", "no_md"]).multiple(false)))]
    Run {
        /// Markdown, R Markdown, or rendered HTML documents.
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,

        /// All snippets of a document share one environment.
        #[arg(long)]
        shared: bool,
        /// Each snippet gets a fresh environment.
        #[arg(long)]
        isolated: bool,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,

        /// Echo each snippet as Markdown before its output.
        #[arg(long)]
        md: bool,
        /// Echo each snippet as a plain heading.
        #[arg(long = "no-md")]
        no_md: bool,
    },

    /// List the R snippets found in the given documents.
    List {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,

        /// Print snippets as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Read R lines from stdin and run each one in a single environment.
    Repl,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
