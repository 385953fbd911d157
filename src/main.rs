mod cli;

use anyhow::Result;
use rsnip::{
    config::Config,
    handlers::{
        self,
        document::{DocumentOptions, EnvironmentPolicy},
    },
    printer::OutputPrinter,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load config, then let CLI flags override it
    let mut cfg = Config::load();
    if let Some(bin) = &args.r_binary {
        cfg.set("R_BINARY", bin.as_str());
    }
    if let Some(size) = args.canvas_size {
        cfg.set("CANVAS_SIZE", size.to_string());
    }
    if let Some(dir) = &args.plots_dir {
        cfg.set("PLOTS_DIR", dir.to_string_lossy());
    }
    tracing::debug!(config = %cfg.config_path.display(), "configuration loaded");

    let printer = OutputPrinter { plots_dir: cfg.plots_dir() };

    match args.command {
        cli::Command::Run { files, shared, isolated, json, md, no_md } => {
            let policy = if isolated {
                EnvironmentPolicy::PerSnippet
            } else if shared || cfg.get_bool("SHARED_ENVIRONMENT") {
                EnvironmentPolicy::Shared
            } else {
                EnvironmentPolicy::PerSnippet
            };
            let markdown = if no_md {
                false
            } else if md {
                true
            } else {
                cfg.get_bool("PRETTIFY_MARKDOWN")
            };
            let opts = DocumentOptions { policy, json, markdown, printer };
            handlers::document::run(&files, &cfg, &opts).await
        }
        cli::Command::List { files, json } => handlers::document::list(&files, json),
        cli::Command::Repl => handlers::repl::run(&cfg, &printer).await,
    }
}
