// eldag/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing)
    // Logs go to stderr so that `--format json` output stays parseable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file, folder } => commands::validate::execute(file, folder),
        Commands::List { file, format } => commands::list::execute(file, format),
        Commands::Resolve {
            file,
            job,
            mode,
            format,
        } => commands::resolve::execute(file, job, mode, format),
        Commands::Plan {
            file,
            job,
            now,
            format,
        } => commands::plan::execute(file, job, now, format),
        Commands::Export { file, output } => commands::export::execute(file, output),
    }
}
