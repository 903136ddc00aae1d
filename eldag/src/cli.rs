// eldag/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "eldag")]
#[command(about = "Resolves declarative extract-load DAG documents", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// ✅ Loads and validates a DAG document (or a whole DAGs folder)
    Validate {
        /// Document, or directory containing dags.yml
        #[arg(long, short, default_value = ".")]
        file: PathBuf,

        /// Treat --file as a DAGs folder and validate every document in it
        #[arg(long)]
        folder: bool,
    },

    /// 📋 Lists the merged jobs of a document
    List {
        #[arg(long, short, default_value = ".")]
        file: PathBuf,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// ⏱️ Resolves the schedule interval of one job (or all jobs)
    Resolve {
        #[arg(long, short, default_value = ".")]
        file: PathBuf,

        /// Job name (ex: "EL_Mailchimp"); all jobs when omitted
        #[arg(long, short)]
        job: Option<String>,

        /// Mode: standard | backfill | future
        #[arg(long, short, default_value = "standard")]
        mode: String,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// 🗺️ Shows the DAGs and tasks registered for a job
    Plan {
        #[arg(long, short, default_value = ".")]
        file: PathBuf,

        #[arg(long, short)]
        job: String,

        /// Reference time for start-date alignment (RFC 3339, default: now)
        #[arg(long)]
        now: Option<String>,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// 📝 Writes the resolved document with every field explicit
    Export {
        #[arg(long, short, default_value = ".")]
        file: PathBuf,

        /// Destination file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}
