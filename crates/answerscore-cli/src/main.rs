//! answerscore CLI: grade a student's answer PDF against a reference PDF.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "answerscore",
    version,
    about = "Automated grading of free-text exam answers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a student PDF against a reference PDF
    Grade {
        /// Student answer PDF
        #[arg(long)]
        student: PathBuf,

        /// Reference answer PDF
        #[arg(long)]
        reference: PathBuf,

        /// Student identifier used for grade history
        #[arg(long)]
        student_id: String,

        /// History key (default: the reference file name)
        #[arg(long)]
        assignment: Option<String>,

        /// Write the full outcome as JSON to this path
        #[arg(long)]
        output: Option<PathBuf>,

        /// Max questions evaluated at once (default: from config)
        #[arg(long)]
        parallelism: Option<usize>,

        /// Do not record the grade in the history store
        #[arg(long)]
        no_save: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run the document consistency checks only
    Check {
        /// Student answer PDF
        #[arg(long)]
        student: PathBuf,

        /// Reference answer PDF
        #[arg(long)]
        reference: PathBuf,
    },

    /// List recorded grades for a student
    History {
        /// Student identifier
        #[arg(long)]
        student_id: String,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("answerscore=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            student,
            reference,
            student_id,
            assignment,
            output,
            parallelism,
            no_save,
            config,
        } => {
            commands::grade::execute(
                student,
                reference,
                student_id,
                assignment,
                output,
                parallelism,
                no_save,
                config,
            )
            .await
        }
        Commands::Check { student, reference } => {
            commands::check::execute(student, reference).await
        }
        Commands::History {
            student_id,
            format,
            config,
        } => commands::history::execute(student_id, format, config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
