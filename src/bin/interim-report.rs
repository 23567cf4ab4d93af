use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use interim_report::server;
use interim_report::service::grade_service::GradeService;
use interim_report::sinks::export::write_rows_csv;
use interim_report::utils::config_loader;
use interim_report::utils::logging;
use interim_report::utils::logging::LogLevel;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "interim-report.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Resolve one student's grades and print them as CSV
    Lookup {
        email: String,
        /// write the CSV here instead of stdout
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Re-pull the student directory and replace the snapshot file
    Rebuild,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level)?;

    // -------------------------------
    // 2. Wire token manager, fetcher, index and resolver
    // -------------------------------

    let grades = GradeService::from_config(&service_config).await?;

    // -------------------------------
    // 3. Run the requested command
    // -------------------------------

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Service starting...");
            server::server::start(&service_config.settings, grades).await?;
        }
        Command::Lookup { email, csv } => {
            let rows = grades.resolve_grades(&email).await?;
            info!(rows = rows.len(), "lookup finished");
            match csv {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("failed to create '{}'", path.display()))?;
                    write_rows_csv(file, &rows)?;
                    info!("rows written to {}", path.display());
                }
                None => write_rows_csv(std::io::stdout().lock(), &rows)?,
            }
        }
        Command::Rebuild => {
            let summary = grades.rebuild_student_index().await?;
            info!(
                students = summary.students,
                updated_at = %summary.updated_at.to_rfc3339(),
                "student index rebuilt"
            );
        }
    }

    Ok(())
}
