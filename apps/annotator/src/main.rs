use std::path::PathBuf;

use annotation_core::{AnnotationSession, CourseBackend, HttpCourseBackend, SessionDriver};
use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use shared::{
    domain::{AppMode, ExportFormat, ObjectType},
    protocol::CourseQuery,
};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;
mod repl;

#[derive(Parser, Debug)]
#[command(about = "Build and score labeled trajectory courses")]
struct Cli {
    /// Settings file, `annotator.toml` by default.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive annotation session (the default).
    Session,
    Export {
        #[arg(long, default_value = "both")]
        format: ExportFormat,
    },
    Courses {
        #[arg(long)]
        mode: Option<AppMode>,
        #[arg(long)]
        object_type: Option<ObjectType>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = config::load_settings(cli.config.as_deref());
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    let backend = HttpCourseBackend::new(settings.api_url.clone());

    match cli.command.unwrap_or(Command::Session) {
        Command::Session => {
            let session = AnnotationSession::new(settings.session_settings(), Utc::now())?;
            repl::run(SessionDriver::new(session, backend)).await?;
        }
        Command::Export { format } => {
            let export = backend.export_csv(format).await?;
            println!(
                "Exported {} courses and {} points",
                export.stats.total_courses, export.stats.total_points
            );
            for file in &export.files {
                println!("  {}: {}", file.name, backend.download_url(file)?);
            }
        }
        Command::Courses {
            mode,
            object_type,
            limit,
        } => {
            let query = CourseQuery {
                mode,
                object_type,
                limit,
            };
            for course in backend.list_courses(&query).await? {
                println!(
                    "{:<26} {:<6} {:<8} noise {:>3}%  {:>4} points",
                    course.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
                    course.object_type.as_str(),
                    course.mode.as_str(),
                    course.noise_level,
                    course.points.len(),
                );
            }
        }
        Command::Stats => {
            let stats = backend.testing_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
