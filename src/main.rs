use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scenesmith::config::Config;
use scenesmith::pipeline::JobOrchestrator;
use scenesmith::server;

#[derive(Parser)]
#[command(name = "scenesmith")]
#[command(version, about = "Prompt-to-video pipeline: decompose, synthesize, render, narrate")]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        #[arg(short, long, default_value = "5555")]
        port: u16,

        /// Concurrent pipeline workers
        #[arg(long)]
        workers: Option<usize>,

        /// Queued submissions beyond this are rejected
        #[arg(long)]
        queue_capacity: Option<usize>,

        #[arg(long)]
        work_root: Option<PathBuf>,

        #[arg(long)]
        publish_dir: Option<PathBuf>,
    },
    /// Generate one video in the foreground and print the published path
    Generate {
        prompt: String,

        #[arg(long)]
        work_root: Option<PathBuf>,

        #[arg(long)]
        publish_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = Config::from_env();

    match cli.command {
        Commands::Serve {
            port,
            workers,
            queue_capacity,
            work_root,
            publish_dir,
        } => {
            if let Some(workers) = workers {
                config.workers = workers.max(1);
            }
            if let Some(capacity) = queue_capacity {
                config.queue_capacity = capacity.max(1);
            }
            if let Some(work_root) = work_root {
                config.work_root = work_root;
            }
            if let Some(publish_dir) = publish_dir {
                config.publish_dir = publish_dir;
            }
            server::start_server(config, port).await
        }
        Commands::Generate {
            prompt,
            work_root,
            publish_dir,
        } => {
            if let Some(work_root) = work_root {
                config.work_root = work_root;
            }
            if let Some(publish_dir) = publish_dir {
                config.publish_dir = publish_dir;
            }

            let job_id = uuid::Uuid::new_v4().to_string();
            let orchestrator = JobOrchestrator::new(Arc::new(config));
            let published = orchestrator.run(&job_id, &prompt).await?;
            println!("Video ready at {}", published.display());
            Ok(())
        }
    }
}
