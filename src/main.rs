use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use streamvisor::{
    ConfigResolver, LayeredResolver, Overrides, StreamDefinition, Subscribe, SupervisorManager,
};

/// Keeps one capture process per stream alive and recording.
#[derive(Debug, Parser)]
#[command(name = "streamvisor", version, about)]
struct Cli {
    /// TOML configuration file (defaults to $STREAMVISOR_CONFIG).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory segments are written to.
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Stream to capture as `id=url`; repeatable, replaces configured streams.
    #[arg(short, long = "stream", value_name = "ID=URL")]
    streams: Vec<StreamDefinition>,

    /// Capture tool executable.
    #[arg(long, value_name = "PATH")]
    ffmpeg: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("streamvisor=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = LayeredResolver::from_process_env()
        .with_file(cli.config)
        .with_overrides(Overrides {
            output_dir: cli.output_dir,
            ffmpeg: cli.ffmpeg,
            streams: cli.streams,
        })
        .resolve()
        .context("failed to resolve configuration")?;

    settings.capture.ensure_output_dir().with_context(|| {
        format!(
            "failed to create output directory {}",
            settings.capture.output_dir.display()
        )
    })?;

    tracing::info!(
        streams = settings.streams.len(),
        output_dir = %settings.capture.output_dir.display(),
        "starting streamvisor"
    );

    #[cfg(feature = "logging")]
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(streamvisor::LogWriter::new())];
    #[cfg(not(feature = "logging"))]
    let subs: Vec<Arc<dyn Subscribe>> = Vec::new();

    SupervisorManager::builder(settings)
        .with_subscribers(subs)
        .build()
        .run()
        .await?;

    tracing::info!("all streams stopped");
    Ok(())
}
