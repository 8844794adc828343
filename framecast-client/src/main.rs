//! framecast: entry point.
//!
//! ```text
//! framecast                        Stream frames using framecast.toml
//! framecast --config <path>        Load a custom config TOML
//! framecast --gen-config           Write default config to stdout
//! framecast --stub-server          Run a fixed-reply inference server
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use framecast_client::config::{ClientConfig, SourceKind};
use framecast_client::stub::StubServer;
use framecast_core::stream::draw_overlay;
use framecast_core::{
    AdaptiveEncoder, BoxRenderer, ClientMetrics, CycleReport, FrameSource, ImageSequenceSource,
    InferenceClient, TestPatternSource,
};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "framecast", about = "Adaptive UDP frame streaming for remote inference")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "framecast.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Inference server host (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Inference server port (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Read frames from this image directory instead of the test pattern.
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Write annotated frames to this directory.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(short = 'n', long)]
    frames: Option<u64>,

    /// Answer datagrams on the configured port instead of streaming.
    #[arg(long)]
    stub_server: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ClientConfig) {
        if let Some(host) = &self.host {
            config.network.host = host.clone();
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(dir) = &self.source_dir {
            config.source.kind = SourceKind::Images;
            config.source.dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(frames) = self.frames {
            config.source.frames = frames;
        }
    }
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ClientConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ClientConfig::load(&cli.config);
    cli.apply_overrides(&mut config);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("framecast v{}", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        on_signal.cancel();
    });

    if cli.stub_server {
        let server = StubServer::bind(("0.0.0.0", config.network.port)).await?;
        let answered = server.serve(cancel).await;
        info!(answered, "stub server finished");
        return Ok(());
    }

    info!(
        "server: {}:{}",
        config.network.host, config.network.port
    );
    match config.source.kind {
        SourceKind::Pattern => {
            let source = TestPatternSource::new(config.source.width, config.source.height);
            stream(&config, source, cancel).await
        }
        SourceKind::Images => {
            let source = ImageSequenceSource::open(&config.source.dir)?
                .looping(config.source.looping);
            stream(&config, source, cancel).await
        }
    }
}

// ── Streaming ────────────────────────────────────────────────────

async fn stream<S: FrameSource>(
    config: &ClientConfig,
    source: S,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let transport = config.to_transport_config()?;
    let encoder = AdaptiveEncoder::with_policy(config.to_encoder_policy()?)?;
    let mut client = InferenceClient::new(transport, source, BoxRenderer::new())
        .with_encoder(encoder)
        .with_target_fps(config.source.target_fps);

    let output_dir = config.output_dir();
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
        info!("writing annotated frames to {}", dir.display());
    }

    let limit = config.source.frames;
    let metrics_every = config.output.metrics_every;
    let stop_at_limit = cancel.clone();
    let mut frame_no: u64 = 0;

    let result = client
        .run(cancel, |report, metrics| {
            frame_no += 1;
            if let Some(dir) = output_dir {
                save_frame(dir, frame_no, report, metrics);
            }
            if metrics_every > 0 && frame_no % metrics_every == 0 {
                for (key, value) in metrics.to_map() {
                    info!("{key}: {value}");
                }
            }
            if limit > 0 && frame_no >= limit {
                stop_at_limit.cancel();
            }
        })
        .await;

    let metrics = client.metrics();
    client.stop();
    for (key, value) in metrics.to_map() {
        info!("{key}: {value}");
    }
    if let Some(dir) = output_dir {
        std::fs::write(dir.join("metrics.json"), serde_json::to_vec_pretty(&metrics)?)?;
    }

    let cycles = result?;
    info!(cycles, "done");
    Ok(())
}

/// Write the annotated frame with the metrics table drawn in the corner.
fn save_frame(dir: &Path, frame_no: u64, report: CycleReport, metrics: &ClientMetrics) {
    let mut frame = report.frame;
    let lines: Vec<String> = metrics
        .to_map()
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect();
    draw_overlay(&mut frame, &lines);

    let path = dir.join(format!("frame_{frame_no:06}.jpg"));
    if let Err(e) = frame.image().save(&path) {
        warn!("failed to write {}: {e}", path.display());
    }
}
