//! Linkshot screenshot service
//!
//! `linkshot serve` runs the HTTP service; `linkshot batch` renders a link
//! list to a directory of PNG previews.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use linkshot_web::acquisition::{Acquirer, RemoteAcquirer};
use linkshot_web::config::ServiceConfig;
use linkshot_web::pipeline::{
    BatchEvent, BatchOutcome, BatchPipeline, CaptureResult, ItemLimit, LinkExtractionResponse,
};
use linkshot_web::server::{self, AppState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Linkshot link preview service
#[derive(Parser, Debug)]
#[command(name = "linkshot")]
#[command(version)]
#[command(about = "Full-page link previews over headless Chromium")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true, env = "LINKSHOT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP screenshot service (default)
    Serve(ServeArgs),
    /// Render previews for a link list
    Batch(BatchArgs),
}

#[derive(Args, Debug, Default)]
struct BrowserArgs {
    /// Path to Chrome/Chromium executable
    #[arg(long, env = "LINKSHOT_CHROME_PATH")]
    chrome_path: Option<String>,

    /// Run in headless mode
    #[arg(long, env = "LINKSHOT_HEADLESS")]
    headless: Option<bool>,

    /// Enable the Chromium sandbox
    #[arg(long, env = "LINKSHOT_SANDBOX")]
    sandbox: Option<bool>,

    /// Navigation timeout in milliseconds
    #[arg(long, env = "LINKSHOT_TIMEOUT_MS")]
    timeout_ms: Option<u64>,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, env = "LINKSHOT_PORT")]
    port: Option<u16>,

    /// Host to bind to
    #[arg(short = 'H', long, env = "LINKSHOT_HOST")]
    host: Option<String>,

    #[command(flatten)]
    browser: BrowserArgs,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Link list: {"success": true, "links": [{"url": ..., "text": ...}]}
    input: PathBuf,

    /// Output directory for PNGs and snapshot.json
    #[arg(short, long, default_value = "previews")]
    out: PathBuf,

    /// Links to render: a number or "all"
    #[arg(short, long, env = "LINKSHOT_LIMIT")]
    limit: Option<ItemLimit>,

    /// Use a running service instead of launching Chromium here
    #[arg(long, env = "LINKSHOT_SERVICE_URL")]
    service_url: Option<String>,

    #[command(flatten)]
    browser: BrowserArgs,
}

impl BrowserArgs {
    fn apply(&self, config: &mut ServiceConfig) {
        if let Some(path) = &self.chrome_path {
            config.browser.chrome_path = Some(path.clone());
        }
        if let Some(headless) = self.headless {
            config.browser.headless = headless;
        }
        if let Some(sandbox) = self.sandbox {
            config.browser.sandbox = sandbox;
        }
        if let Some(ms) = self.timeout_ms {
            config.acquisition.timeout_ms = ms;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServiceConfig::default(),
    };

    match cli.command {
        Some(Command::Serve(args)) => run_serve(config, args).await,
        Some(Command::Batch(args)) => run_batch(config, args).await,
        None => run_serve(config, cli.serve).await,
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_serve(mut config: ServiceConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    args.browser.apply(&mut config);

    let addr = config.socket_addr()?;
    info!(
        "{} v{} starting on {}",
        linkshot_web::NAME,
        linkshot_web::VERSION,
        addr
    );

    let state = AppState::new(Arc::new(config.acquisition_service()));
    server::serve(addr, state).await?;
    Ok(())
}

async fn run_batch(mut config: ServiceConfig, args: BatchArgs) -> anyhow::Result<()> {
    args.browser.apply(&mut config);
    if let Some(limit) = args.limit {
        config.batch.limit = limit;
    }
    if let Some(url) = args.service_url {
        config.batch.service_url = Some(url);
    }

    let raw = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("reading {}", args.input.display()))?;
    let response: LinkExtractionResponse = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.input.display()))?;
    let candidates = response.into_candidates()?;

    let acquirer: Arc<dyn Acquirer> = match &config.batch.service_url {
        Some(url) => {
            info!("Using preview service at {}", url);
            Arc::new(RemoteAcquirer::new(
                url.clone(),
                Duration::from_millis(config.batch.request_timeout_ms),
            )?)
        }
        None => Arc::new(config.acquisition_service()),
    };

    tokio::fs::create_dir_all(&args.out)
        .await
        .with_context(|| format!("creating {}", args.out.display()))?;

    let pipeline = BatchPipeline::new(acquirer, config.cache_store());
    let (tx, rx) = mpsc::channel(16);
    let writer = tokio::spawn(write_previews(args.out.clone(), rx));

    let report = pipeline.run(candidates, config.batch.limit, Some(tx)).await?;
    let written = writer.await??;

    let snapshot = serde_json::to_string_pretty(&report.snapshot())?;
    tokio::fs::write(args.out.join("snapshot.json"), snapshot).await?;

    match report.outcome {
        BatchOutcome::AllFailed => bail!("{}", report.outcome),
        outcome => {
            info!("{}; {} files in {}", outcome, written, args.out.display());
            Ok(())
        }
    }
}

async fn write_previews(
    out: PathBuf,
    mut events: mpsc::Receiver<BatchEvent>,
) -> anyhow::Result<usize> {
    let mut current = 0;
    let mut written = 0;

    while let Some(event) = events.recv().await {
        match event {
            BatchEvent::Started { batch_id, total } => {
                info!(%batch_id, "Generating {} previews", total);
            }
            BatchEvent::Progress { current: n, total } => {
                current = n;
                info!("Loading preview {}/{}", n, total);
            }
            BatchEvent::Item(CaptureResult::Success {
                url,
                image_bytes,
                from_cache,
                ..
            }) => {
                let path = preview_path(&out, current, &url);
                tokio::fs::write(&path, &image_bytes)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                info!(from_cache, "Saved {}", path.display());
                written += 1;
            }
            BatchEvent::Item(CaptureResult::Failure { url, message, .. }) => {
                warn!("No preview for {}: {}", url, message);
            }
            BatchEvent::Finished(_) => {}
        }
    }

    Ok(written)
}

fn preview_path(out: &Path, index: usize, url: &str) -> PathBuf {
    out.join(format!("{:03}-{}.png", index, slug(url)))
}

/// Filesystem-safe name for a URL
fn slug(url: &str) -> String {
    let trimmed = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("file://");

    let mut slug = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let slug: String = slug.trim_matches('-').chars().take(60).collect();
    if slug.is_empty() {
        "page".to_string()
    } else {
        slug
    }
}
