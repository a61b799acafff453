use crate::{
    batch_filename, format_bytes, format_duration, image_dimensions, Config, HealthSummary,
    QualityTier, RenderRequest, RenderResponse, ScreenshotService,
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "site-capture")]
#[command(about = "Render web pages to PNG with per-site settle tuning")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Configuration file path (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Navigation timeout in seconds")]
    pub navigation_timeout: Option<u64>,

    #[arg(long, global = true, help = "Chrome executable path")]
    pub chrome_path: Option<String>,

    #[arg(long, global = true, help = "Override the User-Agent string")]
    pub user_agent: Option<String>,

    #[arg(long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,
}

/// Options shared by every command that renders
#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[arg(short, long, default_value = "standard", help = "Quality tier (standard, high, retina, mobile)")]
    pub quality: String,

    #[arg(long, help = "Settle time hint in milliseconds (known sites override it)")]
    pub wait: Option<u64>,

    #[arg(long, help = "Capture the full scrollable page")]
    pub full_page: bool,

    #[arg(long, help = "Keep cookie banners, ads and popups")]
    pub no_sanitize: bool,
}

impl RenderArgs {
    pub fn request_for(&self, url: impl Into<String>) -> RenderRequest {
        RenderRequest {
            destination_url: Some(url.into()),
            quality_tier: QualityTier::from_name(&self.quality),
            user_wait_hint_ms: self.wait,
            full_page: self.full_page,
            sanitize: !self.no_sanitize,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture a single URL
    Capture {
        #[arg(short, long, help = "URL to capture")]
        url: String,

        #[arg(short, long, help = "Output PNG path")]
        output: PathBuf,

        #[command(flatten)]
        render: RenderArgs,

        #[arg(long, help = "Print the JSON response body instead of a summary")]
        json: bool,
    },

    /// Capture every URL listed in a file
    Batch {
        #[arg(short, long, help = "Input file containing URLs (one per line)")]
        input: PathBuf,

        #[arg(short, long, help = "Output directory for screenshots")]
        output: PathBuf,

        #[arg(short, long, default_value = "4", help = "Browsers running at once")]
        concurrency: usize,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Show the parameters a capture would use, without launching a browser
    Resolve {
        #[arg(short, long, help = "URL to resolve")]
        url: String,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Print a health summary
    Health,

    /// Validate a configuration file
    Validate {
        #[arg(help = "Configuration file to validate")]
        path: PathBuf,
    },
}

pub struct CliRunner {
    pub service: ScreenshotService,
    started_at: Instant,
}

impl CliRunner {
    pub fn new(config: Config) -> Self {
        Self {
            service: ScreenshotService::new(config),
            started_at: Instant::now(),
        }
    }

    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Capture {
                url,
                output,
                render,
                json,
            } => self.run_capture(url, &output, &render, json).await,
            Commands::Batch {
                input,
                output,
                concurrency,
                render,
            } => self.run_batch(&input, &output, concurrency, &render).await,
            Commands::Resolve { url, render } => self.run_resolve(url, &render),
            Commands::Health => self.show_health(),
            Commands::Validate { path } => validate_config_file(&path).await,
        }
    }

    pub async fn run_capture(
        &self,
        url: String,
        output: &Path,
        render: &RenderArgs,
        json: bool,
    ) -> Result<()> {
        info!("Capturing {}", url);

        let request = render.request_for(url);
        let outcome = self.service.render(&request).await;

        if json {
            let response = RenderResponse::from_outcome(&request, &outcome);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        let capture = match outcome.result {
            Ok(capture) => capture,
            Err(e) => {
                error!("Capture failed: {}", e);
                bail!("capture failed with status {}: {}", e.status_code(), e.message);
            }
        };

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(output, &capture.image_bytes)
            .await
            .with_context(|| format!("writing {}", output.display()))?;
        info!("Screenshot saved to: {}", output.display());

        if !json {
            let (actual_width, actual_height) =
                image_dimensions(&capture.image_bytes).unwrap_or((capture.width_px, capture.height_px));

            println!("Screenshot captured successfully:");
            println!("  URL: {}", request.destination_url.as_deref().unwrap_or_default());
            println!("  Output: {}", output.display());
            println!("  Quality: {}", request.quality_tier);
            println!("  Reported size: {}x{}", capture.width_px, capture.height_px);
            println!("  Image size: {}x{}", actual_width, actual_height);
            println!("  File size: {}", format_bytes(capture.byte_len()));
            println!("  Duration: {}", format_duration(outcome.elapsed));
        }

        Ok(())
    }

    pub async fn run_batch(
        &self,
        input: &Path,
        output: &Path,
        concurrency: usize,
        render: &RenderArgs,
    ) -> Result<()> {
        let urls = read_urls_from_file(input).await?;
        info!("Loaded {} URLs from {}", urls.len(), input.display());

        fs::create_dir_all(output).await?;

        let started = Instant::now();
        let limiter = Arc::new(Semaphore::new(concurrency.max(1)));
        let tasks: Vec<_> = urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| {
                let service = self.service.clone();
                let limiter = limiter.clone();
                let request = render.request_for(url.clone());
                let path = output.join(batch_filename(index, &url));

                tokio::spawn(async move {
                    let _permit = limiter.acquire_owned().await?;
                    let outcome = service.render(&request).await;
                    match outcome.result {
                        Ok(capture) => {
                            fs::write(&path, &capture.image_bytes).await?;
                            info!("Saved {} -> {}", url, path.display());
                            Ok::<bool, anyhow::Error>(true)
                        }
                        Err(e) => {
                            warn!("Failed to capture {}: {}", url, e);
                            Ok(false)
                        }
                    }
                })
            })
            .collect();

        let mut success_count = 0;
        let mut error_count = 0;
        for result in futures::future::join_all(tasks).await {
            match result {
                Ok(Ok(true)) => success_count += 1,
                Ok(Ok(false)) => error_count += 1,
                Ok(Err(e)) => {
                    error!("Batch task failed: {:#}", e);
                    error_count += 1;
                }
                Err(e) => {
                    error!("Batch task panicked: {}", e);
                    error_count += 1;
                }
            }
        }

        println!(
            "Batch completed in {}. Success: {}, Errors: {}",
            format_duration(started.elapsed()),
            success_count,
            error_count
        );
        Ok(())
    }

    pub fn run_resolve(&self, url: String, render: &RenderArgs) -> Result<()> {
        let request = render.request_for(url);
        if let Err(e) = request.validate_with_schemes(&self.service.config().allowed_schemes) {
            warn!("{} would be rejected: {}", request.destination_url.as_deref().unwrap_or_default(), e);
        }
        let params = self.service.resolve(&request);
        println!("{}", serde_json::to_string_pretty(&params)?);
        Ok(())
    }

    pub fn show_health(&self) -> Result<()> {
        let summary = HealthSummary::collect(self.started_at);
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }
}

/// Load the config named on the command line (or defaults) and apply flag overrides
pub async fn load_config(args: &Cli) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    if let Some(secs) = args.navigation_timeout {
        config.navigation_timeout = Duration::from_secs(secs);
    }

    if let Some(chrome_path) = &args.chrome_path {
        config.chrome_path = Some(chrome_path.clone());
    }

    if let Some(user_agent) = &args.user_agent {
        config.user_agent = user_agent.clone();
    }

    config.validate()?;

    info!("Configuration loaded");
    info!("Navigation timeout: {:?}", config.navigation_timeout);
    info!(
        "Wait policy: {} sites, default {}ms, ceiling {}ms",
        config.wait_policy.sites.len(),
        config.wait_policy.default_ms,
        config.wait_policy.max_ms
    );

    Ok(config)
}

pub async fn validate_config_file(path: &Path) -> Result<()> {
    println!("Validating configuration: {}", path.display());

    let config = Config::from_file(path).await?;

    println!("Configuration is valid:");
    println!("  Launch timeout: {:?}", config.launch_timeout);
    println!("  Navigation timeout: {:?}", config.navigation_timeout);
    println!("  Site wait entries: {}", config.wait_policy.sites.len());
    if config.allowed_schemes.is_empty() {
        println!("  Allowed schemes: any");
    } else {
        println!("  Allowed schemes: {}", config.allowed_schemes.join(", "));
    }
    println!(
        "  Wait default/ceiling: {}ms / {}ms",
        config.wait_policy.default_ms, config.wait_policy.max_ms
    );
    for tier in QualityTier::ALL {
        let profile = config.profiles.resolve(tier);
        println!(
            "  {}: {}x{} @{}",
            tier, profile.width_px, profile.height_px, profile.pixel_density
        );
    }

    Ok(())
}

pub async fn read_urls_from_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    Ok(parse_url_list(&content))
}

/// One URL per line; blank lines and `#` comments are skipped
pub fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_string())
        .collect()
}

pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
