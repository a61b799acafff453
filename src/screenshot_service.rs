//! The capture pipeline
//!
//! [`ScreenshotService`] runs one request end to end: validate, resolve
//! parameters, acquire an engine, open a page, configure it, navigate, settle,
//! optionally sanitize, capture, and release everything on the way out.
//! Requests share nothing but the read-only configuration and the provider.

use crate::{
    classify, metrics, CaptureError, CaptureResult, ChromiumProvider, ClassifiedError, Config,
    EngineInstance, PageContext, PageSanitizer, RenderRequest, RenderingEngineProvider,
    ResolvedParameters,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, info_span, warn, Instrument};

/// Result of [`ScreenshotService::render`] together with how long it took
#[derive(Debug)]
pub struct RenderOutcome {
    pub result: Result<CaptureResult, ClassifiedError>,
    pub elapsed: Duration,
}

impl RenderOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Screenshot pipeline with a fresh, isolated engine per request
///
/// # Examples
///
/// ```rust,no_run
/// use site_capture::{Config, RenderRequest, ScreenshotService};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = ScreenshotService::new(Config::default());
///
///     let outcome = service.render(&RenderRequest::new("https://example.com")).await;
///     let capture = outcome.result?;
///     println!("Captured {} bytes in {:?}", capture.byte_len(), outcome.elapsed);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ScreenshotService {
    config: Arc<Config>,
    provider: Arc<dyn RenderingEngineProvider>,
    sanitizer: PageSanitizer,
}

impl ScreenshotService {
    /// Service backed by per-request Chromium launches
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let provider = Arc::new(ChromiumProvider::new(config.clone()));
        Self::with_provider(config, provider)
    }

    pub fn with_provider(config: Arc<Config>, provider: Arc<dyn RenderingEngineProvider>) -> Self {
        Self {
            config,
            provider,
            sanitizer: PageSanitizer::default(),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: PageSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parameters `request` would run with, without touching a browser
    pub fn resolve(&self, request: &RenderRequest) -> ResolvedParameters {
        ResolvedParameters::resolve(request, &self.config)
    }

    /// Run the pipeline, classify any failure and record metrics
    pub async fn render(&self, request: &RenderRequest) -> RenderOutcome {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("render", %request_id);

        async {
            let start_time = Instant::now();
            let result = self.capture(request).await;
            let elapsed = start_time.elapsed();

            metrics::record_render(
                result.as_ref().map(CaptureResult::byte_len).map_err(CaptureError::kind),
                elapsed,
            );

            let result = result.map_err(|e| {
                let classified = classify(&e);
                warn!("Render failed after {:?}: {} ({})", elapsed, e, classified.kind);
                classified
            });

            RenderOutcome { result, elapsed }
        }
        .instrument(span)
        .await
    }

    /// Run the pipeline and return the raw, stage-tagged error on failure
    ///
    /// Invalid input is rejected before any engine is acquired. Once acquired,
    /// the page and engine are released whether or not the capture succeeded.
    pub async fn capture(&self, request: &RenderRequest) -> Result<CaptureResult, CaptureError> {
        let url = request.validate_with_schemes(&self.config.allowed_schemes)?;
        let params = self.resolve(request);

        debug!(
            "Capturing {} at {}x{}@{} (wait {}ms, full_page={}, sanitize={})",
            url,
            params.profile.width_px,
            params.profile.height_px,
            params.profile.pixel_density,
            params.wait_ms,
            params.full_page,
            params.sanitize
        );

        let mut engine = self.provider.acquire().await?;
        let result = self.capture_with_engine(engine.as_mut(), url.as_str(), &params).await;
        self.provider.release(engine).await;

        result
    }

    async fn capture_with_engine(
        &self,
        engine: &mut dyn EngineInstance,
        url: &str,
        params: &ResolvedParameters,
    ) -> Result<CaptureResult, CaptureError> {
        let page = engine.new_page().await?;
        let result = self.capture_page(page.as_ref(), url, params).await;
        page.close().await;

        result
    }

    async fn capture_page(
        &self,
        page: &dyn PageContext,
        url: &str,
        params: &ResolvedParameters,
    ) -> Result<CaptureResult, CaptureError> {
        page.set_viewport(&params.profile).await?;
        page.set_user_agent(&self.config.user_agent).await?;

        let navigation_timeout = self.config.navigation_timeout;
        match timeout(navigation_timeout, page.navigate(url)).await {
            Ok(navigated) => navigated?,
            Err(_) => return Err(CaptureError::NavigationTimeout(navigation_timeout)),
        }

        sleep(params.wait()).await;

        if params.sanitize {
            let report = self.sanitizer.sanitize(page).await;
            metrics::record_sanitize(&report);
        }

        let image_bytes = page.screenshot(params.full_page).await?;
        let (width_px, height_px) = params.output_dimensions();

        info!("Captured {} ({} bytes)", url, image_bytes.len());

        Ok(CaptureResult {
            image_bytes,
            width_px,
            height_px,
        })
    }
}
