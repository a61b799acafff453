//! Rendering engine abstraction and the Chromium implementation
//!
//! The capture pipeline only talks to the traits in this module. The default
//! [`ChromiumProvider`] launches a fresh, isolated Chrome process for every
//! acquisition and tears it down on release; a pooling provider could be
//! dropped in behind the same traits without touching the pipeline.

use crate::{get_chrome_args, CaptureError, Config, QualityProfile};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventDomContentEventFired, NavigateParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Source of isolated rendering engines
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RenderingEngineProvider: Send + Sync {
    /// Start (or hand out) an engine for exactly one request
    async fn acquire(&self) -> Result<Box<dyn EngineInstance>, CaptureError>;

    /// Give an engine back once its request is done with it
    async fn release(&self, engine: Box<dyn EngineInstance>) {
        engine.shutdown().await;
    }
}

/// One running engine, owned by a single request
#[async_trait]
pub trait EngineInstance: Send {
    async fn new_page(&mut self) -> Result<Box<dyn PageContext>, CaptureError>;

    /// Stop the engine; never fails, errors are logged
    async fn shutdown(self: Box<Self>);
}

/// A single page (tab) inside an engine
#[async_trait]
pub trait PageContext: Send + Sync {
    async fn set_viewport(&self, profile: &QualityProfile) -> Result<(), CaptureError>;

    async fn set_user_agent(&self, user_agent: &str) -> Result<(), CaptureError>;

    /// Navigate and return once the DOM is parsed, without waiting for subresources
    async fn navigate(&self, url: &str) -> Result<(), CaptureError>;

    /// Run a script in the page and return its JSON result
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, CaptureError>;

    /// PNG of the viewport, or of the whole scrollable page
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, CaptureError>;

    async fn close(self: Box<Self>);
}

/// Launches a dedicated headless Chrome per acquisition
pub struct ChromiumProvider {
    config: Arc<Config>,
}

impl ChromiumProvider {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    fn browser_config(&self, user_data_dir: &Path) -> Result<BrowserConfig, CaptureError> {
        let mut builder = BrowserConfig::builder()
            .args(get_chrome_args(&self.config))
            .user_data_dir(user_data_dir)
            .launch_timeout(self.config.launch_timeout)
            .request_timeout(self.config.navigation_timeout);

        if let Some(chrome_path) = &self.config.chrome_path {
            builder = builder.chrome_executable(chrome_path);
        }

        builder.build().map_err(CaptureError::LaunchFailed)
    }
}

#[async_trait]
impl RenderingEngineProvider for ChromiumProvider {
    async fn acquire(&self) -> Result<Box<dyn EngineInstance>, CaptureError> {
        // Guarded from here on so a failed launch cleans up too
        let profile_dir = ProfileDir(
            std::env::temp_dir().join(format!("site-capture-{}", uuid::Uuid::new_v4())),
        );
        let browser_config = self.browser_config(profile_dir.path())?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CaptureError::LaunchFailed(e.to_string()))?;

        // The handler drives the CDP connection and must be polled until the browser exits
        let handler_task = tokio::spawn(async move {
            loop {
                match handler.next().await {
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!("CDP handler error: {}", e);
                        return Err(e);
                    }
                    None => {
                        debug!("CDP handler stream ended");
                        break;
                    }
                }
            }
            Ok(())
        });

        info!("Launched browser (profile dir {})", profile_dir.path().display());

        Ok(Box::new(ChromiumEngine {
            browser,
            handler: handler_task,
            request_timeout: self.config.navigation_timeout,
            profile_dir,
        }))
    }
}

// Field order matters: `browser` drops (killing Chrome) before `profile_dir`
pub struct ChromiumEngine {
    browser: Browser,
    handler: JoinHandle<Result<(), CdpError>>,
    request_timeout: Duration,
    profile_dir: ProfileDir,
}

/// Per-launch Chrome profile directory, removed when dropped
struct ProfileDir(PathBuf);

impl ProfileDir {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        if !self.0.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.0) {
            debug!("Could not remove profile dir {}: {}", self.0.display(), e);
        }
    }
}

#[async_trait]
impl EngineInstance for ChromiumEngine {
    async fn new_page(&mut self) -> Result<Box<dyn PageContext>, CaptureError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::PageSetup(e.to_string()))?;

        Ok(Box::new(ChromiumPage {
            page,
            request_timeout: self.request_timeout,
        }))
    }

    async fn shutdown(mut self: Box<Self>) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        if tokio::time::timeout(Duration::from_secs(5), self.browser.wait())
            .await
            .is_err()
        {
            error!("Browser process did not exit in time, killing it");
            let _ = self.browser.kill().await;
        }
        self.handler.abort();

        if let Err(e) = tokio::fs::remove_dir_all(self.profile_dir.path()).await {
            debug!(
                "Could not remove profile dir {}: {}",
                self.profile_dir.path().display(),
                e
            );
        }
        info!("Browser shut down");
    }
}

impl Drop for ChromiumEngine {
    fn drop(&mut self) {
        // Covers a request future dropped mid-flight; chromiumoxide kills the
        // child itself and `profile_dir` cleans up after it
        self.handler.abort();
    }
}

pub struct ChromiumPage {
    page: Page,
    request_timeout: Duration,
}

impl ChromiumPage {
    fn navigation_error(&self, error: CdpError) -> CaptureError {
        match error {
            CdpError::Timeout => CaptureError::NavigationTimeout(self.request_timeout),
            other => CaptureError::NavigationFailed(other.to_string()),
        }
    }
}

#[async_trait]
impl PageContext for ChromiumPage {
    async fn set_viewport(&self, profile: &QualityProfile) -> Result<(), CaptureError> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(profile.width_px))
            .height(i64::from(profile.height_px))
            .device_scale_factor(profile.pixel_density)
            .mobile(false)
            .build()
            .map_err(CaptureError::PageSetup)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| CaptureError::PageSetup(e.to_string()))?;
        Ok(())
    }

    async fn set_user_agent(&self, user_agent: &str) -> Result<(), CaptureError> {
        self.page
            .execute(SetUserAgentOverrideParams::new(user_agent))
            .await
            .map_err(|e| CaptureError::PageSetup(e.to_string()))?;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), CaptureError> {
        // Subscribe before navigating so the event can't be missed
        let mut dom_ready = self
            .page
            .event_listener::<EventDomContentEventFired>()
            .await
            .map_err(|e| self.navigation_error(e))?;

        let response = self
            .page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| self.navigation_error(e))?;

        if let Some(error_text) = &response.result.error_text {
            return Err(CaptureError::NavigationFailed(format!("{url}: {error_text}")));
        }

        match dom_ready.next().await {
            Some(_) => Ok(()),
            None => Err(CaptureError::NavigationFailed(
                "page closed before the DOM was parsed".to_string(),
            )),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, CaptureError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| CaptureError::ScriptFailed(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, CaptureError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();

        self.page
            .screenshot(params)
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.page.close().await {
            debug!("Page close failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_dir_removed_on_drop() {
        let path = std::env::temp_dir().join(format!("site-capture-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(path.join("Default")).unwrap();
        std::fs::write(path.join("Default").join("Preferences"), b"{}").unwrap();

        drop(ProfileDir(path.clone()));
        assert!(!path.exists());
    }

    #[test]
    fn test_profile_dir_already_removed_is_fine() {
        let path = std::env::temp_dir().join(format!("site-capture-test-{}", uuid::Uuid::new_v4()));
        let dir = ProfileDir(path.clone());
        assert_eq!(dir.path(), path.as_path());
        drop(dir);
        assert!(!path.exists());
    }
}
