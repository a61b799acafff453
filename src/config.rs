//! Configuration management with serde serialization/deserialization
//!
//! This module provides the service configuration, the per-request input and
//! output types, and the Chrome launch flags used for every capture.

use crate::{CaptureError, ProfileTable, QualityProfile, QualityTier, WaitPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// User agent sent with every navigation
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 SiteCapture/1.0";

/// Main configuration structure for the capture service
///
/// Built once at startup and shared read-only by every request.
///
/// # Examples
///
/// ```rust
/// use site_capture::Config;
/// use std::time::Duration;
///
/// let config = Config {
///     navigation_timeout: Duration::from_secs(10),
///     ..Default::default()
/// };
/// assert_eq!(config.wait_policy.max_ms, 8000);
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound on Chrome startup (default: 30 seconds)
    pub launch_timeout: Duration,

    /// Upper bound on reaching DOM-parsed state (default: 20 seconds)
    ///
    /// Exceeding it yields a navigation timeout; it is never retried internally.
    pub navigation_timeout: Duration,

    /// User-Agent string set on every page
    pub user_agent: String,

    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,

    /// Flags appended after the built-in launch flags
    pub extra_chrome_args: Vec<String>,

    /// Per-site settle delays, default and ceiling
    pub wait_policy: WaitPolicy,

    /// Viewport profile for each quality tier
    pub profiles: ProfileTable,

    /// URL schemes a request may target, e.g. `["http", "https"]`
    ///
    /// Empty (the default) accepts any absolute URL, including `file:` and
    /// `data:`. Set this whenever requests come from untrusted callers.
    pub allowed_schemes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            launch_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(20),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chrome_path: None,
            extra_chrome_args: Vec::new(),
            wait_policy: WaitPolicy::default(),
            profiles: ProfileTable::default(),
            allowed_schemes: Vec::new(),
        }
    }
}

impl Config {
    /// Load a JSON config file; missing fields take their defaults
    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| ConfigError(format!("cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.launch_timeout.is_zero() {
            return Err(ConfigError("launch timeout must be greater than 0".into()));
        }

        if self.navigation_timeout.is_zero() {
            return Err(ConfigError("navigation timeout must be greater than 0".into()));
        }

        if self.wait_policy.default_ms > self.wait_policy.max_ms {
            return Err(ConfigError(format!(
                "default wait {}ms exceeds the {}ms ceiling",
                self.wait_policy.default_ms, self.wait_policy.max_ms
            )));
        }

        for tier in QualityTier::ALL {
            let profile = self.profiles.resolve(tier);
            if profile.width_px == 0 || profile.height_px == 0 {
                return Err(ConfigError(format!("{tier} profile dimensions must be greater than 0")));
            }
            if profile.pixel_density.is_nan() || profile.pixel_density <= 0.0 {
                return Err(ConfigError(format!("{tier} pixel density must be positive")));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

/// A single capture request as submitted by the transport layer
///
/// Field aliases accept the short wire names (`url`, `quality`, `wait`,
/// `removeAds`). The flags are read by truthiness, so `null`, `0` and `""`
/// are false; an absent flag keeps its default.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    #[serde(default, alias = "url")]
    pub destination_url: Option<String>,

    #[serde(default, alias = "quality")]
    pub quality_tier: QualityTier,

    #[serde(default, alias = "wait")]
    pub user_wait_hint_ms: Option<u64>,

    #[serde(default, deserialize_with = "truthy")]
    pub full_page: bool,

    #[serde(default = "default_sanitize", alias = "removeAds", deserialize_with = "truthy")]
    pub sanitize: bool,
}

fn default_sanitize() -> bool {
    true
}

fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde_json::Value;

    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(flag) => flag,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            destination_url: None,
            quality_tier: QualityTier::default(),
            user_wait_hint_ms: None,
            full_page: false,
            sanitize: true,
        }
    }
}

impl RenderRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            destination_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Check the destination is present and absolute
    pub fn validate(&self) -> Result<url::Url, CaptureError> {
        self.validate_with_schemes(&[])
    }

    /// Like [`validate`](Self::validate), also requiring one of `allowed_schemes`
    /// when the list is non-empty
    pub fn validate_with_schemes(&self, allowed_schemes: &[String]) -> Result<url::Url, CaptureError> {
        let raw = self
            .destination_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(CaptureError::MissingUrl)?;

        let url =
            url::Url::parse(raw).map_err(|e| CaptureError::InvalidUrl(format!("{raw}: {e}")))?;

        if !allowed_schemes.is_empty()
            && !allowed_schemes
                .iter()
                .any(|scheme| scheme.eq_ignore_ascii_case(url.scheme()))
        {
            return Err(CaptureError::InvalidUrl(format!(
                "{raw}: scheme '{}' is not allowed",
                url.scheme()
            )));
        }

        Ok(url)
    }
}

/// Parameters derived once per request and never changed afterwards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedParameters {
    pub profile: QualityProfile,
    pub wait_ms: u64,
    pub full_page: bool,
    pub sanitize: bool,
}

impl ResolvedParameters {
    pub fn resolve(request: &RenderRequest, config: &Config) -> Self {
        let url = request.destination_url.as_deref().map(str::trim).unwrap_or_default();
        Self {
            profile: config.profiles.resolve(request.quality_tier),
            wait_ms: config.wait_policy.resolve_wait(url, request.user_wait_hint_ms),
            full_page: request.full_page,
            sanitize: request.sanitize,
        }
    }

    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }

    /// Reported output dimensions; height is 0 for full-page captures
    pub fn output_dimensions(&self) -> (u32, u32) {
        let height = if self.full_page {
            0
        } else {
            self.profile.output_height()
        };
        (self.profile.output_width(), height)
    }
}

/// PNG bytes plus the dimensions reported to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureResult {
    pub image_bytes: Vec<u8>,
    pub width_px: u32,
    /// 0 for full-page captures, where the true extent is only in the image
    pub height_px: u32,
}

impl CaptureResult {
    pub fn byte_len(&self) -> usize {
        self.image_bytes.len()
    }
}

/// Chrome command-line flags for an isolated, headless capture instance
///
/// # Examples
///
/// ```rust
/// use site_capture::{Config, get_chrome_args};
///
/// let args = get_chrome_args(&Config::default());
/// assert!(args.iter().any(|arg| arg == "--no-sandbox"));
/// ```
pub fn get_chrome_args(config: &Config) -> Vec<String> {
    let mut args: Vec<String> = [
        "--headless",
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--disable-dev-shm-usage",
        "--disable-accelerated-2d-canvas",
        "--disable-gpu",
        "--disable-background-timer-throttling",
        "--disable-backgrounding-occluded-windows",
        "--disable-renderer-backgrounding",
        "--no-first-run",
        "--disable-features=VizDisplayCompositor,site-per-process",
        "--disable-extensions",
        "--disable-plugins",
        "--memory-pressure-off",
        "--disable-web-security",
        "--disable-hang-monitor",
        "--disable-client-side-phishing-detection",
        "--disable-prompt-on-repost",
        "--max_old_space_size=4096",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();

    args.extend(config.extra_chrome_args.iter().cloned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.launch_timeout, Duration::from_secs(30));
        assert_eq!(config.navigation_timeout, Duration::from_secs(20));
        assert!(config.user_agent.contains("Chrome/120"));
        assert!(config.chrome_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_partial_json() {
        let config: Config =
            serde_json::from_str(r#"{ "chrome_path": "/usr/bin/chromium" }"#).unwrap();
        assert_eq!(config.chrome_path.as_deref(), Some("/usr/bin/chromium"));
        assert_eq!(config.wait_policy, WaitPolicy::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.navigation_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.wait_policy.default_ms = 10_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.profiles.mobile.width_px = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_nested_config() {
        let config: Config = serde_json::from_str(
            r#"{ "wait_policy": { "max_ms": 10000 },
                 "profiles": { "mobile": { "width_px": 390, "height_px": 844, "pixel_density": 3.0 } } }"#,
        )
        .unwrap();

        assert_eq!(config.wait_policy.max_ms, 10_000);
        assert_eq!(config.wait_policy.default_ms, 1500);
        assert_eq!(config.wait_policy.site_wait("github.com"), Some(2000));

        assert_eq!(config.profiles.mobile, QualityProfile::new(390, 844, 3.0));
        assert_eq!(config.profiles.retina, ProfileTable::default().retina);
        assert!(config.allowed_schemes.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_request_defaults() {
        let request: RenderRequest = serde_json::from_str("{}").unwrap();
        assert!(request.destination_url.is_none());
        assert_eq!(request.quality_tier, QualityTier::Standard);
        assert!(request.user_wait_hint_ms.is_none());
        assert!(!request.full_page);
        assert!(request.sanitize);
        assert_eq!(request, RenderRequest::default());
    }

    #[test]
    fn test_request_scheme_allowlist() {
        let web = vec!["http".to_string(), "HTTPS".to_string()];

        for raw in ["file:///etc/passwd", "javascript:alert(1)", "data:text/html,hi"] {
            let request = RenderRequest::new(raw);
            assert!(request.validate().is_ok(), "{raw}");
            assert!(
                matches!(request.validate_with_schemes(&web), Err(CaptureError::InvalidUrl(msg)) if msg.contains("not allowed")),
                "{raw}"
            );
        }

        assert!(RenderRequest::new("https://example.com").validate_with_schemes(&web).is_ok());
        assert!(RenderRequest::new("http://example.com").validate_with_schemes(&web).is_ok());
    }

    #[test]
    fn test_request_tolerates_null_and_non_string_fields() {
        let request: RenderRequest = serde_json::from_str(
            r#"{ "url": "https://a.test", "quality": null, "fullPage": null, "removeAds": null }"#,
        )
        .unwrap();
        assert_eq!(request.quality_tier, QualityTier::Standard);
        assert!(!request.full_page);
        assert!(!request.sanitize);

        let request: RenderRequest = serde_json::from_str(
            r#"{ "url": "https://a.test", "quality": 5, "fullPage": 1, "removeAds": 0 }"#,
        )
        .unwrap();
        assert_eq!(request.quality_tier, QualityTier::Standard);
        assert!(request.full_page);
        assert!(!request.sanitize);

        let request: RenderRequest =
            serde_json::from_str(r#"{ "url": "https://a.test", "fullPage": "yes" }"#).unwrap();
        assert!(request.full_page);
        assert!(request.sanitize);
    }

    #[test]
    fn test_request_wire_aliases() {
        let request: RenderRequest = serde_json::from_str(
            r#"{ "url": "https://example.com", "quality": "retina", "wait": 3000,
                 "fullPage": true, "removeAds": false }"#,
        )
        .unwrap();
        assert_eq!(request.destination_url.as_deref(), Some("https://example.com"));
        assert_eq!(request.quality_tier, QualityTier::Retina);
        assert_eq!(request.user_wait_hint_ms, Some(3000));
        assert!(request.full_page);
        assert!(!request.sanitize);
    }

    #[test]
    fn test_request_validation() {
        assert!(matches!(
            RenderRequest::default().validate(),
            Err(CaptureError::MissingUrl)
        ));
        assert!(matches!(
            RenderRequest::new("").validate(),
            Err(CaptureError::MissingUrl)
        ));
        assert!(matches!(
            RenderRequest::new("example.com/path").validate(),
            Err(CaptureError::InvalidUrl(_))
        ));
        assert!(RenderRequest::new("https://example.com").validate().is_ok());
    }

    #[test]
    fn test_resolved_parameters() {
        let config = Config::default();
        let request = RenderRequest {
            quality_tier: QualityTier::Retina,
            user_wait_hint_ms: Some(4000),
            ..RenderRequest::new("https://www.github.com/")
        };
        let params = ResolvedParameters::resolve(&request, &config);
        assert_eq!(params.profile, config.profiles.retina);
        assert_eq!(params.wait_ms, 2000);
        assert!(params.sanitize);
        assert_eq!(params.output_dimensions(), (5120, 2880));

        let full = ResolvedParameters {
            full_page: true,
            ..params
        };
        assert_eq!(full.output_dimensions(), (5120, 0));
    }

    #[test]
    fn test_chrome_args() {
        let config = Config {
            extra_chrome_args: vec!["--lang=en-US".to_string()],
            ..Default::default()
        };
        let args = get_chrome_args(&config);
        assert!(args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&"--disable-gpu".to_string()));
        assert!(args.contains(&"--disable-background-timer-throttling".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("--lang=en-US"));
    }
}
