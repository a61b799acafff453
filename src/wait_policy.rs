//! Settle-delay resolution
//!
//! Decides how long to let a page finish client-side rendering after the DOM
//! is parsed. Known sites carry tuned delays that take precedence over the
//! caller's hint; everything is clamped to a ceiling so a single request can't
//! hold a browser open indefinitely.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Delay used when neither a site entry nor a caller hint applies
pub const DEFAULT_WAIT_MS: u64 = 1500;

/// Upper bound applied to every resolved delay
pub const MAX_WAIT_MS: u64 = 8000;

const SITE_WAIT_TIMES: &[(&str, u64)] = &[
    ("github.com", 2000),
    ("gitlab.com", 2000),
    ("figma.com", 3000),
    ("dribbble.com", 1000),
    ("behance.net", 2000),
    ("stripe.com", 1500),
    ("vercel.com", 1000),
    ("netlify.com", 1000),
    ("heroku.com", 1500),
    ("railway.app", 1000),
    ("medium.com", 2000),
    ("dev.to", 1500),
    ("hashnode.com", 1500),
    ("substack.com", 2000),
    ("notion.so", 3000),
    ("airtable.com", 2500),
    ("google.com", 500),
    ("youtube.com", 2000),
    ("twitter.com", 1500),
    ("x.com", 1500),
    ("linkedin.com", 2000),
    ("facebook.com", 2000),
    ("instagram.com", 2000),
    ("reddit.com", 1500),
    ("producthunt.com", 2000),
];

/// Per-site settle delays plus the default and ceiling
///
/// # Examples
///
/// ```rust
/// use site_capture::WaitPolicy;
///
/// let policy = WaitPolicy::default();
/// assert_eq!(policy.resolve_wait("https://www.github.com/rust-lang", Some(100)), 2000);
/// assert_eq!(policy.resolve_wait("https://example.com", Some(3000)), 3000);
/// assert_eq!(policy.resolve_wait("not a url", Some(60_000)), 8000);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WaitPolicy {
    /// Normalized hostname to recommended delay in milliseconds
    pub sites: HashMap<String, u64>,

    /// Fallback when no site entry and no caller hint exist (default: 1500)
    pub default_ms: u64,

    /// Hard ceiling for any resolved delay (default: 8000)
    pub max_ms: u64,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            sites: SITE_WAIT_TIMES
                .iter()
                .map(|(host, ms)| (host.to_string(), *ms))
                .collect(),
            default_ms: DEFAULT_WAIT_MS,
            max_ms: MAX_WAIT_MS,
        }
    }
}

impl WaitPolicy {
    /// Resolve the settle delay in milliseconds for `url`
    ///
    /// A site entry wins over `user_hint_ms`; otherwise the hint, then the
    /// default. A zero hint counts as no hint. Never fails: an unparseable
    /// url skips the site lookup.
    pub fn resolve_wait(&self, url: &str, user_hint_ms: Option<u64>) -> u64 {
        let fallback = user_hint_ms.filter(|ms| *ms > 0).unwrap_or(self.default_ms);

        let wait = match Url::parse(url) {
            Ok(parsed) => parsed
                .host_str()
                .and_then(|host| self.site_wait(host))
                .unwrap_or(fallback),
            Err(_) => fallback,
        };

        wait.min(self.max_ms)
    }

    pub fn resolve_duration(&self, url: &str, user_hint_ms: Option<u64>) -> Duration {
        Duration::from_millis(self.resolve_wait(url, user_hint_ms))
    }

    /// Site entry for a raw hostname, if any
    pub fn site_wait(&self, host: &str) -> Option<u64> {
        self.sites.get(&normalize_host(host)).copied()
    }
}

/// Lowercase a hostname and strip one leading `www.`
pub fn normalize_host(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_site_overrides_hint() {
        let policy = WaitPolicy::default();
        for (host, expected) in SITE_WAIT_TIMES {
            let url = format!("https://{host}/some/path");
            assert_eq!(policy.resolve_wait(&url, None), *expected, "{host}");
            assert_eq!(policy.resolve_wait(&url, Some(7000)), *expected, "{host}");
            assert_eq!(policy.resolve_wait(&url, Some(1)), *expected, "{host}");
        }
    }

    #[test]
    fn test_known_site_is_clamped() {
        let mut policy = WaitPolicy::default();
        policy.max_ms = 1000;
        assert_eq!(policy.resolve_wait("https://notion.so", None), 1000);
        assert_eq!(policy.resolve_wait("https://google.com", None), 500);
    }

    #[test]
    fn test_www_prefix_and_case() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.resolve_wait("https://www.figma.com/file/x", None), 3000);
        assert_eq!(policy.resolve_wait("https://WWW.Figma.COM", None), 3000);
        assert_eq!(policy.resolve_wait("https://figma.com", None), 3000);
    }

    #[test]
    fn test_subdomain_is_not_matched() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.resolve_wait("https://gist.github.com", None), DEFAULT_WAIT_MS);
    }

    #[test]
    fn test_unknown_host_uses_hint_or_default() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.resolve_wait("https://example.com", Some(2500)), 2500);
        assert_eq!(policy.resolve_wait("https://example.com", Some(20_000)), MAX_WAIT_MS);
        assert_eq!(policy.resolve_wait("https://example.com", None), DEFAULT_WAIT_MS);
        assert_eq!(policy.resolve_wait("https://example.com", Some(0)), DEFAULT_WAIT_MS);
    }

    #[test]
    fn test_unparseable_url_does_not_fail() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.resolve_wait("not a url", Some(5000)), 5000);
        assert_eq!(policy.resolve_wait("not a url", Some(9000)), MAX_WAIT_MS);
        assert_eq!(policy.resolve_wait("", None), DEFAULT_WAIT_MS);
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("WWW.Example.com"), "example.com");
        assert_eq!(normalize_host("www.www.example.com"), "www.example.com");
        assert_eq!(normalize_host("example.www.com"), "example.www.com");
    }

    #[test]
    fn test_resolve_duration() {
        let policy = WaitPolicy::default();
        assert_eq!(
            policy.resolve_duration("https://x.com/home", None),
            Duration::from_millis(1500)
        );
    }
}
