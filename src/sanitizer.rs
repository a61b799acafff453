//! Best-effort removal of page clutter before capture
//!
//! Cookie banners, ad slots, chat widgets, popups and promo bars are stripped
//! from the DOM so the capture shows the page content. Nothing here can fail a
//! request: every problem is recorded in the [`SanitizeReport`] and the capture
//! goes ahead with whatever was removed.

use crate::PageContext;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Attribute-substring selectors for known clutter
pub const CLUTTER_SELECTORS: &[&str] = &[
    // Cookie banners and GDPR notices
    "[id*=\"cookie\"]",
    "[class*=\"cookie\"]",
    "[id*=\"gdpr\"]",
    "[class*=\"gdpr\"]",
    "[class*=\"consent\"]",
    "[id*=\"consent\"]",
    // Advertisements
    ".ad",
    ".ads",
    "[id*=\"ad-\"]",
    "[class*=\"advertisement\"]",
    "[class*=\"banner-ad\"]",
    "[id*=\"banner\"]",
    // Chat and support widgets
    "[id*=\"chat\"]",
    "[class*=\"chat-widget\"]",
    "[class*=\"intercom\"]",
    "[class*=\"zendesk\"]",
    "[class*=\"helpdesk\"]",
    // Popups and modals
    "[class*=\"newsletter-popup\"]",
    "[class*=\"email-signup\"]",
    "[class*=\"subscription-modal\"]",
    "[class*=\"popup\"]",
    "[class*=\"modal\"]",
    // Notification and promo bars
    "[class*=\"notification-bar\"]",
    "[class*=\"promo-bar\"]",
    "[class*=\"top-bar\"]",
];

/// Phrases whose containing element is removed, matched case-insensitively
pub const CLUTTER_PHRASES: &[&str] = &[
    "accept cookies",
    "cookie policy",
    "privacy policy",
    "subscribe now",
];

const SELECTOR_SCRIPT: &str = r#"(() => {
  const selectors = __SELECTORS__;
  let removed = 0;
  const failures = [];
  for (const selector of selectors) {
    try {
      document.querySelectorAll(selector).forEach((el) => {
        if (el && el.parentNode && el.isConnected) {
          el.parentNode.removeChild(el);
          removed += 1;
        }
      });
    } catch (e) {
      failures.push(selector + ": " + (e && e.message ? e.message : String(e)));
    }
  }
  return { removed, failures, skipped: false };
})()"#;

const TEXT_SCRIPT: &str = r#"(() => {
  if (typeof document.evaluate !== "function" || typeof XPathResult === "undefined") {
    return { removed: 0, failures: [], skipped: true };
  }
  const phrases = __PHRASES__;
  let removed = 0;
  const failures = [];
  for (const text of phrases) {
    try {
      const xpath = `//*[contains(translate(text(), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), '${text}')]`;
      const result = document.evaluate(xpath, document, null, XPathResult.UNORDERED_NODE_SNAPSHOT_TYPE, null);
      for (let i = 0; i < result.snapshotLength; i++) {
        const el = result.snapshotItem(i);
        if (el && el.parentNode && el.isConnected && el.tagName !== "BODY" && el.tagName !== "HTML") {
          el.parentNode.removeChild(el);
          removed += 1;
        }
      }
    } catch (e) {
      failures.push(text + ": " + (e && e.message ? e.message : String(e)));
    }
  }
  return { removed, failures, skipped: false };
})()"#;

/// What a sanitize pass managed to do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SanitizeReport {
    /// Elements removed across both strategies
    pub removed: usize,
    /// Non-fatal problems, one entry per failed selector, phrase or strategy
    pub failures: Vec<String>,
    /// Text matching was unavailable in the page and was not attempted
    pub text_query_skipped: bool,
}

impl SanitizeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct StrategyOutcome {
    #[serde(default)]
    removed: usize,
    #[serde(default)]
    failures: Vec<String>,
    #[serde(default)]
    skipped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Selectors,
    Text,
}

impl Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::Selectors => "selector removal",
            Strategy::Text => "text removal",
        }
    }
}

/// Removes clutter by selector and by text content
#[derive(Debug, Clone)]
pub struct PageSanitizer {
    selectors: Vec<String>,
    phrases: Vec<String>,
}

impl Default for PageSanitizer {
    fn default() -> Self {
        Self::new(
            CLUTTER_SELECTORS.iter().map(|s| s.to_string()).collect(),
            CLUTTER_PHRASES.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl PageSanitizer {
    pub fn new(selectors: Vec<String>, phrases: Vec<String>) -> Self {
        Self {
            selectors,
            phrases: phrases.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Run both strategies against `page`; never fails
    pub async fn sanitize(&self, page: &dyn PageContext) -> SanitizeReport {
        let mut report = SanitizeReport::default();

        self.run(page, Strategy::Selectors, &self.selector_script(), &mut report)
            .await;
        self.run(page, Strategy::Text, &self.text_script(), &mut report)
            .await;

        if report.is_clean() {
            debug!("Sanitizer removed {} elements", report.removed);
        } else {
            warn!(
                "Sanitizer removed {} elements with {} failures, continuing",
                report.removed,
                report.failures.len()
            );
        }
        report
    }

    async fn run(
        &self,
        page: &dyn PageContext,
        strategy: Strategy,
        script: &str,
        report: &mut SanitizeReport,
    ) {
        let value = match page.evaluate(script).await {
            Ok(value) => value,
            Err(e) => {
                report.failures.push(format!("{}: {}", strategy.name(), e));
                return;
            }
        };

        match serde_json::from_value::<StrategyOutcome>(value) {
            Ok(outcome) => {
                report.removed += outcome.removed;
                report.failures.extend(
                    outcome
                        .failures
                        .into_iter()
                        .map(|f| format!("{}: {}", strategy.name(), f)),
                );
                if strategy == Strategy::Text && outcome.skipped {
                    debug!("Text query unsupported in page, skipping text removal");
                    report.text_query_skipped = true;
                }
            }
            Err(e) => report
                .failures
                .push(format!("{}: unexpected script result: {}", strategy.name(), e)),
        }
    }

    fn selector_script(&self) -> String {
        SELECTOR_SCRIPT.replace("__SELECTORS__", &json_array(&self.selectors))
    }

    fn text_script(&self) -> String {
        TEXT_SCRIPT.replace("__PHRASES__", &json_array(&self.phrases))
    }
}

fn json_array(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}
