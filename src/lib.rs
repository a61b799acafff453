//! # Site Capture
//!
//! Render a web page in headless Chrome and return a PNG, tuned per destination
//! site and per requested quality tier.
//!
//! Every request is independent: it gets its own freshly launched browser and
//! page, which are torn down when the request finishes, whether it succeeded
//! or not. Nothing is cached or shared between requests.
//!
//! ## Pipeline
//!
//! | Step | Component | Notes |
//! |------|-----------|-------|
//! | Validate | [`RenderRequest::validate`] | Missing or relative URLs fail before any browser starts |
//! | Settle delay | [`WaitPolicy`] | Known sites override the caller's hint; clamped to 8s |
//! | Viewport | [`ProfileTable`] | `standard`, `high`, `retina`, `mobile`; unknown tiers are `standard` |
//! | Launch | [`RenderingEngineProvider`] | [`ChromiumProvider`] starts one Chrome per request |
//! | Navigate | [`PageContext::navigate`] | Waits for DOM parsed only, bounded by the navigation timeout |
//! | Clean up | [`PageSanitizer`] | Best effort; failures never fail the request |
//! | Capture | [`PageContext::screenshot`] | Viewport or full page PNG |
//! | Classify | [`classify`] | `InvalidInput` (400), `NavigationTimeout` (408), `Internal` (500) |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use site_capture::{Config, QualityTier, RenderRequest, ScreenshotService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ScreenshotService::new(Config::default());
//!
//!     let request = RenderRequest {
//!         quality_tier: QualityTier::Retina,
//!         ..RenderRequest::new("https://example.com")
//!     };
//!     let capture = service.render(&request).await.result?;
//!     println!("Captured {}x{}, {} bytes", capture.width_px, capture.height_px, capture.byte_len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! site-capture capture --url https://github.com --output github.png --quality retina
//! site-capture batch --input urls.txt --output shots/ --concurrency 4
//! site-capture resolve --url https://www.notion.so --wait 500
//! ```

/// Configuration, request/result types and Chrome launch flags
pub mod config;

/// Error types and classification
pub mod error;

/// Rendering engine traits and the Chromium implementation
pub mod engine;

/// Quality tiers and viewport profiles
pub mod profiles;

/// Per-site settle delay resolution
pub mod wait_policy;

/// Best-effort page clutter removal
pub mod sanitizer;

/// The capture pipeline
pub mod screenshot_service;

/// JSON response envelope for transport layers
pub mod response;

/// Command-line interface implementation
pub mod cli;

/// Capture metrics
pub mod metrics;

/// Process health summary
pub mod health;

/// Utility functions and helpers
pub mod utils;


pub use cli::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use health::*;
pub use self::metrics::describe_metrics;
pub use profiles::*;
pub use response::*;
pub use sanitizer::*;
pub use screenshot_service::*;
pub use utils::*;
pub use wait_policy::*;
