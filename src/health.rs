//! Liveness summary for the capture service
//!
//! There is no pooled state to inspect: every request brings up its own
//! browser. Health is therefore process-level only: uptime and resident memory.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

pub const SERVICE_NAME: &str = "site-capture";

#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    pub status: HealthLevel,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: f64,
    /// Resident set size, when the platform exposes it
    pub memory_rss_bytes: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    Healthy,
}

impl HealthSummary {
    pub fn collect(started_at: Instant) -> Self {
        Self {
            status: HealthLevel::Healthy,
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now(),
            uptime_secs: started_at.elapsed().as_secs_f64(),
            memory_rss_bytes: resident_memory(),
        }
    }
}

/// Resident memory of this process from `/proc/self/status` (Linux only)
pub fn resident_memory() -> Option<usize> {
    let content = std::fs::read_to_string("/proc/self/status").ok()?;
    content
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse::<usize>().ok())
        .map(|kb| kb * 1024)
}
