// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pipeline tuning knobs.
//!
//! Defaults match the documented constants; every field can be overridden with a
//! `STATUSCLONE_*` environment variable.

use std::time::Duration;

/// Tuning for one [`crate::pipeline::ClonePipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Per-request timeout for plain HTTP fetches.
    pub fetch_timeout_ms: u64,
    /// Budget for one headless render, including all interaction steps.
    pub render_timeout_ms: u64,
    /// Initial wait after load before interacting with the page.
    pub render_settle_ms: u64,
    /// How many times the expansion script runs.
    pub expansion_passes: u32,
    /// Wait between expansion passes.
    pub expansion_wait_ms: u64,
    /// Hard ceiling on one structured-completion call.
    pub completion_timeout_secs: u64,
    /// Document text beyond this many characters is cut before completion.
    pub max_document_chars: usize,
    /// Concurrent detail-page fetches per batch.
    pub detail_batch_size: usize,
    /// Days of uptime history per service; decoded bars are padded or cut to it.
    pub uptime_days: usize,
    /// Upper bound on incidents kept from history pages.
    pub max_history_incidents: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 15_000,
            render_timeout_ms: 60_000,
            render_settle_ms: 3_000,
            expansion_passes: 3,
            expansion_wait_ms: 1_000,
            completion_timeout_secs: 120,
            max_document_chars: 800_000,
            detail_batch_size: 5,
            uptime_days: 90,
            max_history_incidents: 50,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by any `STATUSCLONE_*` variables present.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `STATUSCLONE_*`
    /// key. Unparseable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let var = |key: &str| lookup(&format!("STATUSCLONE_{key}"));
        Self {
            fetch_timeout_ms: parse_or(var("FETCH_TIMEOUT_MS"), d.fetch_timeout_ms),
            render_timeout_ms: parse_or(var("RENDER_TIMEOUT_MS"), d.render_timeout_ms),
            render_settle_ms: parse_or(var("RENDER_SETTLE_MS"), d.render_settle_ms),
            expansion_passes: parse_or(var("EXPANSION_PASSES"), d.expansion_passes),
            expansion_wait_ms: parse_or(var("EXPANSION_WAIT_MS"), d.expansion_wait_ms),
            completion_timeout_secs: parse_or(
                var("COMPLETION_TIMEOUT_SECS"),
                d.completion_timeout_secs,
            ),
            max_document_chars: parse_or(var("MAX_DOCUMENT_CHARS"), d.max_document_chars),
            detail_batch_size: parse_or(var("DETAIL_BATCH_SIZE"), d.detail_batch_size).max(1),
            uptime_days: parse_or(var("UPTIME_DAYS"), d.uptime_days).max(1),
            max_history_incidents: parse_or(
                var("MAX_HISTORY_INCIDENTS"),
                d.max_history_incidents,
            ),
        }
    }

    pub fn completion_limits(&self) -> CompletionLimits {
        CompletionLimits {
            timeout: Duration::from_secs(self.completion_timeout_secs),
            max_document_chars: self.max_document_chars,
        }
    }
}

/// Limits applied to every structured-completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionLimits {
    pub timeout: Duration,
    pub max_document_chars: usize,
}

impl Default for CompletionLimits {
    fn default() -> Self {
        PipelineConfig::default().completion_limits()
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.expansion_passes, 3);
        assert_eq!(cfg.detail_batch_size, 5);
        assert_eq!(cfg.max_document_chars, 800_000);
        assert_eq!(cfg.uptime_days, 90);
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let cfg = PipelineConfig::from_lookup(lookup_from(&[
            ("STATUSCLONE_UPTIME_DAYS", " 30 "),
            ("STATUSCLONE_DETAIL_BATCH_SIZE", "not-a-number"),
            ("STATUSCLONE_FETCH_TIMEOUT_MS", "2500"),
        ]));
        assert_eq!(cfg.uptime_days, 30);
        assert_eq!(cfg.detail_batch_size, 5);
        assert_eq!(cfg.fetch_timeout_ms, 2500);
        assert_eq!(cfg.render_timeout_ms, 60_000);
    }

    #[test]
    fn test_zero_sizes_are_clamped() {
        let cfg = PipelineConfig::from_lookup(lookup_from(&[
            ("STATUSCLONE_UPTIME_DAYS", "0"),
            ("STATUSCLONE_DETAIL_BATCH_SIZE", "0"),
        ]));
        assert_eq!(cfg.uptime_days, 1);
        assert_eq!(cfg.detail_batch_size, 1);
    }

    #[test]
    fn test_completion_limits_follow_config() {
        let cfg = PipelineConfig {
            completion_timeout_secs: 7,
            ..Default::default()
        };
        let limits = cfg.completion_limits();
        assert_eq!(limits.timeout, Duration::from_secs(7));
    }
}
