// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Uptime-bar decoder.
//!
//! Deterministic SVG decoding first. The completion collaborator is consulted
//! when that yields nothing or when the page gives no date anchor. Its series
//! replace the deterministic ones per service and the deterministic ones fill
//! the gaps. Every series is then fitted to the configured window (older days
//! cut, missing older days `None`) and one start date is resolved for the
//! whole page.

pub mod ai;
pub mod anchor;
pub mod color;
pub mod svg;

pub use svg::{decode_uptime_bars, ServiceUptime};

use crate::ai::StructuredExtractor;
use crate::dom::{tokenize, DomToken};
use crate::reduce::reduce_for_uptime;
use crate::structure::heuristic::normalize_name;
use crate::types::{CloneResult, ExtractedService};
use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use tracing::{info, warn};

/// Per-service series for one page plus the page-wide anchor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UptimeOutcome {
    pub series: HashMap<String, ServiceUptime>,
    /// Calendar date of index 0 in every series.
    pub start_date: Option<NaiveDate>,
    pub used_ai: bool,
}

impl UptimeOutcome {
    pub fn series_len(&self) -> usize {
        self.series
            .values()
            .map(|s| s.uptime_days.len())
            .max()
            .unwrap_or(0)
    }

    /// Copy series onto matching services (by normalized name).
    pub fn apply_to(&self, services: &mut [ExtractedService]) {
        let by_norm: HashMap<String, &ServiceUptime> = self
            .series
            .iter()
            .map(|(name, s)| (normalize_name(name), s))
            .collect();
        for service in services.iter_mut() {
            if let Some(series) = by_norm.get(&normalize_name(&service.name)) {
                service.uptime_days = series.uptime_days.clone();
                if series.uptime_pct.is_some() {
                    service.uptime_pct = series.uptime_pct;
                }
            }
        }
    }
}

/// Fit every non-empty series to exactly `window` days, keeping the newest.
///
/// Returns the common length before fitting, i.e. the longest decoded series.
pub fn fit_series(series: &mut HashMap<String, ServiceUptime>, window: usize) -> usize {
    let longest = series.values().map(|s| s.uptime_days.len()).max().unwrap_or(0);
    for s in series.values_mut().filter(|s| !s.uptime_days.is_empty()) {
        let len = s.uptime_days.len();
        if len > window {
            s.uptime_days.drain(..len - window);
        } else if len < window {
            let mut padded = vec![None; window - len];
            padded.append(&mut s.uptime_days);
            s.uptime_days = padded;
        }
    }
    longest
}

/// Move the date of index 0 after the series went from `decoded_len` to `window` days.
fn shift_start(start: NaiveDate, decoded_len: usize, window: usize) -> Option<NaiveDate> {
    if decoded_len >= window {
        start.checked_add_days(Days::new((decoded_len - window) as u64))
    } else {
        start.checked_sub_days(Days::new((window - decoded_len) as u64))
    }
}

/// Deterministic pass: decoded series and the "since" anchor, if any.
///
/// Synchronous; returns the reduced markup for a possible AI pass.
pub fn decode_deterministic(
    html: &str,
    service_names: &[String],
) -> (String, HashMap<String, ServiceUptime>, Option<NaiveDate>) {
    let reduced = reduce_for_uptime(html);
    let series = decode_uptime_bars(&reduced, service_names);
    let text = tokenize(&reduced)
        .iter()
        .filter_map(DomToken::as_text)
        .collect::<Vec<_>>()
        .join(" ");
    let anchor = anchor::find_since_anchor(&text);
    (reduced, series, anchor)
}

pub struct UptimeDecoder {
    ai: Option<StructuredExtractor>,
    window_days: usize,
}

impl UptimeDecoder {
    /// Every decoded series comes out exactly `window_days` long.
    pub fn new(ai: Option<StructuredExtractor>, window_days: usize) -> Self {
        Self {
            ai,
            window_days: window_days.max(1),
        }
    }

    /// Decode bars for `service_names`, treating `today` as the newest bar when
    /// the page has no anchor.
    pub async fn decode(
        &self,
        html: &str,
        service_names: &[String],
        today: NaiveDate,
    ) -> CloneResult<UptimeOutcome> {
        let (reduced, mut series, anchor) = decode_deterministic(html, service_names);
        info!(
            "decoded uptime bars for {}/{} services (anchor: {anchor:?})",
            series.len(),
            service_names.len()
        );

        let mut ai_start = None;
        let mut used_ai = false;
        if series.is_empty() || anchor.is_none() {
            if let Some(extractor) = &self.ai {
                match ai::classify_with_ai(extractor, &reduced, service_names).await {
                    Ok(found) => {
                        used_ai = true;
                        ai_start = found.start_date;
                        for (name, s) in found.series {
                            series.insert(name, s);
                        }
                    }
                    // Deterministic bars are still worth keeping.
                    Err(e) if !series.is_empty() => {
                        warn!("AI uptime classification failed, keeping decoded bars: {e}");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let decoded_len = fit_series(&mut series, self.window_days);
        let start_date = anchor::resolve_start_date(anchor.or(ai_start), decoded_len, today)
            .and_then(|start| shift_start(start, decoded_len, self.window_days));

        Ok(UptimeOutcome {
            series,
            start_date,
            used_ai,
        })
    }
}
