// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Structural extractor: service list, group hierarchy and display order.
//!
//! An ordered chain of strategies sharing one `attempt` contract; the first
//! one that returns a structure wins. `Ok(None)` means "not applicable, try
//! the next one".

pub mod ai;
pub mod heuristic;
pub mod markup;
pub mod platform;

use crate::ai::StructuredExtractor;
use crate::probe::PlatformPage;
use crate::types::{CloneError, CloneResult, ExtractedService};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Service name to group name, for grouped services only.
pub type GroupAssignment = BTreeMap<String, String>;

/// A page's service topology.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    /// Flat, in display order, `group` set for nested services.
    pub services: Vec<ExtractedService>,
    pub groups: GroupAssignment,
    pub order: Vec<String>,
    pub page_name: Option<String>,
    /// Which strategy produced this.
    pub source: &'static str,
}

impl Structure {
    /// Derive the group map and order from already ordered services.
    pub fn from_services(services: Vec<ExtractedService>, source: &'static str) -> Self {
        let groups = services
            .iter()
            .filter_map(|s| s.group.clone().map(|g| (s.name.clone(), g)))
            .collect();
        let order = services.iter().map(|s| s.name.clone()).collect();
        Self {
            services,
            groups,
            order,
            page_name: None,
            source,
        }
    }

    pub fn with_page_name(mut self, name: Option<String>) -> Self {
        self.page_name = name;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Everything a strategy may look at.
#[derive(Debug, Clone, Copy)]
pub struct StructureInput<'a> {
    /// Markup as fetched or rendered.
    pub raw_html: &'a str,
    /// Output of [`crate::reduce::reduce_for_services`].
    pub reduced_html: &'a str,
    pub platform: Option<&'a PlatformPage>,
    /// Services already known from the platform API, in API order.
    pub known_services: &'a [ExtractedService],
}

/// One way of recovering the structure.
#[async_trait]
pub trait StructureStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, input: &StructureInput<'_>) -> CloneResult<Option<Structure>>;
}

/// Runs the strategy chain.
pub struct StructureExtractor {
    strategies: Vec<Box<dyn StructureStrategy>>,
}

impl StructureExtractor {
    /// Platform hierarchy, heuristic inference, known markup, then AI.
    pub fn new(ai: Option<StructuredExtractor>) -> Self {
        Self::with_strategies(vec![
            Box::new(platform::PlatformStrategy),
            Box::new(heuristic::HeuristicStrategy),
            Box::new(markup::MarkupStrategy),
            Box::new(ai::AiStrategy::new(ai)),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn StructureStrategy>>) -> Self {
        Self { strategies }
    }

    /// First non-empty structure wins. If every strategy came up empty the
    /// result is an empty structure, unless one of them failed, in which case
    /// the last failure is returned.
    pub async fn extract(&self, input: &StructureInput<'_>) -> CloneResult<Structure> {
        let mut last_error: Option<CloneError> = None;
        for strategy in &self.strategies {
            match strategy.attempt(input).await {
                Ok(Some(structure)) if !structure.is_empty() => {
                    info!(
                        "{} strategy found {} services in {} groups",
                        strategy.name(),
                        structure.services.len(),
                        structure.groups.values().collect::<std::collections::BTreeSet<_>>().len()
                    );
                    return Ok(structure);
                }
                Ok(_) => debug!("{} strategy not applicable", strategy.name()),
                Err(e) => {
                    warn!("{} strategy failed: {e}", strategy.name());
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(Structure::default()),
        }
    }
}
