// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Statusclone: reconstruct an arbitrary public status page as structured data.
//!
//! The [`pipeline::ClonePipeline`] turns a URL into services (with groups and
//! display order), per-day uptime series and incident timelines, streaming
//! progress as it goes. [`analyze`] holds the single-shot siblings for
//! free-text incidents and diagram images.

pub mod acquisition;
pub mod ai;
pub mod analyze;
pub mod config;
pub mod dom;
pub mod incidents;
pub mod persist;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod reduce;
pub mod renderer;
pub mod status;
pub mod structure;
pub mod types;
pub mod uptime;

pub use acquisition::Fetcher;
pub use ai::{CompletionProvider, OpenAiCompatProvider, StructuredExtractor};
pub use config::{CompletionLimits, PipelineConfig};
pub use pipeline::ClonePipeline;
pub use progress::{CloneEvent, ProgressEnvelope, Reporter};
pub use types::*;
