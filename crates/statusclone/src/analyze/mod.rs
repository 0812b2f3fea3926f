// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Single-shot analyzers that share the completion collaborator and output
//! shapes with the clone pipeline but run no strategy cascade.

pub mod diagram;
pub mod incident;

pub use diagram::{analyze_diagram_image, DiagramAnalysis, DiagramInput, DiagramService};
pub use incident::{analyze_incident_text, AnalyzedIncident};
