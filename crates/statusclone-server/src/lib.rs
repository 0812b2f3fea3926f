// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP server and command-line front end for the statusclone pipeline.
//!
//! [`rest`] exposes clone runs as Server-Sent Events plus the two analyzers as
//! JSON endpoints. [`cli`] drives the same operations from a terminal.

pub mod cli;
pub mod config;
pub mod rest;
