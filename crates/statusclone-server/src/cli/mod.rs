//! CLI subcommand implementations for the statusclone binary.

pub mod analyze_cmd;
pub mod clone_cmd;
pub mod output;
pub mod serve;
