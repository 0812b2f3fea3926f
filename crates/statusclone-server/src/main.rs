// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use statusclone_server::cli;
use statusclone_server::config::ServerConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "statusclone",
    about = "Statusclone: reconstruct public status pages as structured data",
    version,
    after_help = "Run 'statusclone <command> --help' for details on each command."
)]
struct Cli {
    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "statusclone=info,statusclone_server=info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Suppress progress output.
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Print results as single-line JSON.
    #[arg(long, global = true)]
    compact: bool,

    #[command(flatten)]
    config: ServerConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve,
    /// Clone one status page and print the result
    Clone {
        /// Status page URL (scheme optional)
        url: String,
    },
    /// Turn a free-text incident description into a structured incident
    AnalyzeIncident {
        /// Incident text; read from --file or stdin when omitted
        text: Option<String>,
        /// Read the incident text from a file
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },
    /// Describe the services in an architecture or status diagram
    AnalyzeDiagram {
        /// Image file path, http(s) URL or data: URL
        image: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "statusclone", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(&cli.log_level, cli.log_json);

    let result = match cli.command {
        Commands::Serve => cli::serve::run(&cli.config).await,
        Commands::Clone { url } => {
            cli::clone_cmd::run(&cli.config, &url, cli.quiet, cli.compact).await
        }
        Commands::AnalyzeIncident { text, file } => {
            cli::analyze_cmd::run_incident(&cli.config, text, file, cli.compact).await
        }
        Commands::AnalyzeDiagram { image } => {
            cli::analyze_cmd::run_diagram(&cli.config, &image, cli.compact).await
        }
        Commands::Completions { .. } => Ok(()),
    };

    // 0=success, 1=error
    if let Err(e) = &result {
        if !cli.quiet {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
