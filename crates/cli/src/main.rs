// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rvt - RelVal lifecycle tracker CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod app;
mod color;
mod commands;
mod config;
mod env;
mod exit_error;
mod logging;
mod output;
mod state_lock;
mod table;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{lifecycle, relval, serve};
use output::OutputFormat;

use crate::config::Config;
use crate::state_lock::StateLock;

#[derive(Parser)]
#[command(name = "rvt", version, about = "RelVal tracker - release validation lifecycle")]
struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    /// Config file (default: $RVT_CONFIG, then <state dir>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a RelVal in status new
    Create(relval::CreateArgs),
    /// Show RelVals
    Show {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// List RelVals
    List(relval::ListArgs),
    /// Edit a RelVal
    Update(relval::UpdateArgs),
    /// Delete RelVals that never left status new
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Move RelVals to their next status
    Next {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Move RelVals back one status
    Previous {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Re-fetch workflows and output datasets
    Refresh {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Recover interrupted submissions and poll submitted RelVals
    Serve,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e
            .downcast_ref::<exit_error::ExitError>()
            .map_or(1, |c| c.code);
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(code);
    }
}

/// Format an anyhow error, deduplicating the chain.
///
/// If the top-level Display already contains the source error text, the
/// "Caused by" chain is skipped. Otherwise the full chain is rendered.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    let Some(command) = cli.command else {
        // No subcommand provided: print help and exit 0
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let state_dir = env::state_dir()?;
    let config = Config::load(cli.config.as_deref(), &state_dir)?;

    if let Commands::Serve = command {
        let _log_guard = logging::setup_file(&state_dir)?;
        return serve::serve(config, state_dir).await;
    }

    logging::setup_stderr();
    let _lock = StateLock::acquire(&state_dir).await?;
    let ctl = app::build_controller(&config, &state_dir)?;
    let user = env::user();

    let result = match command {
        Commands::Create(args) => relval::create(args, &ctl, &user, format).await,
        Commands::Show { ids } => relval::show(&ids, &ctl, format),
        Commands::List(args) => relval::list(&args, &ctl, format),
        Commands::Update(args) => relval::update(&args, &ctl, &user, format),
        Commands::Delete { ids } => relval::delete(&ids, &ctl, &user),
        Commands::Next { ids } => lifecycle::next(&ids, &ctl, &user, format).await,
        Commands::Previous { ids } => lifecycle::previous(&ids, &ctl, &user, format).await,
        Commands::Refresh { ids } => lifecycle::refresh(&ids, &ctl, format).await,
        Commands::Serve => Ok(()),
    };
    ctl.shutdown().await;
    result
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
