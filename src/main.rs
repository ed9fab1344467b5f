mod cli;
mod commands;
mod config;
mod paths;
mod runner;
mod status;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let clean = match cli.command {
        Command::Apply(args) => commands::declarative::apply(&ctx, args)?,
        Command::Scan(args) => commands::declarative::scan(&ctx, args)?,
        Command::Diff(args) => commands::declarative::diff(&ctx, args)?,
        Command::Registry => commands::declarative::registry(&ctx)?,
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "stead", &mut io::stdout());
            true
        }
    };

    if !clean {
        std::process::exit(1);
    }
    Ok(())
}
