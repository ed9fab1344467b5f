use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "stead")]
#[command(version)]
#[command(about = "Declarative management of UNIX groups and users", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converge the system with the declared groups and users
    Apply(ApplyArgs),

    /// Report what apply would do without changing anything
    Scan(ScanArgs),

    /// Show declared vs provisioned attributes side by side
    Diff(TargetArgs),

    /// List the entities stead has created
    Registry,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
pub struct ApplyArgs {
    /// Overwrite diverged attributes and delete orphaned entities
    #[arg(short, long)]
    pub force: bool,

    /// Report what would be done, run no commands
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub targets: TargetArgs,
}

#[derive(clap::Args)]
pub struct ScanArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub targets: TargetArgs,
}

#[derive(clap::Args)]
pub struct TargetArgs {
    /// Restrict to entities: `group`, `user`, `group:wheel`, `user:alice`
    #[arg(value_name = "SELECTOR")]
    pub targets: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::parse_from(["stead", "-vv", "apply", "--force", "group:wheel", "user"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Apply(args) => {
                assert!(args.force);
                assert!(!args.dry_run);
                assert_eq!(args.targets.targets, vec!["group:wheel", "user"]);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_parse_scan_json() {
        let cli = Cli::parse_from(["stead", "scan", "--json"]);
        assert!(matches!(cli.command, Command::Scan(ScanArgs { json: true, .. })));
    }
}
