//! Command-line interface definition.
use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the cybex component configurator.
#[derive(Parser, Debug)]
#[command(
    name = "cybex",
    about = "Install and remove desktop components, idempotently",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared across all subcommands.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Override the repository root directory (also `CYBEX_ROOT`)
    #[arg(long, global = true)]
    pub root: Option<std::path::PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install components
    Install(SelectionOpts),
    /// Uninstall components and restore backed-up files
    Uninstall(SelectionOpts),
    /// List available components
    List,
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the per-command log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Uninstall(_) => "uninstall",
            Self::List => "list",
            Self::Completions { .. } => "completions",
            Self::Version => "version",
        }
    }
}

/// Component selection for `install` and `uninstall`.
#[derive(Parser, Debug, Clone)]
pub struct SelectionOpts {
    /// Component names or aliases, or `all` (comma or space separated)
    #[arg(required = true, num_args = 1.., value_delimiter = ',')]
    pub components: Vec<String>,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    fn selection(cli: Cli) -> Vec<String> {
        match cli.command {
            Command::Install(opts) | Command::Uninstall(opts) => opts.components,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_install_with_space_and_comma_lists() {
        let cli = Cli::parse_from(["cybex", "install", "fish", "waybar,ssh-key"]);
        assert_eq!(selection(cli), vec!["fish", "waybar", "ssh-key"]);
    }

    #[test]
    fn install_requires_a_selector() {
        assert!(Cli::try_parse_from(["cybex", "install"]).is_err());
    }

    #[test]
    fn parse_uninstall_all() {
        let cli = Cli::parse_from(["cybex", "uninstall", "all"]);
        assert!(matches!(cli.command, Command::Uninstall(_)));
        assert_eq!(selection(cli), vec!["all"]);
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["cybex", "install", "fish", "-d", "-y", "-v"]);
        assert!(cli.global.dry_run);
        assert!(cli.global.yes);
        assert!(cli.verbose);
    }

    #[test]
    fn parse_root_override() {
        let cli = Cli::parse_from(["cybex", "--root", "/tmp/cybex", "list"]);
        assert_eq!(cli.global.root, Some(std::path::PathBuf::from("/tmp/cybex")));
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn parse_completions() {
        let cli = Cli::parse_from(["cybex", "completions", "fish"]);
        assert!(matches!(
            cli.command,
            Command::Completions {
                shell: clap_complete::Shell::Fish
            }
        ));
        assert_eq!(cli.command.name(), "completions");
    }

    #[test]
    fn parse_version() {
        let cli = Cli::parse_from(["cybex", "version"]);
        assert!(matches!(cli.command, Command::Version));
    }
}
