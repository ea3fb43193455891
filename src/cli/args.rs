//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--config <path>`: Use this configuration file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Changeset - stage, inspect and commit edits to record fixtures
#[derive(Parser, Debug)]
#[command(name = "changeset")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Read configuration from this file instead of the default locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stage edits against a fixture's root record and report the result
    #[command(
        name = "stage",
        long_about = "Stage edits against a fixture's root record and report the result.\n\n\
            Edits are buffered in a change proxy. Without --apply or --save the \
            records are left exactly as loaded, and the report shows each staged \
            value next to the value it replaces.",
        after_help = "\
VALUE SYNTAX:
    @2        the record with id 2
    @2,@3     records 2 and 3, in order
    null      no value
    anything else is text, converted by the attribute's declared type

EXAMPLES:
    # Preview an edit
    changeset stage people.json --set firstName=Jim

    # Reassign a relationship and add a follower, then commit
    changeset stage people.json --set follows=@3 --push followers=@4 --save

    # Apply and write the resulting records
    changeset stage people.json --set children=3 --apply --output out.json"
    )]
    Stage {
        /// Fixture file with the records to edit
        fixture: PathBuf,

        /// Stage KEY=VALUE
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Append records to a to-many relationship (KEY=@ID[,@ID...])
        #[arg(long = "push", value_name = "KEY=@ID")]
        push: Vec<String>,

        /// Remove records from a to-many relationship (KEY=@ID[,@ID...])
        #[arg(long = "remove", value_name = "KEY=@ID")]
        remove: Vec<String>,

        /// Copy staged edits onto the record
        #[arg(long)]
        apply: bool,

        /// Apply staged edits and commit the record
        #[arg(long, conflicts_with = "apply")]
        save: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Write the records to this file afterwards
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    #[command(name = "completion")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion generation.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_repeated_edits() {
        let cli = Cli::try_parse_from([
            "changeset",
            "stage",
            "people.json",
            "--set",
            "firstName=Jim",
            "--set",
            "follows=@2",
            "--push",
            "followers=@3",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Command::Stage {
                set, push, json, ..
            } => {
                assert_eq!(set, ["firstName=Jim", "follows=@2"]);
                assert_eq!(push, ["followers=@3"]);
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn apply_conflicts_with_save() {
        let result = Cli::try_parse_from(["changeset", "stage", "f.json", "--apply", "--save"]);
        assert!(result.is_err());
    }
}
