//! CLI module - Command line interface definitions and handlers

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DefaultsConfig;
use crate::core::{CaseMode, GrepRequest, MatchMode, MatchOptions, Strategy};
use crate::plan::{IgnoreFlags, PolicyFlags};
use crate::report::OutputFormat;

/// grape - deterministic multi-strategy grep over a code tree
///
/// Produces a bounded surface snapshot, a reproducible search plan, ordered
/// results, an auditable probe ledger and one next-step suggestion.
#[derive(Parser, Debug)]
#[command(name = "grape")]
#[command(version)]
#[command(about = "Deterministic multi-strategy grep", long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Verbose logging on stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Config file (default: platform config dir, then ~/.grape/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the command overview (default)
    Help,

    /// Verify the search engine is installed
    Validate,

    /// Surface snapshot only
    Scan(ScanArgs),

    /// Run the full search pipeline
    Grep(GrepArgs),

    /// Validate a compiled plan, then run it as grep
    Plan(PlanArgs),
}

/// Flags shared by `scan` and `grep`
#[derive(Debug, Clone, Args)]
pub struct ScopeArgs {
    /// Search root (relative paths resolve against the repository root)
    #[arg(long, default_value = ".")]
    pub root: String,

    /// Include glob (repeatable)
    #[arg(long = "glob", value_name = "GLOB")]
    pub globs: Vec<String>,

    /// Exclude glob (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Surface snapshot file cap (negative = unbounded)
    #[arg(long, allow_negative_numbers = true)]
    pub snapshot_max_files: Option<i64>,

    /// Search hidden files and directories
    #[arg(long)]
    pub hidden: bool,

    /// Follow symlinks
    #[arg(long)]
    pub follow: bool,

    /// Do not respect ignore files (.gitignore/.ignore/etc)
    #[arg(long)]
    pub no_ignore: bool,

    /// Do not respect VCS ignore files
    #[arg(long)]
    pub no_ignore_vcs: bool,

    /// Do not respect the global ignore file
    #[arg(long)]
    pub no_ignore_global: bool,
}

impl ScopeArgs {
    pub fn policy_flags(&self) -> PolicyFlags {
        PolicyFlags {
            hidden: self.hidden,
            follow: self.follow,
            ignore: IgnoreFlags {
                no_ignore: self.no_ignore,
                no_ignore_vcs: self.no_ignore_vcs,
                no_ignore_global: self.no_ignore_global,
            },
        }
    }

    pub fn format_or(&self, defaults: &DefaultsConfig) -> OutputFormat {
        self.format.unwrap_or(defaults.format)
    }

    pub fn snapshot_max_files_or(&self, defaults: &DefaultsConfig) -> i64 {
        self.snapshot_max_files.unwrap_or(defaults.snapshot_max_files)
    }
}

#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Debug, Clone, Args)]
pub struct GrepArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Search term (repeatable, at least one)
    #[arg(long = "pattern", value_name = "TEXT")]
    pub patterns: Vec<String>,

    /// How patterns are interpreted
    #[arg(long, value_enum)]
    pub mode: Option<MatchMode>,

    /// Case sensitivity
    #[arg(long, value_enum)]
    pub case: Option<CaseMode>,

    /// Context lines around each hit (0-10)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub context: Option<u32>,

    /// Cap on emitted hit records (negative = unbounded)
    #[arg(long, allow_negative_numbers = true)]
    pub max_lines: Option<i64>,

    /// Probe strategy
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Parallel probe cap
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_probes: Option<u64>,

    /// Cascade derived-term cap (negative = unbounded)
    #[arg(long, allow_negative_numbers = true)]
    pub max_derived: Option<i64>,
}

impl GrepArgs {
    /// Build the request, filling unset flags from config defaults
    pub fn to_request(&self, defaults: &DefaultsConfig) -> GrepRequest {
        GrepRequest {
            root: self.scope.root.clone(),
            patterns: self.patterns.clone(),
            include_globs: self.scope.globs.clone(),
            exclude_globs: self.scope.excludes.clone(),
            matching: MatchOptions {
                mode: self.mode.unwrap_or(defaults.mode),
                case: self.case.unwrap_or(defaults.case),
                context: self.context.unwrap_or(defaults.context),
            },
            strategy: self.strategy.unwrap_or(defaults.strategy),
            max_output_hits: self.max_lines.unwrap_or(defaults.max_lines),
            max_probes: self
                .max_probes
                .map_or(defaults.max_probes, |n| n as usize),
            max_derived: self.max_derived.unwrap_or(defaults.max_derived),
            snapshot_max_files: self.scope.snapshot_max_files_or(defaults),
            policy: self.scope.policy_flags().to_policy(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct PlanArgs {
    /// Compiled plan file (JSON)
    #[arg(long, value_name = "PATH")]
    pub plan: Option<PathBuf>,

    /// Read the compiled plan from stdin
    #[arg(long)]
    pub stdin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_grep_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "grape",
            "grep",
            "--pattern",
            "foo",
            "--pattern",
            "bar",
            "--strategy",
            "parallel",
            "--max-lines",
            "-1",
            "--glob",
            "src/**",
            "--no-ignore",
        ])
        .unwrap();
        let Some(Commands::Grep(args)) = cli.command else {
            panic!("expected grep");
        };
        let mut defaults = DefaultsConfig::default();
        defaults.mode = MatchMode::Regex;

        let request = args.to_request(&defaults);
        assert_eq!(request.patterns, vec!["foo", "bar"]);
        assert_eq!(request.strategy, Strategy::Parallel);
        assert_eq!(request.max_output_hits, -1);
        assert_eq!(request.matching.mode, MatchMode::Regex);
        assert_eq!(request.max_probes, 8);
        assert_eq!(request.include_globs, vec!["src/**"]);
        assert!(!request.policy.respect_vcs_ignore);
    }

    #[test]
    fn test_context_and_max_probes_bounds() {
        assert!(Cli::try_parse_from(["grape", "grep", "--pattern", "x", "--context", "11"]).is_err());
        assert!(Cli::try_parse_from(["grape", "grep", "--pattern", "x", "--max-probes", "0"]).is_err());
        assert!(Cli::try_parse_from(["grape", "grep", "--pattern", "x", "--strategy", "fanout"]).is_err());
    }

    #[test]
    fn test_no_command_is_allowed() {
        let cli = Cli::try_parse_from(["grape"]).unwrap();
        assert!(cli.command.is_none());
    }
}
