//! Command handlers
//!
//! Each handler returns the process exit code on success. Errors bubble up
//! to `main`, which prints their diagnostics and maps them to an exit class.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use super::{Cli, Commands, GrepArgs, PlanArgs, ScanArgs};
use crate::config::Config;
use crate::core::{GrepEngine, GrepRequest};
use crate::error::{GrapeError, Result, EXIT_OK, EXIT_RUNTIME};
use crate::plan::{self, CompiledPlan, OutputInfo, SurfacePlan};
use crate::report::{stdout_isatty, OutputFormat, Reporter};

const HELP: &str = "\
grape - deterministic multi-strategy grep

Commands:
  help                          Show this help message
  validate                      Verify the search engine is installed
  scan [opts]                   Surface snapshot only
  grep [opts]                   Run a deterministic surface search
  plan --plan <path>            Validate a compiled plan and run grep
  plan --stdin                  Validate a compiled plan from stdin and run grep

Output contract (grep):
  1) Surface snapshot (bounded, deterministic)
  2) Search plan (schema-shaped)
  3) Results (hits or explicit absence)
  4) Probe ledger (auditable)
  5) Next-step suggestion (single axis)

Options (scan, grep):
  --root <path>                 default: .
  --glob <pattern>              repeatable include glob
  --exclude <pattern>           repeatable exclude glob
  --format <auto|human|jsonl>   default: auto
  --snapshot-max-files <n>      default: 20000 (surface snapshot cap)
  --hidden                      search hidden files/dirs
  --follow                      follow symlinks
  --no-ignore                   do not respect ignore files (.gitignore/.ignore/etc)
  --no-ignore-vcs               do not respect VCS ignore (.gitignore)
  --no-ignore-global            do not respect global ignore

Options (grep):
  --pattern <text>              repeatable (search terms)
  --mode <fixed|regex>          default: fixed
  --case <sensitive|insensitive|smart>  default: smart
  --context <n>                 default: 0
  --max-lines <n>               default: 500 (caps printed hit records)
  --strategy <single|parallel|cascade>  default: single
  --max-probes <n>              default: 8 (parallel probe cap)
  --max-derived <n>             default: 12 (cascade derived-term cap)

Global:
  --config <path>               config file
  -v, --verbose                 debug logging on stderr

Usage:
  grape grep --root . --pattern \"foo\" --glob \"src/**/*.py\" --strategy single --format human
  grape grep --root . --pattern \"foo\" --pattern \"bar\" --strategy parallel --format jsonl
  grape grep --root . --pattern \"foo\" --strategy cascade --format auto
";

/// Run the selected command
pub fn dispatch(cli: &Cli, config: &Config, base: &Path) -> Result<u8> {
    let engine = GrepEngine::from_config(config, base);
    debug!("Base directory: {}", engine.resolver().base().display());

    match &cli.command {
        None | Some(Commands::Help) => help(),
        Some(Commands::Validate) => validate(&engine),
        Some(Commands::Scan(args)) => scan(&engine, args, config),
        Some(Commands::Grep(args)) => grep(&engine, args, config),
        Some(Commands::Plan(args)) => run_plan(&engine, args),
    }
}

fn help() -> Result<u8> {
    print!("{HELP}");
    Ok(EXIT_OK)
}

fn validate(engine: &GrepEngine) -> Result<u8> {
    if !engine.backend().is_available() {
        return Err(GrapeError::EngineMissing("rg (ripgrep)".to_string()));
    }
    println!("ok: grape CLI is runnable");
    Ok(EXIT_OK)
}

fn scan(engine: &GrepEngine, args: &ScanArgs, config: &Config) -> Result<u8> {
    let scope_args = &args.scope;
    let output = OutputInfo::resolve(scope_args.format_or(&config.defaults), stdout_isatty());
    let max_files = scope_args.snapshot_max_files_or(&config.defaults);
    let flags = scope_args.policy_flags();

    let scope = engine.resolve_scope(&scope_args.root, &scope_args.globs, &scope_args.excludes)?;
    let snapshot = engine.snapshot(&scope, &flags.to_policy(), max_files);
    let surface_plan = SurfacePlan::new(
        &scope_args.root,
        &scope_args.globs,
        &scope_args.excludes,
        max_files,
        flags,
        output,
    );

    let mut reporter = Reporter::new(io::stdout().lock(), output.format_resolved);
    reporter.surface_plan(&surface_plan)?;
    reporter.snapshot(&snapshot)?;
    reporter.into_inner().flush()?;
    Ok(EXIT_OK)
}

fn grep(engine: &GrepEngine, args: &GrepArgs, config: &Config) -> Result<u8> {
    let request = args.to_request(&config.defaults);
    let format = args.scope.format_or(&config.defaults);
    run_search(engine, &request, format, None)
}

fn run_plan(engine: &GrepEngine, args: &PlanArgs) -> Result<u8> {
    let raw = read_plan(args)?;
    let compiled = plan::validate(raw)?;
    debug!("Compiled plan accepted ({})", compiled.intent_hash);
    run_search(engine, &compiled.to_request(), compiled.format(), Some(&compiled))
}

/// Shared tail of `grep` and `plan`
fn run_search(
    engine: &GrepEngine,
    request: &GrepRequest,
    format: OutputFormat,
    compiled: Option<&CompiledPlan>,
) -> Result<u8> {
    let output = OutputInfo::resolve(format, stdout_isatty());
    let mut reporter = Reporter::new(io::stdout().lock(), output.format_resolved);

    if let Some(compiled) = compiled {
        reporter.compiled_plan(compiled)?;
    }

    let mut prepared = engine.prepare(request)?;
    prepared.plan = prepared.plan.with_output(output);
    reporter.snapshot(&prepared.snapshot)?;
    reporter.search_plan(&prepared.plan)?;

    let code = match engine.execute(&prepared) {
        Ok(outcome) => {
            reporter.outcome(&outcome)?;
            EXIT_OK
        }
        Err(GrapeError::ProbeFailed(failure)) if reporter.is_jsonl() => {
            reporter.probe_error(&failure)?;
            EXIT_RUNTIME
        }
        Err(e) => return Err(e),
    };
    reporter.into_inner().flush()?;
    Ok(code)
}

fn read_plan(args: &PlanArgs) -> Result<Value> {
    let raw = match (&args.plan, args.stdin) {
        (Some(_), true) => {
            return Err(GrapeError::usage("use either --plan or --stdin, not both"));
        }
        (None, false) => {
            return Err(GrapeError::usage("--plan is required unless --stdin is used"));
        }
        (None, true) => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .map_err(|e| GrapeError::usage(format!("failed to read plan: {e}")))?;
            if raw.trim().is_empty() {
                return Err(GrapeError::usage("stdin plan is empty"));
            }
            raw
        }
        (Some(path), false) => {
            if !path.exists() {
                return Err(GrapeError::usage(format!(
                    "plan file not found: {}",
                    path.display()
                )));
            }
            fs::read_to_string(path)
                .map_err(|e| GrapeError::usage(format!("failed to read plan: {e}")))?
        }
    };

    serde_json::from_str(&raw).map_err(|e| GrapeError::usage(format!("invalid JSON in plan: {e}")))
}
