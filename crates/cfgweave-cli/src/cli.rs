//! cfgweave CLI - expand `$ref`/`$use`/`$merge` directives in a document.
//!
//! Usage:
//!   cfgweave eval config.yaml --local vars.yaml
//!   cfgweave check config.yaml --local vars.yaml --global env.yaml

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use cfgweave_core::{Error, EvaluatorBuilder, Node};
use cfgweave_resolvers::FileResolver;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

#[derive(Parser)]
#[command(name = "cfgweave")]
#[command(author, version, about = "Expand $ref/$use/$merge directives in a configuration document", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a document and print the expanded result.
    Eval(EvalArgs),
    /// Evaluate a document and report success or failure without printing it.
    Check(EvalArgs),
}

#[derive(Parser)]
struct EvalArgs {
    /// Document to evaluate.
    input: PathBuf,

    /// YAML/JSON document supplying the `local` scope.
    #[arg(long)]
    local: Option<PathBuf>,

    /// YAML/JSON document supplying the `global` scope.
    #[arg(long)]
    global: Option<PathBuf>,

    /// Sandbox root directory for the `resource::file::<path>` scope.
    #[arg(long)]
    resource_root: Option<PathBuf>,

    /// Output format for `eval`.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,

    /// Maximum directive-resolution depth before aborting.
    #[arg(long, default_value_t = 20)]
    max_depth: usize,

    /// Enable the path-resolution cache (amortizes repeated lookups).
    #[arg(long)]
    cache: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Eval(args) => run_eval(args, true),
        Commands::Check(args) => run_eval(args, false),
    }
}

fn run_eval(args: EvalArgs, print_output: bool) -> ExitCode {
    match evaluate(&args) {
        Ok(node) => {
            if print_output {
                match render(&node, args.format) {
                    Ok(text) => println!("{text}"),
                    Err(err) => {
                        eprintln!("{} {err}", "error:".red().bold());
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                println!("{} {}", "✓".green().bold(), args.input.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{} {err}", "✗".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn evaluate(args: &EvalArgs) -> Result<Node, Error> {
    let input = load(&args.input)?;

    let mut builder = EvaluatorBuilder::new().with_max_depth(args.max_depth);
    if let Some(local) = &args.local {
        builder = builder.with_local_scope(load(local)?);
    }
    if let Some(global) = &args.global {
        builder = builder.with_global_scope(load(global)?);
    }
    if let Some(root) = &args.resource_root {
        builder = builder.with_resource_resolver(FileResolver::new(root.clone()));
    }
    if args.cache {
        builder = builder.with_cache_enabled(true);
    }

    let evaluator = builder.build();
    evaluator.eval(&input)
}

fn load(path: &PathBuf) -> Result<Node, Error> {
    let bytes = fs::read(path)
        .map_err(|e| Error::syntax(format!("failed to read '{}': {e}", path.display())))?;
    let value: serde_yaml::Value = serde_yaml::from_slice(&bytes)
        .map_err(|e| Error::syntax(format!("failed to parse '{}': {e}", path.display())))?;
    Ok(Node::from(value))
}

fn render(node: &Node, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(node).map_err(|e| e.to_string()),
        OutputFormat::Json => serde_json::to_string_pretty(node).map_err(|e| e.to_string()),
    }
}
