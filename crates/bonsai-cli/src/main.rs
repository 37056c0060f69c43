//! Bonsai CLI - behaviour tree runner.
//!
//! - `bonsai validate <file>` - check a tree definition
//! - `bonsai describe <file>` - print the node layout
//! - `bonsai run <file>` - tick a tree headlessly with stand-in tasks

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use bonsai_cli::{load_definition, runner, RunnerConfig};

#[derive(Parser)]
#[command(name = "bonsai")]
#[command(about = "Behaviour tree runner", version)]
struct Cli {
    /// Project root directory
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check structure, configuration and links of a tree definition
    Validate {
        /// Tree definition (YAML or JSON)
        file: PathBuf,
    },

    /// Print one line per node
    Describe {
        /// Tree definition (YAML or JSON)
        file: PathBuf,
    },

    /// Tick a tree until it finishes
    Run {
        /// Tree definition (YAML or JSON)
        file: PathBuf,

        /// Maximum number of updates
        #[arg(long)]
        ticks: Option<u64>,

        /// Seconds per update
        #[arg(long)]
        dt: Option<f32>,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// Runner config (defaults to .bonsai/config.yaml under the project root)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print every traversal step
        #[arg(long)]
        trace: bool,

        /// Restart the tree whenever it finishes
        #[arg(long)]
        repeat: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins unless --verbose is given
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let project_root = match cli.project {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match cli.command {
        Commands::Validate { file } => validate(&project_root, &file),
        Commands::Describe { file } => describe(&project_root, &file),
        Commands::Run {
            file,
            ticks,
            dt,
            seed,
            config,
            trace,
            repeat,
        } => {
            let mut config = match config {
                Some(path) => RunnerConfig::load(&path)?,
                None => RunnerConfig::load_from_project(&project_root)?,
            };
            if let Some(ticks) = ticks {
                config.max_ticks = ticks;
            }
            if let Some(dt) = dt {
                config.delta_seconds = dt;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            config.trace |= trace;
            config.restart_on_completion |= repeat;
            run(&file, &config)
        }
    }
}

fn validate(project_root: &Path, file: &Path) -> Result<()> {
    let definition = load_definition(file)?;
    definition
        .validate()
        .with_context(|| format!("{} is not a valid tree", file.display()))?;

    let config = RunnerConfig::load_from_project(project_root)?;
    let mut tree = runner::instantiate(&definition, &config)?;
    tree.start();

    let problems = tree.reference_errors();
    for err in problems {
        println!("  warning: {err}");
    }
    println!(
        "{}: {} nodes, height {}, {} link warning(s)",
        definition.name,
        tree.len(),
        tree.height(),
        problems.len()
    );
    tree.end();
    Ok(())
}

fn describe(project_root: &Path, file: &Path) -> Result<()> {
    let definition = load_definition(file)?;
    let config = RunnerConfig::load_from_project(project_root)?;
    let tree = runner::instantiate(&definition, &config)?;

    println!("{}", definition.name);
    println!("{}", "=".repeat(definition.name.len().max(4)));
    for line in tree.describe() {
        println!("{line}");
    }

    let actions = definition.action_names();
    if !actions.is_empty() {
        println!();
        println!("Actions: {}", actions.join(", "));
    }
    if !definition.blackboard.is_empty() {
        println!();
        println!("Blackboard:");
        for (key, value) in &definition.blackboard {
            println!("  {key} = {value}");
        }
    }
    Ok(())
}

fn run(file: &Path, config: &RunnerConfig) -> Result<()> {
    if config.max_ticks == 0 {
        bail!("--ticks must be at least 1");
    }
    let definition = load_definition(file)?;
    let report = runner::run(&definition, config)?;

    if config.trace {
        for event in &report.trace {
            println!("{event}");
        }
        println!();
    }

    if report.finished() {
        println!(
            "{}: {:?} after {} tick(s)",
            report.tree, report.status, report.ticks
        );
    } else if config.restart_on_completion && report.completions > 0 {
        println!(
            "{}: completed {} time(s) in {} tick(s)",
            report.tree, report.completions, report.ticks
        );
    } else {
        println!("{}: still running after {} tick(s)", report.tree, report.ticks);
    }

    if !report.blackboard.is_empty() {
        println!("Blackboard:");
        for (key, value) in &report.blackboard {
            println!("  {key} = {value}");
        }
    }
    Ok(())
}
