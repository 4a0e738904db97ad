mod agent;
mod error;
mod reasoner;
mod task;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use agent::{ExecutionCoordinator, PoolConfig, TaskAllocator};
use task::TranscriptStore;

/// Allocate tasks to a pool of skill-tagged agents and run them concurrently
#[derive(Debug, Parser)]
#[command(name = "allot", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Allocate each task, then execute every assigned agent
    Run(RunArgs),
    /// Show the configured agent pool
    Agents(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Config file (defaults to .allot/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Write transcripts and the report to this directory
    #[arg(long)]
    transcripts: Option<PathBuf>,

    /// Cancel executions still running after this many seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Task descriptions, allocated in order
    #[arg(required = true)]
    tasks: Vec<String>,
}

impl ConfigArgs {
    fn load(&self) -> anyhow::Result<PoolConfig> {
        let path = self.config.clone().unwrap_or_else(PoolConfig::default_path);
        PoolConfig::load(&path)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "allot=debug" } else { "allot=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: RunArgs) -> anyhow::Result<bool> {
    let config = args.config.load()?;
    let reasoner = config
        .reasoner
        .build()
        .context("Failed to set up reasoning service")?;
    tracing::info!(reasoner = %config.reasoner.describe(), agents = config.agents.len(), "pool ready");

    let agents = config.build_agents(reasoner.clone());
    let mut allocator = TaskAllocator::new(reasoner, agents, config.match_policy);

    for description in &args.tasks {
        let outcome = allocator.allocate(description).await;
        println!("{}: {}", description, outcome);
    }

    let mut coordinator = ExecutionCoordinator::new();
    if let Some(secs) = args.deadline_secs {
        coordinator = coordinator.with_deadline(Duration::from_secs(secs));
    }
    let report = coordinator.run(allocator.agents_mut()).await;

    println!();
    print!("{}", report);
    for run in report.completed() {
        if let Some(task) = allocator
            .agent(&run.agent)
            .and_then(|a| a.completed_task())
        {
            println!();
            println!("## {} ({})", run.agent, task.description);
            if let Some(rationale) = &task.rationale {
                println!("Rationale: {}", rationale);
            }
            println!("{}", task.execution_result.as_deref().unwrap_or_default());
        }
    }

    if let Some(dir) = &args.transcripts {
        let store = TranscriptStore::new(dir)?;
        store.save_round(allocator.agents(), &report)?;
    }

    Ok(report.is_success())
}

fn show_agents(args: ConfigArgs) -> anyhow::Result<()> {
    let config = args.load()?;
    println!("reasoner: {}", config.reasoner.describe());
    println!("match policy: {:?}", config.match_policy);
    for spec in &config.agents {
        println!("- {}: {}", spec.name, spec.skills.join(", "));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            init_tracing(args.config.verbose);
            let success = run(args).await?;
            Ok(if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Agents(args) => {
            init_tracing(args.verbose);
            show_agents(args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
