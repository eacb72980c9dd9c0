use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tenq_core::{FairQueue, FifoQueue, Queue, QueueConfig, render_stats};
use tenq_demo::{Scenario, ScenarioFile, drive, render_pattern};

#[derive(Parser)]
#[command(
    name = "tenq-demo",
    about = "Compare fair and FIFO scheduling on a step-driven message scenario",
    version,
    long_about = None
)]
struct Cli {
    /// Which queue policy to run
    #[arg(long, value_enum, default_value_t = Policy::Both)]
    policy: Policy,

    /// Buffer capacity (per tenant for fair, shared for fifo)
    #[arg(long)]
    capacity: Option<usize>,

    /// TOML scenario file; the built-in example is used when omitted
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Print Prometheus-style counters after each run
    #[arg(long)]
    stats: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Policy {
    Fair,
    Fifo,
    Both,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let (scenario, file_capacity) = match &cli.scenario {
        Some(path) => {
            let file = ScenarioFile::load(path)?;
            let capacity = file.capacity;
            tracing::info!(path = %path.display(), "loaded scenario");
            (file.into_scenario(), capacity)
        }
        None => (Scenario::example(), None),
    };

    let config = QueueConfig::new(
        cli.capacity
            .or(file_capacity)
            .unwrap_or(QueueConfig::DEFAULT_CAPACITY),
    );
    config.validate()?;
    tracing::info!(
        capacity = config.buffer_capacity,
        steps = scenario.steps.len(),
        messages = scenario.message_count(),
        "starting run"
    );

    if matches!(cli.policy, Policy::Fair | Policy::Both) {
        println!("=== Testing Fair Queue ===");
        run(&FairQueue::<u64>::new(config.clone()), &scenario, cli.stats, "fair");
    }
    if cli.policy == Policy::Both {
        println!();
    }
    if matches!(cli.policy, Policy::Fifo | Policy::Both) {
        println!("=== Testing FIFO Queue ===");
        run(&FifoQueue::<u64>::new(config), &scenario, cli.stats, "fifo");
    }

    Ok(())
}

fn run(queue: &dyn Queue<u64>, scenario: &Scenario, show_stats: bool, namespace: &str) {
    let report = drive(queue, scenario);

    println!("\nInput pattern:");
    print!("{}", render_pattern(&report.input));
    println!("next call pattern");
    print!("{}", render_pattern(&report.output));

    if report.rejected > 0 {
        tracing::info!(rejected = report.rejected, "some puts were refused");
    }
    if show_stats {
        println!();
        print!("{}", render_stats(&queue.stats(), namespace));
    }
}
