//! cncsim CLI - machining simulator
//!
//! Runs a G-code program through the motion simulator, writes the sampled
//! tool path and carves a stock block with the cutters it used.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod run;

use config::JobConfig;

#[derive(Parser)]
#[command(name = "cncsim")]
#[command(about = "Simulate CNC programs and the material they remove", long_about = None)]
#[command(subcommand_negates_reqs = true)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    // Without a subcommand, `cncsim <input>` is `cncsim run <input>`.
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args)]
struct RunArgs {
    /// Program file
    #[arg(required = true)]
    input: Option<PathBuf>,
    /// Job configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Simulated time quantum in seconds
    #[arg(long)]
    time_slice: Option<f64>,
    /// Arc chord tolerance in mm
    #[arg(long)]
    tolerance: Option<f64>,
    /// Path output file
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Skip stock carving
    #[arg(long)]
    no_stock: bool,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a program, write its path and carve the stock (the default)
    Run(RunArgs),
    /// Parse a program without simulating it
    Check {
        /// Program file
        input: PathBuf,
    },
    /// Print the default job configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command.unwrap_or(Commands::Run(cli.run)) {
        Commands::Run(args) => simulate(args)?,
        Commands::Check { input } => {
            let program = cncsim_gcode::parse_file(&input, &Default::default())
                .with_context(|| format!("failed to parse {}", input.display()))?;
            println!(
                "{}: {} commands from {} tokens",
                input.display(),
                program.len(),
                program.token_count()
            );
        }
        Commands::Config => {
            print!("{}", JobConfig::default_toml()?);
        }
    }

    Ok(())
}

fn simulate(args: RunArgs) -> Result<()> {
    let input = args.input.context("no program file given")?;
    let mut job = match args.config {
        Some(path) => JobConfig::load(&path)?,
        None => JobConfig::default(),
    };
    if let Some(time_slice) = args.time_slice {
        job.sim.time_slice = time_slice;
    }
    if let Some(tolerance) = args.tolerance {
        job.sim.arc_tolerance = tolerance;
    }
    if let Some(output) = args.output {
        job.output.path = output;
    }
    if args.no_stock {
        job.stock.enabled = false;
    }

    let summary = run::run(&input, &job)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        run::print_summary(&summary);
    }
    Ok(())
}
