//! fuelflow: command-line driver for the Fuelflow simulation core.
//!
//! `decay` projects a composition forward through the built-in decay
//! library. `sell` runs a multi-period sell scenario from a TOML file.
//! Both can write composition records as JSON lines.

mod market;
mod scenario;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use fuelflow_core::comp_math::CompMap;
use fuelflow_core::nuclide;
use fuelflow_core::recorder::{JsonLinesRecorder, MemoryRecorder};
use fuelflow_core::traits::Recorder;
use fuelflow_decay::{default_solver, Basis, Composition};
use fuelflow_market::Context;

use crate::scenario::ScenarioConfig;

/// Fuelflow: material decay and trading core.
#[derive(Parser)]
#[command(name = "fuelflow")]
#[command(version, about = "Decay compositions and run sell scenarios")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decay a composition and print it at each step.
    Decay(DecayArgs),
    /// Run a sell scenario.
    Sell(SellArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum BasisArg {
    Mass,
    Atom,
}

#[derive(Args)]
struct DecayArgs {
    /// Nuclide quantities as NAME=QTY, e.g. Cs137=1.0. Repeatable.
    #[arg(short, long = "nuc", required = true, value_parser = parse_nuc_qty)]
    nucs: Vec<(i32, f64)>,

    /// Basis of the given quantities.
    #[arg(long, value_enum, default_value = "mass")]
    basis: BasisArg,

    /// Number of timesteps to project.
    #[arg(short, long, default_value_t = 12)]
    steps: u64,

    /// Timesteps per printed row.
    #[arg(long, default_value_t = 1)]
    every: u64,

    /// Seconds per timestep.
    #[arg(long, default_value_t = fuelflow_core::constants::DEFAULT_TIMESTEP_SECS)]
    timestep_secs: u64,

    /// Print rows as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Write composition records to this JSON-lines file.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct SellArgs {
    /// Scenario file (TOML).
    #[arg(short, long)]
    config: PathBuf,

    /// Write composition records to this JSON-lines file.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Decay(args) => cmd_decay(args),
        Commands::Sell(args) => cmd_sell(args),
    }
}

fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn parse_nuc_qty(s: &str) -> Result<(i32, f64), String> {
    let (name, qty) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=QTY, got {s:?}"))?;
    let nuc = nuclide::parse(name).map_err(|e| e.to_string())?;
    let qty: f64 = qty.trim().parse().map_err(|_| format!("bad quantity in {s:?}"))?;
    Ok((nuc, qty))
}

/// Records go to a JSON-lines file when one is given, otherwise to memory.
enum Sink {
    File(Arc<JsonLinesRecorder<BufWriter<File>>>),
    Memory(Arc<MemoryRecorder>),
}

impl Sink {
    fn open(path: Option<&PathBuf>) -> Result<Self> {
        Ok(match path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                Sink::File(Arc::new(JsonLinesRecorder::new(BufWriter::new(file))))
            }
            None => Sink::Memory(Arc::new(MemoryRecorder::new())),
        })
    }

    fn recorder(&self) -> Arc<dyn Recorder> {
        match self {
            Sink::File(r) => r.clone(),
            Sink::Memory(r) => r.clone(),
        }
    }

    /// Flush and report the number of rows.
    fn finish(&self) -> Result<u64> {
        match self {
            Sink::File(r) => {
                r.flush().context("failed to flush records")?;
                Ok(r.written())
            }
            Sink::Memory(r) => Ok(r.len() as u64),
        }
    }
}

fn cmd_decay(args: DecayArgs) -> Result<()> {
    if args.every == 0 {
        bail!("--every must be at least 1");
    }
    let v: CompMap = args.nucs.iter().copied().collect();
    let basis = match args.basis {
        BasisArg::Mass => Basis::Mass,
        BasisArg::Atom => Basis::Atom,
    };
    let root = Composition::create_with_solver(basis, v, default_solver())
        .context("invalid composition")?;

    let sink = Sink::open(args.output.as_ref())?;
    let recorder = sink.recorder();

    let mut step = 0;
    loop {
        let comp = root.decay_with_timestep(step, args.timestep_secs);
        comp.record(recorder.as_ref());
        print_step(step, &comp, args.json)?;
        if step >= args.steps {
            break;
        }
        step = (step + args.every).min(args.steps);
    }

    let rows = sink.finish()?;
    info!(steps = args.steps, rows, lineage = root.chain().len(), "decay finished");
    Ok(())
}

fn print_step(step: u64, comp: &Composition, json: bool) -> Result<()> {
    if json {
        let mass: serde_json::Map<String, serde_json::Value> = comp
            .mass()
            .iter()
            .map(|(&nuc, &qty)| (nuclide::name(nuc), serde_json::Value::from(qty)))
            .collect();
        let row = serde_json::json!({ "step": step, "id": comp.id(), "mass": mass });
        println!("{}", serde_json::to_string(&row)?);
    } else {
        println!("# step {step} (composition {})", comp.id());
        print!("{comp}");
    }
    Ok(())
}

fn cmd_sell(args: SellArgs) -> Result<()> {
    let cfg = ScenarioConfig::load(&args.config)?;
    let sink = Sink::open(args.output.as_ref())?;
    let ctx = Arc::new(Context::new(cfg.timestep_secs, sink.recorder()));

    info!(
        scenario = %args.config.display(),
        periods = cfg.periods,
        seller = %cfg.seller.name,
        "running sell scenario"
    );
    let summaries = market::run_scenario(&cfg, &ctx)?;

    println!(
        "{:>6} {:>12} {:>12} {:>7} {:>12}",
        "time", "offered", "delivered", "trades", "remaining"
    );
    for s in &summaries {
        println!(
            "{:>6} {:>12.3} {:>12.3} {:>7} {:>12.3}",
            s.time, s.offered, s.delivered, s.trades, s.remaining
        );
    }

    let rows = sink.finish()?;
    info!(rows, "scenario finished");
    Ok(())
}
