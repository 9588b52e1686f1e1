//=====================================================
// File: main.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: cgprof CLI entry point
// Objective: Run a VM bytecode program under the call-path profiler and
//            write the resulting call tree for offline analysis
//=====================================================

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use callgraph_profiler::profiler::dump::{dump, dump_assignment};
use callgraph_profiler::profiler::{Clock, ClockSource, ProfileReport};
use callgraph_profiler::vm::{ProfiledRun, VmBytecode, run_profiled};
use callgraph_profiler::{OutputFormat, ProfilerConfig};

#[derive(Parser, Debug)]
#[command(name = "cgprof", about = "Call-path profiler for VM bytecode programs")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a JSON bytecode program and write its call-path profile.
    Run(RunArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Path to the JSON bytecode program.
    pub program: PathBuf,

    /// TOML profiler configuration.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Write the profile here instead of stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Profile format: dict or json.
    #[arg(long = "format")]
    pub format: Option<OutputFormat>,

    /// Timing source: monotonic or realtime.
    #[arg(long = "clock")]
    pub clock: Option<ClockSource>,

    /// Maximum call nesting before the run aborts.
    #[arg(long = "max-depth")]
    pub max_depth: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Run(cmd) => run_entry(cmd),
    }
}

fn run_entry(args: RunArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let program = VmBytecode::load(&args.program)
        .with_context(|| format!("loading program {}", args.program.display()))?;
    let program = Arc::new(program);
    tracing::info!(
        program = %args.program.display(),
        functions = program.functions.len(),
        clock = %config.clock,
        "starting profiled run"
    );

    let run = run_profiled(Arc::clone(&program), config.clock.build(), config.max_call_depth);
    match &run.result {
        Ok(value) => tracing::info!(result = %value, "program finished"),
        Err(err) => tracing::error!(error = %err, "program failed"),
    }

    write_profile(&config, &program, &run)?;
    run.result
        .map(|_| ())
        .with_context(|| format!("executing {}", args.program.display()))
}

fn resolve_config(args: &RunArgs) -> Result<ProfilerConfig> {
    let mut config = match &args.config {
        Some(path) => ProfilerConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => ProfilerConfig::default(),
    };
    if let Some(output) = &args.output {
        config.output = Some(output.clone());
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if let Some(clock) = args.clock {
        config.clock = clock;
    }
    if let Some(max_depth) = args.max_depth {
        config.max_call_depth = max_depth;
    }
    Ok(config)
}

fn write_profile<C: Clock>(
    config: &ProfilerConfig,
    program: &VmBytecode,
    run: &ProfiledRun<C>,
) -> Result<()> {
    let mut sink: Box<dyn Write> = match &config.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let tree = run.profiler.tree();
    match config.format {
        OutputFormat::Dict if config.assignment_prefix => {
            dump_assignment(tree, program, &mut sink).context("writing profile")?
        }
        OutputFormat::Dict => dump(tree, program, &mut sink).context("writing profile")?,
        OutputFormat::Json => {
            ProfileReport::build(tree, program)
                .write_json(&mut sink)
                .context("writing profile")?;
            sink.write_all(b"\n").context("writing profile")?;
        }
    }
    sink.flush().context("flushing profile")?;

    if let Some(path) = &config.output {
        tracing::info!(path = %path.display(), nodes = tree.len(), "profile written");
    }
    Ok(())
}

//=====================================================
// End of file
//=====================================================
