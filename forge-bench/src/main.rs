mod cli;
mod config;
mod cpu_baselines;
mod data_gen;
mod experiments;
mod harness;
mod output;
mod stats;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::ForgeArgs;
use config::{get_profile, parse_sizes, TuningConfig, PROFILE_NAMES};
use forge_primitives::ComputeContext;
use harness::{run_experiment, BenchConfig, DataPoint};
use output::progress::BenchProgress;

fn setup_logging(debug_synchronous: bool) {
    let default = if debug_synchronous { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Sizes, runs and warmup: CLI values take precedence over the profile.
fn resolve_bench_config(args: &ForgeArgs) -> Result<BenchConfig, String> {
    let profile = match args.profile.as_deref() {
        Some(name) => Some(get_profile(name).ok_or_else(|| {
            format!("Unknown profile '{}'. Valid: {}", name, PROFILE_NAMES.join(", "))
        })?),
        None => None,
    };

    let sizes = match (&args.sizes, &profile) {
        (Some(raw), _) => parse_sizes(raw).map_err(|e| format!("Error parsing sizes: {}", e))?,
        (None, Some(p)) => p.sizes.clone(),
        (None, None) => vec![1_000_000],
    };
    let (runs, warmup) = match &profile {
        Some(p) => (
            if args.runs != 10 { args.runs } else { p.runs },
            if args.warmup != 3 { args.warmup } else { p.warmup },
        ),
        None => (args.runs, args.warmup),
    };
    Ok(BenchConfig { sizes, runs, warmup })
}

fn run(args: &ForgeArgs) -> Result<(), String> {
    let config = resolve_bench_config(args)?;
    let tuning = TuningConfig::from_cli(args.block_size, args.items_per_thread, args.debug_synchronous)?;
    let ctx = match args.threads {
        Some(n) => ComputeContext::with_threads(n),
        None => ComputeContext::new(),
    }
    .map_err(|e| e.to_string())?;
    let device = ctx.info();

    let mut all_exps = experiments::all_experiments(&tuning, device.worker_threads * 4);
    if !args.is_all_suite() {
        for name in &args.experiments {
            if !all_exps.iter().any(|e| e.name() == name.as_str()) {
                let available: Vec<&str> = all_exps.iter().map(|e| e.name()).collect();
                return Err(format!("Unknown experiment '{}'. Available: {}", name, available.join(", ")));
            }
        }
        all_exps.retain(|e| args.experiments.iter().any(|n| n.as_str() == e.name()));
    }

    println!("forge-bench: device reduce-by-key benchmark suite");
    println!(
        "  Device: {} ({} workers, {:.0}% of cores)",
        device.name,
        device.worker_threads,
        device.core_utilization()
    );
    println!(
        "  Tiles: reduce {}x{}, scan {}x{}",
        tuning.reduce_by_key.reduce.block_size,
        tuning.reduce_by_key.reduce.items_per_thread,
        tuning.reduce_by_key.scan.block_size,
        tuning.reduce_by_key.scan.items_per_thread
    );
    println!(
        "  Experiments: {:?}",
        all_exps.iter().map(|e| e.name()).collect::<Vec<_>>()
    );
    println!("  Sizes: {:?}", config.sizes);
    println!("  Runs: {}, Warmup: {}", config.runs, config.warmup);
    println!();

    // Pass timings go to stderr in debug mode; keep the spinner out of the way.
    let progress = if args.debug_synchronous {
        BenchProgress::hidden()
    } else {
        BenchProgress::new()
    };
    let mut all_results: Vec<DataPoint> = Vec::new();
    for exp in all_exps.iter_mut() {
        tracing::info!(experiment = exp.name(), description = exp.description(), "starting");
        let cb = progress.callback();
        all_results.extend(run_experiment(exp.as_mut(), &config, &ctx, Some(&cb)));
    }
    progress.finish();

    output::table::render_all_tables(&all_results);
    output::summary::print_summary(&all_results);

    if let Some(path) = &args.json_file {
        output::json::write_json(path, &all_results, &device, &tuning)?;
    }
    if let Some(path) = &args.csv_file {
        output::csv::write_csv(path, &all_results)?;
    }

    if all_results.iter().any(|dp| !dp.validated) {
        return Err("one or more experiments failed validation".to_string());
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = ForgeArgs::parse();
    setup_logging(args.debug_synchronous);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
