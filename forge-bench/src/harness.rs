//! Measurement harness: setup, validation, warmup and measured loops for
//! one experiment across every configured size.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use forge_primitives::ComputeContext;

use crate::data_gen::DataGenerator;
use crate::experiments::Experiment;
use crate::stats::{compute_stats, Stats};

/// One experiment measured at one size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPoint {
    pub experiment: String,
    pub size: usize,
    pub device_stats: Stats,
    pub cpu_stats: Stats,
    pub speedup: f64,
    pub validated: bool,
    pub metrics: HashMap<String, f64>,
}

pub struct BenchConfig {
    pub sizes: Vec<usize>,
    pub runs: u32,
    pub warmup: u32,
}

/// Run an experiment across all configured sizes.
///
/// A size whose setup or device run fails is skipped with a warning; a
/// failed validation is reported on the data point.
pub fn run_experiment(
    exp: &mut dyn Experiment,
    config: &BenchConfig,
    ctx: &ComputeContext,
    progress_cb: Option<&dyn Fn(&str)>,
) -> Vec<DataPoint> {
    let mut results = Vec::new();
    let mut gen = DataGenerator::new(42);
    let report = |msg: String| {
        if let Some(cb) = progress_cb {
            cb(&msg);
        }
    };

    for &size in &config.sizes {
        let label = format!("{} @ {}", exp.name(), format_size(size));
        report(format!("{label}: setup"));
        match measure(exp, config, ctx, size, &mut gen, &label, &report) {
            Ok(point) => {
                report(format!("{label}: done (speedup={:.1}x)", point.speedup));
                results.push(point);
            }
            Err(e) => {
                tracing::warn!(experiment = exp.name(), size, error = %e, "size skipped");
                ctx.clear_status();
            }
        }
    }

    results
}

fn measure(
    exp: &mut dyn Experiment,
    config: &BenchConfig,
    ctx: &ComputeContext,
    size: usize,
    gen: &mut DataGenerator,
    label: &str,
    report: &dyn Fn(String),
) -> Result<DataPoint, String> {
    exp.setup(ctx, size, gen)?;

    exp.run_device(ctx)?;
    exp.run_cpu();
    let validated = match exp.validate() {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(experiment = exp.name(), size, "validation failed: {e}");
            false
        }
    };

    report(format!("{label}: warmup ({} runs)", config.warmup));
    for _ in 0..config.warmup {
        exp.run_device(ctx)?;
    }

    report(format!("{label}: measuring device ({} runs)", config.runs));
    let device_times = (0..config.runs)
        .map(|_| exp.run_device(ctx))
        .collect::<Result<Vec<f64>, String>>()?;

    report(format!("{label}: measuring CPU ({} runs)", config.runs));
    let cpu_times: Vec<f64> = (0..config.runs).map(|_| exp.run_cpu()).collect();

    let device_stats = compute_stats(&device_times);
    let cpu_stats = compute_stats(&cpu_times);
    let speedup = if device_stats.mean > 0.0 {
        cpu_stats.mean / device_stats.mean
    } else {
        0.0
    };

    Ok(DataPoint {
        experiment: exp.name().to_string(),
        size,
        metrics: exp.metrics(device_stats.mean, size),
        device_stats,
        cpu_stats,
        speedup,
        validated,
    })
}

/// Format a size for display (e.g., 1000000 -> "1M").
pub fn format_size(size: usize) -> String {
    if size >= 1_000_000 && size % 1_000_000 == 0 {
        format!("{}M", size / 1_000_000)
    } else if size >= 1_000 && size % 1_000 == 0 {
        format!("{}K", size / 1_000)
    } else {
        size.to_string()
    }
}
