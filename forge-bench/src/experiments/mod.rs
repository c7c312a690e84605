//! Experiment trait and registry.
//!
//! Each experiment runs the same computation on the compute context and on
//! a rayon CPU baseline so the harness can time and cross-check both.

pub mod reduce_by_key;
pub mod transform;

use std::collections::HashMap;

use forge_primitives::ComputeContext;

use crate::config::TuningConfig;
use crate::data_gen::DataGenerator;

use reduce_by_key::ReduceByKeyExperiment;
use transform::TransformExperiment;

/// A benchmark experiment comparing device and CPU implementations.
pub trait Experiment {
    /// Short name used for CLI selection (e.g., "rbk-short").
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Generate inputs and size device buffers for `size` elements.
    fn setup(&mut self, ctx: &ComputeContext, size: usize, gen: &mut DataGenerator) -> Result<(), String>;

    /// Run on the compute context. Returns elapsed milliseconds.
    fn run_device(&mut self, ctx: &ComputeContext) -> Result<f64, String>;

    /// Run the CPU baseline. Returns elapsed milliseconds.
    fn run_cpu(&mut self) -> f64;

    /// Compare the last device result with the last CPU result.
    fn validate(&self) -> Result<(), String>;

    /// Throughput metrics for a device run of `elapsed_ms`.
    fn metrics(&self, elapsed_ms: f64, size: usize) -> HashMap<String, f64>;
}

/// Registry of all available experiments.
pub fn all_experiments(tuning: &TuningConfig, cpu_chunks: usize) -> Vec<Box<dyn Experiment>> {
    vec![
        Box::new(ReduceByKeyExperiment::<u32>::new(
            "rbk-short",
            "reduce_by_key u32 sum, runs averaging 8 keys",
            8,
            *tuning,
            cpu_chunks,
        )),
        Box::new(ReduceByKeyExperiment::<u32>::new(
            "rbk-long",
            "reduce_by_key u32 sum, runs averaging 4096 keys (most runs cross blocks)",
            4096,
            *tuning,
            cpu_chunks,
        )),
        Box::new(ReduceByKeyExperiment::<f32>::new(
            "rbk-f32",
            "reduce_by_key f32 sum, runs averaging 64 keys",
            64,
            *tuning,
            cpu_chunks,
        )),
        Box::new(TransformExperiment::new(*tuning)),
    ]
}
