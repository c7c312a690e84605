//! Transform experiment: fill from a constant input on the device vs a
//! rayon parallel fill.

use std::collections::HashMap;
use std::mem::size_of;

use forge_primitives::{throughput_meps, BenchTimer, ComputeContext, ConstantInput, SliceOutput};
use forge_reduce::Transform;

use crate::config::TuningConfig;
use crate::cpu_baselines::rayon_reduce::par_fill_with;
use crate::data_gen::DataGenerator;

use super::Experiment;

fn scale(x: u32) -> u64 {
    u64::from(x) * 3 + 1
}

pub struct TransformExperiment {
    tuning: TuningConfig,
    value: u32,
    device_output: Vec<u64>,
    cpu_output: Vec<u64>,
}

impl TransformExperiment {
    pub fn new(tuning: TuningConfig) -> Self {
        Self {
            tuning,
            value: 0,
            device_output: Vec::new(),
            cpu_output: Vec::new(),
        }
    }
}

impl Experiment for TransformExperiment {
    fn name(&self) -> &str {
        "transform"
    }

    fn description(&self) -> &str {
        "transform of a constant u32 input into u64 output"
    }

    fn setup(&mut self, _ctx: &ComputeContext, size: usize, gen: &mut DataGenerator) -> Result<(), String> {
        self.value = gen.uniform_u32(1, 1_000_000)[0];
        self.device_output = vec![0; size];
        self.cpu_output = vec![0; size];
        Ok(())
    }

    fn run_device(&mut self, ctx: &ComputeContext) -> Result<f64, String> {
        let size = self.device_output.len();
        let input = ConstantInput::new(self.value, size);
        let launcher = Transform::new(self.tuning.transform).debug_synchronous(self.tuning.debug_synchronous);

        let timer = BenchTimer::start();
        launcher
            .run(&input, &SliceOutput::new(&mut self.device_output), size, scale, ctx)
            .map_err(|e| e.to_string())?;
        Ok(timer.stop())
    }

    fn run_cpu(&mut self) -> f64 {
        let timer = BenchTimer::start();
        par_fill_with(&mut self.cpu_output, self.value, scale);
        timer.stop()
    }

    fn validate(&self) -> Result<(), String> {
        let expected = scale(self.value);
        match self.device_output.iter().position(|&v| v != expected) {
            Some(i) => Err(format!(
                "element {} is {} on the device, expected {}",
                i, self.device_output[i], expected
            )),
            None if self.cpu_output.iter().any(|&v| v != expected) => {
                Err("CPU baseline produced a wrong value".to_string())
            }
            None => Ok(()),
        }
    }

    fn metrics(&self, elapsed_ms: f64, size: usize) -> HashMap<String, f64> {
        let seconds = elapsed_ms / 1000.0;
        let bytes = (size * size_of::<u64>()) as f64;
        let mut m = HashMap::new();
        m.insert("melem_per_sec".to_string(), throughput_meps(size, elapsed_ms));
        m.insert(
            "gb_per_sec".to_string(),
            if seconds > 0.0 { bytes / seconds / 1e9 } else { 0.0 },
        );
        m
    }
}
