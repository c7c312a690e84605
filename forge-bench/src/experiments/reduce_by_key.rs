//! Reduce-by-key experiments: device four-pass reduction vs chunked rayon.
//!
//! Keys come in runs of a configured average length; the run length decides
//! how many runs cross block and batch boundaries. Scratch is sized with the
//! sizing call once per input size and drawn from a `BufferPool`.

use std::collections::HashMap;
use std::mem::size_of;

use forge_primitives::{throughput_meps, BenchTimer, BufferPool, ComputeContext, DeviceBuffer, SliceOutput};
use forge_reduce::ReduceByKey;

use crate::config::TuningConfig;
use crate::cpu_baselines::rayon_reduce::par_reduce_by_key;
use crate::data_gen::DataGenerator;

use super::Experiment;

/// Value types the reduce-by-key experiments sum.
pub trait BenchValue: Copy + Default + Send + Sync + std::fmt::Debug + 'static {
    fn generate(gen: &mut DataGenerator, count: usize) -> Vec<Self>;
    fn sum(a: Self, b: Self) -> Self;
    fn close_to(a: Self, b: Self) -> bool;
}

impl BenchValue for u32 {
    fn generate(gen: &mut DataGenerator, count: usize) -> Vec<Self> {
        gen.uniform_u32(count, 1_000)
    }

    fn sum(a: Self, b: Self) -> Self {
        a.wrapping_add(b)
    }

    fn close_to(a: Self, b: Self) -> bool {
        a == b
    }
}

impl BenchValue for f32 {
    fn generate(gen: &mut DataGenerator, count: usize) -> Vec<Self> {
        gen.uniform_f32(count)
    }

    fn sum(a: Self, b: Self) -> Self {
        a + b
    }

    // Device and CPU fold the same run in different groupings.
    fn close_to(a: Self, b: Self) -> bool {
        (a - b).abs() <= 1e-3 * a.abs().max(b.abs()).max(1.0)
    }
}

pub struct ReduceByKeyExperiment<V> {
    name: &'static str,
    description: &'static str,
    avg_run: usize,
    tuning: TuningConfig,
    cpu_chunks: usize,
    keys: Vec<u32>,
    values: Vec<V>,
    pool: BufferPool,
    scratch: Option<DeviceBuffer>,
    scratch_bytes: usize,
    device_unique: Vec<u32>,
    device_aggregates: Vec<V>,
    device_count: usize,
    cpu_result: (Vec<u32>, Vec<V>),
}

impl<V: BenchValue> ReduceByKeyExperiment<V> {
    pub fn new(
        name: &'static str,
        description: &'static str,
        avg_run: usize,
        tuning: TuningConfig,
        cpu_chunks: usize,
    ) -> Self {
        Self {
            name,
            description,
            avg_run,
            tuning,
            cpu_chunks,
            keys: Vec::new(),
            values: Vec::new(),
            pool: BufferPool::new(),
            scratch: None,
            scratch_bytes: 0,
            device_unique: Vec::new(),
            device_aggregates: Vec::new(),
            device_count: 0,
            cpu_result: (Vec::new(), Vec::new()),
        }
    }

    fn launcher(&self) -> ReduceByKey<'static> {
        ReduceByKey::new(self.tuning.reduce_by_key).debug_synchronous(self.tuning.debug_synchronous)
    }
}

impl<V: BenchValue> Experiment for ReduceByKeyExperiment<V> {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn setup(&mut self, ctx: &ComputeContext, size: usize, gen: &mut DataGenerator) -> Result<(), String> {
        self.keys = gen.run_keys(size, self.avg_run);
        self.values = V::generate(gen, size);
        self.device_unique = vec![0; size];
        self.device_aggregates = vec![V::default(); size];
        self.device_count = 0;

        // Sizing call: only the byte count is produced.
        let mut bytes = 0;
        let mut count = [0usize];
        self.launcher()
            .run(
                None,
                &mut bytes,
                &self.keys,
                &self.values,
                size,
                &SliceOutput::new(&mut self.device_unique),
                &SliceOutput::new(&mut self.device_aggregates),
                &SliceOutput::new(&mut count),
                V::sum,
                |a: &u32, b: &u32| a == b,
                ctx,
            )
            .map_err(|e| e.to_string())?;

        if let Some(old) = self.scratch.take() {
            self.pool.recycle(old);
        }
        self.scratch = Some(self.pool.alloc(bytes).map_err(|e| e.to_string())?);
        self.scratch_bytes = bytes;
        tracing::debug!(
            experiment = self.name,
            size,
            scratch_bytes = bytes,
            pool_peak = self.pool.peak_bytes(),
            "scratch ready"
        );
        Ok(())
    }

    fn run_device(&mut self, ctx: &ComputeContext) -> Result<f64, String> {
        let launcher = self.launcher();
        let scratch = self.scratch.as_mut().ok_or("setup not called")?;
        let mut bytes = self.scratch_bytes;
        let mut count = [0usize];

        let timer = BenchTimer::start();
        launcher
            .run(
                Some(scratch),
                &mut bytes,
                &self.keys,
                &self.values,
                self.keys.len(),
                &SliceOutput::new(&mut self.device_unique),
                &SliceOutput::new(&mut self.device_aggregates),
                &SliceOutput::new(&mut count),
                V::sum,
                |a: &u32, b: &u32| a == b,
                ctx,
            )
            .map_err(|e| e.to_string())?;
        let elapsed = timer.stop();

        self.device_count = count[0];
        Ok(elapsed)
    }

    fn run_cpu(&mut self) -> f64 {
        let timer = BenchTimer::start();
        self.cpu_result = par_reduce_by_key(&self.keys, &self.values, self.cpu_chunks, V::sum, |a, b| a == b);
        timer.stop()
    }

    fn validate(&self) -> Result<(), String> {
        let (cpu_unique, cpu_aggregates) = &self.cpu_result;
        if self.device_count != cpu_unique.len() {
            return Err(format!(
                "device run count ({}) != CPU run count ({})",
                self.device_count,
                cpu_unique.len()
            ));
        }
        let runs = self.device_count;
        if let Some(i) = (0..runs).find(|&i| self.device_unique[i] != cpu_unique[i]) {
            return Err(format!(
                "unique key {} differs: device {} vs CPU {}",
                i, self.device_unique[i], cpu_unique[i]
            ));
        }
        if let Some(i) = (0..runs).find(|&i| !V::close_to(self.device_aggregates[i], cpu_aggregates[i])) {
            return Err(format!(
                "aggregate {} differs: device {:?} vs CPU {:?}",
                i, self.device_aggregates[i], cpu_aggregates[i]
            ));
        }
        Ok(())
    }

    fn metrics(&self, elapsed_ms: f64, size: usize) -> HashMap<String, f64> {
        let pair = (size_of::<u32>() + size_of::<V>()) as f64;
        let bytes = size as f64 * pair + self.device_count as f64 * pair;
        let seconds = elapsed_ms / 1000.0;

        let mut m = HashMap::new();
        m.insert("melem_per_sec".to_string(), throughput_meps(size, elapsed_ms));
        m.insert(
            "gb_per_sec".to_string(),
            if seconds > 0.0 { bytes / seconds / 1e9 } else { 0.0 },
        );
        m.insert("runs".to_string(), self.device_count as f64);
        if self.device_count > 0 {
            m.insert("avg_run_len".to_string(), size as f64 / self.device_count as f64);
        }
        m.insert("scratch_bytes".to_string(), self.scratch_bytes as f64);
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_runs_validate_with_small_tiles() {
        let tuning = TuningConfig::from_cli(4, 2, false).unwrap();
        let mut exp = ReduceByKeyExperiment::<u32>::new("t", "t", 50, tuning, 5);
        let ctx = ComputeContext::with_threads(3).unwrap();
        let mut gen = DataGenerator::new(11);
        exp.setup(&ctx, 5_000, &mut gen).unwrap();
        assert!(exp.run_device(&ctx).unwrap() >= 0.0);
        exp.run_cpu();
        exp.validate().unwrap();

        let m = exp.metrics(1.0, 5_000);
        assert!(m["runs"] > 0.0);
        assert!((m["avg_run_len"] - 50.0).abs() < 15.0);
    }

    #[test]
    fn test_scratch_recycled_between_sizes() {
        let mut exp = ReduceByKeyExperiment::<f32>::new("t", "t", 16, TuningConfig::default(), 2);
        let ctx = ComputeContext::with_threads(2).unwrap();
        let mut gen = DataGenerator::new(12);
        exp.setup(&ctx, 10_000, &mut gen).unwrap();
        exp.setup(&ctx, 10_000, &mut gen).unwrap();
        assert_eq!(exp.pool.available_count(), 0, "same-size scratch is reused");
        exp.run_device(&ctx).unwrap();
        exp.run_cpu();
        exp.validate().unwrap();
    }

    #[test]
    fn test_run_before_setup_fails() {
        let mut exp = ReduceByKeyExperiment::<u32>::new("t", "t", 8, TuningConfig::default(), 2);
        let ctx = ComputeContext::with_threads(1).unwrap();
        assert!(exp.run_device(&ctx).is_err());
    }
}
