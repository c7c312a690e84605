//! Wall-clock timing for pass instrumentation and benchmarks.

use std::time::{Duration, Instant};

/// Simple wall-clock timer.
pub struct BenchTimer {
    start: Instant,
}

impl BenchTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time in milliseconds. The timer keeps running.
    pub fn stop(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed milliseconds, restarting the timer.
    pub fn lap(&mut self) -> f64 {
        let ms = self.stop();
        self.start = Instant::now();
        ms
    }
}

/// Throughput in millions of elements per second.
pub fn throughput_meps(elements: usize, ms: f64) -> f64 {
    if ms > 0.0 {
        elements as f64 / (ms / 1000.0) / 1e6
    } else {
        0.0
    }
}
