use clap::Parser;

/// Benchmark harness for device-wide reduce-by-key and transform
#[derive(Parser, Debug)]
#[command(name = "forge-bench", version, about)]
pub struct ForgeArgs {
    /// Experiment names to run (e.g., rbk-short rbk-long transform).
    /// Use "all" to run the full suite.
    #[arg(value_name = "EXPERIMENTS")]
    pub experiments: Vec<String>,

    /// Element sizes to benchmark (e.g., 1M, 10M, 100K, 1000000)
    #[arg(long, value_delimiter = ',')]
    pub sizes: Option<Vec<String>>,

    /// Number of measured runs per size
    #[arg(long, default_value_t = 10)]
    pub runs: u32,

    /// Number of warmup runs before measurement
    #[arg(long, default_value_t = 3)]
    pub warmup: u32,

    /// Benchmark profile: quick (1M/3/1), standard (1M+10M/10/3), thorough (1M+10M+50M/30/3)
    #[arg(long)]
    pub profile: Option<String>,

    /// Worker threads for the compute context (default: one per core)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Threads per threadgroup for the per-block kernels
    #[arg(long, default_value_t = 256)]
    pub block_size: u32,

    /// Items per thread for the per-block kernels
    #[arg(long, default_value_t = 7)]
    pub items_per_thread: u32,

    /// Check device status after every pass and log pass timings
    #[arg(long)]
    pub debug_synchronous: bool,

    /// Write JSON results to file
    #[arg(long)]
    pub json_file: Option<String>,

    /// Write CSV results to file
    #[arg(long)]
    pub csv_file: Option<String>,
}

impl ForgeArgs {
    /// Returns true if this is an "all" suite run.
    pub fn is_all_suite(&self) -> bool {
        self.experiments.is_empty()
            || self.experiments.len() == 1 && self.experiments[0].eq_ignore_ascii_case("all")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = ForgeArgs::parse_from(["forge-bench"]);
        assert!(args.is_all_suite());
        assert_eq!(args.runs, 10);
        assert_eq!(args.warmup, 3);
        assert_eq!((args.block_size, args.items_per_thread), (256, 7));
        assert!(!args.debug_synchronous);
    }

    #[test]
    fn test_sizes_and_tuning() {
        let args = ForgeArgs::parse_from([
            "forge-bench",
            "rbk-short",
            "--sizes",
            "1M,100K",
            "--block-size",
            "128",
            "--items-per-thread",
            "4",
            "--threads",
            "2",
            "--debug-synchronous",
        ]);
        assert!(!args.is_all_suite());
        assert_eq!(args.experiments, vec!["rbk-short"]);
        assert_eq!(args.sizes, Some(vec!["1M".to_string(), "100K".to_string()]));
        assert_eq!((args.block_size, args.items_per_thread), (128, 4));
        assert_eq!(args.threads, Some(2));
        assert!(args.debug_synchronous);
    }
}
