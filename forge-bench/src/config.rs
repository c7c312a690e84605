//! Run configuration: named profiles, size parsing and kernel tuning.

use forge_reduce::{KernelConfig, ReduceByKeyConfig, TransformConfig};
use serde::{Deserialize, Serialize};

/// Preset sizes, runs and warmup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchProfile {
    pub name: String,
    pub sizes: Vec<usize>,
    pub runs: u32,
    pub warmup: u32,
}

impl BenchProfile {
    fn new(name: &str, sizes: &[usize], runs: u32, warmup: u32) -> Self {
        Self {
            name: name.to_string(),
            sizes: sizes.to_vec(),
            runs,
            warmup,
        }
    }
}

pub const PROFILE_NAMES: [&str; 3] = ["quick", "standard", "thorough"];

/// Lookup a profile by name.
pub fn get_profile(name: &str) -> Option<BenchProfile> {
    match name {
        "quick" => Some(BenchProfile::new("quick", &[1_000_000], 3, 1)),
        "standard" => Some(BenchProfile::new("standard", &[1_000_000, 10_000_000], 10, 3)),
        "thorough" => Some(BenchProfile::new(
            "thorough",
            &[1_000_000, 10_000_000, 50_000_000],
            30,
            3,
        )),
        _ => None,
    }
}

/// Parse a human-readable element count: "1M", "2.5m", "100K", "1_000_000".
pub fn parse_size(s: &str) -> Result<usize, String> {
    let trimmed = s.trim();
    let invalid = |e: &dyn std::fmt::Display| format!("Invalid size '{}': {}", trimmed, e);

    let (digits, scale) = match trimmed.chars().last() {
        Some('M' | 'm') => (&trimmed[..trimmed.len() - 1], 1_000_000.0),
        Some('K' | 'k') => (&trimmed[..trimmed.len() - 1], 1_000.0),
        _ => {
            return trimmed
                .replace('_', "")
                .parse::<usize>()
                .map_err(|e| invalid(&e));
        }
    };

    let num: f64 = digits.replace('_', "").parse().map_err(|e| invalid(&e))?;
    if !num.is_finite() || num < 0.0 {
        return Err(format!("Invalid size '{}': must be a non-negative number", trimmed));
    }
    Ok((num * scale).round() as usize)
}

/// Parse a comma-separated list of size strings.
pub fn parse_sizes(raw: &[String]) -> Result<Vec<usize>, String> {
    raw.iter().map(|s| parse_size(s)).collect()
}

/// Kernel shapes and debug mode shared by every experiment.
#[derive(Debug, Clone, Copy)]
pub struct TuningConfig {
    pub reduce_by_key: ReduceByKeyConfig,
    pub transform: TransformConfig,
    pub debug_synchronous: bool,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            reduce_by_key: ReduceByKeyConfig::default(),
            transform: TransformConfig::default(),
            debug_synchronous: false,
        }
    }
}

impl TuningConfig {
    /// Per-block kernels take the CLI shape; the scan kernels keep their defaults.
    pub fn from_cli(block_size: u32, items_per_thread: u32, debug_synchronous: bool) -> Result<Self, String> {
        let reduce_by_key = ReduceByKeyConfig::default().with_reduce(block_size, items_per_thread);
        reduce_by_key.validate().map_err(|e| e.to_string())?;
        let transform = TransformConfig {
            kernel: KernelConfig::new(block_size, items_per_thread),
        };
        transform.validate().map_err(|e| e.to_string())?;
        Ok(Self {
            reduce_by_key,
            transform,
            debug_synchronous,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_suffixes() {
        assert_eq!(parse_size("1M").unwrap(), 1_000_000);
        assert_eq!(parse_size("10m").unwrap(), 10_000_000);
        assert_eq!(parse_size("100K").unwrap(), 100_000);
        assert_eq!(parse_size("1k").unwrap(), 1_000);
    }

    #[test]
    fn test_parse_size_fractional() {
        assert_eq!(parse_size("2.5M").unwrap(), 2_500_000);
        assert_eq!(parse_size("0.5k").unwrap(), 500);
    }

    #[test]
    fn test_parse_size_raw_and_underscored() {
        assert_eq!(parse_size("1792").unwrap(), 1_792);
        assert_eq!(parse_size("1_000_000").unwrap(), 1_000_000);
        assert_eq!(parse_size("1_000K").unwrap(), 1_000_000);
        assert_eq!(parse_size("  3M ").unwrap(), 3_000_000);
    }

    #[test]
    fn test_parse_size_invalid() {
        assert!(parse_size("abc").is_err());
        assert!(parse_size("").is_err());
        assert!(parse_size("M").is_err());
        assert!(parse_size("-1K").is_err());
    }

    #[test]
    fn test_parse_sizes_list() {
        let raw = vec!["1M".to_string(), "100K".to_string()];
        assert_eq!(parse_sizes(&raw).unwrap(), vec![1_000_000, 100_000]);
        assert!(parse_sizes(&["1M".to_string(), "x".to_string()]).is_err());
        assert!(parse_sizes(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_profiles() {
        for name in PROFILE_NAMES {
            let p = get_profile(name).unwrap();
            assert_eq!(p.name, name);
            assert!(p.sizes.windows(2).all(|w| w[0] < w[1]), "{name} sizes ascend");
            assert!(p.runs > 0);
        }
        assert_eq!(get_profile("quick").unwrap().runs, 3);
        assert!(get_profile("unknown").is_none());
    }

    #[test]
    fn test_tuning_from_cli() {
        let t = TuningConfig::from_cli(128, 4, true).unwrap();
        assert_eq!(t.reduce_by_key.items_per_block(), 512);
        assert_eq!(t.reduce_by_key.scan_items_per_block(), 1792);
        assert_eq!(t.transform.kernel.items_per_block(), 512);
        assert!(t.debug_synchronous);

        assert!(TuningConfig::from_cli(0, 4, false).is_err());
        assert!(TuningConfig::from_cli(2048, 1, false).is_err());
    }
}
