//! CSV output, one row per data point:
//! experiment,size,device_mean_ms,device_p95_ms,cpu_mean_ms,speedup,melem_per_sec,gb_per_sec,cv_pct,validated

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::harness::DataPoint;

const HEADER: &str =
    "experiment,size,device_mean_ms,device_p95_ms,cpu_mean_ms,speedup,melem_per_sec,gb_per_sec,cv_pct,validated";

pub fn write_rows(out: &mut impl Write, data: &[DataPoint]) -> std::io::Result<()> {
    writeln!(out, "{HEADER}")?;
    for dp in data {
        let metric = |key: &str| dp.metrics.get(key).copied().unwrap_or(0.0);
        writeln!(
            out,
            "{},{},{:.4},{:.4},{:.4},{:.2},{:.2},{:.2},{:.1},{}",
            dp.experiment,
            dp.size,
            dp.device_stats.mean,
            dp.device_stats.p95,
            dp.cpu_stats.mean,
            dp.speedup,
            metric("melem_per_sec"),
            metric("gb_per_sec"),
            dp.device_stats.cv_percent,
            dp.validated,
        )?;
    }
    Ok(())
}

/// Write benchmark results to a CSV file, creating parent directories.
pub fn write_csv(path: &str, data: &[DataPoint]) -> Result<(), String> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create directory {}: {}", parent.display(), e))?;
    }
    let mut file = fs::File::create(path).map_err(|e| format!("Failed to create {}: {}", path, e))?;
    write_rows(&mut file, data).map_err(|e| format!("Write error: {}", e))?;
    println!("CSV results written to: {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Stats;

    #[test]
    fn test_rows() {
        let point = DataPoint {
            experiment: "rbk-long".to_string(),
            size: 2_000,
            device_stats: Stats {
                mean: 0.5,
                p95: 0.75,
                ..Stats::default()
            },
            cpu_stats: Stats {
                mean: 1.0,
                ..Stats::default()
            },
            speedup: 2.0,
            validated: false,
            metrics: [("melem_per_sec".to_string(), 4.0)].into_iter().collect(),
        };
        let mut buf = Vec::new();
        write_rows(&mut buf, &[point]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "rbk-long,2000,0.5000,0.7500,1.0000,2.00,4.00,0.00,0.0,false");
    }
}
