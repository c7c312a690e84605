use serde::{Deserialize, Serialize};

/// Descriptive statistics for a set of timing samples (milliseconds).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
    pub cv_percent: f64,
    pub sample_count: usize,
    pub outliers_removed: usize,
}

/// Compute statistics after dropping samples outside
/// [Q1 - 1.5*IQR, Q3 + 1.5*IQR]. With fewer than two survivors the full
/// sample set is used.
pub fn compute_stats(samples: &[f64]) -> Stats {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    match sorted.len() {
        0 => return Stats::default(),
        1 => {
            let v = sorted[0];
            return Stats {
                mean: v,
                median: v,
                p95: v,
                min: v,
                max: v,
                sample_count: 1,
                ..Stats::default()
            };
        }
        _ => {}
    }

    let q1 = percentile(&sorted, 25.0);
    let q3 = percentile(&sorted, 75.0);
    let fence = 1.5 * (q3 - q1);
    let kept: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|&v| v >= q1 - fence && v <= q3 + fence)
        .collect();
    let (data, outliers_removed) = if kept.len() >= 2 {
        (&kept, sorted.len() - kept.len())
    } else {
        (&sorted, 0)
    };

    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    Stats {
        mean,
        median: percentile(data, 50.0),
        p95: percentile(data, 95.0),
        min: data[0],
        max: data[data.len() - 1],
        stddev,
        cv_percent: if mean > 0.0 { stddev / mean * 100.0 } else { 0.0 },
        sample_count: data.len(),
        outliers_removed,
    }
}

/// Linear-interpolated percentile (0-100) of an ascending slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = pct / 100.0 * (len - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}
