//! Summary with speedup verdicts:
//! >5x STRONG, 2-5x SOLID, 1-2x MARGINAL, <1x SLOWER, INVALID on a failed check.

use crate::harness::{format_size, DataPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Strong,
    Solid,
    Marginal,
    Slower,
    Invalid,
}

impl Verdict {
    pub fn of(dp: &DataPoint) -> Self {
        match dp.speedup {
            _ if !dp.validated => Verdict::Invalid,
            s if s > 5.0 => Verdict::Strong,
            s if s >= 2.0 => Verdict::Solid,
            s if s >= 1.0 => Verdict::Marginal,
            _ => Verdict::Slower,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Verdict::Strong => "STRONG",
            Verdict::Solid => "SOLID",
            Verdict::Marginal => "MARGINAL",
            Verdict::Slower => "SLOWER",
            Verdict::Invalid => "INVALID",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Verdict::Strong => "\x1b[32m",
            Verdict::Solid => "\x1b[36m",
            Verdict::Marginal => "\x1b[33m",
            Verdict::Slower => "\x1b[31m",
            Verdict::Invalid => "\x1b[1;35m",
        }
    }
}

const RESET: &str = "\x1b[0m";
const ALL: [Verdict; 5] = [
    Verdict::Strong,
    Verdict::Solid,
    Verdict::Marginal,
    Verdict::Slower,
    Verdict::Invalid,
];

pub fn print_summary(data: &[DataPoint]) {
    if data.is_empty() {
        return;
    }

    println!("\n{}", "=".repeat(70));
    println!("  SUMMARY");
    println!("{}", "=".repeat(70));
    println!(
        "  {:<20} {:>10} {:>10} {:>12}  Verdict",
        "Experiment", "Size", "Speedup", "Device (ms)"
    );
    println!("  {}", "-".repeat(66));
    for dp in data {
        let v = Verdict::of(dp);
        println!(
            "  {:<20} {:>10} {:>9.1}x {:>12.3}  {}{}{}",
            dp.experiment,
            format_size(dp.size),
            dp.speedup,
            dp.device_stats.mean,
            v.color(),
            v.label(),
            RESET
        );
    }
    println!("{}", "=".repeat(70));

    let counts: Vec<String> = ALL
        .iter()
        .map(|&v| (v, data.iter().filter(|dp| Verdict::of(dp) == v).count()))
        .filter(|&(_, n)| n > 0)
        .map(|(v, n)| format!("{} {}", n, v.label()))
        .collect();
    println!("  {}", counts.join(", "));
}
