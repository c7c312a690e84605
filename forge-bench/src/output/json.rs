//! JSON output: results plus device and tuning metadata.

use std::fs;
use std::path::Path;

use serde::Serialize;

use forge_primitives::DeviceInfo;

use crate::config::TuningConfig;
use crate::harness::DataPoint;

#[derive(Serialize)]
struct JsonReport<'a> {
    device: DeviceHeader<'a>,
    tuning: TuningHeader,
    timestamp: String,
    results: &'a [DataPoint],
}

#[derive(Serialize)]
struct DeviceHeader<'a> {
    name: &'a str,
    worker_threads: usize,
    logical_cores: Option<usize>,
}

#[derive(Serialize)]
struct TuningHeader {
    block_size: u32,
    items_per_thread: u32,
    scan_block_size: u32,
    scan_items_per_thread: u32,
    debug_synchronous: bool,
}

pub fn render_json(data: &[DataPoint], device: &DeviceInfo, tuning: &TuningConfig) -> Result<String, String> {
    let config = &tuning.reduce_by_key;
    let report = JsonReport {
        device: DeviceHeader {
            name: &device.name,
            worker_threads: device.worker_threads,
            logical_cores: device.logical_cores,
        },
        tuning: TuningHeader {
            block_size: config.reduce.block_size,
            items_per_thread: config.reduce.items_per_thread,
            scan_block_size: config.scan.block_size,
            scan_items_per_thread: config.scan.items_per_thread,
            debug_synchronous: tuning.debug_synchronous,
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
        results: data,
    };
    serde_json::to_string_pretty(&report).map_err(|e| format!("JSON serialization failed: {}", e))
}

/// Write benchmark results to a JSON file, creating parent directories.
pub fn write_json(path: &str, data: &[DataPoint], device: &DeviceInfo, tuning: &TuningConfig) -> Result<(), String> {
    let json = render_json(data, device, tuning)?;
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create directory {}: {}", parent.display(), e))?;
    }
    fs::write(path, json).map_err(|e| format!("Failed to write {}: {}", path, e))?;
    println!("JSON results written to: {}", path);
    Ok(())
}
