//! Result rendering: comfy-table tables, JSON, CSV, summary and progress.

pub mod csv;
pub mod json;
pub mod progress;
pub mod summary;
pub mod table;
