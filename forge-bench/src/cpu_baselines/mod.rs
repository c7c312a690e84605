//! CPU baselines for benchmark comparison and result validation.
//!
//! `sequential` is the reference every device result is checked against;
//! `rayon_reduce` is the parallel CPU competitor that gets timed.

pub mod rayon_reduce;
pub mod sequential;
