//! Test modules for the visitor queue core
//!
//! Covers number formatting, gap-free allocation under concurrency, atomic
//! dual-write commits, the resilient submission pipeline with its fallback
//! ladder, live snapshot fan-out and stats aggregation.

pub mod allocation;
pub mod submission;
pub mod writing;
