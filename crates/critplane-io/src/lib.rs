//! File handling for critplane runs.
//!
//! This crate provides:
//! - **JSON job files**: configuration plus channel definitions (explicit
//!   tensors, pressure/temperature stress tables, synthetic sine loads)
//! - **Job execution** through the critical-plane calculator
//! - **JSON damage reports** with per-channel damage surfaces and critical planes

mod error;
mod job;
mod report;

pub use error::{IoError, Result};
pub use job::{run_job, ChannelSource, ChannelDefinition, ComponentTables, Job};
pub use report::{load_report, save_report, ChannelReport, DamageReport, REPORT_SCHEMA_VERSION};
