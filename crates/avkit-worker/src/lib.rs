//! Job execution for avkit.
//!
//! This crate provides:
//! - Jobs and their input file handles
//! - The bounded, timeout-safe executor
//! - Age-based retention sweeping
//! - Structured job logging
//! - The `avkit` command line front-end

pub mod config;
pub mod error;
pub mod executor;
pub mod handle;
pub mod job;
pub mod logging;
pub mod retention;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{BoundedExecutor, ExecutorSnapshot};
pub use handle::MediaFileHandle;
pub use job::Job;
pub use logging::{init_tracing, JobLogger};
pub use retention::{RetentionSweeper, SweepReport};
