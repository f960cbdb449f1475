//! Concrete transfer executors.
//!
//! The queue works with any [`TransferExecutor`](crate::executor::TransferExecutor);
//! this module provides the local directory store used by the CLI.

mod local;

pub use local::LocalDirExecutor;
