//! Backend worker: owns the tokio runtime and the client workflow.

pub mod commands;
pub mod preview;
pub mod runtime;
