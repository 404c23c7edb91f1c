//! Runtime glue that wires configuration, telemetry, and runner
//! orchestration around the dispatch engine.

pub mod config;
pub mod runner;
pub mod telemetry;
