// Library surface shared by the congelo binary, the integration tests, and
// the benchmarks.

pub mod catalog;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod emit;
pub mod naming;
pub mod orchestrator;
pub mod types;
pub mod walker;
