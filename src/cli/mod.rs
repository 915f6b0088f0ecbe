//! Command Line Interface (CLI) layer for soilscan.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for the analysis and info flows.
//! It wires user-provided options to the underlying library functionality
//! exposed via `soilscan::api`.
//!
//! If you are embedding soilscan into another application, prefer using
//! the high-level `soilscan::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
