//! CLI-specific functionality for the relay
//!
//! This module contains argument parsing, configuration discovery and the
//! command runner used by the `qbxml-relay` binary.

pub mod args;
pub mod commands;
pub mod config;

pub use args::{Args, Commands};
pub use commands::run;
pub use config::ConfigDiscovery;
