//! Shared utilities for stock-analyst
//!
//! This crate provides common functionality used across the stock-analyst workspace,
//! including logging setup and environment variable helpers used by the
//! configuration layers of the other crates.

pub mod env;
pub mod logging;

pub use env::{EnvError, env_opt, env_or, env_parse};
pub use logging::{LogFormat, init_tracing, init_tracing_with};
