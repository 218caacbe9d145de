//! HTTP surface of stock-analyst
//!
//! Exposes `POST /api/v1/analyze`, which streams an analysis as server-sent
//! events, and `GET /health`. Configuration is read from the environment
//! once at startup; see [`ServerConfig`].

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::{Result, ServerError};
pub use routes::app;
pub use server::{build_state, serve};
pub use state::AppState;
