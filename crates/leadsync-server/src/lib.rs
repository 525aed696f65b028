//! Leadsync Server Library
//!
//! HTTP entrypoint for the lead synchronization engine.
//!
//! # Overview
//!
//! - **Routes**: `POST /sync`, `POST /debug` and `GET /health`
//! - **Configuration**: environment-based, see [`config::Config::load`]
//! - **Middleware**: CORS and request tracing
//!
//! Credentials arrive in the request body and fall back to the server
//! environment. A failed list never fails the request; it is reported inside
//! the run report. Only a failure to read either collection produces an error
//! response (`502`).
//!
//! # Example
//!
//! ```no_run
//! use leadsync_engine::IdempotencyTracker;
//! use leadsync_server::{config::Config, routes};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let tracker = IdempotencyTracker::from_config(&config.sync)?;
//!     let app = routes::create_router(routes::AppState::new(config.sync, tracker), &config.cors);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

// Re-export commonly used types
pub use error::AppError;
pub use routes::{create_router, AppState};
