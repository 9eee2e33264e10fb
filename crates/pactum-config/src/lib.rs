//! Typed configuration for Pactum.
//!
//! - TOML and JSON configuration files
//! - `PREFIX__SECTION__KEY` environment variable overrides
//! - `.env` files via `dotenvy`
//! - Strict validation (fails on unknown fields)
//!
//! # Example
//!
//! ```no_run
//! use pactum_config::ConfigLoader;
//!
//! # fn main() -> Result<(), pactum_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()
//!     .with_optional_file("pactum.toml")?
//!     .with_env_prefix("PACTUM")
//!     .load()?;
//!
//! println!("Server will listen on: {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//! max_body_bytes = 1048576
//!
//! [client]
//! base_url = "http://users.internal/api/"
//! timeout_ms = 5000
//! connect_timeout_ms = 1000
//!
//! [client.headers]
//! authorization = "Bearer ..."
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! ansi_enabled = false
//!
//! [metrics]
//! enabled = true
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::PactumConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use pactum_telemetry::LogFormat;
pub use schema::{ClientSettings, LoggingSettings, MetricsSettings, ServerSettings};
