//! # Pactum Server
//!
//! Serves contracts over HTTP.
//!
//! - [`dispatch`](dispatch::dispatch) runs one request through a contract:
//!   input validation, the handler, output validation
//! - [`Router`] maps method and path to a contract
//! - [`Server`] hosts a router on Hyper with request timeouts, body
//!   limits, and graceful shutdown
//!
//! ## Example
//!
//! ```rust,ignore
//! use pactum_server::{Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::from_registry(&contracts)?;
//!
//!     Server::builder()
//!         .http_addr("0.0.0.0:8080")
//!         .router(router)
//!         .build()
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/pactum-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod router;
pub mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use dispatch::{dispatch, DispatchOutcome, ErrorResponse, HttpResponse, ResponseBody};
pub use router::{RouteMatch, Router, RouterError};
pub use pactum_core::REQUEST_ID_HEADER;
pub use server::{parse_query, ServeError, Server, ServerBuilder};
pub use shutdown::{ConnectionTracker, ShutdownSignal};
