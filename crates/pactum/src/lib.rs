//! # Pactum
//!
//! **Contract-driven request and response validation for HTTP APIs**
//!
//! A [`Contract`](core::Contract) declares a route, the schemas of its three
//! input sources (path params, query string, body) and the shape of its
//! output. The same contract drives both ends of an exchange:
//!
//! - on the server, [`dispatch`](server::dispatch()) validates input, runs
//!   the handler, validates its result, and maps every failure to a JSON
//!   error envelope with a fixed status
//! - on the client, [`Client::call`](client::Client::call) validates input,
//!   performs the request, classifies the response, and validates the body
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pactum::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let get_user = Contract::new()
//!         .name("getUser")
//!         .route(Method::Get, "/users/:id")?
//!         .input(InputSchemas::new().params(Schema::object([("id", Schema::integer())])))?
//!         .output(Schema::object([("id", Schema::integer()), ("name", Schema::string())]))
//!         .handler(|input, _ctx| async move {
//!             Ok::<_, HandlerError>(json!({"id": input["id"], "name": "Bob"}))
//!         });
//!
//!     Server::builder()
//!         .http_addr("0.0.0.0:8080")
//!         .contract(get_user)?
//!         .build()
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error envelope
//!
//! ```text
//! 422 VALIDATION_ERROR         input rejected, data = error tree
//! 404 NOT_FOUND                HandlerError::NotFound, or no route
//! 401 UNAUTHORIZED             HandlerError::Unauthorized
//! 500 INTERNAL_ERROR           HandlerError::Message / HandlerError::Other
//! 500 OUTPUT_VALIDATION_ERROR  handler result rejected
//! ```

#![doc(html_root_url = "https://docs.rs/pactum/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use pactum_client as client;
pub use pactum_config as config;
pub use pactum_core as core;
pub use pactum_server as server;
pub use pactum_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use pactum::prelude::*;
/// ```
pub mod prelude {
    pub use pactum_core::{
        CallError, Contract, ContractRegistry, ErrorBody, ErrorCode, HandlerError,
        HandlerResult, InputSchemas, Method, Phase, RawInput, RequestContext, RequestError,
        Schema, ServerError, ValidationError,
    };

    pub use pactum_client::{CallOptions, Client, ClientError};

    pub use pactum_server::{Router, Server, ShutdownSignal};

    pub use pactum_config::{ConfigLoader, PactumConfig};
}
