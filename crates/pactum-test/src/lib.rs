//! # Pactum Test
//!
//! Test utilities for Pactum services.
//!
//! - [`TestClient`] pushes requests through a server in memory, with no
//!   socket and no port
//! - [`TestServer`] runs a real server on a loopback port, for exercising
//!   HTTP clients end to end
//! - [`TestResponse`] buffers a response and offers assertions for the
//!   failure envelope, such as [`TestResponse::assert_error_code`]
//!
//! ## Example
//!
//! ```ignore
//! use pactum_core::ErrorCode;
//! use pactum_test::TestClient;
//!
//! #[tokio::test]
//! async fn rejects_non_numeric_id() {
//!     let client = TestClient::new(router());
//!
//!     client
//!         .get("/users/abc")
//!         .send()
//!         .await
//!         .assert_error_code(ErrorCode::ValidationError)
//!         .assert_field_error("params.id");
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/pactum-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;
mod server;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
pub use server::TestServer;
