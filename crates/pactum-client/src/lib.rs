//! # Pactum Client
//!
//! Calls contracts hosted by a remote Pactum server.
//!
//! A call validates its input before sending anything, renders the path
//! from validated params, sends query and body, and validates whatever
//! comes back against the contract's output schema. Failures surface as
//! [`CallError`]:
//!
//! | Variant | When |
//! |---------|------|
//! | `Validation` (phase `input`) | input rejected, nothing sent |
//! | `Request` | transport failure or timeout |
//! | `Server` | any non-2xx response |
//! | `Validation` (phase `output`) | response body rejected |
//!
//! ## Example
//!
//! ```rust,ignore
//! use pactum_client::{Client, RawInput};
//!
//! let client = Client::builder()
//!     .base_url("http://users.internal")
//!     .header("x-api-key", "secret")
//!     .build()?;
//!
//! let mut params = serde_json::Map::new();
//! params.insert("id".into(), "123".into());
//! let user = client.call(&get_user, RawInput::new().with_params(params)).await?;
//! ```

#![doc(html_root_url = "https://docs.rs/pactum-client/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;

pub use client::{CallOptions, Client, ClientBuilder};
pub use error::{ClientError, ClientResult};
pub use pactum_core::{
    CallError, Phase, RawInput, RequestError, RequestErrorKind, ServerError, ValidationError,
};
