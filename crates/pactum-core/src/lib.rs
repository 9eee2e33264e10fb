//! # Pactum Core
//!
//! Contract types and the validation engine shared by the Pactum server and
//! client.
//!
//! - [`Schema`] - closed set of value schemas with a single `validate` entry point
//! - [`Contract`] - route, input and output schemas, and an optional handler
//! - [`merge_input`] - validates `params`, `query` and `body` and merges them
//! - [`ContractRegistry`] - name to contract lookup
//! - [`CallError`], [`ValidationError`], [`ServerError`] - error taxonomy
//!
//! ```
//! use pactum_core::{merge_input, InputSchemas, RawInput, Schema};
//! use serde_json::json;
//!
//! let schemas = InputSchemas::new()
//!     .query(Schema::object([("page", Schema::integer().default(1))]));
//!
//! let merged = merge_input(&schemas, &RawInput::new()).unwrap();
//! assert_eq!(merged, json!({"page": 1}));
//! ```

#![doc(html_root_url = "https://docs.rs/pactum-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
pub mod contract;
pub mod error;
pub mod handler;
pub mod input;
pub mod path;
pub mod registry;
pub mod schema;

pub use context::{RequestContext, RequestId, REQUEST_ID_HEADER};
pub use contract::{Contract, Method, Route};
pub use error::{
    CallError, ContractError, ErrorBody, ErrorCode, Phase, RequestError, RequestErrorKind,
    ServerError, ValidationError,
};
pub use handler::{ErasedHandler, HandlerError, HandlerResult};
pub use input::{merge_input, validate_sources, InputSchemas, InputSource, RawInput, ValidatedInput};
pub use path::PathTemplate;
pub use registry::{ContractRegistry, RegistryError};
pub use schema::{FieldError, FieldErrors, PathSegment, Schema, SchemaKind, ValidateOptions};
