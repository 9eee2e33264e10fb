//! Handler types.
//!
//! A handler is an async function of exactly two arguments: the merged,
//! validated input and the [`RequestContext`]. Its `Ok` value is checked
//! against the contract's output schema; its `Err` value is mapped to an
//! HTTP failure by the dispatcher.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::context::RequestContext;

/// Domain failure reported by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerError {
    /// The requested resource does not exist. Served as 404.
    NotFound,
    /// The caller may not perform this operation. Served as 401.
    Unauthorized,
    /// Any other failure, with a message shown to the caller. Served as 500.
    Message(String),
    /// A failure with a payload that is not shown to the caller. Served as
    /// 500 with a generic message.
    Other(Value),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::Unauthorized => f.write_str("unauthorized"),
            Self::Message(msg) => f.write_str(msg),
            Self::Other(value) => write!(f, "handler failed: {value}"),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<String> for HandlerError {
    fn from(msg: String) -> Self {
        Self::Message(msg)
    }
}

impl From<&str> for HandlerError {
    fn from(msg: &str) -> Self {
        Self::Message(msg.to_string())
    }
}

/// Result type for handlers.
pub type HandlerResult = Result<Value, HandlerError>;

/// The boxed future an erased handler returns.
pub type BoxedHandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// A type-erased handler stored in a contract.
pub type ErasedHandler =
    Arc<dyn Fn(Value, RequestContext) -> BoxedHandlerFuture + Send + Sync + 'static>;

/// Erases a two-argument async function into an [`ErasedHandler`].
pub fn erase<F, Fut>(handler: F) -> ErasedHandler
where
    F: Fn(Value, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |input: Value, ctx: RequestContext| {
        Box::pin(handler(input, ctx)) as BoxedHandlerFuture
    })
}

/// Adapts a handler working on Rust types into one working on JSON.
///
/// The validated input is deserialized into `Req` and the `Res` value is
/// serialized back to JSON. A mismatch between the input schema and `Req`
/// surfaces as [`HandlerError::Message`].
///
/// ```
/// use pactum_core::handler::{typed, HandlerError};
/// use pactum_core::{Contract, RequestContext};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Deserialize)]
/// struct GetUser { id: i64 }
///
/// #[derive(Serialize)]
/// struct User { id: i64, name: String }
///
/// let contract = Contract::new().handler(typed(|req: GetUser, _ctx: RequestContext| async move {
///     Ok::<_, HandlerError>(User { id: req.id, name: "Bob".into() })
/// }));
/// assert!(contract.has_handler());
/// ```
pub fn typed<F, Fut, Req, Res>(
    handler: F,
) -> impl Fn(Value, RequestContext) -> BoxedHandlerFuture + Send + Sync + 'static
where
    F: Fn(Req, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Res, HandlerError>> + Send + 'static,
    Req: DeserializeOwned + Send + 'static,
    Res: Serialize + Send + 'static,
{
    let handler = Arc::new(handler);
    move |input: Value, ctx: RequestContext| {
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            let request: Req = serde_json::from_value(input)
                .map_err(|e| HandlerError::Message(format!("invalid handler input: {e}")))?;
            let response = handler(request, ctx).await?;
            serde_json::to_value(response)
                .map_err(|e| HandlerError::Message(format!("unserializable handler output: {e}")))
        }) as BoxedHandlerFuture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Method;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Greet {
        name: String,
    }

    #[derive(Debug, Serialize)]
    struct Greeting {
        greeting: String,
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Method::Post, "/greet")
    }

    #[test]
    fn test_erased_handler_roundtrip() {
        let handler = erase(|input: Value, _ctx| async move {
            Ok::<_, HandlerError>(json!({"echo": input}))
        });

        let out = tokio_test::block_on(handler(json!({"a": 1}), ctx())).unwrap();
        assert_eq!(out, json!({"echo": {"a": 1}}));
    }

    #[tokio::test]
    async fn test_typed_handler() {
        let handler = erase(typed(|req: Greet, _ctx| async move {
            Ok::<_, HandlerError>(Greeting {
                greeting: format!("Hello, {}!", req.name),
            })
        }));

        let out = handler(json!({"name": "World"}), ctx()).await.unwrap();
        assert_eq!(out, json!({"greeting": "Hello, World!"}));
    }

    #[tokio::test]
    async fn test_typed_handler_input_mismatch() {
        let handler = erase(typed(|req: Greet, _ctx| async move {
            Ok::<_, HandlerError>(req.name)
        }));

        let err = handler(json!({"other": 1}), ctx()).await.unwrap_err();
        assert!(matches!(err, HandlerError::Message(m) if m.starts_with("invalid handler input")));
    }

    #[test]
    fn test_handler_error_from_str() {
        assert_eq!(HandlerError::from("boom"), HandlerError::Message("boom".into()));
        assert_eq!(HandlerError::NotFound.to_string(), "not found");
    }
}
