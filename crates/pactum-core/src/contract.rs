//! Contracts.
//!
//! A [`Contract`] pairs a route with input and output schemas and,
//! optionally, the handler that serves it. The same value drives the server
//! dispatcher and the client caller.
//!
//! # Example
//!
//! ```
//! use pactum_core::{Contract, HandlerError, InputSchemas, Method, Schema};
//! use serde_json::json;
//!
//! let contract = Contract::new()
//!     .route(Method::Get, "/users/:id")?
//!     .input(InputSchemas::new().params(Schema::object([("id", Schema::integer())])))?
//!     .output(Schema::object([
//!         ("id", Schema::integer()),
//!         ("name", Schema::string()),
//!     ]))
//!     .handler(|input, _ctx| async move {
//!         Ok::<_, HandlerError>(json!({"id": input["id"], "name": "Bob"}))
//!     });
//!
//! assert_eq!(contract.method(), Method::Get);
//! assert_eq!(contract.path(), "/users/:id");
//! # Ok::<(), pactum_core::ContractError>(())
//! ```

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RequestContext;
use crate::error::ContractError;
use crate::handler::{erase, ErasedHandler, HandlerResult};
use crate::input::InputSchemas;
use crate::path::PathTemplate;
use crate::schema::Schema;

/// HTTP methods a contract can be routed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `PATCH`
    Patch,
}

impl Method {
    /// All supported methods.
    pub const ALL: [Self; 5] = [Self::Get, Self::Post, Self::Put, Self::Delete, Self::Patch];

    /// Returns the lowercase method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Patch => "patch",
        }
    }

    /// Converts to the `http` crate's method type.
    #[must_use]
    pub fn to_http(&self) -> http::Method {
        match self {
            Self::Get => http::Method::GET,
            Self::Post => http::Method::POST,
            Self::Put => http::Method::PUT,
            Self::Delete => http::Method::DELETE,
            Self::Patch => http::Method::PATCH,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

impl FromStr for Method {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ContractError::InvalidMethod {
                value: s.to_string(),
            })
    }
}

impl TryFrom<&str> for Method {
    type Error = ContractError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<String> for Method {
    type Error = ContractError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<http::Method> for Method {
    type Error = ContractError;

    fn try_from(m: http::Method) -> Result<Self, Self::Error> {
        Self::try_from(&m)
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = ContractError;

    fn try_from(m: &http::Method) -> Result<Self, Self::Error> {
        m.as_str().parse()
    }
}

/// A route: method plus path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    method: Method,
    path: PathTemplate,
}

impl Route {
    /// Returns the method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Returns the parsed path template.
    #[must_use]
    pub const fn path(&self) -> &PathTemplate {
        &self.path
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// An immutable description of one HTTP operation.
///
/// Setters consume the contract and return a new one; a built contract is
/// cheap to clone and safe to share between tasks.
#[derive(Clone)]
pub struct Contract {
    name: Option<String>,
    route: Route,
    input: InputSchemas,
    output: Option<Schema>,
    handler: Option<ErasedHandler>,
}

impl Contract {
    /// Creates a contract routed on `GET /` with no schemas and no handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            route: Route {
                method: Method::Get,
                path: PathTemplate::root(),
            },
            input: InputSchemas::new(),
            output: None,
            handler: None,
        }
    }

    /// Sets the operation name used in logs, metrics and the registry.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the route.
    ///
    /// `method` may be a [`Method`], an [`http::Method`] or a string in any
    /// case.
    ///
    /// # Errors
    ///
    /// Fails if the method is not one of GET, POST, PUT, DELETE, PATCH, or
    /// if the path is empty or does not start with `/`.
    pub fn route<M>(mut self, method: M, path: &str) -> Result<Self, ContractError>
    where
        M: TryInto<Method>,
        ContractError: From<M::Error>,
    {
        let method = method.try_into()?;
        let path = PathTemplate::parse(path)?;
        self.route = Route { method, path };
        Ok(self)
    }

    /// Replaces the input declaration.
    ///
    /// # Errors
    ///
    /// Fails if any declared source is not an object schema.
    pub fn input(mut self, input: InputSchemas) -> Result<Self, ContractError> {
        input.check_shapes()?;
        self.input = input;
        Ok(self)
    }

    /// Sets the output schema. Any shape is accepted.
    pub fn output(mut self, schema: Schema) -> Self {
        self.output = Some(schema);
        self
    }

    /// Attaches the handler.
    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Value, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handler = Some(erase(handler));
        self
    }

    /// Returns the operation name, if set.
    #[must_use]
    pub fn operation_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the operation name, or `"METHOD /path"` when unnamed.
    #[must_use]
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.route.to_string())
    }

    /// Returns the route.
    #[must_use]
    pub const fn route_def(&self) -> &Route {
        &self.route
    }

    /// Returns the route method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.route.method
    }

    /// Returns the route path as written.
    #[must_use]
    pub fn path(&self) -> &str {
        self.route.path.as_str()
    }

    /// Returns the parsed route path.
    #[must_use]
    pub const fn path_template(&self) -> &PathTemplate {
        &self.route.path
    }

    /// Returns the input declaration.
    #[must_use]
    pub const fn input_schemas(&self) -> &InputSchemas {
        &self.input
    }

    /// Returns the output schema, if declared.
    #[must_use]
    pub const fn output_schema(&self) -> Option<&Schema> {
        self.output.as_ref()
    }

    /// Returns `true` if a handler is attached.
    #[must_use]
    pub const fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Returns the attached handler.
    #[must_use]
    pub fn handler_fn(&self) -> Option<&ErasedHandler> {
        self.handler.as_ref()
    }

    pub(crate) fn set_name_if_missing(&mut self, name: &str) {
        if self.name.is_none() {
            self.name = Some(name.to_string());
        }
    }
}

impl Default for Contract {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contract")
            .field("name", &self.name)
            .field("route", &self.route)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("handler", &self.handler.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerError;
    use serde_json::json;

    #[test]
    fn test_new_defaults() {
        let contract = Contract::new();
        assert_eq!(contract.method(), Method::Get);
        assert_eq!(contract.path(), "/");
        assert!(contract.input_schemas().is_empty());
        assert!(contract.output_schema().is_none());
        assert!(!contract.has_handler());
    }

    #[test]
    fn test_route_accepts_every_method_form() {
        for method in Method::ALL {
            let c = Contract::new().route(method, "/items").unwrap();
            assert_eq!(c.method(), method);
            assert_eq!(c.path(), "/items");
        }

        let c = Contract::new().route("PoSt", "/items").unwrap();
        assert_eq!(c.method(), Method::Post);

        let c = Contract::new().route(http::Method::DELETE, "/items/:id").unwrap();
        assert_eq!(c.method(), Method::Delete);
    }

    #[test]
    fn test_route_rejects_unknown_method() {
        let err = Contract::new().route("HEAD", "/").unwrap_err();
        assert!(matches!(err, ContractError::InvalidMethod { ref value } if value == "HEAD"));
        assert!(err
            .to_string()
            .contains("invalid enum value: expected one of get, post, put, delete, patch"));

        assert!(Contract::new().route(http::Method::OPTIONS, "/").is_err());
    }

    #[test]
    fn test_route_rejects_bad_path() {
        assert_eq!(
            Contract::new().route(Method::Get, "").unwrap_err(),
            ContractError::EmptyPath
        );
        assert!(Contract::new().route(Method::Get, "users").is_err());
    }

    #[test]
    fn test_input_requires_object_schemas() {
        let err = Contract::new()
            .input(InputSchemas::new().body(Schema::string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ContractError::InvalidInputSchema { found: "string", .. }
        ));
    }

    #[test]
    fn test_input_replaces_previous_declaration() {
        let contract = Contract::new()
            .input(InputSchemas::new().query(Schema::object([("q", Schema::string())])))
            .unwrap()
            .input(InputSchemas::new().body(Schema::object([("b", Schema::string())])))
            .unwrap();

        assert!(contract.input_schemas().query_schema().is_none());
        assert!(contract.input_schemas().body_schema().is_some());
    }

    #[test]
    fn test_output_accepts_any_shape() {
        let contract = Contract::new().output(Schema::array(Schema::integer()));
        assert_eq!(contract.output_schema().map(Schema::kind_name), Some("array"));
    }

    #[tokio::test]
    async fn test_handler_is_callable() {
        let contract = Contract::new().handler(|input, _ctx| async move {
            Ok::<_, HandlerError>(json!({"got": input}))
        });

        let handler = contract.handler_fn().unwrap();
        let out = handler(json!(1), RequestContext::new(Method::Get, "/"))
            .await
            .unwrap();
        assert_eq!(out, json!({"got": 1}));
    }

    #[test]
    fn test_label_falls_back_to_route() {
        let contract = Contract::new().route(Method::Get, "/users/:id").unwrap();
        assert_eq!(contract.label(), "GET /users/:id");
        assert_eq!(contract.name("getUser").label(), "getUser");
    }

    #[test]
    fn test_method_display_and_parse() {
        assert_eq!(Method::Patch.to_string(), "PATCH");
        assert_eq!("delete".parse::<Method>().unwrap(), Method::Delete);
        assert_eq!(Method::Put.to_http(), http::Method::PUT);
    }
}
