//! Request routing.
//!
//! Maps an incoming method and path to the contract serving it. Routes
//! come straight from the contracts' own templates, so a contract's route
//! is declared exactly once.
//!
//! # Example
//!
//! ```rust
//! use pactum_core::{Contract, HandlerError, Method};
//! use pactum_server::Router;
//! use serde_json::json;
//!
//! let get_user = Contract::new()
//!     .name("getUser")
//!     .route(Method::Get, "/users/:id")
//!     .unwrap()
//!     .handler(|_input, _ctx| async { Ok::<_, HandlerError>(json!({})) });
//!
//! let router = Router::new().with(get_user).unwrap();
//!
//! let matched = router.match_route(&http::Method::GET, "/users/123").unwrap();
//! assert_eq!(matched.contract().label(), "getUser");
//! assert_eq!(matched.params()["id"], "123");
//! ```
//!
//! When several templates match a path the one with the most literal
//! segments wins, so `/users/me` beats `/users/:id` regardless of the order
//! they were added in.

use std::sync::Arc;

use pactum_core::path::Segment;
use pactum_core::{Contract, ContractRegistry, Method};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while building a router.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// Only contracts with a handler can be served.
    #[error("contract {route} has no handler")]
    MissingHandler {
        /// The contract's label.
        route: String,
    },

    /// Another contract already serves this method and path shape.
    #[error("route {route} is already served by {existing}")]
    DuplicateRoute {
        /// The rejected route.
        route: String,
        /// Label of the contract already registered.
        existing: String,
    },
}

/// A matched route with its captured path parameters.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    contract: Arc<Contract>,
    params: Map<String, Value>,
}

impl RouteMatch {
    /// Returns the contract serving the route.
    #[must_use]
    pub fn contract(&self) -> &Arc<Contract> {
        &self.contract
    }

    /// Returns the captured path parameters as raw strings.
    #[must_use]
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Splits the match into its parts.
    #[must_use]
    pub fn into_parts(self) -> (Arc<Contract>, Map<String, Value>) {
        (self.contract, self.params)
    }
}

/// Contract router.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Arc<Contract>>,
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a router serving every contract in `registry`.
    ///
    /// # Errors
    ///
    /// Fails on the first contract without a handler or with a route
    /// already taken.
    pub fn from_registry(registry: &ContractRegistry) -> Result<Self, RouterError> {
        let mut router = Self::new();
        for (_, contract) in registry.iter() {
            router.add(contract.clone())?;
        }
        Ok(router)
    }

    /// Adds a contract.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::MissingHandler`] for a contract without a
    /// handler and [`RouterError::DuplicateRoute`] when a contract with the
    /// same method and path shape is already registered. Parameter names do
    /// not matter: `/users/:id` and `/users/:user_id` collide.
    pub fn add(&mut self, contract: Contract) -> Result<&mut Self, RouterError> {
        if !contract.has_handler() {
            return Err(RouterError::MissingHandler {
                route: contract.label(),
            });
        }

        if let Some(existing) = self.routes.iter().find(|r| same_route(r, &contract)) {
            return Err(RouterError::DuplicateRoute {
                route: contract.route_def().to_string(),
                existing: existing.label(),
            });
        }

        tracing::debug!(
            operation = %contract.label(),
            route = %contract.route_def(),
            "route registered"
        );
        self.routes.push(Arc::new(contract));
        Ok(self)
    }

    /// Adds a contract, builder style.
    ///
    /// # Errors
    ///
    /// See [`Router::add`].
    pub fn with(mut self, contract: Contract) -> Result<Self, RouterError> {
        self.add(contract)?;
        Ok(self)
    }

    /// Finds the contract serving `method` and `path`.
    ///
    /// Methods outside the supported set never match.
    #[must_use]
    pub fn match_route(&self, method: &http::Method, path: &str) -> Option<RouteMatch> {
        let method = Method::try_from(method).ok()?;

        let mut best: Option<(usize, &Arc<Contract>, Map<String, Value>)> = None;
        for contract in &self.routes {
            if contract.method() != method {
                continue;
            }
            let Some(params) = contract.path_template().matches(path) else {
                continue;
            };
            let score = literal_count(contract);
            if best.as_ref().map_or(true, |(top, _, _)| score > *top) {
                best = Some((score, contract, params));
            }
        }

        best.map(|(_, contract, params)| RouteMatch {
            contract: Arc::clone(contract),
            params,
        })
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterates over the registered contracts in registration order.
    pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
        self.routes.iter().map(AsRef::as_ref)
    }
}

fn literal_count(contract: &Contract) -> usize {
    contract
        .path_template()
        .segments()
        .iter()
        .filter(|s| matches!(s, Segment::Literal(_)))
        .count()
}

fn same_route(a: &Contract, b: &Contract) -> bool {
    if a.method() != b.method() {
        return false;
    }
    let (a, b) = (a.path_template().segments(), b.path_template().segments());
    a.len() == b.len()
        && a.iter().zip(b).all(|pair| match pair {
            (Segment::Literal(x), Segment::Literal(y)) => x == y,
            (Segment::Param(_), Segment::Param(_)) => true,
            _ => false,
        })
}
