//! Named contract registry.
//!
//! A registry maps operation names to contracts so a client can call an
//! operation by name and a server can mount a whole set at once.

use indexmap::IndexMap;
use thiserror::Error;

use crate::contract::Contract;

/// Errors raised while building a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The name is already taken.
    #[error("contract '{0}' is already registered")]
    Duplicate(String),

    /// The name is empty.
    #[error("contract name must not be empty")]
    EmptyName,
}

/// An ordered set of named contracts.
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    contracts: IndexMap<String, Contract>,
}

impl ContractRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `contract` under `name`.
    ///
    /// The contract takes `name` as its operation name unless it already
    /// has one.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        mut contract: Contract,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.contracts.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        contract.set_name_if_missing(&name);
        self.contracts.insert(name, contract);
        Ok(())
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, contract: Contract) -> Result<Self, RegistryError> {
        self.register(name, contract)?;
        Ok(self)
    }

    /// Looks up a contract by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Contract> {
        self.contracts.get(name)
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    /// Iterates over the registered names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }

    /// Iterates over `(name, contract)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Contract)> {
        self.contracts.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of contracts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Returns `true` if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Method;

    #[test]
    fn test_register_and_lookup() {
        let registry = ContractRegistry::new()
            .with("listUsers", Contract::new().route(Method::Get, "/users").unwrap())
            .unwrap()
            .with("createUser", Contract::new().route(Method::Post, "/users").unwrap())
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["listUsers", "createUser"]);
        assert_eq!(registry.get("createUser").unwrap().method(), Method::Post);
        assert!(registry.get("deleteUser").is_none());
    }

    #[test]
    fn test_register_names_unnamed_contracts() {
        let mut registry = ContractRegistry::new();
        registry.register("ping", Contract::new()).unwrap();
        registry
            .register("pong", Contract::new().name("explicit"))
            .unwrap();

        assert_eq!(registry.get("ping").unwrap().operation_name(), Some("ping"));
        assert_eq!(registry.get("pong").unwrap().operation_name(), Some("explicit"));
    }

    #[test]
    fn test_register_rejects_duplicates_and_empty_names() {
        let mut registry = ContractRegistry::new();
        registry.register("a", Contract::new()).unwrap();

        assert_eq!(
            registry.register("a", Contract::new()),
            Err(RegistryError::Duplicate("a".to_string()))
        );
        assert_eq!(registry.register("", Contract::new()), Err(RegistryError::EmptyName));
        assert!(registry.contains("a"));
    }
}
