//! Registry resolving named route destinations to handlers.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::route::Handler;

const SEPARATOR: &str = "::";

/// Handlers registered by name under a base namespace.
///
/// Names containing `::` are absolute; any other name is taken relative to
/// the base, so with base `app` the names `login` and `app::login` denote
/// the same handler.
pub struct Namespace {
    base: String,
    handlers: RwLock<HashMap<String, Handler>>,
}

impl Namespace {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            handlers: RwLock::new(HashMap::new()),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Fully qualified form of `name`.
    pub fn qualify(&self, name: &str) -> String {
        if name.contains(SEPARATOR) || self.base.is_empty() {
            name.to_string()
        } else {
            format!("{}{}{}", self.base, SEPARATOR, name)
        }
    }

    /// Register `handler` under `name`, replacing any previous handler.
    pub fn register(&self, name: &str, handler: Handler) {
        let qualified = self.qualify(name);
        tracing::debug!(name = %qualified, "Registered handler");
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(qualified, handler);
    }

    pub fn resolve(&self, name: &str) -> Result<Handler> {
        let qualified = self.qualify(name);
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&qualified)
            .cloned()
            .ok_or(Error::UnresolvedDestination(qualified))
    }
}
