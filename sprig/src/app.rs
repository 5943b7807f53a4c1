//! The application instance: route table, attributes, destinations, templates.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde_json::Value;

use crate::attr::{Attr, Attributes};
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::namespace::Namespace;
use crate::route::{Handler, RouteEntry};
use crate::template::{SimpleTemplates, Templates};

/// Opaque configuration passed at activation and kept as is.
pub type Options = HashMap<String, Value>;

/// Option naming the directory of the default template engine.
pub const TEMPLATE_PATH_OPTION: &str = "template_path";
const DEFAULT_TEMPLATE_PATH: &str = "views";

#[derive(Default)]
struct RouteTable {
    entries: Vec<RouteEntry>,
    frozen: Option<Arc<[RouteEntry]>>,
}

/// The single mutable object behind a service.
///
/// Routes are appended during declaration and frozen by [`App::run`];
/// after that the table is read-only and shared by every request.
pub struct App {
    options: Options,
    routes: Mutex<RouteTable>,
    attributes: Attributes,
    namespace: Namespace,
    default_templates: Arc<SimpleTemplates>,
    templates: RwLock<Arc<dyn Templates>>,
}

impl App {
    pub fn new(options: Options, base: &str) -> Self {
        let dir = options
            .get(TEMPLATE_PATH_OPTION)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_TEMPLATE_PATH)
            .to_string();
        let default_templates = Arc::new(SimpleTemplates::new(dir));

        Self {
            options,
            routes: Mutex::new(RouteTable::default()),
            attributes: Attributes::new(),
            namespace: Namespace::new(base),
            templates: RwLock::new(default_templates.clone() as Arc<dyn Templates>),
            default_templates,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// A single configuration value.
    pub fn config(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Append a route. Insertion order is matching priority.
    pub fn add_route(&self, entry: RouteEntry) -> Result<()> {
        let mut table = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        if table.frozen.is_some() {
            return Err(Error::Frozen);
        }
        tracing::debug!(
            methods = %entry.methods,
            pattern = %entry.pattern,
            destination = %entry.destination.label(),
            "Added route"
        );
        table.entries.push(entry);
        Ok(())
    }

    /// Routes declared so far (or the frozen table once running).
    pub fn routes(&self) -> Vec<RouteEntry> {
        let table = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        match &table.frozen {
            Some(frozen) => frozen.to_vec(),
            None => table.entries.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .frozen
            .is_some()
    }

    /// Run a declaration while the table is not frozen. The table lock is
    /// held throughout, so a concurrent `run()` sees it fully applied or not
    /// at all.
    fn declare<R>(&self, apply: impl FnOnce() -> R) -> Result<R> {
        let table = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        if table.frozen.is_some() {
            return Err(Error::Frozen);
        }
        let result = apply();
        drop(table);
        Ok(result)
    }

    pub fn declare_attr(&self, name: impl Into<String>, attr: Attr) -> Result<()> {
        self.declare(|| self.attributes.declare(name, attr))
    }

    /// Read an attribute, computing it on first access.
    pub fn attr<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        self.attributes.read(self, name)
    }

    pub fn register_handler(&self, name: &str, handler: Handler) -> Result<()> {
        self.declare(|| self.namespace.register(name, handler))
    }

    pub fn templates(&self) -> Arc<dyn Templates> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the template engine.
    pub fn set_templates(&self, templates: Arc<dyn Templates>) -> Result<()> {
        self.declare(|| {
            *self.templates.write().unwrap_or_else(PoisonError::into_inner) = templates;
        })
    }

    /// Register an inline template with the default engine.
    pub fn add_template(&self, name: impl Into<String>, source: impl Into<String>) -> Result<()> {
        self.declare(|| self.default_templates.add(name, source))
    }

    /// Freeze the route table and return the executable entry point.
    ///
    /// Calling it again returns an entry sharing the same frozen table.
    pub fn run(self: &Arc<Self>) -> Entry {
        let mut table = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(frozen) = &table.frozen {
            return Entry::new(self.clone(), frozen.clone());
        }
        let frozen: Arc<[RouteEntry]> = std::mem::take(&mut table.entries).into();
        tracing::info!(routes = frozen.len(), "Route table frozen");
        table.frozen = Some(frozen.clone());
        Entry::new(self.clone(), frozen)
    }
}
