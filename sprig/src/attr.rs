//! Application attributes: named values, either eager or computed on first read.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use crate::app::App;
use crate::error::{Error, Result};

type Init<T> = Box<dyn FnOnce(&App) -> T + Send>;

/// A value cell holding either an uncomputed initializer or its cached result.
pub struct Memo<T> {
    value: OnceLock<T>,
    init: Mutex<Option<Init<T>>>,
}

impl<T> Memo<T> {
    pub fn ready(value: T) -> Self {
        Self {
            value: OnceLock::from(value),
            init: Mutex::new(None),
        }
    }

    pub fn lazy(init: impl FnOnce(&App) -> T + Send + 'static) -> Self {
        Self {
            value: OnceLock::new(),
            init: Mutex::new(Some(Box::new(init))),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }

    /// Compute the value at most once; concurrent callers wait for the first.
    ///
    /// Returns `None` when an earlier initializer panicked: the cell is spent
    /// and stays unresolved. An initializer that reads its own cell deadlocks.
    pub fn resolve(&self, app: &App) -> Option<&T> {
        if let Some(value) = self.value.get() {
            return Some(value);
        }
        let mut init = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = self.value.get() {
            return Some(value);
        }
        let value = init.take()?(app);
        drop(init);
        Some(self.value.get_or_init(|| value))
    }
}

type Erased = Arc<dyn Any + Send + Sync>;

/// An attribute declaration as passed to `attr`.
pub struct Attr(Memo<Erased>);

impl Attr {
    /// Store `value` as is.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Attr(Memo::ready(Arc::new(value)))
    }

    /// Compute the value on first read, with the application as argument.
    pub fn lazy<T, F>(init: F) -> Self
    where
        T: Any + Send + Sync,
        F: FnOnce(&App) -> T + Send + 'static,
    {
        Attr(Memo::lazy(move |app: &App| Arc::new(init(app)) as Erased))
    }

    pub fn is_lazy(&self) -> bool {
        !self.0.is_resolved()
    }
}

/// Named attributes of an application. Re-declaring a name replaces it.
#[derive(Default)]
pub struct Attributes {
    cells: RwLock<HashMap<String, Arc<Memo<Erased>>>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&self, name: impl Into<String>, attr: Attr) {
        let name = name.into();
        tracing::debug!(attribute = %name, lazy = attr.is_lazy(), "Declared attribute");
        self.cells
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Arc::new(attr.0));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Read an attribute, running its initializer if this is the first read.
    pub fn read<T: Any + Send + Sync>(&self, app: &App, name: &str) -> Result<Arc<T>> {
        // The lock is released before resolving so initializers can read
        // other attributes.
        let cell = self
            .cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))?;

        cell.resolve(app)
            .ok_or_else(|| Error::AttributeUnavailable(name.to_string()))?
            .clone()
            .downcast::<T>()
            .map_err(|_| Error::AttributeType {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }
}
