//! Owner of the one application instance.

use std::sync::{Arc, OnceLock};

use crate::app::{App, Options};
use crate::error::{Error, Result};

/// Holds at most one [`App`] for its whole lifetime.
///
/// The process-wide holder behind the free keyword functions is
/// [`Holder::global`]; local holders give isolated applications.
pub struct Holder {
    app: OnceLock<Arc<App>>,
}

static GLOBAL: Holder = Holder::new();

impl Holder {
    pub const fn new() -> Self {
        Self {
            app: OnceLock::new(),
        }
    }

    pub fn global() -> &'static Holder {
        &GLOBAL
    }

    /// Construct the application. A second call fails.
    pub fn initialize(&self, options: Options, base: &str) -> Result<Arc<App>> {
        if self.app.get().is_some() {
            return Err(Error::AlreadyInitialized);
        }
        let app = Arc::new(App::new(options, base));
        self.app
            .set(app.clone())
            .map_err(|_| Error::AlreadyInitialized)?;
        tracing::info!(base = %base, "Application initialized");
        Ok(app)
    }

    /// The live application.
    pub fn current(&self) -> Result<Arc<App>> {
        self.app.get().cloned().ok_or(Error::Uninitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.app.get().is_some()
    }
}

impl Default for Holder {
    fn default() -> Self {
        Self::new()
    }
}
