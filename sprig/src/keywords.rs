//! The keyword set: terse route, attribute and lifecycle declarations.
//!
//! Every keyword resolves the application through a [`Holder`] at call
//! time. The free functions use the process-wide holder; [`Keywords`] binds
//! the same set to any holder.
//!
//! ```no_run
//! use sprig::prelude::*;
//!
//! fn main() -> sprig::Result<()> {
//!     activate!(Options::new())?;
//!
//!     get("/person/:name", |ctx: &mut Context| {
//!         Ok(format!("Hello {}", ctx.named("name").unwrap_or_default()))
//!     })?;
//!     post(([Method::Post], "/edit/:id"), "save")?;
//!     handler("save", |ctx: &mut Context| Ok(format!("saved {}", ctx.named("id").unwrap_or_default())))?;
//!
//!     let _entry = run()?;
//!     Ok(())
//! }
//! ```

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;
use sprig_common::Method;

use crate::app::{App, Options};
use crate::attr::Attr;
use crate::context::Context;
use crate::entry::Entry;
use crate::error::Result;
use crate::holder::Holder;
use crate::logging::APP_TARGET;
use crate::route::{Handler, HandlerResult, IntoDestination, PathSpec, Reply, RouteEntry};

/// The keyword set bound to one holder.
#[derive(Clone, Copy)]
pub struct Keywords<'h> {
    holder: &'h Holder,
}

impl Keywords<'static> {
    /// Keywords bound to the process-wide holder.
    pub fn global() -> Self {
        Keywords {
            holder: Holder::global(),
        }
    }
}

impl<'h> Keywords<'h> {
    pub fn bind(holder: &'h Holder) -> Self {
        Keywords { holder }
    }

    /// Initialize the holder's application and return the bound keywords.
    ///
    /// `base` becomes the namespace for named destinations.
    pub fn activate(holder: &'h Holder, options: Options, base: &str) -> Result<Self> {
        holder.initialize(options, base)?;
        Ok(Keywords { holder })
    }

    pub fn app(&self) -> Result<Arc<App>> {
        self.holder.current()
    }

    /// Declare a route. A bare path answers to every verb.
    pub fn route<M>(&self, spec: impl Into<PathSpec>, to: impl IntoDestination<M>) -> Result<()> {
        let entry = RouteEntry::normalize(spec.into(), to.into_destination())?;
        self.app()?.add_route(entry)
    }

    fn route_for<M>(
        &self,
        method: Method,
        spec: impl Into<PathSpec>,
        to: impl IntoDestination<M>,
    ) -> Result<()> {
        let entry = RouteEntry::normalize_for(method, spec.into(), to.into_destination())?;
        self.app()?.add_route(entry)
    }

    pub fn get<M>(&self, spec: impl Into<PathSpec>, to: impl IntoDestination<M>) -> Result<()> {
        self.route_for(Method::Get, spec, to)
    }

    pub fn post<M>(&self, spec: impl Into<PathSpec>, to: impl IntoDestination<M>) -> Result<()> {
        self.route_for(Method::Post, spec, to)
    }

    pub fn put<M>(&self, spec: impl Into<PathSpec>, to: impl IntoDestination<M>) -> Result<()> {
        self.route_for(Method::Put, spec, to)
    }

    /// Register a handler that named destinations can refer to.
    pub fn handler<F, R>(&self, name: &str, f: F) -> Result<()>
    where
        F: Fn(&mut Context) -> HandlerResult<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.app()?.register_handler(name, Handler::new(f))
    }

    /// Declare an attribute; see [`Attr::value`] and [`Attr::lazy`].
    pub fn attr(&self, name: &str, attr: Attr) -> Result<()> {
        self.app()?.declare_attr(name, attr)
    }

    /// Read an attribute.
    pub fn attr_value<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        self.app()?.attr(name)
    }

    /// A configuration value passed at activation.
    pub fn config(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.app()?.config(key).cloned())
    }

    /// Freeze the declarations into an executable entry point.
    pub fn run(&self) -> Result<Entry> {
        Ok(self.app()?.run())
    }
}

/// Activate the process-wide application with an explicit base namespace.
pub fn activate_with_base(options: Options, base: &str) -> Result<Keywords<'static>> {
    Keywords::activate(Holder::global(), options, base)
}

/// Activate the process-wide application; the calling module becomes the
/// base namespace for named destinations.
#[macro_export]
macro_rules! activate {
    () => {
        $crate::keywords::activate_with_base($crate::Options::new(), module_path!())
    };
    ($options:expr) => {
        $crate::keywords::activate_with_base($options, module_path!())
    };
}

pub fn app() -> Result<Arc<App>> {
    Keywords::global().app()
}

pub fn route<M>(spec: impl Into<PathSpec>, to: impl IntoDestination<M>) -> Result<()> {
    Keywords::global().route(spec, to)
}

pub fn get<M>(spec: impl Into<PathSpec>, to: impl IntoDestination<M>) -> Result<()> {
    Keywords::global().get(spec, to)
}

pub fn post<M>(spec: impl Into<PathSpec>, to: impl IntoDestination<M>) -> Result<()> {
    Keywords::global().post(spec, to)
}

pub fn put<M>(spec: impl Into<PathSpec>, to: impl IntoDestination<M>) -> Result<()> {
    Keywords::global().put(spec, to)
}

pub fn handler<F, R>(name: &str, f: F) -> Result<()>
where
    F: Fn(&mut Context) -> HandlerResult<R> + Send + Sync + 'static,
    R: Into<Reply>,
{
    Keywords::global().handler(name, f)
}

pub fn attr(name: &str, attr: Attr) -> Result<()> {
    Keywords::global().attr(name, attr)
}

pub fn config(key: &str) -> Result<Option<Value>> {
    Keywords::global().config(key)
}

pub fn run() -> Result<Entry> {
    Keywords::global().run()
}

pub fn debug(message: &str) {
    tracing::debug!(target: APP_TARGET, "{}", message);
}

pub fn error(message: &str) {
    tracing::error!(target: APP_TARGET, "{}", message);
}
