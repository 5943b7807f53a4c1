//! sprig: terse declarative routes and handlers for single-file web services.
//!
//! A service activates one application, declares routes, handlers and
//! attributes with the keyword functions, then calls `run()` to get an
//! [`Entry`] it can serve.

pub mod app;
pub mod attr;
pub mod config;
pub mod context;
pub mod entry;
pub mod error;
pub mod holder;
pub mod keywords;
pub mod logging;
pub mod namespace;
pub mod pattern;
pub mod request;
pub mod response;
pub mod route;
pub mod template;

pub use app::{App, Options};
pub use attr::{Attr, Memo};
pub use config::Config;
pub use context::{Context, Stash};
pub use entry::{serve, Entry};
pub use error::{BoxError, Error, Result};
pub use holder::Holder;
pub use keywords::Keywords;
pub use pattern::Pattern;
pub use request::Request;
pub use response::Response;
pub use route::{Destination, Handler, HandlerResult, PathSpec, Reply, RouteEntry};
pub use template::{SimpleTemplates, Templates};

pub use sprig_common::{Method, MethodSet, Params};

/// The keyword set and the types handlers need, for a glob import.
pub mod prelude {
    pub use crate::activate;
    pub use crate::keywords::{
        app, attr, config, debug, error, get, handler, post, put, route, run,
    };
    pub use crate::{Attr, Context, HandlerResult, Method, MethodSet, Options, Pattern, Reply};
}
