//! Route entries and the normalization of route-declaration shorthand.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sprig_common::{Method, MethodSet};

use crate::context::Context;
use crate::error::{BoxError, Result};
use crate::pattern::Pattern;

/// Result type returned by handlers.
pub type HandlerResult<R = Reply> = std::result::Result<R, BoxError>;

/// What a handler hands back to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Sent as `text/html` unless the handler set a content type.
    Text(String),
    /// Sent as `application/json`.
    Json(Value),
    /// The handler filled in `res()` itself.
    Empty,
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Empty
    }
}

type HandlerFn = dyn Fn(&mut Context) -> HandlerResult<Reply> + Send + Sync;

/// A type-erased, shareable request handler.
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&mut Context) -> HandlerResult<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        Handler(Arc::new(move |ctx: &mut Context| {
            f(ctx).map(Into::<Reply>::into)
        }))
    }

    pub fn call(&self, ctx: &mut Context) -> HandlerResult<Reply> {
        (self.0)(ctx)
    }
}

impl PartialEq for Handler {
    /// Handlers compare by identity.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// Where a matched request is sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    /// An inline handler.
    Handler(Handler),
    /// A name resolved against the destination registry at dispatch time.
    Named(String),
}

impl Destination {
    /// Short label for logs and route listings.
    pub fn label(&self) -> String {
        match self {
            Destination::Handler(_) => "<handler>".to_string(),
            Destination::Named(name) => name.clone(),
        }
    }
}

#[doc(hidden)]
pub mod marker {
    pub struct ByName;
    pub struct ByHandler;
    pub struct ByDestination;
    pub struct ByClosure<R>(std::marker::PhantomData<R>);
}

/// Anything usable as the destination of a route: a handler closure, a
/// [`Handler`], a registered handler name, or a ready [`Destination`].
///
/// The marker parameter only keeps the implementations apart.
pub trait IntoDestination<M> {
    fn into_destination(self) -> Destination;
}

impl IntoDestination<marker::ByDestination> for Destination {
    fn into_destination(self) -> Destination {
        self
    }
}

impl IntoDestination<marker::ByHandler> for Handler {
    fn into_destination(self) -> Destination {
        Destination::Handler(self)
    }
}

impl IntoDestination<marker::ByName> for &str {
    fn into_destination(self) -> Destination {
        Destination::Named(self.to_string())
    }
}

impl IntoDestination<marker::ByName> for String {
    fn into_destination(self) -> Destination {
        Destination::Named(self)
    }
}

impl<F, R> IntoDestination<marker::ByClosure<R>> for F
where
    F: Fn(&mut Context) -> HandlerResult<R> + Send + Sync + 'static,
    R: Into<Reply>,
{
    fn into_destination(self) -> Destination {
        Destination::Handler(Handler::new(self))
    }
}

/// A path given either as text or as an already parsed pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSource {
    Text(String),
    Pattern(Pattern),
}

impl PathSource {
    fn into_pattern(self) -> Result<Pattern> {
        match self {
            PathSource::Text(text) => Pattern::parse(&text),
            PathSource::Pattern(pattern) => Ok(pattern),
        }
    }
}

impl From<&str> for PathSource {
    fn from(text: &str) -> Self {
        PathSource::Text(text.to_string())
    }
}

impl From<String> for PathSource {
    fn from(text: String) -> Self {
        PathSource::Text(text)
    }
}

impl From<Pattern> for PathSource {
    fn from(pattern: Pattern) -> Self {
        PathSource::Pattern(pattern)
    }
}

/// First argument of `route`: a bare path, or a `(methods, path)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSpec {
    pub methods: Option<MethodSet>,
    pub path: PathSource,
}

impl PathSpec {
    pub fn any(path: impl Into<PathSource>) -> Self {
        Self {
            methods: None,
            path: path.into(),
        }
    }

    pub fn with_methods(methods: impl Into<MethodSet>, path: impl Into<PathSource>) -> Self {
        Self {
            methods: Some(methods.into()),
            path: path.into(),
        }
    }
}

impl From<&str> for PathSpec {
    fn from(path: &str) -> Self {
        PathSpec::any(path)
    }
}

impl From<String> for PathSpec {
    fn from(path: String) -> Self {
        PathSpec::any(path)
    }
}

impl From<Pattern> for PathSpec {
    fn from(pattern: Pattern) -> Self {
        PathSpec::any(pattern)
    }
}

impl<P: Into<PathSource>> From<(Method, P)> for PathSpec {
    fn from((method, path): (Method, P)) -> Self {
        PathSpec::with_methods(method, path)
    }
}

impl<P: Into<PathSource>> From<(MethodSet, P)> for PathSpec {
    fn from((methods, path): (MethodSet, P)) -> Self {
        PathSpec::with_methods(methods, path)
    }
}

impl<P: Into<PathSource>, const N: usize> From<([Method; N], P)> for PathSpec {
    fn from((methods, path): ([Method; N], P)) -> Self {
        PathSpec::with_methods(methods, path)
    }
}

/// One registered route. Immutable once appended to the route table.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEntry {
    pub methods: MethodSet,
    pub pattern: Pattern,
    pub destination: Destination,
}

impl RouteEntry {
    /// Normalize declaration shorthand into a canonical entry. A path
    /// without methods answers to every verb.
    pub fn normalize(spec: PathSpec, destination: Destination) -> Result<Self> {
        Ok(Self {
            methods: spec.methods.unwrap_or(MethodSet::Any),
            pattern: spec.path.into_pattern()?,
            destination,
        })
    }

    /// Normalize for a single-verb keyword (`get`, `post`, `put`).
    ///
    /// A path that already carries methods is passed through untouched, so
    /// `get((Method::Post, "/x"), ..)` registers a POST route.
    pub fn normalize_for(method: Method, spec: PathSpec, destination: Destination) -> Result<Self> {
        let spec = match spec.methods {
            Some(ref methods) => {
                tracing::warn!(
                    keyword = %method,
                    methods = %methods,
                    path = ?spec.path,
                    "Explicit method-set overrides the keyword's verb"
                );
                spec
            }
            None => PathSpec::with_methods(method, spec.path),
        };
        Self::normalize(spec, destination)
    }

    /// Captured placeholders if this entry answers `method` on `path`.
    pub fn matches(&self, method: Method, path: &str) -> Option<sprig_common::Params> {
        if !self.methods.contains(method) {
            return None;
        }
        self.pattern.matches(path)
    }

    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            methods: self.methods.to_string(),
            pattern: self.pattern.source().to_string(),
            destination: self.destination.label(),
        }
    }
}

/// Serializable description of a route, for listings and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub methods: String,
    pub pattern: String,
    pub destination: String,
}
