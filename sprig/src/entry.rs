//! The executable entry point produced by `run()`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::{Request as AxumRequest, State};
use axum::http::{self, StatusCode};
use axum::response::{IntoResponse, Response as AxumResponse};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::app::App;
use crate::context::Context;
use crate::error::{error_body, Error};
use crate::logging::request_logger;
use crate::request::Request;
use crate::response::Response;
use crate::route::{Destination, RouteEntry, RouteSummary};

/// Largest request body buffered before dispatch.
pub const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// A frozen application, callable once per request.
#[derive(Clone)]
pub struct Entry {
    app: Arc<App>,
    routes: Arc<[RouteEntry]>,
}

impl Entry {
    pub(crate) fn new(app: Arc<App>, routes: Arc<[RouteEntry]>) -> Self {
        Self { app, routes }
    }

    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    pub fn summary(&self) -> Vec<RouteSummary> {
        self.routes.iter().map(RouteEntry::summary).collect()
    }

    /// Dispatch one request to the first matching route.
    pub fn call(&self, request: http::Request<Bytes>) -> http::Response<Bytes> {
        let request = Request::new(request);
        let method = request.method();
        let path = request.path().to_string();

        let matched = method.and_then(|method| {
            self.routes
                .iter()
                .find_map(|route| route.matches(method, &path).map(|named| (route, named)))
        });

        let Some((route, named)) = matched else {
            tracing::debug!(method = %request.http_method(), path = %path, "No route matched");
            return Response::error(StatusCode::NOT_FOUND, &error_body("not_found", "Not Found"))
                .into_http();
        };

        let mut ctx = Context::new(self.app.clone(), request, named);
        let span = tracing::debug_span!(
            "dispatch",
            request_id = %ctx.id(),
            pattern = %route.pattern,
            destination = %route.destination.label()
        );
        let _guard = span.enter();

        let handler = match &route.destination {
            Destination::Handler(handler) => handler.clone(),
            Destination::Named(name) => match self.app.namespace().resolve(name) {
                Ok(handler) => handler,
                Err(e) => return failure(e),
            },
        };

        match handler.call(&mut ctx) {
            Ok(reply) => {
                let mut response = ctx.into_response();
                match response.apply(reply) {
                    Ok(()) => response.into_http(),
                    Err(e) => failure(e),
                }
            }
            Err(e) => match e.downcast::<Error>() {
                Ok(e) => failure(*e),
                Err(e) => {
                    tracing::error!(error = %e, "Handler failed");
                    Response::error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        &error_body("handler", &e.to_string()),
                    )
                    .into_http()
                }
            },
        }
    }

    /// An axum router sending every request through [`Entry::call`].
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(self.clone())
            .layer(middleware::from_fn(request_logger))
            .layer(TraceLayer::new_for_http())
    }
}

fn failure(error: Error) -> http::Response<Bytes> {
    tracing::error!(error = %error, "Request failed");
    let (status, error_type) = error.status();
    Response::error(status, &error_body(error_type, &error.to_string())).into_http()
}

async fn dispatch(State(entry): State<Entry>, request: AxumRequest) -> AxumResponse {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, BODY_LIMIT).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()).into_response();
        }
    };
    let request = http::Request::from_parts(parts, body);

    match tokio::task::spawn_blocking(move || entry.call(request)).await {
        Ok(response) => response.map(Body::from),
        Err(e) => {
            tracing::error!(error = %e, "Dispatch task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serve `entry` on `addr` until the server stops.
pub async fn serve(entry: Entry, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, entry.router()).await
}
