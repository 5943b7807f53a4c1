//! Response handle populated by handlers and the dispatcher.

use axum::body::Bytes;
use axum::http::{self, header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::route::Reply;
use crate::template::Templates;

const TEXT_HTML: &str = "text/html; charset=utf-8";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// The outbound response. Finalized into an `http::Response` by the entry point.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn set_code(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Set a header; values that are not valid header text are dropped.
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> &mut Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(_) => tracing::warn!(header = %name, "Dropping invalid header value"),
        }
        self
    }

    pub fn set_content_type(&mut self, content_type: &str) -> &mut Self {
        self.set_header(header::CONTENT_TYPE, content_type)
    }

    pub fn has_content_type(&self) -> bool {
        self.headers.contains_key(header::CONTENT_TYPE)
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    pub fn text(&mut self) -> &mut Self {
        self.set_content_type(TEXT_PLAIN)
    }

    pub fn html(&mut self) -> &mut Self {
        self.set_content_type(TEXT_HTML)
    }

    /// Serialize `data` as the JSON body.
    pub fn json<T: Serialize>(&mut self, data: &T) -> Result<&mut Self> {
        let body = serde_json::to_vec(data)?;
        Ok(self.set_content_type(APPLICATION_JSON).set_body(body))
    }

    pub fn redirect_to(&mut self, location: &str) -> &mut Self {
        self.set_code(StatusCode::FOUND)
            .set_header(header::LOCATION, location)
    }

    /// Render a template into the body, as HTML unless a type is already set.
    pub fn render(&mut self, templates: &dyn Templates, name: &str, data: &Value) -> Result<&mut Self> {
        let rendered = templates.render(name, data)?;
        if !self.has_content_type() {
            self.html();
        }
        Ok(self.set_body(rendered))
    }

    /// Apply a handler's reply on top of whatever the handler already set.
    pub(crate) fn apply(&mut self, reply: Reply) -> Result<()> {
        match reply {
            Reply::Text(text) => {
                if !self.has_content_type() {
                    self.html();
                }
                self.set_body(text);
            }
            Reply::Json(value) => {
                self.json(&value)?;
            }
            Reply::Empty => {}
        }
        Ok(())
    }

    pub(crate) fn error(status: StatusCode, body: &Value) -> Self {
        let mut response = Self::new();
        response.set_code(status);
        if let Err(Error::Json(e)) = response.json(body) {
            tracing::error!(error = %e, "Failed to encode error body");
        }
        response
    }

    pub(crate) fn into_http(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.body.unwrap_or_default());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
