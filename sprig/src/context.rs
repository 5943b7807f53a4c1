//! Per-request context and the accessor shims handlers use.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use sprig_common::Params;
use uuid::Uuid;

use crate::app::App;
use crate::error::Result;
use crate::logging::REQUEST_ID_HEADER;
use crate::request::Request;
use crate::response::Response;

/// Unstructured per-request scratch space shared by chained handlers.
pub type Stash = HashMap<String, Value>;

/// Everything a handler can see about the request it is serving.
///
/// One context exists per in-flight request; it is never shared between
/// requests.
pub struct Context {
    id: Uuid,
    app: Arc<App>,
    request: Request,
    response: Response,
    params: Params,
    named: Params,
    stash: Stash,
}

impl Context {
    pub fn new(app: Arc<App>, request: Request, named: Params) -> Self {
        let params = request.params();
        let id = request
            .header(REQUEST_ID_HEADER)
            .and_then(|v| Uuid::parse_str(v).ok())
            .unwrap_or_else(Uuid::new_v4);
        Self {
            id,
            app,
            request,
            response: Response::new(),
            params,
            named,
            stash: Stash::new(),
        }
    }

    /// Identifier attached to this request's log events.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    /// All query and body parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// All placeholders captured by the matched route.
    pub fn named_placeholders(&self) -> &Params {
        &self.named
    }

    pub fn named(&self, key: &str) -> Option<&str> {
        self.named.get(key).map(String::as_str)
    }

    pub fn stash(&mut self) -> &mut Stash {
        &mut self.stash
    }

    pub fn stash_get(&self, key: &str) -> Option<&Value> {
        self.stash.get(key)
    }

    pub fn req(&self) -> &Request {
        &self.request
    }

    pub fn res(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Render `name` with `data` through the application's templates.
    pub fn template(&mut self, name: &str, data: &Value) -> Result<()> {
        let templates = self.app.templates();
        self.response.render(templates.as_ref(), name, data)?;
        Ok(())
    }

    pub(crate) fn into_response(self) -> Response {
        self.response
    }
}
