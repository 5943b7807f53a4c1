//! Request handle and parameter collection.

use axum::body::Bytes;
use axum::http::{self, header, HeaderMap};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sprig_common::{Method, Params};

use crate::error::Result;

/// The inbound request as seen by handlers.
#[derive(Debug)]
pub struct Request {
    inner: http::Request<Bytes>,
}

impl Request {
    pub fn new(inner: http::Request<Bytes>) -> Self {
        Self { inner }
    }

    /// The request verb, if it is one routes can be declared for.
    ///
    /// HTTP method tokens are case-sensitive: `get` is not `GET`.
    pub fn method(&self) -> Option<Method> {
        let token = self.inner.method().as_str();
        Method::ALL.into_iter().find(|m| m.as_str() == token)
    }

    pub fn http_method(&self) -> &http::Method {
        self.inner.method()
    }

    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    pub fn query(&self) -> Option<&str> {
        self.inner.uri().query()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// Media type without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.header(header::CONTENT_TYPE.as_str()).map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    pub fn is_json(&self) -> bool {
        self.content_type().as_deref() == Some("application/json")
    }

    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(self.inner.body())?)
    }

    /// Query and body parameters merged; body values win, and within one
    /// source the last occurrence of a key wins.
    pub fn params(&self) -> Params {
        let mut params = Params::new();
        if let Some(query) = self.query() {
            params.extend(url::form_urlencoded::parse(query.as_bytes()).into_owned());
        }

        match self.content_type().as_deref() {
            Some("application/x-www-form-urlencoded") => {
                params.extend(url::form_urlencoded::parse(self.body()).into_owned());
            }
            Some("application/json") => {
                if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(self.body()) {
                    params.extend(map.into_iter().filter_map(|(k, v)| match v {
                        Value::String(s) => Some((k, s)),
                        Value::Number(n) => Some((k, n.to_string())),
                        Value::Bool(b) => Some((k, b.to_string())),
                        _ => None,
                    }));
                }
            }
            _ => {}
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: &str, uri: &str, content_type: Option<&str>, body: &str) -> Request {
        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        Request::new(builder.body(Bytes::from(body.to_string())).unwrap())
    }

    #[test]
    fn test_query_params_last_wins() {
        let req = request("GET", "/search?q=rust&page=1&page=2&x=a%20b", None, "");
        let params = req.params();
        assert_eq!(params["q"], "rust");
        assert_eq!(params["page"], "2");
        assert_eq!(params["x"], "a b");
        assert_eq!(req.method(), Some(Method::Get));
        assert_eq!(req.path(), "/search");
    }

    #[test]
    fn test_form_body_overrides_query() {
        let req = request(
            "POST",
            "/edit?id=1&from=query",
            Some("application/x-www-form-urlencoded; charset=utf-8"),
            "id=2&title=Hello+there",
        );
        let params = req.params();
        assert_eq!(params["id"], "2");
        assert_eq!(params["from"], "query");
        assert_eq!(params["title"], "Hello there");
    }

    #[test]
    fn test_json_body_scalars() {
        let req = request(
            "PUT",
            "/item",
            Some("application/json"),
            r#"{"name":"lamp","qty":3,"ok":true,"tags":["a"]}"#,
        );
        assert!(req.is_json());
        let params = req.params();
        assert_eq!(params["name"], "lamp");
        assert_eq!(params["qty"], "3");
        assert_eq!(params["ok"], "true");
        assert!(!params.contains_key("tags"));

        let value: Value = req.json().unwrap();
        assert_eq!(value["tags"][0], "a");
    }

    #[test]
    fn test_unknown_method() {
        let req = request("TRACE", "/", None, "");
        assert_eq!(req.method(), None);
    }

    #[test]
    fn test_method_is_case_sensitive() {
        assert_eq!(request("GET", "/", None, "").method(), Some(Method::Get));
        assert_eq!(request("get", "/", None, "").method(), None);
        assert_eq!(request("Post", "/", None, "").method(), None);
    }
}
