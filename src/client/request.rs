use reqwest::Method;
use serde_json::Value;

/// Per-call options for [`AuthenticatedClient::request`](super::AuthenticatedClient::request).
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub(crate) method: Method,
    pub(crate) body: Option<Value>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self::default().with_method(Method::POST).with_json(body)
    }

    pub fn put(body: Value) -> Self {
        Self::default().with_method(Method::PUT).with_json(body)
    }

    pub fn patch(body: Value) -> Self {
        Self::default().with_method(Method::PATCH).with_json(body)
    }

    pub fn delete() -> Self {
        Self::default().with_method(Method::DELETE)
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Adds a header. `Authorization` is ignored; the client sets it from the token store.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}
