use http::Method;
use serde_json::{Map, Value};

/// One logical request threaded through the retry loop
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    pub endpoint: String,
    pub method: Method,
    pub token: Option<String>,
    pub body: Option<Value>,
    /// Attempts already spent before this call
    pub attempt: u32,
}

impl RequestAttempt {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: Method::GET,
            token: None,
            body: None,
            attempt: 0,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint).method(Method::POST)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn starting_at(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    /// Body to put on the wire: none for GET, `{}` when a non-GET has no body
    pub(crate) fn payload(&self) -> Option<Value> {
        if self.method == Method::GET {
            return None;
        }
        Some(
            self.body
                .clone()
                .unwrap_or_else(|| Value::Object(Map::new())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let req = RequestAttempt::new("/x");
        assert_eq!(req.endpoint, "/x");
        assert_eq!(req.method, Method::GET);
        assert!(req.token.is_none());
        assert_eq!(req.attempt, 0);
    }

    #[test]
    fn test_get_never_carries_body() {
        let req = RequestAttempt::get("/x").body(json!({"a": 1}));
        assert_eq!(req.payload(), None);
    }

    #[test]
    fn test_non_get_defaults_to_empty_object() {
        assert_eq!(RequestAttempt::post("/x").payload(), Some(json!({})));
        assert_eq!(
            RequestAttempt::new("/x")
                .method(Method::PUT)
                .body(json!({"a": 1}))
                .payload(),
            Some(json!({"a": 1}))
        );
    }
}
