//! Request headers for the backend API

use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE};

use crate::error::{ClientError, Result};

const ALLOWED_STATE: &str = "allowed-state";

/// Fixed header set plus `Authorization: Bearer <token>` when a token is given
pub fn build_headers(token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(HeaderName::from_static(ALLOWED_STATE), HeaderValue::from_static("na"));

    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ClientError::InvalidRequest("token contains invalid header characters".into()))?;
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_without_token() {
        let headers = build_headers(None).unwrap();

        assert_eq!(headers.len(), 4);
        assert_eq!(headers[ACCEPT], "application/json, text/plain, */*");
        assert_eq!(headers[ACCEPT_LANGUAGE], "en-US,en;q=0.9");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers["Allowed-State"], "na");
        assert!(!headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_headers_with_token() {
        let headers = build_headers(Some("abc.def")).unwrap();

        assert_eq!(headers.len(), 5);
        assert_eq!(headers[AUTHORIZATION], "Bearer abc.def");
        assert!(headers.contains_key(ALLOWED_STATE));
    }

    #[test]
    fn test_headers_reject_bad_token() {
        let err = build_headers(Some("bad\ntoken")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }
}
