//! Transport-neutral request/response types. No HTTP client types here.

use crate::domain::ErrorRecord;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Reads are safe to repeat; everything else may not be idempotent.
    pub fn is_read(self) -> bool {
        matches!(self, HttpMethod::Get)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, url).with_body(RequestBody::Json(body))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }
}

/// Raw response as produced by a transport adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: canonical_reason(status).to_string(),
            content_type: None,
            body: body.into(),
        }
    }

    pub fn json(status: u16, value: &Value) -> Self {
        Self {
            content_type: Some("application/json".to_string()),
            ..Self::new(status, value.to_string())
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("json"))
    }

    pub fn is_text(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("text/") || ct.contains("xml"))
    }
}

fn canonical_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

/// Successful result of one executed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No body (e.g. 204).
    Empty,
    Json(Value),
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Deserializes a structured payload. `Empty` yields `None`; a shape mismatch is a
    /// `Data` error.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<Option<T>, ErrorRecord> {
        let value = match self {
            Payload::Empty => return Ok(None),
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
            Payload::Binary(_) => {
                return Err(ErrorRecord::data(
                    "binary payload cannot be decoded as structured data",
                ));
            }
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ErrorRecord::data(format!("unexpected response shape: {}", e)))
    }

    pub fn into_json(self) -> Value {
        match self {
            Payload::Empty => Value::Null,
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
            Payload::Binary(bytes) => Value::from(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Listing {
        id: u32,
        title: String,
    }

    #[test]
    fn test_into_typed_json() {
        let payload = Payload::Json(json!({"id": 7, "title": "Villa"}));
        let listing: Option<Listing> = payload.into_typed().unwrap();
        assert_eq!(
            listing,
            Some(Listing {
                id: 7,
                title: "Villa".into()
            })
        );
    }

    #[test]
    fn test_into_typed_empty_is_none() {
        let listing: Option<Listing> = Payload::Empty.into_typed().unwrap();
        assert!(listing.is_none());
    }

    #[test]
    fn test_into_typed_shape_mismatch_is_data() {
        let err = Payload::Json(json!({"id": "x"}))
            .into_typed::<Listing>()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Data);
    }

    #[test]
    fn test_content_type_detection() {
        let json = HttpResponse::json(200, &json!({}));
        assert!(json.is_json());
        let mut text = HttpResponse::new(200, "hi");
        text.content_type = Some("text/plain; charset=utf-8".into());
        assert!(text.is_text());
        assert!(!text.is_json());
    }
}
