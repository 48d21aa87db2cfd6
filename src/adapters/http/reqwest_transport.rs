//! Implements HttpTransport with reqwest.
//!
//! Both the send and the body read race the cancellation token, so a fired token
//! always ends the call promptly.

use crate::domain::{DomainError, HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::ports::HttpTransport;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// reqwest-backed transport. Cheap to clone; shares one connection pool.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Text(text)) => builder.body(text.clone()),
            None => builder,
        }
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, DomainError> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(DomainError::Aborted),
            res = self.build(request).send() => {
                res.map_err(|e| DomainError::Transport(e.to_string()))?
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(DomainError::Aborted),
            bytes = response.bytes() => {
                bytes.map_err(|e| DomainError::Transport(format!("read body: {}", e)))?
            }
        };

        debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            len = body.len(),
            "http response"
        );

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            content_type,
            body: body.to_vec(),
        })
    }
}
