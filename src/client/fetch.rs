//! API client: resolve → request → (one 404 fallback) → parse, strictly in sequence.

use crate::client::parse::{excerpt, looks_like_html, parse_response, Envelope, RawResponse};
use crate::client::routes::{is_auth_path, RouteResolver};
use crate::error::ClientError;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use url::Url;

#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    /// Concrete path (with query) relative to the site root.
    pub url: String,
    pub body: Option<Value>,
}

/// Sends one request and reads the whole body as text.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: &ApiRequest) -> Result<RawResponse, ClientError>;
}

/// reqwest-backed transport against a base URL.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, base: Url) -> Self {
        HttpTransport { client, base }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, req: &ApiRequest) -> Result<RawResponse, ClientError> {
        let url = self
            .base
            .join(&req.url)
            .map_err(|e| ClientError::Network(format!("{}: {}", req.url, e)))?;
        let mut builder = self.client.request(req.method.clone(), url);
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let url = resp.url().to_string();
        let body = resp.text().await?;
        Ok(RawResponse { url, status, body })
    }
}

pub struct ApiClient<T: Transport> {
    transport: T,
    resolver: RouteResolver,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, resolver: RouteResolver) -> Self {
        ApiClient {
            transport,
            resolver,
        }
    }

    pub fn resolver(&self) -> &RouteResolver {
        &self.resolver
    }

    pub async fn get(&self, logical: &str) -> Result<Envelope, ClientError> {
        self.send(Method::GET, logical, None).await
    }

    /// Like [`get`](Self::get), but 401 means "not logged in" and yields `None`.
    pub async fn get_optional(&self, logical: &str) -> Result<Option<Envelope>, ClientError> {
        match self.get(logical).await {
            Err(ClientError::Http { status: 401, .. }) => Ok(None),
            other => other.map(Some),
        }
    }

    pub async fn send(
        &self,
        method: Method,
        logical: &str,
        body: Option<Value>,
    ) -> Result<Envelope, ClientError> {
        let mut req = ApiRequest {
            method,
            url: self.resolver.resolve(logical),
            body,
        };
        let mut resp = self.transport.send(&req).await?;

        if resp.status == 404 {
            if let Some(alt) = self.resolver.fallback_for_not_found(logical) {
                tracing::info!(from = %req.url, to = %alt, "404, retrying once on fallback route");
                req.url = alt;
                resp = self.transport.send(&req).await?;
            }
        }

        if !resp.is_success() {
            // Auth callers get a safe default rather than an error for HTML error pages.
            if is_auth_path(logical) && looks_like_html(&resp.body) {
                return parse_response(&resp, logical);
            }
            tracing::warn!(url = %resp.url, status = resp.status, "request failed");
            return Err(ClientError::Http {
                status: resp.status,
                message: error_message(&resp.body),
            });
        }
        parse_response(&resp, logical)
    }
}

/// Best-effort error message: JSON `error.message`, `message` or `error`, else the text itself.
pub fn error_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        let found = v
            .pointer("/error/message")
            .or_else(|| v.get("message"))
            .or_else(|| v.get("error"))
            .and_then(Value::as_str);
        if let Some(msg) = found {
            return msg.to_string();
        }
    }
    let text = body.trim();
    if text.is_empty() {
        "request failed".to_string()
    } else {
        excerpt(text)
    }
}
