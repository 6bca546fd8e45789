//! Resilient response parsing. The body is inspected as text before any JSON parse, so HTML
//! pages served in place of JSON degrade to safe defaults on authentication paths.

use crate::client::routes::is_auth_path;
use crate::error::{Classification, ClientError};
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

pub const EXCERPT_LIMIT: usize = 200;

const POSITIVE_AUTH_MARKERS: [&str; 4] = [
    "logged in",
    "\"isauthenticated\":true",
    "authenticated successfully",
    "\"battletag\"",
];
const PROVIDER_MARKERS: [&str; 3] = ["battle.net", "bnet", "oauth"];

/// Start of an embedded JSON object: `{` followed by a quoted key.
static EMBEDDED_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{\s*""#).expect("valid embedded object regex"));

/// A response with its body already read as text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// What a caller gets back from a parsed response.
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    /// Parsed JSON, or data recovered from an HTML page (then carrying a `debug` object).
    Data(Value),
    /// Empty body: "no data", not an error.
    Empty,
    /// Synthesized safe default; `body.debug` says which heuristic produced it.
    Fallback {
        classification: Classification,
        body: Value,
    },
}

impl Envelope {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Envelope::Data(v) | Envelope::Fallback { body: v, .. } => Some(v),
            Envelope::Empty => None,
        }
    }

    pub fn debug(&self) -> Option<&Value> {
        self.value().and_then(|v| v.get("debug"))
    }
}

pub fn looks_like_html(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("<!doctype") || lower.contains("<html")
}

/// At most [`EXCERPT_LIMIT`] characters of `text`.
pub fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_LIMIT).collect()
}

fn debug_object(resp: &RawResponse, source: &str) -> Value {
    json!({
        "htmlDetected": true,
        "url": resp.url,
        "status": resp.status,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "source": source,
    })
}

/// First embedded JSON object in `text` that parses.
fn extract_embedded_object(text: &str) -> Option<Map<String, Value>> {
    EMBEDDED_OBJECT.find_iter(text).find_map(|m| {
        let mut stream = serde_json::Deserializer::from_str(&text[m.start()..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(obj))) => Some(obj),
            _ => None,
        }
    })
}

/// Parse a response for `request_path` (logical or concrete). Never panics on a malformed body.
pub fn parse_response(resp: &RawResponse, request_path: &str) -> Result<Envelope, ClientError> {
    let text = resp.body.as_str();

    if looks_like_html(text) {
        return parse_html(resp, request_path);
    }

    if text.trim().is_empty() {
        tracing::debug!(url = %resp.url, classification = %Classification::EmptyBody, "empty body");
        return Ok(Envelope::Empty);
    }

    serde_json::from_str(text).map(Envelope::Data).map_err(|e| {
        tracing::warn!(url = %resp.url, error = %e, "response is not valid JSON");
        ClientError::InvalidJson {
            url: resp.url.clone(),
            excerpt: excerpt(text),
        }
    })
}

fn parse_html(resp: &RawResponse, request_path: &str) -> Result<Envelope, ClientError> {
    let lower = resp.body.to_ascii_lowercase();
    let auth = is_auth_path(request_path);
    tracing::warn!(
        url = %resp.url,
        status = resp.status,
        classification = %Classification::HtmlErrorPage,
        "HTML received where JSON was expected"
    );

    if auth && POSITIVE_AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        if let Some(mut obj) = extract_embedded_object(&resp.body) {
            obj.insert("debug".into(), debug_object(resp, "html-json-extraction"));
            return Ok(Envelope::Data(Value::Object(obj)));
        }
    }

    if auth {
        let body = if request_path.contains("characters") {
            json!({
                "characters": [],
                "debug": debug_object(resp, "characters-html-fallback"),
            })
        } else {
            json!({
                "isAuthenticated": false,
                "user": null,
                "debug": debug_object(resp, "auth-html-fallback"),
            })
        };
        return Ok(Envelope::Fallback {
            classification: Classification::HtmlErrorPage,
            body,
        });
    }

    if lower.contains("login") && lower.contains("redirect") {
        return Ok(Envelope::Fallback {
            classification: Classification::AuthRedirect,
            body: json!({
                "isAuthenticated": false,
                "redirected": true,
                "debug": debug_object(resp, "login-redirect"),
            }),
        });
    }

    if PROVIDER_MARKERS.iter().any(|m| lower.contains(m)) && lower.contains("error") {
        return Ok(Envelope::Fallback {
            classification: Classification::HtmlErrorPage,
            body: json!({
                "isAuthenticated": false,
                "error": "provider_error",
                "debug": debug_object(resp, "provider-error"),
            }),
        });
    }

    Err(ClientError::HtmlErrorPage {
        url: resp.url.clone(),
        status: resp.status,
    })
}
