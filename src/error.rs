//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting {key} (required for {dialect})")]
    MissingSetting { key: &'static str, dialect: &'static str },
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid database url: {0}")]
    InvalidUrl(String),
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("table {table}: column {column} references unknown {target}")]
    DanglingReference {
        table: &'static str,
        column: &'static str,
        target: String,
    },
    #[error("table {0} has no primary key")]
    MissingPrimaryKey(&'static str),
    #[error("duplicate table: {0}")]
    DuplicateTable(&'static str),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

/// Errors inside the migration applier. Never escapes `apply_migrations`.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

/// How a response failed (or degraded). Stable tags, also used in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    HtmlErrorPage,
    AuthRedirect,
    EmptyBody,
    InvalidJson,
    NetworkError,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::HtmlErrorPage => "html-error-page",
            Classification::AuthRedirect => "auth-redirect",
            Classification::EmptyBody => "empty-body",
            Classification::InvalidJson => "invalid-json",
            Classification::NetworkError => "network-error",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },
    #[error("received an HTML page instead of JSON from {url} (status {status})")]
    HtmlErrorPage { url: String, status: u16 },
    #[error("invalid JSON from {url}: {excerpt}")]
    InvalidJson { url: String, excerpt: String },
    #[error("network: {0}")]
    Network(String),
}

impl ClientError {
    /// Classification for parse and transport failures; plain HTTP status errors have none.
    pub fn classification(&self) -> Option<Classification> {
        match self {
            ClientError::Http { .. } => None,
            ClientError::HtmlErrorPage { .. } => Some(Classification::HtmlErrorPage),
            ClientError::InvalidJson { .. } => Some(Classification::InvalidJson),
            ClientError::Network(_) => Some(Classification::NetworkError),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } | ClientError::HtmlErrorPage { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Network(e.to_string())
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Schema(_) => (StatusCode::INTERNAL_SERVER_ERROR, "schema_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
