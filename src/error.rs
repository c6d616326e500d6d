//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {path}: {message}")]
    Load { path: PathBuf, message: String },
    #[error("config parse: {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("template load: {path}: {message}")]
    Template { path: PathBuf, message: String },
    #[error("validation: endpoint '{endpoint}': {message}")]
    Validation { endpoint: String, message: String },
    #[error("duplicate route: {method} {uri} (endpoints '{first}' and '{second}')")]
    DuplicateRoute {
        method: String,
        uri: String,
        first: String,
        second: String,
    },
    #[error("duplicate endpoint name: {0}")]
    DuplicateEndpoint(String),
    #[error("settings: {0}")]
    Settings(String),
}

/// A scripted expression failed, or produced a value that cannot be sent to the backend.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("expression at {path}: {message}")]
pub struct ExpressionError {
    /// Location of the failing node, e.g. `condition.conditions[1].value`.
    pub path: String,
    pub expression: Option<String>,
    pub message: String,
}

impl ExpressionError {
    pub fn new(
        path: impl Into<String>,
        expression: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        ExpressionError {
            path: path.into(),
            expression: expression.map(str::to_string),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("value required")]
    ValueRequired,
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("connection pool exhausted")]
    PoolExhausted,
    #[error("dial timeout")]
    DialTimeout,
    #[error("dial: {0}")]
    Dial(String),
    #[error("pool: {0}")]
    Pool(String),
    #[error("rpc: {0}")]
    Rpc(#[from] tonic::Status),
    #[error("query deadline exceeded")]
    Timeout,
}

#[derive(Error, Debug)]
#[error("render template '{template}': {message}")]
pub struct RenderError {
    pub template: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("query backend: {0}")]
    Backend(#[from] QueryError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Expression(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) | AppError::Backend(_) | AppError::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::Expression(_) => "expression_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::Backend(QueryError::PoolExhausted) => "pool_exhausted",
            AppError::Backend(QueryError::DialTimeout) => "dial_timeout",
            AppError::Backend(_) => "query_backend_error",
            AppError::Render(_) => "render_error",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Expression(e) => Some(serde_json::json!({
                "path": e.path,
                "expression": e.expression,
            })),
            _ => None,
        }
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
        let status = self.status();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        (status, Json(body)).into_response()
    }
}
