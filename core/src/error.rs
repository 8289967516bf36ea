//! Error types for the AGCOD client.
//!
//! # Design
//! Failures are split by *when* they can happen. `ConfigError` is raised while
//! building a `Config`; `ValidationError` and `SigningError` are returned
//! synchronously by the facade before anything touches the network;
//! `ResponseError` only surfaces once the pending response resolves. `Error`
//! unifies all of them for callers who just want `?`.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::http::RequestParams;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Raised while constructing or loading a `Config`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no partner ID supplied")]
    MissingPartnerId,

    #[error("invalid credentials supplied: access key id and secret access key are required")]
    MissingCredentials,

    #[error("country {country} is listed under both {first} and {second}")]
    OverlappingCountry {
        country: String,
        first: String,
        second: String,
    },

    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Caller input rejected before any request is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no configured region serves country {0}")]
    UnsupportedCountry(String),

    #[error("region must be one of: {}", valid.join(", "))]
    UnsupportedRegion { region: String, valid: Vec<String> },

    #[error("amount must be a non-negative number, got {0}")]
    InvalidAmount(f64),

    #[error("no currency available for country {0}")]
    NoCurrencyForCountry(String),
}

/// The request could not be signed.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("request body could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    /// HMAC-SHA256 accepts keys of any length, so this is not produced in
    /// practice.
    #[error("signing key rejected by HMAC")]
    InvalidKey,

    #[error("no endpoint configured for region {0}")]
    UnknownRegion(String),
}

/// The HTTP exchange itself failed (DNS, connect, TLS, I/O).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP transport failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("transport task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("UreqTransport must be polled inside a Tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// A non-200 answer from the service.
///
/// Carries the request that produced it, the status code, and the decoded
/// error body. AGCOD error bodies are flat JSON objects (`errorCode`,
/// `errorType`, `message`), so their fields are exposed by name.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub request: RequestParams,
    pub status_code: u16,
    pub body: Value,
}

impl ApiError {
    /// Look up a top-level field of the error body.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.as_object().and_then(|fields| fields.get(name))
    }

    pub fn error_code(&self) -> Option<&str> {
        self.field("errorCode").and_then(Value::as_str)
    }

    pub fn error_type(&self) -> Option<&str> {
        self.field("errorType").and_then(Value::as_str)
    }

    pub fn message(&self) -> Option<&str> {
        self.field("message").and_then(Value::as_str)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AGCOD returned HTTP {}", self.status_code)?;
        if let Some(code) = self.error_code() {
            write!(f, " ({code})")?;
        }
        if let Some(message) = self.message() {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Outcome of a dispatched request that did not yield a success body.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Api(Box<ApiError>),

    #[error("response body is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ResponseError {
    /// The service error, if the request reached AGCOD and was refused.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            ResponseError::Api(err) => Some(&**err),
            _ => None,
        }
    }
}

impl From<ApiError> for ResponseError {
    fn from(err: ApiError) -> Self {
        ResponseError::Api(Box::new(err))
    }
}

/// Any failure produced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Response(#[from] ResponseError),
}
