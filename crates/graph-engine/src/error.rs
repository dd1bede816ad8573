//! Errors raised at the service boundary.
//!
//! The graph store itself never fails; everything here concerns startup and
//! transport.

use std::net::AddrParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid listen address {value:?}: {source}")]
    InvalidAddress {
        value: String,
        #[source]
        source: AddrParseError,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
