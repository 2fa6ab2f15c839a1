//! Error types for the RPC core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RpcError>;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Unknown data array: {0}")]
    ColumnUnknown(String),

    #[error("Malformed data description: {0}")]
    SchemaMalformed(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Session {0} not found")]
    SessionNotFound(i64),

    #[error("Session {0} could not be inserted")]
    SessionInsert(i64),

    #[error("Algorithm '{0}' is not running")]
    AlgorithmNotRunning(String),
}

impl RpcError {
    /// JSON-RPC-compatible error code for the wire protocol.
    pub fn code(&self) -> i32 {
        match self {
            RpcError::MethodNotFound(_) => -32601,
            RpcError::InvalidParams(_) => -32602,
            RpcError::ColumnUnknown(_) => -32602,
            RpcError::SchemaMalformed(_) => -32603,
            RpcError::Internal(_) => -32603,
            RpcError::SessionNotFound(_) => -32001,
            RpcError::SessionInsert(_) => -32002,
            RpcError::AlgorithmNotRunning(_) => -32003,
        }
    }
}
