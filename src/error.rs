//! Error types for transaction decoding, script execution and validation

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Script execution failed: {0}")]
    ScriptExecution(String),

    #[error("Stack underflow executing {0}")]
    StackUnderflow(&'static str),

    #[error("Verify failed: {0}")]
    VerifyFailed(&'static str),

    #[error("Opcode not implemented: 0x{0:02x}")]
    NotImplemented(u8),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Missing prevout for input {0}")]
    MissingPrevout(usize),

    #[error("Invalid multisig: {0}")]
    InvalidMultisig(String),

    #[error("Address error: {0}")]
    Address(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<hex::FromHexError> for EngineError {
    fn from(err: hex::FromHexError) -> Self {
        EngineError::Decode(format!("invalid hex: {}", err))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
