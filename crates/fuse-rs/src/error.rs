use std::io;

use thiserror::Error;

/// Failure while creating a compiler backend, building a module, or resolving a
/// primary entry point.
///
/// These are never cached: a failed compilation leaves no cache entry behind and the
/// next request for the same signature compiles again.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("no compiler registered for backend '{0}'")]
    UnknownBackend(String),
    #[error("backend compilation failed: {message}")]
    Backend { message: String },
    #[error("symbol '{symbol}' not found in compiled module")]
    MissingSymbol { symbol: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CompileError {
    pub fn backend(message: impl Into<String>) -> Self {
        CompileError::Backend {
            message: message.into(),
        }
    }

    pub fn missing_symbol(symbol: impl Into<String>) -> Self {
        CompileError::MissingSymbol {
            symbol: symbol.into(),
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
