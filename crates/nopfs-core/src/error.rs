// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define the error taxonomy shared by node kinds and the session binding.
// Author: Lukas Bower

//! Errors surfaced by nodes and sessions.

use nopfs_wire::CodecError;
use thiserror::Error;

/// Errors surfaced by nopfs node operations.
///
/// Values are cloneable because command and lookup nodes memoize their
/// failures and hand the same error to every subsequent read.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NopError {
    /// Unknown child name or a failed lookup.
    #[error("not found")]
    NotFound,
    /// The node kind does not support the requested operation.
    #[error("invalid operation")]
    InvalidOperation,
    /// An external process or lookup reported failure.
    #[error("execution failed: {0}")]
    ExecutionFailure(String),
    /// The client broke the session rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl NopError {
    /// Construct a protocol violation.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolViolation(message.into())
    }

    /// Error string sent to the client in `Rerror`.
    ///
    /// Failed probes are indistinguishable from missing files on the wire.
    #[must_use]
    pub fn ename(&self) -> String {
        match self {
            Self::NotFound | Self::ExecutionFailure(_) => "file does not exist".to_owned(),
            Self::InvalidOperation => "permission denied".to_owned(),
            Self::ProtocolViolation(message) => message.clone(),
        }
    }
}

impl From<CodecError> for NopError {
    fn from(err: CodecError) -> Self {
        Self::ProtocolViolation(err.to_string())
    }
}

/// Result alias used across the crate.
pub type NopResult<T> = Result<T, NopError>;
