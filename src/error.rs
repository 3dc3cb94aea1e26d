use std::{io, path::PathBuf, sync::Arc};

use alloy::transports::{RpcError, TransportErrorKind};
use thiserror::Error;

use crate::types::BlockHeight;

/// Errors returned by a [`LedgerReader`](crate::LedgerReader).
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    /// The underlying RPC transport returned an error.
    #[error("RPC error: {0}")]
    Rpc(Arc<RpcError<TransportErrorKind>>),

    /// A timeout elapsed while waiting for an RPC response.
    #[error("Operation timed out")]
    Timeout,

    /// `from` was greater than `to`.
    #[error("Invalid block range [{from}, {to}]")]
    InvalidRange { from: BlockHeight, to: BlockHeight },

    /// The endpoint refused to serve a log query over this span.
    #[error("Block range [{from}, {to}] rejected as too large")]
    RangeTooLarge { from: BlockHeight, to: BlockHeight },
}

impl LedgerError {
    /// Connectivity failures that are retried on the next poll.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Rpc(_) | LedgerError::Timeout)
    }
}

impl From<RpcError<TransportErrorKind>> for LedgerError {
    fn from(error: RpcError<TransportErrorKind>) -> Self {
        LedgerError::Rpc(Arc::new(error))
    }
}

impl From<tokio::time::error::Elapsed> for LedgerError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        LedgerError::Timeout
    }
}

/// A raw log could not be turned into a deposit event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Log is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("Log payload does not match the event ABI: {0}")]
    InvalidPayload(String),
}

/// Errors raised by a [`StateStore`](crate::StateStore).
#[derive(Error, Debug, Clone)]
pub enum StateStoreError {
    #[error("State storage I/O failed: {0}")]
    Io(Arc<io::Error>),

    /// The state record exists but cannot be parsed.
    #[error("State file {path} is corrupted: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    #[error("Failed to serialize scan state: {0}")]
    Serialize(String),
}

impl From<io::Error> for StateStoreError {
    fn from(error: io::Error) -> Self {
        StateStoreError::Io(Arc::new(error))
    }
}

/// Raised by an [`ActionDispatcher`](crate::ActionDispatcher) that could not hand an action off.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Dispatch failed: {0}")]
pub struct DispatchError(pub String);

/// Errors that stop the listener or prevent it from starting.
///
/// Transient conditions never surface here; they are logged and retried by the scheduler.
#[derive(Error, Debug, Clone)]
pub enum ListenerError {
    /// The configured maximum chunk size is invalid (must be greater than zero).
    #[error("Max chunk size must be greater than 0")]
    InvalidMaxChunkSize,

    /// The configured poll interval is invalid (must be greater than zero).
    #[error("Poll interval must be greater than 0")]
    InvalidPollInterval,

    /// The configured maximum number of concurrent fetches is invalid (must be greater than
    /// zero).
    #[error("Max concurrent fetches must be greater than 0")]
    InvalidMaxConcurrentFetches,

    /// The configured fetch span is invalid (must be greater than zero).
    #[error("Max fetch span must be greater than 0")]
    InvalidFetchSpan,

    #[error("Invalid {0} endpoint: {1}")]
    InvalidEndpoint(&'static str, String),

    #[error("Invalid event signature: {0}")]
    InvalidEventSignature(String),

    #[error("Failed to read configuration: {0}")]
    Config(String),

    /// The durable state exists but is unreadable; an operator has to intervene.
    #[error("Refusing to start: {0}")]
    CorruptedState(StateStoreError),

    /// The endpoint rejects even a single-block log query, so no progress is possible.
    #[error("Endpoint rejects log queries for block {block} even at the minimum range")]
    RangeTooLargeAtMinimum { block: BlockHeight },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connectivity_errors_are_transient() {
        assert!(LedgerError::Timeout.is_transient());
        assert!(LedgerError::from(RpcError::Transport(TransportErrorKind::BackendGone)).is_transient());
        assert!(!LedgerError::RangeTooLarge { from: 1, to: 2 }.is_transient());
        assert!(!LedgerError::InvalidRange { from: 2, to: 1 }.is_transient());
    }
}
