//! Listener configuration.
//!
//! Loaded once at startup and validated before the scheduler is built, so an invalid value fails
//! the process immediately instead of mid-loop.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use alloy::{
    primitives::{Address, B256, keccak256},
    sol_types::SolEvent,
};
use serde::{Deserialize, Serialize};

use crate::{decoder::DepositInitiated, error::ListenerError, state_store::DEFAULT_STATE_PATH};

/// Default maximum number of blocks per chunk.
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 100;
/// Default time between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
/// Default number of `eth_getLogs` requests in flight per chunk.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// What to do with a log that cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Log a warning and continue with the rest of the chunk.
    #[default]
    Skip,
    /// Abandon the chunk; it is retried on the next poll.
    AbortChunk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// RPC endpoint of the source ledger.
    pub source_endpoint: String,
    /// Additional source endpoints tried in order when the primary fails.
    pub fallback_endpoints: Vec<String>,
    /// RPC endpoint of the destination ledger. Only reported by the logging dispatcher.
    pub destination_endpoint: String,
    /// Events addressed to any other chain are ignored. `None` accepts every destination.
    pub destination_chain_id: Option<u64>,
    pub contract_address: Address,
    /// Human-readable event signature, e.g. `DepositInitiated(address,uint256,address,uint256,uint256)`.
    pub event_signature: String,
    pub max_chunk_size: u64,
    pub poll_interval_ms: u64,
    pub max_concurrent_fetches: usize,
    /// Upper bound on the span of one `eth_getLogs` request. Defaults to the chunk size.
    pub max_fetch_span: Option<u64>,
    pub state_path: PathBuf,
    /// First block to scan when no state has been persisted yet.
    pub start_block: Option<u64>,
    pub malformed_policy: MalformedPolicy,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            source_endpoint: String::new(),
            fallback_endpoints: Vec::new(),
            destination_endpoint: String::new(),
            destination_chain_id: None,
            contract_address: Address::ZERO,
            event_signature: DepositInitiated::SIGNATURE.to_string(),
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            poll_interval_ms: u64::try_from(DEFAULT_POLL_INTERVAL.as_millis())
                .unwrap_or(u64::MAX),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            max_fetch_span: None,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            start_block: None,
            malformed_policy: MalformedPolicy::Skip,
        }
    }
}

impl ListenerConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ListenerError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ListenerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ListenerError> {
        serde_json::from_str(contents).map_err(|e| ListenerError::Config(e.to_string()))
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// topic0 of the configured event.
    #[must_use]
    pub fn event_topic(&self) -> B256 {
        keccak256(self.event_signature.as_bytes())
    }

    #[must_use]
    pub fn fetch_span(&self) -> u64 {
        self.max_fetch_span.unwrap_or(self.max_chunk_size)
    }

    /// Checks the scan parameters.
    ///
    /// Endpoints are only checked when set; a scheduler driven by an in-process reader does not
    /// need them.
    pub fn validate(&self) -> Result<(), ListenerError> {
        if self.max_chunk_size == 0 {
            return Err(ListenerError::InvalidMaxChunkSize);
        }
        if self.poll_interval_ms == 0 {
            return Err(ListenerError::InvalidPollInterval);
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ListenerError::InvalidMaxConcurrentFetches);
        }
        if self.max_fetch_span == Some(0) {
            return Err(ListenerError::InvalidFetchSpan);
        }
        if !is_event_signature(&self.event_signature) {
            return Err(ListenerError::InvalidEventSignature(self.event_signature.clone()));
        }
        check_endpoint("source", &self.source_endpoint)?;
        for fallback in &self.fallback_endpoints {
            check_endpoint("fallback", fallback)?;
        }
        check_endpoint("destination", &self.destination_endpoint)?;
        Ok(())
    }
}

fn is_event_signature(signature: &str) -> bool {
    let Some((name, rest)) = signature.split_once('(') else {
        return false;
    };
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && rest.ends_with(')')
        && !signature.contains(char::is_whitespace)
}

fn check_endpoint(kind: &'static str, endpoint: &str) -> Result<(), ListenerError> {
    if endpoint.is_empty() {
        return Ok(());
    }
    let has_scheme = ["http://", "https://", "ws://", "wss://"]
        .iter()
        .any(|scheme| endpoint.starts_with(scheme) && endpoint.len() > scheme.len());
    if has_scheme {
        Ok(())
    } else {
        Err(ListenerError::InvalidEndpoint(kind, endpoint.to_string()))
    }
}
