use std::{fmt::Debug, time::Duration};

use alloy::{
    network::{Ethereum, Network},
    primitives::{Address, B256},
    providers::{Provider, RootProvider},
    rpc::types::Filter,
    transports::{RpcError, TransportErrorKind},
};
use backon::{ExponentialBuilder, Retryable};
use tokio::time::timeout;

use crate::{
    error::LedgerError,
    ledger::{LedgerReader, RawLogEntry, sort_by_position},
    types::BlockHeight,
};

/// JSON-RPC error code several providers use for "limit exceeded".
const LIMIT_EXCEEDED_CODE: i64 = -32005;

/// Lowercase fragments of error messages providers return for an oversized `eth_getLogs` span.
const RANGE_TOO_LARGE_HINTS: &[&str] = &[
    "range too large",
    "range is too large",
    "range is too wide",
    "max block range",
    "query returned more than",
    "too many results",
    "log response size exceeded",
    "exceeds max",
];

/// Provider wrapper with built-in retry, timeout and failover.
///
/// Every call is bounded by `call_timeout` (retries included) and retried with exponential
/// backoff up to `max_retries` times against the primary endpoint before the fallbacks are
/// tried in the order they were added.
#[derive(Clone, Debug)]
pub struct RobustProvider<N: Network = Ethereum> {
    pub(crate) primary_provider: RootProvider<N>,
    pub(crate) fallback_providers: Vec<RootProvider<N>>,
    pub(crate) call_timeout: Duration,
    pub(crate) max_retries: usize,
    pub(crate) min_delay: Duration,
}

impl<N: Network> RobustProvider<N> {
    /// Get a reference to the primary provider
    #[must_use]
    pub fn primary(&self) -> &RootProvider<N> {
        &self.primary_provider
    }

    /// Fetch the latest block number with retry and timeout.
    pub async fn get_block_number(&self) -> Result<BlockHeight, LedgerError> {
        debug!("eth_blockNumber called");
        let result = self
            .try_operation_with_failover(move |provider| async move {
                provider.get_block_number().await
            })
            .await;
        if let Err(e) = &result {
            error!(error = %e, "eth_blockNumber failed");
        }
        result
    }

    /// Fetch logs for the given [`Filter`] with retry and timeout.
    ///
    /// Oversized-range rejections are neither retried nor sent to fallbacks; they are returned
    /// as the raw RPC error so the caller can shrink the span.
    pub async fn get_logs(&self, filter: &Filter) -> Result<Vec<RawLogEntry>, LedgerError> {
        debug!("eth_getLogs called");
        let result = self
            .try_operation_with_failover(move |provider| async move {
                provider.get_logs(filter).await
            })
            .await;
        if let Err(e) = &result {
            error!(error = %e, "eth_getLogs failed");
        }
        result
    }

    /// Execute `operation` against the primary provider, then each fallback in order.
    pub(crate) async fn try_operation_with_failover<T: Debug, F, Fut>(
        &self,
        operation: F,
    ) -> Result<T, LedgerError>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let mut last_error =
            match self.try_provider_with_timeout(self.primary(), &operation).await {
                Ok(value) => return Ok(value),
                Err(e) if is_range_rejection(&e) => return Err(e),
                Err(e) => e,
            };

        let num_fallbacks = self.fallback_providers.len();
        if num_fallbacks > 0 {
            info!(fallback_count = num_fallbacks, "Primary provider failed, trying fallbacks");
        }

        for (idx, provider) in self.fallback_providers.iter().enumerate() {
            match self.try_provider_with_timeout(provider, &operation).await {
                Ok(value) => {
                    info!(provider_num = idx + 1, "Fallback provider succeeded");
                    return Ok(value);
                }
                Err(e) if is_range_rejection(&e) => return Err(e),
                Err(e) => {
                    warn!(provider_num = idx + 1, error = %e, "Fallback provider failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Try executing an operation with a specific provider with retry and timeout.
    async fn try_provider_with_timeout<T, F, Fut>(
        &self,
        provider: &RootProvider<N>,
        operation: F,
    ) -> Result<T, LedgerError>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let retry_strategy = ExponentialBuilder::default()
            .with_max_times(self.max_retries)
            .with_min_delay(self.min_delay);

        timeout(
            self.call_timeout,
            (|| operation(provider.clone()))
                .retry(retry_strategy)
                .when(|err: &RpcError<TransportErrorKind>| !is_range_too_large(err))
                .notify(|err: &RpcError<TransportErrorKind>, dur: Duration| {
                    debug!(error = %err, delay_ms = dur.as_millis(), "RPC error, retrying");
                })
                .sleep(tokio::time::sleep),
        )
        .await?
        .map_err(LedgerError::from)
    }
}

impl<N: Network> LedgerReader for RobustProvider<N> {
    async fn latest_height(&self) -> Result<BlockHeight, LedgerError> {
        self.get_block_number().await
    }

    async fn fetch_events(
        &self,
        contract: Address,
        signature: B256,
        from: BlockHeight,
        to: BlockHeight,
    ) -> Result<Vec<RawLogEntry>, LedgerError> {
        if from > to {
            return Err(LedgerError::InvalidRange { from, to });
        }

        let filter =
            Filter::new().address(contract).event_signature(signature).from_block(from).to_block(to);

        match self.get_logs(&filter).await {
            Ok(mut logs) => {
                sort_by_position(&mut logs);
                Ok(logs)
            }
            Err(e) if is_range_rejection(&e) => Err(LedgerError::RangeTooLarge { from, to }),
            Err(e) => Err(e),
        }
    }
}

fn is_range_rejection(error: &LedgerError) -> bool {
    matches!(error, LedgerError::Rpc(e) if is_range_too_large(e))
}

/// Whether the endpoint rejected a log query because of its span or result size.
pub(crate) fn is_range_too_large(error: &RpcError<TransportErrorKind>) -> bool {
    let RpcError::ErrorResp(payload) = error else {
        return false;
    };
    if payload.code == LIMIT_EXCEEDED_CODE {
        return true;
    }
    let message = payload.message.to_lowercase();
    RANGE_TOO_LARGE_HINTS.iter().any(|hint| message.contains(hint))
}
