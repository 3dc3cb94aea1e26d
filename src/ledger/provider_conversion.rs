use alloy::{
    network::{Ethereum, Network},
    providers::RootProvider,
};

use crate::error::LedgerError;

/// Anything [`RobustProviderBuilder`](crate::ledger::RobustProviderBuilder) can connect to:
/// an endpoint URL or a provider that is already connected.
pub trait IntoRootProvider<N: Network = Ethereum> {
    /// Connects to the endpoint, or hands back the provider as is.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Rpc`] if the endpoint cannot be reached.
    fn into_root_provider(self) -> impl Future<Output = Result<RootProvider<N>, LedgerError>> + Send;
}

impl<N: Network> IntoRootProvider<N> for RootProvider<N> {
    async fn into_root_provider(self) -> Result<RootProvider<N>, LedgerError> {
        Ok(self)
    }
}

impl<N: Network> IntoRootProvider<N> for &str {
    async fn into_root_provider(self) -> Result<RootProvider<N>, LedgerError> {
        Ok(RootProvider::connect(self).await?)
    }
}

impl<N: Network> IntoRootProvider<N> for String {
    async fn into_root_provider(self) -> Result<RootProvider<N>, LedgerError> {
        self.as_str().into_root_provider().await
    }
}
