//! Ethereum provider abstraction and the Alloy implementation
//!
//! The client talks to exactly one HTTP endpoint. When a local signer is
//! available the provider is built with a wallet filler so it can send
//! transactions; otherwise it is read-only.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};

use crate::config::NetworkConfig;

/// Abstract Ethereum provider trait
///
/// Covers the handful of RPC operations the client needs, so the chain reader
/// and worker can run against a scripted chain in tests.
#[async_trait::async_trait]
pub trait EthereumProvider: Send + Sync + 'static {
    /// Chain id reported by the node
    async fn chain_id(&self) -> Result<u64>;

    /// Execute a call (eth_call)
    async fn call(&self, request: TransactionRequest) -> Result<Bytes>;

    /// Sign and broadcast a transaction, returning its hash
    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256>;

    /// Receipt status: `None` while pending, `Some(success)` once mined
    async fn receipt_status(&self, hash: B256) -> Result<Option<bool>>;

    /// Address of the local signer, if any
    fn signer_address(&self) -> Option<Address>;

    /// Get endpoint display name
    fn endpoint_name(&self) -> String;
}

pub struct AlloyProvider {
    provider: DynProvider,
    endpoint: String,
    signer: Option<Address>,
}

/// Create the provider for the pinned network
pub fn create_provider(
    network: &NetworkConfig,
    signer: Option<PrivateKeySigner>,
) -> Result<Box<dyn EthereumProvider>> {
    let rpc_url = network.rpc_url.parse().context("Invalid HTTP URL")?;
    let (provider, signer) = match signer {
        Some(signer) => {
            let address = signer.address();
            let provider = ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_http(rpc_url)
                .erased();
            (provider, Some(address))
        }
        None => (ProviderBuilder::new().connect_http(rpc_url).erased(), None),
    };
    Ok(Box::new(AlloyProvider {
        provider,
        endpoint: network.rpc_url.to_string(),
        signer,
    }))
}

/// Load the signer from the named environment variable, if set
pub fn signer_from_env(var: &str) -> Result<Option<PrivateKeySigner>> {
    let Ok(key) = std::env::var(var) else {
        return Ok(None);
    };
    let key = key.trim();
    if key.is_empty() {
        return Ok(None);
    }
    let signer = key
        .parse::<PrivateKeySigner>()
        .with_context(|| format!("{var} does not hold a valid private key"))?;
    Ok(Some(signer))
}

#[async_trait::async_trait]
impl EthereumProvider for AlloyProvider {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn call(&self, request: TransactionRequest) -> Result<Bytes> {
        Ok(self.provider.call(request).await?)
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256> {
        let pending = self
            .provider
            .send_transaction(request)
            .await
            .context("Transaction rejected")?;
        Ok(*pending.tx_hash())
    }

    async fn receipt_status(&self, hash: B256) -> Result<Option<bool>> {
        let receipt = self.provider.get_transaction_receipt(hash).await?;
        Ok(receipt.map(|r| r.status()))
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer
    }

    fn endpoint_name(&self) -> String {
        self.endpoint.clone()
    }
}
