//! Ethereum infrastructure - Alloy provider, contract ABI and chain reader

pub mod contract;
mod provider;
mod reader;

pub use provider::{create_provider, signer_from_env, AlloyProvider, EthereumProvider};
pub use reader::ChainReader;
