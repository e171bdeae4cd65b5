//! Chain reader - typed, bounded read calls against the party contract
//!
//! Every read resolves to a [`ReadResult`]: RPC errors, decode errors and
//! timeouts all come back as values so a batch of reads can never be aborted
//! by one bad call.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionRequest;
use alloy_sol_types::SolCall;

use crate::domain::party::{PartyRecord, ReadError, ReadResult};
use crate::infrastructure::ethereum::contract::IPartyMembership;
use crate::infrastructure::ethereum::EthereumProvider;

#[derive(Clone)]
pub struct ChainReader {
    provider: Arc<dyn EthereumProvider>,
    contract: Address,
    timeout: Duration,
}

impl ChainReader {
    pub fn new(provider: Arc<dyn EthereumProvider>, contract: Address, timeout: Duration) -> Self {
        Self {
            provider,
            contract,
            timeout,
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Encode `call`, run it as an eth_call bounded by the read timeout, decode the return
    pub async fn read<C>(&self, call: C) -> ReadResult<C::Return>
    where
        C: SolCall + Send,
    {
        let request = TransactionRequest::default()
            .to(self.contract)
            .input(call.abi_encode().into());

        let output = match tokio::time::timeout(self.timeout, self.provider.call(request)).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return Err(ReadError::Rpc(format!("{err:#}"))),
            Err(_) => return Err(ReadError::Timeout(self.timeout)),
        };

        C::abi_decode_returns(&output).map_err(|err| ReadError::Decode(err.to_string()))
    }

    pub async fn owner(&self) -> ReadResult<Address> {
        self.read(IPartyMembership::ownerCall {}).await
    }

    pub async fn party_count(&self) -> ReadResult<u64> {
        let count = self.read(IPartyMembership::partyCountCall {}).await?;
        u64::try_from(count).map_err(|_| ReadError::Decode(format!("party count {count} overflows")))
    }

    pub async fn party(&self, index: u64) -> ReadResult<PartyRecord> {
        let party = self
            .read(IPartyMembership::partiesCall {
                index: U256::from(index),
            })
            .await?;
        Ok(PartyRecord {
            index,
            name: party.name,
            join_fee: party.joinFee,
            member_count: party.memberCount.saturating_to::<u64>(),
            total_contributions: party.totalContributions,
        })
    }

    pub async fn is_member(&self, index: u64, member: Address) -> ReadResult<bool> {
        self.read(IPartyMembership::isMemberCall {
            partyId: U256::from(index),
            member,
        })
        .await
    }

    pub async fn member_token(&self, member: Address, index: u64) -> ReadResult<U256> {
        self.read(IPartyMembership::memberTokensCall {
            member,
            partyId: U256::from(index),
        })
        .await
    }

    pub async fn token_uri(&self, token_id: U256) -> ReadResult<String> {
        self.read(IPartyMembership::tokenURICall { tokenId: token_id })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockChain, MockParty};

    fn party(name: &str, fee: u64) -> MockParty {
        MockParty::new(name, U256::from(fee), 4, U256::from(fee * 4))
    }

    #[tokio::test]
    async fn test_party_roundtrips_through_abi() {
        let chain = MockChain::new(vec![party("Matcha", 10)]);
        let reader = chain.reader(Duration::from_secs(1));
        let record = reader.party(0).await.unwrap();
        assert_eq!(record.index, 0);
        assert_eq!(record.name, "Matcha");
        assert_eq!(record.join_fee, U256::from(10u64));
        assert_eq!(record.member_count, 4);
        assert_eq!(record.total_contributions, U256::from(40u64));
        assert_eq!(reader.party_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rpc_failure_is_a_value() {
        let chain = MockChain::new(vec![party("Oolong", 1)]);
        chain.fail_party(0);
        let reader = chain.reader(Duration::from_secs(1));
        assert!(matches!(reader.party(0).await, Err(ReadError::Rpc(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_call_times_out() {
        let chain = MockChain::new(vec![party("Sencha", 1)]);
        chain.delay_party(0, Duration::from_secs(60));
        let reader = chain.reader(Duration::from_millis(500));
        assert_eq!(
            reader.party(0).await,
            Err(ReadError::Timeout(Duration::from_millis(500)))
        );
    }

    #[tokio::test]
    async fn test_garbage_return_data_is_a_decode_error() {
        let chain = MockChain::new(vec![]);
        chain.set_raw_owner(vec![0xde, 0xad]);
        let reader = chain.reader(Duration::from_secs(1));
        assert!(matches!(reader.owner().await, Err(ReadError::Decode(_))));
    }
}
