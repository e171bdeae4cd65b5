//! In-memory party contract for tests
//!
//! [`MockChain`] implements [`EthereumProvider`] by decoding calldata against
//! the real contract ABI, so readers, the aggregator and the worker run the
//! same encode/decode paths they use against a node. Individual calls can be
//! failed or delayed, and every call is logged.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alloy::primitives::{hex, Address, Bytes, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy_sol_types::{SolCall, SolValue};
use anyhow::{anyhow, bail, Result};

use crate::config::PARTY_CONTRACT;
use crate::infrastructure::ethereum::contract::IPartyMembership;
use crate::infrastructure::ethereum::{ChainReader, EthereumProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockParty {
    pub name: String,
    pub join_fee: U256,
    pub member_count: u64,
    pub total_contributions: U256,
}

impl MockParty {
    pub fn new(
        name: &str,
        join_fee: U256,
        member_count: u64,
        total_contributions: U256,
    ) -> Self {
        Self {
            name: name.to_string(),
            join_fee,
            member_count,
            total_contributions,
        }
    }
}

/// A read issued against the mock, as decoded from calldata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    Owner,
    PartyCount,
    Party(u64),
    IsMember(u64, Address),
    MemberToken(Address, u64),
    TokenUri(U256),
}

/// A transaction accepted by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTx {
    pub hash: B256,
    pub from: Option<Address>,
    pub input: Bytes,
    pub value: U256,
}

#[derive(Debug, Default)]
struct MockState {
    chain_id: u64,
    owner: Address,
    raw_owner: Option<Vec<u8>>,
    signer: Option<Address>,
    parties: Vec<MockParty>,
    tokens: HashMap<(u64, Address), U256>,
    token_uris: HashMap<U256, String>,
    next_token: u64,
    failing: HashSet<MockCall>,
    delays: HashMap<MockCall, Duration>,
    calls: Vec<MockCall>,
    reject_sends: bool,
    auto_confirm: bool,
    hang_sends: bool,
    hang_receipts: bool,
    receipts: HashMap<B256, Option<bool>>,
    sent: Vec<SentTx>,
}

#[derive(Debug, Clone)]
pub struct MockChain {
    state: Arc<Mutex<MockState>>,
}

impl MockChain {
    pub fn new(parties: Vec<MockParty>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                chain_id: 10218,
                parties,
                next_token: 1,
                auto_confirm: true,
                ..Default::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn reader(&self, timeout: Duration) -> ChainReader {
        ChainReader::new(Arc::new(self.clone()), PARTY_CONTRACT, timeout)
    }

    pub fn with_signer(self, signer: Address) -> Self {
        self.lock().signer = Some(signer);
        self
    }

    pub fn set_owner(&self, owner: Address) {
        self.lock().owner = owner;
    }

    /// Make `owner()` return undecodable bytes
    pub fn set_raw_owner(&self, data: Vec<u8>) {
        self.lock().raw_owner = Some(data);
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.lock().chain_id = chain_id;
    }

    pub fn add_party(&self, party: MockParty) {
        self.lock().parties.push(party);
    }

    /// Register `member` in party `index` holding `token_id`
    pub fn add_member(&self, index: u64, member: Address, token_id: U256) {
        self.lock().tokens.insert((index, member), token_id);
    }

    pub fn set_token_uri(&self, token_id: U256, uri: &str) {
        self.lock().token_uris.insert(token_id, uri.to_string());
    }

    pub fn fail(&self, call: MockCall) {
        self.lock().failing.insert(call);
    }

    pub fn recover(&self, call: MockCall) {
        self.lock().failing.remove(&call);
    }

    pub fn fail_party(&self, index: u64) {
        self.fail(MockCall::Party(index));
    }

    pub fn delay(&self, call: MockCall, delay: Duration) {
        self.lock().delays.insert(call, delay);
    }

    pub fn delay_party(&self, index: u64, delay: Duration) {
        self.delay(MockCall::Party(index), delay);
    }

    pub fn clear_delays(&self) {
        self.lock().delays.clear();
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, matches: impl Fn(&MockCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| matches(call)).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn reject_sends(&self, reject: bool) {
        self.lock().reject_sends = reject;
    }

    /// When off, receipts stay pending until [`MockChain::confirm`]
    pub fn auto_confirm(&self, enabled: bool) {
        self.lock().auto_confirm = enabled;
    }

    /// Make `send_transaction` never answer
    pub fn hang_sends(&self, hang: bool) {
        self.lock().hang_sends = hang;
    }

    /// Make `receipt_status` never answer
    pub fn hang_receipts(&self, hang: bool) {
        self.lock().hang_receipts = hang;
    }

    pub fn confirm(&self, hash: B256, success: bool) {
        self.lock().receipts.insert(hash, Some(success));
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.lock().sent.clone()
    }

    pub fn party(&self, index: u64) -> Option<MockParty> {
        self.lock().parties.get(index as usize).cloned()
    }

    fn respond(&self, data: &[u8]) -> Result<(Option<Duration>, Result<Vec<u8>>)> {
        let call = decode_read(data)?;
        let mut state = self.lock();
        state.calls.push(call);
        let delay = state.delays.get(&call).copied();
        if state.failing.contains(&call) {
            return Ok((delay, Err(anyhow!("execution reverted: {call:?}"))));
        }

        let result = match call {
            MockCall::Owner => Ok(state
                .raw_owner
                .clone()
                .unwrap_or_else(|| state.owner.abi_encode())),
            MockCall::PartyCount => Ok(U256::from(state.parties.len()).abi_encode()),
            MockCall::Party(index) => match state.parties.get(index as usize) {
                Some(party) => Ok((
                    party.name.clone(),
                    party.join_fee,
                    U256::from(party.member_count),
                    party.total_contributions,
                )
                    .abi_encode_params()),
                None => Err(anyhow!("execution reverted: no party {index}")),
            },
            MockCall::IsMember(index, member) => {
                Ok(state.tokens.contains_key(&(index, member)).abi_encode())
            }
            MockCall::MemberToken(member, index) => Ok(state
                .tokens
                .get(&(index, member))
                .copied()
                .unwrap_or(U256::ZERO)
                .abi_encode()),
            MockCall::TokenUri(token_id) => match state.token_uris.get(&token_id) {
                Some(uri) => Ok(uri.clone().abi_encode()),
                None => Err(anyhow!("execution reverted: unknown token {token_id}")),
            },
        };
        Ok((delay, result))
    }

    fn apply_write(state: &mut MockState, from: Address, input: &[u8], value: U256) -> Result<()> {
        if let Ok(call) = IPartyMembership::createPartyCall::abi_decode(input) {
            if from != state.owner {
                bail!("execution reverted: not owner");
            }
            state
                .parties
                .push(MockParty::new(&call.name, call.joinFee, 0, U256::ZERO));
            return Ok(());
        }
        if let Ok(call) = IPartyMembership::payContributionToJoinPartyCall::abi_decode(input) {
            let index = call.partyId.saturating_to::<u64>();
            let token_id = U256::from(state.next_token);
            let Some(party) = state.parties.get_mut(index as usize) else {
                bail!("execution reverted: no party {index}");
            };
            if value != party.join_fee {
                bail!("execution reverted: wrong fee");
            }
            party.member_count += 1;
            party.total_contributions += value;
            state.next_token += 1;
            state.tokens.insert((index, from), token_id);
            return Ok(());
        }
        if let Ok(call) = IPartyMembership::withdrawContributionsCall::abi_decode(input) {
            let index = call.partyId.saturating_to::<u64>();
            let Some(party) = state.parties.get_mut(index as usize) else {
                bail!("execution reverted: no party {index}");
            };
            party.total_contributions = U256::ZERO;
            return Ok(());
        }
        bail!("unknown write selector")
    }
}

fn decode_read(data: &[u8]) -> Result<MockCall> {
    if data.len() < 4 {
        bail!("calldata too short");
    }
    let selector = &data[..4];
    let call = if selector == IPartyMembership::ownerCall::SELECTOR {
        MockCall::Owner
    } else if selector == IPartyMembership::partyCountCall::SELECTOR {
        MockCall::PartyCount
    } else if selector == IPartyMembership::partiesCall::SELECTOR {
        let call = IPartyMembership::partiesCall::abi_decode(data)?;
        MockCall::Party(call.index.saturating_to())
    } else if selector == IPartyMembership::isMemberCall::SELECTOR {
        let call = IPartyMembership::isMemberCall::abi_decode(data)?;
        MockCall::IsMember(call.partyId.saturating_to(), call.member)
    } else if selector == IPartyMembership::memberTokensCall::SELECTOR {
        let call = IPartyMembership::memberTokensCall::abi_decode(data)?;
        MockCall::MemberToken(call.member, call.partyId.saturating_to())
    } else if selector == IPartyMembership::tokenURICall::SELECTOR {
        let call = IPartyMembership::tokenURICall::abi_decode(data)?;
        MockCall::TokenUri(call.tokenId)
    } else {
        bail!("unknown selector 0x{}", hex::encode(selector));
    };
    Ok(call)
}

#[async_trait::async_trait]
impl EthereumProvider for MockChain {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.lock().chain_id)
    }

    async fn call(&self, request: TransactionRequest) -> Result<Bytes> {
        let data = request.input.input().cloned().unwrap_or_default();
        let (delay, result) = self.respond(&data)?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result.map(Bytes::from)
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256> {
        let hang = self.lock().hang_sends;
        if hang {
            std::future::pending::<()>().await;
        }
        let mut state = self.lock();
        let Some(from) = request.from.or(state.signer) else {
            bail!("no signer configured");
        };
        if state.reject_sends {
            bail!("user rejected the request");
        }
        let input = request.input.input().cloned().unwrap_or_default();
        let value = request.value.unwrap_or_default();
        let hash = B256::with_last_byte(state.sent.len() as u8 + 1);
        Self::apply_write(&mut state, from, &input, value)?;
        state.sent.push(SentTx {
            hash,
            from: Some(from),
            input,
            value,
        });
        let receipt = if state.auto_confirm { Some(true) } else { None };
        state.receipts.insert(hash, receipt);
        Ok(hash)
    }

    async fn receipt_status(&self, hash: B256) -> Result<Option<bool>> {
        let hang = self.lock().hang_receipts;
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(self.lock().receipts.get(&hash).copied().flatten())
    }

    fn signer_address(&self) -> Option<Address> {
        self.lock().signer
    }

    fn endpoint_name(&self) -> String {
        "mock".to_string()
    }
}
