//! Party records, membership facts and the joined view record

use std::time::Duration;

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Failure marker for a single contract read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Outcome of a contract read
pub type ReadResult<T> = Result<T, ReadError>;

/// A primary party read that failed and was dropped from the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFailure {
    pub index: u64,
    pub error: ReadError,
}

/// One entry of `parties(index)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyRecord {
    pub index: u64,
    pub name: String,
    pub join_fee: U256,
    pub member_count: u64,
    pub total_contributions: U256,
}

/// Whether the connected wallet belongs to a party, and which token it holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MembershipFact {
    pub is_member: bool,
    pub token_id: Option<U256>,
}

/// Record + membership, keyed by party index. This is what the UI renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyView {
    pub id: u64,
    pub name: String,
    pub join_fee: U256,
    pub member_count: u64,
    pub total_contributions: U256,
    pub is_member: bool,
    pub token_id: Option<U256>,
}

impl PartyView {
    pub fn join(record: PartyRecord, membership: MembershipFact) -> Self {
        Self {
            id: record.index,
            name: record.name,
            join_fee: record.join_fee,
            member_count: record.member_count,
            total_contributions: record.total_contributions,
            is_member: membership.is_member,
            token_id: membership.token_id,
        }
    }

    /// Joining is offered only to non-members
    pub fn can_join(&self) -> bool {
        !self.is_member
    }

    /// Advisory: the contract is the real authority
    pub fn can_withdraw(&self) -> bool {
        !self.total_contributions.is_zero()
    }
}

/// Parties the wallet is a member of, in index order
pub fn memberships(views: &[PartyView]) -> Vec<&PartyView> {
    views.iter().filter(|view| view.is_member).collect()
}

/// Wallet connection as seen by the aggregation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Connection {
    #[default]
    Disconnected,
    /// Connected to the network without an account
    ReadOnly,
    Wallet(Address),
}

impl Connection {
    pub fn is_connected(&self) -> bool {
        !matches!(self, Connection::Disconnected)
    }

    pub fn address(&self) -> Option<Address> {
        match self {
            Connection::Wallet(address) => Some(*address),
            _ => None,
        }
    }

    /// Case-insensitive by construction: addresses compare as bytes
    pub fn is_owner(&self, owner: Option<Address>) -> bool {
        match (self.address(), owner) {
            (Some(wallet), Some(owner)) => wallet == owner,
            _ => false,
        }
    }
}
