//! Transaction orchestrator - validation and lifecycle of state-changing calls
//!
//! Exactly one submission is tracked. Each submission gets a ticket; events
//! for any other ticket are stale and ignored. The busy flag is raised when a
//! submission begins and lowered when it fails to submit, confirms, reverts,
//! or times out waiting for a receipt.

use alloy::primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::party::{Connection, PartyView};
use crate::domain::units::{parse_ether, AmountError};
use crate::infrastructure::ethereum::contract::IPartyMembership;

pub type Ticket = u64;

#[derive(Debug, Error)]
pub enum TxError {
    #[error("Please enter both name and fee")]
    MissingFields,
    #[error("Invalid fee: {0}")]
    InvalidFee(#[from] AmountError),
    #[error("Connect a wallet first")]
    NoWallet,
    #[error("Already a member of {0}")]
    AlreadyMember(String),
    #[error("Nothing to withdraw from {0}")]
    NothingToWithdraw(String),
}

/// A state-changing contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    CreateParty { name: String, join_fee: U256 },
    JoinParty { index: u64, fee: U256 },
    Withdraw { index: u64, recipient: Address },
}

impl WriteOp {
    pub fn label(&self) -> String {
        match self {
            WriteOp::CreateParty { name, .. } => format!("create party \"{name}\""),
            WriteOp::JoinParty { index, .. } => format!("join party #{index}"),
            WriteOp::Withdraw { index, .. } => format!("withdraw from party #{index}"),
        }
    }

    pub fn calldata(&self) -> Vec<u8> {
        match self {
            WriteOp::CreateParty { name, join_fee } => IPartyMembership::createPartyCall {
                name: name.clone(),
                joinFee: *join_fee,
            }
            .abi_encode(),
            WriteOp::JoinParty { index, .. } => {
                IPartyMembership::payContributionToJoinPartyCall {
                    partyId: U256::from(*index),
                }
                .abi_encode()
            }
            WriteOp::Withdraw { index, recipient } => {
                IPartyMembership::withdrawContributionsCall {
                    partyId: U256::from(*index),
                    recipient: *recipient,
                }
                .abi_encode()
            }
        }
    }

    /// Native value attached to the call
    pub fn value(&self) -> U256 {
        match self {
            WriteOp::JoinParty { fee, .. } => *fee,
            _ => U256::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxPhase {
    Idle,
    Submitting { ticket: Ticket, label: String },
    AwaitingConfirmation { ticket: Ticket, label: String, hash: B256 },
}

/// What a confirmation event means for the view state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Mined successfully: invalidate and clear the create form
    Applied,
    Reverted,
}

#[derive(Debug)]
pub struct TxOrchestrator {
    phase: TxPhase,
    next_ticket: Ticket,
}

impl Default for TxOrchestrator {
    fn default() -> Self {
        Self {
            phase: TxPhase::Idle,
            next_ticket: 1,
        }
    }
}

impl TxOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &TxPhase {
        &self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase != TxPhase::Idle
    }

    pub fn awaiting_confirmation(&self) -> bool {
        matches!(self.phase, TxPhase::AwaitingConfirmation { .. })
    }

    pub fn pending_hash(&self) -> Option<B256> {
        match &self.phase {
            TxPhase::AwaitingConfirmation { hash, .. } => Some(*hash),
            _ => None,
        }
    }

    fn current_ticket(&self) -> Option<Ticket> {
        match &self.phase {
            TxPhase::Idle => None,
            TxPhase::Submitting { ticket, .. } | TxPhase::AwaitingConfirmation { ticket, .. } => {
                Some(*ticket)
            }
        }
    }

    fn current_label(&self) -> String {
        match &self.phase {
            TxPhase::Idle => String::new(),
            TxPhase::Submitting { label, .. } | TxPhase::AwaitingConfirmation { label, .. } => {
                label.clone()
            }
        }
    }

    pub fn prepare_create(
        &self,
        name: &str,
        fee: &str,
        connection: Connection,
    ) -> Result<WriteOp, TxError> {
        let name = name.trim();
        if name.is_empty() || fee.trim().is_empty() {
            return Err(TxError::MissingFields);
        }
        if connection.address().is_none() {
            return Err(TxError::NoWallet);
        }
        let join_fee = parse_ether(fee)?;
        Ok(WriteOp::CreateParty {
            name: name.to_string(),
            join_fee,
        })
    }

    pub fn prepare_join(&self, party: &PartyView, connection: Connection) -> Result<WriteOp, TxError> {
        if connection.address().is_none() {
            return Err(TxError::NoWallet);
        }
        if !party.can_join() {
            return Err(TxError::AlreadyMember(party.name.clone()));
        }
        Ok(WriteOp::JoinParty {
            index: party.id,
            fee: party.join_fee,
        })
    }

    pub fn prepare_withdraw(
        &self,
        party: &PartyView,
        connection: Connection,
    ) -> Result<WriteOp, TxError> {
        let Some(recipient) = connection.address() else {
            return Err(TxError::NoWallet);
        };
        if !party.can_withdraw() {
            return Err(TxError::NothingToWithdraw(party.name.clone()));
        }
        Ok(WriteOp::Withdraw {
            index: party.id,
            recipient,
        })
    }

    /// Raise busy and track a new submission, superseding any previous one.
    pub fn begin(&mut self, op: &WriteOp) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        if let Some(previous) = self.current_ticket() {
            debug!(previous, ticket, "superseding tracked transaction");
        }
        self.phase = TxPhase::Submitting {
            ticket,
            label: op.label(),
        };
        ticket
    }

    /// The node accepted the transaction. Returns false for stale tickets.
    pub fn on_submitted(&mut self, ticket: Ticket, hash: B256) -> bool {
        if self.current_ticket() != Some(ticket) {
            return false;
        }
        let label = self.current_label();
        info!(tx_hash = %hash, "{label} submitted");
        self.phase = TxPhase::AwaitingConfirmation {
            ticket,
            label,
            hash,
        };
        true
    }

    /// Submission was rejected; busy is lowered and nothing is invalidated.
    pub fn on_submit_failed(&mut self, ticket: Ticket, error: &str) -> bool {
        if self.current_ticket() != Some(ticket) {
            return false;
        }
        warn!(ticket, error, "{} failed to submit", self.current_label());
        self.phase = TxPhase::Idle;
        true
    }

    pub fn on_confirmed(&mut self, ticket: Ticket, hash: B256, success: bool) -> Option<Confirmation> {
        if self.current_ticket() != Some(ticket) {
            debug!(ticket, tx_hash = %hash, "ignoring confirmation of untracked transaction");
            return None;
        }
        self.phase = TxPhase::Idle;
        if success {
            info!(tx_hash = %hash, "transaction confirmed");
            Some(Confirmation::Applied)
        } else {
            warn!(tx_hash = %hash, "transaction reverted");
            Some(Confirmation::Reverted)
        }
    }

    pub fn on_confirmation_timeout(&mut self, ticket: Ticket, hash: B256) -> bool {
        if self.current_ticket() != Some(ticket) {
            return false;
        }
        warn!(tx_hash = %hash, "gave up waiting for receipt");
        self.phase = TxPhase::Idle;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const WALLET: Address = address!("00000000000000000000000000000000000000aa");

    fn view(id: u64, is_member: bool, contributions: u64) -> PartyView {
        PartyView {
            id,
            name: format!("party-{id}"),
            join_fee: U256::from(100u64),
            member_count: 1,
            total_contributions: U256::from(contributions),
            is_member,
            token_id: None,
        }
    }

    #[test]
    fn test_create_requires_name_and_fee() {
        let orch = TxOrchestrator::new();
        let wallet = Connection::Wallet(WALLET);
        assert!(matches!(
            orch.prepare_create("", "0.01", wallet),
            Err(TxError::MissingFields)
        ));
        assert!(matches!(
            orch.prepare_create("Oolong", "  ", wallet),
            Err(TxError::MissingFields)
        ));
        assert!(!orch.is_busy());
    }

    #[test]
    fn test_create_converts_fee() {
        let orch = TxOrchestrator::new();
        let op = orch
            .prepare_create(" Oolong ", "0.01", Connection::Wallet(WALLET))
            .unwrap();
        assert_eq!(
            op,
            WriteOp::CreateParty {
                name: "Oolong".to_string(),
                join_fee: U256::from(10_000_000_000_000_000u64),
            }
        );
        assert!(matches!(
            orch.prepare_create("Oolong", "lots", Connection::Wallet(WALLET)),
            Err(TxError::InvalidFee(_))
        ));
    }

    #[test]
    fn test_join_pays_fee() {
        let orch = TxOrchestrator::new();
        let op = orch
            .prepare_join(&view(4, false, 0), Connection::Wallet(WALLET))
            .unwrap();
        assert_eq!(op.value(), U256::from(100u64));
        assert!(matches!(
            orch.prepare_join(&view(4, true, 0), Connection::Wallet(WALLET)),
            Err(TxError::AlreadyMember(_))
        ));
        assert!(matches!(
            orch.prepare_join(&view(4, false, 0), Connection::ReadOnly),
            Err(TxError::NoWallet)
        ));
    }

    #[test]
    fn test_withdraw_goes_to_wallet() {
        let orch = TxOrchestrator::new();
        let op = orch
            .prepare_withdraw(&view(2, false, 50), Connection::Wallet(WALLET))
            .unwrap();
        assert_eq!(
            op,
            WriteOp::Withdraw {
                index: 2,
                recipient: WALLET
            }
        );
        assert_eq!(op.value(), U256::ZERO);
        let decoded =
            IPartyMembership::withdrawContributionsCall::abi_decode(&op.calldata()).unwrap();
        assert_eq!(decoded.recipient, WALLET);
        assert!(matches!(
            orch.prepare_withdraw(&view(2, false, 0), Connection::Wallet(WALLET)),
            Err(TxError::NothingToWithdraw(_))
        ));
    }

    #[test]
    fn test_lifecycle_success() {
        let mut orch = TxOrchestrator::new();
        let op = WriteOp::JoinParty {
            index: 0,
            fee: U256::from(1u64),
        };
        let ticket = orch.begin(&op);
        assert!(orch.is_busy());
        assert!(!orch.awaiting_confirmation());

        let hash = B256::with_last_byte(9);
        assert!(orch.on_submitted(ticket, hash));
        assert!(orch.awaiting_confirmation());
        assert_eq!(orch.pending_hash(), Some(hash));

        assert_eq!(orch.on_confirmed(ticket, hash, true), Some(Confirmation::Applied));
        assert!(!orch.is_busy());
    }

    #[test]
    fn test_submit_failure_lowers_busy() {
        let mut orch = TxOrchestrator::new();
        let ticket = orch.begin(&WriteOp::JoinParty {
            index: 0,
            fee: U256::ZERO,
        });
        assert!(orch.on_submit_failed(ticket, "user rejected"));
        assert!(!orch.is_busy());
    }

    #[test]
    fn test_superseded_ticket_is_ignored() {
        let mut orch = TxOrchestrator::new();
        let op = WriteOp::JoinParty {
            index: 0,
            fee: U256::ZERO,
        };
        let first = orch.begin(&op);
        orch.on_submitted(first, B256::with_last_byte(1));
        let second = orch.begin(&op);

        assert_eq!(orch.on_confirmed(first, B256::with_last_byte(1), true), None);
        assert!(orch.is_busy());
        assert!(!orch.on_submit_failed(first, "late"));
        assert!(orch.on_submitted(second, B256::with_last_byte(2)));
        assert_eq!(orch.pending_hash(), Some(B256::with_last_byte(2)));
    }

    #[test]
    fn test_revert_and_timeout_lower_busy() {
        let mut orch = TxOrchestrator::new();
        let op = WriteOp::JoinParty {
            index: 0,
            fee: U256::ZERO,
        };
        let ticket = orch.begin(&op);
        orch.on_submitted(ticket, B256::with_last_byte(1));
        assert_eq!(
            orch.on_confirmed(ticket, B256::with_last_byte(1), false),
            Some(Confirmation::Reverted)
        );
        assert!(!orch.is_busy());

        let ticket = orch.begin(&op);
        orch.on_submitted(ticket, B256::with_last_byte(2));
        assert!(orch.on_confirmation_timeout(ticket, B256::with_last_byte(2)));
        assert!(!orch.is_busy());
    }
}
