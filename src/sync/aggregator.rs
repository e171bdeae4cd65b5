//! View aggregator - fans out contract reads and joins them into view records
//!
//! One run reads every party, the connected wallet's membership in each, and
//! the token id of every membership. Reads within a wave are dispatched
//! together; token lookups form a second wave that starts only after the
//! membership wave has resolved.

use alloy::primitives::Address;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::domain::party::{
    Connection, MembershipFact, PartyRecord, PartyView, ReadFailure, ReadResult,
};
use crate::infrastructure::ethereum::ChainReader;

/// Output of one aggregation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub views: Vec<PartyView>,
    /// Primary reads that failed; their indices are absent from `views`
    pub failures: Vec<ReadFailure>,
}

/// Run the full read pipeline for `count` parties.
///
/// Returns `None` when no wallet is connected.
pub async fn aggregate(
    reader: &ChainReader,
    count: u64,
    connection: Connection,
) -> Option<Aggregation> {
    if !connection.is_connected() {
        debug!("not connected, skipping aggregation");
        return None;
    }

    let party_reads = join_all((0..count).map(|index| reader.party(index)));
    let (parties, memberships) = match connection.address() {
        Some(member) => futures::join!(party_reads, read_memberships(reader, count, member)),
        None => (party_reads.await, vec![MembershipFact::default(); count as usize]),
    };

    Some(assemble(parties, memberships))
}

/// Membership wave followed by the token-lookup wave
async fn read_memberships(reader: &ChainReader, count: u64, member: Address) -> Vec<MembershipFact> {
    let mut memberships = vec![MembershipFact::default(); count as usize];

    let membership_reads =
        join_all((0..count).map(|index| reader.is_member(index, member))).await;

    let mut queued = Vec::new();
    for (index, result) in membership_reads.into_iter().enumerate() {
        match result {
            Ok(true) => {
                memberships[index].is_member = true;
                queued.push(index as u64);
            }
            Ok(false) => {}
            Err(err) => debug!(index, error = %err, "membership read failed"),
        }
    }

    // each lookup carries its party index; only a subset of indices is queued
    let token_reads = join_all(queued.into_iter().map(|index| async move {
        (index, reader.member_token(member, index).await)
    }))
    .await;

    for (index, result) in token_reads {
        match result {
            Ok(token_id) => memberships[index as usize].token_id = Some(token_id),
            Err(err) => debug!(index, error = %err, "token lookup failed"),
        }
    }

    memberships
}

fn assemble(
    parties: Vec<ReadResult<PartyRecord>>,
    memberships: Vec<MembershipFact>,
) -> Aggregation {
    let mut aggregation = Aggregation::default();
    for (index, (party, membership)) in parties.into_iter().zip(memberships).enumerate() {
        match party {
            Ok(record) => aggregation.views.push(PartyView::join(record, membership)),
            Err(error) => {
                warn!(index, error = %error, "party read failed, dropping from view");
                aggregation.failures.push(ReadFailure {
                    index: index as u64,
                    error,
                });
            }
        }
    }
    aggregation
}
