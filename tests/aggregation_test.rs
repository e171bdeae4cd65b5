//! Aggregation properties against the in-memory party contract

use std::time::Duration;

use alloy::primitives::{address, Address, U256};
use partytea::domain::party::Connection;
use partytea::sync::aggregate;
use partytea::test_utils::{MockCall, MockChain, MockParty};

const TIMEOUT: Duration = Duration::from_secs(2);
const WALLET: Address = address!("00000000000000000000000000000000000000aa");

fn chain(count: u64) -> MockChain {
    MockChain::new(
        (0..count)
            .map(|i| MockParty::new(&format!("party-{i}"), U256::from(100 + i), i, U256::ZERO))
            .collect(),
    )
}

#[tokio::test]
async fn test_read_only_issues_no_membership_calls() {
    let chain = chain(3);
    chain.add_member(1, WALLET, U256::from(9u64));

    let result = aggregate(&chain.reader(TIMEOUT), 3, Connection::ReadOnly)
        .await
        .unwrap();

    assert_eq!(result.views.len(), 3);
    assert!(result
        .views
        .iter()
        .all(|view| !view.is_member && view.token_id.is_none()));
    assert_eq!(
        chain.count_calls(|c| matches!(c, MockCall::IsMember(..) | MockCall::MemberToken(..))),
        0
    );
}

#[tokio::test]
async fn test_output_order_ignores_resolution_order() {
    let chain = chain(4);
    // Earlier indices resolve last
    chain.delay_party(0, Duration::from_millis(80));
    chain.delay_party(1, Duration::from_millis(40));
    chain.fail_party(2);

    let result = aggregate(&chain.reader(TIMEOUT), 4, Connection::Wallet(WALLET))
        .await
        .unwrap();

    let ids: Vec<u64> = result.views.iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![0, 1, 3]);
    assert_eq!(result.views[2].join_fee, U256::from(103u64));
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].index, 2);
}

#[tokio::test]
async fn test_token_wave_starts_after_membership_wave() {
    let chain = chain(3);
    chain.add_member(0, WALLET, U256::from(1u64));
    chain.add_member(2, WALLET, U256::from(2u64));
    // A slow membership read must hold back every token lookup
    chain.delay(MockCall::IsMember(1, WALLET), Duration::from_millis(60));

    let result = aggregate(&chain.reader(TIMEOUT), 3, Connection::Wallet(WALLET))
        .await
        .unwrap();

    let calls = chain.calls();
    let last_membership = calls
        .iter()
        .rposition(|c| matches!(c, MockCall::IsMember(..)))
        .unwrap();
    let first_lookup = calls
        .iter()
        .position(|c| matches!(c, MockCall::MemberToken(..)))
        .unwrap();
    assert!(last_membership < first_lookup);
    assert_eq!(
        chain.count_calls(|c| matches!(c, MockCall::MemberToken(..))),
        2
    );
    assert_eq!(result.views[0].token_id, Some(U256::from(1u64)));
    assert_eq!(result.views[2].token_id, Some(U256::from(2u64)));
}

#[tokio::test(start_paused = true)]
async fn test_hung_read_drops_only_its_index() {
    let chain = chain(3);
    chain.delay_party(1, Duration::from_secs(60));

    let result = aggregate(&chain.reader(TIMEOUT), 3, Connection::ReadOnly)
        .await
        .unwrap();

    let ids: Vec<u64> = result.views.iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![0, 2]);
    assert_eq!(result.failures[0].index, 1);
    assert!(result.failures[0].error.to_string().contains("timed out"));
}
