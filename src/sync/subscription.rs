//! Aggregation subscription - decides when to re-run the aggregator
//!
//! The aggregator depends on three inputs: the party count, the wallet
//! connection and the invalidation counter. Any change issues a new epoch.
//! Results are committed only if they carry the latest epoch, so a run that
//! was superseded can never overwrite a fresher one.

use crate::domain::party::Connection;

/// Monotonic id of an aggregation run
pub type Epoch = u64;

/// Everything an aggregation run depends on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationInputs {
    pub party_count: Option<u64>,
    pub connection: Connection,
    pub invalidation: u64,
}

/// A run to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub epoch: Epoch,
    pub party_count: u64,
    pub connection: Connection,
}

#[derive(Debug, Default)]
pub struct Subscription {
    last: Option<AggregationInputs>,
    epoch: Epoch,
}

impl Subscription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current inputs; returns a trigger when they changed and a run can start.
    ///
    /// The epoch advances on every change, even when no run is started, so
    /// results still in flight for the old inputs are rejected.
    pub fn observe(&mut self, inputs: AggregationInputs) -> Option<Trigger> {
        if self.last == Some(inputs) {
            return None;
        }
        self.last = Some(inputs);
        self.epoch += 1;
        self.trigger(inputs)
    }

    fn trigger(&self, inputs: AggregationInputs) -> Option<Trigger> {
        if !inputs.connection.is_connected() {
            return None;
        }
        let party_count = inputs.party_count?;
        Some(Trigger {
            epoch: self.epoch,
            party_count,
            connection: inputs.connection,
        })
    }

    /// Latest issued epoch
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Whether a result for `epoch` may be committed
    pub fn accepts(&self, epoch: Epoch) -> bool {
        epoch == self.epoch
    }

    /// Record the count a committed run actually read, without starting another run.
    pub fn absorb_count(&mut self, party_count: u64) {
        if let Some(last) = self.last.as_mut() {
            last.party_count = Some(party_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn inputs(count: Option<u64>, connection: Connection, invalidation: u64) -> AggregationInputs {
        AggregationInputs {
            party_count: count,
            connection,
            invalidation,
        }
    }

    #[test]
    fn test_unchanged_inputs_do_not_trigger() {
        let mut sub = Subscription::new();
        let first = sub.observe(inputs(Some(2), Connection::ReadOnly, 0));
        assert_eq!(first.map(|t| t.epoch), Some(1));
        assert_eq!(sub.observe(inputs(Some(2), Connection::ReadOnly, 0)), None);
    }

    #[test]
    fn test_each_dependency_triggers() {
        let wallet = address!("00000000000000000000000000000000000000aa");
        let mut sub = Subscription::new();
        assert!(sub.observe(inputs(Some(2), Connection::ReadOnly, 0)).is_some());
        assert!(sub.observe(inputs(Some(3), Connection::ReadOnly, 0)).is_some());
        assert!(sub.observe(inputs(Some(3), Connection::Wallet(wallet), 0)).is_some());
        let last = sub.observe(inputs(Some(3), Connection::Wallet(wallet), 1)).unwrap();
        assert_eq!(last.epoch, 4);
        assert_eq!(last.party_count, 3);
    }

    #[test]
    fn test_stale_epoch_rejected() {
        let mut sub = Subscription::new();
        let old = sub.observe(inputs(Some(1), Connection::ReadOnly, 0)).unwrap();
        let new = sub.observe(inputs(Some(1), Connection::ReadOnly, 1)).unwrap();
        assert!(!sub.accepts(old.epoch));
        assert!(sub.accepts(new.epoch));
    }

    #[test]
    fn test_disconnect_advances_epoch_without_trigger() {
        let mut sub = Subscription::new();
        let run = sub.observe(inputs(Some(1), Connection::ReadOnly, 0)).unwrap();
        assert_eq!(sub.observe(inputs(Some(1), Connection::Disconnected, 0)), None);
        assert!(!sub.accepts(run.epoch));
    }

    #[test]
    fn test_unknown_count_waits() {
        let mut sub = Subscription::new();
        assert_eq!(sub.observe(inputs(None, Connection::ReadOnly, 0)), None);
        assert!(sub.observe(inputs(Some(0), Connection::ReadOnly, 0)).is_some());
    }

    #[test]
    fn test_absorbed_count_does_not_retrigger() {
        let mut sub = Subscription::new();
        sub.observe(inputs(Some(1), Connection::ReadOnly, 1)).unwrap();
        sub.absorb_count(2);
        assert_eq!(sub.observe(inputs(Some(2), Connection::ReadOnly, 1)), None);
    }
}
