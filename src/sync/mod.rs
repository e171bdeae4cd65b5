//! Synchronization layer - aggregation runs and transaction lifecycles

pub mod aggregator;
pub mod orchestrator;
pub mod subscription;

pub use aggregator::{aggregate, Aggregation};
pub use orchestrator::{Confirmation, Ticket, TxError, TxOrchestrator, TxPhase, WriteOp};
pub use subscription::{AggregationInputs, Epoch, Subscription, Trigger};
