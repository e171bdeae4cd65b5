//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - the Alloy-based provider and typed reads against the party contract
//! - the Tokio runtime bridge that runs chain I/O off the UI thread

pub mod ethereum;
pub mod runtime;
