//! PartyTea: a terminal client for on-chain membership parties.
//!
//! The synchronous TUI owns all view state ([`app::App`]); chain I/O runs on a
//! Tokio worker behind [`infrastructure::runtime::RuntimeBridge`].

pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod sync;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod ui;
