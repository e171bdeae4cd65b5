//! Domain layer - pure view-model types and transformations
//!
//! Nothing in here talks to the network; everything is data in, data out.

pub mod metadata;
pub mod party;
pub mod units;

pub use metadata::{parse_token_uri, MetadataError, TokenMetadata};
pub use party::{Connection, MembershipFact, PartyRecord, PartyView, ReadError, ReadFailure};
pub use units::{format_ether, format_units, parse_ether, AmountError};
