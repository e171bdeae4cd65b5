//! Membership NFT metadata carried in `tokenURI`
//!
//! The contract returns `data:application/json;base64,<payload>`. The payload
//! is base64 JSON with at least an `image` field.

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("token uri has no ',' separated payload")]
    MissingPayload,
    #[error("payload is not base64: {0}")]
    Base64(String),
    #[error("payload is not metadata json: {0}")]
    Json(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

pub fn parse_token_uri(uri: &str) -> Result<TokenMetadata, MetadataError> {
    let (_, payload) = uri.split_once(',').ok_or(MetadataError::MissingPayload)?;
    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|err| MetadataError::Base64(err.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|err| MetadataError::Json(err.to_string()))
}
