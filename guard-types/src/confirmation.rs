//! Pending confirmations awaiting a signed approval or denial.

use crate::ids::ConfirmationId;
use crate::wire::string_u64;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// The kind of sensitive action a confirmation protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfirmationKind {
    /// An exchange offer awaiting approval.
    Trade,
    /// A marketplace sale listing awaiting approval.
    MarketSale,
    /// An account recovery action.
    Recovery,
    /// Any kind this client does not classify.
    Other(u64),
}

impl ConfirmationKind {
    /// Decode the wire value.
    pub fn from_wire(value: u64) -> Self {
        match value {
            2 => Self::Trade,
            3 => Self::MarketSale,
            6 => Self::Recovery,
            other => Self::Other(other),
        }
    }

    /// Encode as the wire value.
    pub fn to_wire(self) -> u64 {
        match self {
            Self::Trade => 2,
            Self::MarketSale => 3,
            Self::Recovery => 6,
            Self::Other(value) => value,
        }
    }
}

impl Serialize for ConfirmationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.to_wire())
    }
}

impl<'de> Deserialize<'de> for ConfirmationKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u64::deserialize(deserializer)?;
        Ok(Self::from_wire(value))
    }
}

/// A pending sensitive account action requiring signed approval or denial.
///
/// Fetched from the service, consumed once resolved, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// The confirmation identifier.
    #[serde(rename = "id", with = "string_u64::confirmation_id")]
    pub id: ConfirmationId,
    /// Per-confirmation key that must accompany any resolve call.
    #[serde(rename = "nonce", with = "string_u64")]
    pub key: u64,
    /// The offer or listing that caused this confirmation to exist.
    #[serde(rename = "creator_id", with = "string_u64")]
    pub creator_id: u64,
    /// What kind of action is being confirmed.
    #[serde(rename = "type")]
    pub kind: ConfirmationKind,
    /// Unix timestamp of confirmation creation.
    #[serde(rename = "creation_time")]
    pub created_at: i64,
    /// Display icon URL, if the service sent one.
    #[serde(rename = "icon", default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Display headline, if the service sent one.
    #[serde(rename = "headline", default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
}
