//! Exchange offers and their state transitions.

use crate::ids::OfferId;
use crate::wire::string_u64;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Lifecycle state of an exchange offer.
///
/// Numeric values follow the remote service's wire encoding. A value this
/// client does not recognize parses as [`Unknown`](Self::Unknown) so one new
/// server-side state cannot poison a whole fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfferState {
    /// Wire value not recognized by this client.
    Unknown,
    /// Offer is malformed or was never valid.
    Invalid,
    /// Offer is open and awaiting a response.
    Active,
    /// Counterparty accepted the offer.
    Accepted,
    /// Counterparty replied with a counter offer.
    Countered,
    /// Offer passed its expiry without a response.
    Expired,
    /// Sender withdrew the offer.
    Canceled,
    /// Counterparty declined the offer.
    Declined,
    /// Items in the offer became invalid.
    InvalidItems,
    /// Waiting for a second-factor confirmation.
    NeedsConfirmation,
    /// Canceled because the second factor rejected it.
    CanceledBySecondFactor,
    /// Held in escrow pending a cooldown.
    InEscrow,
}

impl OfferState {
    /// Decode the wire value.
    pub fn from_wire(value: u64) -> Self {
        match value {
            1 => Self::Invalid,
            2 => Self::Active,
            3 => Self::Accepted,
            4 => Self::Countered,
            5 => Self::Expired,
            6 => Self::Canceled,
            7 => Self::Declined,
            8 => Self::InvalidItems,
            9 => Self::NeedsConfirmation,
            10 => Self::CanceledBySecondFactor,
            11 => Self::InEscrow,
            _ => Self::Unknown,
        }
    }

    /// Encode as the wire value.
    pub fn to_wire(self) -> u64 {
        match self {
            Self::Unknown => 0,
            Self::Invalid => 1,
            Self::Active => 2,
            Self::Accepted => 3,
            Self::Countered => 4,
            Self::Expired => 5,
            Self::Canceled => 6,
            Self::Declined => 7,
            Self::InvalidItems => 8,
            Self::NeedsConfirmation => 9,
            Self::CanceledBySecondFactor => 10,
            Self::InEscrow => 11,
        }
    }

    /// Whether the offer can still change state.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::Active | Self::NeedsConfirmation | Self::InEscrow | Self::Unknown
        )
    }
}

impl Serialize for OfferState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.to_wire())
    }
}

impl<'de> Deserialize<'de> for OfferState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u64::deserialize(deserializer)?;
        Ok(Self::from_wire(value))
    }
}

/// One asset moved by an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Application the asset belongs to.
    #[serde(rename = "appid", with = "string_u64")]
    pub app_id: u64,
    /// Inventory context within the application.
    #[serde(rename = "contextid", with = "string_u64")]
    pub context_id: u64,
    /// The asset instance identifier.
    #[serde(rename = "assetid", with = "string_u64")]
    pub asset_id: u64,
    /// How many units move.
    #[serde(rename = "amount", with = "string_u64")]
    pub amount: u64,
}

/// An asynchronous proposed exchange between two accounts.
///
/// Identity is the offer id; the state field is the only one whose
/// transitions drive event emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    /// The offer identifier.
    #[serde(rename = "tradeofferid", with = "string_u64::offer_id")]
    pub id: OfferId,
    /// Short account id of the counterparty.
    #[serde(rename = "accountid_other")]
    pub counterparty_id: u32,
    /// Optional free-text message attached by the sender.
    #[serde(rename = "message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Current lifecycle state.
    #[serde(rename = "trade_offer_state")]
    pub state: OfferState,
    /// Assets this account gives away.
    #[serde(rename = "items_to_give", default)]
    pub given_assets: Vec<Asset>,
    /// Assets this account receives.
    #[serde(rename = "items_to_receive", default)]
    pub received_assets: Vec<Asset>,
    /// Whether this account created the offer.
    #[serde(rename = "is_our_offer", default)]
    pub is_ours: bool,
    /// Unix timestamp of offer creation.
    #[serde(rename = "time_created")]
    pub created_at: i64,
    /// Unix timestamp of the last server-side update.
    #[serde(rename = "time_updated")]
    pub updated_at: i64,
    /// Unix timestamp after which the offer expires.
    #[serde(rename = "expiration_time", default)]
    pub expires_at: i64,
}

/// A single observed offer transition.
///
/// Emitted once per transition: `previous` is absent when the offer was not
/// in the snapshot before. Values are immutable copies; subscribers never
/// touch the snapshot itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The offer as last observed, if it was observed before.
    pub previous: Option<Offer>,
    /// The offer as just fetched.
    pub current: Offer,
}

impl ChangeEvent {
    /// Whether this event announces an offer not seen before.
    pub fn is_new(&self) -> bool {
        self.previous.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_state_wire_roundtrip() {
        for value in 0..=12u64 {
            let state = OfferState::from_wire(value);
            if (1..=11).contains(&value) {
                assert_eq!(state.to_wire(), value);
            } else {
                assert_eq!(state, OfferState::Unknown);
            }
        }
    }

    #[test]
    fn unrecognized_state_parses_as_unknown() {
        let state: OfferState = serde_json::from_str("99").unwrap();
        assert_eq!(state, OfferState::Unknown);
    }

    #[test]
    fn terminal_states() {
        assert!(!OfferState::Active.is_terminal());
        assert!(!OfferState::NeedsConfirmation.is_terminal());
        assert!(!OfferState::InEscrow.is_terminal());
        assert!(OfferState::Accepted.is_terminal());
        assert!(OfferState::Declined.is_terminal());
        assert!(OfferState::Expired.is_terminal());
    }

    #[test]
    fn offer_parses_from_wire_json() {
        let json = r#"{
            "tradeofferid": "4420958983",
            "accountid_other": 123456,
            "message": "for the knife",
            "trade_offer_state": 2,
            "items_to_give": [
                {"appid": "730", "contextid": "2", "assetid": "991", "amount": "1"}
            ],
            "items_to_receive": [],
            "is_our_offer": true,
            "time_created": 1700000000,
            "time_updated": 1700000100,
            "expiration_time": 1701209600
        }"#;
        let offer: Offer = serde_json::from_str(json).unwrap();

        assert_eq!(offer.id, OfferId::new(4420958983));
        assert_eq!(offer.counterparty_id, 123456);
        assert_eq!(offer.state, OfferState::Active);
        assert_eq!(offer.given_assets.len(), 1);
        assert_eq!(offer.given_assets[0].app_id, 730);
        assert!(offer.received_assets.is_empty());
        assert!(offer.is_ours);
        assert_eq!(offer.created_at, 1700000000);
        assert_eq!(offer.updated_at, 1700000100);
    }

    #[test]
    fn offer_parses_without_optional_fields() {
        let json = r#"{
            "tradeofferid": "1",
            "accountid_other": 7,
            "trade_offer_state": 3,
            "time_created": 1,
            "time_updated": 2
        }"#;
        let offer: Offer = serde_json::from_str(json).unwrap();
        assert_eq!(offer.state, OfferState::Accepted);
        assert!(offer.message.is_none());
        assert!(offer.given_assets.is_empty());
        assert!(!offer.is_ours);
    }

    #[test]
    fn change_event_is_new_only_without_previous() {
        let offer: Offer = serde_json::from_str(
            r#"{"tradeofferid":"1","accountid_other":7,"trade_offer_state":2,
                "time_created":1,"time_updated":2}"#,
        )
        .unwrap();

        let fresh = ChangeEvent {
            previous: None,
            current: offer.clone(),
        };
        assert!(fresh.is_new());

        let transition = ChangeEvent {
            previous: Some(offer.clone()),
            current: offer,
        };
        assert!(!transition.is_new());
    }
}
