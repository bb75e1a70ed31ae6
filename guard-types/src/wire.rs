//! Response envelopes for the remote service's JSON endpoints.
//!
//! The service encodes 64-bit identifiers as JSON strings; the
//! [`string_u64`] codecs bridge that. Envelope shapes follow the vendor
//! endpoints exactly so a captured response body deserializes unchanged.

use crate::confirmation::Confirmation;
use crate::offer::Offer;
use serde::{Deserialize, Serialize};

/// Serde codecs for 64-bit integers that travel as JSON strings.
pub mod string_u64 {
    use serde::de::{self, Deserializer};
    use serde::ser::Serializer;
    use serde::Deserialize;

    /// Serialize a u64 as a decimal string.
    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    /// Deserialize a u64 from a decimal string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse::<u64>().map_err(de::Error::custom)
    }

    /// Same codec for [`OfferId`](crate::OfferId) fields.
    pub mod offer_id {
        use crate::ids::OfferId;
        use serde::de::{self, Deserializer};
        use serde::ser::Serializer;
        use serde::Deserialize;

        /// Serialize an OfferId as a decimal string.
        pub fn serialize<S: Serializer>(
            value: &OfferId,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&value.value().to_string())
        }

        /// Deserialize an OfferId from a decimal string.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<OfferId, D::Error> {
            let text = String::deserialize(deserializer)?;
            text.parse::<u64>().map(OfferId::new).map_err(de::Error::custom)
        }
    }

    /// Same codec for [`ConfirmationId`](crate::ConfirmationId) fields.
    pub mod confirmation_id {
        use crate::ids::ConfirmationId;
        use serde::de::{self, Deserializer};
        use serde::ser::Serializer;
        use serde::Deserialize;

        /// Serialize a ConfirmationId as a decimal string.
        pub fn serialize<S: Serializer>(
            value: &ConfirmationId,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&value.value().to_string())
        }

        /// Deserialize a ConfirmationId from a decimal string.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<ConfirmationId, D::Error> {
            let text = String::deserialize(deserializer)?;
            text.parse::<u64>()
                .map(ConfirmationId::new)
                .map_err(de::Error::custom)
        }
    }
}

/// `POST /rsa-key` response: the RSA public key tied to a username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaKeyResponse {
    /// Whether the service located a key for the username.
    pub success: bool,
    /// Public exponent, hex-encoded.
    #[serde(rename = "publickey_exp")]
    pub exponent_hex: String,
    /// Public modulus, hex-encoded.
    #[serde(rename = "publickey_mod")]
    pub modulus_hex: String,
    /// Key epoch; must be echoed back in the login call.
    pub timestamp: String,
}

/// `POST /login` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Whether credentials and code were accepted.
    pub success: bool,
    /// Human-readable failure reason when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Set when the server wants a second factor this call did not supply.
    #[serde(rename = "requires_twofactor", default)]
    pub requires_second_factor: bool,
    /// Present on success.
    #[serde(
        rename = "transfer_parameters",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transfer_parameters: Option<TransferParameters>,
}

/// Session material handed over on successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferParameters {
    /// The authenticated account id, as a decimal string.
    #[serde(rename = "steamid", with = "string_u64")]
    pub account_id: u64,
    /// Fresh access token (JWT).
    #[serde(rename = "access_token")]
    pub access_token: String,
    /// Fresh refresh token.
    #[serde(rename = "refresh_token")]
    pub refresh_token: String,
    /// Session cookie value.
    #[serde(rename = "session_id")]
    pub session_id: String,
}

/// `POST /refresh` response: a renewed token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// Payload wrapper, mirroring the service's envelope.
    pub response: RefreshPayload,
}

/// Inner payload of [`RefreshResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshPayload {
    /// The replacement access token.
    #[serde(rename = "access_token")]
    pub access_token: String,
    /// A rotated refresh token, when the service rotates it.
    #[serde(
        rename = "refresh_token",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<String>,
}

/// `POST /server-time` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeQueryResponse {
    /// Payload wrapper, mirroring the service's envelope.
    pub response: TimeQueryPayload,
}

/// Inner payload of [`TimeQueryResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeQueryPayload {
    /// Current server time, unix seconds.
    #[serde(rename = "server_time")]
    pub server_time: i64,
}

/// `GET /confirmations` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationListResponse {
    /// Whether the signature was accepted and the list produced.
    pub success: bool,
    /// The pending confirmations; absent on failure.
    #[serde(
        rename = "confirmations",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub confirmations: Option<Vec<Confirmation>>,
}

/// Response to a single or batched confirmation resolve call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveResponse {
    /// Whether the service applied the operation.
    pub success: bool,
}

/// `GET /trade-offers` response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffersEnvelope {
    /// Payload wrapper, mirroring the service's envelope.
    pub response: OffersPayload,
}

/// Inner payload of [`OffersEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffersPayload {
    /// Offers this account sent.
    #[serde(rename = "trade_offers_sent", default)]
    pub sent: Vec<Offer>,
    /// Offers this account received.
    #[serde(rename = "trade_offers_received", default)]
    pub received: Vec<Offer>,
}

impl OffersEnvelope {
    /// All offers in the envelope, sent first, in wire order.
    pub fn into_offers(self) -> Vec<Offer> {
        let mut offers = self.response.sent;
        offers.extend(self.response.received);
        offers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OfferState;

    #[test]
    fn rsa_key_response_parses() {
        let json = r#"{
            "success": true,
            "publickey_exp": "010001",
            "publickey_mod": "c0ffee",
            "timestamp": "216000"
        }"#;
        let rsa: RsaKeyResponse = serde_json::from_str(json).unwrap();
        assert!(rsa.success);
        assert_eq!(rsa.exponent_hex, "010001");
        assert_eq!(rsa.modulus_hex, "c0ffee");
        assert_eq!(rsa.timestamp, "216000");
    }

    #[test]
    fn login_failure_carries_message() {
        let json = r#"{"success": false, "message": "Incorrect login."}"#;
        let login: LoginResponse = serde_json::from_str(json).unwrap();
        assert!(!login.success);
        assert_eq!(login.message.as_deref(), Some("Incorrect login."));
        assert!(login.transfer_parameters.is_none());
    }

    #[test]
    fn login_success_carries_transfer_parameters() {
        let json = r#"{
            "success": true,
            "transfer_parameters": {
                "steamid": "76561198000000001",
                "access_token": "a.b.c",
                "refresh_token": "r",
                "session_id": "s"
            }
        }"#;
        let login: LoginResponse = serde_json::from_str(json).unwrap();
        let params = login.transfer_parameters.unwrap();
        assert_eq!(params.account_id, 76561198000000001);
        assert_eq!(params.session_id, "s");
    }

    #[test]
    fn time_query_parses() {
        let json = r#"{"response": {"server_time": 1700000042}}"#;
        let time: TimeQueryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(time.response.server_time, 1700000042);
    }

    #[test]
    fn confirmation_list_without_items_parses() {
        let json = r#"{"success": false}"#;
        let list: ConfirmationListResponse = serde_json::from_str(json).unwrap();
        assert!(!list.success);
        assert!(list.confirmations.is_none());
    }

    #[test]
    fn offers_envelope_merges_sent_and_received() {
        let json = r#"{
            "response": {
                "trade_offers_sent": [
                    {"tradeofferid": "1", "accountid_other": 5,
                     "trade_offer_state": 2, "time_created": 1, "time_updated": 1}
                ],
                "trade_offers_received": [
                    {"tradeofferid": "2", "accountid_other": 6,
                     "trade_offer_state": 3, "time_created": 2, "time_updated": 2}
                ]
            }
        }"#;
        let envelope: OffersEnvelope = serde_json::from_str(json).unwrap();
        let offers = envelope.into_offers();
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].state, OfferState::Active);
        assert_eq!(offers[1].state, OfferState::Accepted);
    }

    #[test]
    fn offers_envelope_tolerates_missing_arrays() {
        let json = r#"{"response": {}}"#;
        let envelope: OffersEnvelope = serde_json::from_str(json).unwrap();
        assert!(envelope.into_offers().is_empty());
    }
}
