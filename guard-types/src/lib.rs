//! # guard-types
//!
//! Data model and wire format types for GuardSync.
//!
//! This crate provides the foundational types used across all GuardSync crates:
//! - [`AccountId`], [`OfferId`], [`ConfirmationId`], [`DeviceId`] - Identity types
//! - [`AuthenticatorSecret`], [`Session`], [`AccountDocument`] - Credential material
//! - [`Confirmation`], [`Offer`], [`ChangeEvent`] - Protocol entities
//! - [`GuardError`] - Error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

mod confirmation;
mod document;
mod error;
mod ids;
mod offer;
mod secrets;
mod session;
pub mod wire;

pub use confirmation::{Confirmation, ConfirmationKind};
pub use document::AccountDocument;
pub use error::GuardError;
pub use ids::{AccountId, ConfirmationId, DeviceId, OfferId};
pub use offer::{Asset, ChangeEvent, Offer, OfferState};
pub use secrets::AuthenticatorSecret;
pub use session::Session;
