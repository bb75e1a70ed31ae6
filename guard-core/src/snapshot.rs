//! Offer snapshot and its diff law.

use guard_types::{ChangeEvent, Offer, OfferId};
use std::collections::HashMap;

/// Last-observed state of every tracked offer, keyed by offer id.
///
/// Owned by the polling engine; only it mutates the snapshot. One event per
/// observed transition:
/// - an id not in the snapshot is stored and announced with no `previous`
/// - a known id whose state is unchanged is stored silently (timestamps and
///   asset lists may still have moved)
/// - a known id whose state changed is stored and announced with both sides
#[derive(Debug, Default)]
pub struct OfferSnapshot {
    offers: HashMap<OfferId, Offer>,
}

impl OfferSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fetched offer and report the transition, if any.
    pub fn set_offer(&mut self, offer: Offer) -> Option<ChangeEvent> {
        match self.offers.insert(offer.id, offer.clone()) {
            None => Some(ChangeEvent {
                previous: None,
                current: offer,
            }),
            Some(previous) if previous.state != offer.state => Some(ChangeEvent {
                previous: Some(previous),
                current: offer,
            }),
            Some(_) => None,
        }
    }

    /// The last observed version of an offer, if any.
    pub fn get(&self, id: OfferId) -> Option<&Offer> {
        self.offers.get(&id)
    }

    /// Number of tracked offers.
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    /// Whether no offer has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}
