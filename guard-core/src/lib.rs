//! # guard-core
//!
//! Pure logic for GuardSync (no I/O, instant tests).
//!
//! This crate implements the algorithms and state machines of the
//! authenticator without any network or disk I/O:
//! - [`code`] - one-time codes and confirmation signatures
//! - [`login`] - the login state machine and outcome classifier
//! - [`snapshot`] - the offer snapshot and its diff law
//! - [`backoff`] - retry delay calculation
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce
//! output without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (HTTP, clocks, timers) is performed by `guard-client`,
//! which drives these state machines with wire responses.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backoff;
pub mod code;
pub mod login;
pub mod snapshot;

pub use backoff::calculate_backoff;
pub use code::{confirmation_query, confirmation_signature, generate_code, CODE_INTERVAL_SECS};
pub use login::{classify_failure_message, LoginAction, LoginEvent, LoginFailure, LoginState};
pub use snapshot::OfferSnapshot;
