//! # guard-client
//!
//! Async client for the GuardSync account-protection protocol.
//!
//! This is the I/O layer of the workspace: it drives the pure state
//! machines from `guard-core` against a remote service through a pluggable
//! [`Transport`].
//!
//! ## Features
//!
//! - **Password login**: RSA-encrypted credentials plus a one-time code,
//!   with a session refreshed from its token pair
//! - **Signed confirmations**: fetch and resolve pending account actions,
//!   single or batched under one signature
//! - **Offer synchronization**: a polling engine diffing offers against a
//!   snapshot and publishing change events to subscribers
//! - **Transport abstraction**: reqwest behind admission control, mock for
//!   testing
//!
//! ## Example
//!
//! ```ignore
//! use guard_client::{ClientConfig, GuardClient};
//!
//! let client = GuardClient::from_document(&document, ClientConfig::new(base_url))?;
//! client.session_manager().login("user", "password").await?;
//!
//! let engine = client.offer_engine().await?;
//! let _subscription = engine.subscribe(my_observer)?;
//! engine.run().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod autoresolve;
pub mod client;
pub mod clock;
pub mod config;
pub mod confirmations;
pub mod crypto;
pub mod engine;
pub mod second_factor;
pub mod session;
pub mod transport;

pub use autoresolve::{AutoResolver, Credentials};
pub use client::GuardClient;
pub use clock::ClockSource;
pub use config::ClientConfig;
pub use confirmations::{ConfirmationClient, ResolveAction};
pub use engine::{AlreadySubscribed, OfferObserver, OfferSyncEngine, Subscription};
pub use second_factor::{HeadlessSecondFactor, SecondFactor};
pub use session::{LoginError, SessionManager};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, MockTransport, RateLimitedTransport,
    Transport, TransportError,
};
