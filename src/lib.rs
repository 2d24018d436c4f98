//! Client SDK for the wishpool gift-wishlist and shared-expense backend.
//!
//! All persistence, identity and relational constraints live in the hosted
//! backend; this crate is the typed glue a host application drives: session
//! handling, profile self-healing, invite-code friend linking, wishlist and
//! ledger access, and RPC-backed group membership.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod friends;
pub mod gifts;
pub mod groups;
pub mod ledger;
pub mod profile;
pub mod session;
pub mod state;
pub mod telemetry;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use session::SessionStore;
pub use state::AppState;
