//! Bounded-issuance monetary policy engine.
//!
//! Provides:
//! - A supply ledger with an append-only, hash-chained audit log
//! - Block-reward clamping against a hard supply cap
//! - Genesis premine accumulation with caching
//! - Owner/producer transaction fee splitting
//! - Sealed mint authority for the consensus engine and system address

pub mod auth;
pub mod errors;
pub mod events;
pub mod fees;
pub mod genesis;
pub mod issuer;
pub mod ledger;
pub mod params;
pub mod policy;
pub mod state;

pub use auth::*;
pub use errors::*;
pub use events::*;
pub use fees::*;
pub use genesis::*;
pub use issuer::*;
pub use ledger::*;
pub use params::*;
pub use policy::*;
pub use state::*;

/// Module version for API introspection
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
