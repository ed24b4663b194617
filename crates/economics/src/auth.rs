//! Authorization of supply mutations.
//!
//! Only two identities may mint or burn: the system (zero) address and the
//! consensus engine. Both are represented by a sealed [`MintAuthority`] that
//! can only be issued by the [`AuthorizationGuard`] owned by a ledger, so a
//! caller cannot obtain authority by presenting a matching string.

use issuance_types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier recorded in the audit log for the consensus engine.
pub const CONSENSUS_ENGINE_ID: &str = "consensus_engine";

static NEXT_GUARD_KEY: AtomicU64 = AtomicU64::new(1);

/// The sanctioned identities. They are equivalent for authorization purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanctionedRole {
    SystemAddress,
    ConsensusEngine,
}

impl SanctionedRole {
    /// Identity token written into audit entries.
    pub fn label(&self) -> String {
        match self {
            SanctionedRole::SystemAddress => Address::ZERO.to_string(),
            SanctionedRole::ConsensusEngine => CONSENSUS_ENGINE_ID.to_string(),
        }
    }
}

/// Sealed capability to mutate supply on one specific ledger.
///
/// Fields are private; the only constructor is [`AuthorizationGuard::issue`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintAuthority {
    role: SanctionedRole,
    guard_key: u64,
}

impl MintAuthority {
    pub fn role(&self) -> SanctionedRole {
        self.role
    }
}

/// Whoever requests a mint, burn or reset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Caller {
    /// Capability held by the block-production pipeline.
    Sanctioned(MintAuthority),
    /// Identity asserted by anyone else. Never authorized.
    Claimed(String),
}

impl Caller {
    pub fn claimed(identity: impl Into<String>) -> Self {
        Caller::Claimed(identity.into())
    }

    pub fn label(&self) -> String {
        match self {
            Caller::Sanctioned(authority) => authority.role.label(),
            Caller::Claimed(identity) => identity.clone(),
        }
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<MintAuthority> for Caller {
    fn from(authority: MintAuthority) -> Self {
        Caller::Sanctioned(authority)
    }
}

impl From<&MintAuthority> for Caller {
    fn from(authority: &MintAuthority) -> Self {
        Caller::Sanctioned(authority.clone())
    }
}

/// Validates callers against the authorities this guard issued.
///
/// A guard is not `Clone`; once it is moved into a ledger nobody else can
/// issue authorities for that ledger.
#[derive(Debug)]
pub struct AuthorizationGuard {
    key: u64,
}

impl AuthorizationGuard {
    pub fn new() -> Self {
        Self {
            key: NEXT_GUARD_KEY.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Issue a capability for one of the sanctioned roles.
    pub fn issue(&self, role: SanctionedRole) -> MintAuthority {
        MintAuthority {
            role,
            guard_key: self.key,
        }
    }

    /// Exact match against the authorities issued by this guard.
    pub fn is_authorized(&self, caller: &Caller) -> bool {
        match caller {
            // both roles carry the same rights; only the issuing guard matters
            Caller::Sanctioned(authority) => authority.guard_key == self.key,
            Caller::Claimed(_) => false,
        }
    }
}

impl Default for AuthorizationGuard {
    fn default() -> Self {
        Self::new()
    }
}
