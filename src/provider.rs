//! The provider capability seam.
//!
//! Synthesis needs exactly two facts from the outside world: who the caller
//! is, and which availability zones the region offers. Both are looked up
//! once at the start of a pass and treated as immutable afterwards. Applying
//! the finished graph (`declare` per node, honoring dependency edges) is the
//! provider's business, not this crate's.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use crate::error::SynthError;

/// A validated 12-digit account id.
///
/// Role ARNs are interpolated from this value, so a malformed identity is an
/// `InvalidReference` here, at construction, rather than a broken ARN
/// discovered at apply time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(raw: impl Into<String>) -> Result<Self, SynthError> {
        let raw = raw.into();
        if raw.len() != 12 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SynthError::InvalidReference(format!(
                "`{raw}` is not a 12-digit account id"
            )));
        }
        Ok(AccountId(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub account_id: AccountId,
}

/// Synchronous lookups the core consumes once per synthesis pass.
pub trait ProviderFacts {
    fn caller_identity(&self) -> Result<CallerIdentity, SynthError>;

    /// Zone names for `region`, in the provider's order. The topology
    /// builder takes the first two.
    fn availability_zones(&self, region: &str) -> Result<Vec<String>, SynthError>;
}

/// Fixed facts, for tests and offline synthesis.
#[derive(Debug, Clone)]
pub struct StaticFacts {
    identity: CallerIdentity,
    zones: Vec<String>,
}

impl StaticFacts {
    pub fn new(account_id: &str, zones: &[&str]) -> Result<Self, SynthError> {
        Ok(StaticFacts {
            identity: CallerIdentity {
                account_id: AccountId::new(account_id)?,
            },
            zones: zones.iter().map(|z| z.to_string()).collect(),
        })
    }
}

impl ProviderFacts for StaticFacts {
    fn caller_identity(&self) -> Result<CallerIdentity, SynthError> {
        Ok(self.identity.clone())
    }

    fn availability_zones(&self, _region: &str) -> Result<Vec<String>, SynthError> {
        Ok(self.zones.clone())
    }
}
