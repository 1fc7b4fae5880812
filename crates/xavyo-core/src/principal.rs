//! Acting principal.
//!
//! Mutating collaborators (workflow, propagation) receive the principal on
//! whose behalf they run as an explicit argument. There is no ambient
//! security context.

use serde::{Deserialize, Serialize};

/// Capability token identifying who performs a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActingPrincipal {
    /// Principal name recorded in audit trails.
    pub name: String,
    /// Entitlements granted to the principal.
    #[serde(default)]
    pub entitlements: Vec<String>,
}

impl ActingPrincipal {
    /// Entitlement granting every operation.
    pub const ALL_ENTITLEMENTS: &'static str = "*";

    /// Create a principal with the given entitlements.
    pub fn new(name: impl Into<String>, entitlements: Vec<String>) -> Self {
        Self {
            name: name.into(),
            entitlements,
        }
    }

    /// Create an internal system principal holding every entitlement.
    pub fn system(name: impl Into<String>) -> Self {
        Self::new(name, vec![Self::ALL_ENTITLEMENTS.to_string()])
    }

    /// Check whether the principal holds an entitlement.
    #[must_use]
    pub fn has_entitlement(&self, entitlement: &str) -> bool {
        self.entitlements
            .iter()
            .any(|e| e == Self::ALL_ENTITLEMENTS || e == entitlement)
    }
}

impl std::fmt::Display for ActingPrincipal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
