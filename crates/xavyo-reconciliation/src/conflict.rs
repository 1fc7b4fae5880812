//! Conflict resolution for ambiguous correlation.
//!
//! When correlation returns more than one local entity for a record, the
//! run's [`ConflictResolutionAction`] picks the subset to operate on. Order is
//! whatever the correlation engine returned; nothing here re-sorts.

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use xavyo_core::EntityId;

/// Policy applied when a record matches several local entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolutionAction {
    /// Skip the record entirely.
    #[default]
    Ignore,
    /// Operate on the first match only.
    FirstMatch,
    /// Operate on the last match only.
    LastMatch,
    /// Operate on every match independently.
    All,
}

impl ConflictResolutionAction {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictResolutionAction::Ignore => "ignore",
            ConflictResolutionAction::FirstMatch => "first_match",
            ConflictResolutionAction::LastMatch => "last_match",
            ConflictResolutionAction::All => "all",
        }
    }

    /// Pick the entities to operate on.
    ///
    /// Zero or one match is not a conflict and is returned unchanged. With two
    /// or more, `Ignore` returns nothing and logs an error, `FirstMatch` and
    /// `LastMatch` return a singleton, `All` returns every match.
    #[must_use]
    pub fn resolve(&self, matches: Vec<EntityId>) -> Vec<EntityId> {
        if matches.len() < 2 {
            return matches;
        }

        match self {
            ConflictResolutionAction::Ignore => {
                error!(
                    matches = matches.len(),
                    policy = %self,
                    "Multiple local entities match the external object, skipping it"
                );
                Vec::new()
            }
            ConflictResolutionAction::FirstMatch => {
                warn!(matches = matches.len(), policy = %self, "Multiple matches, using the first");
                matches.into_iter().take(1).collect()
            }
            ConflictResolutionAction::LastMatch => {
                warn!(matches = matches.len(), policy = %self, "Multiple matches, using the last");
                matches.into_iter().last().into_iter().collect()
            }
            ConflictResolutionAction::All => {
                warn!(matches = matches.len(), policy = %self, "Multiple matches, using all of them");
                matches
            }
        }
    }
}

impl std::fmt::Display for ConflictResolutionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConflictResolutionAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "").as_str() {
            "ignore" => Ok(ConflictResolutionAction::Ignore),
            "firstmatch" => Ok(ConflictResolutionAction::FirstMatch),
            "lastmatch" => Ok(ConflictResolutionAction::LastMatch),
            "all" => Ok(ConflictResolutionAction::All),
            _ => Err(format!("Unknown conflict resolution action: {s}")),
        }
    }
}
