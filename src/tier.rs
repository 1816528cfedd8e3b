use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Tiny,
    Sample,
    Small,
    Medium,
    Large,
    Xlarge,
    Xxlarge,
    Complete,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Tiny => "tiny",
            Tier::Sample => "sample",
            Tier::Small => "small",
            Tier::Medium => "medium",
            Tier::Large => "large",
            Tier::Xlarge => "xlarge",
            Tier::Xxlarge => "xxlarge",
            Tier::Complete => "complete",
        };
        write!(f, "{name}")
    }
}

/// Static mapping from tier name to item ceiling; each corpus carries its
/// own table sized to the real remote set.
#[derive(Debug, Clone, Copy)]
pub struct TierTable {
    entries: &'static [(Tier, u64)],
}

impl TierTable {
    pub const fn new(entries: &'static [(Tier, u64)]) -> Self {
        Self { entries }
    }

    pub fn ceiling(&self, tier: Tier) -> Option<u64> {
        self.entries
            .iter()
            .find(|(name, _)| *name == tier)
            .map(|(_, ceiling)| *ceiling)
    }

    pub fn entries(&self) -> impl Iterator<Item = (Tier, u64)> + '_ {
        self.entries.iter().copied()
    }

    /// Resolve the item ceiling from exactly one of a tier name or an
    /// explicit limit; anything else is a usage error.
    pub fn resolve(&self, tier: Option<Tier>, limit: Option<u64>) -> Result<u64, FetchError> {
        match (tier, limit) {
            (Some(_), Some(_)) => Err(FetchError::Usage(
                "--tier and --limit are mutually exclusive".to_string(),
            )),
            (None, None) => Err(FetchError::Usage(
                "one of --tier or --limit is required".to_string(),
            )),
            (Some(tier), None) => self.ceiling(tier).ok_or_else(|| {
                FetchError::Usage(format!("tier `{tier}` is not defined for this corpus"))
            }),
            (None, Some(0)) => Err(FetchError::Usage(
                "--limit must be at least 1".to_string(),
            )),
            (None, Some(limit)) => Ok(limit),
        }
    }
}
