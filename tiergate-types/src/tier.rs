//! The ordered plan hierarchy.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A subscription plan tier.
///
/// Tiers are totally ordered by [`PlanTier::rank`]; a higher rank grants a
/// superset of the access of every lower rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    /// No paid entitlement.
    #[default]
    Free,
    /// Entry paid plan.
    Basic,
    /// Top paid plan.
    Pro,
}

impl PlanTier {
    /// All tiers in ascending rank order.
    pub const ALL: [PlanTier; 3] = [PlanTier::Free, PlanTier::Basic, PlanTier::Pro];

    /// Returns the numeric rank of this tier (`free=0`, `basic=1`, `pro=2`).
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Basic => 1,
            Self::Pro => 2,
        }
    }

    /// Returns the tier with the given rank, if any.
    #[must_use]
    pub const fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            0 => Some(Self::Free),
            1 => Some(Self::Basic),
            2 => Some(Self::Pro),
            _ => None,
        }
    }

    /// Returns the lowercase wire name of the tier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Pro => "pro",
        }
    }

    /// Returns a display name for the tier.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Basic => "Basic",
            Self::Pro => "Pro",
        }
    }

    /// Returns true for any paid tier.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        !matches!(self, Self::Free)
    }
}

impl PartialOrd for PlanTier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PlanTier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "basic" => Ok(Self::Basic),
            "pro" => Ok(Self::Pro),
            _ => Err(Error::UnknownTier(s.to_string())),
        }
    }
}
