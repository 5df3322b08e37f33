//! Permission tiers for principals and protected operations
//!
//! Tiers are an ordered integer scale. Stored principals may carry any
//! integer; the named thresholds are the ones operations ask for.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered permission tier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tier(pub i32);

impl Tier {
    /// May only upload content
    pub const UPLOAD: Tier = Tier(1);
    /// Regular account operations
    pub const USER: Tier = Tier(2);
    /// Operator operations, including token issuance
    pub const ADMIN: Tier = Tier(10);

    /// Check whether this tier grants an operation requiring `required`
    pub fn satisfies(self, required: Tier) -> bool {
        self >= required
    }
}

impl From<i32> for Tier {
    fn from(value: i32) -> Self {
        Tier(value)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Tier::UPLOAD => write!(f, "UPLOAD"),
            Tier::USER => write!(f, "USER"),
            Tier::ADMIN => write!(f, "ADMIN"),
            Tier(other) => write!(f, "TIER({})", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::ADMIN > Tier::USER);
        assert!(Tier::USER > Tier::UPLOAD);
        assert!(Tier(0) < Tier::UPLOAD);
    }

    #[test]
    fn test_satisfies() {
        assert!(Tier::ADMIN.satisfies(Tier::USER));
        assert!(Tier::USER.satisfies(Tier::USER));
        assert!(!Tier::UPLOAD.satisfies(Tier::USER));
        // Unnamed tiers between thresholds still compare numerically
        assert!(Tier(5).satisfies(Tier::USER));
        assert!(!Tier(5).satisfies(Tier::ADMIN));
    }

    #[test]
    fn test_display() {
        assert_eq!(Tier::UPLOAD.to_string(), "UPLOAD");
        assert_eq!(Tier::ADMIN.to_string(), "ADMIN");
        assert_eq!(Tier(7).to_string(), "TIER(7)");
    }

    #[test]
    fn test_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Tier::ADMIN).unwrap(), "10");
        let tier: Tier = serde_json::from_str("2").unwrap();
        assert_eq!(tier, Tier::USER);
    }
}
