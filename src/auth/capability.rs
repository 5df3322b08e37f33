//! Token capability restrictions
//!
//! A small bitset carried by every token. Stored documents keep the
//! historical `upload_only` / `is_session` columns; they are folded into
//! this set when a token is loaded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(u32);

impl Capabilities {
    /// Token may only be used for upload-tier operations
    pub const UPLOAD_ONLY: Capabilities = Capabilities(1 << 0);
    /// Token was minted for an interactive session
    pub const SESSION: Capabilities = Capabilities(1 << 1);

    const ALL: u32 = Self::UPLOAD_ONLY.0 | Self::SESSION.0;

    pub const fn empty() -> Self {
        Capabilities(0)
    }

    /// Build from raw bits, dropping unknown ones
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Capabilities(bits & Self::ALL)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Capabilities) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Capabilities) {
        self.0 &= !other.0;
    }

    pub fn is_upload_only(self) -> bool {
        self.contains(Self::UPLOAD_ONLY)
    }

    pub fn is_session(self) -> bool {
        self.contains(Self::SESSION)
    }

    /// Fold the legacy boolean columns into a capability set
    pub fn from_flags(upload_only: bool, is_session: bool) -> Self {
        let mut caps = Self::empty();
        if upload_only {
            caps.insert(Self::UPLOAD_ONLY);
        }
        if is_session {
            caps.insert(Self::SESSION);
        }
        caps
    }
}

impl BitOr for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Self) -> Self::Output {
        Capabilities(self.0 | rhs.0)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.is_upload_only() {
            names.push("upload-only");
        }
        if self.is_session() {
            names.push("session");
        }
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}
