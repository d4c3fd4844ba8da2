//! Ingestion gate - tells the upstream whether to keep pushing.

use std::fmt;

/// Upstream flow state, toggled only by the funnel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IngestionGate {
    /// Upstream may push
    #[default]
    Open,
    /// Upstream should hold further chunks
    Suspended,
}

impl IngestionGate {
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for IngestionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Suspended => f.write_str("suspended"),
        }
    }
}
