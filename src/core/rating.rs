//! Source credibility rating.
//!
//! Shared by the source checker (which assigns ratings) and the citation
//! formatter (which only cites sources at or above [`SourceRating::Medium`]).

use serde::{Deserialize, Serialize};

/// Credibility of a web source, ordered from most to least trusted.
///
/// Discriminants are inverted (`High = 0`, `Low = 2`) so that the derived
/// [`Ord`] sorts trusted sources first. [`meets_threshold`](Self::meets_threshold)
/// relies on this: `(self as u8) <= (threshold as u8)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceRating {
    /// Academic, government or major news outlet.
    High = 0,
    /// Encyclopedic, reference or industry publication.
    Medium = 1,
    /// Blogs, forums, vendors and anything unrecognized.
    Low = 2,
}

impl SourceRating {
    /// Returns `true` if this rating meets or exceeds the threshold.
    #[must_use]
    pub const fn meets_threshold(self, threshold: Self) -> bool {
        (self as u8) <= (threshold as u8)
    }

    /// Whether a source with this rating may be cited.
    #[must_use]
    pub const fn is_citable(self) -> bool {
        self.meets_threshold(Self::Medium)
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl std::fmt::Display for SourceRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
