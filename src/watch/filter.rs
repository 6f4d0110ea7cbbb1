// src/watch/filter.rs

//! Exact-match path exclusion.

/// Exclusion list compared by exact string equality.
///
/// Patterns are expanded to concrete paths before they get here (see
/// [`crate::watch::expand`]); no glob or prefix semantics apply at this level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionFilter {
    patterns: Vec<String>,
}

impl ExclusionFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    /// True if `candidate` equals one of the exclusion entries.
    ///
    /// The empty string never matches.
    pub fn is_excluded(&self, candidate: &str) -> bool {
        !candidate.is_empty() && self.patterns.iter().any(|p| p == candidate)
    }
}
