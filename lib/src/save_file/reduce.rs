use derive_more::{Display, Error};
use log::debug;

use super::parser::{SearchPattern, XmlTree};

/// An error that can occur when reducing a tree.
#[derive(Debug, Display, Error)]
pub enum ReduceError {
    /// An element matched, but it has nothing to be removed from. Only the
    /// root element can be in this state, so a pattern selecting it means the
    /// pattern list does not fit the save format.
    #[display("element {lineage} matched by {pattern} has no parent")]
    Orphan { pattern: String, lineage: String },
}

/// A list of patterns to strip from a tree, together with an optional cap on
/// the number of elements removed per pattern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reduction {
    patterns: Vec<SearchPattern>,
    limit: Option<usize>,
}

impl Reduction {
    pub fn new(patterns: Vec<SearchPattern>) -> Self {
        Reduction {
            patterns,
            limit: None,
        }
    }

    /// Cap the number of elements removed for every single pattern
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn patterns(&self) -> &[SearchPattern] {
        &self.patterns
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Applies every pattern in order. Returns the total number of removed
    /// elements.
    pub fn apply(&self, tree: &mut XmlTree) -> Result<usize, ReduceError> {
        let mut total = 0;
        for pattern in &self.patterns {
            total += remove_matching_elements(tree, pattern, self.limit)?;
        }
        Ok(total)
    }
}

/// Removes the elements matching the pattern, until none are left or the
/// limit is reached.
///
/// Matches are processed in document order. An element that was detached
/// together with an earlier match is not counted again, so the result is the
/// number of subtrees that were cut off, and the pattern matches nothing
/// afterwards unless the limit stopped the removal early.
pub fn remove_matching_elements(
    tree: &mut XmlTree,
    pattern: &SearchPattern,
    limit: Option<usize>,
) -> Result<usize, ReduceError> {
    let mut removed = 0;
    loop {
        if limit.is_some_and(|limit| removed >= limit) {
            debug!(
                "Stopping removal for {} after reaching the limit of {}",
                pattern, removed
            );
            break;
        }
        let matches: Vec<_> = tree.find_all(pattern).iter().map(|e| e.id()).collect();
        if matches.is_empty() {
            break;
        }
        let before = removed;
        for id in matches {
            if limit.is_some_and(|limit| removed >= limit) {
                break;
            }
            if !tree.is_attached(id) {
                // went away together with an ancestor that also matched
                continue;
            }
            if !tree.remove(id) {
                return Err(ReduceError::Orphan {
                    pattern: pattern.to_string(),
                    lineage: tree.lineage(id),
                });
            }
            removed += 1;
        }
        if removed == before {
            break;
        }
    }
    debug!("{} elements removed for pattern {}", removed, pattern);
    Ok(removed)
}
