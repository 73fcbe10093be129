//! Conflict resolution strategies.

use super::{Candidate, ConflictSet};
use crate::error::ResolveError;
use crate::reason::SelectionReason;
use crate::strategy::ConflictStrategy;
use crate::version::VersionComparator;
use std::cmp::Ordering;

/// Picks the winner of a conflict set.
pub trait ModuleConflictResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the policy refuses to settle the conflict.
    fn select<'a>(&self, conflict: &'a ConflictSet) -> Result<&'a Candidate, ResolveError>;
}

/// The highest version wins.
///
/// Candidates that compare equal are ordered by stability: the candidate
/// already selected in the graph stays, otherwise the lexically smallest
/// version string is taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestModuleConflictResolver {
    comparator: VersionComparator,
}

impl LatestModuleConflictResolver {
    #[must_use]
    pub fn new(comparator: VersionComparator) -> Self {
        Self { comparator }
    }
}

impl ModuleConflictResolver for LatestModuleConflictResolver {
    fn select<'a>(&self, conflict: &'a ConflictSet) -> Result<&'a Candidate, ResolveError> {
        let winner = conflict.candidates.iter().reduce(|best, candidate| {
            match self
                .comparator
                .compare(candidate.version(), best.version())
            {
                Ordering::Greater => candidate,
                Ordering::Less => best,
                Ordering::Equal => {
                    if conflict.is_previous(best) {
                        best
                    } else if conflict.is_previous(candidate)
                        || candidate.version() < best.version()
                    {
                        candidate
                    } else {
                        best
                    }
                }
            }
        });
        winner.ok_or_else(|| ResolveError::EmptyConflict {
            module: conflict.module.clone(),
        })
    }
}

/// Fails on any conflict between different versions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictConflictResolver;

impl ModuleConflictResolver for StrictConflictResolver {
    fn select<'a>(&self, conflict: &'a ConflictSet) -> Result<&'a Candidate, ResolveError> {
        match conflict.candidates.as_slice() {
            [only] => Ok(only),
            _ => Err(ResolveError::StrictConflict {
                module: conflict.module.clone(),
                versions: conflict
                    .candidates
                    .iter()
                    .map(|candidate| candidate.module_version.to_string())
                    .collect(),
            }),
        }
    }
}

/// The outcome of one conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictResolution {
    pub winner: Candidate,
    pub reason: SelectionReason,
}

/// Records a selection reason for every decision of the wrapped resolver.
pub struct VersionSelectionReasonResolver {
    inner: Box<dyn ModuleConflictResolver>,
}

impl VersionSelectionReasonResolver {
    #[must_use]
    pub fn new(inner: Box<dyn ModuleConflictResolver>) -> Self {
        Self { inner }
    }

    /// The recording resolver for a configured strategy.
    #[must_use]
    pub fn for_strategy(strategy: ConflictStrategy, comparator: VersionComparator) -> Self {
        match strategy {
            ConflictStrategy::Latest => {
                Self::new(Box::new(LatestModuleConflictResolver::new(comparator)))
            }
            ConflictStrategy::Strict => Self::new(Box::new(StrictConflictResolver)),
        }
    }

    /// # Errors
    ///
    /// Propagates the wrapped resolver's refusal.
    pub fn resolve(&self, conflict: &ConflictSet) -> Result<ConflictResolution, ResolveError> {
        let winner = self.inner.select(conflict)?.clone();
        let reason = if conflict.candidates.len() > 1 {
            SelectionReason::REQUESTED.with_conflict_resolution()
        } else {
            SelectionReason::REQUESTED
        };
        Ok(ConflictResolution { winner, reason })
    }
}

impl std::fmt::Debug for VersionSelectionReasonResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionSelectionReasonResolver").finish_non_exhaustive()
    }
}
