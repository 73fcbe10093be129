use super::{Candidate, ConflictSet, ModuleReplacements, VersionSelectionReasonResolver};
use crate::error::ResolveError;
use crate::identity::ModuleIdentifier;
use crate::reason::SelectionReason;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// What the graph should use for a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleDecision {
    /// Every edge to the module targets this candidate.
    Selected {
        winner: Candidate,
        reason: SelectionReason,
    },
    /// Edges to the module are redirected to another module.
    Replaced { by: ModuleIdentifier },
}

impl ModuleDecision {
    #[must_use]
    pub fn winner(&self) -> Option<&Candidate> {
        match self {
            Self::Selected { winner, .. } => Some(winner),
            Self::Replaced { .. } => None,
        }
    }
}

/// Collects the candidates of one traversal round and settles conflicts.
///
/// Each round starts from the retained candidates only, which are empty
/// unless [`ConflictHandler::retain_candidates`] was called. Resolving the
/// same sets with the same previous decisions always yields the same
/// decisions.
#[derive(Debug)]
pub struct ConflictHandler {
    resolver: VersionSelectionReasonResolver,
    replacements: ModuleReplacements,
    candidates: BTreeMap<ModuleIdentifier, Vec<Candidate>>,
    retained: BTreeMap<ModuleIdentifier, Vec<Candidate>>,
}

impl ConflictHandler {
    #[must_use]
    pub fn new(resolver: VersionSelectionReasonResolver, replacements: ModuleReplacements) -> Self {
        Self {
            resolver,
            replacements,
            candidates: BTreeMap::new(),
            retained: BTreeMap::new(),
        }
    }

    /// Forget the candidates of the previous round, keeping retained ones.
    pub fn begin_round(&mut self) {
        self.candidates = self.retained.clone();
    }

    /// Keep the current candidates in every later round.
    pub fn retain_candidates(&mut self) {
        self.retained = self.candidates.clone();
    }

    /// Record a candidate. Returns true if it had not been seen this round.
    pub fn register_candidate(&mut self, candidate: Candidate) -> bool {
        let known = self
            .candidates
            .entry(candidate.module_version.module.clone())
            .or_default();
        if known.contains(&candidate) {
            return false;
        }
        known.push(candidate);
        true
    }

    #[cfg(test)]
    pub(crate) fn candidates(&self, module: &ModuleIdentifier) -> &[Candidate] {
        self.candidates.get(module).map_or(&[], Vec::as_slice)
    }

    /// True when at least one module needs a decision.
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        self.candidates.values().any(|c| c.len() > 1) || !self.replacement_pairs().is_empty()
    }

    fn replacement_pairs(&self) -> Vec<(ModuleIdentifier, ModuleIdentifier)> {
        self.replacements
            .iter()
            .filter(|rule| {
                self.candidates.contains_key(&rule.module)
                    && self.candidates.contains_key(&rule.replaced_by)
            })
            .map(|rule| (rule.module, rule.replaced_by))
            .collect()
    }

    /// Decide every module that has competing candidates.
    ///
    /// Replacement rules apply first: when both a replaced module and its
    /// replacement were seen, the replaced module is redirected and the
    /// replacement's winner records the replacement in its reason.
    ///
    /// # Errors
    ///
    /// Returns every conflict the active resolver refused to settle.
    pub fn resolve_all(
        &self,
        previous: &BTreeMap<ModuleIdentifier, ModuleDecision>,
    ) -> Result<BTreeMap<ModuleIdentifier, ModuleDecision>, Vec<ResolveError>> {
        let mut decisions = BTreeMap::new();
        let mut replacing = BTreeSet::new();

        for (module, replaced_by) in self.replacement_pairs() {
            debug!(%module, %replaced_by, "module replaced");
            replacing.insert(replaced_by.clone());
            decisions.insert(module, ModuleDecision::Replaced { by: replaced_by });
        }

        let mut errors = Vec::new();
        for (module, candidates) in &self.candidates {
            if decisions.contains_key(module) {
                continue;
            }
            let is_replacement = replacing.contains(module);
            if candidates.len() < 2 && !is_replacement {
                continue;
            }

            let conflict = ConflictSet {
                module: module.clone(),
                candidates: candidates.clone(),
                previous: previous
                    .get(module)
                    .and_then(ModuleDecision::winner)
                    .map(|winner| winner.id.clone()),
            };
            match self.resolver.resolve(&conflict) {
                Ok(resolution) => {
                    let reason = if is_replacement {
                        resolution.reason.with_replacement()
                    } else {
                        resolution.reason
                    };
                    debug!(
                        %module,
                        winner = %resolution.winner.module_version,
                        candidates = candidates.len(),
                        %reason,
                        "conflict resolved"
                    );
                    decisions.insert(
                        module.clone(),
                        ModuleDecision::Selected {
                            winner: resolution.winner,
                            reason,
                        },
                    );
                }
                Err(error) => errors.push(error),
            }
        }

        if errors.is_empty() {
            Ok(decisions)
        } else {
            Err(errors)
        }
    }
}
