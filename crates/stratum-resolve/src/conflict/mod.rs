//! Version conflict detection and resolution.
//!
//! The graph builder registers every component version it sees with the
//! [`ConflictHandler`]. Once a traversal round settles, the handler applies
//! module replacement rules and resolves each module that has more than one
//! candidate, producing a [`ModuleDecision`] per module.

mod handler;
mod replacement;
mod resolver;

pub use handler::{ConflictHandler, ModuleDecision};
pub use replacement::{ModuleReplacement, ModuleReplacements, ReplacementError};
pub use resolver::{
    ConflictResolution, LatestModuleConflictResolver, ModuleConflictResolver,
    StrictConflictResolver, VersionSelectionReasonResolver,
};

use crate::identity::{ComponentIdentifier, ModuleIdentifier, ModuleVersionIdentifier};

/// One version of a module competing for selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub id: ComponentIdentifier,
    pub module_version: ModuleVersionIdentifier,
}

impl Candidate {
    #[must_use]
    pub fn new(id: ComponentIdentifier, module_version: ModuleVersionIdentifier) -> Self {
        Self { id, module_version }
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.module_version.version
    }
}

/// Candidates sharing a module identity, pending a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictSet {
    pub module: ModuleIdentifier,
    /// Distinct candidates in discovery order.
    pub candidates: Vec<Candidate>,
    /// The candidate currently selected in the graph, if any.
    pub previous: Option<ComponentIdentifier>,
}

impl ConflictSet {
    #[must_use]
    pub fn is_previous(&self, candidate: &Candidate) -> bool {
        self.previous.as_ref() == Some(&candidate.id)
    }
}
