//! Component and artifact resolvers.
//!
//! Every resolver implements [`DependencyResolver`]. Concrete providers
//! ([`RepositoryResolver`], [`ProjectDependencyResolver`]) are aggregated by
//! a [`ResolverProviderChain`], which [`ResolverStack::assemble`] wraps in
//! decorators. From the outside in:
//!
//! 1. [`ErrorHandlingResolver`] turns panics into uniform failures
//! 2. [`ContextualResolver`] holds the exclusive-access lock for one call
//! 3. [`DependencySubstitutionResolver`] rewrites requested selectors
//! 4. [`ClientModuleResolver`] swaps in client module dependencies
//! 5. the chain itself, first non-NotFound answer wins

mod chain;
mod client_module;
mod contextual;
mod error_handling;
mod project;
mod repository;
mod substitution;

pub use chain::ResolverProviderChain;
pub use client_module::ClientModuleResolver;
pub use contextual::ContextualResolver;
pub use error_handling::ErrorHandlingResolver;
pub use project::ProjectDependencyResolver;
pub use repository::RepositoryResolver;
pub use substitution::DependencySubstitutionResolver;

use crate::error::ResolveFailure;
use crate::identity::{ComponentArtifactIdentifier, ComponentIdentifier, ModuleVersionIdentifier};
use crate::metadata::{ComponentMetadata, DependencyMetadata};
use crate::reason::SelectionReason;
use crate::strategy::ResolutionStrategy;
use parking_lot::Mutex;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome<T> {
    Resolved(T),
    /// Nothing found; lists the locations that were searched.
    NotFound(Vec<String>),
    /// A definitive failure. Outer layers must not try other sources.
    Failed(ResolveFailure),
}

impl<T> ResolveOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResolveOutcome<U> {
        match self {
            Self::Resolved(value) => ResolveOutcome::Resolved(f(value)),
            Self::NotFound(searched) => ResolveOutcome::NotFound(searched),
            Self::Failed(failure) => ResolveOutcome::Failed(failure),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    #[must_use]
    pub fn resolved(&self) -> Option<&T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::NotFound(_) | Self::Failed(_) => None,
        }
    }

    /// Convert into a `Result`, describing a miss against `target`.
    ///
    /// # Errors
    ///
    /// Returns the failure, or a not-found failure naming the searched locations.
    pub fn into_result(self, target: impl fmt::Display) -> Result<T, ResolveFailure> {
        match self {
            Self::Resolved(value) => Ok(value),
            Self::NotFound(searched) => Err(ResolveFailure::not_found(target, searched)),
            Self::Failed(failure) => Err(failure),
        }
    }
}

/// The component a dependency resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedId {
    pub id: ComponentIdentifier,
    pub module_version: ModuleVersionIdentifier,
    /// Why this component was picked for the dependency.
    pub reason: SelectionReason,
    /// Metadata, when producing the id already required it.
    pub metadata: Option<Arc<ComponentMetadata>>,
}

pub type IdResolveResult = ResolveOutcome<ResolvedId>;
pub type ComponentResolveResult = ResolveOutcome<Arc<ComponentMetadata>>;
pub type ArtifactResolveResult = ResolveOutcome<PathBuf>;

/// Resolves dependencies to components, components to metadata and
/// artifacts to files.
pub trait DependencyResolver: Send + Sync {
    fn resolve_id(&self, dependency: &DependencyMetadata) -> IdResolveResult;

    fn resolve_component(&self, id: &ComponentIdentifier) -> ComponentResolveResult;

    fn resolve_artifact(&self, artifact: &ComponentArtifactIdentifier) -> ArtifactResolveResult;
}

/// Composes the decorator layers around a provider chain.
pub struct ResolverStack;

impl ResolverStack {
    /// Wrap `chain` in the fixed decorator order.
    ///
    /// `exclusive` is the shared lock held for the duration of each call
    /// when some source requires exclusive access.
    #[must_use]
    pub fn assemble(
        chain: ResolverProviderChain,
        strategy: &ResolutionStrategy,
        exclusive: Option<Arc<Mutex<()>>>,
    ) -> Arc<dyn DependencyResolver> {
        let chain: Arc<dyn DependencyResolver> = Arc::new(chain);
        let client_modules = Arc::new(ClientModuleResolver::new(chain));
        let substitution = Arc::new(DependencySubstitutionResolver::new(
            client_modules,
            strategy.clone(),
        ));
        let contextual = Arc::new(ContextualResolver::new(substitution, exclusive));
        Arc::new(ErrorHandlingResolver::new(contextual))
    }
}
