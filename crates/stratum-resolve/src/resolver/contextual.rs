use super::{ArtifactResolveResult, ComponentResolveResult, DependencyResolver, IdResolveResult};
use crate::identity::{ComponentArtifactIdentifier, ComponentIdentifier};
use crate::metadata::DependencyMetadata;
use parking_lot::Mutex;
use std::sync::Arc;

/// Serializes calls into sources that require exclusive access.
///
/// The lock is shared by every request of a resolver and held for exactly
/// one call; the guard is released on every exit path, unwinding included.
/// Without a lock calls go straight through.
pub struct ContextualResolver {
    inner: Arc<dyn DependencyResolver>,
    lock: Option<Arc<Mutex<()>>>,
}

impl ContextualResolver {
    #[must_use]
    pub fn new(inner: Arc<dyn DependencyResolver>, lock: Option<Arc<Mutex<()>>>) -> Self {
        Self { inner, lock }
    }

    fn scoped<T>(&self, call: impl FnOnce() -> T) -> T {
        let _guard = self.lock.as_ref().map(|lock| lock.lock());
        call()
    }
}

impl DependencyResolver for ContextualResolver {
    fn resolve_id(&self, dependency: &DependencyMetadata) -> IdResolveResult {
        self.scoped(|| self.inner.resolve_id(dependency))
    }

    fn resolve_component(&self, id: &ComponentIdentifier) -> ComponentResolveResult {
        self.scoped(|| self.inner.resolve_component(id))
    }

    fn resolve_artifact(&self, artifact: &ComponentArtifactIdentifier) -> ArtifactResolveResult {
        self.scoped(|| self.inner.resolve_artifact(artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ComponentSelector;
    use crate::resolver::{ErrorHandlingResolver, ResolveOutcome};

    struct LockWatcher {
        lock: Arc<Mutex<()>>,
    }

    impl DependencyResolver for LockWatcher {
        fn resolve_id(&self, _: &DependencyMetadata) -> IdResolveResult {
            assert!(self.lock.is_locked());
            ResolveOutcome::NotFound(Vec::new())
        }

        fn resolve_component(&self, _: &ComponentIdentifier) -> ComponentResolveResult {
            panic!("backend failure while locked")
        }

        fn resolve_artifact(&self, _: &ComponentArtifactIdentifier) -> ArtifactResolveResult {
            ResolveOutcome::NotFound(Vec::new())
        }
    }

    #[test]
    fn holds_lock_for_the_call() {
        let lock = Arc::new(Mutex::new(()));
        let resolver = ContextualResolver::new(
            Arc::new(LockWatcher { lock: lock.clone() }),
            Some(lock.clone()),
        );
        let dependency = DependencyMetadata::new(ComponentSelector::parse("org:a:1.0").unwrap());
        assert!(resolver.resolve_id(&dependency).is_not_found());
        assert!(!lock.is_locked());
    }

    #[test]
    fn releases_lock_on_panic() {
        let lock = Arc::new(Mutex::new(()));
        let contextual = ContextualResolver::new(
            Arc::new(LockWatcher { lock: lock.clone() }),
            Some(lock.clone()),
        );
        let resolver = ErrorHandlingResolver::new(Arc::new(contextual));
        let outcome = resolver.resolve_component(&ComponentIdentifier::project(":a"));
        assert!(matches!(outcome, ResolveOutcome::Failed(_)));
        assert!(!lock.is_locked());
    }
}
