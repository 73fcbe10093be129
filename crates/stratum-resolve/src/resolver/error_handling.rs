use super::{
    ArtifactResolveResult, ComponentResolveResult, DependencyResolver, IdResolveResult,
    ResolveOutcome,
};
use crate::error::ResolveFailure;
use crate::identity::{ComponentArtifactIdentifier, ComponentIdentifier};
use crate::metadata::DependencyMetadata;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Outermost layer: a panicking backend becomes a [`ResolveFailure::Backend`]
/// for the call that triggered it.
pub struct ErrorHandlingResolver {
    inner: Arc<dyn DependencyResolver>,
}

impl ErrorHandlingResolver {
    #[must_use]
    pub fn new(inner: Arc<dyn DependencyResolver>) -> Self {
        Self { inner }
    }

    fn guarded<T>(
        &self,
        target: &dyn fmt::Display,
        call: impl FnOnce() -> ResolveOutcome<T>,
    ) -> ResolveOutcome<T> {
        catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            warn!(%target, %message, "resolver panicked");
            ResolveOutcome::Failed(ResolveFailure::backend(target, "resolver", message))
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl DependencyResolver for ErrorHandlingResolver {
    fn resolve_id(&self, dependency: &DependencyMetadata) -> IdResolveResult {
        self.guarded(&dependency.selector, || self.inner.resolve_id(dependency))
    }

    fn resolve_component(&self, id: &ComponentIdentifier) -> ComponentResolveResult {
        self.guarded(id, || self.inner.resolve_component(id))
    }

    fn resolve_artifact(&self, artifact: &ComponentArtifactIdentifier) -> ArtifactResolveResult {
        self.guarded(artifact, || self.inner.resolve_artifact(artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ComponentSelector;

    struct Panicking;

    impl DependencyResolver for Panicking {
        fn resolve_id(&self, _: &DependencyMetadata) -> IdResolveResult {
            panic!("metadata service exploded")
        }

        fn resolve_component(&self, _: &ComponentIdentifier) -> ComponentResolveResult {
            panic!("{}", String::from("formatted panic"))
        }

        fn resolve_artifact(&self, _: &ComponentArtifactIdentifier) -> ArtifactResolveResult {
            ResolveOutcome::NotFound(vec!["quiet".into()])
        }
    }

    #[test]
    fn panics_become_backend_failures() {
        let resolver = ErrorHandlingResolver::new(Arc::new(Panicking));
        let dependency = DependencyMetadata::new(ComponentSelector::parse("org:a:1.0").unwrap());
        match resolver.resolve_id(&dependency) {
            ResolveOutcome::Failed(ResolveFailure::Backend { target, message, .. }) => {
                assert_eq!(target, "org:a:1.0");
                assert_eq!(message, "metadata service exploded");
            }
            other => panic!("expected failure, got {other:?}"),
        }

        match resolver.resolve_component(&ComponentIdentifier::project(":a")) {
            ResolveOutcome::Failed(ResolveFailure::Backend { message, .. }) => {
                assert_eq!(message, "formatted panic");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn other_outcomes_pass_through() {
        let resolver = ErrorHandlingResolver::new(Arc::new(Panicking));
        let artifact = ComponentArtifactIdentifier {
            component: ComponentIdentifier::project(":a"),
            name: "a".into(),
            extension: "jar".into(),
            classifier: None,
        };
        assert_eq!(
            resolver.resolve_artifact(&artifact),
            ResolveOutcome::NotFound(vec!["quiet".into()])
        );
    }
}
