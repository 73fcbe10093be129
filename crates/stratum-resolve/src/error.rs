//! Resolution errors.
//!
//! Two levels of failure exist:
//! - [`ResolveFailure`] is attached to a single dependency edge or artifact and
//!   never aborts traversal
//! - [`ResolveError`] aborts a whole request and is reported to the caller
//!   wrapped in a [`ResolveException`]

use crate::descriptor::DescriptorError;
use crate::identity::ModuleIdentifier;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure to resolve one dependency, component or artifact.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ResolveFailure {
    /// No source knows the requested target.
    #[error("could not find {target}{}", format_searched(.searched))]
    NotFound { target: String, searched: Vec<String> },

    /// A source failed while looking up the target.
    #[error("could not resolve {target} from {repository}: {message}")]
    Backend {
        target: String,
        repository: String,
        message: String,
    },

    /// The target component does not declare the requested configuration.
    #[error("{component} has no configuration '{configuration}'")]
    MissingConfiguration {
        component: String,
        configuration: String,
    },
}

impl ResolveFailure {
    /// Failure reported by a named source.
    #[must_use]
    pub fn backend(
        target: impl fmt::Display,
        repository: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self::Backend {
            target: target.to_string(),
            repository: repository.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn not_found(target: impl fmt::Display, searched: Vec<String>) -> Self {
        Self::NotFound {
            target: target.to_string(),
            searched,
        }
    }
}

fn format_searched(searched: &[String]) -> String {
    if searched.is_empty() {
        String::new()
    } else {
        format!("; searched in: {}", searched.join(", "))
    }
}

/// Errors that abort a resolve request.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Two versions of one module were requested under the strict strategy.
    #[error("conflict found for module {module}: {}", .versions.join(", "))]
    StrictConflict {
        module: ModuleIdentifier,
        versions: Vec<String>,
    },

    #[error("no candidates registered for module {module}")]
    EmptyConflict { module: ModuleIdentifier },

    /// No local converter accepts the source.
    #[error("unable to find a local converter for type {kind}")]
    UnconvertibleSource { kind: String },

    /// The root component does not declare the configuration being resolved.
    #[error("root component {component} has no configuration '{configuration}'")]
    MissingRootConfiguration {
        component: String,
        configuration: String,
    },

    /// A dependency could not be resolved (reported when the result is consumed).
    #[error("could not resolve {requested} (required by {from}): {failure}")]
    UnresolvedDependency {
        from: String,
        requested: String,
        failure: ResolveFailure,
    },

    /// An artifact could not be resolved in the artifact phase.
    #[error("could not resolve artifact {artifact}: {failure}")]
    ArtifactFailure {
        artifact: String,
        failure: ResolveFailure,
    },

    #[error("resolution was cancelled")]
    Cancelled,

    #[error("artifacts have already been resolved for this request")]
    SessionConsumed,

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Aggregated request-level failure.
#[derive(Debug)]
pub struct ResolveException {
    context: String,
    causes: Vec<ResolveError>,
}

impl ResolveException {
    #[must_use]
    pub fn new(context: impl Into<String>, causes: Vec<ResolveError>) -> Self {
        Self {
            context: context.into(),
            causes,
        }
    }

    /// The request the failure belongs to.
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    #[must_use]
    pub fn causes(&self) -> &[ResolveError] {
        &self.causes
    }

    #[must_use]
    pub fn into_causes(self) -> Vec<ResolveError> {
        self.causes
    }
}

impl fmt::Display for ResolveException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not resolve all dependencies for {}", self.context)?;
        for cause in &self.causes {
            write!(f, "\n  - {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolveException {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.causes
            .first()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_lists_searched_locations() {
        let failure = ResolveFailure::not_found("org:a:1.0", vec!["local".into(), "remote".into()]);
        assert_eq!(
            failure.to_string(),
            "could not find org:a:1.0; searched in: local, remote"
        );
        let bare = ResolveFailure::not_found("org:a:1.0", Vec::new());
        assert_eq!(bare.to_string(), "could not find org:a:1.0");
    }

    #[test]
    fn exception_lists_every_cause() {
        let exception = ResolveException::new(
            "configuration ':app:compile'",
            vec![
                ResolveError::StrictConflict {
                    module: ModuleIdentifier::new("org", "a"),
                    versions: vec!["1.0".into(), "2.0".into()],
                },
                ResolveError::Cancelled,
            ],
        );
        let message = exception.to_string();
        assert!(message.starts_with("could not resolve all dependencies for configuration ':app:compile'"));
        assert!(message.contains("conflict found for module org:a: 1.0, 2.0"));
        assert!(message.contains("resolution was cancelled"));
        assert_eq!(exception.causes().len(), 2);
    }

    #[test]
    fn failure_serde() {
        let failure = ResolveFailure::backend("org:a:1.0", "remote", "timed out");
        let json = serde_json::to_string(&failure).unwrap();
        let back: ResolveFailure = serde_json::from_str(&json).unwrap();
        assert_eq!(failure, back);
    }
}
