//! Results of a resolve request.
//!
//! One traversal feeds several builders:
//! - [`StreamingResolutionResultBuilder`] writes the graph-shaped
//!   [`ResolutionResult`] to a binary store
//! - [`TransientConfigurationResultsBuilder`] writes the flat legacy model
//!   to a second store, replayed into a [`LenientConfiguration`] in phase two
//! - [`ResolvedArtifactsBuilder`] collects the artifact sets resolved in phase two
//! - [`ResolvedLocalComponentsResultBuilder`] records project configurations

mod artifacts;
mod flat;
mod graph;
mod lenient;
mod local;

pub use artifacts::{
    ArtifactFailure, ArtifactSet, DetachedArtifacts, ResolvedArtifact, ResolvedArtifactResults,
    ResolvedArtifactsBuilder,
};
pub use flat::{
    ResolvedDependency, ResolvedGraphResults, TransientConfigurationResults,
    TransientConfigurationResultsBuilder, TransientConfigurationResultsLoader, UnresolvedDependency,
};
pub use graph::{
    DependencyResult, ResolutionResult, ResolvedComponentResult, StreamingResolutionResultBuilder,
};
pub use lenient::{LenientConfiguration, ResolvedConfiguration};
pub use local::{
    ProjectConfiguration, ResolvedLocalComponentsResult, ResolvedLocalComponentsResultBuilder,
};
