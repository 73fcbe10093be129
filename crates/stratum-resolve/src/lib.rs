//! Dependency resolution engine for Stratum packages.
//!
//! This crate provides:
//! - Version comparison and dynamic version selectors
//! - A round-based dependency graph builder with pluggable conflict resolution
//! - Module replacement rules, dependency substitution and forced versions
//! - A decorated resolver chain over file and in-memory repositories
//! - Graph and flat results streamed through in-memory or temp-file stores
//! - Two-phase resolution: graph first, artifact files on demand
//! - `resolve.toml` settings

mod config;
mod conflict;
mod descriptor;
mod engine;
mod error;
mod exclude;
mod graph;
mod identity;
mod local;
mod metadata;
mod reason;
mod repository;
mod resolver;
mod result;
mod rules;
mod store;
mod strategy;
mod version;

pub use config::{
    ConfigError, ReplacementSection, RepositorySection, ResolveSettings, StrategySection,
    SubstitutionSection, SETTINGS_FILE,
};
pub use conflict::{
    Candidate, ConflictHandler, ConflictResolution, ConflictSet, LatestModuleConflictResolver,
    ModuleConflictResolver, ModuleDecision, ModuleReplacement, ModuleReplacements,
    ReplacementError, StrictConflictResolver, VersionSelectionReasonResolver,
};
pub use descriptor::{
    ArtifactSection, ComponentDescriptor, ComponentSection, ConfigurationSection,
    DependencySection, DescriptorError, DESCRIPTOR_FILE,
};
pub use engine::{
    ArtifactResults, CancellationFlag, DefaultDependencyResolver, ResolutionSession,
    ResolveContext, ResolveKind, ResolverResults,
};
pub use error::{ResolveError, ResolveException, ResolveFailure};
pub use exclude::{ExcludeRule, ModuleExclusion};
pub use graph::{
    CompositeDependencyGraphVisitor, DependencyGraphBuilder, DependencyGraphVisitor, EdgeTarget,
    NodeId, ResolvedGraphEdge, ResolvedGraphNode,
};
pub use identity::{
    ComponentArtifactIdentifier, ComponentIdentifier, ComponentSelector, CoordinateError,
    ModuleIdentifier, ModuleVersionIdentifier,
};
pub use local::{
    DetachedRoot, LocalComponentConverter, LocalComponentConverterChain, LocalSource,
    ProjectModel, UNSPECIFIED_VERSION,
};
pub use metadata::{
    ArtifactMetadata, ClientModule, ComponentMetadata, ConfigurationMetadata, DependencyMetadata,
    DEFAULT_CONFIGURATION,
};
pub use reason::SelectionReason;
pub use repository::{FileRepository, InMemoryRepository, ModuleSource, SourceError};
pub use resolver::{
    ArtifactResolveResult, ClientModuleResolver, ComponentResolveResult, ContextualResolver,
    DependencyResolver, DependencySubstitutionResolver, ErrorHandlingResolver, IdResolveResult,
    ProjectDependencyResolver, RepositoryResolver, ResolveOutcome, ResolvedId,
    ResolverProviderChain, ResolverStack,
};
pub use result::{
    ArtifactFailure, ArtifactSet, DependencyResult, DetachedArtifacts, LenientConfiguration,
    ProjectConfiguration, ResolutionResult, ResolvedArtifact, ResolvedArtifactResults,
    ResolvedArtifactsBuilder, ResolvedComponentResult, ResolvedConfiguration, ResolvedDependency,
    ResolvedGraphResults, ResolvedLocalComponentsResult, ResolvedLocalComponentsResultBuilder,
    StreamingResolutionResultBuilder, TransientConfigurationResults,
    TransientConfigurationResultsBuilder, TransientConfigurationResultsLoader,
    UnresolvedDependency,
};
pub use rules::{ComponentMetadataRule, GlobalDependencyResolutionRules, MetadataAction};
pub use store::{
    BinaryStore, FileBinaryStore, InMemoryBinaryStore, RecordStore, StoreError, StoreFactory,
    StoreHandle, StoreKind, StoreSet,
};
pub use strategy::{ConflictStrategy, DependencySubstitution, ResolutionStrategy, SubstitutionSource};
pub use version::{Version, VersionComparator, VersionSelector, VersionSelectorError};
