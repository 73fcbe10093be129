//! Resolve request orchestration.
//!
//! A request runs in two phases. [`DefaultDependencyResolver::resolve`]
//! builds the dependency graph and streams it into the result builders;
//! [`DefaultDependencyResolver::resolve_artifacts`] later consumes the
//! [`ResolutionSession`] left in the [`ResolverResults`] to resolve files.

use crate::conflict::{ConflictHandler, VersionSelectionReasonResolver};
use crate::error::{ResolveError, ResolveException};
use crate::graph::{CompositeDependencyGraphVisitor, DependencyGraphBuilder};
use crate::local::{LocalComponentConverterChain, LocalSource};
use crate::metadata::DEFAULT_CONFIGURATION;
use crate::repository::ModuleSource;
use crate::resolver::{
    DependencyResolver, ProjectDependencyResolver, RepositoryResolver, ResolverProviderChain,
    ResolverStack,
};
use crate::result::{
    DetachedArtifacts, LenientConfiguration, ResolutionResult,
    ResolvedArtifactsBuilder, ResolvedConfiguration, ResolvedGraphResults,
    ResolvedLocalComponentsResult, ResolvedLocalComponentsResultBuilder,
    StreamingResolutionResultBuilder, TransientConfigurationResultsBuilder,
    TransientConfigurationResultsLoader,
};
use crate::rules::GlobalDependencyResolutionRules;
use crate::store::StoreFactory;
use crate::strategy::ResolutionStrategy;
use crate::version::VersionComparator;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info_span};

/// Cooperative cancellation of a request, shared with whoever may cancel it.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What phase two produces for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveKind {
    /// The legacy flat view of a configuration.
    #[default]
    Configuration,
    /// A pass-through walk of the graph result.
    Detached,
}

/// One resolve request.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// Display name, used in errors and logs.
    pub name: String,
    pub root: LocalSource,
    pub configuration: String,
    pub strategy: ResolutionStrategy,
    pub kind: ResolveKind,
    pub cancel: CancellationFlag,
}

impl ResolveContext {
    #[must_use]
    pub fn new(name: impl Into<String>, root: LocalSource) -> Self {
        Self {
            name: name.into(),
            root,
            configuration: DEFAULT_CONFIGURATION.to_string(),
            strategy: ResolutionStrategy::default(),
            kind: ResolveKind::Configuration,
            cancel: CancellationFlag::new(),
        }
    }

    #[must_use]
    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = configuration.into();
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn detached(mut self) -> Self {
        self.kind = ResolveKind::Detached;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    fn exception(&self, error: ResolveError) -> ResolveException {
        ResolveException::new(&self.name, vec![error])
    }
}

/// State phase one leaves for phase two.
#[derive(Debug)]
pub struct ResolutionSession {
    kind: ResolveKind,
    graph_results: ResolvedGraphResults,
    flat: TransientConfigurationResultsLoader,
    artifacts: ResolvedArtifactsBuilder,
}

impl ResolutionSession {
    #[must_use]
    pub fn kind(&self) -> ResolveKind {
        self.kind
    }

    #[must_use]
    pub fn graph_results(&self) -> &ResolvedGraphResults {
        &self.graph_results
    }
}

/// What phase two produced.
#[derive(Debug)]
pub enum ArtifactResults {
    Configuration(ResolvedConfiguration),
    Detached(DetachedArtifacts),
}

/// Results of a request, filled in by both phases.
#[derive(Debug)]
pub struct ResolverResults {
    graph: Arc<ResolutionResult>,
    local_components: ResolvedLocalComponentsResult,
    session: Option<ResolutionSession>,
    artifacts: Option<ArtifactResults>,
}

impl ResolverResults {
    #[must_use]
    pub fn resolution_result(&self) -> &ResolutionResult {
        &self.graph
    }

    #[must_use]
    pub fn local_components(&self) -> &ResolvedLocalComponentsResult {
        &self.local_components
    }

    /// The phase-two state, until artifacts are resolved.
    #[must_use]
    pub fn session(&self) -> Option<&ResolutionSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn artifact_results(&self) -> Option<&ArtifactResults> {
        self.artifacts.as_ref()
    }

    #[must_use]
    pub fn resolved_configuration(&self) -> Option<&ResolvedConfiguration> {
        match &self.artifacts {
            Some(ArtifactResults::Configuration(configuration)) => Some(configuration),
            _ => None,
        }
    }

    #[must_use]
    pub fn detached_artifacts(&self) -> Option<&DetachedArtifacts> {
        match &self.artifacts {
            Some(ArtifactResults::Detached(artifacts)) => Some(artifacts),
            _ => None,
        }
    }
}

/// Resolves dependency graphs and their artifacts.
///
/// Configured once and read-only afterwards; any number of requests may
/// run through the same instance.
pub struct DefaultDependencyResolver {
    converters: LocalComponentConverterChain,
    projects: Vec<LocalSource>,
    providers: Vec<Arc<dyn DependencyResolver>>,
    store_factory: StoreFactory,
    comparator: VersionComparator,
    build_project_dependencies: bool,
    exclusive: Arc<Mutex<()>>,
}

impl Default for DefaultDependencyResolver {
    fn default() -> Self {
        Self {
            converters: LocalComponentConverterChain::default(),
            projects: Vec::new(),
            providers: Vec::new(),
            store_factory: StoreFactory::default(),
            comparator: VersionComparator::new(),
            build_project_dependencies: true,
            exclusive: Arc::new(Mutex::new(())),
        }
    }
}

impl DefaultDependencyResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_converters(mut self, converters: LocalComponentConverterChain) -> Self {
        self.converters = converters;
        self
    }

    /// Register a project of the build.
    #[must_use]
    pub fn with_project(mut self, project: LocalSource) -> Self {
        self.projects.push(project);
        self
    }

    /// Register a resolver consulted after projects and before repositories.
    #[must_use]
    pub fn with_resolver_provider(mut self, provider: Arc<dyn DependencyResolver>) -> Self {
        self.providers.push(provider);
        self
    }

    #[must_use]
    pub fn with_store_factory(mut self, store_factory: StoreFactory) -> Self {
        self.store_factory = store_factory;
        self
    }

    #[must_use]
    pub fn with_comparator(mut self, comparator: VersionComparator) -> Self {
        self.comparator = comparator;
        self
    }

    #[must_use]
    pub fn build_project_dependencies(mut self, build: bool) -> Self {
        self.build_project_dependencies = build;
        self
    }

    fn resolver_stack(
        &self,
        strategy: &ResolutionStrategy,
        repositories: &[Arc<dyn ModuleSource>],
        rules: &GlobalDependencyResolutionRules,
    ) -> Result<Arc<dyn DependencyResolver>, ResolveError> {
        let mut chain = ResolverProviderChain::new().with(Arc::new(ProjectDependencyResolver::build(
            &self.converters,
            &self.projects,
        )?));
        for provider in &self.providers {
            chain.push(provider.clone());
        }
        let rules = Arc::new(rules.clone());
        for repository in repositories {
            chain.push(Arc::new(RepositoryResolver::new(
                repository.clone(),
                self.comparator,
                rules.clone(),
            )));
        }

        let exclusive = repositories
            .iter()
            .any(|repository| repository.requires_exclusive_access())
            .then(|| self.exclusive.clone());
        Ok(ResolverStack::assemble(chain, strategy, exclusive))
    }

    /// Phase one: resolve the dependency graph of the request.
    ///
    /// Dependencies that cannot be resolved are recorded in the results
    /// rather than failing the request.
    ///
    /// # Errors
    ///
    /// Fails with every request-level cause: an unconvertible root, refused
    /// conflicts, cancellation, or a store failure.
    pub fn resolve(
        &self,
        context: &ResolveContext,
        repositories: &[Arc<dyn ModuleSource>],
        rules: &GlobalDependencyResolutionRules,
    ) -> Result<ResolverResults, ResolveException> {
        let span = info_span!("resolve", request = %context.name, configuration = %context.configuration);
        let _enter = span.enter();

        let root = self
            .converters
            .convert(&context.root)
            .map_err(|e| context.exception(e))?;
        let resolver = self
            .resolver_stack(&context.strategy, repositories, rules)
            .map_err(|e| context.exception(e))?;
        let handler = ConflictHandler::new(
            VersionSelectionReasonResolver::for_strategy(context.strategy.conflict, self.comparator),
            rules.module_replacements.clone(),
        );

        let mut stores = self.store_factory.store_set();
        let graph_store = stores
            .next_binary_store()
            .map_err(|e| context.exception(e.into()))?;
        let flat_store = stores
            .next_binary_store()
            .map_err(|e| context.exception(e.into()))?;

        let mut graph_builder = StreamingResolutionResultBuilder::new(graph_store, root.component_id.clone());
        let mut flat_builder = TransientConfigurationResultsBuilder::new(flat_store);
        let mut artifacts_builder = ResolvedArtifactsBuilder::new();
        let mut local_builder = ResolvedLocalComponentsResultBuilder::new(self.build_project_dependencies);
        {
            let mut visitor = CompositeDependencyGraphVisitor::new()
                .with(&mut graph_builder)
                .with(&mut flat_builder)
                .with(&mut artifacts_builder)
                .with(&mut local_builder);
            DependencyGraphBuilder::new(resolver, handler, context.cancel.clone())
                .resolve(&root, &context.configuration, &mut visitor)
                .map_err(|causes| ResolveException::new(&context.name, causes))?;
        }

        let (graph_results, flat) = flat_builder.complete();
        debug!(
            nodes = graph_results.node_count(),
            unresolved = graph_results.unresolved_dependencies().len(),
            "dependency graph resolved"
        );
        Ok(ResolverResults {
            graph: Arc::new(graph_builder.complete()),
            local_components: local_builder.complete(),
            session: Some(ResolutionSession {
                kind: context.kind,
                graph_results,
                flat,
                artifacts: artifacts_builder,
            }),
            artifacts: None,
        })
    }

    /// Phase two: resolve the artifacts of a resolved graph.
    ///
    /// Artifact failures are recorded per artifact in the results.
    ///
    /// # Errors
    ///
    /// Fails with [`ResolveError::SessionConsumed`] if artifacts were
    /// already resolved for these results, or if the stored flat result
    /// cannot be read.
    pub fn resolve_artifacts(
        &self,
        context: &ResolveContext,
        repositories: &[Arc<dyn ModuleSource>],
        rules: &GlobalDependencyResolutionRules,
        results: &mut ResolverResults,
    ) -> Result<(), ResolveException> {
        let span = info_span!("resolve_artifacts", request = %context.name);
        let _enter = span.enter();

        let session = results
            .session
            .take()
            .ok_or_else(|| context.exception(ResolveError::SessionConsumed))?;
        let resolver = self
            .resolver_stack(&context.strategy, repositories, rules)
            .map_err(|e| context.exception(e))?;

        let artifacts = match session.kind {
            ResolveKind::Configuration => {
                let flat = session
                    .flat
                    .load()
                    .map_err(|e| context.exception(e.into()))?;
                let resolved = session.artifacts.resolve(resolver.as_ref());
                ArtifactResults::Configuration(ResolvedConfiguration::new(
                    &context.name,
                    LenientConfiguration::new(flat, session.graph_results, resolved),
                ))
            }
            ResolveKind::Detached => ArtifactResults::Detached(DetachedArtifacts::new(
                results.graph.clone(),
                session.artifacts,
                resolver,
            )),
        };
        results.artifacts = Some(artifacts);
        Ok(())
    }
}
