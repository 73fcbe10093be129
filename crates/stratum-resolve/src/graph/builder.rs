use super::state::{EdgeState, NodeKey, RoundGraph};
use super::{DependencyGraphVisitor, EdgeTarget, NodeId, ResolvedGraphEdge, ResolvedGraphNode};
use crate::conflict::{Candidate, ConflictHandler, ModuleDecision};
use crate::engine::CancellationFlag;
use crate::error::{ResolveError, ResolveFailure};
use crate::identity::{ComponentIdentifier, ModuleIdentifier};
use crate::metadata::{ClientModule, ComponentMetadata, DependencyMetadata};
use crate::reason::SelectionReason;
use crate::resolver::{ComponentResolveResult, DependencyResolver, IdResolveResult, ResolveOutcome};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

type Decisions = BTreeMap<ModuleIdentifier, ModuleDecision>;

/// Client modules declared on the edges of a round, per resolved component.
type ClientModules = BTreeMap<ComponentIdentifier, BTreeSet<ClientModule>>;

/// Builds the conflict-free dependency graph of a root component.
///
/// The graph is built in rounds. Each round is a breadth-first traversal
/// from the root that follows the module decisions of the previous round;
/// modules without a decision use the first candidate the round reached.
/// Only versions requested by edges of the current round compete in the
/// [`ConflictHandler`], and the previous decisions only break ties. Client
/// modules seen in a round replace the dependencies of their component in
/// the next round. When neither the decisions nor the client modules
/// change, the graph of that round is emitted, so edges reached only
/// through an evicted version disappear.
///
/// Resolver calls are memoized across rounds. If the inputs of a round
/// repeat without settling, every later round also keeps the candidates and
/// client modules of the rounds before it. Those sets only grow, so the
/// rounds reach a fixed point.
pub struct DependencyGraphBuilder {
    resolver: Arc<dyn DependencyResolver>,
    handler: ConflictHandler,
    cancel: CancellationFlag,
    ids: HashMap<DependencyMetadata, IdResolveResult>,
    components: HashMap<ComponentIdentifier, ComponentResolveResult>,
}

/// What a traversal round follows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RoundInput {
    decisions: Decisions,
    client_modules: ClientModules,
}

struct Round<'a> {
    root_module: &'a ModuleIdentifier,
    input: &'a RoundInput,
    tentative: HashMap<ModuleIdentifier, Candidate>,
    client_modules: ClientModules,
    overridden: HashMap<ComponentIdentifier, Arc<ComponentMetadata>>,
}

struct EdgeResolution {
    target: Result<(Candidate, Arc<ComponentMetadata>), ResolveFailure>,
    reason: SelectionReason,
}

impl DependencyGraphBuilder {
    #[must_use]
    pub fn new(
        resolver: Arc<dyn DependencyResolver>,
        handler: ConflictHandler,
        cancel: CancellationFlag,
    ) -> Self {
        Self {
            resolver,
            handler,
            cancel,
            ids: HashMap::new(),
            components: HashMap::new(),
        }
    }

    /// Resolve the graph of `root` in `configuration` and emit it to `visitor`.
    ///
    /// Failures to resolve individual dependencies are attached to their
    /// edges and do not stop the traversal.
    ///
    /// # Errors
    ///
    /// Returns every request-level failure: refused conflicts, cancellation,
    /// a missing root configuration, or a visitor error.
    pub fn resolve(
        &mut self,
        root: &ComponentMetadata,
        configuration: &str,
        visitor: &mut dyn DependencyGraphVisitor,
    ) -> Result<(), Vec<ResolveError>> {
        if root.configuration(configuration).is_none() {
            return Err(vec![ResolveError::MissingRootConfiguration {
                component: root.component_id.to_string(),
                configuration: configuration.to_string(),
            }]);
        }

        let root = Arc::new(root.clone());
        let root_module = root.id.module.clone();
        let pinned = ModuleDecision::Selected {
            winner: Candidate::new(root.component_id.clone(), root.id.clone()),
            reason: SelectionReason::ROOT,
        };
        self.components
            .insert(root.component_id.clone(), ResolveOutcome::Resolved(root.clone()));

        let mut input = RoundInput::default();
        input.decisions.insert(root_module.clone(), pinned.clone());
        let mut seen: Vec<RoundInput> = Vec::new();
        let mut retaining = false;
        let mut retained = ClientModules::new();

        let mut rounds = 0;
        loop {
            rounds += 1;
            self.handler.begin_round();
            let (graph, mut client_modules) = self
                .traverse(&root, configuration, &root_module, &input)
                .map_err(|e| vec![e])?;

            if retaining {
                self.handler.retain_candidates();
                for (id, modules) in client_modules {
                    retained.entry(id).or_default().extend(modules);
                }
                client_modules = retained.clone();
            }

            let mut decisions = if self.handler.has_conflicts() {
                self.handler.resolve_all(&input.decisions)?
            } else {
                Decisions::new()
            };
            decisions.insert(root_module.clone(), pinned.clone());
            debug!(
                round = rounds,
                nodes = graph.nodes().len(),
                decisions = decisions.len() - 1,
                client_modules = client_modules.len(),
                "traversal round complete"
            );

            let next = RoundInput {
                decisions,
                client_modules,
            };
            if next == input {
                return Self::emit(&graph, visitor).map_err(|e| vec![e]);
            }
            if !retaining {
                seen.push(input);
                if seen.contains(&next) {
                    debug!(round = rounds, "round inputs repeat, retaining candidates");
                    retaining = true;
                    seen.clear();
                }
            }
            input = next;
        }
    }

    fn traverse(
        &mut self,
        root: &Arc<ComponentMetadata>,
        configuration: &str,
        root_module: &ModuleIdentifier,
        input: &RoundInput,
    ) -> Result<(RoundGraph, ClientModules), ResolveError> {
        let mut graph = RoundGraph::new(
            NodeKey {
                component: root.component_id.clone(),
                configuration: configuration.to_string(),
            },
            root.clone(),
        );
        let mut round = Round {
            root_module,
            input,
            tentative: HashMap::new(),
            client_modules: ClientModules::new(),
            overridden: HashMap::new(),
        };
        let mut queue = VecDeque::from([0]);

        while let Some(index) = queue.pop_front() {
            if self.cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }

            let node = graph.node(index);
            if !node.expands(index == 0) {
                continue;
            }
            let metadata = node.metadata.clone();
            let node_configuration = node.key.configuration.clone();
            let exclusion = node.exclusion.with_rules(&metadata.excludes);

            let mut edges = Vec::new();
            for dependency in metadata.dependencies_for(&node_configuration) {
                if let Some(module) = dependency.selector.module_id() {
                    if exclusion.excludes(module) {
                        trace!(from = %metadata.component_id, %module, "dependency excluded");
                        continue;
                    }
                }

                let resolution = self.resolve_edge(dependency, &mut round);
                let target = resolution.target.and_then(|(selected, target_metadata)| {
                    let configuration = dependency.target_configuration.clone();
                    if target_metadata.configuration(&configuration).is_none() {
                        return Err(ResolveFailure::MissingConfiguration {
                            component: selected.id.to_string(),
                            configuration,
                        });
                    }
                    let (child, changed) = graph.join(
                        NodeKey {
                            component: selected.id,
                            configuration,
                        },
                        &target_metadata,
                        exclusion.with_rules(&dependency.excludes),
                        dependency.transitive,
                    );
                    if changed {
                        queue.push_back(child);
                    }
                    Ok(child)
                });

                if let Err(failure) = &target {
                    trace!(from = %metadata.component_id, requested = %dependency.selector, %failure, "dependency unresolved");
                }
                edges.push(EdgeState {
                    requested: dependency.selector.clone(),
                    target,
                    reason: resolution.reason,
                });
            }
            graph.set_edges(index, edges);
        }

        Ok((graph, round.client_modules))
    }

    fn resolve_edge(&mut self, dependency: &DependencyMetadata, round: &mut Round<'_>) -> EdgeResolution {
        let resolved = match self.resolve_id(dependency) {
            ResolveOutcome::Resolved(resolved) => resolved,
            ResolveOutcome::NotFound(searched) => {
                return EdgeResolution {
                    target: Err(ResolveFailure::not_found(&dependency.selector, searched)),
                    reason: SelectionReason::REQUESTED,
                }
            }
            ResolveOutcome::Failed(failure) => {
                return EdgeResolution {
                    target: Err(failure),
                    reason: SelectionReason::REQUESTED,
                }
            }
        };

        let candidate = Candidate::new(resolved.id.clone(), resolved.module_version.clone());
        let module = candidate.module_version.module.clone();
        let is_root = &module == round.root_module;

        match (&dependency.client_module, &resolved.metadata) {
            (Some(client_module), _) if !is_root => {
                round
                    .client_modules
                    .entry(resolved.id.clone())
                    .or_default()
                    .insert(client_module.clone());
            }
            (None, Some(metadata)) => {
                self.components
                    .entry(resolved.id.clone())
                    .or_insert_with(|| ResolveOutcome::Resolved(metadata.clone()));
            }
            _ => {}
        }

        if !is_root && self.handler.register_candidate(candidate.clone()) {
            trace!(candidate = %candidate.module_version, "candidate registered");
        }
        round
            .tentative
            .entry(module.clone())
            .or_insert_with(|| candidate.clone());

        let (selected, decision_reason) =
            select(&module, round).unwrap_or((candidate, SelectionReason::REQUESTED));
        let reason = resolved.reason.merge(decision_reason);
        let target = self
            .metadata_for(&selected.id, round)
            .map(|metadata| (selected, metadata));
        EdgeResolution { target, reason }
    }

    fn resolve_id(&mut self, dependency: &DependencyMetadata) -> IdResolveResult {
        if let Some(cached) = self.ids.get(dependency) {
            return cached.clone();
        }
        let outcome = self.resolver.resolve_id(dependency);
        self.ids.insert(dependency.clone(), outcome.clone());
        outcome
    }

    fn resolve_component(&mut self, id: &ComponentIdentifier) -> ComponentResolveResult {
        if let Some(cached) = self.components.get(id) {
            return cached.clone();
        }
        let outcome = self.resolver.resolve_component(id);
        self.components.insert(id.clone(), outcome.clone());
        outcome
    }

    /// The component's metadata in this round. Client modules the previous
    /// round declared for it replace its dependencies, merged in a fixed order.
    fn metadata_for(
        &mut self,
        id: &ComponentIdentifier,
        round: &mut Round<'_>,
    ) -> Result<Arc<ComponentMetadata>, ResolveFailure> {
        if let Some(metadata) = round.overridden.get(id) {
            return Ok(metadata.clone());
        }
        let metadata = self.resolve_component(id).into_result(id)?;
        let Some(client_modules) = round.input.client_modules.get(id) else {
            return Ok(metadata);
        };

        let mut dependencies: Vec<DependencyMetadata> = Vec::new();
        for dependency in client_modules.iter().flat_map(|m| &m.dependencies) {
            if !dependencies.contains(dependency) {
                dependencies.push(dependency.clone());
            }
        }
        trace!(component = %id, client_modules = client_modules.len(), "applying client modules");
        let metadata = Arc::new(metadata.with_dependencies(dependencies));
        round.overridden.insert(id.clone(), metadata.clone());
        Ok(metadata)
    }

    fn emit(graph: &RoundGraph, visitor: &mut dyn DependencyGraphVisitor) -> Result<(), ResolveError> {
        let mut reasons: HashMap<&ComponentIdentifier, SelectionReason> = HashMap::new();
        for node in graph.nodes() {
            for edge in &node.edges {
                if let Ok(target) = &edge.target {
                    let reason = reasons
                        .entry(&graph.node(*target).key.component)
                        .or_default();
                    *reason = reason.merge(edge.reason);
                }
            }
        }

        let root = resolved_node(graph, 0, &reasons);
        visitor.start(&root)?;
        for index in 0..graph.nodes().len() {
            visitor.visit_node(&resolved_node(graph, index, &reasons))?;
        }
        for (index, state) in graph.nodes().iter().enumerate() {
            let node = resolved_node(graph, index, &reasons);
            let edges: Vec<ResolvedGraphEdge> = state
                .edges
                .iter()
                .map(|edge| ResolvedGraphEdge {
                    from: node.id,
                    requested: edge.requested.clone(),
                    target: edge.target.clone().map(|target| {
                        let target_state = graph.node(target);
                        EdgeTarget {
                            node: NodeId(target),
                            component: target_state.key.component.clone(),
                            module_version: target_state.metadata.id.clone(),
                        }
                    }),
                    reason: edge.reason,
                })
                .collect();
            visitor.visit_edges(&node, &edges)?;
        }
        visitor.finish(&root)
    }
}

fn resolved_node(
    graph: &RoundGraph,
    index: usize,
    reasons: &HashMap<&ComponentIdentifier, SelectionReason>,
) -> ResolvedGraphNode {
    let node = graph.node(index);
    let is_root = index == 0;
    let reason = reasons
        .get(&node.key.component)
        .copied()
        .unwrap_or_default();
    ResolvedGraphNode {
        id: NodeId(index),
        component: node.key.component.clone(),
        module_version: node.metadata.id.clone(),
        metadata: node.metadata.clone(),
        configuration: node.key.configuration.clone(),
        reason: if is_root {
            reason.merge(SelectionReason::ROOT)
        } else {
            reason
        },
        is_root,
    }
}

/// The candidate edges to `module` must target this round, following
/// replacements.
fn select(module: &ModuleIdentifier, round: &Round<'_>) -> Option<(Candidate, SelectionReason)> {
    let mut current = module.clone();
    let mut seen = BTreeSet::new();
    loop {
        match round.input.decisions.get(&current) {
            Some(ModuleDecision::Replaced { by }) => {
                if !seen.insert(current.clone()) {
                    return None;
                }
                current = by.clone();
            }
            Some(ModuleDecision::Selected { winner, reason }) => {
                return Some((winner.clone(), *reason));
            }
            None => {
                return round
                    .tentative
                    .get(&current)
                    .map(|candidate| (candidate.clone(), SelectionReason::REQUESTED));
            }
        }
    }
}
