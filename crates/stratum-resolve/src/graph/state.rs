use crate::error::ResolveFailure;
use crate::exclude::ModuleExclusion;
use crate::identity::{ComponentIdentifier, ComponentSelector};
use crate::metadata::ComponentMetadata;
use crate::reason::SelectionReason;
use std::collections::HashMap;
use std::sync::Arc;

/// A component in one of its configurations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct NodeKey {
    pub component: ComponentIdentifier,
    pub configuration: String,
}

#[derive(Debug)]
pub(crate) struct NodeState {
    pub key: NodeKey,
    pub metadata: Arc<ComponentMetadata>,
    /// Exclusions common to every path reaching this node.
    pub exclusion: ModuleExclusion,
    /// Whether any incoming edge follows transitive dependencies.
    pub transitive: bool,
    pub edges: Vec<EdgeState>,
}

impl NodeState {
    /// Whether the node's own dependencies are followed.
    pub fn expands(&self, is_root: bool) -> bool {
        is_root
            || (self.transitive
                && self
                    .metadata
                    .configuration(&self.key.configuration)
                    .map_or(true, |c| c.transitive))
    }
}

#[derive(Debug)]
pub(crate) struct EdgeState {
    pub requested: ComponentSelector,
    pub target: Result<usize, ResolveFailure>,
    pub reason: SelectionReason,
}

/// The nodes reached during one traversal round, in discovery order.
///
/// Path state only weakens as more paths join a node: exclusions shrink by
/// intersection and `transitive` only turns on. A node is re-expanded
/// whenever its path state changes, so edges of a round only ever grow.
#[derive(Debug)]
pub(crate) struct RoundGraph {
    nodes: Vec<NodeState>,
    index: HashMap<NodeKey, usize>,
}

impl RoundGraph {
    pub fn new(root: NodeKey, metadata: Arc<ComponentMetadata>) -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        };
        graph.join(root, &metadata, ModuleExclusion::nothing(), true);
        graph
    }

    /// Add a path to the node, creating it if needed. Returns the node index
    /// and whether the node must be (re-)expanded.
    pub fn join(
        &mut self,
        key: NodeKey,
        metadata: &Arc<ComponentMetadata>,
        exclusion: ModuleExclusion,
        transitive: bool,
    ) -> (usize, bool) {
        if let Some(&index) = self.index.get(&key) {
            let node = &mut self.nodes[index];
            let merged = node.exclusion.intersect(&exclusion);
            let transitive = node.transitive || transitive;
            let changed = merged != node.exclusion || transitive != node.transitive;
            node.exclusion = merged;
            node.transitive = transitive;
            return (index, changed);
        }

        let index = self.nodes.len();
        self.index.insert(key.clone(), index);
        self.nodes.push(NodeState {
            key,
            metadata: metadata.clone(),
            exclusion,
            transitive,
            edges: Vec::new(),
        });
        (index, true)
    }

    pub fn node(&self, index: usize) -> &NodeState {
        &self.nodes[index]
    }

    pub fn set_edges(&mut self, index: usize, edges: Vec<EdgeState>) {
        self.nodes[index].edges = edges;
    }

    pub fn nodes(&self) -> &[NodeState] {
        &self.nodes
    }
}
