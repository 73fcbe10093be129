//! Dependency graph construction.
//!
//! [`DependencyGraphBuilder`] traverses the declared dependencies of a root
//! component until every version conflict is settled, then emits the
//! accepted graph as ordered events to a [`DependencyGraphVisitor`]. Result
//! builders are visitors; several are fed from one traversal through a
//! [`CompositeDependencyGraphVisitor`].

mod builder;
mod state;

pub use builder::DependencyGraphBuilder;

use crate::error::{ResolveError, ResolveFailure};
use crate::identity::{ComponentIdentifier, ComponentSelector, ModuleVersionIdentifier};
use crate::metadata::ComponentMetadata;
use crate::reason::SelectionReason;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifies a node of one resolved graph. Node ids are assigned in
/// breadth-first order from the root, which is always node 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One configuration of a selected component.
#[derive(Debug, Clone)]
pub struct ResolvedGraphNode {
    pub id: NodeId,
    pub component: ComponentIdentifier,
    pub module_version: ModuleVersionIdentifier,
    pub metadata: Arc<ComponentMetadata>,
    pub configuration: String,
    /// Why the component was selected, merged over every incoming edge.
    pub reason: SelectionReason,
    pub is_root: bool,
}

/// Where a resolved edge points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeTarget {
    pub node: NodeId,
    pub component: ComponentIdentifier,
    pub module_version: ModuleVersionIdentifier,
}

/// An accepted dependency edge, or the failure that broke it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGraphEdge {
    pub from: NodeId,
    pub requested: ComponentSelector,
    pub target: Result<EdgeTarget, ResolveFailure>,
    pub reason: SelectionReason,
}

/// Receives the accepted graph.
///
/// Events arrive in a fixed order: `start` with the root, `visit_node` for
/// every node, `visit_edges` with the outgoing edges of every node, then
/// `finish`. Visitors cannot influence the traversal.
pub trait DependencyGraphVisitor {
    /// # Errors
    ///
    /// Returns an error if the visitor cannot record the event.
    fn start(&mut self, root: &ResolvedGraphNode) -> Result<(), ResolveError>;

    /// # Errors
    ///
    /// Returns an error if the visitor cannot record the event.
    fn visit_node(&mut self, node: &ResolvedGraphNode) -> Result<(), ResolveError>;

    /// # Errors
    ///
    /// Returns an error if the visitor cannot record the event.
    fn visit_edges(
        &mut self,
        node: &ResolvedGraphNode,
        edges: &[ResolvedGraphEdge],
    ) -> Result<(), ResolveError>;

    /// # Errors
    ///
    /// Returns an error if the visitor cannot record the event.
    fn finish(&mut self, root: &ResolvedGraphNode) -> Result<(), ResolveError>;
}

/// Forwards every event to each visitor in turn.
#[derive(Default)]
pub struct CompositeDependencyGraphVisitor<'a> {
    visitors: Vec<&'a mut dyn DependencyGraphVisitor>,
}

impl<'a> CompositeDependencyGraphVisitor<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, visitor: &'a mut dyn DependencyGraphVisitor) -> Self {
        self.visitors.push(visitor);
        self
    }
}

impl DependencyGraphVisitor for CompositeDependencyGraphVisitor<'_> {
    fn start(&mut self, root: &ResolvedGraphNode) -> Result<(), ResolveError> {
        self.visitors.iter_mut().try_for_each(|v| v.start(root))
    }

    fn visit_node(&mut self, node: &ResolvedGraphNode) -> Result<(), ResolveError> {
        self.visitors.iter_mut().try_for_each(|v| v.visit_node(node))
    }

    fn visit_edges(
        &mut self,
        node: &ResolvedGraphNode,
        edges: &[ResolvedGraphEdge],
    ) -> Result<(), ResolveError> {
        self.visitors
            .iter_mut()
            .try_for_each(|v| v.visit_edges(node, edges))
    }

    fn finish(&mut self, root: &ResolvedGraphNode) -> Result<(), ResolveError> {
        self.visitors.iter_mut().try_for_each(|v| v.finish(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl DependencyGraphVisitor for Recorder {
        fn start(&mut self, root: &ResolvedGraphNode) -> Result<(), ResolveError> {
            self.events.push(format!("start {}", root.id));
            Ok(())
        }

        fn visit_node(&mut self, node: &ResolvedGraphNode) -> Result<(), ResolveError> {
            self.events.push(format!("node {}", node.id));
            Ok(())
        }

        fn visit_edges(
            &mut self,
            node: &ResolvedGraphNode,
            edges: &[ResolvedGraphEdge],
        ) -> Result<(), ResolveError> {
            self.events.push(format!("edges {} {}", node.id, edges.len()));
            Ok(())
        }

        fn finish(&mut self, root: &ResolvedGraphNode) -> Result<(), ResolveError> {
            self.events.push(format!("finish {}", root.id));
            Ok(())
        }
    }

    #[test]
    fn composite_fans_out_in_order() {
        let id = ModuleVersionIdentifier::new("org", "app", "1.0");
        let root = ResolvedGraphNode {
            id: NodeId(0),
            component: ComponentIdentifier::module(id.clone()),
            module_version: id.clone(),
            metadata: Arc::new(ComponentMetadata::for_module(id)),
            configuration: "default".into(),
            reason: SelectionReason::ROOT,
            is_root: true,
        };

        let mut first = Recorder::default();
        let mut second = Recorder::default();
        {
            let mut composite = CompositeDependencyGraphVisitor::new()
                .with(&mut first)
                .with(&mut second);
            composite.start(&root).unwrap();
            composite.visit_node(&root).unwrap();
            composite.visit_edges(&root, &[]).unwrap();
            composite.finish(&root).unwrap();
        }
        let expected = vec!["start #0", "node #0", "edges #0 0", "finish #0"];
        assert_eq!(first.events, expected);
        assert_eq!(second.events, expected);
    }
}
