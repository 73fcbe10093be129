use crate::error::ResolveError;
use crate::graph::{DependencyGraphVisitor, ResolvedGraphEdge, ResolvedGraphNode};
use crate::identity::ComponentIdentifier;
use std::collections::BTreeSet;

/// A project configuration present in the graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProjectConfiguration {
    pub path: String,
    pub configuration: String,
}

/// Project configurations the build must produce before artifacts of the
/// request can be used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedLocalComponentsResult {
    project_configurations: BTreeSet<ProjectConfiguration>,
}

impl ResolvedLocalComponentsResult {
    pub fn resolved_project_configurations(&self) -> impl Iterator<Item = &ProjectConfiguration> {
        self.project_configurations.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.project_configurations.is_empty()
    }
}

/// Records the project nodes of the graph.
///
/// A disabled builder records nothing, for requests that do not build
/// project dependencies.
#[derive(Debug, Clone, Default)]
pub struct ResolvedLocalComponentsResultBuilder {
    enabled: bool,
    result: ResolvedLocalComponentsResult,
}

impl ResolvedLocalComponentsResultBuilder {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            result: ResolvedLocalComponentsResult::default(),
        }
    }

    #[must_use]
    pub fn complete(self) -> ResolvedLocalComponentsResult {
        self.result
    }
}

impl DependencyGraphVisitor for ResolvedLocalComponentsResultBuilder {
    fn start(&mut self, _root: &ResolvedGraphNode) -> Result<(), ResolveError> {
        Ok(())
    }

    fn visit_node(&mut self, node: &ResolvedGraphNode) -> Result<(), ResolveError> {
        if let (true, ComponentIdentifier::Project { path }) = (self.enabled, &node.component) {
            self.result.project_configurations.insert(ProjectConfiguration {
                path: path.clone(),
                configuration: node.configuration.clone(),
            });
        }
        Ok(())
    }

    fn visit_edges(&mut self, _: &ResolvedGraphNode, _: &[ResolvedGraphEdge]) -> Result<(), ResolveError> {
        Ok(())
    }

    fn finish(&mut self, _root: &ResolvedGraphNode) -> Result<(), ResolveError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;
    use crate::identity::ModuleVersionIdentifier;
    use crate::metadata::ComponentMetadata;
    use crate::reason::SelectionReason;
    use std::sync::Arc;

    fn project_node(path: &str, configuration: &str) -> ResolvedGraphNode {
        let id = ModuleVersionIdentifier::new("org", path.trim_start_matches(':'), "1.0");
        ResolvedGraphNode {
            id: NodeId(1),
            component: ComponentIdentifier::project(path),
            module_version: id.clone(),
            metadata: Arc::new(ComponentMetadata::new(ComponentIdentifier::project(path), id)),
            configuration: configuration.into(),
            reason: SelectionReason::REQUESTED,
            is_root: false,
        }
    }

    #[test]
    fn records_project_configurations() {
        let mut builder = ResolvedLocalComponentsResultBuilder::new(true);
        builder.visit_node(&project_node(":core", "default")).unwrap();
        builder.visit_node(&project_node(":core", "runtime")).unwrap();
        builder.visit_node(&project_node(":core", "default")).unwrap();
        let result = builder.complete();
        let recorded: Vec<_> = result
            .resolved_project_configurations()
            .map(|p| p.configuration.as_str())
            .collect();
        assert_eq!(recorded, vec!["default", "runtime"]);
    }

    #[test]
    fn disabled_builder_records_nothing() {
        let mut builder = ResolvedLocalComponentsResultBuilder::new(false);
        builder.visit_node(&project_node(":core", "default")).unwrap();
        assert!(builder.complete().is_empty());
    }
}
