use super::{ModuleSource, SourceError};
use crate::identity::{ComponentArtifactIdentifier, ModuleIdentifier, ModuleVersionIdentifier};
use crate::metadata::ComponentMetadata;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A source holding components in memory.
///
/// Modules marked as failing report [`SourceError::Unavailable`] for every
/// request, which makes backend failures reproducible in tests.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    name: String,
    components: BTreeMap<ModuleVersionIdentifier, ComponentMetadata>,
    files: BTreeMap<ComponentArtifactIdentifier, PathBuf>,
    failing: BTreeSet<ModuleIdentifier>,
    exclusive: bool,
    requests: AtomicUsize,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_component(mut self, metadata: ComponentMetadata) -> Self {
        self.components.insert(metadata.id.clone(), metadata);
        self
    }

    #[must_use]
    pub fn with_artifact_file(
        mut self,
        artifact: ComponentArtifactIdentifier,
        file: impl Into<PathBuf>,
    ) -> Self {
        self.files.insert(artifact, file.into());
        self
    }

    /// Every request for the module fails.
    #[must_use]
    pub fn failing(mut self, module: ModuleIdentifier) -> Self {
        self.failing.insert(module);
        self
    }

    #[must_use]
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Number of metadata and version-listing requests served so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    fn check(&self, module: &ModuleIdentifier) -> Result<(), SourceError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if self.failing.contains(module) {
            return Err(SourceError::Unavailable(format!(
                "{} cannot serve {module}",
                self.name
            )));
        }
        Ok(())
    }
}

impl ModuleSource for InMemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_versions(&self, module: &ModuleIdentifier) -> Result<Option<Vec<String>>, SourceError> {
        self.check(module)?;
        let versions: Vec<String> = self
            .components
            .keys()
            .filter(|id| &id.module == module)
            .map(|id| id.version.clone())
            .collect();
        Ok((!versions.is_empty()).then_some(versions))
    }

    fn component_metadata(
        &self,
        id: &ModuleVersionIdentifier,
    ) -> Result<Option<ComponentMetadata>, SourceError> {
        self.check(&id.module)?;
        Ok(self.components.get(id).cloned())
    }

    fn artifact_file(
        &self,
        artifact: &ComponentArtifactIdentifier,
    ) -> Result<Option<PathBuf>, SourceError> {
        Ok(self.files.get(artifact).cloned())
    }

    fn requires_exclusive_access(&self) -> bool {
        self.exclusive
    }
}
