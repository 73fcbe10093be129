use super::{ModuleSource, SourceError};
use crate::descriptor::{ComponentDescriptor, DESCRIPTOR_FILE};
use crate::identity::{
    ComponentArtifactIdentifier, ComponentIdentifier, ModuleIdentifier, ModuleVersionIdentifier,
};
use crate::metadata::ComponentMetadata;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// A repository laid out on disk.
///
/// ```text
/// <root>/<group>/<name>/<version>/component.toml
/// <root>/<group>/<name>/<version>/<artifact files>
/// ```
///
/// Artifacts with a declared `sha256` are verified every time they are
/// handed out.
#[derive(Debug, Clone)]
pub struct FileRepository {
    name: String,
    root: PathBuf,
}

impl FileRepository {
    #[must_use]
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn module_dir(&self, module: &ModuleIdentifier) -> PathBuf {
        self.root.join(&module.group).join(&module.name)
    }

    fn version_dir(&self, id: &ModuleVersionIdentifier) -> PathBuf {
        self.module_dir(&id.module).join(&id.version)
    }

    fn descriptor(&self, id: &ModuleVersionIdentifier) -> Result<Option<ComponentDescriptor>, SourceError> {
        let path = self.version_dir(id).join(DESCRIPTOR_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        trace!(path = %path.display(), "reading descriptor");
        Ok(Some(ComponentDescriptor::from_path(&path)?))
    }

    fn calculate_checksum(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }
}

impl ModuleSource for FileRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_versions(&self, module: &ModuleIdentifier) -> Result<Option<Vec<String>>, SourceError> {
        let dir = self.module_dir(module);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.path().join(DESCRIPTOR_FILE).is_file() {
                versions.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        versions.sort();
        Ok((!versions.is_empty()).then_some(versions))
    }

    fn component_metadata(
        &self,
        id: &ModuleVersionIdentifier,
    ) -> Result<Option<ComponentMetadata>, SourceError> {
        let Some(descriptor) = self.descriptor(id)? else {
            return Ok(None);
        };
        Ok(Some(descriptor.to_metadata()?))
    }

    fn artifact_file(
        &self,
        artifact: &ComponentArtifactIdentifier,
    ) -> Result<Option<PathBuf>, SourceError> {
        let ComponentIdentifier::Module { id } = &artifact.component else {
            return Ok(None);
        };
        let Some(descriptor) = self.descriptor(id)? else {
            return Ok(None);
        };

        let file_name = artifact.file_name();
        let path = self.version_dir(id).join(&file_name);
        if !path.is_file() {
            return Ok(None);
        }

        if let Some(expected) = descriptor.checksum_for(&file_name) {
            let actual = Self::calculate_checksum(&fs::read(&path)?);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(SourceError::ChecksumMismatch {
                    artifact: artifact.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn publish(root: &Path, group: &str, name: &str, version: &str, extra: &str) {
        let dir = root.join(group).join(name).join(version);
        fs::create_dir_all(&dir).unwrap();
        let descriptor = format!(
            "[component]\ngroup = \"{group}\"\nname = \"{name}\"\nversion = \"{version}\"\n{extra}"
        );
        fs::write(dir.join(DESCRIPTOR_FILE), descriptor).unwrap();
    }

    fn artifact(version: &str) -> ComponentArtifactIdentifier {
        ComponentArtifactIdentifier {
            component: ComponentIdentifier::module(ModuleVersionIdentifier::new(
                "org.example",
                "core",
                version,
            )),
            name: format!("core-{version}"),
            extension: "jar".into(),
            classifier: None,
        }
    }

    #[test]
    fn lists_versions_with_descriptors() {
        let temp = TempDir::new().unwrap();
        publish(temp.path(), "org.example", "core", "1.0", "");
        publish(temp.path(), "org.example", "core", "1.1", "");
        fs::create_dir_all(temp.path().join("org.example/core/not-a-version")).unwrap();

        let repo = FileRepository::new("files", temp.path());
        let module = ModuleIdentifier::new("org.example", "core");
        assert_eq!(repo.list_versions(&module).unwrap().unwrap(), vec!["1.0", "1.1"]);
        assert!(repo
            .list_versions(&ModuleIdentifier::new("org.example", "missing"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn reads_metadata() {
        let temp = TempDir::new().unwrap();
        publish(
            temp.path(),
            "org.example",
            "core",
            "1.0",
            "\n[[dependency]]\nmodule = \"org.example:util:1.+\"\n",
        );
        let repo = FileRepository::new("files", temp.path());
        let metadata = repo
            .component_metadata(&ModuleVersionIdentifier::new("org.example", "core", "1.0"))
            .unwrap()
            .unwrap();
        assert_eq!(metadata.dependencies.len(), 1);
        assert!(repo
            .component_metadata(&ModuleVersionIdentifier::new("org.example", "core", "9.9"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn invalid_descriptor_is_an_error() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("org/bad/1.0");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(DESCRIPTOR_FILE), "not toml [").unwrap();
        let repo = FileRepository::new("files", temp.path());
        assert!(matches!(
            repo.component_metadata(&ModuleVersionIdentifier::new("org", "bad", "1.0")),
            Err(SourceError::Descriptor(_))
        ));
    }

    #[test]
    fn verifies_artifact_checksums() {
        let temp = TempDir::new().unwrap();
        let extra = format!("\n[[artifact]]\nname = \"core-1.0\"\nsha256 = \"{EMPTY_SHA256}\"\n");
        publish(temp.path(), "org.example", "core", "1.0", &extra);
        let dir = temp.path().join("org.example/core/1.0");
        fs::write(dir.join("core-1.0.jar"), b"").unwrap();

        let repo = FileRepository::new("files", temp.path());
        let path = repo.artifact_file(&artifact("1.0")).unwrap().unwrap();
        assert_eq!(path, dir.join("core-1.0.jar"));

        fs::write(dir.join("core-1.0.jar"), b"tampered").unwrap();
        assert!(matches!(
            repo.artifact_file(&artifact("1.0")),
            Err(SourceError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn missing_artifact_is_none() {
        let temp = TempDir::new().unwrap();
        publish(temp.path(), "org.example", "core", "1.0", "");
        let repo = FileRepository::new("files", temp.path());
        assert!(repo.artifact_file(&artifact("1.0")).unwrap().is_none());
        assert!(repo.artifact_file(&artifact("2.0")).unwrap().is_none());
    }
}
