//! Metadata and artifact sources.
//!
//! A [`ModuleSource`] is the boundary to wherever components live: a
//! directory tree, a remote repository, or an in-memory fixture. Sources
//! answer three questions (which versions exist, what a version declares,
//! where an artifact file is) and report `Ok(None)` for anything they do
//! not hold.

mod file;
mod memory;

pub use file::FileRepository;
pub use memory::InMemoryRepository;

use crate::descriptor::DescriptorError;
use crate::identity::{ComponentArtifactIdentifier, ModuleIdentifier, ModuleVersionIdentifier};
use crate::metadata::ComponentMetadata;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by a source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid component descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("checksum verification failed for '{artifact}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        artifact: String,
        expected: String,
        actual: String,
    },

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// A repository of module components.
pub trait ModuleSource: Send + Sync {
    /// Display name used in failure messages.
    fn name(&self) -> &str;

    /// Versions of a module held by this source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be queried.
    fn list_versions(&self, module: &ModuleIdentifier) -> Result<Option<Vec<String>>, SourceError>;

    /// Metadata of one module version.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be queried or the metadata is invalid.
    fn component_metadata(
        &self,
        id: &ModuleVersionIdentifier,
    ) -> Result<Option<ComponentMetadata>, SourceError>;

    /// Local file for an artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be provided or fails verification.
    fn artifact_file(
        &self,
        artifact: &ComponentArtifactIdentifier,
    ) -> Result<Option<PathBuf>, SourceError>;

    /// Whether calls must be serialized with other exclusive sources.
    fn requires_exclusive_access(&self) -> bool {
        false
    }
}
