//! Resolve settings (`resolve.toml`) parsing and validation.
//!
//! ```toml
//! [strategy]
//! conflict = "strict"
//! force = ["org.example:util:1.2"]
//!
//! [[substitution]]
//! requested = "org.legacy:*"
//! target = ":compat"
//!
//! [[replacement]]
//! module = "org.example:old-util"
//! replaced_by = "org.example:util"
//!
//! [[repository]]
//! name = "local"
//! path = "repo"
//!
//! [store]
//! kind = "temp-file"
//! ```

use crate::conflict::{ModuleReplacements, ReplacementError};
use crate::identity::{ComponentSelector, CoordinateError, ModuleIdentifier, ModuleVersionIdentifier};
use crate::repository::{FileRepository, ModuleSource};
use crate::rules::GlobalDependencyResolutionRules;
use crate::store::{StoreFactory, StoreKind};
use crate::strategy::{ConflictStrategy, DependencySubstitution, ResolutionStrategy, SubstitutionSource};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Conventional settings file name.
pub const SETTINGS_FILE: &str = "resolve.toml";

/// Errors that can occur when loading resolve settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid coordinate: {0}")]
    Coordinate(#[from] CoordinateError),

    #[error("invalid replacement: {0}")]
    Replacement(#[from] ReplacementError),

    #[error("duplicate repository name: {0}")]
    DuplicateRepository(String),

    #[error("invalid repository '{name}': {reason}")]
    InvalidRepository { name: String, reason: String },

    #[error("invalid substitution '{requested}': {reason}")]
    InvalidSubstitution { requested: String, reason: String },
}

/// The complete settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveSettings {
    #[serde(default)]
    pub strategy: StrategySection,

    #[serde(default, rename = "substitution", skip_serializing_if = "Vec::is_empty")]
    pub substitutions: Vec<SubstitutionSection>,

    #[serde(default, rename = "replacement", skip_serializing_if = "Vec::is_empty")]
    pub replacements: Vec<ReplacementSection>,

    #[serde(default, rename = "repository", skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<RepositorySection>,

    #[serde(default)]
    pub store: StoreKind,

    /// Directory relative repository paths are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// `[strategy]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategySection {
    #[serde(default)]
    pub conflict: ConflictStrategy,

    /// Forced module versions in `group:name:version` notation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub force: Vec<String>,
}

/// `[[substitution]]`
///
/// `requested` is either a project path (`:core`) or a `group:name` pattern
/// with an optional exact version (`org.legacy:*`, `org:lib:1.0`).
/// `target` is a selector in `group:name:version` or project notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubstitutionSection {
    pub requested: String,
    pub target: String,
}

/// `[[replacement]]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplacementSection {
    pub module: String,
    pub replaced_by: String,
}

/// `[[repository]]`, a file repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositorySection {
    pub name: String,
    pub path: PathBuf,
}

impl ResolveSettings {
    /// Load settings from a file path.
    ///
    /// Relative repository paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut settings = Self::parse(&content)?;
        settings.base_dir = path.parent().map(Path::to_path_buf);
        Ok(settings)
    }

    /// Parse settings from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.strategy()?;
        self.rules()?;
        self.validate_repositories()?;
        Ok(())
    }

    fn validate_repositories(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for repository in &self.repositories {
            if repository.name.trim().is_empty() {
                return Err(ConfigError::InvalidRepository {
                    name: repository.name.clone(),
                    reason: "name cannot be empty".to_string(),
                });
            }
            if repository.path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidRepository {
                    name: repository.name.clone(),
                    reason: "path cannot be empty".to_string(),
                });
            }
            if !names.insert(repository.name.as_str()) {
                return Err(ConfigError::DuplicateRepository(repository.name.clone()));
            }
        }
        Ok(())
    }

    /// The resolution strategy these settings describe.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed forced versions or substitutions.
    pub fn strategy(&self) -> Result<ResolutionStrategy, ConfigError> {
        let mut strategy = ResolutionStrategy {
            conflict: self.strategy.conflict,
            ..ResolutionStrategy::default()
        };
        for notation in &self.strategy.force {
            strategy = strategy.force(ModuleVersionIdentifier::parse(notation)?);
        }
        for substitution in &self.substitutions {
            strategy = strategy.substitute(substitution.to_substitution()?);
        }
        Ok(strategy)
    }

    /// Build-wide rules: module replacements.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed or contradictory replacements.
    pub fn rules(&self) -> Result<GlobalDependencyResolutionRules, ConfigError> {
        let mut replacements = ModuleReplacements::new();
        for replacement in &self.replacements {
            replacements.add(
                ModuleIdentifier::parse(&replacement.module)?,
                ModuleIdentifier::parse(&replacement.replaced_by)?,
            )?;
        }
        Ok(GlobalDependencyResolutionRules::new().with_replacements(replacements))
    }

    /// The declared file repositories, in declaration order.
    #[must_use]
    pub fn repositories(&self) -> Vec<Arc<dyn ModuleSource>> {
        self.repositories
            .iter()
            .map(|repository| {
                let root = match &self.base_dir {
                    Some(base) if repository.path.is_relative() => base.join(&repository.path),
                    _ => repository.path.clone(),
                };
                Arc::new(FileRepository::new(&repository.name, root)) as Arc<dyn ModuleSource>
            })
            .collect()
    }

    #[must_use]
    pub fn store_factory(&self) -> StoreFactory {
        StoreFactory::new(self.store.clone())
    }
}

impl SubstitutionSection {
    fn to_substitution(&self) -> Result<DependencySubstitution, ConfigError> {
        let requested = self.requested.trim();
        let source = if requested.starts_with(':') {
            SubstitutionSource::Project {
                path: requested.to_string(),
            }
        } else {
            let parts: Vec<&str> = requested.split(':').collect();
            if !(2..=3).contains(&parts.len()) || parts.iter().any(|p| p.is_empty()) {
                return Err(ConfigError::InvalidSubstitution {
                    requested: self.requested.clone(),
                    reason: "expected a project path or group:name[:version]".to_string(),
                });
            }
            SubstitutionSource::Module {
                group: parts[0].to_string(),
                name: parts[1].to_string(),
                version: parts.get(2).map(|v| (*v).to_string()),
            }
        };
        Ok(DependencySubstitution::new(
            source,
            ComponentSelector::parse(&self.target)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let settings = ResolveSettings::parse("").unwrap();
        assert_eq!(settings.strategy.conflict, ConflictStrategy::Latest);
        assert!(settings.repositories().is_empty());
        assert_eq!(settings.store_factory().kind(), &StoreKind::Memory);
        assert!(!settings.strategy().unwrap().has_rules());
    }

    #[test]
    fn parse_full() {
        let toml = r#"
[strategy]
conflict = "strict"
force = ["org:util:1.2"]

[[substitution]]
requested = "org.legacy:*"
target = ":compat"

[[substitution]]
requested = ":old"
target = "org:new:2.0"

[[replacement]]
module = "org:old-util"
replaced_by = "org:util"

[[repository]]
name = "local"
path = "/srv/repo"

[store]
kind = "temp-file"
"#;
        let settings = ResolveSettings::parse(toml).unwrap();
        let strategy = settings.strategy().unwrap();
        assert_eq!(strategy.conflict, ConflictStrategy::Strict);
        assert_eq!(strategy.forced[0].to_string(), "org:util:1.2");
        assert_eq!(strategy.substitutions.len(), 2);
        assert_eq!(
            strategy.substitutions[0].target,
            ComponentSelector::project(":compat")
        );
        assert!(strategy.substitutions[1]
            .requested
            .matches(&ComponentSelector::project(":old")));

        let rules = settings.rules().unwrap();
        let old = ModuleIdentifier::new("org", "old-util");
        assert_eq!(
            rules.module_replacements.replacement_for(&old),
            Some(&ModuleIdentifier::new("org", "util"))
        );

        let repositories = settings.repositories();
        assert_eq!(repositories.len(), 1);
        assert_eq!(repositories[0].name(), "local");
        assert_eq!(
            settings.store_factory().kind(),
            &StoreKind::TempFile { dir: None }
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ResolveSettings::parse("[strategy]\nconflicts = \"strict\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_force_notation() {
        let err = ResolveSettings::parse("[strategy]\nforce = [\"org:util\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Coordinate(_)));
    }

    #[test]
    fn self_replacement_is_rejected() {
        let toml = "[[replacement]]\nmodule = \"org:a\"\nreplaced_by = \"org:a\"\n";
        let err = ResolveSettings::parse(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Replacement(_)));
    }

    #[test]
    fn duplicate_repository_names() {
        let toml = r#"
[[repository]]
name = "local"
path = "a"

[[repository]]
name = "local"
path = "b"
"#;
        let err = ResolveSettings::parse(toml).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRepository(name) if name == "local"));
    }

    #[test]
    fn malformed_substitution() {
        let toml = "[[substitution]]\nrequested = \"org\"\ntarget = \":x\"\n";
        let err = ResolveSettings::parse(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSubstitution { .. }));
    }

    #[test]
    fn relative_repository_paths_follow_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "[[repository]]\nname = \"local\"\npath = \"repo\"\n").unwrap();

        let settings = ResolveSettings::from_path(&path).unwrap();
        let repository = &settings.repositories[0];
        assert_eq!(repository.path, PathBuf::from("repo"));
        assert_eq!(settings.repositories().len(), 1);
    }
}
