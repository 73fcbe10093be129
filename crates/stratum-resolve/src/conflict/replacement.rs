//! Module replacement rules.

use crate::identity::ModuleIdentifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplacementError {
    #[error("module {0} cannot replace itself")]
    SelfReplacement(ModuleIdentifier),

    #[error("module {module} is already replaced by {existing}")]
    AlreadyReplaced {
        module: ModuleIdentifier,
        existing: ModuleIdentifier,
    },
}

/// One declared replacement: `module` is superseded by `replaced_by`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReplacement {
    pub module: ModuleIdentifier,
    pub replaced_by: ModuleIdentifier,
}

/// All replacement rules of a build, keyed by the replaced module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleReplacements {
    rules: BTreeMap<ModuleIdentifier, ModuleIdentifier>,
}

impl ModuleReplacements {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `module` is replaced by `replaced_by`.
    ///
    /// # Errors
    ///
    /// Returns an error if the module replaces itself or already has a
    /// different replacement.
    pub fn add(
        &mut self,
        module: ModuleIdentifier,
        replaced_by: ModuleIdentifier,
    ) -> Result<(), ReplacementError> {
        if module == replaced_by {
            return Err(ReplacementError::SelfReplacement(module));
        }
        match self.rules.get(&module) {
            Some(existing) if existing != &replaced_by => Err(ReplacementError::AlreadyReplaced {
                module,
                existing: existing.clone(),
            }),
            _ => {
                self.rules.insert(module, replaced_by);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn replacement_for(&self, module: &ModuleIdentifier) -> Option<&ModuleIdentifier> {
        self.rules.get(module)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ModuleReplacement> + '_ {
        self.rules.iter().map(|(module, replaced_by)| ModuleReplacement {
            module: module.clone(),
            replaced_by: replaced_by.clone(),
        })
    }
}

impl TryFrom<Vec<ModuleReplacement>> for ModuleReplacements {
    type Error = ReplacementError;

    fn try_from(replacements: Vec<ModuleReplacement>) -> Result<Self, Self::Error> {
        let mut rules = Self::new();
        for replacement in replacements {
            rules.add(replacement.module, replacement.replaced_by)?;
        }
        Ok(rules)
    }
}
