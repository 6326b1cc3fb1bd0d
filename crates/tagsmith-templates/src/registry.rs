/*
 * registry.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template registry and tag-name resolution.
//!
//! A [`Registry`] is an immutable snapshot of template definitions keyed by
//! (namespace path, name). Resolution never mutates it; changes go through
//! a [`RegistryBuilder`] which produces a new snapshot.

use crate::error::{TemplateError, TemplateResult};
use crate::model::{SubPath, TemplateDefinition, TemplateKey};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

/// More than one definition is equally close to the referencing template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguous {
    pub name: String,
    /// Namespace paths of every candidate, sorted
    pub candidates: Vec<SubPath>,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    definitions: BTreeMap<TemplateKey, Arc<TemplateDefinition>>,
    by_name: HashMap<String, Vec<TemplateKey>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Start a builder seeded with this snapshot's definitions.
    pub fn to_builder(&self) -> RegistryBuilder {
        RegistryBuilder {
            definitions: self.definitions.clone(),
        }
    }

    pub fn get(&self, key: &TemplateKey) -> Option<&Arc<TemplateDefinition>> {
        self.definitions.get(key)
    }

    /// All definitions ordered by namespace path and name.
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<TemplateDefinition>> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Whether any template is named `name`.
    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Resolve tag `name` referenced from a template in namespace `from`.
    ///
    /// An exact namespace match wins, then a unique strict descendant, then
    /// a unique strict ancestor. Anything else with several candidates is
    /// ambiguous.
    pub fn resolve(
        &self,
        from: &SubPath,
        name: &str,
    ) -> Result<Option<Arc<TemplateDefinition>>, Ambiguous> {
        let candidates: Vec<Arc<TemplateDefinition>> = self
            .by_name
            .get(name)
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| self.definitions.get(k).cloned())
                    .collect()
            })
            .unwrap_or_default();

        match candidates.as_slice() {
            [] => return Ok(None),
            [only] => return Ok(Some(only.clone())),
            _ => {}
        }

        if let Some(exact) = candidates.iter().find(|d| &d.sub_path == from) {
            return Ok(Some(exact.clone()));
        }

        let descendants: Vec<_> = candidates
            .iter()
            .filter(|d| d.sub_path.is_strict_descendant_of(from))
            .collect();
        if let [only] = descendants.as_slice() {
            return Ok(Some((*only).clone()));
        }

        let ancestors: Vec<_> = candidates
            .iter()
            .filter(|d| d.sub_path.is_strict_ancestor_of(from))
            .collect();
        if let [only] = ancestors.as_slice() {
            return Ok(Some((*only).clone()));
        }

        let mut paths: Vec<SubPath> = candidates.iter().map(|d| d.sub_path.clone()).collect();
        paths.sort();
        Err(Ambiguous {
            name: name.to_string(),
            candidates: paths,
        })
    }
}

/// Mutable staging area for a new [`Registry`] snapshot.
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    definitions: BTreeMap<TemplateKey, Arc<TemplateDefinition>>,
}

impl RegistryBuilder {
    /// Add a definition; a second definition with the same namespace path
    /// and name is an error.
    pub fn register(&mut self, definition: TemplateDefinition) -> TemplateResult<()> {
        let key = definition.key();
        if let Some(previous) = self.definitions.get(&key) {
            return Err(TemplateError::DuplicateTemplate {
                file: definition.file.clone(),
                namespace: key.sub_path.to_string(),
                name: key.name,
                previous: previous.file.clone(),
            });
        }
        self.definitions.insert(key, Arc::new(definition));
        Ok(())
    }

    /// Add or silently replace a definition.
    pub fn replace(&mut self, definition: TemplateDefinition) {
        self.definitions.insert(definition.key(), Arc::new(definition));
    }

    /// Drop every definition that came from `file`; returns the removed keys.
    pub fn remove_file(&mut self, file: &Path) -> Vec<TemplateKey> {
        let removed: Vec<TemplateKey> = self
            .definitions
            .iter()
            .filter(|(_, d)| d.file == file)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &removed {
            self.definitions.remove(key);
        }
        removed
    }

    pub fn build(self) -> Registry {
        let mut by_name: HashMap<String, Vec<TemplateKey>> = HashMap::new();
        for key in self.definitions.keys() {
            by_name.entry(key.name.clone()).or_default().push(key.clone());
        }
        Registry {
            definitions: self.definitions,
            by_name,
        }
    }
}
