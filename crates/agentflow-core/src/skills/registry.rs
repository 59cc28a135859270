//! In-memory catalog of skills keyed by name.
//!
//! Read-mostly after startup: lookups take the read lock, registration
//! takes the write lock so a half-registered entry is never observed.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use crate::error::FlowError;
use crate::skills::{Skill, SkillDescriptor};

pub struct SkillRegistry {
    skills: RwLock<HashMap<String, Arc<dyn Skill>>>,
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self {
            skills: RwLock::new(HashMap::new()),
        }
    }

    /// Register a skill under its descriptor name, replacing any previous
    /// skill with the same name.
    pub fn register(&self, skill: Arc<dyn Skill>) {
        let name = skill.name().to_string();
        let replaced = self
            .skills
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), skill)
            .is_some();
        if replaced {
            tracing::info!("[SkillRegistry] Replaced skill: {}", name);
        } else {
            tracing::info!("[SkillRegistry] Registered skill: {}", name);
        }
    }

    fn catalog(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn Skill>>> {
        self.skills.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Convenience wrapper around [`register`](Self::register) for owned skills.
    pub fn register_skill<S: Skill + 'static>(&self, skill: S) {
        self.register(Arc::new(skill));
    }

    /// Look up a skill by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Skill>, FlowError> {
        self.catalog()
            .get(name)
            .cloned()
            .ok_or_else(|| FlowError::NotFound(format!("skill '{}'", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.catalog().contains_key(name)
    }

    /// Descriptor of a single skill, without handing out the executable.
    pub fn descriptor(&self, name: &str) -> Option<SkillDescriptor> {
        self.catalog()
            .get(name)
            .map(|skill| skill.descriptor().clone())
    }

    /// Descriptors of every registered skill, sorted by name.
    pub fn list(&self) -> Vec<SkillDescriptor> {
        let mut descriptors: Vec<SkillDescriptor> = self
            .catalog()
            .values()
            .map(|skill| skill.descriptor().clone())
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.skills
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.catalog().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
