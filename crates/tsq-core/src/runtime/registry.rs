//! Process-wide registration and lookup of class repositories.
//!
//! Writes are serialised by the lock; reads take a shared guard and clone the
//! `Arc`, so callers never hold the lock while rendering templates.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::errors::{QuoteError, QuoteResult};
use crate::models::ClassId;
use crate::runtime::manifest::Manifest;
use crate::transform::repository::Repository;

/// Class-identity keyed association from class to repository.
#[derive(Debug, Default)]
pub struct QuotationRegistry {
    repositories: RwLock<HashMap<ClassId, Arc<Repository>>>,
}

impl QuotationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `repository` to `class`. A second registration for the same
    /// class replaces the first.
    pub fn register(&self, class: ClassId, repository: Repository) {
        let mut repositories = self.repositories.write();
        if repositories
            .insert(class.clone(), Arc::new(repository))
            .is_some()
        {
            debug!(class = %class, "replaced quotation repository");
        }
    }

    /// Register every repository under its own class identity.
    pub fn register_all(&self, repositories: impl IntoIterator<Item = Repository>) {
        let mut guard = self.repositories.write();
        for repository in repositories {
            guard.insert(repository.class.clone(), Arc::new(repository));
        }
    }

    pub fn lookup(&self, class: &ClassId) -> QuoteResult<Arc<Repository>> {
        self.repositories
            .read()
            .get(class)
            .cloned()
            .ok_or_else(|| QuoteError::NoRepositoryRegistered(class.qualified_name()))
    }

    pub fn contains(&self, class: &ClassId) -> bool {
        self.repositories.read().contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.repositories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.read().is_empty()
    }

    /// Registered classes, sorted.
    pub fn classes(&self) -> Vec<ClassId> {
        let mut classes: Vec<ClassId> = self.repositories.read().keys().cloned().collect();
        classes.sort();
        classes
    }

    /// Register every repository listed in a build manifest.
    pub fn load_manifest(&self, path: &Path) -> QuoteResult<usize> {
        let manifest = Manifest::read(path)?;
        let count = manifest.repositories.len();
        self.register_all(manifest.repositories);
        info!(path = %path.display(), repositories = count, "loaded quotation manifest");
        Ok(count)
    }
}

static GLOBAL: LazyLock<QuotationRegistry> = LazyLock::new(QuotationRegistry::new);

/// The process-wide registry.
pub fn global() -> &'static QuotationRegistry {
    &GLOBAL
}

pub fn register(class: ClassId, repository: Repository) {
    GLOBAL.register(class, repository);
}

pub fn lookup(class: &ClassId) -> QuoteResult<Arc<Repository>> {
    GLOBAL.lookup(class)
}

pub fn load_manifest(path: &Path) -> QuoteResult<usize> {
    GLOBAL.load_manifest(path)
}
