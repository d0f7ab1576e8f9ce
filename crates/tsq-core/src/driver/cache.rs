//! Incremental build cache kept in the output directory.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::driver::filesystem::hash_bytes;
use crate::errors::QuoteResult;
use crate::transform::pass::PassOptions;
use crate::transform::repository::Repository;

pub const CACHE_FILE: &str = ".tsq-cache.json";

const CACHE_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFile {
    pub content_hash: String,
    pub repositories: Vec<Repository>,
}

/// Content hashes and repositories of the last successful build, per file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCache {
    version: u32,
    /// Fingerprint of the options the entries were produced with.
    options: String,
    files: BTreeMap<String, CachedFile>,
}

fn options_fingerprint(options: &PassOptions) -> String {
    hash_bytes(
        format!(
            "{}\0{}\0{}",
            env!("CARGO_PKG_VERSION"),
            options.marker,
            options.register_call
        )
        .as_bytes(),
    )
}

impl BuildCache {
    pub fn new(options: &PassOptions) -> Self {
        Self {
            version: CACHE_VERSION,
            options: options_fingerprint(options),
            files: BTreeMap::new(),
        }
    }

    /// Load the cache at `path`. A missing, unreadable, or stale cache
    /// yields an empty one.
    pub fn load(path: &Path, options: &PassOptions) -> Self {
        let fresh = Self::new(options);
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return fresh,
        };
        match serde_json::from_str::<BuildCache>(&text) {
            Ok(cache) if cache.version == fresh.version && cache.options == fresh.options => cache,
            Ok(_) => {
                debug!(path = %path.display(), "discarding cache built with other options");
                fresh
            }
            Err(err) => {
                warn!(path = %path.display(), "discarding corrupt cache: {err}");
                fresh
            }
        }
    }

    pub fn save(&self, path: &Path) -> QuoteResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    /// The cached entry for `relative` if its content hash still matches.
    pub fn fresh(&self, relative: &str, content_hash: &str) -> Option<&CachedFile> {
        self.files
            .get(relative)
            .filter(|entry| entry.content_hash == content_hash)
    }

    pub fn update(&mut self, relative: &str, content_hash: String, repositories: Vec<Repository>) {
        self.files.insert(
            relative.to_string(),
            CachedFile {
                content_hash,
                repositories,
            },
        );
    }

    pub fn remove(&mut self, relative: &str) {
        self.files.remove(relative);
    }

    /// Drop entries for files no longer part of the build.
    pub fn retain_paths(&mut self, live: &HashSet<&str>) {
        self.files.retain(|path, _| live.contains(path.as_str()));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
