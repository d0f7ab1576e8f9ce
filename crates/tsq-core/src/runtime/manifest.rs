//! JSON manifest of every repository produced by a build.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{QuoteError, QuoteResult};
use crate::transform::repository::Repository;

/// Manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub repositories: Vec<Repository>,
}

impl Manifest {
    pub fn new(mut repositories: Vec<Repository>) -> Self {
        repositories.sort_by(|a, b| a.class.cmp(&b.class));
        Self {
            version: MANIFEST_VERSION,
            repositories,
        }
    }

    pub fn read(path: &Path) -> QuoteResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let manifest: Manifest = serde_json::from_str(&text)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(QuoteError::Config(format!(
                "{} has manifest version {}, expected {MANIFEST_VERSION}",
                path.display(),
                manifest.version
            )));
        }
        Ok(manifest)
    }

    pub fn write(&self, path: &Path) -> QuoteResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
