//! Build configuration: `tsq.json`, `tsconfig.json` fallback, environment
//! overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{QuoteError, QuoteResult};
use crate::models::{DEFAULT_MARKER, DEFAULT_REGISTER_CALL};
use crate::transform::pass::{validate_options, PassOptions};

pub const CONFIG_FILE: &str = "tsq.json";
pub const TSCONFIG_FILE: &str = "tsconfig.json";

/// Driver configuration. Paths are relative to the project directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuoteConfig {
    /// Base for output paths and module names.
    pub root_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Globs selecting input files, gitignore syntax.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub marker: String,
    pub register_call: String,
    /// Manifest file name inside `out_dir`; `null` disables it.
    pub manifest: Option<String>,
    pub workers: usize,
    pub incremental: bool,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            out_dir: PathBuf::from("dist"),
            include: vec!["src/**/*.ts".to_string()],
            exclude: vec!["node_modules".to_string()],
            marker: DEFAULT_MARKER.to_string(),
            register_call: DEFAULT_REGISTER_CALL.to_string(),
            manifest: Some("quotations.json".to_string()),
            workers: 4,
            incremental: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TsConfigFile {
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    compiler_options: Option<TsCompilerOptions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TsCompilerOptions {
    root_dir: Option<String>,
    out_dir: Option<String>,
}

impl QuoteConfig {
    /// Load an explicit `tsq.json`-shaped file.
    pub fn load(path: &Path) -> QuoteResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| QuoteError::Config(format!("failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| QuoteError::Config(format!("invalid {}: {e}", path.display())))
    }

    /// Overlay the relevant fields of a `tsconfig.json` on the defaults.
    pub fn from_tsconfig(path: &Path) -> QuoteResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| QuoteError::Config(format!("failed to read {}: {e}", path.display())))?;
        let tsconfig: TsConfigFile = serde_json::from_str(&text)
            .map_err(|e| QuoteError::Config(format!("invalid {}: {e}", path.display())))?;

        let mut config = Self::default();
        if let Some(include) = tsconfig.include {
            config.include = include;
        }
        if let Some(exclude) = tsconfig.exclude {
            config.exclude = exclude;
        }
        if let Some(options) = tsconfig.compiler_options {
            if let Some(root_dir) = options.root_dir {
                config.root_dir = PathBuf::from(root_dir);
            }
            if let Some(out_dir) = options.out_dir {
                config.out_dir = PathBuf::from(out_dir);
            }
        }
        Ok(config)
    }

    /// Find the configuration of `project`: `tsq.json`, then `tsconfig.json`,
    /// then defaults. Environment overrides apply to all three.
    pub fn discover(project: &Path) -> QuoteResult<Self> {
        let own = project.join(CONFIG_FILE);
        let tsconfig = project.join(TSCONFIG_FILE);
        let mut config = if own.is_file() {
            debug!(path = %own.display(), "using tsq config");
            Self::load(&own)?
        } else if tsconfig.is_file() {
            debug!(path = %tsconfig.display(), "using tsconfig");
            Self::from_tsconfig(&tsconfig)?
        } else {
            debug!("no config file, using defaults");
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `TSQ_WORKERS` and `TSQ_OUT_DIR`.
    pub fn apply_env(&mut self) -> QuoteResult<()> {
        if let Ok(raw) = std::env::var("TSQ_WORKERS") {
            let raw = raw.trim();
            if !raw.is_empty() {
                self.workers = raw
                    .parse()
                    .map_err(|_| QuoteError::Config(format!("TSQ_WORKERS={raw} is not a number")))?;
            }
        }
        if let Ok(raw) = std::env::var("TSQ_OUT_DIR") {
            let raw = raw.trim();
            if !raw.is_empty() {
                self.out_dir = PathBuf::from(raw);
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> QuoteResult<()> {
        if self.workers == 0 {
            return Err(QuoteError::Config("workers must be at least 1".to_string()));
        }
        if self.include.iter().all(|p| p.trim().is_empty()) {
            return Err(QuoteError::Config("include matches nothing".to_string()));
        }
        validate_options(&self.pass_options())
    }

    pub fn pass_options(&self) -> PassOptions {
        PassOptions {
            marker: self.marker.clone(),
            register_call: self.register_call.clone(),
        }
    }

    pub fn root_path(&self, project: &Path) -> PathBuf {
        project.join(&self.root_dir)
    }

    pub fn out_path(&self, project: &Path) -> PathBuf {
        project.join(&self.out_dir)
    }

    pub fn manifest_path(&self, project: &Path) -> Option<PathBuf> {
        self.manifest
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .map(|m| self.out_path(project).join(m))
    }
}
