//! Filesystem scanning helpers for build passes.

use std::path::{Path, PathBuf};

use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::errors::{QuoteError, QuoteResult};
use crate::transform::parser::{detect_dialect, Dialect};

/// Per-project ignore file, gitignore syntax.
pub const IGNORE_FILE: &str = ".tsqignore";

/// An input file selected for the build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the project directory, `/`-separated.
    pub relative: String,
    pub dialect: Dialect,
}

fn build_overrides(
    project: &Path,
    include: &[String],
    exclude: &[String],
    skip_dirs: &[PathBuf],
) -> QuoteResult<Override> {
    let mut builder = OverrideBuilder::new(project);
    let mut add = |glob: &str| {
        builder
            .add(glob)
            .map(|_| ())
            .map_err(|e| QuoteError::Config(format!("invalid glob `{glob}`: {e}")))
    };
    for pattern in include {
        let stripped = pattern.trim().trim_start_matches("./");
        if !stripped.is_empty() {
            add(stripped)?;
        }
    }
    for pattern in exclude {
        let stripped = pattern.trim().trim_start_matches("./");
        if !stripped.is_empty() {
            add(&format!("!{stripped}"))?;
        }
    }
    for dir in skip_dirs {
        if let Ok(rel) = dir.strip_prefix(project) {
            let rel = rel.to_string_lossy().replace('\\', "/");
            if !rel.is_empty() {
                add(&format!("!/{rel}"))?;
            }
        }
    }
    builder
        .build()
        .map_err(|e| QuoteError::Config(format!("invalid include/exclude globs: {e}")))
}

/// Enumerate the quotable sources under `project`.
///
/// Honors `.gitignore` and `.tsqignore`, keeps files matching `include` and
/// not `exclude`, and never descends into `skip_dirs` (the output directory).
/// Results are sorted by relative path.
pub fn iter_source_files(
    project: &Path,
    include: &[String],
    exclude: &[String],
    skip_dirs: &[PathBuf],
) -> QuoteResult<Vec<SourceFile>> {
    let overrides = build_overrides(project, include, exclude, skip_dirs)?;
    let walker = WalkBuilder::new(project)
        .overrides(overrides)
        .require_git(false)
        .add_custom_ignore_filename(IGNORE_FILE)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.into_path();
        let relative = path
            .strip_prefix(project)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        let Some(dialect) = detect_dialect(&relative) else {
            continue;
        };
        files.push(SourceFile {
            path,
            relative,
            dialect,
        });
    }
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

/// SHA-256 hex digest of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

pub fn compute_content_hash(path: &Path) -> QuoteResult<String> {
    let data = std::fs::read(path)?;
    Ok(hash_bytes(&data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn relatives(files: &[SourceFile]) -> Vec<&str> {
        files.iter().map(|f| f.relative.as_str()).collect()
    }

    #[test]
    fn test_iter_source_files_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/a.ts", "");
        write(root, "src/nested/b.mts", "");
        write(root, "src/types.d.ts", "");
        write(root, "src/readme.md", "");
        write(root, "src/node_modules/dep/c.ts", "");
        write(root, "dist/src/a.ts", "");
        write(root, "other/d.ts", "");

        let files = iter_source_files(
            root,
            &["src/**".to_string()],
            &["node_modules".to_string()],
            &[root.join("dist")],
        )
        .unwrap();
        assert_eq!(relatives(&files), vec!["src/a.ts", "src/nested/b.mts"]);
        assert_eq!(files[1].dialect, Dialect::TypeScript);
    }

    #[test]
    fn test_iter_source_files_honors_ignore_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/keep.ts", "");
        write(root, "src/generated/skip.ts", "");
        write(root, IGNORE_FILE, "src/generated/\n");

        let files = iter_source_files(root, &["src/**/*.ts".to_string()], &[], &[]).unwrap();
        assert_eq!(relatives(&files), vec!["src/keep.ts"]);
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = iter_source_files(dir.path(), &["src/[".to_string()], &[], &[]).unwrap_err();
        assert!(matches!(err, QuoteError::Config(_)));
    }

    #[test]
    fn test_hash_bytes_known_value() {
        assert_eq!(
            hash_bytes(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_compute_content_hash_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.ts");
        std::fs::write(&path, "class A {}").unwrap();
        assert_eq!(compute_content_hash(&path).unwrap(), hash_bytes(b"class A {}"));
    }
}
