//! Build pipeline orchestration with Rayon-based parallelism.
//!
//! Each input file is read, transformed, and written independently; the
//! workers share nothing but the read-only cache. Repositories, cache
//! updates, and the manifest are assembled afterwards on the calling thread.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::driver::cache::{BuildCache, CACHE_FILE};
use crate::driver::config::QuoteConfig;
use crate::driver::filesystem::{hash_bytes, iter_source_files, SourceFile};
use crate::errors::{QuoteError, QuoteResult};
use crate::runtime::manifest::Manifest;
use crate::transform::parser::parse_source;
use crate::transform::pass::{transform, PassOptions};
use crate::transform::repository::Repository;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Contained marked classes and was rewritten.
    Transformed,
    /// Had nothing to quote and was copied through.
    Copied,
    /// Matched the cache and was left alone.
    Unchanged,
    Failed,
}

#[derive(Clone, Debug)]
pub struct FileOutcome {
    pub relative: String,
    pub status: FileStatus,
    pub content_hash: String,
    pub repositories: Vec<Repository>,
    pub error_message: Option<String>,
}

impl FileOutcome {
    fn failed(relative: &str, content_hash: String, err: QuoteError) -> Self {
        Self {
            relative: relative.to_string(),
            status: FileStatus::Failed,
            content_hash,
            repositories: Vec::new(),
            error_message: Some(err.to_string()),
        }
    }
}

/// Summary of one build.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BuildReport {
    pub files_seen: usize,
    pub files_transformed: usize,
    pub files_copied: usize,
    pub files_unchanged: usize,
    pub files_failed: usize,
    pub classes_quoted: usize,
    pub methods_quoted: usize,
    pub elapsed_ms: u64,
    pub manifest_path: Option<PathBuf>,
}

struct BuildContext<'a> {
    root: PathBuf,
    out: PathBuf,
    options: PassOptions,
    cache: Option<&'a BuildCache>,
}

fn build_file_worker(ctx: &BuildContext<'_>, file: &SourceFile) -> FileOutcome {
    let bytes = match std::fs::read(&file.path) {
        Ok(bytes) => bytes,
        Err(e) => return FileOutcome::failed(&file.relative, String::new(), e.into()),
    };
    let content_hash = hash_bytes(&bytes);

    let Ok(within_root) = file.path.strip_prefix(&ctx.root) else {
        let err = QuoteError::Build(format!("{} is outside rootDir", file.relative));
        return FileOutcome::failed(&file.relative, content_hash, err);
    };
    let module_path = within_root.to_string_lossy().replace('\\', "/");
    let output = ctx.out.join(within_root);

    if let Some(entry) = ctx.cache.and_then(|c| c.fresh(&file.relative, &content_hash)) {
        if output.is_file() {
            return FileOutcome {
                relative: file.relative.clone(),
                status: FileStatus::Unchanged,
                content_hash,
                repositories: entry.repositories.clone(),
                error_message: None,
            };
        }
    }

    let result = String::from_utf8(bytes)
        .map_err(|e| QuoteError::Parse(format!("{} is not UTF-8: {e}", file.relative)))
        .and_then(|source| parse_source(&module_path, source, file.dialect))
        .and_then(|unit| transform(&unit, &ctx.options))
        .and_then(|transformed| {
            write_output(&output, &transformed.source)?;
            Ok(transformed)
        });

    match result {
        Ok(transformed) => FileOutcome {
            relative: file.relative.clone(),
            status: if transformed.is_changed() {
                FileStatus::Transformed
            } else {
                FileStatus::Copied
            },
            content_hash,
            repositories: transformed.repositories,
            error_message: None,
        },
        Err(err) => FileOutcome::failed(&file.relative, content_hash, err),
    }
}

fn write_output(path: &Path, contents: &str) -> QuoteResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

/// Transform `files` on a pool of `workers` threads.
fn parallel_build(
    ctx: &BuildContext<'_>,
    files: &[SourceFile],
    workers: usize,
) -> Vec<FileOutcome> {
    if files.is_empty() {
        return vec![];
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build();

    match pool {
        Ok(pool) => pool.install(|| {
            files
                .par_iter()
                .map(|file| build_file_worker(ctx, file))
                .collect()
        }),
        Err(_) => {
            // Fallback to sequential
            files
                .iter()
                .map(|file| build_file_worker(ctx, file))
                .collect()
        }
    }
}

/// Build every configured source of `project` into the output directory.
pub fn run_build(project: &Path, config: &QuoteConfig) -> QuoteResult<BuildReport> {
    let started = Instant::now();
    config.validate()?;

    let options = config.pass_options();
    let out = config.out_path(project);
    let files = iter_source_files(
        project,
        &config.include,
        &config.exclude,
        std::slice::from_ref(&out),
    )?;
    info!(files = files.len(), out = %out.display(), "starting quotation build");

    let cache_path = out.join(CACHE_FILE);
    let mut cache = BuildCache::load(&cache_path, &options);
    let ctx = BuildContext {
        root: config.root_path(project),
        out: out.clone(),
        options,
        cache: config.incremental.then_some(&cache),
    };
    let outcomes = parallel_build(&ctx, &files, config.workers);

    let mut report = BuildReport {
        files_seen: files.len(),
        ..BuildReport::default()
    };
    let mut repositories = Vec::new();
    for outcome in &outcomes {
        match outcome.status {
            FileStatus::Transformed => report.files_transformed += 1,
            FileStatus::Copied => report.files_copied += 1,
            FileStatus::Unchanged => report.files_unchanged += 1,
            FileStatus::Failed => {
                report.files_failed += 1;
                error!(
                    file = %outcome.relative,
                    "{}",
                    outcome.error_message.as_deref().unwrap_or("unknown error")
                );
                continue;
            }
        }
        debug!(file = %outcome.relative, status = ?outcome.status, "built file");
        report.classes_quoted += outcome.repositories.len();
        report.methods_quoted += outcome.repositories.iter().map(Repository::len).sum::<usize>();
        repositories.extend(outcome.repositories.iter().cloned());
    }

    for outcome in outcomes {
        if outcome.status == FileStatus::Failed {
            cache.remove(&outcome.relative);
        } else {
            cache.update(&outcome.relative, outcome.content_hash, outcome.repositories);
        }
    }
    let live: HashSet<&str> = files.iter().map(|f| f.relative.as_str()).collect();
    cache.retain_paths(&live);
    if config.incremental {
        cache.save(&cache_path)?;
    }

    if report.files_failed > 0 {
        return Err(QuoteError::Build(format!(
            "{} of {} file(s) failed",
            report.files_failed, report.files_seen
        )));
    }

    if let Some(manifest_path) = config.manifest_path(project) {
        Manifest::new(repositories).write(&manifest_path)?;
        report.manifest_path = Some(manifest_path);
    }

    report.elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        transformed = report.files_transformed,
        copied = report.files_copied,
        unchanged = report.files_unchanged,
        classes = report.classes_quoted,
        methods = report.methods_quoted,
        elapsed_ms = report.elapsed_ms,
        "quotation build finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassId;
    use crate::runtime::registry::QuotationRegistry;

    const HELLO: &str = "import { quoted } from 'ts-quotable';\n\n@quoted\nexport class Hello {\n  add(a: number, b: number) {\n    return a + b;\n  }\n}\n";

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn config() -> QuoteConfig {
        QuoteConfig {
            root_dir: PathBuf::from("src"),
            workers: 2,
            ..QuoteConfig::default()
        }
    }

    #[test]
    fn test_build_writes_outputs_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/hello.ts", HELLO);
        write(root, "src/util/plain.ts", "export const one = 1;\n");

        let report = run_build(root, &config()).unwrap();
        assert_eq!(report.files_seen, 2);
        assert_eq!(report.files_transformed, 1);
        assert_eq!(report.files_copied, 1);
        assert_eq!(report.classes_quoted, 1);
        assert_eq!(report.methods_quoted, 1);

        let hello = std::fs::read_to_string(root.join("dist/hello.ts")).unwrap();
        assert!(!hello.contains("@quoted"));
        assert!(hello.contains("quoted.saveRepo(Hello, {"));
        let plain = std::fs::read_to_string(root.join("dist/util/plain.ts")).unwrap();
        assert_eq!(plain, "export const one = 1;\n");

        let registry = QuotationRegistry::new();
        registry.load_manifest(&report.manifest_path.unwrap()).unwrap();
        let repo = registry.lookup(&ClassId::new("hello", "Hello")).unwrap();
        assert_eq!(
            repo.get("add").unwrap().body.render_str(&["x", "y"]).unwrap(),
            "return x + y;"
        );
    }

    #[test]
    fn test_incremental_build_skips_unchanged_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/hello.ts", HELLO);

        let first = run_build(root, &config()).unwrap();
        assert_eq!(first.files_transformed, 1);

        let second = run_build(root, &config()).unwrap();
        assert_eq!(second.files_unchanged, 1);
        assert_eq!(second.files_transformed, 0);
        assert_eq!(second.classes_quoted, 1);

        write(root, "src/hello.ts", &HELLO.replace("a + b", "b + a"));
        let third = run_build(root, &config()).unwrap();
        assert_eq!(third.files_transformed, 1);
    }

    #[test]
    fn test_failed_file_fails_build_but_not_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/good.ts", HELLO);
        write(root, "src/bad.ts", "@quoted\nclass Bad {\n  noop() {}\n}\n");

        let err = run_build(root, &config()).unwrap_err();
        assert!(matches!(err, QuoteError::Build(ref msg) if msg.starts_with("1 of 2")));
        assert!(root.join("dist/good.ts").is_file());
        assert!(!root.join("dist/bad.ts").exists());
        assert!(!root.join("dist/quotations.json").exists());
    }

    #[test]
    fn test_file_outside_root_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/hello.ts", HELLO);
        let config = QuoteConfig {
            root_dir: PathBuf::from("lib"),
            ..config()
        };
        let err = run_build(root, &config).unwrap_err();
        assert!(matches!(err, QuoteError::Build(_)));
    }
}
