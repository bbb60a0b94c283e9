#![forbid(unsafe_code)]

//! Orchestration: parse one file, run the collector passes, assemble the
//! graph, run the builders, flush, commit. All writes for a file land in one
//! transaction; on any store failure the transaction rolls back and the
//! previous graph for that file is untouched. Retrying a failed file starts
//! from a fresh parse with a fresh assembler.

use std::path::{Path, PathBuf};
use std::time::Instant;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};
use tree_sitter::Parser;

use crate::assembler::GraphAssembler;
use crate::builders::{BuildCx, run_builders};
use crate::collect::{Collections, run_collectors};
use crate::config;
use crate::error::AnalysisError;
use crate::identity::semantic_id;
use crate::store::{GraphStore, SqliteStore};
use crate::types::{
    Diagnostic, FileRecord, FileSummary, IndexResult, Language, Node, NodeKind, ProjectConfig,
    SyncResult,
};
use crate::utils::{hash_content, now_millis};

pub fn language_for_path(path: &Path) -> Language {
    match path.extension().and_then(|e| e.to_str()) {
        Some("js" | "mjs" | "cjs") => Language::JavaScript,
        Some("jsx") => Language::Jsx,
        Some("ts" | "mts" | "cts") => Language::TypeScript,
        Some("tsx") => Language::Tsx,
        _ => Language::Unknown,
    }
}

fn parser_for(language: Language, file: &str) -> Result<Parser, AnalysisError> {
    let grammar = match language {
        Language::JavaScript | Language::Jsx => {
            tree_sitter::Language::new(tree_sitter_javascript::LANGUAGE)
        }
        Language::TypeScript => {
            tree_sitter::Language::new(tree_sitter_typescript::LANGUAGE_TYPESCRIPT)
        }
        Language::Tsx => tree_sitter::Language::new(tree_sitter_typescript::LANGUAGE_TSX),
        Language::Unknown => {
            return Err(AnalysisError::UnsupportedLanguage {
                file: file.to_string(),
            });
        }
    };
    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|_| AnalysisError::Parse {
            file: file.to_string(),
        })?;
    Ok(parser)
}

fn module_stem(file: &str) -> &str {
    Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("module")
}

/// The designated root node id for a file.
pub fn module_id_for(file: &str) -> Result<String, AnalysisError> {
    Ok(semantic_id(file, &[], NodeKind::Module, module_stem(file), 0)?)
}

/// Analyze one file and replace its graph. `file` is the repository-relative
/// path with forward slashes; it is part of every id the analysis produces.
pub fn analyze_file(
    store: &mut SqliteStore,
    file: &str,
    source: &str,
) -> Result<FileSummary, AnalysisError> {
    let language = language_for_path(Path::new(file));
    let mut parser = parser_for(language, file)?;
    let tree = parser.parse(source, None).ok_or_else(|| AnalysisError::Parse {
        file: file.to_string(),
    })?;
    let module_id = module_id_for(file)?;
    let (records, diagnostics) = run_collectors(&tree, source, file, &module_id);

    store.begin().map_err(AnalysisError::from)?;
    match assemble(store, file, &module_id, &records, diagnostics) {
        Ok(summary) => {
            debug!(
                file,
                nodes = summary.nodes_created,
                edges = summary.edges_created,
                "analyzed"
            );
            Ok(summary)
        }
        Err(err) => {
            if let Err(rollback_err) = store.rollback() {
                warn!(file, error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

fn assemble(
    store: &mut SqliteStore,
    file: &str,
    module_id: &str,
    records: &Collections,
    diagnostics: Vec<Diagnostic>,
) -> Result<FileSummary, AnalysisError> {
    // Clear-then-rebuild inside the transaction: readers never observe a
    // half-replaced file.
    store.delete_file_graph(file)?;

    let module = Node {
        id: module_id.to_string(),
        kind: NodeKind::Module,
        name: module_stem(file).to_string(),
        file: file.to_string(),
        line: 1,
        column: 0,
        metadata: None,
    };

    let mut assembler = GraphAssembler::new(store, file);
    assembler.ingest(module, records)?;
    assembler.begin_builders()?;
    let mut cx = BuildCx {
        records,
        file,
        module_id,
        assembler: &mut assembler,
    };
    run_builders(&mut cx)?;
    assembler.flush_pending()?;
    let summary = assembler.into_summary(diagnostics)?;

    store.commit()?;
    Ok(summary)
}

/// Index every configured file under the project root. Unchanged files (by
/// content hash) are skipped unless `force` clears the graph first.
pub fn index_all(project_root: &Path, force: bool) -> Result<IndexResult, AnalysisError> {
    let started = Instant::now();
    let config = config::load_or_default(project_root);
    let files = scan_project(project_root, &config)?;
    let mut store = SqliteStore::open(project_root)?;
    if force {
        store.clear_all()?;
    }

    let mut result = IndexResult {
        success: true,
        files_indexed: 0,
        files_skipped: 0,
        files_failed: 0,
        nodes_created: 0,
        edges_created: 0,
        errors: Vec::new(),
        duration_ms: 0,
    };

    for rel in &files {
        let rel_str = path_key(rel);
        let abs = project_root.join(rel);

        let size = std::fs::metadata(&abs).map(|m| m.len()).unwrap_or(0);
        if size > config.max_file_size {
            debug!(file = %rel_str, size, "skipping oversized file");
            result.files_skipped += 1;
            continue;
        }
        let source = match std::fs::read_to_string(&abs) {
            Ok(source) => source,
            Err(err) => {
                result.files_failed += 1;
                result.errors.push(file_error(&rel_str, &err.to_string()));
                continue;
            }
        };

        let hash = hash_content(&source);
        if !force {
            if let Some(record) = store.file_record(&rel_str)? {
                if record.content_hash == hash {
                    result.files_skipped += 1;
                    continue;
                }
            }
        }

        match analyze_file(&mut store, &rel_str, &source) {
            Ok(summary) => {
                result.files_indexed += 1;
                result.nodes_created += summary.nodes_created;
                result.edges_created += summary.edges_created;
                store.upsert_file_record(&FileRecord {
                    path: rel_str.clone(),
                    content_hash: hash,
                    language: language_for_path(rel),
                    size,
                    indexed_at: now_millis(),
                    node_count: summary.nodes_created as i64,
                })?;
            }
            Err(err) => {
                warn!(file = %rel_str, error = %err, "analysis failed");
                result.files_failed += 1;
                result.errors.push(file_error(&rel_str, &err.to_string()));
            }
        }
    }

    result.success = result.files_failed == 0;
    result.duration_ms = started.elapsed().as_millis();
    info!(
        indexed = result.files_indexed,
        skipped = result.files_skipped,
        failed = result.files_failed,
        nodes = result.nodes_created,
        edges = result.edges_created,
        "index complete"
    );
    Ok(result)
}

/// Reconcile the graph with the working tree: re-analyze added and modified
/// files, drop the graph of removed ones.
pub fn sync(project_root: &Path) -> Result<SyncResult, AnalysisError> {
    let started = Instant::now();
    let config = config::load_or_default(project_root);
    let files = scan_project(project_root, &config)?;
    let mut store = SqliteStore::open(project_root)?;

    let mut result = SyncResult {
        files_checked: files.len(),
        files_added: 0,
        files_modified: 0,
        files_removed: 0,
        nodes_updated: 0,
        duration_ms: 0,
    };

    let mut seen = std::collections::HashSet::new();
    for rel in &files {
        let rel_str = path_key(rel);
        seen.insert(rel_str.clone());
        let abs = project_root.join(rel);
        let Ok(source) = std::fs::read_to_string(&abs) else {
            continue;
        };
        let hash = hash_content(&source);
        let known = store.file_record(&rel_str)?;
        let changed = match &known {
            Some(record) => record.content_hash != hash,
            None => true,
        };
        if !changed {
            continue;
        }

        match analyze_file(&mut store, &rel_str, &source) {
            Ok(summary) => {
                if known.is_some() {
                    result.files_modified += 1;
                } else {
                    result.files_added += 1;
                }
                result.nodes_updated += summary.nodes_created;
                store.upsert_file_record(&FileRecord {
                    path: rel_str.clone(),
                    content_hash: hash,
                    language: language_for_path(rel),
                    size: source.len() as u64,
                    indexed_at: now_millis(),
                    node_count: summary.nodes_created as i64,
                })?;
            }
            Err(err) => warn!(file = %rel_str, error = %err, "sync analysis failed"),
        }
    }

    for record in store.all_file_records()? {
        if !seen.contains(&record.path) {
            store.delete_file_graph(&record.path)?;
            store.delete_file_record(&record.path)?;
            result.files_removed += 1;
        }
    }

    result.duration_ms = started.elapsed().as_millis();
    info!(
        added = result.files_added,
        modified = result.files_modified,
        removed = result.files_removed,
        "sync complete"
    );
    Ok(result)
}

fn file_error(file: &str, message: &str) -> Diagnostic {
    Diagnostic {
        message: format!("{file}: {message}"),
        line: None,
        column: None,
        code: Some("file".to_string()),
    }
}

fn path_key(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, AnalysisError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| AnalysisError::Io(std::io::Error::other(e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| AnalysisError::Io(std::io::Error::other(e)))
}

const PRUNED_DIRS: &[&str] = &["node_modules", "dist", "build", "coverage", "target"];

/// Walk the project tree collecting files the config includes, in sorted
/// order so indexing is deterministic.
pub fn scan_project(
    project_root: &Path,
    config: &ProjectConfig,
) -> Result<Vec<PathBuf>, AnalysisError> {
    let include = build_globset(&config.include)?;
    let exclude = build_globset(&config.exclude)?;

    let mut out = Vec::new();
    let mut stack = vec![project_root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = %dir.display(), error = %err, "unreadable directory");
                continue;
            }
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if entry.file_type()?.is_dir() {
                if name.starts_with('.') || PRUNED_DIRS.contains(&name.as_ref()) {
                    continue;
                }
                stack.push(path);
            } else {
                let rel = path.strip_prefix(project_root).unwrap_or(&path);
                let key = path_key(rel);
                if include.is_match(&key) && !exclude.is_match(&key) {
                    out.push(rel.to_path_buf());
                }
            }
        }
    }
    out.sort();
    Ok(out)
}
