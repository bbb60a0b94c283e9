//! End-to-end tests for project indexing and sync

use cartograph::analysis;
use cartograph::config;
use cartograph::store::SqliteStore;
use tempfile::TempDir;

fn write(root: &std::path::Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[test]
fn test_index_skips_unchanged_files() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    config::init_project(root).unwrap();
    write(root, "src/a.js", "function a() { return 1; }\n");
    write(root, "src/b.js", "function b() { return a(); }\n");

    let first = analysis::index_all(root, false).unwrap();
    assert!(first.success);
    assert_eq!(first.files_indexed, 2);
    assert!(first.nodes_created > 0);

    // Second run: nothing changed, nothing re-analyzed.
    let second = analysis::index_all(root, false).unwrap();
    assert_eq!(second.files_indexed, 0);
    assert_eq!(second.files_skipped, 2);

    // Force clears the graph and rebuilds everything.
    let forced = analysis::index_all(root, true).unwrap();
    assert_eq!(forced.files_indexed, 2);
    assert_eq!(forced.nodes_created, first.nodes_created);
}

#[test]
fn test_index_respects_excludes() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    config::init_project(root).unwrap();
    write(root, "src/a.js", "function a() {}\n");
    write(root, "node_modules/pkg/index.js", "function hidden() {}\n");
    write(root, "src/types.d.ts", "export declare function typed(): void;\n");

    let result = analysis::index_all(root, false).unwrap();
    assert_eq!(result.files_indexed, 1, "only src/a.js qualifies");

    let store = SqliteStore::open(root).unwrap();
    assert!(
        store
            .node_by_id("src/a.js::function:a")
            .unwrap()
            .is_some()
    );
    assert!(
        store
            .nodes_in_file("node_modules/pkg/index.js")
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_sync_add_modify_remove() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    config::init_project(root).unwrap();
    write(root, "src/a.js", "function a() { return 1; }\n");
    write(root, "src/b.js", "function b() { return 2; }\n");
    analysis::index_all(root, false).unwrap();

    write(root, "src/c.js", "function c() { return 3; }\n");
    write(root, "src/a.js", "function a() { return 42; }\n");
    std::fs::remove_file(root.join("src/b.js")).unwrap();

    let result = analysis::sync(root).unwrap();
    assert_eq!(result.files_added, 1);
    assert_eq!(result.files_modified, 1);
    assert_eq!(result.files_removed, 1);

    let store = SqliteStore::open(root).unwrap();
    assert!(
        store
            .node_by_id("src/c.js::function:c")
            .unwrap()
            .is_some(),
        "added file is analyzed"
    );
    assert!(
        store
            .node_by_id("src/b.js::function:b")
            .unwrap()
            .is_none(),
        "removed file's graph is dropped"
    );
    assert!(
        store.nodes_in_file("src/b.js").unwrap().is_empty(),
        "no stale nodes for the removed file"
    );
    assert!(store.file_record("src/b.js").unwrap().is_none());
}

#[test]
fn test_sync_is_stable_when_nothing_changed() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    config::init_project(root).unwrap();
    write(root, "src/a.js", "function a() {}\n");
    analysis::index_all(root, false).unwrap();

    let result = analysis::sync(root).unwrap();
    assert_eq!(result.files_added, 0);
    assert_eq!(result.files_modified, 0);
    assert_eq!(result.files_removed, 0);
}
