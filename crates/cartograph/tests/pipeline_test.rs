//! Integration tests for the per-file analysis pipeline

use cartograph::analysis::analyze_file;
use cartograph::store::SqliteStore;
use cartograph::types::{EdgeKind, FileSummary, NodeKind};

fn analyze(file: &str, source: &str) -> (SqliteStore, FileSummary) {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let summary = analyze_file(&mut store, file, source).unwrap();
    (store, summary)
}

#[test]
fn test_module_function_and_export_nodes() {
    let (store, summary) = analyze(
        "src/math.ts",
        "export function add(a, b) { return a + b; }\n",
    );
    assert!(summary.nodes_created > 0);
    assert!(summary.diagnostics.is_empty());

    let module = store.node_by_id("src/math.ts::module:math").unwrap();
    assert!(module.is_some(), "module root should exist");

    let function = store
        .node_by_id("src/math.ts::function:add")
        .unwrap()
        .expect("function node");
    assert_eq!(function.name, "add");
    assert_eq!(function.kind, NodeKind::Function);

    // Parameters anchor inside the function scope.
    let a = store
        .node_by_id("src/math.ts::add::parameter:a")
        .unwrap()
        .expect("parameter a");
    assert_eq!(a.kind, NodeKind::Parameter);

    let contains = store.edges_to("src/math.ts::function:add").unwrap();
    assert!(
        contains
            .iter()
            .any(|e| e.kind == EdgeKind::Contains && e.src == "src/math.ts::module:math"),
        "function should be anchored to the module"
    );

    let export = store
        .node_by_id("src/math.ts::export:add")
        .unwrap()
        .expect("export node");
    assert_eq!(export.kind, NodeKind::Export);
}

#[test]
fn test_rerun_is_idempotent() {
    let source = r#"
import { helper } from "./util";

export class Service {
  cache = new Map();

  async load(id) {
    if (!id) {
      throw new Error("missing id");
    }
    const raw = await fetch("/api/" + id);
    return helper(raw);
  }
}
"#;
    let mut store = SqliteStore::open_in_memory().unwrap();
    let first = analyze_file(&mut store, "src/service.ts", source).unwrap();
    let nodes_before = store.node_count().unwrap();
    let edges_before = store.edge_count().unwrap();

    let second = analyze_file(&mut store, "src/service.ts", source).unwrap();
    assert_eq!(first.node_ids, second.node_ids, "ids must be byte-identical");
    assert_eq!(nodes_before, store.node_count().unwrap());
    assert_eq!(edges_before, store.edge_count().unwrap());
}

#[test]
fn test_class_field_arrow_named_by_property() {
    let (store, _) = analyze(
        "src/widget.js",
        "class Widget {\n  handler = () => { console.log(\"hi\"); };\n}\n",
    );
    let handler = store
        .node_by_id("src/widget.js::Widget::function:handler")
        .unwrap()
        .expect("field initializer takes the member's name");
    assert_eq!(handler.name, "handler");

    let all = store.nodes_in_file("src/widget.js").unwrap();
    assert!(
        all.iter().all(|n| n.name != "anonymous"),
        "class-member precedence should leave nothing anonymous here"
    );
}

#[test]
fn test_thrown_constructor_is_anchored_without_assignment() {
    let (store, _) = analyze(
        "src/fail.js",
        "function fail() { throw new Error(\"boom\"); }\n",
    );
    let call_id = "src/fail.js::fail::new:Error";
    assert!(store.node_by_id(call_id).unwrap().is_some());

    let incoming = store.edges_to(call_id).unwrap();
    assert!(
        incoming
            .iter()
            .any(|e| e.kind == EdgeKind::Contains && e.src == "src/fail.js::function:fail"),
        "unassigned value still needs its containment anchor"
    );
    assert!(
        incoming.iter().any(|e| e.kind == EdgeKind::Throws),
        "thrown usage produces a Throws edge"
    );
    assert!(
        !incoming.iter().any(|e| e.kind == EdgeKind::AssignedFrom),
        "nothing assigns from a thrown value"
    );
}

#[test]
fn test_sibling_branches_disambiguated() {
    let source = r#"
function f(x) {
  if (x) { let a = 1; }
  if (x) { let a = 2; }
}
"#;
    let (store, _) = analyze("src/b.js", source);

    assert!(store.node_by_id("src/b.js::f::branch:if").unwrap().is_some());
    assert!(
        store
            .node_by_id("src/b.js::f::branch:if#1")
            .unwrap()
            .is_some(),
        "second sibling branch gets #1"
    );

    // The two `a` declarations live in distinct then-scopes.
    let first_a = store
        .node_by_id("src/b.js::f::if::then::variable:a")
        .unwrap();
    let second_a = store
        .node_by_id("src/b.js::f::if#1::then::variable:a")
        .unwrap();
    assert!(first_a.is_some() && second_a.is_some());

    let bodies = store.edges_from("src/b.js::f::branch:if").unwrap();
    assert!(
        bodies.iter().any(|e| e.kind == EdgeKind::HasBody),
        "branch links to its then scope"
    );
}

#[test]
fn test_condition_calls_linked_to_their_construct() {
    let source = r#"
function route(flag) {
  if (check(flag)) {
    return 1;
  }
  while (poll()) {
    step();
  }
  return 0;
}
"#;
    let (store, _) = analyze("src/r.js", source);

    let branch_edges = store.edges_from("src/r.js::route::branch:if").unwrap();
    assert!(
        branch_edges
            .iter()
            .any(|e| e.kind == EdgeKind::HasCondition
                && e.dst == "src/r.js::route::if::call:check"),
        "branch links to the call inside its condition"
    );

    let loop_edges = store.edges_from("src/r.js::route::loop:while").unwrap();
    assert!(
        loop_edges
            .iter()
            .any(|e| e.kind == EdgeKind::HasCondition
                && e.dst == "src/r.js::route::while::call:poll"),
        "loop links to the call inside its condition"
    );
    assert!(
        !loop_edges
            .iter()
            .any(|e| e.kind == EdgeKind::HasCondition
                && e.dst == "src/r.js::route::while::call:step"),
        "a call in the loop body is not a condition value"
    );
}

#[test]
fn test_generator_yield_edges() {
    let source = r#"
function* gen() {
  yield make();
  return done();
}
"#;
    let (store, _) = analyze("src/g.js", source);

    let gen_node = store
        .node_by_id("src/g.js::function:gen")
        .unwrap()
        .expect("generator node");
    let metadata = gen_node.metadata.expect("metadata");
    assert_eq!(metadata["is_generator"], serde_json::json!(true));

    let outgoing = store.edges_from("src/g.js::function:gen").unwrap();
    assert!(
        outgoing
            .iter()
            .any(|e| e.kind == EdgeKind::Yields && e.dst == "src/g.js::gen::call:make"),
        "yielded call gets a Yields edge from its generator"
    );
    assert!(
        outgoing
            .iter()
            .any(|e| e.kind == EdgeKind::Returns && e.dst == "src/g.js::gen::call:done")
    );
}

#[test]
fn test_loop_and_catch_bindings_are_declared() {
    let source = r#"
function tally(items) {
  let total = 0;
  for (const key in items) {
    total += 1;
  }
  try {
    risky();
  } catch (err) {
    console.log(err);
  }
  for (seen in items) {
    total += 1;
  }
  return total;
}
"#;
    let (store, _) = analyze("src/k.js", source);

    let key = store
        .node_by_id("src/k.js::tally::for::variable:key")
        .unwrap()
        .expect("for-in binding is a variable node");
    assert_eq!(key.kind, NodeKind::Variable);
    let metadata = key.metadata.expect("metadata");
    assert_eq!(metadata["is_const"], serde_json::json!(true));

    let err = store
        .node_by_id("src/k.js::tally::try::catch::variable:err")
        .unwrap()
        .expect("catch binding is a variable node");
    let incoming = store.edges_to(&err.id).unwrap();
    assert!(
        incoming
            .iter()
            .any(|e| e.kind == EdgeKind::Contains
                && e.src == "src/k.js::tally::try::catch:catch"),
        "catch binding anchors inside the catch block"
    );

    // `for (seen in items)` writes an existing binding, declares nothing.
    assert!(
        store
            .node_by_id("src/k.js::tally::for#1::variable:seen")
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_resource_singleton_dedup() {
    let source = r#"
async function a() { await fetch("/a"); }
async function b() { await fetch("/b"); }
function c() { return fetch("/c"); }
"#;
    let (store, _) = analyze("src/net.js", source);

    let resources = store.nodes_by_kind(NodeKind::Resource, 10).unwrap();
    assert_eq!(resources.len(), 1, "three fetch calls, one resource node");
    assert_eq!(resources[0].id, "resource:net");

    let uses: Vec<_> = store
        .edges_to("resource:net")
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == EdgeKind::Uses)
        .collect();
    assert_eq!(uses.len(), 3, "each call site gets its own Uses edge");
}

#[test]
fn test_reanalysis_removes_stale_nodes() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    analyze_file(
        &mut store,
        "src/app.js",
        "function old() { return 1; }\n",
    )
    .unwrap();
    let old_id = "src/app.js::function:old";
    assert!(store.node_by_id(old_id).unwrap().is_some());

    analyze_file(
        &mut store,
        "src/app.js",
        "function renamed() { return 1; }\n",
    )
    .unwrap();
    assert!(
        store.node_by_id(old_id).unwrap().is_none(),
        "stale node must be gone"
    );
    assert!(
        store.edges_to(old_id).unwrap().is_empty()
            && store.edges_from(old_id).unwrap().is_empty(),
        "no edge may still touch the removed node"
    );
    assert!(
        store
            .node_by_id("src/app.js::function:renamed")
            .unwrap()
            .is_some()
    );
}

#[test]
fn test_rejection_handling_metadata() {
    let source = r#"
async function safe() {
  try {
    await fetch("/x");
  } catch (e) {
    console.log(e);
  }
}

async function risky() {
  const p = fetch("/y");
  p.then((r) => r.json());
}
"#;
    let (store, _) = analyze("src/promise.js", source);

    let safe = store
        .node_by_id("src/promise.js::function:safe")
        .unwrap()
        .expect("safe function node");
    let metadata = safe.metadata.expect("deferred metadata must be flushed");
    assert_eq!(metadata["uses_promises"], serde_json::json!(true));
    assert_eq!(metadata["handles_rejection"], serde_json::json!(true));

    let risky = store
        .node_by_id("src/promise.js::function:risky")
        .unwrap()
        .expect("risky function node");
    let metadata = risky.metadata.expect("metadata");
    assert_eq!(metadata["uses_promises"], serde_json::json!(true));
    assert_eq!(metadata["handles_rejection"], serde_json::json!(false));
}

#[test]
fn test_mutation_edges() {
    let source = r#"
function bump() {
  let count = 0;
  count += 1;
  for (let i = 0; i < 3; i++) {
    count = count + i;
  }
  return count;
}
"#;
    let (store, _) = analyze("src/m.js", source);

    let outgoing = store.edges_from("src/m.js::function:bump").unwrap();
    let mutations: Vec<_> = outgoing
        .iter()
        .filter(|e| e.kind == EdgeKind::Mutates)
        .collect();
    assert!(
        mutations
            .iter()
            .any(|e| e.dst == "src/m.js::bump::variable:count"),
        "count is mutated by bump"
    );
    assert!(
        mutations
            .iter()
            .any(|e| e.dst == "src/m.js::bump::for::variable:i"),
        "i++ mutates the loop variable"
    );
}

#[test]
fn test_imports_and_external_modules() {
    let source = r#"
import React from "react";
import { helper } from "./util";

export const x = helper(React);
"#;
    let (store, _) = analyze("src/app.js", source);

    let react = store
        .node_by_id("src/app.js::import:React")
        .unwrap()
        .expect("import node");
    let import_edges = store.edges_from(&react.id).unwrap();
    assert!(
        import_edges
            .iter()
            .any(|e| e.kind == EdgeKind::Imports && e.dst == "external:react"),
        "bare specifier links to an external module"
    );
    assert!(
        store.node_by_id("external:react").unwrap().is_some(),
        "external module node is materialized"
    );

    // Relative specifier points at the target module id; the edge may
    // dangle until src/util.js is analyzed, and that is fine.
    let helper_edges = store.edges_from("src/app.js::import:helper").unwrap();
    assert!(
        helper_edges
            .iter()
            .any(|e| e.kind == EdgeKind::Imports && e.dst == "src/util.js::module:util")
    );

    // The exported const is assigned from the call.
    let x_edges = store.edges_from("src/app.js::variable:x").unwrap();
    assert!(
        x_edges
            .iter()
            .any(|e| e.kind == EdgeKind::AssignedFrom && e.dst == "src/app.js::call:helper")
    );
}

#[test]
fn test_assigned_from_identifier_resolves_scope_chain() {
    let source = r#"
const base = 1;
function f() {
  const copy = base;
  const base2 = copy;
}
"#;
    let (store, _) = analyze("src/d.js", source);

    let copy_edges = store.edges_from("src/d.js::f::variable:copy").unwrap();
    assert!(
        copy_edges
            .iter()
            .any(|e| e.kind == EdgeKind::AssignedFrom && e.dst == "src/d.js::variable:base"),
        "identifier initializer resolves through the scope chain"
    );
}

#[test]
fn test_call_resolution_and_instantiation() {
    let source = r#"
class Store {}

function make() {
  return new Store();
}

function main() {
  const s = make();
}
"#;
    let (store, _) = analyze("src/c.js", source);

    let ctor_edges = store.edges_from("src/c.js::make::new:Store").unwrap();
    assert!(
        ctor_edges
            .iter()
            .any(|e| e.kind == EdgeKind::Instantiates && e.dst == "src/c.js::class:Store")
    );

    let call_edges = store.edges_from("src/c.js::main::call:make").unwrap();
    assert!(
        call_edges
            .iter()
            .any(|e| e.kind == EdgeKind::Calls && e.dst == "src/c.js::function:make"),
        "unambiguous same-file callee resolves"
    );
}

#[test]
fn test_inheritance_edges() {
    let source = r#"
import { Base } from "./base";

class Local {}
class Derived extends Local {}
class Remote extends Base {}
"#;
    let (store, _) = analyze("src/t.ts", source);

    let derived = store.edges_from("src/t.ts::class:Derived").unwrap();
    assert!(
        derived
            .iter()
            .any(|e| e.kind == EdgeKind::DerivesFrom && e.dst == "src/t.ts::class:Local")
    );

    let remote = store.edges_from("src/t.ts::class:Remote").unwrap();
    assert!(
        remote
            .iter()
            .any(|e| e.kind == EdgeKind::DerivesFrom && e.dst == "src/base.ts::class:Base"),
        "imported base resolves to a forward id in the source module"
    );
}

#[test]
fn test_try_catch_handler_edges() {
    let source = r#"
function guarded() {
  try {
    risky();
  } catch (e) {
    console.log(e);
  } finally {
    cleanup();
  }
}
"#;
    let (store, _) = analyze("src/try.js", source);

    let try_id = "src/try.js::guarded::try:try";
    let handlers: Vec<_> = store
        .edges_from(try_id)
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == EdgeKind::HasHandler)
        .collect();
    assert_eq!(handlers.len(), 2, "catch and finally are both handlers");
}

#[test]
fn test_no_orphan_nodes() {
    let source = r#"
import { api } from "./api";

export class Session {
  token = null;

  async refresh() {
    if (!this.token) {
      try {
        this.token = await api.token();
      } catch (e) {
        console.error(e);
        throw new Error("refresh failed");
      }
    }
    for (let i = 0; i < 3; i++) {
      setTimeout(() => this.ping(), i * 1000);
    }
    return this.token;
  }
}
"#;
    let (store, _) = analyze("src/session.ts", source);

    for node in store.nodes_in_file("src/session.ts").unwrap() {
        if node.kind == NodeKind::Module {
            continue;
        }
        let anchored = store
            .edges_to(&node.id)
            .unwrap()
            .iter()
            .any(|e| e.kind == EdgeKind::Contains);
        assert!(anchored, "orphan node: {}", node.id);
    }
}
