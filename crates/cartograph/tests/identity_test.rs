//! Tests for semantic id construction, parsing, and scope tracking

use cartograph::error::IdentityError;
use cartograph::identity::{
    external_module_id, parse_id, resource_id, scope_prefix, semantic_id,
};
use cartograph::scope::{ScopeKind, ScopeSegment, ScopeTracker};
use cartograph::types::NodeKind;
use proptest::prelude::*;

fn seg(name: &str, counter: u32) -> ScopeSegment {
    ScopeSegment {
        name: name.to_string(),
        kind: ScopeKind::Function,
        counter,
    }
}

#[test]
fn test_id_format() {
    let id = semantic_id(
        "src/app.ts",
        &[seg("render", 0)],
        NodeKind::CallSite,
        "fetch",
        1,
    )
    .unwrap();
    assert_eq!(id, "src/app.ts::render::call:fetch#1");

    let id = semantic_id("src/app.ts", &[], NodeKind::Module, "app", 0).unwrap();
    assert_eq!(id, "src/app.ts::module:app");

    let id = semantic_id(
        "src/app.ts",
        &[seg("handler", 0), seg("if", 1)],
        NodeKind::Variable,
        "result",
        0,
    )
    .unwrap();
    assert_eq!(id, "src/app.ts::handler::if#1::variable:result");
}

#[test]
fn test_parse_round_trip() {
    let id = "src/app.ts::handler::if#1::variable:result";
    let parsed = parse_id(id).unwrap();
    assert_eq!(parsed.file, "src/app.ts");
    assert_eq!(
        parsed.segments,
        vec![("handler".to_string(), 0), ("if".to_string(), 1)]
    );
    assert_eq!(parsed.kind, NodeKind::Variable);
    assert_eq!(parsed.name, "result");
    assert_eq!(parsed.disambiguator, 0);

    let parsed = parse_id("a.ts::f::call:go#2").unwrap();
    assert_eq!(parsed.name, "go");
    assert_eq!(parsed.disambiguator, 2);
}

#[test]
fn test_private_member_name_keeps_hash() {
    // A JS private member starts with '#'; that hash is not a counter.
    let parsed = parse_id("src/a.ts::Counter::function:#inc").unwrap();
    assert_eq!(parsed.name, "#inc");
    assert_eq!(parsed.disambiguator, 0);
}

#[test]
fn test_special_forms() {
    let parsed = parse_id(&resource_id("net")).unwrap();
    assert_eq!(parsed.kind, NodeKind::Resource);
    assert_eq!(parsed.name, "net");
    assert!(parsed.file.is_empty());

    let parsed = parse_id(&external_module_id("react")).unwrap();
    assert_eq!(parsed.kind, NodeKind::ExternalModule);
    assert_eq!(parsed.name, "react");
}

#[test]
fn test_invalid_inputs_rejected() {
    assert!(matches!(
        semantic_id("a.ts", &[], NodeKind::Function, "", 0),
        Err(IdentityError::EmptyName { .. })
    ));
    assert!(matches!(
        semantic_id("a.ts", &[], NodeKind::Function, "a::b", 0),
        Err(IdentityError::ReservedSeparator { .. })
    ));
    assert!(parse_id("no-separator-here").is_err());
    assert!(parse_id("a.ts::f::notakind").is_err());
    assert!(parse_id("a.ts::f::bogus:name").is_err());
}

#[test]
fn test_scope_prefix_is_exact() {
    // The prefix of `f` must not also cover `foo`.
    let prefix = scope_prefix("a.ts", &[seg("f", 0)]);
    assert!("a.ts::f::variable:x".starts_with(&prefix));
    assert!(!"a.ts::foo::variable:x".starts_with(&prefix));
}

#[test]
fn test_tracker_sibling_counters() {
    let mut tracker = ScopeTracker::new("a.ts", "a.ts::module:a");

    let first = tracker.enter("if", ScopeKind::Branch, "branch");
    assert_eq!(first, 0);
    tracker.exit();

    let second = tracker.enter("if", ScopeKind::Branch, "branch");
    assert_eq!(second, 1);
    tracker.exit();

    // Counters are namespaced by tag: a loop named `if` would not collide,
    // and two different names never share a counter.
    let other = tracker.enter("while", ScopeKind::Loop, "loop");
    assert_eq!(other, 0);
    tracker.exit();
}

#[test]
fn test_tracker_owner_stack() {
    let mut tracker = ScopeTracker::new("a.ts", "a.ts::module:a");
    assert_eq!(tracker.current_scope_id(), "a.ts::module:a");
    assert!(tracker.current_function_id().is_none());

    tracker.enter("f", ScopeKind::Function, "function");
    tracker.promote_owner("a.ts::function:f".to_string(), true);
    assert_eq!(tracker.current_scope_id(), "a.ts::function:f");
    assert_eq!(tracker.current_function_id(), Some("a.ts::function:f"));

    // A scope entered without a promoted owner keeps the enclosing owner.
    tracker.enter("if", ScopeKind::Branch, "branch");
    assert_eq!(tracker.current_scope_id(), "a.ts::function:f");

    tracker.exit();
    tracker.exit();
    assert_eq!(tracker.current_scope_id(), "a.ts::module:a");
    assert!(tracker.current_function_id().is_none());
}

#[test]
fn test_tracker_call_counters_do_not_disturb_scopes() {
    let mut tracker = ScopeTracker::new("a.ts", "a.ts::module:a");
    tracker.enter("f", ScopeKind::Function, "function");
    assert_eq!(tracker.bump_counter("call", "fetch"), 0);
    assert_eq!(tracker.bump_counter("call", "fetch"), 1);
    // A nested scope named `fetch` uses a different tag, so it starts at 0.
    assert_eq!(tracker.enter("fetch", ScopeKind::Function, "function"), 0);
}

proptest! {
    /// Parsing is total: any input yields Ok or a typed error, never a panic.
    #[test]
    fn prop_parse_never_panics(input in ".{0,80}") {
        let _ = parse_id(&input);
    }

    /// Well-formed ids round-trip through parse.
    #[test]
    fn prop_round_trip(
        file in "[a-z]{1,8}\\.ts",
        scope in "[a-z]{1,8}",
        counter in 0u32..5,
        name in "[a-zA-Z_$][a-zA-Z0-9_$]{0,10}",
        disambiguator in 0u32..5,
    ) {
        let segments = [ScopeSegment { name: scope.clone(), kind: ScopeKind::Function, counter }];
        let id = semantic_id(&file, &segments, NodeKind::CallSite, &name, disambiguator).unwrap();
        let parsed = parse_id(&id).unwrap();
        prop_assert_eq!(parsed.file, file);
        prop_assert_eq!(parsed.segments, vec![(scope, counter)]);
        prop_assert_eq!(parsed.kind, NodeKind::CallSite);
        prop_assert_eq!(parsed.name, name);
        prop_assert_eq!(parsed.disambiguator, disambiguator);
    }
}
