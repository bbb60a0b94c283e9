#![forbid(unsafe_code)]

//! Scope tracking for a single traversal pass.
//!
//! The tracker maintains the current nesting path (module, class, function,
//! block) and assigns sibling disambiguators so two `if` blocks at the same
//! depth get distinct segments (`if`, `if#1`). Counters are keyed by
//! (kind tag, name) and are per-tracker, so every traversal pass over the
//! same tree observes identical paths and identical counters.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Module,
    Class,
    Function,
    Block,
    Branch,
    Case,
    Loop,
    Try,
    Catch,
    Finally,
}

/// One segment of the scope path: a name plus a sibling counter. Counter 0
/// renders as the bare name, counter N as `name#N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSegment {
    pub name: String,
    pub kind: ScopeKind,
    pub counter: u32,
}

impl ScopeSegment {
    pub fn render(&self) -> String {
        if self.counter == 0 {
            self.name.clone()
        } else {
            format!("{}#{}", self.name, self.counter)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SegmentFlags {
    pushed_owner: bool,
    pushed_function: bool,
}

#[derive(Debug)]
pub struct ScopeTracker {
    file: String,
    segments: Vec<ScopeSegment>,
    // Sibling counts keyed by "tag:name", one map per depth. Index 0 is
    // module level.
    sibling_counts: Vec<HashMap<String, u32>>,
    // Ids of enclosing nodes that can own a Contains edge. The module node
    // id sits at the bottom and is never popped.
    owners: Vec<String>,
    // Ids of enclosing function nodes, innermost last.
    functions: Vec<String>,
    flags: Vec<SegmentFlags>,
}

impl ScopeTracker {
    pub fn new(file: impl Into<String>, module_id: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            segments: Vec::new(),
            sibling_counts: vec![HashMap::new()],
            owners: vec![module_id.into()],
            functions: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Push a scope segment, assigning a disambiguating counter if a sibling
    /// with the same tag and name was already counted at this depth. Returns
    /// the assigned counter.
    pub fn enter(&mut self, name: impl Into<String>, kind: ScopeKind, counter_tag: &str) -> u32 {
        let name = name.into();
        let counter = self.bump_counter(counter_tag, &name);
        self.segments.push(ScopeSegment {
            name,
            kind,
            counter,
        });
        self.sibling_counts.push(HashMap::new());
        self.flags.push(SegmentFlags::default());
        counter
    }

    /// Mark the innermost segment's node as an owner of Contains edges. Its
    /// id becomes the current scope id until the segment exits. Function
    /// owners are additionally tracked for `current_function_id`.
    pub fn promote_owner(&mut self, id: String, is_function: bool) {
        let flags = self
            .flags
            .last_mut()
            .expect("scope tracker: promote_owner without an entered scope");
        flags.pushed_owner = true;
        if is_function {
            flags.pushed_function = true;
            self.functions.push(id.clone());
        }
        self.owners.push(id);
    }

    /// Pop the innermost scope. Popping past the module root is a programming
    /// error in the traversal, not a recoverable condition.
    pub fn exit(&mut self) {
        let flags = self
            .flags
            .pop()
            .expect("scope tracker: exit() without matching enter()");
        self.segments
            .pop()
            .expect("scope tracker: exit() without matching enter()");
        self.sibling_counts.pop();
        if flags.pushed_owner {
            self.owners
                .pop()
                .expect("scope tracker: owner stack underflow");
        }
        if flags.pushed_function {
            self.functions.pop();
        }
    }

    /// The full segment list, outermost first. The module root is implicit
    /// and not part of the path.
    pub fn path(&self) -> &[ScopeSegment] {
        &self.segments
    }

    /// The segment list excluding the innermost entry: the path a node
    /// forming the innermost scope was itself declared at.
    pub fn parent_path(&self) -> &[ScopeSegment] {
        let len = self.segments.len();
        if len == 0 { &[] } else { &self.segments[..len - 1] }
    }

    /// Id of the nearest enclosing node that can own a Contains edge.
    pub fn current_scope_id(&self) -> &str {
        self.owners
            .last()
            .expect("scope tracker: owner stack underflow")
    }

    /// Id of the nearest enclosing function node, if any.
    pub fn current_function_id(&self) -> Option<&str> {
        self.functions.last().map(String::as_str)
    }

    /// Assign a sibling counter for a non-scope entity (call site,
    /// constructor call) at the current depth without entering a scope.
    pub fn bump_counter(&mut self, tag: &str, name: &str) -> u32 {
        let counts = self
            .sibling_counts
            .last_mut()
            .expect("scope tracker: sibling counter stack underflow");
        *counts
            .entry(format!("{tag}:{name}"))
            .and_modify(|c| *c += 1)
            .or_insert(0)
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}
