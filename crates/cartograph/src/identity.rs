#![forbid(unsafe_code)]

//! Semantic identity computation.
//!
//! The id format is an external contract shared with query consumers:
//!
//! ```text
//! <file>::<segment>::<segment>...::<kind-tag>:<name>
//! ```
//!
//! Segments with a non-zero sibling counter render as `name#N`, and so does
//! the final `kind:name` component when a disambiguator applies. Two ids are
//! special and carry no file or scope path:
//!
//! - singleton resources: `resource:<name>` (one per logical resource,
//!   regardless of file);
//! - external modules: `external:<specifier>` (not lexically scoped).
//!
//! Identity is a pure function of its inputs: re-running analysis on
//! unchanged source yields byte-identical ids, independent of call order.

use crate::error::IdentityError;
use crate::scope::ScopeSegment;
use crate::types::NodeKind;

pub const SCOPE_SEP: &str = "::";

/// Compute the semantic id for an entity at the given scope path.
pub fn semantic_id(
    file: &str,
    segments: &[ScopeSegment],
    kind: NodeKind,
    name: &str,
    disambiguator: u32,
) -> Result<String, IdentityError> {
    if name.is_empty() {
        return Err(IdentityError::EmptyName {
            file: file.to_string(),
            kind: kind.tag(),
        });
    }
    if name.contains(SCOPE_SEP) {
        return Err(IdentityError::ReservedSeparator {
            segment: name.to_string(),
        });
    }

    let mut id = String::with_capacity(file.len() + name.len() + 16);
    id.push_str(file);
    for segment in segments {
        if segment.name.contains(SCOPE_SEP) {
            return Err(IdentityError::ReservedSeparator {
                segment: segment.name.clone(),
            });
        }
        id.push_str(SCOPE_SEP);
        id.push_str(&segment.render());
    }
    id.push_str(SCOPE_SEP);
    id.push_str(kind.tag());
    id.push(':');
    id.push_str(name);
    if disambiguator > 0 {
        id.push('#');
        id.push_str(&disambiguator.to_string());
    }
    Ok(id)
}

/// Fixed, file-independent id for a singleton resource (`resource:net`).
pub fn resource_id(name: &str) -> String {
    format!("{}:{}", NodeKind::Resource.tag(), name)
}

/// Id for an external module reference, derived only from the import
/// specifier. External modules are not lexically scoped.
pub fn external_module_id(specifier: &str) -> String {
    format!("{}:{}", NodeKind::ExternalModule.tag(), specifier)
}

/// Scope-path prefix for "everything inside this scope" queries. Append the
/// separator so `a/b.ts::f` does not also match `a/b.ts::foo`.
pub fn scope_prefix(file: &str, segments: &[ScopeSegment]) -> String {
    let mut prefix = String::from(file);
    for segment in segments {
        prefix.push_str(SCOPE_SEP);
        prefix.push_str(&segment.render());
    }
    prefix.push_str(SCOPE_SEP);
    prefix
}

/// A semantic id decomposed back into its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedId {
    pub file: String,
    /// Scope segments as (name, counter) pairs.
    pub segments: Vec<(String, u32)>,
    pub kind: NodeKind,
    pub name: String,
    pub disambiguator: u32,
}

/// Parse an id back into its components. Total: malformed input yields a
/// typed error, never a panic.
pub fn parse_id(id: &str) -> Result<ParsedId, IdentityError> {
    // File-independent forms first.
    for special in [NodeKind::Resource, NodeKind::ExternalModule] {
        let prefix = format!("{}:", special.tag());
        if let Some(name) = id.strip_prefix(&prefix) {
            if name.is_empty() {
                return Err(IdentityError::Malformed {
                    id: id.to_string(),
                    reason: "empty name",
                });
            }
            return Ok(ParsedId {
                file: String::new(),
                segments: Vec::new(),
                kind: special,
                name: name.to_string(),
                disambiguator: 0,
            });
        }
    }

    let mut parts: Vec<&str> = id.split(SCOPE_SEP).collect();
    if parts.len() < 2 {
        return Err(IdentityError::Malformed {
            id: id.to_string(),
            reason: "missing scope separator",
        });
    }

    let last = parts.pop().unwrap_or_default();
    let file = parts.remove(0).to_string();
    if file.is_empty() {
        return Err(IdentityError::Malformed {
            id: id.to_string(),
            reason: "empty file component",
        });
    }

    let (tag, rest) = last.split_once(':').ok_or(IdentityError::Malformed {
        id: id.to_string(),
        reason: "final component is not kind:name",
    })?;
    let kind = NodeKind::from_tag(tag).ok_or_else(|| IdentityError::UnknownKind {
        id: id.to_string(),
        tag: tag.to_string(),
    })?;
    let (name, disambiguator) = split_counter(rest);
    if name.is_empty() {
        return Err(IdentityError::Malformed {
            id: id.to_string(),
            reason: "empty name",
        });
    }

    let mut segments = Vec::with_capacity(parts.len());
    for part in parts {
        if part.is_empty() {
            return Err(IdentityError::Malformed {
                id: id.to_string(),
                reason: "empty scope segment",
            });
        }
        let (seg_name, counter) = split_counter(part);
        segments.push((seg_name.to_string(), counter));
    }

    Ok(ParsedId {
        file,
        segments,
        kind,
        name: name.to_string(),
        disambiguator,
    })
}

/// Split a trailing `#N` counter off a rendered segment or name. A `#` whose
/// suffix is not all digits belongs to the name itself (JS private members
/// like `#count`).
fn split_counter(raw: &str) -> (&str, u32) {
    if let Some((head, tail)) = raw.rsplit_once('#') {
        if !head.is_empty() && !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(counter) = tail.parse::<u32>() {
                return (head, counter);
            }
        }
    }
    (raw, 0)
}
