#![forbid(unsafe_code)]

//! Cartograph builds typed, queryable code graphs from source syntax trees.
//!
//! The pipeline per file: tree-sitter parse, one collector pass per
//! syntactic category (all sharing the same scope-aware walker so semantic
//! ids come out identical in every pass), then the assembler brands records
//! into nodes, domain builders attach edges, and the pending-node flush plus
//! commit make the file's graph visible atomically.
//!
//! Node identity is semantic, not positional: formatting-only edits leave
//! every id untouched, and re-analyzing an unchanged file rewrites the exact
//! same rows.

pub mod analysis;
pub mod assembler;
pub mod builders;
pub mod collect;
pub mod config;
pub mod error;
pub mod identity;
pub mod scope;
pub mod store;
pub mod types;
pub mod utils;
