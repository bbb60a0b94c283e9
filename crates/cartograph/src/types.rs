#![forbid(unsafe_code)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Kinds of code entities the pipeline produces.
///
/// `Module` is the designated root for one file; every other node is anchored
/// to an enclosing scope through a `Contains` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Module,
    Function,
    Class,
    Variable,
    Parameter,
    CallSite,
    ConstructorCall,
    Scope,
    Branch,
    Case,
    Loop,
    TryBlock,
    CatchBlock,
    FinallyBlock,
    Import,
    Export,
    ExternalModule,
    Resource,
}

impl NodeKind {
    /// Stable tag used inside semantic ids. Part of the external id contract.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Function => "function",
            Self::Class => "class",
            Self::Variable => "variable",
            Self::Parameter => "parameter",
            Self::CallSite => "call",
            Self::ConstructorCall => "new",
            Self::Scope => "scope",
            Self::Branch => "branch",
            Self::Case => "case",
            Self::Loop => "loop",
            Self::TryBlock => "try",
            Self::CatchBlock => "catch",
            Self::FinallyBlock => "finally",
            Self::Import => "import",
            Self::Export => "export",
            Self::ExternalModule => "external",
            Self::Resource => "resource",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "module" => Self::Module,
            "function" => Self::Function,
            "class" => Self::Class,
            "variable" => Self::Variable,
            "parameter" => Self::Parameter,
            "call" => Self::CallSite,
            "new" => Self::ConstructorCall,
            "scope" => Self::Scope,
            "branch" => Self::Branch,
            "case" => Self::Case,
            "loop" => Self::Loop,
            "try" => Self::TryBlock,
            "catch" => Self::CatchBlock,
            "finally" => Self::FinallyBlock,
            "import" => Self::Import,
            "export" => Self::Export,
            "external" => Self::ExternalModule,
            "resource" => Self::Resource,
            _ => return None,
        })
    }
}

/// Fixed edge vocabulary. One domain builder owns each family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Contains,
    Calls,
    Returns,
    Yields,
    Throws,
    AssignedFrom,
    Mutates,
    DerivesFrom,
    Implements,
    HasCondition,
    HasBody,
    HasHandler,
    Imports,
    Exports,
    Instantiates,
    Uses,
}

impl EdgeKind {
    /// Stable tag stored in the edges table.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Calls => "calls",
            Self::Returns => "returns",
            Self::Yields => "yields",
            Self::Throws => "throws",
            Self::AssignedFrom => "assigned_from",
            Self::Mutates => "mutates",
            Self::DerivesFrom => "derives_from",
            Self::Implements => "implements",
            Self::HasCondition => "has_condition",
            Self::HasBody => "has_body",
            Self::HasHandler => "has_handler",
            Self::Imports => "imports",
            Self::Exports => "exports",
            Self::Instantiates => "instantiates",
            Self::Uses => "uses",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "contains" => Self::Contains,
            "calls" => Self::Calls,
            "returns" => Self::Returns,
            "yields" => Self::Yields,
            "throws" => Self::Throws,
            "assigned_from" => Self::AssignedFrom,
            "mutates" => Self::Mutates,
            "derives_from" => Self::DerivesFrom,
            "implements" => Self::Implements,
            "has_condition" => Self::HasCondition,
            "has_body" => Self::HasBody,
            "has_handler" => Self::HasHandler,
            "imports" => Self::Imports,
            "exports" => Self::Exports,
            "instantiates" => Self::Instantiates,
            "uses" => Self::Uses,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    JavaScript,
    Jsx,
    TypeScript,
    Tsx,
    Unknown,
}

impl Language {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::JavaScript => "javascript",
            Self::Jsx => "jsx",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "javascript" => Self::JavaScript,
            "jsx" => Self::Jsx,
            "typescript" => Self::TypeScript,
            "tsx" => Self::Tsx,
            _ => Self::Unknown,
        }
    }
}

pub type Metadata = HashMap<String, serde_json::Value>;

/// A graph node. Created exactly once by exactly one collector pass.
/// Immutable after it is written for the run; deferred nodes may be mutated
/// in the pending window before flush.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    pub file: String,
    pub line: i64,
    pub column: i64,
    pub metadata: Option<Metadata>,
}

/// A directed, typed edge between two node ids. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub src: String,
    pub dst: String,
    pub kind: EdgeKind,
    pub metadata: Option<Metadata>,
    pub line: Option<i64>,
    pub column: Option<i64>,
}

/// Bookkeeping row for one indexed file, used for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub content_hash: String,
    pub language: Language,
    pub size: u64,
    pub indexed_at: i64,
    pub node_count: i64,
}

/// Per-file result returned to orchestration for progress reporting.
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub file: String,
    pub nodes_created: usize,
    pub edges_created: usize,
    pub node_ids: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A locally recovered problem (dropped record, skipped anchor). Surfaced in
/// the file summary, never aborts the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub line: Option<i64>,
    pub column: Option<i64>,
    pub code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IndexResult {
    pub success: bool,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub nodes_created: usize,
    pub edges_created: usize,
    pub errors: Vec<Diagnostic>,
    pub duration_ms: u128,
}

#[derive(Debug, Clone)]
pub struct SyncResult {
    pub files_checked: usize,
    pub files_added: usize,
    pub files_modified: usize,
    pub files_removed: usize,
    pub nodes_updated: usize,
    pub duration_ms: u128,
}

/// Project configuration persisted under `.cartograph/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub version: i64,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub max_file_size: u64,
}
