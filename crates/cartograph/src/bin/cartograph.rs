#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cartograph::analysis;
use cartograph::config;
use cartograph::error::AnalysisError;
use cartograph::identity;
use cartograph::store::SqliteStore;
use cartograph::types::{Node, NodeKind};

#[derive(Parser)]
#[command(name = "cartograph", version, about = "Typed code graphs from source syntax trees")]
struct Cli {
    /// Project root (defaults to the current directory).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create .cartograph/ with a default configuration.
    Init,
    /// Index the project, skipping files whose content is unchanged.
    Index {
        /// Clear the graph and re-index everything.
        #[arg(long)]
        force: bool,
    },
    /// Reconcile the graph with the working tree.
    Sync,
    /// Show graph statistics.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Look up nodes by id, kind, name, or scope prefix.
    Query {
        /// Exact semantic id.
        #[arg(long)]
        id: Option<String>,
        /// Node kind tag (function, class, variable, ...).
        #[arg(long)]
        kind: Option<String>,
        /// Exact entity name.
        #[arg(long)]
        name: Option<String>,
        /// Scope-prefix id (everything inside that scope).
        #[arg(long)]
        scope: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = cli
        .root
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    match run(&root, cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(root: &std::path::Path, command: Command) -> Result<ExitCode, AnalysisError> {
    match command {
        Command::Init => {
            config::init_project(root)?;
            println!("initialized {}", config::config_path(root).display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Index { force } => {
            let result = analysis::index_all(root, force)?;
            println!(
                "indexed {} files ({} skipped, {} failed): {} nodes, {} edges in {}ms",
                result.files_indexed,
                result.files_skipped,
                result.files_failed,
                result.nodes_created,
                result.edges_created,
                result.duration_ms
            );
            for error in &result.errors {
                eprintln!("  {}", error.message);
            }
            Ok(if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Sync => {
            let result = analysis::sync(root)?;
            println!(
                "sync: {} added, {} modified, {} removed ({} checked) in {}ms",
                result.files_added,
                result.files_modified,
                result.files_removed,
                result.files_checked,
                result.duration_ms
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Status { json } => {
            let store = SqliteStore::open(root)?;
            let nodes = store.node_count()?;
            let edges = store.edge_count()?;
            let by_kind = store.counts_by_kind()?;
            if json {
                let breakdown: serde_json::Map<String, serde_json::Value> = by_kind
                    .iter()
                    .map(|(kind, count)| (kind.clone(), (*count).into()))
                    .collect();
                let payload = serde_json::json!({
                    "nodes": nodes,
                    "edges": edges,
                    "by_kind": breakdown,
                });
                println!("{}", serde_json::to_string_pretty(&payload).map_err(to_io)?);
            } else {
                println!("{nodes} nodes, {edges} edges");
                for (kind, count) in by_kind {
                    println!("  {kind:<12} {count}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Query {
            id,
            kind,
            name,
            scope,
            limit,
            json,
        } => {
            let store = SqliteStore::open(root)?;
            let nodes: Vec<Node> = if let Some(id) = id {
                store.node_by_id(&id)?.into_iter().collect()
            } else if let Some(scope) = scope {
                let prefix = format!("{scope}{}", identity::SCOPE_SEP);
                store.nodes_in_scope(&prefix, limit)?
            } else if let Some(kind) = kind {
                let kind = NodeKind::from_tag(&kind).ok_or_else(|| {
                    AnalysisError::Io(std::io::Error::other(format!("unknown kind '{kind}'")))
                })?;
                store.nodes_by_kind(kind, limit)?
            } else if let Some(name) = name {
                store.nodes_by_name(&name, limit)?
            } else {
                return Err(AnalysisError::Io(std::io::Error::other(
                    "query needs one of --id, --kind, --name, --scope",
                )));
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&nodes).map_err(to_io)?);
            } else {
                for node in &nodes {
                    println!("{}\t{}:{}", node.id, node.file, node.line);
                }
                println!("{} nodes", nodes.len());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn to_io(err: serde_json::Error) -> AnalysisError {
    AnalysisError::Io(std::io::Error::other(err))
}
