#![forbid(unsafe_code)]

//! Module-runtime collector: import and export statements, one record per
//! bound or exported symbol. Resolution of specifiers to module or external
//! ids, runtime-singleton detection, and rejection-handling analysis all
//! happen in the module-runtime builder; the collector only captures the
//! surface syntax.

use tree_sitter::Node as TsNode;

use crate::identity::semantic_id;
use crate::types::NodeKind;

use super::walk;
use super::{CollectCx, Collector, CollectorKind, ExportRecord, ImportRecord};

#[derive(Default)]
pub struct ModuleRuntimeCollector;

impl Collector for ModuleRuntimeCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::ModuleRuntime
    }

    fn visit(&mut self, node: TsNode<'_>, cx: &mut CollectCx<'_>) {
        match node.kind() {
            "import_statement" => self.import(node, cx),
            "export_statement" => self.export(node, cx),
            _ => {}
        }
    }
}

impl ModuleRuntimeCollector {
    fn import(&mut self, node: TsNode<'_>, cx: &mut CollectCx<'_>) {
        let Some(specifier) = import_source(node, cx) else {
            return;
        };

        let mut bindings: Vec<(String, Option<String>, TsNode<'_>)> = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "import_clause" {
                continue;
            }
            let mut cc = child.walk();
            for part in child.named_children(&mut cc) {
                match part.kind() {
                    // `import fs from 'fs'` binds the default export.
                    "identifier" => {
                        bindings.push((
                            cx.text(part).to_string(),
                            Some("default".to_string()),
                            part,
                        ));
                    }
                    // `import * as path from 'path'`.
                    "namespace_import" => {
                        if let Some(local) = first_identifier(part) {
                            bindings.push((
                                cx.text(local).to_string(),
                                Some("*".to_string()),
                                local,
                            ));
                        }
                    }
                    "named_imports" => {
                        let mut nc = part.walk();
                        for spec in part.named_children(&mut nc) {
                            if spec.kind() != "import_specifier" {
                                continue;
                            }
                            let Some(name) = spec.child_by_field_name("name") else {
                                continue;
                            };
                            let exported = cx.text(name).to_string();
                            let local = spec
                                .child_by_field_name("alias")
                                .map(|a| cx.text(a).to_string())
                                .unwrap_or_else(|| exported.clone());
                            bindings.push((local, Some(exported), spec));
                        }
                    }
                    _ => {}
                }
            }
        }
        // Side-effect imports (`import './polyfill'`) bind nothing but are
        // still part of the module graph.
        if bindings.is_empty() {
            bindings.push((specifier.clone(), None, node));
        }

        for (local_name, export_name, at) in bindings {
            let counter = cx
                .tracker
                .bump_counter(NodeKind::Import.tag(), &local_name);
            let pos = at.start_position();
            match semantic_id(
                cx.file,
                cx.tracker.path(),
                NodeKind::Import,
                &local_name,
                counter,
            ) {
                Ok(id) => cx.out.imports.push(ImportRecord {
                    id,
                    local_name,
                    specifier: specifier.clone(),
                    export_name,
                    scope_id: cx.tracker.current_scope_id().to_string(),
                    file: cx.file.to_string(),
                    line: pos.row as i64 + 1,
                    column: pos.column as i64,
                }),
                Err(err) => cx.diagnostic(at, "identity", err.to_string()),
            }
        }
    }

    fn export(&mut self, node: TsNode<'_>, cx: &mut CollectCx<'_>) {
        let specifier = import_source(node, cx);
        let mut names: Vec<(String, TsNode<'_>)> = Vec::new();

        if let Some(decl) = node.child_by_field_name("declaration") {
            export_declaration_names(decl, cx, &mut names);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "export_clause" => {
                    let mut ec = child.walk();
                    for spec in child.named_children(&mut ec) {
                        if spec.kind() != "export_specifier" {
                            continue;
                        }
                        let exported = spec
                            .child_by_field_name("alias")
                            .or_else(|| spec.child_by_field_name("name"));
                        if let Some(exported) = exported {
                            names.push((cx.text(exported).to_string(), spec));
                        }
                    }
                }
                "namespace_export" => {
                    if let Some(local) = first_identifier(child) {
                        names.push((cx.text(local).to_string(), child));
                    }
                }
                // `export * from 'm'` re-exports everything unnamed.
                "*" => names.push(("*".to_string(), child)),
                _ => {}
            }
        }
        if names.is_empty() && has_default_keyword(node) {
            names.push(("default".to_string(), node));
        }

        for (name, at) in names {
            let counter = cx.tracker.bump_counter(NodeKind::Export.tag(), &name);
            let pos = at.start_position();
            match semantic_id(cx.file, cx.tracker.path(), NodeKind::Export, &name, counter) {
                Ok(id) => cx.out.exports.push(ExportRecord {
                    id,
                    name,
                    specifier: specifier.clone(),
                    scope_id: cx.tracker.current_scope_id().to_string(),
                    file: cx.file.to_string(),
                    line: pos.row as i64 + 1,
                    column: pos.column as i64,
                }),
                Err(err) => cx.diagnostic(at, "identity", err.to_string()),
            }
        }
    }
}

fn import_source(node: TsNode<'_>, cx: &CollectCx<'_>) -> Option<String> {
    let source = node.child_by_field_name("source")?;
    let text = cx.text(source).trim_matches(['"', '\'', '`']).to_string();
    if text.is_empty() { None } else { Some(text) }
}

fn first_identifier<'t>(node: TsNode<'t>) -> Option<TsNode<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .find(|c| c.kind() == "identifier")
}

fn has_default_keyword(node: TsNode<'_>) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == "default")
}

/// Names bound by an exported declaration (`export function f`,
/// `export const a = 1, b = 2`, `export class C`).
fn export_declaration_names<'t>(
    decl: TsNode<'t>,
    cx: &CollectCx<'_>,
    names: &mut Vec<(String, TsNode<'t>)>,
) {
    match decl.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = decl.walk();
            for declarator in decl.named_children(&mut cursor) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                if let Some(name) = declarator.child_by_field_name("name") {
                    if name.kind() == "identifier" {
                        names.push((cx.text(name).to_string(), declarator));
                    }
                }
            }
        }
        kind if walk::is_function_kind(kind) || kind.starts_with("class") => {
            if let Some(name) = decl.child_by_field_name("name") {
                names.push((cx.text(name).to_string(), decl));
            } else {
                names.push(("default".to_string(), decl));
            }
        }
        _ => {}
    }
}
