//! Import synthesis and source-unit assembly.
//!
//! Missing identifiers are matched against the component catalog first, then a
//! fixed name-to-module table. All import sources are merged into one
//! deduplicated, insertion-ordered set and re-emitted ahead of the fragment
//! body; a fragment with no export syntax gets an auto-generated preview
//! harness appended.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_parser::Parser;
use regex::Regex;
use std::collections::HashMap;

use crate::analyze::fragment_source_type;
use crate::types::{ComponentInfo, DependencyContext, ImportInfo, ImportSpecifier};

/// Wrapper target when no component name can be inferred from the fragment.
pub const FALLBACK_COMPONENT_NAME: &str = "PreviewComponent";

const RUNTIME_MODULE: &str = "react";
const RUNTIME_DEFAULT: &str = "React";

#[derive(Clone, Copy)]
enum KnownStyle {
    Default,
    Named,
}

struct KnownModule {
    module: &'static str,
    style: KnownStyle,
}

lazy_static! {
    /// Built-in name -> module table for identifiers the catalog cannot
    /// resolve: runtime hooks, router/query/animation hooks, and the usual
    /// utility-library default imports.
    static ref KNOWN_MODULES: HashMap<&'static str, KnownModule> = {
        let mut m = HashMap::new();
        let mut named = |name: &'static str, module: &'static str| {
            m.insert(name, KnownModule { module, style: KnownStyle::Named });
        };
        named("useState", "react");
        named("useEffect", "react");
        named("useMemo", "react");
        named("useCallback", "react");
        named("useRef", "react");
        named("useContext", "react");
        named("useReducer", "react");
        named("useLayoutEffect", "react");
        named("useTransition", "react");
        named("useDeferredValue", "react");
        named("useId", "react");
        named("Fragment", "react");
        named("createContext", "react");
        named("forwardRef", "react");
        named("memo", "react");
        named("createPortal", "react-dom");
        named("createRoot", "react-dom/client");
        named("el", "redom");
        named("css", "styled-components");
        named("keyframes", "styled-components");
        named("motion", "framer-motion");
        named("AnimatePresence", "framer-motion");
        named("observer", "mobx-react-lite");
        named("useQuery", "@tanstack/react-query");
        named("useMutation", "@tanstack/react-query");
        named("useQueryClient", "@tanstack/react-query");
        named("Link", "react-router-dom");
        named("NavLink", "react-router-dom");
        named("useNavigate", "react-router-dom");
        named("useParams", "react-router-dom");
        named("useLocation", "react-router-dom");
        named("z", "zod");
        named("v4", "uuid");

        let mut default = |name: &'static str, module: &'static str| {
            m.insert(name, KnownModule { module, style: KnownStyle::Default });
        };
        default("React", "react");
        default("h", "react-hyperscript");
        default("classNames", "classnames");
        default("clsx", "clsx");
        default("styled", "styled-components");
        default("axios", "axios");
        default("_", "lodash");
        default("moment", "moment");
        default("dayjs", "dayjs");
        default("PropTypes", "prop-types");
        default("toast", "react-hot-toast");
        m
    };

    static ref EXPORT_RE: Regex = Regex::new(r"(?m)^\s*export\b").unwrap();
    static ref FUNCTION_NAME_RE: Regex =
        Regex::new(r"(?m)^\s*(?:async\s+)?function\s+([A-Z][A-Za-z0-9_]*)").unwrap();
    static ref CONST_NAME_RE: Regex =
        Regex::new(r"(?m)^\s*(?:const|let|var)\s+([A-Z][A-Za-z0-9_]*)\s*[:=]").unwrap();
    static ref CLASS_NAME_RE: Regex =
        Regex::new(r"(?m)^\s*class\s+([A-Z][A-Za-z0-9_]*)").unwrap();
}

pub struct AssembledUnit {
    pub source: String,
    /// Imports synthesized for missing identifiers, in identifier order.
    pub suggested: Vec<ImportInfo>,
    /// Identifiers no source could supply.
    pub unresolved: Vec<String>,
    pub wrapped: bool,
}

/// Produce one compilable source unit from a fragment plus its analysis.
pub fn assemble(
    fragment: &str,
    context: &DependencyContext,
    catalog: &[ComponentInfo],
    additional_imports: &[ImportInfo],
    mock_props: Option<&serde_json::Value>,
    fragment_path: Option<&str>,
) -> AssembledUnit {
    assemble_cached(
        fragment,
        context,
        catalog,
        additional_imports,
        mock_props,
        fragment_path,
        &mut HashMap::new(),
    )
}

/// Like [`assemble`], but memoizes suggestion lookups in a caller-owned cache
/// keyed by `(identifier, fragment path)` so a long-lived compiler instance
/// pays for each lookup once per catalog snapshot.
pub fn assemble_cached(
    fragment: &str,
    context: &DependencyContext,
    catalog: &[ComponentInfo],
    additional_imports: &[ImportInfo],
    mock_props: Option<&serde_json::Value>,
    fragment_path: Option<&str>,
    suggestion_cache: &mut HashMap<(String, String), Option<ImportInfo>>,
) -> AssembledUnit {
    let mut missing: Vec<&String> = context.missing_identifiers.iter().collect();
    missing.sort();

    let mut suggested = Vec::new();
    let mut unresolved = Vec::new();
    for ident in missing {
        let key = (
            ident.clone(),
            fragment_path.unwrap_or("root").to_string(),
        );
        let suggestion = match suggestion_cache.get(&key) {
            Some(cached) => cached.clone(),
            None => {
                let fresh = suggest_import(ident, catalog, fragment_path);
                suggestion_cache.insert(key, fresh.clone());
                fresh
            }
        };
        match suggestion {
            Some(info) => suggested.push(info),
            None => unresolved.push(ident.clone()),
        }
    }

    let mut merged = merge_imports(&[&context.imports, &suggested, additional_imports]);
    ensure_runtime_import(&mut merged);

    let imports_block = merged
        .values()
        .map(emit_import)
        .collect::<Vec<_>>()
        .join("\n");

    let body = strip_imports(fragment);
    let mut source = format!("{}\n\n{}", imports_block, body.trim_end());

    let wrapped = !EXPORT_RE.is_match(fragment);
    if wrapped {
        let name = detect_component_name(fragment)
            .unwrap_or_else(|| FALLBACK_COMPONENT_NAME.to_string());
        source.push_str("\n\n");
        source.push_str(&build_wrapper(&name, mock_props));
    }
    source.push('\n');

    AssembledUnit {
        source,
        suggested,
        unresolved,
        wrapped,
    }
}

/// Catalog first, then the fixed table; first match wins.
pub fn suggest_import(
    identifier: &str,
    catalog: &[ComponentInfo],
    fragment_path: Option<&str>,
) -> Option<ImportInfo> {
    if let Some(entry) = catalog.iter().find(|c| c.name == identifier) {
        let module = relative_import_path(fragment_path, &entry.file_path);
        let specifier = if entry.is_default_export {
            ImportSpecifier::default_import(identifier)
        } else {
            ImportSpecifier::named(identifier)
        };
        let mut info = ImportInfo::new(&module, vec![specifier]);
        info.resolved_path = Some(entry.file_path.clone());
        return Some(info);
    }

    KNOWN_MODULES.get(identifier).map(|known| {
        let specifier = match known.style {
            KnownStyle::Default => ImportSpecifier::default_import(identifier),
            KnownStyle::Named => ImportSpecifier::named(identifier),
        };
        ImportInfo::new(known.module, vec![specifier])
    })
}

/// Relative specifier from the fragment's directory to a catalog file, with
/// the source extension dropped.
pub fn relative_import_path(from: Option<&str>, to: &str) -> String {
    let to = to
        .trim_end_matches(".tsx")
        .trim_end_matches(".ts")
        .trim_end_matches(".jsx")
        .trim_end_matches(".js");

    let from_dir: Vec<&str> = match from.and_then(|f| f.rfind('/').map(|i| &f[..i])) {
        Some(dir) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let to_parts: Vec<&str> = to.split('/').collect();

    let mut common = 0;
    while common < from_dir.len()
        && common < to_parts.len().saturating_sub(1)
        && from_dir[common] == to_parts[common]
    {
        common += 1;
    }

    let ups = from_dir.len() - common;
    let rest = to_parts[common..].join("/");
    if ups == 0 {
        format!("./{}", rest)
    } else {
        format!("{}{}", "../".repeat(ups), rest)
    }
}

/// Merge import lists keyed by `(module, sorted local names)`. The first
/// writer of a key wins; iteration order is insertion order.
pub fn merge_imports(groups: &[&[ImportInfo]]) -> IndexMap<String, ImportInfo> {
    let mut merged: IndexMap<String, ImportInfo> = IndexMap::new();
    for group in groups {
        for info in group.iter() {
            merged.entry(merge_key(info)).or_insert_with(|| info.clone());
        }
    }
    merged
}

pub fn merge_key(info: &ImportInfo) -> String {
    let mut names: Vec<&str> = info
        .specifiers
        .iter()
        .map(|spec| spec.local_name())
        .collect();
    names.sort_unstable();
    format!("{}::{}", info.module, names.join(","))
}

/// The preview runtime must always be importable by the generated harness.
fn ensure_runtime_import(merged: &mut IndexMap<String, ImportInfo>) {
    let present = merged
        .values()
        .any(|info| info.module == RUNTIME_MODULE && info.specifiers.iter().any(|s| s.is_default));
    if !present {
        let info = ImportInfo::new(
            RUNTIME_MODULE,
            vec![ImportSpecifier::default_import(RUNTIME_DEFAULT)],
        );
        merged.shift_insert(0, merge_key(&info), info);
    }
}

/// Reconstruct one import statement from specifier flags: default clause
/// first, then namespace, then the named group.
pub fn emit_import(info: &ImportInfo) -> String {
    if info.specifiers.is_empty() {
        return format!("import '{}';", info.module);
    }

    let mut clauses: Vec<String> = Vec::new();
    if let Some(default) = info.specifiers.iter().find(|s| s.is_default) {
        clauses.push(default.local_name().to_string());
    }
    if let Some(ns) = info.specifiers.iter().find(|s| s.is_namespace) {
        clauses.push(format!("* as {}", ns.local_name()));
    }
    let named: Vec<String> = info
        .specifiers
        .iter()
        .filter(|s| !s.is_default && !s.is_namespace)
        .map(|s| match &s.alias {
            Some(alias) => format!("{} as {}", s.name, alias),
            None => s.name.clone(),
        })
        .collect();
    if !named.is_empty() {
        clauses.push(format!("{{ {} }}", named.join(", ")));
    }

    format!("import {} from '{}';", clauses.join(", "), info.module)
}

/// Drop the fragment's own import statements; the merged set re-emits them.
fn strip_imports(fragment: &str) -> String {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, fragment, fragment_source_type()).parse();
    if !ret.errors.is_empty() {
        return fragment.to_string();
    }

    let mut ranges: Vec<(usize, usize)> = ret
        .program
        .body
        .iter()
        .filter_map(|stmt| match stmt {
            oxc_ast::ast::Statement::ImportDeclaration(decl) => {
                Some((decl.span.start as usize, decl.span.end as usize))
            }
            _ => None,
        })
        .collect();
    if ranges.is_empty() {
        return fragment.to_string();
    }
    ranges.sort_unstable();

    let mut out = String::with_capacity(fragment.len());
    let mut cursor = 0usize;
    for (start, end) in ranges {
        out.push_str(&fragment[cursor..start]);
        cursor = end;
        // Swallow the statement's trailing newline too.
        if fragment[cursor..].starts_with('\n') {
            cursor += 1;
        }
    }
    out.push_str(&fragment[cursor..]);
    out.trim_start().to_string()
}

/// Lightweight pattern match on the first capitalized declaration.
pub fn detect_component_name(fragment: &str) -> Option<String> {
    let candidates: [Option<(usize, &Regex)>; 3] = [
        FUNCTION_NAME_RE.find(fragment).map(|m| (m.start(), &*FUNCTION_NAME_RE)),
        CONST_NAME_RE.find(fragment).map(|m| (m.start(), &*CONST_NAME_RE)),
        CLASS_NAME_RE.find(fragment).map(|m| (m.start(), &*CLASS_NAME_RE)),
    ];
    let (_, re) = candidates.into_iter().flatten().min_by_key(|(pos, _)| *pos)?;
    re.captures(fragment)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// Default-exported harness that renders the detected component with the
/// supplied mock props, trapping render failures into a visible error block.
fn build_wrapper(component: &str, mock_props: Option<&serde_json::Value>) -> String {
    let has_props = mock_props.map(|v| !v.is_null()).unwrap_or(false);
    let mut out = String::new();

    if has_props {
        let props_json = serde_json::to_string(mock_props.unwrap())
            .unwrap_or_else(|_| "{}".to_string());
        out.push_str(&format!("const __previewProps = {};\n\n", props_json));
    }

    let element = if has_props {
        format!("<{} {{...__previewProps}} />", component)
    } else {
        format!("<{} />", component)
    };

    out.push_str(&format!(
        "export default function __Preview() {{\n  try {{\n    return {};\n  }} catch (error) {{\n    return (\n      <div style={{{{ padding: \"12px\", color: \"#b91c1c\", fontFamily: \"monospace\" }}}}>\n        Failed to render {}: {{String(error)}}\n      </div>\n    );\n  }}\n}}",
        element, component
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::analyze_fragment;
    use crate::types::{ComponentKind, PropInfo};

    fn catalog_entry(name: &str, path: &str, default: bool) -> ComponentInfo {
        ComponentInfo {
            name: name.to_string(),
            file_path: path.to_string(),
            props: Vec::<PropInfo>::new(),
            is_default_export: default,
            kind: ComponentKind::Function,
            line: 1,
            column: 1,
        }
    }

    #[test]
    fn test_catalog_suggestion_precedes_known_modules() {
        // `Link` exists in the known-modules table but the catalog wins.
        let catalog = vec![catalog_entry("Link", "src/components/Link.tsx", false)];
        let info = suggest_import("Link", &catalog, Some("src/pages/Home.tsx")).unwrap();
        assert_eq!(info.module, "../components/Link");
        assert_eq!(info.resolved_path.as_deref(), Some("src/components/Link.tsx"));
    }

    #[test]
    fn test_default_vs_named_catalog_suggestion() {
        let catalog = vec![
            catalog_entry("Card", "src/Card.tsx", true),
            catalog_entry("Button", "src/Button.tsx", false),
        ];
        let card = suggest_import("Card", &catalog, None).unwrap();
        assert!(card.specifiers[0].is_default);
        let button = suggest_import("Button", &catalog, None).unwrap();
        assert!(!button.specifiers[0].is_default);
    }

    #[test]
    fn test_known_module_suggestion() {
        let hook = suggest_import("useState", &[], None).unwrap();
        assert_eq!(hook.module, "react");
        assert!(!hook.specifiers[0].is_default);

        let util = suggest_import("clsx", &[], None).unwrap();
        assert_eq!(util.module, "clsx");
        assert!(util.specifiers[0].is_default);

        assert!(suggest_import("definitelyNotAThing", &[], None).is_none());
    }

    #[test]
    fn test_relative_import_path() {
        assert_eq!(
            relative_import_path(Some("src/pages/Home.tsx"), "src/components/Button.tsx"),
            "../components/Button"
        );
        assert_eq!(
            relative_import_path(Some("src/App.tsx"), "src/lib/format.ts"),
            "./lib/format"
        );
        assert_eq!(
            relative_import_path(None, "src/Card.tsx"),
            "./src/Card"
        );
    }

    #[test]
    fn test_emit_import_shapes() {
        let default = ImportInfo::new("react", vec![ImportSpecifier::default_import("React")]);
        assert_eq!(emit_import(&default), "import React from 'react';");

        let mixed = ImportInfo::new(
            "react",
            vec![
                ImportSpecifier::default_import("React"),
                ImportSpecifier::named("useState"),
                ImportSpecifier {
                    name: "useEffect".to_string(),
                    alias: Some("useFx".to_string()),
                    is_default: false,
                    is_namespace: false,
                },
            ],
        );
        assert_eq!(
            emit_import(&mixed),
            "import React, { useState, useEffect as useFx } from 'react';"
        );

        let ns = ImportInfo::new("./utils", vec![ImportSpecifier::namespace("utils")]);
        assert_eq!(emit_import(&ns), "import * as utils from './utils';");

        let side_effect = ImportInfo::new("./styles.css", vec![]);
        assert_eq!(emit_import(&side_effect), "import './styles.css';");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = vec![ImportInfo::new(
            "clsx",
            vec![ImportSpecifier::default_import("clsx")],
        )];
        let additional = vec![ImportInfo::new(
            "clsx",
            vec![ImportSpecifier::default_import("clsx")],
        )];
        let merged = merge_imports(&[&existing, &additional]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_assemble_wraps_bare_fragment() {
        let fragment = "function Greet({name}) { return el('div', null, name); }";
        let ctx = analyze_fragment(fragment, None).unwrap();
        let unit = assemble(fragment, &ctx, &[], &[], None, None);

        assert!(unit.wrapped);
        assert!(unit.source.contains("import { el } from 'redom';"));
        assert!(unit.source.contains("import React from 'react';"));
        assert!(unit.source.contains("export default function __Preview()"));
        assert!(unit.source.contains("<Greet />"));
        assert!(unit.unresolved.is_empty());
    }

    #[test]
    fn test_assemble_passes_exported_fragment_through() {
        let fragment = "import {useState} from 'react';\nexport default function Counter() { const [n] = useState(0); return <b>{n}</b>; }";
        let ctx = analyze_fragment(fragment, None).unwrap();
        let mock = serde_json::json!({"start": 5});
        let unit = assemble(fragment, &ctx, &[], &[], Some(&mock), None);

        assert!(!unit.wrapped);
        assert!(!unit.source.contains("__Preview"));
        assert!(!unit.source.contains("__previewProps"));
        // Original named import survives exactly once, runtime default added.
        assert_eq!(unit.source.matches("from 'react'").count(), 2);
        assert!(unit.source.contains("import { useState } from 'react';"));
    }

    #[test]
    fn test_mock_props_flow_into_wrapper() {
        let fragment = "function Greet({name}) { return <div>{name}</div>; }";
        let ctx = analyze_fragment(fragment, None).unwrap();
        let mock = serde_json::json!({"name": "Ada"});
        let unit = assemble(fragment, &ctx, &[], &[], Some(&mock), None);

        assert!(unit.source.contains("const __previewProps = {\"name\":\"Ada\"};"));
        assert!(unit.source.contains("<Greet {...__previewProps} />"));
    }

    #[test]
    fn test_fallback_component_name() {
        let fragment = "const render = () => <div />;";
        let ctx = analyze_fragment(fragment, None).unwrap();
        let unit = assemble(fragment, &ctx, &[], &[], None, None);
        assert!(unit.source.contains(&format!("<{} />", FALLBACK_COMPONENT_NAME)));
    }

    #[test]
    fn test_detect_component_name_first_declaration_wins() {
        assert_eq!(
            detect_component_name("const Greet = () => <div />;\nclass Other {}").as_deref(),
            Some("Greet")
        );
        assert_eq!(
            detect_component_name("async function DataView() {}").as_deref(),
            Some("DataView")
        );
        assert_eq!(detect_component_name("const lower = 1;"), None);
    }
}
