//! Project export index.
//!
//! Walks every source file's syntax tree, locates exported declarations, and
//! records the ones that look like UI components together with their prop
//! schemas. The catalog is rebuilt wholesale per corpus snapshot; a file that
//! fails to parse is skipped with a log line and the build continues.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ArrowFunctionExpression, BindingPattern, Class, Declaration, Expression, FormalParameters,
    Function, JSXElement, JSXFragment, PropertyKey, Statement, TSSignature, TSType, TSTypeName,
};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::{GetSpan, Span};
use rayon::prelude::*;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::analyze::fragment_source_type;
use crate::types::{line_col, ComponentInfo, ComponentKind, ProjectFile, PropInfo};

#[cfg(feature = "napi")]
use napi_derive::napi;

/// Class bases that mark a class declaration as a component.
const COMPONENT_BASES: &[&str] = &["Component", "PureComponent"];

/// Return-type names that denote a markup/element value.
const MARKUP_RETURN_TYPES: &[&str] = &[
    "JSX.Element",
    "React.ReactElement",
    "ReactElement",
    "React.ReactNode",
    "ReactNode",
    "Element",
];

lazy_static! {
    static ref DOC_LINE_RE: Regex = Regex::new(r"(?m)^\s*\*\s?").unwrap();
}

/// Build the component catalog for a corpus snapshot. Files are processed in
/// parallel; each file's entries are deterministic and output order follows
/// input order.
pub fn build_catalog(files: &[ProjectFile]) -> Vec<ComponentInfo> {
    files
        .par_iter()
        .filter(|f| f.kind.is_source())
        .flat_map(|f| catalog_file(f))
        .collect()
}

fn catalog_file(file: &ProjectFile) -> Vec<ComponentInfo> {
    let allocator = Allocator::default();
    let source_type =
        oxc_span::SourceType::from_path(&file.path).unwrap_or_else(|_| fragment_source_type());
    let ret = Parser::new(&allocator, &file.content, source_type).parse();

    if !ret.errors.is_empty() {
        eprintln!(
            "[PartialNative] {} Skipping unparseable file {}: {:?}",
            crate::types::ERR_PROJECT_FILE_PARSE,
            file.path,
            ret.errors[0]
        );
        return Vec::new();
    }

    let body: &[Statement] = &ret.program.body;
    let type_members = collect_type_members(body);

    let mut candidates: Vec<ComponentInfo> = Vec::new();
    let mut named_exports: HashSet<String> = HashSet::new();
    let mut default_name: Option<String> = None;

    for stmt in body {
        match stmt {
            Statement::FunctionDeclaration(func) => {
                if let Some(info) =
                    component_from_function(func, file, &type_members, false)
                {
                    candidates.push(info);
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(info) = component_from_class(class, file, &type_members, false) {
                    candidates.push(info);
                }
            }
            Statement::VariableDeclaration(decl) => {
                candidates.extend(components_from_var_decl(decl, file, &type_members));
            }
            Statement::ExportNamedDeclaration(export) => {
                if let Some(decl) = &export.declaration {
                    match decl {
                        Declaration::FunctionDeclaration(func) => {
                            if let Some(info) =
                                component_from_function(func, file, &type_members, false)
                            {
                                named_exports.insert(info.name.clone());
                                candidates.push(info);
                            }
                        }
                        Declaration::ClassDeclaration(class) => {
                            if let Some(info) =
                                component_from_class(class, file, &type_members, false)
                            {
                                named_exports.insert(info.name.clone());
                                candidates.push(info);
                            }
                        }
                        Declaration::VariableDeclaration(var) => {
                            for info in components_from_var_decl(var, file, &type_members) {
                                named_exports.insert(info.name.clone());
                                candidates.push(info);
                            }
                        }
                        _ => {}
                    }
                }
                for spec in &export.specifiers {
                    named_exports.insert(spec.local.name().to_string());
                }
            }
            Statement::ExportDefaultDeclaration(export) => {
                use oxc_ast::ast::ExportDefaultDeclarationKind;
                match &export.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                        if let Some(info) =
                            component_from_function(func, file, &type_members, true)
                        {
                            candidates.push(info);
                        }
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                        if let Some(info) =
                            component_from_class(class, file, &type_members, true)
                        {
                            candidates.push(info);
                        }
                    }
                    other => {
                        if let Some(Expression::Identifier(id)) = other.as_expression() {
                            default_name = Some(id.name.to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }

    candidates
        .into_iter()
        .filter_map(|mut info| {
            if default_name.as_deref() == Some(info.name.as_str()) {
                info.is_default_export = true;
            }
            let exported = info.is_default_export || named_exports.contains(&info.name);
            exported.then_some(info)
        })
        .collect()
}

/// Interface and type-alias bodies declared in the same file, by name, so a
/// `(props: Props)` reference can be expanded without cross-file lookups.
fn collect_type_members<'a>(body: &'a [Statement<'a>]) -> HashMap<String, &'a [TSSignature<'a>]> {
    fn record<'a>(decl: &'a Declaration<'a>, map: &mut HashMap<String, &'a [TSSignature<'a>]>) {
        match decl {
            Declaration::TSInterfaceDeclaration(interface) => {
                map.insert(interface.id.name.to_string(), &interface.body.body[..]);
            }
            Declaration::TSTypeAliasDeclaration(alias) => {
                if let TSType::TSTypeLiteral(lit) = &alias.type_annotation {
                    map.insert(alias.id.name.to_string(), &lit.members[..]);
                }
            }
            _ => {}
        }
    }

    let mut map = HashMap::new();
    for stmt in body {
        match stmt {
            Statement::TSInterfaceDeclaration(interface) => {
                map.insert(interface.id.name.to_string(), &interface.body.body[..]);
            }
            Statement::TSTypeAliasDeclaration(alias) => {
                if let TSType::TSTypeLiteral(lit) = &alias.type_annotation {
                    map.insert(alias.id.name.to_string(), &lit.members[..]);
                }
            }
            Statement::ExportNamedDeclaration(export) => {
                if let Some(decl) = &export.declaration {
                    record(decl, &mut map);
                }
            }
            _ => {}
        }
    }
    map
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT PREDICATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Heuristic type-signature check, not a behavioral guarantee: a capitalized
/// name whose return annotation names a markup type, or whose body produces
/// JSX.
fn is_component_signature(name: &str, return_type: Option<&str>, body_has_jsx: bool) -> bool {
    if !starts_uppercase(name) {
        return false;
    }
    match return_type {
        Some(text) => is_markup_type(text) || body_has_jsx,
        None => body_has_jsx,
    }
}

fn is_markup_type(text: &str) -> bool {
    let text = text.trim();
    MARKUP_RETURN_TYPES
        .iter()
        .any(|t| text == *t || text.starts_with(&format!("{} ", t)) || text.contains(t))
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().map(char::is_uppercase).unwrap_or(false)
}

struct JsxFinder {
    found: bool,
}

impl<'a> Visit<'a> for JsxFinder {
    fn visit_jsx_element(&mut self, _element: &JSXElement<'a>) {
        self.found = true;
    }

    fn visit_jsx_fragment(&mut self, _fragment: &JSXFragment<'a>) {
        self.found = true;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECLARATION EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════════

fn component_from_function<'a>(
    func: &'a Function<'a>,
    file: &ProjectFile,
    type_members: &HashMap<String, &'a [TSSignature<'a>]>,
    is_default_export: bool,
) -> Option<ComponentInfo> {
    let name = func.id.as_ref()?.name.to_string();

    let return_type = func
        .return_type
        .as_ref()
        .map(|ann| slice(&file.content, ann.type_annotation.span()));

    let mut finder = JsxFinder { found: false };
    if let Some(body) = &func.body {
        finder.visit_function_body(body);
    }

    if !is_component_signature(&name, return_type, finder.found) {
        return None;
    }

    let props = props_from_params(&func.params, &file.content, type_members);
    let (line, column) = line_col(&file.content, func.span.start);

    Some(ComponentInfo {
        name,
        file_path: file.path.clone(),
        props,
        is_default_export,
        kind: ComponentKind::Function,
        line,
        column,
    })
}

fn components_from_var_decl<'a>(
    decl: &'a oxc_ast::ast::VariableDeclaration<'a>,
    file: &ProjectFile,
    type_members: &HashMap<String, &'a [TSSignature<'a>]>,
) -> Vec<ComponentInfo> {
    let mut out = Vec::new();

    for declarator in &decl.declarations {
        let name = match &declarator.id {
            BindingPattern::BindingIdentifier(id) => id.name.to_string(),
            _ => continue,
        };

        let info = match &declarator.init {
            Some(Expression::ArrowFunctionExpression(arrow)) => {
                component_from_arrow(&name, arrow, file, type_members)
            }
            Some(Expression::FunctionExpression(func)) => {
                component_from_fn_expr(&name, func, file, type_members)
            }
            _ => None,
        };
        if let Some(info) = info {
            out.push(info);
        }
    }
    out
}

fn component_from_arrow<'a>(
    name: &str,
    arrow: &'a ArrowFunctionExpression<'a>,
    file: &ProjectFile,
    type_members: &HashMap<String, &'a [TSSignature<'a>]>,
) -> Option<ComponentInfo> {
    let return_type = arrow
        .return_type
        .as_ref()
        .map(|ann| slice(&file.content, ann.type_annotation.span()));

    let mut finder = JsxFinder { found: false };
    finder.visit_function_body(&arrow.body);

    if !is_component_signature(name, return_type, finder.found) {
        return None;
    }

    let props = props_from_params(&arrow.params, &file.content, type_members);
    let (line, column) = line_col(&file.content, arrow.span.start);

    Some(ComponentInfo {
        name: name.to_string(),
        file_path: file.path.clone(),
        props,
        is_default_export: false,
        kind: ComponentKind::Arrow,
        line,
        column,
    })
}

fn component_from_fn_expr<'a>(
    name: &str,
    func: &'a Function<'a>,
    file: &ProjectFile,
    type_members: &HashMap<String, &'a [TSSignature<'a>]>,
) -> Option<ComponentInfo> {
    let return_type = func
        .return_type
        .as_ref()
        .map(|ann| slice(&file.content, ann.type_annotation.span()));

    let mut finder = JsxFinder { found: false };
    if let Some(body) = &func.body {
        finder.visit_function_body(body);
    }

    if !is_component_signature(name, return_type, finder.found) {
        return None;
    }

    let props = props_from_params(&func.params, &file.content, type_members);
    let (line, column) = line_col(&file.content, func.span.start);

    Some(ComponentInfo {
        name: name.to_string(),
        file_path: file.path.clone(),
        props,
        is_default_export: false,
        kind: ComponentKind::Function,
        line,
        column,
    })
}

fn component_from_class<'a>(
    class: &'a Class<'a>,
    file: &ProjectFile,
    type_members: &HashMap<String, &'a [TSSignature<'a>]>,
    is_default_export: bool,
) -> Option<ComponentInfo> {
    let name = class.id.as_ref()?.name.to_string();
    if !starts_uppercase(&name) {
        return None;
    }

    let base = match &class.super_class {
        Some(Expression::Identifier(id)) => id.name.to_string(),
        Some(Expression::StaticMemberExpression(member)) => member.property.name.to_string(),
        _ => return None,
    };
    if !COMPONENT_BASES.contains(&base.as_str()) {
        return None;
    }

    // Props are only readable from a generic prop type argument on the
    // heritage clause; otherwise they stay unresolved.
    let props = class
        .super_type_arguments
        .as_ref()
        .and_then(|args| args.params.first())
        .map(|ts_type| match ts_type {
            TSType::TSTypeLiteral(lit) => {
                props_from_members(&lit.members[..], &file.content, &HashMap::new())
            }
            TSType::TSTypeReference(reference) => reference_name(&reference)
                .and_then(|n| type_members.get(n))
                .map(|members| props_from_members(members, &file.content, &HashMap::new()))
                .unwrap_or_default(),
            _ => Vec::new(),
        })
        .unwrap_or_default();

    let (line, column) = line_col(&file.content, class.span.start);

    Some(ComponentInfo {
        name,
        file_path: file.path.clone(),
        props,
        is_default_export,
        kind: ComponentKind::Class,
        line,
        column,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROP SCHEMAS
// ═══════════════════════════════════════════════════════════════════════════════

fn props_from_params<'a>(
    params: &'a FormalParameters<'a>,
    source: &str,
    type_members: &HashMap<String, &'a [TSSignature<'a>]>,
) -> Vec<PropInfo> {
    let first = match params.items.first() {
        Some(p) => p,
        None => return Vec::new(),
    };

    // Destructuring defaults, keyed by prop name.
    let mut defaults: HashMap<String, String> = HashMap::new();
    let mut destructured: Vec<String> = Vec::new();
    if let BindingPattern::ObjectPattern(obj) = &first.pattern {
        for prop in &obj.properties {
            if let Some(name) = property_key_name(&prop.key) {
                if let BindingPattern::AssignmentPattern(assign) = &prop.value {
                    defaults.insert(
                        name.clone(),
                        slice(source, assign.right.span()).to_string(),
                    );
                }
                destructured.push(name);
            }
        }
    }

    let members: Option<&[TSSignature]> = match &first.type_annotation {
        Some(ann) => match &ann.type_annotation {
            TSType::TSTypeLiteral(lit) => Some(&lit.members[..]),
            TSType::TSTypeReference(reference) => {
                reference_name(&reference).and_then(|n| type_members.get(n).copied())
            }
            _ => None,
        },
        None => None,
    };

    match members {
        Some(members) => props_from_members(members, source, &defaults),
        // Untyped destructuring still names the props, just without types.
        None => destructured
            .into_iter()
            .map(|name| {
                let default_value = defaults.get(&name).cloned();
                PropInfo {
                    required: default_value.is_none(),
                    name,
                    semantic_type: "any".to_string(),
                    default_value,
                    description: None,
                }
            })
            .collect(),
    }
}

fn props_from_members(
    members: &[TSSignature],
    source: &str,
    defaults: &HashMap<String, String>,
) -> Vec<PropInfo> {
    let mut props = Vec::new();

    for member in members {
        let prop = match member {
            TSSignature::TSPropertySignature(p) => p,
            _ => continue,
        };
        let name = match property_key_name(&prop.key) {
            Some(n) => n,
            None => continue,
        };

        let semantic_type = prop
            .type_annotation
            .as_ref()
            .map(|ann| slice(source, ann.type_annotation.span()).trim().to_string())
            .unwrap_or_else(|| "any".to_string());

        props.push(PropInfo {
            required: !prop.optional,
            default_value: defaults.get(&name).cloned(),
            description: leading_doc_comment(source, prop.span().start),
            name,
            semantic_type,
        });
    }
    props
}

fn property_key_name(key: &PropertyKey) -> Option<String> {
    match key {
        PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
        PropertyKey::StringLiteral(s) => Some(s.value.to_string()),
        _ => None,
    }
}

fn reference_name<'a>(reference: &'a oxc_ast::ast::TSTypeReference<'a>) -> Option<&'a str> {
    match &reference.type_name {
        TSTypeName::IdentifierReference(id) => Some(id.name.as_str()),
        _ => None,
    }
}

fn slice(source: &str, span: Span) -> &str {
    &source[span.start as usize..span.end as usize]
}

/// The `/** … */` block immediately preceding `offset`, with comment framing
/// stripped.
fn leading_doc_comment(source: &str, offset: u32) -> Option<String> {
    let head = source[..(offset as usize).min(source.len())].trim_end();
    if !head.ends_with("*/") {
        return None;
    }
    let start = head.rfind("/**")?;
    let inner = &head[start + 3..head.len() - 2];
    let cleaned = DOC_LINE_RE.replace_all(inner, "");
    let text = cleaned.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI SURFACE
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[napi]
pub fn build_catalog_native(corpus_json: String) -> String {
    use crate::corpus::ProjectCorpus;
    use crate::types::{CompilerError, ERR_BAD_OPTIONS};

    let corpus: ProjectCorpus = match serde_json::from_str(&corpus_json) {
        Ok(c) => c,
        Err(err) => {
            let error = CompilerError::new(
                ERR_BAD_OPTIONS,
                &format!("Malformed corpus JSON: {}", err),
                "<corpus>",
                0,
                0,
            );
            return serde_json::json!({ "error": error }).to_string();
        }
    };
    serde_json::to_string(&build_catalog(&corpus.files)).expect("Failed to serialize catalog")
}
