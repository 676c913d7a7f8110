//! Fragment dependency analysis.
//!
//! Parses a fragment into a syntax tree, extracts its import statements, and
//! classifies every referenced identifier as declared locally, builtin, or
//! missing. Collection is flat (scope-unaware): every binding identifier in
//! the fragment counts as declared, wherever it appears.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingIdentifier, IdentifierReference, ImportDeclarationSpecifier, Statement,
    TSInterfaceDeclaration, TSTypeAliasDeclaration, TSTypeAnnotation, TSTypeParameterInstantiation,
};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::collections::{HashMap, HashSet};

use crate::types::{
    CompilerError, DependencyContext, ImportInfo, ImportSpecifier, ERR_FRAGMENT_PARSE,
};

lazy_static! {
    /// Identifiers that are always available and never need an import.
    pub static ref BUILTIN_GLOBALS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        // Literal keywords the analyzer may see as names
        s.insert("undefined");
        s.insert("null");
        s.insert("true");
        s.insert("false");
        s.insert("NaN");
        s.insert("Infinity");
        // ES built-ins
        s.insert("Array");
        s.insert("Object");
        s.insert("String");
        s.insert("Number");
        s.insert("Boolean");
        s.insert("Symbol");
        s.insert("BigInt");
        s.insert("Math");
        s.insert("JSON");
        s.insert("Date");
        s.insert("RegExp");
        s.insert("Error");
        s.insert("TypeError");
        s.insert("RangeError");
        s.insert("Promise");
        s.insert("Proxy");
        s.insert("Reflect");
        s.insert("Map");
        s.insert("Set");
        s.insert("WeakMap");
        s.insert("WeakSet");
        s.insert("parseInt");
        s.insert("parseFloat");
        s.insert("isNaN");
        s.insert("isFinite");
        s.insert("encodeURIComponent");
        s.insert("decodeURIComponent");
        s.insert("structuredClone");
        // Host environment
        s.insert("console");
        s.insert("window");
        s.insert("document");
        s.insert("navigator");
        s.insert("globalThis");
        s.insert("fetch");
        s.insert("setTimeout");
        s.insert("clearTimeout");
        s.insert("setInterval");
        s.insert("clearInterval");
        s.insert("requestAnimationFrame");
        s.insert("cancelAnimationFrame");
        s.insert("localStorage");
        s.insert("sessionStorage");
        s.insert("alert");
        s.insert("URL");
        s.insert("URLSearchParams");
        s.insert("FormData");
        s.insert("Blob");
        s.insert("File");
        s.insert("AbortController");
        s.insert("Event");
        s.insert("CustomEvent");
        // Node-style globals that show up in shared code
        s.insert("process");
        s.insert("global");
        s.insert("Buffer");
        s.insert("require");
        s.insert("module");
        s.insert("exports");
        s.insert("arguments");
        s
    };
}

pub fn fragment_source_type() -> SourceType {
    SourceType::default()
        .with_module(true)
        .with_typescript(true)
        .with_jsx(true)
}

/// Analyze one fragment. Pure function of the source text and the fixed
/// builtin set; a parse failure is surfaced as an error, never as a partial
/// context.
pub fn analyze_fragment(
    source: &str,
    file_path: Option<&str>,
) -> Result<DependencyContext, CompilerError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, fragment_source_type()).parse();

    if !ret.errors.is_empty() {
        let detail = format!("{:?}", ret.errors[0]);
        return Err(CompilerError::new(
            ERR_FRAGMENT_PARSE,
            &format!("Fragment is not syntactically analyzable: {}", detail),
            file_path.unwrap_or("<fragment>"),
            1,
            1,
        ));
    }

    let program = &ret.program;
    let imports = extract_imports(&program.body);

    let mut declared = DeclaredCollector {
        names: HashSet::new(),
    };
    declared.visit_program(program);

    let mut used = UsedCollector {
        names: HashSet::new(),
    };
    used.visit_program(program);

    let missing: HashSet<String> = used
        .names
        .iter()
        .filter(|name| {
            !declared.names.contains(*name) && !BUILTIN_GLOBALS.contains(name.as_str())
        })
        .cloned()
        .collect();

    Ok(DependencyContext {
        imports,
        used_identifiers: used.names,
        missing_identifiers: missing,
        resolved_modules: HashMap::new(),
    })
}

/// Extract top-level import statements, preserving specifier shape exactly as
/// written. Type-only imports are erased output anyway and are dropped here.
pub fn extract_imports(body: &[Statement]) -> Vec<ImportInfo> {
    let mut imports = Vec::new();

    for stmt in body {
        let decl = match stmt {
            Statement::ImportDeclaration(decl) => decl,
            _ => continue,
        };
        if decl.import_kind.is_type() {
            continue;
        }

        let mut specifiers = Vec::new();
        if let Some(decl_specifiers) = &decl.specifiers {
            for spec in decl_specifiers {
                match spec {
                    ImportDeclarationSpecifier::ImportSpecifier(s) => {
                        if s.import_kind.is_type() {
                            continue;
                        }
                        let imported = s.imported.name().to_string();
                        let local = s.local.name.to_string();
                        let alias = if local != imported { Some(local) } else { None };
                        specifiers.push(ImportSpecifier {
                            name: imported,
                            alias,
                            is_default: false,
                            is_namespace: false,
                        });
                    }
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                        specifiers.push(ImportSpecifier::default_import(s.local.name.as_str()));
                    }
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                        specifiers.push(ImportSpecifier::namespace(s.local.name.as_str()));
                    }
                }
            }
        }

        imports.push(ImportInfo::new(decl.source.value.as_str(), specifiers));
    }

    imports
}

/// Every binding identifier in the fragment: variable/function/class names,
/// function parameters, catch params, import locals. Flat by design.
struct DeclaredCollector {
    names: HashSet<String>,
}

impl<'a> Visit<'a> for DeclaredCollector {
    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.names.insert(ident.name.to_string());
    }
}

/// Every value-position identifier reference. Member-expression property names
/// and JSX attribute names are not `IdentifierReference` nodes, so the AST
/// shape excludes them already; type positions are skipped explicitly so that
/// annotations never surface as missing values.
struct UsedCollector {
    names: HashSet<String>,
}

impl<'a> Visit<'a> for UsedCollector {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.names.insert(ident.name.to_string());
    }

    fn visit_ts_type_annotation(&mut self, _annotation: &TSTypeAnnotation<'a>) {}

    fn visit_ts_type_parameter_instantiation(&mut self, _args: &TSTypeParameterInstantiation<'a>) {}

    fn visit_ts_interface_declaration(&mut self, _decl: &TSInterfaceDeclaration<'a>) {}

    fn visit_ts_type_alias_declaration(&mut self, _decl: &TSTypeAliasDeclaration<'a>) {}
}
