//! Compilation orchestration.
//!
//! `FragmentCompiler` ties the pipeline together: catalog built once per
//! corpus snapshot, per-instance resolver and suggestion caches, and a compile
//! surface that never lets an error escape as a panic. Every failure becomes a
//! `CompilationResult` carrying the message and any warnings accumulated
//! before it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::analyze::analyze_fragment;
use crate::assemble::assemble_cached;
use crate::catalog::build_catalog;
use crate::corpus::ProjectCorpus;
use crate::resolve::ModuleResolver;
use crate::types::{
    BundlePlan, CompilationResult, CompilerError, ComponentInfo, CompletionContext, ImportInfo,
};

#[cfg(feature = "napi")]
use napi_derive::napi;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    pub file_path: Option<String>,
    pub additional_imports: Vec<ImportInfo>,
    pub mock_props: Option<serde_json::Value>,
}

pub struct FragmentCompiler {
    corpus: ProjectCorpus,
    catalog: Vec<ComponentInfo>,
    resolver: ModuleResolver,
    suggestion_cache: HashMap<(String, String), Option<ImportInfo>>,
    snapshot: String,
}

impl FragmentCompiler {
    pub fn new(corpus: ProjectCorpus) -> Self {
        let snapshot = corpus.snapshot_hash();
        let catalog = build_catalog(&corpus.files);
        let resolver = ModuleResolver::new(&corpus);
        FragmentCompiler {
            corpus,
            catalog,
            resolver,
            suggestion_cache: HashMap::new(),
            snapshot,
        }
    }

    /// Swap in a rescanned corpus. The catalog is an immutable snapshot, so a
    /// content change rebuilds it wholesale and drops every cache; an
    /// identical snapshot keeps them.
    pub fn refresh(&mut self, corpus: ProjectCorpus) {
        let snapshot = corpus.snapshot_hash();
        if snapshot == self.snapshot {
            self.corpus = corpus;
            return;
        }
        eprintln!("[PartialNative] Corpus changed; rebuilding component catalog");
        self.catalog = build_catalog(&corpus.files);
        self.resolver = ModuleResolver::new(&corpus);
        self.suggestion_cache.clear();
        self.corpus = corpus;
        self.snapshot = snapshot;
    }

    pub fn catalog(&self) -> &[ComponentInfo] {
        &self.catalog
    }

    /// Analyze, resolve, synthesize, and assemble one fragment.
    pub fn compile(&mut self, fragment: &str, options: &CompileOptions) -> CompilationResult {
        let mut warnings = Vec::new();
        let file_path = options.file_path.as_deref();

        let mut context = match analyze_fragment(fragment, file_path) {
            Ok(ctx) => ctx,
            Err(err) => return CompilationResult::failed(err.to_string(), warnings),
        };

        // Resolve the fragment's own imports. Misses are never fatal: the
        // specifier passes through for the bundler's external-module policy,
        // with a warning unless it is a declared package dependency.
        for import in &mut context.imports {
            match self.resolver.resolve(&import.module, file_path) {
                Some(path) => {
                    context
                        .resolved_modules
                        .insert(import.module.clone(), path.clone());
                    import.resolved_path = Some(path);
                }
                None => {
                    let known_dependency = self
                        .corpus
                        .dependencies
                        .contains_key(package_root(&import.module));
                    if import.is_relative || !known_dependency {
                        warnings.push(format!(
                            "Unresolved module specifier '{}'; passing through as external",
                            import.module
                        ));
                    }
                }
            }
        }

        let unit = assemble_cached(
            fragment,
            &context,
            &self.catalog,
            &options.additional_imports,
            options.mock_props.as_ref(),
            file_path,
            &mut self.suggestion_cache,
        );

        if !unit.unresolved.is_empty() {
            warnings.push(format!(
                "No import suggestion for: {}",
                unit.unresolved.join(", ")
            ));
        }

        CompilationResult::ok(unit.source, warnings)
    }

    /// Sequential batch compilation in input order.
    pub fn compile_batch(
        &mut self,
        requests: &[(String, CompileOptions)],
    ) -> Vec<CompilationResult> {
        requests
            .iter()
            .map(|(fragment, options)| self.compile(fragment, options))
            .collect()
    }

    /// Outbound contract to the bundler: the assembled unit plus the
    /// resolutions its resolve hook must honor verbatim, with everything else
    /// listed as external.
    pub fn plan_bundle(
        &mut self,
        result: &CompilationResult,
        file_path: Option<&str>,
    ) -> Option<BundlePlan> {
        let source = result.code.as_ref()?;
        let context = analyze_fragment(source, file_path).ok()?;

        let mut resolutions = HashMap::new();
        let mut externals = Vec::new();
        for import in &context.imports {
            match self.resolver.resolve(&import.module, file_path) {
                Some(path) => {
                    resolutions.insert(import.module.clone(), path);
                }
                None => externals.push(import.module.clone()),
            }
        }
        externals.sort();
        externals.dedup();

        Some(BundlePlan {
            source: source.clone(),
            resolutions,
            externals,
        })
    }

    /// Structured context for the language-model collaborator. The model's
    /// free-text completion must be re-run through `compile` before use.
    pub fn completion_context(
        &self,
        fragment: &str,
        file_path: Option<&str>,
    ) -> Result<CompletionContext, CompilerError> {
        let context = analyze_fragment(fragment, file_path)?;
        let mut missing: Vec<String> = context.missing_identifiers.into_iter().collect();
        missing.sort();
        Ok(CompletionContext {
            missing_identifiers: missing,
            imports: context.imports,
            file_path: file_path.map(String::from),
        })
    }
}

/// `@scope/pkg/sub` -> `@scope/pkg`, `pkg/sub` -> `pkg`.
fn package_root(specifier: &str) -> &str {
    let mut parts = specifier.splitn(3, '/');
    match (parts.next(), parts.next()) {
        (Some(scope), Some(name)) if scope.starts_with('@') => {
            &specifier[..scope.len() + 1 + name.len()]
        }
        (Some(name), _) => name,
        _ => specifier,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI SURFACE
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
fn options_error(message: &str) -> String {
    use crate::types::ERR_BAD_OPTIONS;
    let error = CompilerError::new(ERR_BAD_OPTIONS, message, "<options>", 0, 0);
    serde_json::json!({ "error": error }).to_string()
}

#[cfg(feature = "napi")]
#[napi]
pub fn analyze_fragment_native(source: String, file_path: Option<String>) -> String {
    match analyze_fragment(&source, file_path.as_deref()) {
        Ok(context) => serde_json::to_string(&context).expect("Failed to serialize context"),
        Err(error) => serde_json::json!({ "error": error }).to_string(),
    }
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_fragment_native(
    source: String,
    corpus_json: String,
    options_json: Option<String>,
) -> String {
    let corpus: ProjectCorpus = match serde_json::from_str(&corpus_json) {
        Ok(c) => c,
        Err(err) => return options_error(&format!("Malformed corpus JSON: {}", err)),
    };
    let options: CompileOptions = match options_json.as_deref() {
        Some(raw) if !raw.trim().is_empty() => match serde_json::from_str(raw) {
            Ok(o) => o,
            Err(err) => return options_error(&format!("Malformed options JSON: {}", err)),
        },
        _ => CompileOptions::default(),
    };

    let mut compiler = FragmentCompiler::new(corpus);
    let result = compiler.compile(&source, &options);
    serde_json::to_string(&result).expect("Failed to serialize result")
}

#[cfg(feature = "napi")]
#[napi]
pub fn scan_corpus_native(base_dir: String) -> String {
    match ProjectCorpus::scan(std::path::Path::new(&base_dir)) {
        Ok(corpus) => serde_json::to_string(&corpus).expect("Failed to serialize corpus"),
        Err(error) => serde_json::json!({ "error": error }).to_string(),
    }
}
