use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_FRAGMENT_PARSE: &str = "F-ERR-PARSE-001";
pub const ERR_PROJECT_FILE_PARSE: &str = "F-ERR-PARSE-002";
pub const ERR_BAD_OPTIONS: &str = "F-ERR-OPTIONS-001";
pub const ERR_CORPUS_IO: &str = "F-ERR-CORPUS-001";

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
    pub code: String,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_hints(code, message, file, line, column, vec![])
    }

    pub fn with_hints(
        code: &str,
        message: &str,
        file: &str,
        line: u32,
        column: u32,
        hints: Vec<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            message: message.to_string(),
            file: file.to_string(),
            line,
            column,
            hints,
        }
    }
}

impl std::fmt::Display for CompilerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} ({}:{}:{})",
            self.code, self.message, self.file, self.line, self.column
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROJECT FILES
// ═══════════════════════════════════════════════════════════════════════════════

/// Classification of a corpus file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileKind {
    /// `.ts`
    TypedScript,
    /// `.tsx`
    TypedComponent,
    /// `.js`
    Script,
    /// `.jsx`
    Component,
    /// `.json`
    Data,
    Other,
}

impl FileKind {
    pub fn from_path(path: &str) -> Self {
        match path.rsplit('.').next() {
            Some("ts") => FileKind::TypedScript,
            Some("tsx") => FileKind::TypedComponent,
            Some("js") => FileKind::Script,
            Some("jsx") => FileKind::Component,
            Some("json") => FileKind::Data,
            _ => FileKind::Other,
        }
    }

    /// Files that participate in syntax-tree analysis (catalog building,
    /// module resolution targets).
    pub fn is_source(self) -> bool {
        matches!(
            self,
            FileKind::TypedScript | FileKind::TypedComponent | FileKind::Script | FileKind::Component
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    /// Project-relative path with forward slashes.
    pub path: String,
    pub content: String,
    pub kind: FileKind,
}

impl ProjectFile {
    pub fn new(path: &str, content: &str) -> Self {
        ProjectFile {
            path: path.to_string(),
            content: content.to_string(),
            kind: FileKind::from_path(path),
        }
    }
}

/// Path-alias configuration lifted from the project's type config
/// (`compilerOptions.baseUrl` / `compilerOptions.paths`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathAliasConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    /// Wildcard patterns like `"@/*" -> ["src/*"]`.
    #[serde(default)]
    pub paths: HashMap<String, Vec<String>>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// IMPORTS
// ═══════════════════════════════════════════════════════════════════════════════

/// One bound name from an import statement. Exactly one of default / namespace /
/// named-with-optional-alias holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSpecifier {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_namespace: bool,
}

impl ImportSpecifier {
    pub fn default_import(name: &str) -> Self {
        ImportSpecifier {
            name: name.to_string(),
            alias: None,
            is_default: true,
            is_namespace: false,
        }
    }

    pub fn named(name: &str) -> Self {
        ImportSpecifier {
            name: name.to_string(),
            alias: None,
            is_default: false,
            is_namespace: false,
        }
    }

    pub fn namespace(name: &str) -> Self {
        ImportSpecifier {
            name: name.to_string(),
            alias: None,
            is_default: false,
            is_namespace: true,
        }
    }

    /// The identifier this specifier binds in the importing module.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// One import statement, specifier shape preserved exactly as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportInfo {
    pub module: String,
    pub specifiers: Vec<ImportSpecifier>,
    pub is_relative: bool,
    #[serde(default)]
    pub resolved_path: Option<String>,
}

impl ImportInfo {
    pub fn new(module: &str, specifiers: Vec<ImportSpecifier>) -> Self {
        ImportInfo {
            is_relative: module.starts_with('.') || module.starts_with('/'),
            module: module.to_string(),
            specifiers,
            resolved_path: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEPENDENCY CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Analysis result for one fragment.
///
/// `missing_identifiers` is always `used - declared - builtins`; it never
/// intersects the builtin-globals set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyContext {
    pub imports: Vec<ImportInfo>,
    pub used_identifiers: HashSet<String>,
    pub missing_identifiers: HashSet<String>,
    /// Module specifier -> resolved project path, for specifiers the resolver
    /// could map. Unresolved specifiers are absent (external).
    pub resolved_modules: HashMap<String, String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT CATALOG
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropInfo {
    pub name: String,
    /// Printable rendering of the prop's type as written in source.
    pub semantic_type: String,
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    Function,
    Arrow,
    Class,
}

/// One discovered, exported UI component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInfo {
    pub name: String,
    pub file_path: String,
    pub props: Vec<PropInfo>,
    pub is_default_export: bool,
    pub kind: ComponentKind,
    pub line: u32,
    pub column: u32,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILATION OUTCOME
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationResult {
    pub success: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl CompilationResult {
    pub fn ok(code: String, warnings: Vec<String>) -> Self {
        CompilationResult {
            success: true,
            code: Some(code),
            error: None,
            warnings,
        }
    }

    pub fn failed(error: String, warnings: Vec<String>) -> Self {
        CompilationResult {
            success: false,
            code: None,
            error: Some(error),
            warnings,
        }
    }
}

/// Outbound contract to the bundle collaborator: the assembled source plus the
/// resolutions its module-resolution hook must honor verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundlePlan {
    pub source: String,
    pub resolutions: HashMap<String, String>,
    /// Specifiers left to the bundler's own external-module policy.
    pub externals: Vec<String>,
}

/// Outbound contract to the language-model collaborator: structured context for
/// AI-assisted gap filling. The returned free text must be re-run through the
/// assembler before compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionContext {
    /// Sorted for prompt stability.
    pub missing_identifiers: Vec<String>,
    pub imports: Vec<ImportInfo>,
    #[serde(default)]
    pub file_path: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE POSITIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// 1-based line/column for a byte offset.
pub fn line_col(source: &str, offset: u32) -> (u32, u32) {
    let offset = (offset as usize).min(source.len());
    let mut line = 1u32;
    let mut col = 1u32;
    for ch in source[..offset].chars() {
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_from_path() {
        assert_eq!(FileKind::from_path("src/App.tsx"), FileKind::TypedComponent);
        assert_eq!(FileKind::from_path("src/util.ts"), FileKind::TypedScript);
        assert_eq!(FileKind::from_path("legacy/index.jsx"), FileKind::Component);
        assert_eq!(FileKind::from_path("lib/helpers.js"), FileKind::Script);
        assert_eq!(FileKind::from_path("package.json"), FileKind::Data);
        assert_eq!(FileKind::from_path("README.md"), FileKind::Other);
    }

    #[test]
    fn test_import_info_relative_flag() {
        assert!(ImportInfo::new("./Button", vec![]).is_relative);
        assert!(ImportInfo::new("../lib/format", vec![]).is_relative);
        assert!(ImportInfo::new("/abs/path", vec![]).is_relative);
        assert!(!ImportInfo::new("react", vec![]).is_relative);
        assert!(!ImportInfo::new("@scope/pkg", vec![]).is_relative);
    }

    #[test]
    fn test_specifier_local_name() {
        let spec = ImportSpecifier {
            name: "useState".to_string(),
            alias: Some("useLocalState".to_string()),
            is_default: false,
            is_namespace: false,
        };
        assert_eq!(spec.local_name(), "useLocalState");
        assert_eq!(ImportSpecifier::named("clsx").local_name(), "clsx");
    }

    #[test]
    fn test_line_col() {
        let src = "const a = 1;\nconst b = 2;\n";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 13), (2, 1));
        assert_eq!(line_col(src, 19), (2, 7));
    }
}
