//! Project corpus loading.
//!
//! The corpus is the full set of project source files available for resolution
//! and catalog purposes, plus the flat dependency table and the optional
//! path-alias config. It is rebuilt wholesale on rescan; there is no partial
//! invalidation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::types::{CompilerError, FileKind, PathAliasConfig, ProjectFile, ERR_CORPUS_IO};

const SKIPPED_DIRS: &[&str] = &["node_modules", "dist", "build", "coverage", ".git", ".next"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCorpus {
    pub files: Vec<ProjectFile>,
    /// Flat dependency name -> version table from the project manifest.
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
    #[serde(default)]
    pub type_config: Option<PathAliasConfig>,
}

impl ProjectCorpus {
    pub fn new(
        files: Vec<ProjectFile>,
        dependencies: HashMap<String, String>,
        type_config: Option<PathAliasConfig>,
    ) -> Self {
        ProjectCorpus {
            files,
            dependencies,
            type_config,
        }
    }

    /// Walk `base_dir` and build a corpus snapshot from every source and data
    /// file, skipping dependency and output directories.
    pub fn scan(base_dir: &Path) -> Result<ProjectCorpus, CompilerError> {
        if !base_dir.exists() {
            return Err(CompilerError::new(
                ERR_CORPUS_IO,
                &format!("Project directory does not exist: {}", base_dir.display()),
                &base_dir.to_string_lossy(),
                0,
                0,
            ));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(base_dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e))
        {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    eprintln!("[PartialNative] Skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if !entry.path().is_file() {
                continue;
            }

            let rel = match entry.path().strip_prefix(base_dir) {
                Ok(r) => r.to_string_lossy().replace('\\', "/"),
                Err(_) => continue,
            };
            let kind = FileKind::from_path(&rel);
            if kind == FileKind::Other {
                continue;
            }

            match fs::read_to_string(entry.path()) {
                Ok(content) => files.push(ProjectFile {
                    path: rel,
                    content,
                    kind,
                }),
                Err(err) => {
                    eprintln!("[PartialNative] Failed to read {}: {}", rel, err);
                }
            }
        }

        // Stable order regardless of directory-walk order.
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let dependencies = files
            .iter()
            .find(|f| f.path == "package.json")
            .map(|f| parse_dependency_table(&f.content))
            .unwrap_or_default();

        let type_config = files
            .iter()
            .find(|f| f.path == "tsconfig.json")
            .and_then(|f| parse_type_config(&f.content));

        Ok(ProjectCorpus {
            files,
            dependencies,
            type_config,
        })
    }

    pub fn file(&self, path: &str) -> Option<&ProjectFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Files eligible for syntax-tree analysis.
    pub fn source_files(&self) -> impl Iterator<Item = &ProjectFile> {
        self.files.iter().filter(|f| f.kind.is_source())
    }

    /// Content hash over the snapshot. Identical file sets produce identical
    /// hashes, so a rebuilt catalog can be reused when nothing changed.
    pub fn snapshot_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for file in &self.files {
            hasher.update(file.path.as_bytes());
            hasher.update([0u8]);
            hasher.update(file.content.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    // The walk root itself is always kept, whatever its name.
    if entry.depth() == 0 || !entry.path().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .map(|name| SKIPPED_DIRS.contains(&name) || name.starts_with('.'))
        .unwrap_or(false)
}

/// Merge `dependencies` and `devDependencies` from a package manifest.
fn parse_dependency_table(content: &str) -> HashMap<String, String> {
    let mut table = HashMap::new();
    let parsed: serde_json::Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(err) => {
            eprintln!("[PartialNative] Unparseable package.json: {}", err);
            return table;
        }
    };

    for section in ["dependencies", "devDependencies"] {
        if let Some(deps) = parsed.get(section).and_then(|v| v.as_object()) {
            for (name, version) in deps {
                if let Some(v) = version.as_str() {
                    table.insert(name.clone(), v.to_string());
                }
            }
        }
    }
    table
}

/// Read `compilerOptions.baseUrl` and `compilerOptions.paths`. Type configs in
/// the wild often carry comments or trailing commas; an unparseable config
/// degrades to no alias resolution rather than failing the scan.
fn parse_type_config(content: &str) -> Option<PathAliasConfig> {
    let parsed: serde_json::Value = serde_json::from_str(content).ok()?;
    let options = parsed.get("compilerOptions")?;

    let base_url = options
        .get("baseUrl")
        .and_then(|v| v.as_str())
        .map(|s| s.trim_start_matches("./").to_string());

    let mut paths = HashMap::new();
    if let Some(map) = options.get("paths").and_then(|v| v.as_object()) {
        for (pattern, targets) in map {
            let targets: Vec<String> = targets
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .filter_map(|t| t.as_str())
                        .map(|t| t.trim_start_matches("./").to_string())
                        .collect()
                })
                .unwrap_or_default();
            if !targets.is_empty() {
                paths.insert(pattern.clone(), targets);
            }
        }
    }

    if base_url.is_none() && paths.is_empty() {
        return None;
    }
    Some(PathAliasConfig { base_url, paths })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_table_merges_sections() {
        let manifest = r#"{
            "name": "demo",
            "dependencies": { "react": "^18.2.0", "clsx": "^2.0.0" },
            "devDependencies": { "typescript": "^5.4.0" }
        }"#;
        let table = parse_dependency_table(manifest);
        assert_eq!(table.get("react").map(String::as_str), Some("^18.2.0"));
        assert_eq!(table.get("typescript").map(String::as_str), Some("^5.4.0"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_type_config_extraction() {
        let tsconfig = r#"{
            "compilerOptions": {
                "baseUrl": "./src",
                "paths": { "@/*": ["./*"], "@components/*": ["components/*"] }
            }
        }"#;
        let config = parse_type_config(tsconfig).expect("config should parse");
        assert_eq!(config.base_url.as_deref(), Some("src"));
        assert_eq!(config.paths.get("@/*").unwrap(), &vec!["*".to_string()]);
    }

    #[test]
    fn test_type_config_absent_when_empty() {
        assert!(parse_type_config(r#"{ "compilerOptions": {} }"#).is_none());
        assert!(parse_type_config("not json at all").is_none());
    }

    #[test]
    fn test_snapshot_hash_stability() {
        let files = vec![
            ProjectFile::new("src/a.tsx", "export const A = 1;"),
            ProjectFile::new("src/b.tsx", "export const B = 2;"),
        ];
        let a = ProjectCorpus::new(files.clone(), HashMap::new(), None);
        let b = ProjectCorpus::new(files, HashMap::new(), None);
        assert_eq!(a.snapshot_hash(), b.snapshot_hash());

        let changed = ProjectCorpus::new(
            vec![ProjectFile::new("src/a.tsx", "export const A = 2;")],
            HashMap::new(),
            None,
        );
        assert_ne!(a.snapshot_hash(), changed.snapshot_hash());
    }
}
