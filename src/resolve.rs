//! Module specifier resolution against the corpus snapshot.
//!
//! Resolution order: path-alias config first, then relative resolution from
//! the requesting file's directory. A miss is not an error; the specifier is
//! treated as external and left to the bundler's own policy.

use std::collections::{HashMap, HashSet};

use crate::corpus::ProjectCorpus;
use crate::types::PathAliasConfig;

/// Extensions probed in ecosystem order, then index files.
const PROBE_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js"];

pub struct ModuleResolver {
    file_index: HashSet<String>,
    type_config: Option<PathAliasConfig>,
    /// Memoized by (specifier, requesting file or "root"). Owned by the
    /// instance so independent pipelines never share state.
    cache: HashMap<(String, String), Option<String>>,
}

impl ModuleResolver {
    pub fn new(corpus: &ProjectCorpus) -> Self {
        ModuleResolver {
            file_index: corpus.files.iter().map(|f| f.path.clone()).collect(),
            type_config: corpus.type_config.clone(),
            cache: HashMap::new(),
        }
    }

    /// Map a specifier to a concrete corpus path, or `None` for external /
    /// unresolved.
    pub fn resolve(&mut self, specifier: &str, from_file: Option<&str>) -> Option<String> {
        let cache_key = (
            specifier.to_string(),
            from_file.unwrap_or("root").to_string(),
        );
        if let Some(hit) = self.cache.get(&cache_key) {
            return hit.clone();
        }

        let resolved = self
            .resolve_alias(specifier)
            .or_else(|| self.resolve_relative(specifier, from_file));

        self.cache.insert(cache_key, resolved.clone());
        resolved
    }

    /// Type-config-driven resolution: wildcard path aliases joined onto the
    /// configured base path. Longest pattern prefix wins.
    fn resolve_alias(&self, specifier: &str) -> Option<String> {
        let config = self.type_config.as_ref()?;
        let base = config.base_url.as_deref().unwrap_or("");

        let mut patterns: Vec<(&String, &Vec<String>)> = config.paths.iter().collect();
        patterns.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        for (pattern, targets) in patterns {
            if let Some(star) = pattern.find('*') {
                let prefix = &pattern[..star];
                let suffix = &pattern[star + 1..];
                if specifier.starts_with(prefix) && specifier.ends_with(suffix) {
                    let matched = &specifier[prefix.len()..specifier.len() - suffix.len()];
                    for target in targets {
                        let candidate = join(base, &target.replacen('*', matched, 1));
                        if let Some(path) = self.probe(&candidate) {
                            return Some(path);
                        }
                    }
                }
            } else if pattern == specifier {
                for target in targets {
                    if let Some(path) = self.probe(&join(base, target)) {
                        return Some(path);
                    }
                }
            }
        }

        // A bare specifier may still resolve from the base path alone
        // (tsconfig baseUrl non-relative module resolution).
        if !base.is_empty() && !specifier.starts_with('.') && !specifier.starts_with('/') {
            return self.probe(&join(base, specifier));
        }
        None
    }

    fn resolve_relative(&self, specifier: &str, from_file: Option<&str>) -> Option<String> {
        if !specifier.starts_with('.') && !specifier.starts_with('/') {
            return None;
        }

        let joined = if let Some(stripped) = specifier.strip_prefix('/') {
            stripped.to_string()
        } else {
            let from_dir = from_file.and_then(parent_dir).unwrap_or("");
            join(from_dir, specifier)
        };

        self.probe(&normalize(&joined))
    }

    /// Exact path, then extension probing, then index files.
    fn probe(&self, candidate: &str) -> Option<String> {
        let candidate = normalize(candidate);
        if self.file_index.contains(&candidate) {
            return Some(candidate);
        }
        for ext in PROBE_EXTENSIONS {
            let with_ext = format!("{}.{}", candidate, ext);
            if self.file_index.contains(&with_ext) {
                return Some(with_ext);
            }
        }
        for ext in PROBE_EXTENSIONS {
            let index = format!("{}/index.{}", candidate, ext);
            if self.file_index.contains(&index) {
                return Some(index);
            }
        }
        None
    }
}

fn parent_dir(path: &str) -> Option<&str> {
    path.rfind('/').map(|i| &path[..i])
}

fn join(dir: &str, rest: &str) -> String {
    if dir.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", dir, rest)
    }
}

/// Collapse `.` and `..` segments without touching the file system.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
