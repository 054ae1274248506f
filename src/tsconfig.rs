//! tsconfig.json path mapping.
//!
//! Only the options that change how specifiers resolve are read:
//! `compilerOptions.baseUrl`, `compilerOptions.paths` and
//! `compilerOptions.moduleSuffixes`, following `extends` chains. Everything
//! else in the file is ignored.

use crate::fs::{FileSystem, normalize_path};
use crate::jsonc;
use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Extends {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawTsConfig {
    #[serde(default)]
    extends: Option<Extends>,
    #[serde(default)]
    compiler_options: Option<RawCompilerOptions>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawCompilerOptions {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    paths: Option<IndexMap<String, Vec<String>>>,
    #[serde(default)]
    module_suffixes: Option<Vec<String>>,
}

/// One `paths` entry, with its wildcard split out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub(crate) pattern: String,
    pub(crate) prefix: String,
    pub(crate) suffix: String,
    pub(crate) has_wildcard: bool,
    pub(crate) targets: Vec<String>,
}

impl PathMapping {
    fn new(pattern: &str, targets: &[String]) -> Self {
        let pattern = normalize_path_pattern(pattern);
        let (prefix, suffix, has_wildcard) = match pattern.find('*') {
            Some(star_idx) => {
                let (prefix, rest) = pattern.split_at(star_idx);
                (prefix.to_string(), rest[1..].to_string(), true)
            }
            None => (pattern.clone(), String::new(), false),
        };
        PathMapping {
            pattern,
            prefix,
            suffix,
            has_wildcard,
            targets: targets.iter().map(|t| normalize_path_pattern(t)).collect(),
        }
    }

    /// The text captured by `*`, or `Some("")` for an exact match.
    pub(crate) fn match_specifier(&self, specifier: &str) -> Option<String> {
        if !self.has_wildcard {
            return (self.pattern == specifier).then(String::new);
        }

        if !specifier.starts_with(&self.prefix) || !specifier.ends_with(&self.suffix) {
            return None;
        }

        let start = self.prefix.len();
        let end = specifier.len().saturating_sub(self.suffix.len());
        if end < start {
            return None;
        }

        Some(specifier[start..end].to_string())
    }

    /// Targets with the captured wildcard substituted, in declared order.
    pub(crate) fn substituted_targets(&self, captured: &str) -> Vec<String> {
        self.targets
            .iter()
            .map(|target| target.replacen('*', captured, 1))
            .collect()
    }
}

/// Effective resolution settings from one tsconfig and its `extends` chain.
#[derive(Debug, Clone, Default)]
pub struct TsConfig {
    /// The tsconfig.json this was loaded from
    pub path: PathBuf,
    /// Absolute `baseUrl`
    pub base_url: Option<PathBuf>,
    /// Directory `paths` targets are relative to
    pub paths_base: Option<PathBuf>,
    /// Sorted so the longest matching key is tried first
    pub path_mappings: Vec<PathMapping>,
    /// e.g. `[".ios", ".native", ""]`
    pub module_suffixes: Vec<String>,
}

impl TsConfig {
    /// Absolute candidate paths for a non-relative specifier, most specific
    /// mapping first, each mapping's targets in declared order.
    pub fn path_candidates(&self, specifier: &str) -> Vec<PathBuf> {
        let Some(base) = &self.paths_base else {
            return Vec::new();
        };
        for mapping in &self.path_mappings {
            if let Some(captured) = mapping.match_specifier(specifier) {
                return mapping
                    .substituted_targets(&captured)
                    .into_iter()
                    .map(|target| normalize_path(&base.join(target)))
                    .collect();
            }
        }
        Vec::new()
    }
}

/// Partially merged options while walking an `extends` chain.
#[derive(Debug, Default)]
struct LoadedOptions {
    base_url: Option<PathBuf>,
    paths: Option<(IndexMap<String, Vec<String>>, PathBuf)>,
    module_suffixes: Option<Vec<String>>,
}

impl LoadedOptions {
    fn merge_over(self, base: LoadedOptions) -> LoadedOptions {
        LoadedOptions {
            base_url: self.base_url.or(base.base_url),
            paths: self.paths.or(base.paths),
            module_suffixes: self.module_suffixes.or(base.module_suffixes),
        }
    }
}

/// Load a tsconfig.json and everything it extends.
pub fn load_tsconfig(fs: &dyn FileSystem, path: &Path) -> Result<TsConfig> {
    let mut visited = FxHashSet::default();
    let loaded = load_inner(fs, path, &mut visited)?;

    let paths_base = loaded.paths.as_ref().map(|(_, dir)| {
        loaded.base_url.clone().unwrap_or_else(|| dir.clone())
    });
    let mut path_mappings: Vec<PathMapping> = loaded
        .paths
        .as_ref()
        .map(|(paths, _)| {
            paths
                .iter()
                .filter(|(_, targets)| !targets.is_empty())
                .map(|(pattern, targets)| PathMapping::new(pattern, targets))
                .collect()
        })
        .unwrap_or_default();
    // Exact keys beat wildcards, then the longest prefix wins. The sort is
    // stable so equal keys keep their declared order.
    path_mappings.sort_by(|left, right| {
        left.has_wildcard
            .cmp(&right.has_wildcard)
            .then_with(|| right.prefix.len().cmp(&left.prefix.len()))
    });

    Ok(TsConfig {
        path: path.to_path_buf(),
        base_url: loaded.base_url,
        paths_base,
        path_mappings,
        module_suffixes: loaded.module_suffixes.unwrap_or_default(),
    })
}

fn load_inner(
    fs: &dyn FileSystem,
    path: &Path,
    visited: &mut FxHashSet<PathBuf>,
) -> Result<LoadedOptions> {
    let path = normalize_path(path);
    if !visited.insert(path.clone()) {
        bail!("tsconfig extends cycle detected at {}", path.display());
    }

    let source = fs
        .read_to_string(&path)
        .with_context(|| format!("failed to read tsconfig: {}", path.display()))?;
    let raw: RawTsConfig = jsonc::from_str(&source)
        .with_context(|| format!("failed to parse tsconfig: {}", path.display()))?;
    let dir = path
        .parent()
        .ok_or_else(|| anyhow!("tsconfig has no parent directory"))?
        .to_path_buf();

    let options = raw.compiler_options.unwrap_or_default();
    let own = LoadedOptions {
        base_url: options.base_url.map(|url| normalize_path(&dir.join(url))),
        paths: options.paths.map(|paths| (paths, dir.clone())),
        module_suffixes: options.module_suffixes,
    };

    let parents = match raw.extends {
        None => Vec::new(),
        Some(Extends::One(one)) => vec![one],
        Some(Extends::Many(many)) => many,
    };
    // Later entries of an `extends` array override earlier ones.
    let mut base = LoadedOptions::default();
    for parent in parents {
        let parent_path = resolve_extends_path(fs, &dir, &parent)?;
        let loaded = load_inner(fs, &parent_path, visited)?;
        base = loaded.merge_over(base);
    }

    visited.remove(&path);
    Ok(own.merge_over(base))
}

fn resolve_extends_path(fs: &dyn FileSystem, dir: &Path, extends: &str) -> Result<PathBuf> {
    let is_path = extends.starts_with("./")
        || extends.starts_with("../")
        || Path::new(extends).is_absolute();
    if is_path {
        let candidate = if extends.ends_with(".json") {
            dir.join(extends)
        } else {
            dir.join(format!("{}.json", extends))
        };
        return Ok(normalize_path(&candidate));
    }

    // Package reference such as "@tsconfig/node20/tsconfig.json".
    let mut current = Some(dir);
    while let Some(search) = current {
        let base = search.join("node_modules").join(extends);
        for candidate in [
            base.clone(),
            base.with_extension("json"),
            base.join("tsconfig.json"),
        ] {
            if fs.is_file(&candidate) {
                return Ok(normalize_path(&candidate));
            }
        }
        current = search.parent();
    }
    bail!("cannot find base tsconfig \"{}\" from {}", extends, dir.display())
}

fn normalize_path_pattern(value: &str) -> String {
    value.trim().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn test_match_specifier() {
        let mapping = PathMapping::new("@app/*", &["src/*".to_string()]);
        assert_eq!(mapping.match_specifier("@app/util"), Some("util".to_string()));
        assert_eq!(mapping.match_specifier("@other/util"), None);

        let exact = PathMapping::new("config", &["cfg/index".to_string()]);
        assert_eq!(exact.match_specifier("config"), Some(String::new()));
        assert_eq!(exact.match_specifier("config/x"), None);
    }

    #[test]
    fn test_longest_prefix_wins_and_targets_keep_order() {
        let fs = MemoryFileSystem::new().with_file(
            "/p/tsconfig.json",
            r#"{
                "compilerOptions": {
                    "baseUrl": ".",
                    "paths": {
                        "*": ["types/*"],
                        "lib/*": ["a/*", "b/*"],
                        "lib/deep/*": ["deep/*"]
                    }
                }
            }"#,
        );
        let config = load_tsconfig(&fs, Path::new("/p/tsconfig.json")).unwrap();
        assert_eq!(
            config.path_candidates("lib/deep/x"),
            vec![PathBuf::from("/p/deep/x")]
        );
        assert_eq!(
            config.path_candidates("lib/y"),
            vec![PathBuf::from("/p/a/y"), PathBuf::from("/p/b/y")]
        );
        assert_eq!(config.path_candidates("zzz"), vec![PathBuf::from("/p/types/zzz")]);
    }

    #[test]
    fn test_extends_chain_and_relative_paths_base() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/p/base/tsconfig.base.json",
                r#"{ "compilerOptions": { "paths": { "~/*": ["src/*"] }, "moduleSuffixes": [".ios", ""] } }"#,
            )
            .with_file(
                "/p/app/tsconfig.json",
                r#"{ "extends": "../base/tsconfig.base", "compilerOptions": {} }"#,
            );
        let config = load_tsconfig(&fs, Path::new("/p/app/tsconfig.json")).unwrap();
        // No baseUrl: paths are relative to the file that declared them.
        assert_eq!(config.path_candidates("~/x"), vec![PathBuf::from("/p/base/src/x")]);
        assert_eq!(config.module_suffixes, vec![".ios", ""]);
    }

    #[test]
    fn test_extends_package() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/p/node_modules/@cfg/base/tsconfig.json",
                r#"{ "compilerOptions": { "baseUrl": "lib" } }"#,
            )
            .with_file("/p/tsconfig.json", r#"{ "extends": "@cfg/base" }"#);
        let config = load_tsconfig(&fs, Path::new("/p/tsconfig.json")).unwrap();
        assert_eq!(
            config.base_url,
            Some(PathBuf::from("/p/node_modules/@cfg/base/lib"))
        );
    }

    #[test]
    fn test_extends_cycle_is_error() {
        let fs = MemoryFileSystem::new()
            .with_file("/p/a.json", r#"{ "extends": "./b.json" }"#)
            .with_file("/p/b.json", r#"{ "extends": "./a.json" }"#);
        let err = load_tsconfig(&fs, Path::new("/p/a.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("cycle"));
    }
}
