//! package.json manifests.
//!
//! Deserialization of the fields that influence bundling, plus the pure
//! parts of the `exports`/`imports` algorithm (subpath matching, condition
//! selection, target validation) that do not touch the file system.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `"type"` field of package.json.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageType {
    Module,
    CommonJs,
}

/// A conditional exports/imports value. Objects are either a subpath map
/// (every key starts with `.` or `#`) or a conditions map (no key does).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PackageExports {
    String(String),
    Array(Vec<PackageExports>),
    Object(IndexMap<String, PackageExports>),
    Null,
}

impl PackageExports {
    fn is_subpath_map(&self) -> bool {
        match self {
            PackageExports::Object(map) => map
                .keys()
                .next()
                .is_some_and(|key| key.starts_with('.') || key.starts_with('#')),
            _ => false,
        }
    }
}

/// `"sideEffects"` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SideEffectsField {
    Bool(bool),
    One(String),
    Many(Vec<String>),
}

/// A value in the object form of `"browser"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BrowserTarget {
    Path(String),
    Disabled(bool),
}

/// `"browser"` field: either a replacement main file or a remapping table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BrowserField {
    Main(String),
    Map(IndexMap<String, BrowserTarget>),
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawPackageJson {
    name: Option<String>,
    main: Option<serde_json::Value>,
    module: Option<serde_json::Value>,
    browser: Option<BrowserField>,
    exports: Option<PackageExports>,
    imports: Option<PackageExports>,
    #[serde(rename = "sideEffects")]
    side_effects: Option<SideEffectsField>,
    #[serde(rename = "type")]
    package_type: Option<String>,
    #[serde(flatten)]
    other: IndexMap<String, serde_json::Value>,
}

/// Side-effect declaration compiled for matching.
#[derive(Debug, Clone)]
pub enum SideEffects {
    /// Field absent or `true`
    Unspecified,
    /// `false`
    None,
    /// Only files matching these globs have side effects
    Globs(GlobSet),
}

/// A parsed package.json.
#[derive(Debug, Clone)]
pub struct PackageJson {
    /// Directory containing the manifest
    pub dir: PathBuf,
    pub name: Option<String>,
    pub package_type: Option<PackageType>,
    pub browser: Option<BrowserField>,
    pub exports: Option<PackageExports>,
    pub imports: Option<PackageExports>,
    pub side_effects: SideEffects,
    /// String-valued top-level fields usable as main fields (`main`, `module`, ...)
    main_fields: IndexMap<String, String>,
}

impl PackageJson {
    pub fn parse(dir: &Path, source: &str) -> Result<Self> {
        let raw: RawPackageJson = serde_json::from_str(source)
            .with_context(|| format!("failed to parse {}", dir.join("package.json").display()))?;

        let mut main_fields = IndexMap::new();
        for (field, value) in [("main", raw.main), ("module", raw.module)] {
            if let Some(serde_json::Value::String(path)) = value {
                main_fields.insert(field.to_string(), path);
            }
        }
        for (field, value) in raw.other {
            if let serde_json::Value::String(path) = value {
                main_fields.insert(field, path);
            }
        }

        let package_type = match raw.package_type.as_deref() {
            Some("module") => Some(PackageType::Module),
            Some("commonjs") => Some(PackageType::CommonJs),
            _ => None,
        };

        Ok(PackageJson {
            dir: dir.to_path_buf(),
            name: raw.name,
            package_type,
            browser: raw.browser,
            exports: raw.exports,
            imports: raw.imports,
            side_effects: compile_side_effects(raw.side_effects, dir),
            main_fields,
        })
    }

    /// Value of a main field such as `main`, `module` or a custom one. The
    /// string form of `browser` is also a main field.
    pub fn main_field(&self, field: &str) -> Option<&str> {
        if field == "browser" {
            return match &self.browser {
                Some(BrowserField::Main(path)) => Some(path.as_str()),
                _ => None,
            };
        }
        self.main_fields
            .get(field)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Object form of the `browser` field.
    pub fn browser_map(&self) -> Option<&IndexMap<String, BrowserTarget>> {
        match &self.browser {
            Some(BrowserField::Map(map)) => Some(map),
            _ => None,
        }
    }

    /// Whether `path` (inside this package) may have side effects according
    /// to the manifest.
    pub fn file_has_side_effects(&self, path: &Path) -> bool {
        match &self.side_effects {
            SideEffects::Unspecified => true,
            SideEffects::None => false,
            SideEffects::Globs(globs) => {
                let rel = path.strip_prefix(&self.dir).unwrap_or(path);
                let rel = rel.to_string_lossy().replace('\\', "/");
                globs.is_match(rel.as_str())
            }
        }
    }
}

fn compile_side_effects(field: Option<SideEffectsField>, dir: &Path) -> SideEffects {
    let patterns = match field {
        None | Some(SideEffectsField::Bool(true)) => return SideEffects::Unspecified,
        Some(SideEffectsField::Bool(false)) => return SideEffects::None,
        Some(SideEffectsField::One(pattern)) => vec![pattern],
        Some(SideEffectsField::Many(patterns)) => patterns,
    };

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let trimmed = pattern.trim_start_matches("./");
        // Bare file names match at any depth, like webpack.
        let normalized = if trimmed.contains('/') {
            trimmed.to_string()
        } else {
            format!("**/{}", trimmed)
        };
        match GlobBuilder::new(&normalized).literal_separator(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => {
                debug!(
                    pattern = %pattern,
                    package = %dir.display(),
                    error = %err,
                    "ignoring invalid sideEffects pattern"
                );
            }
        }
    }
    match builder.build() {
        Ok(set) => SideEffects::Globs(set),
        Err(_) => SideEffects::Unspecified,
    }
}

// =============================================================================
// exports / imports resolution
// =============================================================================

/// Outcome of matching a subpath against an `exports` or `imports` map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportsResolution {
    /// Package-relative target (`./dist/a.js`) or, for `imports`, a bare
    /// package specifier
    Target(String),
    /// No key matched the subpath
    NotExported,
    /// A key matched but no condition applied, or the target was `null`
    Excluded,
    /// The matched target is malformed
    InvalidTarget(String),
}

/// Resolve `subpath` (`"."`, `"./feature"`, or `"#internal"`) against an
/// exports/imports value. `conditions` is already in precedence order.
pub fn resolve_exports(
    exports: &PackageExports,
    subpath: &str,
    conditions: &[String],
    is_imports: bool,
) -> ExportsResolution {
    // Sugar: a bare string/array/conditions object means `{ ".": value }`.
    if !exports.is_subpath_map() {
        if is_imports || subpath != "." {
            return ExportsResolution::NotExported;
        }
        return resolve_target(exports, None, false, conditions, is_imports);
    }

    let PackageExports::Object(map) = exports else {
        return ExportsResolution::NotExported;
    };

    if let Some(value) = map.get(subpath)
        && !subpath.contains('*')
        && !subpath.ends_with('/')
    {
        return resolve_target(value, None, false, conditions, is_imports);
    }

    let mut best: Option<(&str, String, &PackageExports)> = None;
    for (key, value) in map {
        let captured = if let Some(star) = key.find('*') {
            let (prefix, rest) = key.split_at(star);
            let suffix = &rest[1..];
            if rest[1..].contains('*') {
                continue;
            }
            if subpath.len() >= key.len() - 1
                && subpath.starts_with(prefix)
                && subpath.ends_with(suffix)
                && subpath != prefix
            {
                Some(subpath[prefix.len()..subpath.len() - suffix.len()].to_string())
            } else {
                None
            }
        } else if key.ends_with('/') && subpath.starts_with(key.as_str()) {
            Some(subpath[key.len()..].to_string())
        } else {
            None
        };

        if let Some(captured) = captured
            && best
                .as_ref()
                .is_none_or(|(best_key, _, _)| pattern_key_compare(key, best_key))
        {
            best = Some((key.as_str(), captured, value));
        }
    }

    match best {
        Some((key, captured, value)) => {
            let is_folder = !key.contains('*');
            resolve_target(value, Some(&captured), is_folder, conditions, is_imports)
        }
        None => ExportsResolution::NotExported,
    }
}

/// True when `candidate` is more specific than `current`: the longer
/// prefix before `*` wins, then the longer key.
fn pattern_key_compare(candidate: &str, current: &str) -> bool {
    let prefix_len = |key: &str| key.find('*').map(|i| i + 1).unwrap_or(key.len());
    let (a, b) = (prefix_len(candidate), prefix_len(current));
    if a != b {
        return a > b;
    }
    candidate.len() > current.len()
}

fn resolve_target(
    target: &PackageExports,
    captured: Option<&str>,
    is_folder: bool,
    conditions: &[String],
    is_imports: bool,
) -> ExportsResolution {
    match target {
        PackageExports::String(path) => {
            if !path.starts_with("./") {
                // `imports` may map to another package.
                if is_imports && !path.starts_with('/') && !path.starts_with("../") && !is_folder {
                    return ExportsResolution::Target(substitute(path, captured));
                }
                return ExportsResolution::InvalidTarget(format!(
                    "invalid package target \"{}\": targets must start with \"./\"",
                    path
                ));
            }
            if is_folder && !path.ends_with('/') {
                return ExportsResolution::InvalidTarget(format!(
                    "invalid package target \"{}\": folder mappings must end with \"/\"",
                    path
                ));
            }
            if has_invalid_segment(&path[2..]) {
                return ExportsResolution::InvalidTarget(format!(
                    "invalid package target \"{}\"",
                    path
                ));
            }
            let resolved = substitute(path, captured);
            if let Some(captured) = captured
                && has_invalid_segment(captured)
            {
                return ExportsResolution::InvalidTarget(format!(
                    "invalid subpath \"{}\" for package target \"{}\"",
                    captured, path
                ));
            }
            ExportsResolution::Target(resolved)
        }
        PackageExports::Array(items) => {
            let mut last = ExportsResolution::Excluded;
            for item in items {
                match resolve_target(item, captured, is_folder, conditions, is_imports) {
                    found @ ExportsResolution::Target(_) => return found,
                    other => last = other,
                }
            }
            last
        }
        PackageExports::Object(map) => {
            for condition in conditions.iter().map(|c| c.as_str()).chain(["default"]) {
                if let Some(value) = map.get(condition) {
                    match resolve_target(value, captured, is_folder, conditions, is_imports) {
                        ExportsResolution::Excluded | ExportsResolution::NotExported => continue,
                        other => return other,
                    }
                }
            }
            ExportsResolution::Excluded
        }
        PackageExports::Null => ExportsResolution::Excluded,
    }
}

fn substitute(path: &str, captured: Option<&str>) -> String {
    match captured {
        Some(captured) if path.contains('*') => path.replace('*', captured),
        Some(captured) if path.ends_with('/') => format!("{}{}", path, captured),
        _ => path.to_string(),
    }
}

fn has_invalid_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        segment == "." || segment == ".." || segment.eq_ignore_ascii_case("node_modules")
    })
}

/// Split a bare specifier into package name and subpath (`"."` or `"./x"`).
pub fn parse_package_specifier(specifier: &str) -> Option<(String, String)> {
    let mut parts = specifier.splitn(3, '/');
    let first = parts.next()?;
    if first.is_empty() {
        return None;
    }
    let (name, rest) = if first.starts_with('@') {
        let second = parts.next().filter(|s| !s.is_empty())?;
        (format!("{}/{}", first, second), parts.next())
    } else {
        let rest = specifier.split_once('/').map(|(_, rest)| rest);
        (first.to_string(), rest)
    };
    let subpath = match rest {
        Some(rest) if !rest.is_empty() => format!("./{}", rest),
        _ => ".".to_string(),
    };
    Some((name, subpath))
}
