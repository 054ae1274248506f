//! Build options.
//!
//! `BuildOptions` is the single configuration surface of a build. It can be
//! constructed in code or deserialized from a JSON(C) file whose keys use the
//! same camelCase names bundler users already know (`entryPoints`,
//! `mainFields`, `resolveExtensions`, ...).

use crate::jsonc;
use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Target runtime. Decides platform export conditions, default main fields,
/// and whether runtime built-ins are externalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Browser,
    Node,
    Neutral,
    Bun,
}

impl Platform {
    /// Export condition contributed by the platform, if any.
    pub fn condition(&self) -> Option<&'static str> {
        match self {
            Platform::Browser => Some("browser"),
            Platform::Node => Some("node"),
            Platform::Bun => Some("bun"),
            Platform::Neutral => None,
        }
    }

    /// Whether runtime built-in module names resolve to externals.
    pub fn has_builtins(&self) -> bool {
        matches!(self, Platform::Node | Platform::Bun)
    }

    /// Package.json fields consulted for a package entry point, in order.
    pub fn default_main_fields(&self) -> Vec<String> {
        let fields: &[&str] = match self {
            Platform::Browser => &["browser", "module", "main"],
            Platform::Node => &["main", "module"],
            Platform::Bun => &["bun", "module", "main"],
            Platform::Neutral => &[],
        };
        fields.iter().map(|f| f.to_string()).collect()
    }
}

/// Output module format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Esm,
    Cjs,
    Iife,
}

impl Format {
    pub fn name(&self) -> &'static str {
        match self {
            Format::Esm => "esm",
            Format::Cjs => "cjs",
            Format::Iife => "iife",
        }
    }
}

/// How a file's contents become a module. A closed set: every stage of the
/// pipeline matches on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Js,
    Jsx,
    Ts,
    Tsx,
    Json,
    Text,
    Base64,
    #[serde(rename = "dataurl")]
    DataUrl,
    File,
    Copy,
    Empty,
}

impl Loader {
    /// Loaders whose output is handed to the external parser.
    pub fn is_script(&self) -> bool {
        matches!(self, Loader::Js | Loader::Jsx | Loader::Ts | Loader::Tsx)
    }

    /// TypeScript loaders erase unused imports.
    pub fn is_typescript(&self) -> bool {
        matches!(self, Loader::Ts | Loader::Tsx)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Loader::Js => "js",
            Loader::Jsx => "jsx",
            Loader::Ts => "ts",
            Loader::Tsx => "tsx",
            Loader::Json => "json",
            Loader::Text => "text",
            Loader::Base64 => "base64",
            Loader::DataUrl => "dataurl",
            Loader::File => "file",
            Loader::Copy => "copy",
            Loader::Empty => "empty",
        }
    }
}

/// Extension → loader table used when the user does not override it.
pub fn default_loaders() -> IndexMap<String, Loader> {
    [
        (".js", Loader::Js),
        (".mjs", Loader::Js),
        (".cjs", Loader::Js),
        (".jsx", Loader::Jsx),
        (".ts", Loader::Ts),
        (".mts", Loader::Ts),
        (".cts", Loader::Ts),
        (".tsx", Loader::Tsx),
        (".json", Loader::Json),
        (".txt", Loader::Text),
    ]
    .into_iter()
    .map(|(ext, loader)| (ext.to_string(), loader))
    .collect()
}

fn default_resolve_extensions() -> Vec<String> {
    [".tsx", ".ts", ".jsx", ".js", ".css", ".json"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_outdir() -> PathBuf {
    PathBuf::from("out")
}

/// Everything that configures one build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildOptions {
    /// Entry files, absolute or relative to `working_dir`
    pub entry_points: Vec<PathBuf>,
    pub platform: Platform,
    pub format: Format,
    /// Factor code shared between entries into separate chunks (ESM only)
    pub splitting: bool,
    /// Output directory, relative to `working_dir` unless absolute
    pub outdir: PathBuf,
    /// Base directory for relative paths and display names
    pub working_dir: PathBuf,
    /// Global variable assigned by IIFE output
    pub global_name: Option<String>,
    /// Specifiers never bundled: exact names, package prefixes, `*` patterns
    pub external: Vec<String>,
    /// Specifier prefix rewrites, longest key wins
    pub alias: IndexMap<String, String>,
    /// Custom export conditions; `None` means the default `["module"]`
    pub conditions: Option<Vec<String>>,
    /// Package.json entry fields; `None` means the platform default
    pub main_fields: Option<Vec<String>>,
    /// Suffixes tried for extensionless specifiers, in order
    pub resolve_extensions: Vec<String>,
    /// Extension → loader overrides merged over [`default_loaders`]
    pub loader: IndexMap<String, Loader>,
    /// Identifier/member-chain replacements (values are JSON or identifier paths)
    pub define: IndexMap<String, String>,
    /// Files imported into every entry whose exports replace free identifiers
    pub inject: Vec<PathBuf>,
    /// Explicit tsconfig.json instead of the nearest one per directory
    pub tsconfig: Option<PathBuf>,
    /// Extra package roots searched after `node_modules`
    pub node_paths: Vec<PathBuf>,
    /// Treat every call as impure regardless of `@__PURE__` comments
    pub ignore_annotations: bool,
    /// Produce the JSON build manifest
    pub metafile: bool,
    /// Packages whose barrel files load only the re-exports that are
    /// imported, in addition to packages marked `"sideEffects": false`
    pub optimize_imports: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            entry_points: Vec::new(),
            platform: Platform::default(),
            format: Format::default(),
            splitting: false,
            outdir: default_outdir(),
            working_dir: PathBuf::from("/"),
            global_name: None,
            external: Vec::new(),
            alias: IndexMap::new(),
            conditions: None,
            main_fields: None,
            resolve_extensions: default_resolve_extensions(),
            loader: IndexMap::new(),
            define: IndexMap::new(),
            inject: Vec::new(),
            tsconfig: None,
            node_paths: Vec::new(),
            ignore_annotations: false,
            metafile: false,
            optimize_imports: Vec::new(),
        }
    }
}

impl BuildOptions {
    /// Options for the given entries rooted at `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>, entry_points: Vec<PathBuf>) -> Self {
        BuildOptions {
            working_dir: working_dir.into(),
            entry_points,
            ..BuildOptions::default()
        }
    }

    /// Load options from a JSON(C) file. Relative `workingDir` values are
    /// taken relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read build options: {}", path.display()))?;
        let mut options: BuildOptions = jsonc::from_str(&source)
            .with_context(|| format!("failed to parse build options: {}", path.display()))?;
        if options.working_dir.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            options.working_dir = base.join(&options.working_dir);
        }
        Ok(options)
    }

    /// Reject combinations that cannot produce a valid bundle.
    pub fn validate(&self) -> Result<()> {
        if self.entry_points.is_empty() {
            bail!("no entry points were provided");
        }
        if self.splitting && self.format != Format::Esm {
            bail!(
                "splitting currently only works with the \"esm\" format, not \"{}\"",
                self.format.name()
            );
        }
        if let Some(name) = &self.global_name
            && (name.is_empty() || name.split('.').any(|part| !crate::ast::is_identifier(part)))
        {
            bail!("invalid global name \"{}\"", name);
        }
        for ext in self.resolve_extensions.iter().chain(self.loader.keys()) {
            if !ext.starts_with('.') {
                bail!("invalid file extension \"{}\": extensions must start with \".\"", ext);
            }
        }
        Ok(())
    }

    /// Export conditions that apply in addition to `import`/`require`, the
    /// platform condition, and `default`.
    pub fn custom_conditions(&self) -> Vec<String> {
        match &self.conditions {
            Some(conditions) => conditions.clone(),
            None => vec!["module".to_string()],
        }
    }

    pub fn main_fields(&self) -> Vec<String> {
        match &self.main_fields {
            Some(fields) => fields.clone(),
            None => self.platform.default_main_fields(),
        }
    }

    /// Effective extension → loader table.
    pub fn loaders(&self) -> IndexMap<String, Loader> {
        let mut loaders = default_loaders();
        for (ext, loader) in &self.loader {
            loaders.insert(ext.clone(), *loader);
        }
        loaders
    }

    /// Absolute form of a user-supplied path.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        crate::fs::normalize_path(&self.working_dir.join(path))
    }

    pub fn absolute_outdir(&self) -> PathBuf {
        self.absolute(&self.outdir)
    }
}

/// Choose a loader for `path` by its longest matching extension, so a
/// `.module.css` entry wins over `.css`.
pub fn loader_for_path(loaders: &IndexMap<String, Loader>, path: &Path) -> Option<Loader> {
    let file_name = path.file_name()?.to_str()?;
    loaders
        .iter()
        .filter(|(ext, _)| file_name.len() > ext.len() && file_name.ends_with(ext.as_str()))
        .max_by_key(|(ext, _)| ext.len())
        .map(|(_, loader)| *loader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case_options() {
        let options: BuildOptions = jsonc::from_str(
            r#"{
                // comment
                "entryPoints": ["src/index.ts"],
                "platform": "node",
                "format": "cjs",
                "mainFields": ["module", "main"],
                "loader": { ".png": "dataurl" },
                "optimizeImports": ["ui-kit"],
            }"#,
        )
        .unwrap();
        assert_eq!(options.entry_points, vec![PathBuf::from("src/index.ts")]);
        assert_eq!(options.platform, Platform::Node);
        assert_eq!(options.format, Format::Cjs);
        assert_eq!(options.main_fields(), vec!["module", "main"]);
        assert_eq!(options.loader.get(".png"), Some(&Loader::DataUrl));
        assert_eq!(options.outdir, PathBuf::from("out"));
        assert_eq!(options.optimize_imports, vec!["ui-kit"]);
    }

    #[test]
    fn test_validate_rejects_splitting_without_esm() {
        let mut options = BuildOptions::new("/proj", vec![PathBuf::from("a.js")]);
        options.splitting = true;
        options.format = Format::Iife;
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("splitting"));

        options.format = Format::Esm;
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_global_name() {
        let mut options = BuildOptions::new("/proj", vec![PathBuf::from("a.js")]);
        options.global_name = Some("my lib".to_string());
        assert!(options.validate().is_err());
        options.global_name = Some("window.myLib".to_string());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_default_conditions_and_main_fields() {
        let mut options = BuildOptions::default();
        assert_eq!(options.custom_conditions(), vec!["module"]);
        assert_eq!(options.main_fields(), vec!["browser", "module", "main"]);
        options.platform = Platform::Neutral;
        assert!(options.main_fields().is_empty());
        options.conditions = Some(Vec::new());
        assert!(options.custom_conditions().is_empty());
    }

    #[test]
    fn test_loader_for_path_prefers_longest_extension() {
        let mut loaders = default_loaders();
        loaders.insert(".d.txt".to_string(), Loader::Empty);
        assert_eq!(
            loader_for_path(&loaders, Path::new("/a/notes.d.txt")),
            Some(Loader::Empty)
        );
        assert_eq!(loader_for_path(&loaders, Path::new("/a/notes.txt")), Some(Loader::Text));
        assert_eq!(loader_for_path(&loaders, Path::new("/a/image.png")), None);
        assert_eq!(loader_for_path(&loaders, Path::new("/a/.js")), None);
    }
}
