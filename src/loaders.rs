//! Loaders
//!
//! Turn a resolved file into module IR. Script loaders (`js`, `jsx`, `ts`,
//! `tsx`) hand the source text to the external [`ModuleParser`]; every other
//! loader synthesizes a small ES module from the file contents:
//!
//! | loader    | module                                               |
//! |-----------|------------------------------------------------------|
//! | `json`    | `export default {...}` plus one export per identifier key |
//! | `text`    | `export default "<contents>"`                        |
//! | `base64`  | `export default "<base64>"`                          |
//! | `dataurl` | `export default "data:<mime>;base64,<base64>"`      |
//! | `file`    | asset copied with a content hash, default-exports its path |
//! | `copy`    | asset copied as is, default-exports its path         |
//! | `empty`   | no statements                                        |

use crate::ast::build::{const_decl, export_decl, export_default_expr, str_lit};
use crate::ast::{Expr, Prop, PropKey, Stmt, is_identifier};
use crate::config::Loader;
use crate::fs::{FileSystem, normalize_path};
use crate::module_resolver::ModulePath;
use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Output of the external parser for one file.
#[derive(Clone, Debug, Default)]
pub struct ParsedModule {
    pub stmts: Vec<Stmt>,
    /// Length of the source text in bytes
    pub source_len: usize,
}

/// The parser seam. Implementations must be shareable across the worker
/// threads that parse one discovery wave.
pub trait ModuleParser: Send + Sync {
    fn parse(&self, path: &Path, source: &str, loader: Loader) -> Result<ParsedModule>;
}

/// A parser that serves modules parsed ahead of time, keyed by path.
///
/// Embedders that already hold IR (a persistent cache, another front end)
/// register it here instead of re-parsing text.
#[derive(Debug, Default)]
pub struct PreparsedParser {
    modules: RwLock<FxHashMap<PathBuf, Vec<Stmt>>>,
}

impl PreparsedParser {
    pub fn new() -> Self {
        PreparsedParser::default()
    }

    pub fn insert(&self, path: impl AsRef<Path>, stmts: Vec<Stmt>) {
        let path = normalize_path(path.as_ref());
        if let Ok(mut modules) = self.modules.write() {
            modules.insert(path, stmts);
        }
    }

    /// Builder-style variant of [`PreparsedParser::insert`].
    pub fn with_module(self, path: impl AsRef<Path>, stmts: Vec<Stmt>) -> Self {
        self.insert(path, stmts);
        self
    }
}

impl ModuleParser for PreparsedParser {
    fn parse(&self, path: &Path, source: &str, _loader: Loader) -> Result<ParsedModule> {
        let modules = self
            .modules
            .read()
            .map_err(|_| anyhow!("preparsed module table is poisoned"))?;
        let stmts = modules
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| anyhow!("no parsed module registered for {}", path.display()))?;
        Ok(ParsedModule {
            stmts,
            source_len: source.len(),
        })
    }
}

/// A file emitted next to the bundle by the `file` and `copy` loaders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    /// File name relative to the output directory
    pub file_name: String,
    pub contents: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadedModule {
    pub stmts: Vec<Stmt>,
    pub source_len: usize,
    pub asset: Option<Asset>,
}

/// Read and convert one module.
pub fn load_module(
    fs: &dyn FileSystem,
    parser: &dyn ModuleParser,
    module: &ModulePath,
    loader: Loader,
) -> Result<LoadedModule> {
    if module.disabled || loader == Loader::Empty {
        return Ok(LoadedModule::default());
    }
    let path = module.path.as_path();
    let bytes = fs
        .read(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    let source_len = bytes.len();

    let (stmts, asset) = match loader {
        Loader::Js | Loader::Jsx | Loader::Ts | Loader::Tsx => {
            let source = String::from_utf8(bytes)
                .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
            let parsed = parser
                .parse(path, &source, loader)
                .with_context(|| format!("could not parse {}", path.display()))?;
            (parsed.stmts, None)
        }
        Loader::Json => {
            let value: serde_json::Value = serde_json::from_slice(&bytes)
                .with_context(|| format!("could not parse JSON in {}", path.display()))?;
            (json_module(&value), None)
        }
        Loader::Text => {
            let text = String::from_utf8(bytes)
                .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
            (vec![export_default_expr(str_lit(&text))], None)
        }
        Loader::Base64 => {
            let encoded = STANDARD.encode(&bytes);
            (vec![export_default_expr(str_lit(&encoded))], None)
        }
        Loader::DataUrl => {
            let url = format!("data:{};base64,{}", mime_type(path), STANDARD.encode(&bytes));
            (vec![export_default_expr(str_lit(&url))], None)
        }
        Loader::File | Loader::Copy => {
            let file_name = asset_file_name(path, &bytes, loader == Loader::File);
            let stmts = vec![export_default_expr(str_lit(&format!("./{}", file_name)))];
            (
                stmts,
                Some(Asset {
                    file_name,
                    contents: bytes,
                }),
            )
        }
        Loader::Empty => (Vec::new(), None),
    };

    Ok(LoadedModule {
        stmts,
        source_len,
        asset,
    })
}

/// JSON modules export their top-level identifier keys individually so
/// unused keys can be shaken out, and the whole object as `default`.
fn json_module(value: &serde_json::Value) -> Vec<Stmt> {
    let serde_json::Value::Object(map) = value else {
        return vec![export_default_expr(json_to_expr(value))];
    };
    let mut stmts = Vec::new();
    let mut props = Vec::with_capacity(map.len());
    for (key, value) in map {
        if is_identifier(key) {
            stmts.push(export_decl(const_decl(key, json_to_expr(value))));
            props.push(Prop::KeyValue(PropKey::Named(key.clone()), Expr::Ident(key.clone())));
        } else {
            props.push(Prop::KeyValue(PropKey::Named(key.clone()), json_to_expr(value)));
        }
    }
    stmts.push(export_default_expr(Expr::Object(props)));
    stmts
}

/// Literal expression for a JSON value.
pub fn json_to_expr(value: &serde_json::Value) -> Expr {
    match value {
        serde_json::Value::Null => Expr::Null,
        serde_json::Value::Bool(b) => Expr::Bool(*b),
        serde_json::Value::Number(n) => Expr::Num(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Expr::Str(s.clone()),
        serde_json::Value::Array(items) => Expr::Array(items.iter().map(json_to_expr).collect()),
        serde_json::Value::Object(map) => Expr::Object(
            map.iter()
                .map(|(key, value)| Prop::KeyValue(PropKey::Named(key.clone()), json_to_expr(value)))
                .collect(),
        ),
    }
}

fn asset_file_name(path: &Path, contents: &[u8], hashed: bool) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("asset");
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    if hashed {
        format!("{}-{}{}", stem, content_hash(contents), ext)
    } else {
        format!("{}{}", stem, ext)
    }
}

/// Eight uppercase hex digits derived from the bytes.
pub fn content_hash(contents: &[u8]) -> String {
    let mut hasher = FxHasher::default();
    hasher.write(contents);
    format!("{:08X}", hasher.finish() as u32)
}

fn mime_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "txt" => "text/plain;charset=utf-8",
        "html" => "text/html;charset=utf-8",
        "css" => "text/css;charset=utf-8",
        "js" | "mjs" | "cjs" => "text/javascript;charset=utf-8",
        "json" => "application/json;charset=utf-8",
        "wasm" => "application/wasm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DefaultValue;
    use crate::fs::MemoryFileSystem;

    fn load(fs: &MemoryFileSystem, path: &str, loader: Loader) -> LoadedModule {
        load_module(fs, &PreparsedParser::new(), &ModulePath::file(path), loader).unwrap()
    }

    fn default_export(stmts: &[Stmt]) -> &Expr {
        match stmts.last() {
            Some(Stmt::ExportDefault(DefaultValue::Expr(expr))) => expr,
            other => panic!("expected default export, got {:?}", other),
        }
    }

    #[test]
    fn test_json_exports_identifier_keys() {
        let fs = MemoryFileSystem::new().with_file("/p/data.json", r#"{"name": "x", "not-ident": 2}"#);
        let loaded = load(&fs, "/p/data.json", Loader::Json);
        assert_eq!(loaded.stmts.len(), 2);
        assert_eq!(loaded.stmts[0].declared_names(), vec!["name"]);
        let Expr::Object(props) = default_export(&loaded.stmts) else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn test_text_base64_and_dataurl() {
        let fs = MemoryFileSystem::new().with_file("/p/a.txt", "hi");
        assert_eq!(default_export(&load(&fs, "/p/a.txt", Loader::Text).stmts), &str_lit("hi"));
        assert_eq!(default_export(&load(&fs, "/p/a.txt", Loader::Base64).stmts), &str_lit("aGk="));
        assert_eq!(
            default_export(&load(&fs, "/p/a.txt", Loader::DataUrl).stmts),
            &str_lit("data:text/plain;charset=utf-8;base64,aGk=")
        );
    }

    #[test]
    fn test_file_loader_emits_hashed_asset() {
        let fs = MemoryFileSystem::new().with_file("/p/logo.png", vec![1u8, 2, 3]);
        let loaded = load(&fs, "/p/logo.png", Loader::File);
        let asset = loaded.asset.unwrap();
        assert!(asset.file_name.starts_with("logo-"));
        assert!(asset.file_name.ends_with(".png"));
        assert_eq!(asset.contents, vec![1, 2, 3]);
        assert_eq!(
            default_export(&loaded.stmts),
            &str_lit(&format!("./{}", asset.file_name))
        );

        let copied = load(&fs, "/p/logo.png", Loader::Copy);
        assert_eq!(copied.asset.unwrap().file_name, "logo.png");
    }

    #[test]
    fn test_disabled_and_empty_modules_skip_reading() {
        let fs = MemoryFileSystem::new();
        let mut disabled = ModulePath::file("/p/missing.js");
        disabled.disabled = true;
        let loaded = load_module(&fs, &PreparsedParser::new(), &disabled, Loader::Js).unwrap();
        assert!(loaded.stmts.is_empty());
        assert!(load(&fs, "/p/none.css", Loader::Empty).stmts.is_empty());
    }

    #[test]
    fn test_preparsed_parser_requires_registration() {
        let fs = MemoryFileSystem::new().with_file("/p/a.js", "x");
        let err = load_module(&fs, &PreparsedParser::new(), &ModulePath::file("/p/a.js"), Loader::Js)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("no parsed module registered"));
    }
}
