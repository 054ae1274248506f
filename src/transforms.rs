//! Source transforms applied to each module before linking.
//!
//! - `define`: replace free identifiers, dotted member chains, `this` and
//!   `import.meta` with literals or other identifier paths
//! - `inject`: import exports of injected files wherever a free identifier
//!   matches them, and evaluate injected files before every entry
//! - TypeScript import elision: drop import bindings nothing uses

use crate::ast::build::{import_bare, import_named, member};
use crate::ast::visit::{Rewriter, collect_references, rewrite_stmts};
use crate::ast::{Expr, Stmt, is_identifier};
use crate::loaders::json_to_expr;
use anyhow::{Result, bail};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use std::path::PathBuf;

// =============================================================================
// Define
// =============================================================================

/// Parsed `define` table.
#[derive(Clone, Debug, Default)]
pub struct DefineTable {
    /// Single identifiers, plus `this` and `import.meta`
    idents: FxHashMap<String, Expr>,
    /// Dotted member chains such as `process.env.NODE_ENV`
    paths: FxHashMap<String, Expr>,
}

impl DefineTable {
    /// Parse `key → value` pairs. Values are JSON literals or identifier
    /// paths (`window.env`).
    pub fn parse(define: &IndexMap<String, String>) -> Result<Self> {
        let mut table = DefineTable::default();
        for (key, value) in define {
            if !is_define_key(key) {
                bail!("invalid define key \"{}\"", key);
            }
            let expr = parse_define_value(value)?;
            if key.contains('.') && key != "import.meta" {
                table.paths.insert(key.clone(), expr);
            } else {
                table.idents.insert(key.clone(), expr);
            }
        }
        Ok(table)
    }

    pub fn is_empty(&self) -> bool {
        self.idents.is_empty() && self.paths.is_empty()
    }
}

fn is_define_key(key: &str) -> bool {
    if key == "this" || key == "import.meta" {
        return true;
    }
    let rest = key.strip_prefix("import.meta.").unwrap_or(key);
    !rest.is_empty() && rest.split('.').all(is_identifier)
}

fn parse_define_value(value: &str) -> Result<Expr> {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(value) {
        return Ok(json_to_expr(&json));
    }
    let mut segments = value.split('.');
    let root = segments.next().unwrap_or_default();
    if !is_identifier(root) {
        bail!("invalid define value \"{}\": must be JSON or an identifier path", value);
    }
    let mut expr = Expr::Ident(root.to_string());
    for segment in segments {
        if !is_identifier(segment) {
            bail!("invalid define value \"{}\": must be JSON or an identifier path", value);
        }
        expr = member(expr, segment);
    }
    Ok(expr)
}

struct DefineRewriter<'a> {
    table: &'a DefineTable,
    /// Module-scope declarations shadow defines
    declared: &'a IndexSet<String>,
}

impl Rewriter for DefineRewriter<'_> {
    fn ident(&mut self, name: &str, is_write: bool) -> Option<Expr> {
        if is_write || self.declared.contains(name) {
            return None;
        }
        self.table.idents.get(name).cloned()
    }

    fn member_path(&mut self, path: &str) -> Option<Expr> {
        let root = path.split('.').next().unwrap_or(path);
        if self.declared.contains(root) {
            return None;
        }
        self.table.paths.get(path).cloned()
    }

    fn top_level_this(&mut self) -> Option<Expr> {
        self.table.idents.get("this").cloned()
    }

    fn import_meta(&mut self) -> Option<Expr> {
        self.table.idents.get("import.meta").cloned()
    }
}

/// Apply `table` to a module whose module-scope names are `declared`.
pub fn apply_define(stmts: &mut [Stmt], table: &DefineTable, declared: &IndexSet<String>) {
    if table.is_empty() {
        return;
    }
    let mut rewriter = DefineRewriter { table, declared };
    rewrite_stmts(stmts, &mut rewriter);
}

// =============================================================================
// Inject
// =============================================================================

/// An injected file and the names it exports.
#[derive(Clone, Debug)]
pub struct Injection {
    /// Absolute path used as the import specifier
    pub path: PathBuf,
    pub exports: Vec<String>,
}

/// Names a module exports through its own statements (`export *` excluded).
pub fn static_export_names(stmts: &[Stmt]) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in stmts {
        match stmt {
            Stmt::ExportDecl(inner) => names.extend(inner.declared_names()),
            Stmt::ExportNamed(export) if !export.type_only => {
                names.extend(export.specifiers.iter().map(|spec| spec.exported.clone()));
            }
            Stmt::ExportAll(export) => {
                if let Some(alias) = &export.alias {
                    names.push(alias.clone());
                }
            }
            Stmt::ExportDefault(_) => names.push("default".to_string()),
            _ => {}
        }
    }
    names
}

/// Prepend imports of injected exports that `unbound` names refer to.
/// Entries import every injected file so its side effects run first.
pub fn apply_inject(
    stmts: &mut Vec<Stmt>,
    injections: &[Injection],
    unbound: &IndexSet<String>,
    is_entry: bool,
) {
    let mut prelude = Vec::new();
    for injection in injections {
        let specifier = injection.path.to_string_lossy();
        let names: Vec<(&str, &str)> = injection
            .exports
            .iter()
            .filter(|name| name.as_str() != "default" && unbound.contains(name.as_str()))
            .map(|name| (name.as_str(), name.as_str()))
            .collect();
        if !names.is_empty() {
            prelude.push(import_named(&specifier, &names));
        } else if is_entry {
            prelude.push(import_bare(&specifier));
        }
    }
    if !prelude.is_empty() {
        stmts.splice(0..0, prelude);
    }
}

// =============================================================================
// TypeScript import elision
// =============================================================================

/// Remove type-only imports and exports, and import bindings that nothing
/// references. An import that loses every binding is removed entirely;
/// `import "x"` written without bindings is kept.
pub fn elide_unused_imports(stmts: &mut Vec<Stmt>) {
    let used = {
        let others: Vec<Stmt> = stmts
            .iter()
            .filter(|stmt| !matches!(stmt, Stmt::Import(_)))
            .cloned()
            .collect();
        collect_references(&others).free
    };

    stmts.retain_mut(|stmt| match stmt {
        Stmt::Import(import) => {
            if import.type_only {
                return false;
            }
            if import.is_bare() {
                return true;
            }
            import.named.retain(|spec| !spec.type_only && used.contains(&spec.local));
            if import.default.as_ref().is_some_and(|name| !used.contains(name)) {
                import.default = None;
            }
            if import.namespace.as_ref().is_some_and(|name| !used.contains(name)) {
                import.namespace = None;
            }
            !import.is_bare()
        }
        Stmt::ExportNamed(export) => !export.type_only,
        _ => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::VarKind;
    use crate::ast::build::*;

    fn define(pairs: &[(&str, &str)]) -> DefineTable {
        let map: IndexMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DefineTable::parse(&map).unwrap()
    }

    #[test]
    fn test_define_replaces_identifiers_and_member_chains() {
        let table = define(&[
            ("DEBUG", "false"),
            ("process.env.NODE_ENV", "\"production\""),
            ("global", "globalThis"),
        ]);
        let mut stmts = vec![
            expr_stmt(call(ident("log"), vec![ident("DEBUG"), ident("global")])),
            expr_stmt(member(member(ident("process"), "env"), "NODE_ENV")),
        ];
        apply_define(&mut stmts, &table, &IndexSet::new());
        assert_eq!(
            stmts[0],
            expr_stmt(call(ident("log"), vec![bool_lit(false), ident("globalThis")]))
        );
        assert_eq!(stmts[1], expr_stmt(str_lit("production")));
    }

    #[test]
    fn test_define_respects_local_declarations() {
        let table = define(&[("DEBUG", "true")]);
        let declared: IndexSet<String> = ["DEBUG".to_string()].into_iter().collect();
        let mut stmts = vec![
            var_decl(VarKind::Let, "DEBUG", Some(bool_lit(false))),
            expr_stmt(ident("DEBUG")),
        ];
        let before = stmts.clone();
        apply_define(&mut stmts, &table, &declared);
        assert_eq!(stmts, before);

        let mut shadowed = vec![function_decl("f", &["DEBUG"], vec![ret(ident("DEBUG"))])];
        let before = shadowed.clone();
        apply_define(&mut shadowed, &table, &IndexSet::new());
        assert_eq!(shadowed, before);
    }

    #[test]
    fn test_define_this_and_import_meta() {
        let table = define(&[("this", "window"), ("import.meta.env", "{}")]);
        let mut stmts = vec![
            expr_stmt(Expr::This),
            expr_stmt(member(Expr::ImportMeta, "env")),
        ];
        apply_define(&mut stmts, &table, &IndexSet::new());
        assert_eq!(stmts[0], expr_stmt(ident("window")));
        assert_eq!(stmts[1], expr_stmt(Expr::Object(vec![])));
    }

    #[test]
    fn test_define_rejects_bad_values() {
        let mut map = IndexMap::new();
        map.insert("A".to_string(), "not valid!".to_string());
        assert!(DefineTable::parse(&map).is_err());
        let mut map = IndexMap::new();
        map.insert("a-b".to_string(), "1".to_string());
        assert!(DefineTable::parse(&map).is_err());
    }

    #[test]
    fn test_inject_imports_matching_free_names() {
        let injections = vec![Injection {
            path: PathBuf::from("/proj/shim.js"),
            exports: vec!["Buffer".to_string(), "process".to_string()],
        }];
        let unbound: IndexSet<String> = ["Buffer".to_string()].into_iter().collect();

        let mut stmts = vec![expr_stmt(ident("Buffer"))];
        apply_inject(&mut stmts, &injections, &unbound, false);
        assert_eq!(stmts[0], import_named("/proj/shim.js", &[("Buffer", "Buffer")]));

        let mut entry = vec![expr_stmt(num(1.0))];
        apply_inject(&mut entry, &injections, &IndexSet::new(), true);
        assert_eq!(entry[0], import_bare("/proj/shim.js"));

        let mut other = vec![expr_stmt(num(1.0))];
        apply_inject(&mut other, &injections, &IndexSet::new(), false);
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn test_static_export_names() {
        let names = static_export_names(&[
            export_const("a", num(1.0)),
            export_named(&[("b", "c")]),
            export_all_as("./x", "ns"),
            export_all("./y"),
            export_default_expr(num(2.0)),
        ]);
        assert_eq!(names, vec!["a", "c", "ns", "default"]);
    }

    #[test]
    fn test_elide_unused_imports() {
        let mut stmts = vec![
            import_named("./types", &[("Props", "Props")]),
            import_named("./lib", &[("used", "used"), ("unused", "unused")]),
            import_bare("./polyfill"),
            expr_stmt(call(ident("used"), vec![])),
        ];
        elide_unused_imports(&mut stmts);
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[0], import_named("./lib", &[("used", "used")]));
        assert_eq!(stmts[1], import_bare("./polyfill"));
    }

    #[test]
    fn test_elision_keeps_reexported_bindings() {
        let mut stmts = vec![
            import_default("./a", "a"),
            export_named(&[("a", "a")]),
        ];
        elide_unused_imports(&mut stmts);
        assert_eq!(stmts.len(), 2);
    }
}
