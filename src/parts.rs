//! Part Analysis
//!
//! Splits a module into parts, one per top-level statement, and computes
//! the module-wide facts the linker needs to infer the module's kind:
//! - which names each part declares, reads and writes
//! - whether the part must be kept for its side effects
//! - top-level `await`/`return`/`this`/`import.meta`
//! - the static shape of a CommonJS `exports` object, when it has one

use crate::ast::visit::{References, collect_references};
use crate::ast::{AssignOp, DefaultValue, Expr, Prop, PropKey, Stmt};
use crate::side_effects::{PurityOptions, stmt_has_side_effects};
use bitflags::bitflags;
use indexmap::IndexSet;
use smallvec::SmallVec;

bitflags! {
    /// Per-part facts used by tree shaking and format checks.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PartFlags: u8 {
        /// Evaluating the statement may be observable
        const FORCE_KEEP = 0b0000_0001;
        /// Reachable top-level `await` or `for await`
        const HAS_TLA = 0b0000_0010;
        /// `import`, `export ... from` or `export * from`
        const MODULE_SYNTAX = 0b0000_0100;
        /// `return` outside of any function
        const TOP_LEVEL_RETURN = 0b0000_1000;
    }
}

/// One top-level statement as a linkable unit. Part `i` is statement `i`.
#[derive(Clone, Debug, Default)]
pub struct Part {
    /// Module-scope names the statement declares
    pub declared: Vec<String>,
    pub refs: References,
    pub flags: PartFlags,
    /// Import records referenced from this statement
    pub records: SmallVec<[u32; 2]>,
}

impl Part {
    pub fn is_force_keep(&self) -> bool {
        self.flags.contains(PartFlags::FORCE_KEEP)
    }
}

/// Module-wide facts gathered from all parts.
#[derive(Clone, Debug, Default)]
pub struct ModuleAnalysis {
    /// `import`/`export` statements are present
    pub uses_esm_syntax: bool,
    /// `module` or `exports` is referenced without a local declaration
    pub uses_cjs_globals: bool,
    pub has_top_level_return: bool,
    pub has_top_level_await: bool,
    pub top_level_this: bool,
    pub import_meta: bool,
    /// Every module-scope declaration, in source order
    pub declared: IndexSet<String>,
    /// Names read from module scope that nothing in the module declares
    pub unbound: IndexSet<String>,
    /// Names assigned onto `exports`/`module.exports`. `None` when the
    /// exports object is replaced by something other than an object literal.
    pub cjs_export_names: Option<IndexSet<String>>,
}

/// Split `stmts` into parts and summarize the module.
pub fn analyze_module(stmts: &[Stmt], purity: PurityOptions) -> (Vec<Part>, ModuleAnalysis) {
    let mut analysis = ModuleAnalysis::default();
    let mut parts = Vec::with_capacity(stmts.len());

    for stmt in stmts {
        let mut declared = stmt.declared_names();
        if let Stmt::ExportDefault(value) = stmt
            && default_export_local(value) == DEFAULT_EXPORT_LOCAL
        {
            declared.push(DEFAULT_EXPORT_LOCAL.to_string());
        }
        let refs = collect_references(std::slice::from_ref(stmt));
        let mut flags = PartFlags::empty();
        if stmt_has_side_effects(stmt, purity) {
            flags |= PartFlags::FORCE_KEEP;
        }
        if has_live_top_level_await(stmt) {
            flags |= PartFlags::HAS_TLA;
        }
        if has_top_level_return(stmt) {
            flags |= PartFlags::TOP_LEVEL_RETURN;
        }
        if is_module_syntax(stmt) {
            flags |= PartFlags::MODULE_SYNTAX;
            analysis.uses_esm_syntax = true;
        }
        analysis.has_top_level_await |= flags.contains(PartFlags::HAS_TLA);
        analysis.has_top_level_return |= flags.contains(PartFlags::TOP_LEVEL_RETURN);
        analysis.top_level_this |= refs.top_level_this;
        analysis.import_meta |= refs.import_meta;
        analysis.declared.extend(declared.iter().cloned());
        parts.push(Part {
            declared,
            refs,
            flags,
            records: SmallVec::new(),
        });
    }

    for part in &parts {
        for name in &part.refs.free {
            if !analysis.declared.contains(name) {
                analysis.unbound.insert(name.clone());
            }
        }
    }
    analysis.uses_cjs_globals =
        analysis.unbound.contains("module") || analysis.unbound.contains("exports");
    analysis.cjs_export_names = if analysis.uses_cjs_globals {
        cjs_export_shape(stmts)
    } else {
        Some(IndexSet::new())
    };

    (parts, analysis)
}

fn is_module_syntax(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Import(import) => !import.type_only,
        Stmt::ExportNamed(_) | Stmt::ExportAll(_) | Stmt::ExportDecl(_) | Stmt::ExportDefault(_) => {
            true
        }
        _ => false,
    }
}

/// Top-level `await` that can actually run: branches of an `if` with a
/// constant test that is never taken are ignored.
fn has_live_top_level_await(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::If {
            test,
            consequent,
            alternate,
        } => match test.static_truthiness() {
            Some(true) => has_live_top_level_await(consequent),
            Some(false) => alternate
                .as_deref()
                .is_some_and(has_live_top_level_await),
            None => collect_references(std::slice::from_ref(stmt)).top_level_await,
        },
        Stmt::Block(body) => body.iter().any(has_live_top_level_await),
        Stmt::ExportDecl(inner) => has_live_top_level_await(inner),
        _ => collect_references(std::slice::from_ref(stmt)).top_level_await,
    }
}

fn has_top_level_return(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::If {
            consequent,
            alternate,
            ..
        } => has_top_level_return(consequent) || alternate.as_deref().is_some_and(has_top_level_return),
        Stmt::Block(body) => body.iter().any(has_top_level_return),
        Stmt::While { body, .. } | Stmt::ForOf { body, .. } => has_top_level_return(body),
        Stmt::Try {
            block,
            handler,
            finalizer,
            ..
        } => block
            .iter()
            .chain(handler.iter().flatten())
            .chain(finalizer.iter().flatten())
            .any(has_top_level_return),
        _ => false,
    }
}

/// Names a CommonJS module visibly exports:
/// `exports.x = ...`, `module.exports.x = ...`,
/// `module.exports = { x, ... }` and `Object.defineProperty(exports, "x", ...)`.
fn cjs_export_shape(stmts: &[Stmt]) -> Option<IndexSet<String>> {
    let mut names = IndexSet::new();
    for stmt in stmts {
        let Stmt::Expr(expr) = stmt else {
            continue;
        };
        match expr {
            Expr::Assign {
                op: AssignOp::Assign,
                target,
                value,
            } => {
                if is_module_exports(target) {
                    let Expr::Object(props) = value.as_ref() else {
                        return None;
                    };
                    names.clear();
                    for prop in props {
                        match prop {
                            Prop::KeyValue(PropKey::Named(key), _) => {
                                names.insert(key.clone());
                            }
                            _ => return None,
                        }
                    }
                } else if let Expr::Member(object, name) = target.as_ref()
                    && (matches!(object.as_ref(), Expr::Ident(ident) if ident == "exports")
                        || is_module_exports(object))
                {
                    names.insert(name.clone());
                }
            }
            Expr::Call(call) => {
                if call.callee.dotted_path().as_deref() == Some("Object.defineProperty")
                    && let [target, Expr::Str(name), ..] = call.args.as_slice()
                    && (matches!(target, Expr::Ident(ident) if ident == "exports")
                        || is_module_exports(target))
                    && name != "__esModule"
                {
                    names.insert(name.clone());
                }
            }
            _ => {}
        }
    }
    Some(names)
}

fn is_module_exports(expr: &Expr) -> bool {
    matches!(expr, Expr::Member(object, prop)
        if prop == "exports" && matches!(object.as_ref(), Expr::Ident(name) if name == "module"))
}

/// Name bound by an `export default` that has no name of its own.
pub const DEFAULT_EXPORT_LOCAL: &str = "default";

/// The module-scope name an `export default` statement binds.
pub fn default_export_local(value: &DefaultValue) -> &str {
    match value {
        DefaultValue::Function(function) => function.name.as_deref().unwrap_or(DEFAULT_EXPORT_LOCAL),
        DefaultValue::Class(class) => class.name.as_deref().unwrap_or(DEFAULT_EXPORT_LOCAL),
        DefaultValue::Expr(_) => DEFAULT_EXPORT_LOCAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::BinaryOp;

    fn analyze(stmts: &[Stmt]) -> (Vec<Part>, ModuleAnalysis) {
        analyze_module(stmts, PurityOptions::default())
    }

    #[test]
    fn test_one_part_per_statement() {
        let stmts = vec![
            import_named("./foo", &[("fn", "fn")]),
            function_decl("local", &[], vec![ret(call(ident("fn"), vec![]))]),
            expr_stmt(method_call(ident("console"), "log", vec![call(ident("local"), vec![])])),
        ];
        let (parts, analysis) = analyze(&stmts);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].declared, vec!["fn"]);
        assert!(parts[0].flags.contains(PartFlags::MODULE_SYNTAX));
        assert!(!parts[1].is_force_keep());
        assert!(parts[2].is_force_keep());
        assert!(parts[1].refs.free.contains("fn"));
        assert!(analysis.uses_esm_syntax);
        assert!(!analysis.uses_cjs_globals);
        assert_eq!(analysis.unbound.iter().collect::<Vec<_>>(), vec!["console"]);
    }

    #[test]
    fn test_top_level_await_in_dead_branch_is_ignored() {
        let dead = vec![if_stmt(bool_lit(false), expr_stmt(await_expr(ident("foo"))), None)];
        assert!(!analyze(&dead).1.has_top_level_await);

        let live = vec![expr_stmt(await_expr(ident("foo")))];
        let (parts, analysis) = analyze(&live);
        assert!(analysis.has_top_level_await);
        assert!(parts[0].flags.contains(PartFlags::HAS_TLA));

        let unknown = vec![if_stmt(ident("x"), expr_stmt(await_expr(ident("foo"))), None)];
        assert!(analyze(&unknown).1.has_top_level_await);
    }

    #[test]
    fn test_cjs_export_shape() {
        let (_, analysis) = analyze(&[
            exports_assign("a", num(1.0)),
            expr_stmt(assign(member(member(ident("module"), "exports"), "b"), num(2.0))),
        ]);
        assert!(analysis.uses_cjs_globals);
        let names = analysis.cjs_export_names.unwrap();
        assert_eq!(names.iter().collect::<Vec<_>>(), vec!["a", "b"]);

        let (_, literal) = analyze(&[module_exports_assign(object(vec![("x", num(1.0))]))]);
        assert_eq!(
            literal.cjs_export_names.unwrap().iter().collect::<Vec<_>>(),
            vec!["x"]
        );

        let (_, opaque) = analyze(&[module_exports_assign(call(ident("factory"), vec![]))]);
        assert!(opaque.cjs_export_names.is_none());
    }

    #[test]
    fn test_local_exports_binding_is_not_commonjs() {
        let (_, analysis) = analyze(&[
            const_decl("exports", object(vec![])),
            exports_assign("a", num(1.0)),
        ]);
        assert!(!analysis.uses_cjs_globals);
    }

    #[test]
    fn test_top_level_return() {
        let (parts, analysis) = analyze(&[if_stmt(
            binary(BinaryOp::StrictEq, ident("a"), num(1.0)),
            block(vec![Stmt::Return(None)]),
            None,
        )]);
        assert!(analysis.has_top_level_return);
        assert!(parts[0].flags.contains(PartFlags::TOP_LEVEL_RETURN));

        let (_, nested) = analyze(&[function_decl("f", &[], vec![Stmt::Return(None)])]);
        assert!(!nested.has_top_level_return);
    }

    #[test]
    fn test_default_export_local() {
        assert_eq!(default_export_local(&DefaultValue::Expr(num(1.0))), "default");
        let named = DefaultValue::Function(function(Some("main"), &[], vec![]));
        assert_eq!(default_export_local(&named), "main");
    }
}
