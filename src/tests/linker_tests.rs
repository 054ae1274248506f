//! Symbol linker tests.
//!
//! Sections:
//! - Re-export chains and star exports
//! - Cycles
//! - CommonJS interop and wrapping
//! - Advisories
//! - Part edges
//! - Top-level await

use super::*;
use crate::ast::build::*;
use crate::ast::Stmt;
use crate::config::Format;
use crate::test_fixtures::Project;

fn error_codes(diagnostics: &DiagnosticBag) -> Vec<u32> {
    diagnostics.errors().map(|d| d.code).collect()
}

fn warning_codes(diagnostics: &DiagnosticBag) -> Vec<u32> {
    diagnostics.warnings().map(|d| d.code).collect()
}

fn lookup(linked: &LinkedGraph, module: u32, name: &str) -> SymbolId {
    match linked.symbols.lookup(ModuleId(module), name) {
        Some(symbol) => symbol,
        None => panic!("no symbol {} in module #{}", name, module),
    }
}

// =============================================================================
// Re-export chains and star exports
// =============================================================================

#[test]
fn test_reexport_chain_binds_to_origin() {
    let (graph, linked, diagnostics) = Project::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_named("./a", &[("x", "x")]),
                expr_stmt(method_call(ident("console"), "log", vec![ident("x")])),
            ],
        )
        .module("src/a.js", vec![export_from("./b", &[("x", "x")])])
        .module("src/b.js", vec![export_from("./c", &[("y", "x")])])
        .module("src/c.js", vec![export_const("y", num(1.0))])
        .link();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics.into_sorted());
    let origin = graph.find("src/c.js").unwrap().id;
    let y = linked.symbols.lookup(origin, "y").unwrap();
    assert_eq!(linked.binding(lookup(&linked, 0, "x")), Binding::Symbol(y));
}

#[test]
fn test_ambiguous_star_import_is_an_error() {
    let (_, _, diagnostics) = Project::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_named("./lib", &[("y", "y")]),
                expr_stmt(call(ident("use"), vec![ident("y")])),
            ],
        )
        .module("src/lib.js", vec![export_all("./a"), export_all("./b")])
        .module("src/a.js", vec![export_const("y", num(1.0))])
        .module("src/b.js", vec![export_const("y", num(2.0))])
        .link();
    let errors: Vec<_> = diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, codes::AMBIGUOUS_IMPORT);
    assert_eq!(errors[0].related.len(), 2);
    assert_eq!(errors[0].file_name, "src/index.js");
}

#[test]
fn test_ambiguous_name_is_omitted_from_namespace() {
    let (graph, linked, diagnostics) = Project::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_star("./lib", "ns"),
                expr_stmt(call(ident("use"), vec![member(ident("ns"), "y")])),
            ],
        )
        .module(
            "src/lib.js",
            vec![export_all("./a"), export_all("./b"), export_const("z", num(0.0))],
        )
        .module("src/a.js", vec![export_const("y", num(1.0))])
        .module("src/b.js", vec![export_const("y", num(2.0))])
        .link();
    assert!(!diagnostics.has_errors());
    assert_eq!(warning_codes(&diagnostics), vec![codes::UNDEFINED_NAMESPACE_MEMBER]);
    let lib = graph.find("src/lib.js").unwrap().id;
    let namespace = linked.namespace(lib).unwrap();
    assert!(namespace.get("y").is_none());
    assert!(namespace.get("z").is_some());
}

#[test]
fn test_local_export_shadows_star_exports() {
    let (graph, linked, diagnostics) = Project::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_named("./lib", &[("y", "y")]),
                expr_stmt(call(ident("use"), vec![ident("y")])),
            ],
        )
        .module(
            "src/lib.js",
            vec![export_all("./a"), export_all("./b"), export_const("y", num(3.0))],
        )
        .module("src/a.js", vec![export_const("y", num(1.0))])
        .module("src/b.js", vec![export_const("y", num(2.0))])
        .link();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics.into_sorted());
    let lib = graph.find("src/lib.js").unwrap().id;
    let local = linked.symbols.lookup(lib, "y").unwrap();
    assert_eq!(linked.binding(lookup(&linked, 0, "y")), Binding::Symbol(local));
}

#[test]
fn test_shared_origin_through_two_stars_is_not_ambiguous() {
    let (graph, linked, diagnostics) = Project::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_named("./lib", &[("y", "y")]),
                expr_stmt(call(ident("use"), vec![ident("y")])),
            ],
        )
        .module("src/lib.js", vec![export_all("./a"), export_all("./b")])
        .module("src/a.js", vec![export_all("./c")])
        .module("src/b.js", vec![export_all("./c")])
        .module("src/c.js", vec![export_const("y", num(1.0))])
        .link();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics.into_sorted());
    let c = graph.find("src/c.js").unwrap().id;
    let y = linked.symbols.lookup(c, "y").unwrap();
    assert_eq!(linked.binding(lookup(&linked, 0, "y")), Binding::Symbol(y));
}

#[test]
fn test_default_is_not_forwarded_by_star() {
    let (_, _, diagnostics) = Project::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_default("./lib", "value"),
                expr_stmt(call(ident("use"), vec![ident("value")])),
            ],
        )
        .module("src/lib.js", vec![export_all("./a")])
        .module("src/a.js", vec![export_default_expr(num(1.0))])
        .link();
    let errors: Vec<_> = diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, codes::NO_MATCHING_EXPORT);
    assert_eq!(
        errors[0].message,
        "No matching export in \"src/lib.js\" for import \"default\""
    );
}

#[test]
fn test_export_star_as_binds_namespace() {
    let (graph, linked, diagnostics) = Project::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_named("./lib", &[("utils", "utils")]),
                expr_stmt(call(ident("use"), vec![ident("utils")])),
            ],
        )
        .module("src/lib.js", vec![export_all_as("./utils", "utils")])
        .module("src/utils.js", vec![export_const("a", num(1.0))])
        .link();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics.into_sorted());
    let utils = graph.find("src/utils.js").unwrap().id;
    assert_eq!(linked.binding(lookup(&linked, 0, "utils")), Binding::Namespace(utils));
    // `export * as` does not merge names into the re-exporting module
    let lib = graph.find("src/lib.js").unwrap().id;
    let names: Vec<_> = linked
        .namespace(lib)
        .unwrap()
        .exports
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();
    assert_eq!(names, vec!["utils"]);
}

// =============================================================================
// Cycles
// =============================================================================

#[test]
fn test_reexport_cycle_is_reported_once_with_chain() {
    let (_, _, diagnostics) = Project::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_named("./a", &[("x", "x")]),
                expr_stmt(call(ident("use"), vec![ident("x")])),
            ],
        )
        .module("src/a.js", vec![export_from("./b", &[("x", "x")])])
        .module("src/b.js", vec![export_from("./a", &[("x", "x")])])
        .link();
    let errors: Vec<_> = diagnostics.errors().collect();
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert_eq!(errors[0].code, codes::REEXPORT_CYCLE);
    assert_eq!(errors[0].kind, ErrorKind::Cycle);
    let files: Vec<_> = errors[0].related.iter().map(|r| r.file_name.as_str()).collect();
    assert!(files.contains(&"src/a.js"));
    assert!(files.contains(&"src/b.js"));
}

#[test]
fn test_star_export_cycle_is_legal() {
    let (graph, linked, diagnostics) = Project::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_named("./a", &[("x", "x"), ("y", "y")]),
                expr_stmt(call(ident("use"), vec![ident("x"), ident("y")])),
            ],
        )
        .module("src/a.js", vec![export_all("./b"), export_const("x", num(1.0))])
        .module("src/b.js", vec![export_all("./a"), export_const("y", num(2.0))])
        .link();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics.into_sorted());
    let b = graph.find("src/b.js").unwrap().id;
    let names: Vec<_> = linked
        .namespace(b)
        .unwrap()
        .exports
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();
    assert_eq!(names, vec!["x", "y"]);
}

// =============================================================================
// CommonJS interop and wrapping
// =============================================================================

#[test]
fn test_named_import_from_commonjs_reads_property() {
    let (graph, linked, diagnostics) = Project::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_named("./cjs", &[("foo", "foo")]),
                expr_stmt(call(ident("use"), vec![ident("foo")])),
            ],
        )
        .module("src/cjs.js", vec![exports_assign("bar", num(1.0))])
        .link();
    assert!(!diagnostics.has_errors());
    assert_eq!(
        warning_codes(&diagnostics),
        vec![codes::POSSIBLY_MISSING_COMMONJS_EXPORT]
    );
    let cjs = graph.find("src/cjs.js").unwrap().id;
    assert!(linked.is_wrapped(cjs));
    let object = linked
        .symbols
        .interop(ModuleId(0), &InteropTarget::Module(cjs))
        .unwrap();
    assert_eq!(linked.symbols.base(object), "import_cjs");
    assert_eq!(
        linked.binding(lookup(&linked, 0, "foo")),
        Binding::Property {
            object,
            name: "foo".to_string()
        }
    );
}

#[test]
fn test_wrapping_spreads_through_static_imports() {
    let (graph, linked, _) = Project::new(&["src/index.js"])
        .module("src/index.js", vec![expr_stmt(require("./a"))])
        .module("src/a.js", vec![import_bare("./b"), export_const("a", num(1.0))])
        .module("src/b.js", vec![export_const("b", num(1.0))])
        .module("src/c.js", vec![])
        .link();
    let wrapped: Vec<_> = graph
        .iter()
        .filter(|m| linked.is_wrapped(m.id))
        .map(|m| m.display.as_str())
        .collect();
    assert_eq!(wrapped, vec!["src/a.js", "src/b.js"]);
    let a = graph.find("src/a.js").unwrap().id;
    assert_eq!(linked.symbols.base(linked.symbols.wrapper(a).unwrap()), "require_a");
}

#[test]
fn test_dynamic_import_target_is_entry_when_splitting() {
    let project = Project::new(&["src/index.js"])
        .module("src/index.js", vec![expr_stmt(dynamic_import("./lazy"))])
        .module("src/lazy.js", vec![export_const("a", num(1.0))]);
    let (graph, linked, _) = project.link();
    let lazy = graph.find("src/lazy.js").unwrap().id;
    assert!(linked.is_wrapped(lazy));
    assert_eq!(linked.entries, vec![ModuleId(0)]);

    let (_, linked, _) = project
        .configure(|options| options.splitting = true)
        .link();
    assert!(!linked.is_wrapped(lazy));
    assert_eq!(linked.entries, vec![ModuleId(0), lazy]);
}

#[test]
fn test_esm_entry_reexporting_commonjs_gets_export_temp() {
    let (_, linked, _) = Project::new(&["src/index.js"])
        .module("src/index.js", vec![export_from("./cjs", &[("foo", "foo")])])
        .module("src/cjs.js", vec![exports_assign("foo", num(1.0))])
        .link();
    let temp = linked.export_temps[&(ModuleId(0), "foo".to_string())];
    assert_eq!(linked.symbols.base(temp), "export_foo");

    let (_, linked, _) = Project::new(&["src/index.js"])
        .module("src/index.js", vec![export_from("./cjs", &[("foo", "foo")])])
        .module("src/cjs.js", vec![exports_assign("foo", num(1.0))])
        .format(Format::Cjs)
        .link();
    assert!(linked.export_temps.is_empty());
}

// =============================================================================
// Advisories
// =============================================================================

#[test]
fn test_assignment_to_import() {
    let (_, _, diagnostics) = Project::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_named("./a", &[("x", "x")]),
                expr_stmt(assign(ident("x"), num(2.0))),
            ],
        )
        .module("src/a.js", vec![export_const("x", num(1.0))])
        .link();
    assert_eq!(error_codes(&diagnostics), vec![codes::ASSIGN_TO_IMPORT]);

    let (_, _, diagnostics) = Project::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_named("./a", &[("x", "x")]),
                Stmt::Try {
                    block: vec![expr_stmt(assign(ident("x"), num(2.0)))],
                    param: None,
                    handler: Some(vec![]),
                    finalizer: None,
                },
            ],
        )
        .module("src/a.js", vec![export_const("x", num(1.0))])
        .link();
    assert!(!diagnostics.has_errors());
    assert_eq!(warning_codes(&diagnostics), vec![codes::ASSIGN_TO_IMPORT]);
}

// =============================================================================
// Part edges
// =============================================================================

#[test]
fn test_namespace_member_access_depends_on_member_only() {
    let (graph, linked, _) = Project::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_star("./a", "ns"),
                expr_stmt(call(ident("use"), vec![member(ident("ns"), "x")])),
                expr_stmt(call(ident("use"), vec![ident("ns")])),
            ],
        )
        .module(
            "src/a.js",
            vec![export_const("x", num(1.0)), export_const("y", num(2.0))],
        )
        .link();
    let a = graph.find("src/a.js").unwrap().id;
    let x = linked.symbols.lookup(a, "x").unwrap();
    assert_eq!(linked.part_deps(ModuleId(0), 1), &[Dep::Symbol(x)]);
    assert_eq!(linked.part_deps(ModuleId(0), 2), &[Dep::Namespace(a)]);
}

#[test]
fn test_require_depends_on_wrapper() {
    let (graph, linked, _) = Project::new(&["src/index.js"])
        .module("src/index.js", vec![const_decl("lib", require("./lib"))])
        .module("src/lib.js", vec![module_exports_assign(num(1.0))])
        .link();
    let lib = graph.find("src/lib.js").unwrap().id;
    let wrapper = linked.symbols.wrapper(lib).unwrap();
    assert_eq!(linked.part_deps(ModuleId(0), 0), &[Dep::Symbol(wrapper)]);
    assert_eq!(linked.record_part(ModuleId(0), 0), Some(0));
}

// =============================================================================
// Top-level await
// =============================================================================

#[test]
fn test_require_of_module_with_transitive_top_level_await() {
    let (graph, linked, diagnostics) = Project::new(&["src/index.js"])
        .module("src/index.js", vec![expr_stmt(require("./a"))])
        .module("src/a.js", vec![import_bare("./b")])
        .module("src/b.js", vec![expr_stmt(await_expr(ident("ready")))])
        .link();
    let errors: Vec<_> = diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, codes::REQUIRE_TOP_LEVEL_AWAIT);
    assert_eq!(errors[0].related[0].file_name, "src/b.js");
    let a = graph.find("src/a.js").unwrap().id;
    assert!(linked.tla.contains(a.index()));
    assert!(!linked.tla.contains(0));
}

#[test]
fn test_external_stem() {
    assert_eq!(external_stem("node:fs"), "fs");
    assert_eq!(external_stem("@scope/pkg"), "pkg");
    assert_eq!(external_stem("https://cdn.example/x.min.js"), "x");
    assert_eq!(external_stem("lodash"), "lodash");
}
