//! End-to-end bundling tests
//!
//! These run whole builds through the public API:
//! - Resolving and concatenating modules
//! - Linking errors and their rendering
//! - Tree shaking across packages
//! - Format restrictions
//! - Writing results to disk
//!
//! Sections:
//! - Concatenation
//! - Linking
//! - Tree shaking
//! - Formats
//! - Build results

mod common;

use common::{ROOT, TestProject};
use std::sync::Arc;
use tsz_bundler::ast::build::*;
use tsz_bundler::ast::{BinaryOp, Expr, Stmt};
use tsz_bundler::diagnostics::codes;
use tsz_bundler::reporter::Reporter;
use tsz_bundler::Format;

fn log(value: Expr) -> Stmt {
    expr_stmt(method_call(ident("console"), "log", vec![value]))
}

// =============================================================================
// Concatenation
// =============================================================================

#[test]
fn test_two_module_bundle() {
    let project = TestProject::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_named("./lib", &[("fn", "fn")]),
                log(call(ident("fn"), vec![])),
            ],
        )
        .module(
            "src/lib.js",
            vec![export_decl(function_decl("fn", &[], vec![ret(num(123.0))]))],
        );
    assert_eq!(
        project.output("index.js"),
        "// src/lib.js\nfunction fn() {\n  return 123;\n}\n\n// src/index.js\nconsole.log(fn());\n"
    );
}

#[test]
fn test_reexport_chain_reads_the_original_binding() {
    let project = TestProject::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![import_named("./mid", &[("a", "a")]), log(ident("a"))],
        )
        .module("src/mid.js", vec![export_from("./leaf", &[("a", "a")])])
        .module("src/leaf.js", vec![export_const("a", num(1.0))]);
    let text = project.output("index.js");
    assert!(text.contains("const a = 1;"), "{}", text);
    assert!(text.ends_with("console.log(a);\n"), "{}", text);
    assert!(!text.contains("export"), "{}", text);
}

#[test]
fn test_package_entry_from_node_modules() {
    let project = TestProject::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![import_named("pkg", &[("answer", "answer")]), log(ident("answer"))],
        )
        .file(
            "node_modules/pkg/package.json",
            r#"{ "name": "pkg", "main": "./lib/main.js" }"#,
        )
        .module(
            "node_modules/pkg/lib/main.js",
            vec![export_const("answer", num(42.0))],
        );
    let text = project.output("index.js");
    assert!(text.contains("// node_modules/pkg/lib/main.js\nconst answer = 42;\n"), "{}", text);
}

#[test]
fn test_builds_are_deterministic() {
    let project = TestProject::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_star("./a", "a"),
                import_named("./b", &[("b", "b")]),
                log(array(vec![ident("a"), ident("b")])),
            ],
        )
        .module("src/a.js", vec![export_const("x", num(1.0)), export_const("b", num(2.0))])
        .module("src/b.js", vec![export_const("b", num(3.0))]);
    let first = project.output("index.js");
    for _ in 0..4 {
        assert_eq!(project.output("index.js"), first);
    }
}

// =============================================================================
// Linking
// =============================================================================

fn ambiguous(index: Vec<Stmt>) -> TestProject {
    TestProject::new(&["src/index.js"])
        .module("src/index.js", index)
        .module(
            "src/lib.js",
            vec![export_all("./a"), export_all("./b"), export_const("z", num(0.0))],
        )
        .module("src/a.js", vec![export_const("y", num(1.0))])
        .module("src/b.js", vec![export_const("y", num(2.0))])
}

#[test]
fn test_ambiguous_import_fails_the_build() {
    let project = ambiguous(vec![
        import_named("./lib", &[("y", "y")]),
        expr_stmt(call(ident("use"), vec![ident("y")])),
    ]);
    let failure = project.bundle().unwrap_err();
    assert!(failure.has_code(codes::AMBIGUOUS_IMPORT));

    let mut reporter = Reporter::new(false, Arc::new(project.fs.clone()), ROOT);
    let rendered = reporter.render(&failure.errors);
    assert!(rendered.contains("src/index.js"), "{}", rendered);
    assert!(rendered.contains("error B2002"), "{}", rendered);
    assert_eq!(reporter.summary(&failure.errors), "1 error, 0 warnings");
}

#[test]
fn test_ambiguous_namespace_member_is_undefined() {
    let project = ambiguous(vec![
        import_star("./lib", "ns"),
        expr_stmt(call(ident("use"), vec![member(ident("ns"), "y")])),
    ]);
    let result = project.bundle().unwrap();
    assert!(
        result
            .warnings
            .iter()
            .any(|warning| warning.code == codes::UNDEFINED_NAMESPACE_MEMBER)
    );
    let text = result.output_text("index.js").unwrap();
    assert!(text.contains("use(void 0);"), "{}", text);
}

#[test]
fn test_missing_export_is_reported() {
    let failure = TestProject::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![import_named("./lib", &[("nope", "nope")]), log(ident("nope"))],
        )
        .module("src/lib.js", vec![export_const("yes", num(1.0))])
        .bundle()
        .unwrap_err();
    assert!(failure.has_code(codes::NO_MATCHING_EXPORT));
}

// =============================================================================
// Tree shaking
// =============================================================================

#[test]
fn test_side_effect_free_package_drops_unused_statements() {
    let project = TestProject::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![import_named("lib", &[("foo", "foo")]), log(ident("foo"))],
        )
        .file(
            "node_modules/lib/package.json",
            r#"{ "name": "lib", "sideEffects": false }"#,
        )
        .module(
            "node_modules/lib/index.js",
            vec![log(str_lit("hello")), export_const("foo", num(1.0))],
        );
    let text = project.output("index.js");
    assert!(!text.contains("\"hello\""), "{}", text);
    assert!(text.contains("const foo = 1;"), "{}", text);
    assert!(text.ends_with("console.log(foo);\n"), "{}", text);
}

#[test]
fn test_side_effect_globs_keep_matching_files() {
    let project = TestProject::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![import_bare("lib/setup.js"), import_bare("lib/quiet.js")],
        )
        .file(
            "node_modules/lib/package.json",
            r#"{ "name": "lib", "sideEffects": ["setup.js"] }"#,
        )
        .module("node_modules/lib/setup.js", vec![log(str_lit("setup"))])
        .module("node_modules/lib/quiet.js", vec![log(str_lit("quiet"))]);
    let text = project.output("index.js");
    assert!(text.contains("console.log(\"setup\");"), "{}", text);
    assert!(!text.contains("\"quiet\""), "{}", text);
}

#[test]
fn test_unused_exports_are_not_emitted() {
    let project = TestProject::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![import_named("./lib", &[("used", "used")]), log(ident("used"))],
        )
        .module(
            "src/lib.js",
            vec![export_const("used", num(1.0)), export_const("unused", num(2.0))],
        );
    let text = project.output("index.js");
    assert!(text.contains("const used = 1;"), "{}", text);
    assert!(!text.contains("unused"), "{}", text);
}

#[test]
fn test_optimized_barrel_skips_unimported_files() {
    let project = TestProject::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![
                import_named("eq", &[("A", "A"), ("B", "B")]),
                log(binary(BinaryOp::Add, ident("A"), ident("B"))),
            ],
        )
        .file("node_modules/eq/package.json", r#"{ "name": "eq", "main": "./index.js" }"#)
        .module(
            "node_modules/eq/index.js",
            vec![
                export_from("./a.js", &[("A", "A")]),
                export_from("./b.js", &[("B", "B")]),
                export_from("./c.js", &[("C", "C")]),
            ],
        )
        .module("node_modules/eq/a.js", vec![export_const("A", str_lit("aaa"))])
        .module("node_modules/eq/b.js", vec![export_const("B", str_lit("bbb"))])
        .file("node_modules/eq/c.js", "export const C = <<<;")
        .configure(|options| options.optimize_imports = vec!["eq".to_string()]);
    let text = project.output("index.js");
    assert!(text.contains("const A = \"aaa\";"), "{}", text);
    assert!(text.contains("const B = \"bbb\";"), "{}", text);
    assert!(text.ends_with("console.log(A + B);\n"), "{}", text);
}

// =============================================================================
// Formats
// =============================================================================

fn awaiting() -> TestProject {
    TestProject::new(&["src/index.js"])
        .module("src/index.js", vec![expr_stmt(await_expr(ident("ready")))])
}

#[test]
fn test_top_level_await_needs_esm() {
    let failure = awaiting()
        .configure(|options| options.format = Format::Iife)
        .bundle()
        .unwrap_err();
    assert!(failure.has_code(codes::TOP_LEVEL_AWAIT_FORMAT));

    let text = awaiting().output("index.js");
    assert!(text.contains("await ready;"), "{}", text);
}

#[test]
fn test_commonjs_output_of_esm_entry() {
    let text = TestProject::new(&["src/index.js"])
        .module("src/index.js", vec![export_const("answer", num(42.0))])
        .configure(|options| options.format = Format::Cjs)
        .output("index.js");
    assert!(text.contains("__export(src_exports, {"), "{}", text);
    assert!(text.ends_with("module.exports = __toCommonJS(src_exports);\n"), "{}", text);
}

#[test]
fn test_splitting_outside_esm_is_rejected() {
    let failure = awaiting()
        .configure(|options| {
            options.format = Format::Cjs;
            options.splitting = true;
        })
        .bundle()
        .unwrap_err();
    assert!(failure.has_code(codes::SPLITTING_REQUIRES_ESM));
}

// =============================================================================
// Build results
// =============================================================================

#[test]
fn test_write_and_metafile() {
    let project = TestProject::new(&["src/index.js"])
        .module(
            "src/index.js",
            vec![import_named("./lib", &[("a", "a")]), log(ident("a"))],
        )
        .module("src/lib.js", vec![export_const("a", num(1.0))])
        .configure(|options| options.metafile = true);
    let result = project.bundle().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let written = result.write_to(dir.path()).unwrap();
    assert_eq!(written.len(), 1);
    let on_disk = std::fs::read_to_string(&written[0]).unwrap();
    assert_eq!(Some(on_disk.as_str()), result.output_text("index.js"));

    let json = result.metafile.as_ref().unwrap().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["inputs"]["src/index.js"]["outputs"][0], "out/index.js");
    assert_eq!(value["outputs"]["out/index.js"]["entryPoint"], "src/index.js");
}

#[test]
fn test_missing_entry_point() {
    let failure = TestProject::new(&["src/missing.js"]).bundle().unwrap_err();
    assert_eq!(failure.errors.len(), 1);
    assert!(failure.has_code(codes::CANNOT_RESOLVE));
}
