//! Tests for the IR printer
//!
//! Sections:
//! - Statements
//! - Module syntax
//! - Precedence and parentheses
//! - Literals

use super::*;
use crate::ast::build::*;
use crate::ast::{BinaryOp, Pattern, PatternProp, VarKind};

// =============================================================================
// Statements
// =============================================================================

#[test]
fn test_function_declaration() {
    let stmt = function_decl("fn", &[], vec![ret(num(123.0))]);
    assert_eq!(print_stmts(&[stmt]), "function fn() {\n  return 123;\n}\n");
}

#[test]
fn test_nested_blocks_indent() {
    let stmt = if_stmt(
        ident("a"),
        block(vec![expr_stmt(call(ident("f"), vec![]))]),
        Some(block(vec![throw(new_expr(ident("Error"), vec![str_lit("x")]))])),
    );
    assert_eq!(
        print_stmts(&[stmt]),
        "if (a) {\n  f();\n} else {\n  throw new Error(\"x\");\n}\n"
    );
}

#[test]
fn test_destructuring_declaration() {
    let stmt = Stmt::Var(crate::ast::VarDecl {
        kind: VarKind::Let,
        decls: vec![crate::ast::VarDeclarator {
            binding: Pattern::Object {
                props: vec![
                    PatternProp {
                        key: PropKey::Named("a".to_string()),
                        value: Pattern::Ident("a".to_string()),
                    },
                    PatternProp {
                        key: PropKey::Named("b".to_string()),
                        value: Pattern::Ident("c".to_string()),
                    },
                ],
                rest: Some("rest".to_string()),
            },
            init: Some(ident("obj")),
        }],
    });
    assert_eq!(print_stmts(&[stmt]), "let { a, b: c, ...rest } = obj;\n");
}

#[test]
fn test_try_catch_without_param() {
    let stmt = Stmt::Try {
        block: vec![expr_stmt(call(ident("f"), vec![]))],
        param: None,
        handler: Some(vec![]),
        finalizer: None,
    };
    assert_eq!(print_stmts(&[stmt]), "try {\n  f();\n} catch {}\n");
}

#[test]
fn test_erased_statements_print_nothing() {
    assert_eq!(print_stmts(&[Stmt::TypeOnly, Stmt::Empty]), "");
}

// =============================================================================
// Module syntax
// =============================================================================

#[test]
fn test_import_forms() {
    assert_eq!(print_stmts(&[import_bare("x")]), "import \"x\";\n");
    assert_eq!(
        print_stmts(&[import_named("x", &[("a", "a"), ("default", "b")])]),
        "import { a, default as b } from \"x\";\n"
    );
    assert_eq!(
        print_stmts(&[import_star("x", "ns")]),
        "import * as ns from \"x\";\n"
    );
}

#[test]
fn test_export_forms() {
    assert_eq!(
        print_stmts(&[export_named(&[("a", "a"), ("b", "default")])]),
        "export { a, b as default };\n"
    );
    assert_eq!(print_stmts(&[export_named(&[])]), "export {};\n");
    assert_eq!(print_stmts(&[export_all("./a")]), "export * from \"./a\";\n");
    assert_eq!(
        print_stmts(&[export_all_as("./a", "ns")]),
        "export * as ns from \"./a\";\n"
    );
    assert_eq!(
        print_stmts(&[export_const("x", num(1.0))]),
        "export const x = 1;\n"
    );
}

// =============================================================================
// Precedence and parentheses
// =============================================================================

#[test]
fn test_binary_precedence() {
    let sum_times = binary(
        BinaryOp::Mul,
        binary(BinaryOp::Add, ident("a"), ident("b")),
        ident("c"),
    );
    assert_eq!(print_expr(&sum_times), "(a + b) * c");

    let left_assoc = binary(
        BinaryOp::Sub,
        ident("a"),
        binary(BinaryOp::Sub, ident("b"), ident("c")),
    );
    assert_eq!(print_expr(&left_assoc), "a - (b - c)");

    let power = binary(
        BinaryOp::Exp,
        ident("a"),
        binary(BinaryOp::Exp, ident("b"), ident("c")),
    );
    assert_eq!(print_expr(&power), "a ** b ** c");
}

#[test]
fn test_nullish_never_mixes_with_logical_operators() {
    let expr = binary(
        BinaryOp::Nullish,
        binary(BinaryOp::Or, ident("a"), ident("b")),
        ident("c"),
    );
    assert_eq!(print_expr(&expr), "(a || b) ?? c");
}

#[test]
fn test_statement_cannot_start_with_function_or_object() {
    let iife = call(function_expr(None, &[], vec![]), vec![]);
    assert_eq!(print_stmts(&[expr_stmt(iife)]), "(function() {}());\n");

    let object_member = member(object(vec![("a", num(1.0))]), "a");
    assert_eq!(print_stmts(&[expr_stmt(object_member)]), "({ a: 1 }.a);\n");
}

#[test]
fn test_arrow_bodies() {
    assert_eq!(print_expr(&arrow(&["a"], ident("a"))), "(a) => a");
    assert_eq!(print_expr(&arrow(&[], object(vec![]))), "() => ({})");
    assert_eq!(
        print_expr(&call(arrow(&[], ident("x")), vec![])),
        "(() => x)()"
    );
}

#[test]
fn test_pure_annotation_is_kept() {
    let expr = pure_call(ident("f"), vec![num(1.0)]);
    assert_eq!(print_expr(&expr), "/* @__PURE__ */ f(1)");
}

#[test]
fn test_unary_signs_do_not_fuse() {
    let expr = unary(UnaryOp::Minus, unary(UnaryOp::Minus, ident("x")));
    assert_eq!(print_expr(&expr), "- -x");
    assert_eq!(print_expr(&unary(UnaryOp::Not, ident("x"))), "!x");
    assert_eq!(print_expr(&unary(UnaryOp::Typeof, ident("x"))), "typeof x");
}

#[test]
fn test_new_with_call_callee() {
    let expr = new_expr(call(ident("f"), vec![]), vec![]);
    assert_eq!(print_expr(&expr), "new (f())()");
}

// =============================================================================
// Literals
// =============================================================================

#[test]
fn test_numbers() {
    assert_eq!(format_number(123.0), "123");
    assert_eq!(format_number(0.5), "0.5");
    assert_eq!(format_number(-0.0), "-0");
    assert_eq!(format_number(f64::NAN), "NaN");
    assert_eq!(print_expr(&member(num(1.0), "toFixed")), "(1).toFixed");
}

#[test]
fn test_strings_are_escaped() {
    assert_eq!(quote_string("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
    assert_eq!(quote_string("\u{1}"), "\"\\x01\"");
}

#[test]
fn test_objects() {
    let short = object(vec![("a", num(1.0)), ("b", ident("b"))]);
    assert_eq!(print_expr(&short), "{ a: 1, b }");

    let with_arrows = object(vec![("a", arrow(&[], ident("a")))]);
    assert_eq!(print_expr(&with_arrows), "{\n  a: () => a\n}");

    let quoted = object(vec![("my-key", num(1.0)), ("default", num(2.0))]);
    assert_eq!(print_expr(&quoted), "{ \"my-key\": 1, default: 2 }");

    let method = object(vec![("run", function_expr(None, &[], vec![]))]);
    assert_eq!(print_expr(&method), "{\n  run() {}\n}");
}

#[test]
fn test_undefined_prints_as_void_zero() {
    assert_eq!(print_expr(&Expr::Undefined), "void 0");
    assert_eq!(print_expr(&member(Expr::Undefined, "x")), "(void 0).x");
}
