//! Constructors for IR nodes.
//!
//! Generated code (runtime glue, interop wrappers, loader output) and test
//! fixtures are assembled from these instead of spelling out boxed enum
//! variants by hand.

use super::*;

pub fn ident(name: &str) -> Expr {
    Expr::Ident(name.to_string())
}

pub fn str_lit(value: &str) -> Expr {
    Expr::Str(value.to_string())
}

pub fn num(value: f64) -> Expr {
    Expr::Num(value)
}

pub fn bool_lit(value: bool) -> Expr {
    Expr::Bool(value)
}

pub fn member(object: Expr, prop: &str) -> Expr {
    Expr::Member(Box::new(object), prop.to_string())
}

pub fn index(object: Expr, key: Expr) -> Expr {
    Expr::Index(Box::new(object), Box::new(key))
}

/// Property read that uses dot syntax when `name` allows it.
pub fn property(object: Expr, name: &str) -> Expr {
    if is_identifier_name(name) {
        member(object, name)
    } else {
        index(object, str_lit(name))
    }
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call(Box::new(Call {
        callee,
        args,
        comment: None,
    }))
}

/// A call preceded by a `/* @__PURE__ */` annotation.
pub fn pure_call(callee: Expr, args: Vec<Expr>) -> Expr {
    annotated_call(callee, args, "/* @__PURE__ */")
}

pub fn annotated_call(callee: Expr, args: Vec<Expr>, comment: &str) -> Expr {
    Expr::Call(Box::new(Call {
        callee,
        args,
        comment: Some(comment.to_string()),
    }))
}

pub fn method_call(object: Expr, method: &str, args: Vec<Expr>) -> Expr {
    call(member(object, method), args)
}

pub fn new_expr(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::New(Box::new(Call {
        callee,
        args,
        comment: None,
    }))
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    Expr::Assign {
        op: AssignOp::Assign,
        target: Box::new(target),
        value: Box::new(value),
    }
}

pub fn update(op: UpdateOp, target: Expr) -> Expr {
    Expr::Update {
        op,
        prefix: false,
        target: Box::new(target),
    }
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::Unary(op, Box::new(operand))
}

pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary(op, Box::new(left), Box::new(right))
}

pub fn cond(test: Expr, consequent: Expr, alternate: Expr) -> Expr {
    Expr::Cond(Box::new(test), Box::new(consequent), Box::new(alternate))
}

pub fn await_expr(arg: Expr) -> Expr {
    Expr::Await(Box::new(arg))
}

/// `(params) => body` with an expression body.
pub fn arrow(params: &[&str], body: Expr) -> Expr {
    arrow_block(params, vec![Stmt::Return(Some(body))])
}

pub fn arrow_block(params: &[&str], body: Vec<Stmt>) -> Expr {
    Expr::Arrow(Box::new(Arrow {
        params: params.iter().map(|p| Pattern::Ident(p.to_string())).collect(),
        body,
        is_async: false,
    }))
}

pub fn function_expr(name: Option<&str>, params: &[&str], body: Vec<Stmt>) -> Expr {
    Expr::Function(Box::new(function(name, params, body)))
}

pub fn function(name: Option<&str>, params: &[&str], body: Vec<Stmt>) -> Function {
    Function {
        name: name.map(|n| n.to_string()),
        params: params.iter().map(|p| Pattern::Ident(p.to_string())).collect(),
        body,
        is_async: false,
        is_generator: false,
    }
}

pub fn object(props: Vec<(&str, Expr)>) -> Expr {
    Expr::Object(
        props
            .into_iter()
            .map(|(key, value)| Prop::KeyValue(PropKey::Named(key.to_string()), value))
            .collect(),
    )
}

pub fn array(items: Vec<Expr>) -> Expr {
    Expr::Array(items)
}

pub fn require(specifier: &str) -> Expr {
    Expr::Require {
        specifier: specifier.to_string(),
        record: None,
    }
}

pub fn dynamic_import(specifier: &str) -> Expr {
    Expr::DynamicImport {
        arg: Box::new(str_lit(specifier)),
        record: None,
    }
}

// =============================================================================
// Statements
// =============================================================================

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr(expr)
}

pub fn var_decl(kind: VarKind, name: &str, init: Option<Expr>) -> Stmt {
    Stmt::Var(VarDecl {
        kind,
        decls: vec![VarDeclarator {
            binding: Pattern::Ident(name.to_string()),
            init,
        }],
    })
}

pub fn const_decl(name: &str, init: Expr) -> Stmt {
    var_decl(VarKind::Const, name, Some(init))
}

pub fn function_decl(name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
    Stmt::Function(function(Some(name), params, body))
}

pub fn class_decl(name: &str, extends: Option<Expr>, members: Vec<ClassMember>) -> Stmt {
    Stmt::Class(Class {
        name: Some(name.to_string()),
        extends: extends.map(Box::new),
        members,
    })
}

pub fn if_stmt(test: Expr, consequent: Stmt, alternate: Option<Stmt>) -> Stmt {
    Stmt::If {
        test,
        consequent: Box::new(consequent),
        alternate: alternate.map(Box::new),
    }
}

pub fn block(body: Vec<Stmt>) -> Stmt {
    Stmt::Block(body)
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return(Some(value))
}

pub fn throw(value: Expr) -> Stmt {
    Stmt::Throw(value)
}

// =============================================================================
// Module syntax
// =============================================================================

fn import(specifier: &str) -> ImportDecl {
    ImportDecl {
        specifier: specifier.to_string(),
        default: None,
        namespace: None,
        named: Vec::new(),
        type_only: false,
        span: Span::dummy(),
        record: None,
    }
}

/// `import "x"`
pub fn import_bare(specifier: &str) -> Stmt {
    Stmt::Import(import(specifier))
}

/// `import { imported as local, ... } from "x"`
pub fn import_named(specifier: &str, names: &[(&str, &str)]) -> Stmt {
    let mut decl = import(specifier);
    decl.named = names
        .iter()
        .map(|(imported, local)| ImportSpecifier {
            imported: imported.to_string(),
            local: local.to_string(),
            type_only: false,
        })
        .collect();
    Stmt::Import(decl)
}

/// `import local from "x"`
pub fn import_default(specifier: &str, local: &str) -> Stmt {
    let mut decl = import(specifier);
    decl.default = Some(local.to_string());
    Stmt::Import(decl)
}

/// `import * as local from "x"`
pub fn import_star(specifier: &str, local: &str) -> Stmt {
    let mut decl = import(specifier);
    decl.namespace = Some(local.to_string());
    Stmt::Import(decl)
}

/// `export { local as exported, ... }`
pub fn export_named(names: &[(&str, &str)]) -> Stmt {
    Stmt::ExportNamed(ExportNamed {
        specifiers: export_specifiers(names),
        source: None,
        type_only: false,
        span: Span::dummy(),
        record: None,
    })
}

/// `export { imported as exported, ... } from "x"`
pub fn export_from(specifier: &str, names: &[(&str, &str)]) -> Stmt {
    Stmt::ExportNamed(ExportNamed {
        specifiers: export_specifiers(names),
        source: Some(specifier.to_string()),
        type_only: false,
        span: Span::dummy(),
        record: None,
    })
}

fn export_specifiers(names: &[(&str, &str)]) -> Vec<ExportSpecifier> {
    names
        .iter()
        .map(|(local, exported)| ExportSpecifier {
            local: local.to_string(),
            exported: exported.to_string(),
        })
        .collect()
}

/// `export * from "x"`
pub fn export_all(specifier: &str) -> Stmt {
    Stmt::ExportAll(ExportAll {
        source: specifier.to_string(),
        alias: None,
        span: Span::dummy(),
        record: None,
    })
}

/// `export * as alias from "x"`
pub fn export_all_as(specifier: &str, alias: &str) -> Stmt {
    Stmt::ExportAll(ExportAll {
        source: specifier.to_string(),
        alias: Some(alias.to_string()),
        span: Span::dummy(),
        record: None,
    })
}

pub fn export_decl(decl: Stmt) -> Stmt {
    Stmt::ExportDecl(Box::new(decl))
}

/// `export const name = init`
pub fn export_const(name: &str, init: Expr) -> Stmt {
    export_decl(const_decl(name, init))
}

pub fn export_default_expr(value: Expr) -> Stmt {
    Stmt::ExportDefault(DefaultValue::Expr(value))
}

pub fn export_default_function(name: Option<&str>, params: &[&str], body: Vec<Stmt>) -> Stmt {
    Stmt::ExportDefault(DefaultValue::Function(function(name, params, body)))
}

/// `module.exports = value`
pub fn module_exports_assign(value: Expr) -> Stmt {
    expr_stmt(assign(member(ident("module"), "exports"), value))
}

/// `exports.name = value`
pub fn exports_assign(name: &str, value: Expr) -> Stmt {
    expr_stmt(assign(member(ident("exports"), name), value))
}
