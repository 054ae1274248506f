//! Syntax-level side-effect policy.
//!
//! Decides whether evaluating a top-level statement could be observed if it
//! were removed. The policy is fixed and conservative:
//! - impure: assignment, `++`/`--`, `delete`, calls and `new` (unless
//!   annotated pure), `throw`, `await`, `require`/`import()`, property
//!   access, `in`/`instanceof`, arithmetic on non-literals, spreads,
//!   destructuring, loops and top-level `return`
//! - pure: literals, identifiers, functions, comparison and logical
//!   operators, `typeof`/`void`/`!`, and containers of pure values
//!
//! An `if` with a constant test only considers the branch that runs.

use crate::annotations::is_pure_annotation;
use crate::ast::{
    BinaryOp, Call, Class, ClassMemberKind, DefaultValue, Expr, Pattern, Prop, PropKey, Stmt,
    UnaryOp,
};

/// Knobs for the purity policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct PurityOptions {
    /// Treat `@__PURE__` comments as absent
    pub ignore_annotations: bool,
}

pub fn stmt_has_side_effects(stmt: &Stmt, options: PurityOptions) -> bool {
    match stmt {
        Stmt::Import(_) | Stmt::ExportNamed(_) | Stmt::ExportAll(_) => false,
        Stmt::TypeOnly | Stmt::Empty | Stmt::Function(_) => false,
        Stmt::ExportDecl(inner) => stmt_has_side_effects(inner, options),
        Stmt::ExportDefault(value) => match value {
            DefaultValue::Expr(expr) => expr_has_side_effects(expr, options),
            DefaultValue::Function(_) => false,
            DefaultValue::Class(class) => class_has_side_effects(class, options),
        },
        Stmt::Var(decl) => decl.decls.iter().any(|declarator| {
            !matches!(declarator.binding, Pattern::Ident(_))
                || declarator
                    .init
                    .as_ref()
                    .is_some_and(|init| expr_has_side_effects(init, options))
        }),
        Stmt::Class(class) => class_has_side_effects(class, options),
        Stmt::Expr(expr) => expr_has_side_effects(expr, options),
        Stmt::If {
            test,
            consequent,
            alternate,
        } => match test.static_truthiness() {
            Some(true) => stmt_has_side_effects(consequent, options),
            Some(false) => alternate
                .as_ref()
                .is_some_and(|alternate| stmt_has_side_effects(alternate, options)),
            None => {
                expr_has_side_effects(test, options)
                    || stmt_has_side_effects(consequent, options)
                    || alternate
                        .as_ref()
                        .is_some_and(|alternate| stmt_has_side_effects(alternate, options))
            }
        },
        Stmt::Block(body) => body.iter().any(|stmt| stmt_has_side_effects(stmt, options)),
        Stmt::Try {
            block,
            handler,
            finalizer,
            ..
        } => block
            .iter()
            .chain(handler.iter().flatten())
            .chain(finalizer.iter().flatten())
            .any(|stmt| stmt_has_side_effects(stmt, options)),
        Stmt::Return(_) | Stmt::Throw(_) | Stmt::ForOf { .. } | Stmt::While { .. } => true,
    }
}

pub fn expr_has_side_effects(expr: &Expr, options: PurityOptions) -> bool {
    match expr {
        Expr::Ident(_)
        | Expr::Str(_)
        | Expr::Num(_)
        | Expr::Bool(_)
        | Expr::Null
        | Expr::Undefined
        | Expr::This
        | Expr::ImportMeta
        | Expr::Function(_)
        | Expr::Arrow(_) => false,
        Expr::Member(..) | Expr::Index(..) => true,
        Expr::Call(call) | Expr::New(call) => call_has_side_effects(call, options),
        Expr::Assign { .. } | Expr::Update { .. } | Expr::Await(_) | Expr::Spread(_) => true,
        Expr::Require { .. }
        | Expr::RequireResolve { .. }
        | Expr::DynamicImport { .. }
        | Expr::UrlToken { .. } => true,
        Expr::Unary(op, operand) => match op {
            UnaryOp::Delete => true,
            UnaryOp::Typeof if matches!(operand.as_ref(), Expr::Ident(_)) => false,
            _ => expr_has_side_effects(operand, options),
        },
        Expr::Binary(op, left, right) => {
            if op.is_side_effect_free() {
                expr_has_side_effects(left, options) || expr_has_side_effects(right, options)
            } else if matches!(op, BinaryOp::In | BinaryOp::InstanceOf) {
                true
            } else {
                // Arithmetic may call `valueOf`/`toString` on objects.
                !(left.is_literal() && right.is_literal())
            }
        }
        Expr::Cond(test, consequent, alternate) => match test.static_truthiness() {
            Some(true) => expr_has_side_effects(consequent, options),
            Some(false) => expr_has_side_effects(alternate, options),
            None => {
                expr_has_side_effects(test, options)
                    || expr_has_side_effects(consequent, options)
                    || expr_has_side_effects(alternate, options)
            }
        },
        Expr::Class(class) => class_has_side_effects(class, options),
        Expr::Object(props) => props.iter().any(|prop| match prop {
            Prop::Spread(_) => true,
            Prop::KeyValue(key, value) => {
                matches!(key, PropKey::Computed(key) if expr_has_side_effects(key, options))
                    || expr_has_side_effects(value, options)
            }
        }),
        Expr::Array(items) | Expr::Seq(items) | Expr::Template(_, items) => {
            items.iter().any(|item| expr_has_side_effects(item, options))
        }
    }
}

/// A pure-annotated call is removable when its arguments are; the callee
/// itself is covered by the annotation.
fn call_has_side_effects(call: &Call, options: PurityOptions) -> bool {
    let annotated = !options.ignore_annotations
        && call.comment.as_deref().is_some_and(is_pure_annotation);
    if !annotated {
        return true;
    }
    call.args.iter().any(|arg| expr_has_side_effects(arg, options))
}

fn class_has_side_effects(class: &Class, options: PurityOptions) -> bool {
    if class.extends.is_some() {
        return true;
    }
    class.members.iter().any(|member| {
        let key_effects = matches!(&member.key, PropKey::Computed(key) if expr_has_side_effects(key, options));
        let value_effects = member.is_static
            && matches!(&member.kind, ClassMemberKind::Property(Some(value)) if expr_has_side_effects(value, options));
        key_effects || value_effects
    })
}
