//! Module IR.
//!
//! A small ESTree-shaped tree covering the constructs that matter for
//! linking: module syntax, top-level declarations, and enough of the
//! expression language to judge side effects, rewrite references and print
//! the result. The external parser produces it; the linker, tree shaker and
//! output generator consume and rewrite it.
//!
//! Submodules:
//! - `build` - terse constructors used by loaders, the linker and tests
//! - `visit` - scope-aware analysis and rewriting walkers

pub mod build;
pub mod visit;

use crate::span::Span;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

/// `import d, { a as b } from "x"` / `import * as ns from "x"` / `import "x"`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImportDecl {
    pub specifier: String,
    pub default: Option<String>,
    pub namespace: Option<String>,
    pub named: Vec<ImportSpecifier>,
    /// `import type ...`
    pub type_only: bool,
    pub span: Span,
    /// Index into the module's import records, filled in by the scanner
    pub record: Option<u32>,
}

impl ImportDecl {
    /// `import "x"` with no bindings at all
    pub fn is_bare(&self) -> bool {
        self.default.is_none() && self.namespace.is_none() && self.named.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImportSpecifier {
    pub imported: String,
    pub local: String,
    pub type_only: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportSpecifier {
    pub local: String,
    pub exported: String,
}

/// `export { a, b as c }` or `export { a } from "x"`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportNamed {
    pub specifiers: Vec<ExportSpecifier>,
    pub source: Option<String>,
    pub type_only: bool,
    pub span: Span,
    pub record: Option<u32>,
}

/// `export * from "x"` or `export * as ns from "x"`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportAll {
    pub source: String,
    pub alias: Option<String>,
    pub span: Span,
    pub record: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum DefaultValue {
    Expr(Expr),
    Function(Function),
    Class(Class),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VarDecl {
    pub kind: VarKind,
    pub decls: Vec<VarDeclarator>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VarDeclarator {
    pub binding: Pattern,
    pub init: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Function {
    pub name: Option<String>,
    pub params: Vec<Pattern>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub is_generator: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Arrow {
    pub params: Vec<Pattern>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Class {
    pub name: Option<String>,
    pub extends: Option<Box<Expr>>,
    pub members: Vec<ClassMember>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassMember {
    pub key: PropKey,
    pub is_static: bool,
    pub kind: ClassMemberKind,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ClassMemberKind {
    Method(Function),
    Property(Option<Expr>),
}

/// Binding patterns for declarations, parameters and catch clauses.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Pattern {
    Ident(String),
    Object {
        props: Vec<PatternProp>,
        rest: Option<String>,
    },
    Array(Vec<Option<Pattern>>),
    /// `pattern = default`
    Default(Box<Pattern>, Box<Expr>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatternProp {
    pub key: PropKey,
    pub value: Pattern,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum PropKey {
    Named(String),
    Computed(Expr),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Prop {
    KeyValue(PropKey, Expr),
    Spread(Expr),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Call {
    pub callee: Expr,
    pub args: Vec<Expr>,
    /// Comment immediately preceding the call, as written
    pub comment: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    OrAssign,
    AndAssign,
    NullishAssign,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::OrAssign => "||=",
            AssignOp::AndAssign => "&&=",
            AssignOp::NullishAssign => "??=",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Not,
    Minus,
    Plus,
    BitNot,
    Typeof,
    Void,
    Delete,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Minus => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::Typeof => "typeof ",
            UnaryOp::Void => "void ",
            UnaryOp::Delete => "delete ",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Nullish,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    In,
    InstanceOf,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Exp => "**",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Nullish => "??",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::In => "in",
            BinaryOp::InstanceOf => "instanceof",
        }
    }

    /// Binding power used by the printer; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Nullish => 1,
            BinaryOp::Or => 2,
            BinaryOp::And => 3,
            BinaryOp::BitOr => 4,
            BinaryOp::BitXor => 5,
            BinaryOp::BitAnd => 6,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 7,
            BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq
            | BinaryOp::In
            | BinaryOp::InstanceOf => 8,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 9,
            BinaryOp::Add | BinaryOp::Sub => 10,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 11,
            BinaryOp::Exp => 12,
        }
    }

    /// Operators that never run user code for primitive operands and never
    /// throw: comparisons and the short-circuit family.
    pub fn is_side_effect_free(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::StrictEq
                | BinaryOp::StrictNotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
                | BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Nullish
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Expr {
    Ident(String),
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Undefined,
    This,
    ImportMeta,
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Call>),
    New(Box<Call>),
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
    },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
    Await(Box<Expr>),
    Function(Box<Function>),
    Arrow(Box<Arrow>),
    Class(Box<Class>),
    Object(Vec<Prop>),
    Array(Vec<Expr>),
    /// `...expr` inside array literals and call arguments
    Spread(Box<Expr>),
    /// Template literal: `quasis.len() == exprs.len() + 1`
    Template(Vec<String>, Vec<Expr>),
    Seq(Vec<Expr>),
    /// `require("x")` with a string literal argument
    Require {
        specifier: String,
        record: Option<u32>,
    },
    /// `require.resolve("x")`
    RequireResolve {
        specifier: String,
        record: Option<u32>,
    },
    /// `import(arg)`; `record` is set when `arg` is a string literal
    DynamicImport {
        arg: Box<Expr>,
        record: Option<u32>,
    },
    /// `new URL("./x", import.meta.url)`
    UrlToken {
        specifier: String,
        record: Option<u32>,
    },
}

impl Expr {
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Str(_) | Expr::Num(_) | Expr::Bool(_) | Expr::Null | Expr::Undefined
        )
    }

    /// Truthiness of a constant expression, if statically known.
    pub fn static_truthiness(&self) -> Option<bool> {
        match self {
            Expr::Bool(b) => Some(*b),
            Expr::Num(n) => Some(*n != 0.0 && !n.is_nan()),
            Expr::Str(s) => Some(!s.is_empty()),
            Expr::Null | Expr::Undefined => Some(false),
            Expr::Unary(UnaryOp::Not, inner) => inner.static_truthiness().map(|b| !b),
            Expr::Unary(UnaryOp::Void, inner) if inner.is_literal() => Some(false),
            Expr::Object(_) | Expr::Array(_) | Expr::Function(_) | Expr::Arrow(_) => Some(true),
            _ => None,
        }
    }

    /// `a.b.c` as a dotted path, for `define` matching.
    pub fn dotted_path(&self) -> Option<String> {
        match self {
            Expr::Ident(name) => Some(name.clone()),
            Expr::This => Some("this".to_string()),
            Expr::ImportMeta => Some("import.meta".to_string()),
            Expr::Member(object, prop) => {
                let base = object.dotted_path()?;
                Some(format!("{}.{}", base, prop))
            }
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Stmt {
    Import(ImportDecl),
    ExportNamed(ExportNamed),
    ExportAll(ExportAll),
    /// `export <declaration>`
    ExportDecl(Box<Stmt>),
    /// `export default ...`
    ExportDefault(DefaultValue),
    Var(VarDecl),
    Function(Function),
    Class(Class),
    Expr(Expr),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    Return(Option<Expr>),
    Throw(Expr),
    ForOf {
        is_await: bool,
        kind: VarKind,
        binding: Pattern,
        right: Expr,
        body: Box<Stmt>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    Try {
        block: Vec<Stmt>,
        param: Option<Pattern>,
        handler: Option<Vec<Stmt>>,
        finalizer: Option<Vec<Stmt>>,
    },
    /// TypeScript-only declaration (interface, type alias, `declare`), erased
    TypeOnly,
    Empty,
}

impl Stmt {
    /// Names declared at the level this statement appears in. `var`
    /// declarations nested in blocks hoist out and are included.
    pub fn declared_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_declared(self, &mut names, true);
        names
    }

    /// Replace `if` statements with a constant, side-effect-free test by
    /// the branch that runs. A dropped branch leaves its hoisted `var`
    /// names behind as bare declarations. `None` when nothing is left.
    pub fn fold_constant_branches(self) -> Option<Stmt> {
        match self {
            Stmt::If {
                test,
                consequent,
                alternate,
            } => match constant_test(&test) {
                Some(true) => {
                    let taken = fold_branch(*consequent);
                    with_hoisted_vars(taken, alternate.as_deref())
                }
                Some(false) => {
                    let taken = alternate.and_then(|alternate| fold_branch(*alternate));
                    with_hoisted_vars(taken, Some(consequent.as_ref()))
                }
                None => Some(Stmt::If {
                    test,
                    consequent: Box::new((*consequent).fold_constant_branches().unwrap_or(Stmt::Empty)),
                    alternate: alternate
                        .and_then(|alternate| (*alternate).fold_constant_branches())
                        .map(Box::new),
                }),
            },
            Stmt::Block(body) => Some(Stmt::Block(
                body.into_iter()
                    .filter_map(Stmt::fold_constant_branches)
                    .collect(),
            )),
            other => Some(other),
        }
    }
}

fn constant_test(test: &Expr) -> Option<bool> {
    match test {
        // Literals that may hold calls
        Expr::Object(_) | Expr::Array(_) => None,
        Expr::Unary(UnaryOp::Not, inner) => constant_test(inner).map(|b| !b),
        other => other.static_truthiness(),
    }
}

/// A branch promoted to statement level keeps its own block scope.
fn fold_branch(stmt: Stmt) -> Option<Stmt> {
    match stmt.fold_constant_branches()? {
        stmt @ (Stmt::Function(_) | Stmt::Class(_)) => Some(Stmt::Block(vec![stmt])),
        Stmt::Var(decl) if decl.kind != VarKind::Var => Some(Stmt::Block(vec![Stmt::Var(decl)])),
        stmt => Some(stmt),
    }
}

fn with_hoisted_vars(taken: Option<Stmt>, dropped: Option<&Stmt>) -> Option<Stmt> {
    let mut names = Vec::new();
    if let Some(dropped) = dropped {
        collect_declared(dropped, &mut names, false);
    }
    if names.is_empty() {
        return taken;
    }
    let hoisted = Stmt::Var(VarDecl {
        kind: VarKind::Var,
        decls: names
            .into_iter()
            .map(|name| VarDeclarator {
                binding: Pattern::Ident(name),
                init: None,
            })
            .collect(),
    });
    Some(match taken {
        Some(taken) => Stmt::Block(vec![hoisted, taken]),
        None => hoisted,
    })
}

fn collect_declared(stmt: &Stmt, names: &mut Vec<String>, direct: bool) {
    match stmt {
        Stmt::Var(decl) => {
            if direct || decl.kind == VarKind::Var {
                for declarator in &decl.decls {
                    pattern_names(&declarator.binding, names);
                }
            }
        }
        Stmt::Function(function) if direct => {
            if let Some(name) = &function.name {
                names.push(name.clone());
            }
        }
        Stmt::Class(class) if direct => {
            if let Some(name) = &class.name {
                names.push(name.clone());
            }
        }
        Stmt::ExportDecl(inner) => collect_declared(inner, names, direct),
        Stmt::ExportDefault(DefaultValue::Function(Function {
            name: Some(name), ..
        }))
        | Stmt::ExportDefault(DefaultValue::Class(Class {
            name: Some(name), ..
        })) if direct => names.push(name.clone()),
        Stmt::Import(import) if direct && !import.type_only => {
            if let Some(default) = &import.default {
                names.push(default.clone());
            }
            if let Some(namespace) = &import.namespace {
                names.push(namespace.clone());
            }
            for spec in &import.named {
                if !spec.type_only {
                    names.push(spec.local.clone());
                }
            }
        }
        Stmt::If {
            consequent,
            alternate,
            ..
        } => {
            collect_declared(consequent, names, false);
            if let Some(alternate) = alternate {
                collect_declared(alternate, names, false);
            }
        }
        Stmt::Block(body) => {
            for stmt in body {
                collect_declared(stmt, names, false);
            }
        }
        Stmt::ForOf {
            kind, binding, body, ..
        } => {
            if *kind == VarKind::Var {
                pattern_names(binding, names);
            }
            collect_declared(body, names, false);
        }
        Stmt::While { body, .. } => collect_declared(body, names, false),
        Stmt::Try {
            block,
            handler,
            finalizer,
            ..
        } => {
            for stmt in block
                .iter()
                .chain(handler.iter().flatten())
                .chain(finalizer.iter().flatten())
            {
                collect_declared(stmt, names, false);
            }
        }
        _ => {}
    }
}

/// Identifiers bound by a pattern, in source order.
pub fn pattern_names(pattern: &Pattern, names: &mut Vec<String>) {
    match pattern {
        Pattern::Ident(name) => names.push(name.clone()),
        Pattern::Object { props, rest } => {
            for prop in props {
                pattern_names(&prop.value, names);
            }
            if let Some(rest) = rest {
                names.push(rest.clone());
            }
        }
        Pattern::Array(items) => {
            for item in items.iter().flatten() {
                pattern_names(item, names);
            }
        }
        Pattern::Default(inner, _) => pattern_names(inner, names),
    }
}

/// Reserved words that can never be used as binding names.
pub const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let",
    "new", "null", "package", "private", "protected", "public", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Whether `name` is a valid, non-reserved JavaScript identifier.
pub fn is_identifier(name: &str) -> bool {
    is_identifier_name(name) && !RESERVED_WORDS.contains(&name)
}

/// Identifier syntax without the reserved-word check: what may follow a
/// `.` in a member expression, so `x.default` is fine.
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first == '_' || first == '$' || first.is_alphabetic()) {
        return false;
    }
    chars.all(|c| c == '_' || c == '$' || c.is_alphanumeric())
}

/// A legal identifier derived from a file stem: `foo-bar.js` → `foo_bar`.
pub fn identifier_from_stem(stem: &str) -> String {
    let mut out: String = stem
        .chars()
        .map(|c| if c == '_' || c == '$' || c.is_alphanumeric() { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if RESERVED_WORDS.contains(&out.as_str()) {
        out.insert(0, '_');
    }
    out
}
