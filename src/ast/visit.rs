//! Scope-aware walkers over the IR.
//!
//! Two traversals share one scope model:
//! - [`collect_references`] gathers what a top-level statement reads and
//!   writes from module scope (free identifiers, `this`, `import.meta`).
//! - [`rewrite_stmts`] lets a [`Rewriter`] replace free references and
//!   rename module-scope bindings in place.
//!
//! "Free" means not bound by any scope inside the statement. Module-scope
//! declarations are deliberately not a scope here, so references to other
//! top-level declarations come out as free.

use super::*;
use indexmap::IndexSet;
use rustc_hash::FxHashSet;

#[derive(Debug, Default)]
struct ScopeStack {
    scopes: Vec<FxHashSet<String>>,
    /// Non-arrow functions and class bodies entered
    this_depth: usize,
    /// Functions and arrows entered (for `await`)
    function_depth: usize,
    try_depth: usize,
}

impl ScopeStack {
    fn push(&mut self, names: impl IntoIterator<Item = String>) {
        self.scopes.push(names.into_iter().collect());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    fn is_bound(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }
}

/// Names scoped to a block: `let`, `const`, `class` and function declarations.
fn block_scoped_names(stmts: &[Stmt]) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in stmts {
        match stmt {
            Stmt::Var(decl) if decl.kind != VarKind::Var => {
                for declarator in &decl.decls {
                    pattern_names(&declarator.binding, &mut names);
                }
            }
            Stmt::Function(Function { name: Some(name), .. })
            | Stmt::Class(Class { name: Some(name), .. }) => names.push(name.clone()),
            _ => {}
        }
    }
    names
}

/// Names bound in a function body scope: parameters, hoisted `var`s and
/// direct declarations.
fn function_scope_names(params: &[Pattern], body: &[Stmt], is_arrow: bool) -> Vec<String> {
    let mut names = Vec::new();
    for param in params {
        pattern_names(param, &mut names);
    }
    for stmt in body {
        names.extend(stmt.declared_names());
    }
    if !is_arrow {
        names.push("arguments".to_string());
    }
    names
}

// =============================================================================
// Reference collection
// =============================================================================

/// What a statement needs from module scope.
#[derive(Debug, Default, Clone)]
pub struct References {
    /// Free identifiers in first-use order
    pub free: IndexSet<String>,
    /// Free identifiers assigned to, with whether the write is inside `try`
    pub writes: Vec<(String, bool)>,
    /// `(object, property)` for member reads on free identifiers
    pub free_members: Vec<(String, String)>,
    /// Free identifiers used other than as the object of a member access
    pub value_refs: FxHashSet<String>,
    /// Every name bound in a scope nested inside the statement
    pub nested: FxHashSet<String>,
    /// `this` outside of any function or class body
    pub top_level_this: bool,
    pub import_meta: bool,
    /// `await` outside of any function, or `for await`
    pub top_level_await: bool,
}

/// Collect references of `stmts` evaluated at module scope.
pub fn collect_references(stmts: &[Stmt]) -> References {
    let mut collector = Collector::default();
    for stmt in stmts {
        collector.stmt(stmt);
    }
    collector.refs
}

/// Collect references of a single expression evaluated at module scope.
pub fn collect_expr_references(expr: &Expr) -> References {
    let mut collector = Collector::default();
    collector.expr(expr);
    collector.refs
}

#[derive(Default)]
struct Collector {
    scope: ScopeStack,
    refs: References,
}

impl Collector {
    fn enter(&mut self, names: Vec<String>) {
        self.refs.nested.extend(names.iter().cloned());
        self.scope.push(names);
    }

    fn reference(&mut self, name: &str) {
        if !self.scope.is_bound(name) {
            self.refs.free.insert(name.to_string());
            self.refs.value_refs.insert(name.to_string());
        }
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn block(&mut self, stmts: &[Stmt]) {
        self.enter(block_scoped_names(stmts));
        self.stmts(stmts);
        self.scope.pop();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Import(_) | Stmt::ExportAll(_) | Stmt::TypeOnly | Stmt::Empty => {}
            Stmt::ExportNamed(export) => {
                if export.source.is_none() && !export.type_only {
                    for spec in &export.specifiers {
                        self.reference(&spec.local);
                    }
                }
            }
            Stmt::ExportDecl(inner) => self.stmt(inner),
            Stmt::ExportDefault(value) => match value {
                DefaultValue::Expr(expr) => self.expr(expr),
                DefaultValue::Function(function) => self.function(function, false),
                DefaultValue::Class(class) => self.class(class, false),
            },
            Stmt::Var(decl) => {
                for declarator in &decl.decls {
                    self.pattern(&declarator.binding);
                    if let Some(init) = &declarator.init {
                        self.expr(init);
                    }
                }
            }
            Stmt::Function(function) => self.function(function, false),
            Stmt::Class(class) => self.class(class, false),
            Stmt::Expr(expr) | Stmt::Throw(expr) => self.expr(expr),
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test);
                self.stmt(consequent);
                if let Some(alternate) = alternate {
                    self.stmt(alternate);
                }
            }
            Stmt::Block(body) => self.block(body),
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            Stmt::ForOf {
                is_await,
                kind,
                binding,
                right,
                body,
            } => {
                if *is_await && self.scope.function_depth == 0 {
                    self.refs.top_level_await = true;
                }
                self.expr(right);
                let mut names = Vec::new();
                if *kind != VarKind::Var {
                    pattern_names(binding, &mut names);
                }
                self.enter(names);
                self.pattern(binding);
                self.stmt(body);
                self.scope.pop();
            }
            Stmt::While { test, body } => {
                self.expr(test);
                self.stmt(body);
            }
            Stmt::Try {
                block,
                param,
                handler,
                finalizer,
            } => {
                self.scope.try_depth += 1;
                self.block(block);
                self.scope.try_depth -= 1;
                if let Some(handler) = handler {
                    let mut names = block_scoped_names(handler);
                    if let Some(param) = param {
                        pattern_names(param, &mut names);
                    }
                    self.enter(names);
                    if let Some(param) = param {
                        self.pattern(param);
                    }
                    self.stmts(handler);
                    self.scope.pop();
                }
                if let Some(finalizer) = finalizer {
                    self.block(finalizer);
                }
            }
        }
    }

    /// Patterns only contribute references through defaults and computed keys.
    fn pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Ident(_) => {}
            Pattern::Object { props, .. } => {
                for prop in props {
                    if let PropKey::Computed(key) = &prop.key {
                        self.expr(key);
                    }
                    self.pattern(&prop.value);
                }
            }
            Pattern::Array(items) => {
                for item in items.iter().flatten() {
                    self.pattern(item);
                }
            }
            Pattern::Default(inner, default) => {
                self.pattern(inner);
                self.expr(default);
            }
        }
    }

    fn function(&mut self, function: &Function, is_expression: bool) {
        let mut names = function_scope_names(&function.params, &function.body, false);
        if is_expression && let Some(name) = &function.name {
            names.push(name.clone());
        }
        self.enter(names);
        self.scope.this_depth += 1;
        self.scope.function_depth += 1;
        for param in &function.params {
            self.pattern(param);
        }
        self.stmts(&function.body);
        self.scope.function_depth -= 1;
        self.scope.this_depth -= 1;
        self.scope.pop();
    }

    fn arrow(&mut self, arrow: &Arrow) {
        self.enter(function_scope_names(&arrow.params, &arrow.body, true));
        self.scope.function_depth += 1;
        for param in &arrow.params {
            self.pattern(param);
        }
        self.stmts(&arrow.body);
        self.scope.function_depth -= 1;
        self.scope.pop();
    }

    fn class(&mut self, class: &Class, is_expression: bool) {
        if let Some(extends) = &class.extends {
            self.expr(extends);
        }
        let names = match (&class.name, is_expression) {
            (Some(name), true) => vec![name.clone()],
            _ => Vec::new(),
        };
        self.enter(names);
        for member in &class.members {
            if let PropKey::Computed(key) = &member.key {
                self.expr(key);
            }
            self.scope.this_depth += 1;
            match &member.kind {
                ClassMemberKind::Method(function) => self.function(function, true),
                ClassMemberKind::Property(Some(value)) => self.expr(value),
                ClassMemberKind::Property(None) => {}
            }
            self.scope.this_depth -= 1;
        }
        self.scope.pop();
    }

    fn write_target(&mut self, target: &Expr) {
        if let Expr::Ident(name) = target
            && !self.scope.is_bound(name)
        {
            self.refs
                .writes
                .push((name.clone(), self.scope.try_depth > 0));
        }
        self.expr(target);
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(name) => self.reference(name),
            Expr::Str(_)
            | Expr::Num(_)
            | Expr::Bool(_)
            | Expr::Null
            | Expr::Undefined
            | Expr::Require { .. }
            | Expr::RequireResolve { .. }
            | Expr::UrlToken { .. } => {}
            Expr::This => {
                if self.scope.this_depth == 0 {
                    self.refs.top_level_this = true;
                }
            }
            Expr::ImportMeta => self.refs.import_meta = true,
            Expr::Member(object, prop) => {
                if let Expr::Ident(name) = object.as_ref() {
                    if !self.scope.is_bound(name) {
                        self.refs.free_members.push((name.clone(), prop.clone()));
                        self.refs.free.insert(name.clone());
                    }
                } else {
                    self.expr(object);
                }
            }
            Expr::Index(object, key) => {
                self.expr(object);
                self.expr(key);
            }
            Expr::Call(call) | Expr::New(call) => {
                self.expr(&call.callee);
                for arg in &call.args {
                    self.expr(arg);
                }
            }
            Expr::Assign { target, value, .. } => {
                self.write_target(target);
                self.expr(value);
            }
            Expr::Update { target, .. } => self.write_target(target),
            Expr::Unary(_, operand) | Expr::Spread(operand) => self.expr(operand),
            Expr::Await(operand) => {
                if self.scope.function_depth == 0 {
                    self.refs.top_level_await = true;
                }
                self.expr(operand);
            }
            Expr::Binary(_, left, right) => {
                self.expr(left);
                self.expr(right);
            }
            Expr::Cond(test, consequent, alternate) => {
                self.expr(test);
                self.expr(consequent);
                self.expr(alternate);
            }
            Expr::Function(function) => self.function(function, true),
            Expr::Arrow(arrow) => self.arrow(arrow),
            Expr::Class(class) => self.class(class, true),
            Expr::Object(props) => {
                for prop in props {
                    match prop {
                        Prop::KeyValue(key, value) => {
                            if let PropKey::Computed(key) = key {
                                self.expr(key);
                            }
                            self.expr(value);
                        }
                        Prop::Spread(value) => self.expr(value),
                    }
                }
            }
            Expr::Array(items) | Expr::Seq(items) | Expr::Template(_, items) => {
                for item in items {
                    self.expr(item);
                }
            }
            Expr::DynamicImport { arg, .. } => self.expr(arg),
        }
    }
}

// =============================================================================
// Rewriting
// =============================================================================

/// Hooks for [`rewrite_stmts`]. Every hook defaults to "leave unchanged".
pub trait Rewriter {
    /// A free identifier reference. `is_write` marks assignment targets.
    fn ident(&mut self, _name: &str, _is_write: bool) -> Option<Expr> {
        None
    }

    /// A member chain such as `process.env.NODE_ENV` whose root is free.
    /// Longer chains are offered before their prefixes.
    fn member_path(&mut self, _path: &str) -> Option<Expr> {
        None
    }

    /// `this` outside of any function or class body.
    fn top_level_this(&mut self) -> Option<Expr> {
        None
    }

    fn import_meta(&mut self) -> Option<Expr> {
        None
    }

    /// A module-scope binding at its declaration site.
    fn binding(&mut self, _name: &str) -> Option<String> {
        None
    }

    /// `require("x")`, `require.resolve("x")`, `import("x")` and URL tokens.
    fn module_reference(&mut self, _expr: &Expr) -> Option<Expr> {
        None
    }
}

/// Rewrite `stmts` as module-scope code.
pub fn rewrite_stmts<R: Rewriter + ?Sized>(stmts: &mut [Stmt], rewriter: &mut R) {
    let mut walker = RewriteWalker {
        scope: ScopeStack::default(),
        rewriter,
    };
    for stmt in stmts {
        walker.stmt(stmt);
    }
}

/// Rewrite one expression evaluated at module scope.
pub fn rewrite_expr<R: Rewriter + ?Sized>(expr: &mut Expr, rewriter: &mut R) {
    let mut walker = RewriteWalker {
        scope: ScopeStack::default(),
        rewriter,
    };
    walker.expr(expr);
}

struct RewriteWalker<'r, R: Rewriter + ?Sized> {
    scope: ScopeStack,
    rewriter: &'r mut R,
}

impl<R: Rewriter + ?Sized> RewriteWalker<'_, R> {
    fn stmts(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn block(&mut self, stmts: &mut [Stmt]) {
        self.scope.push(block_scoped_names(stmts));
        self.stmts(stmts);
        self.scope.pop();
    }

    fn binding_name(&mut self, name: &mut String) {
        if !self.scope.is_bound(name)
            && let Some(renamed) = self.rewriter.binding(name)
        {
            *name = renamed;
        }
    }

    fn stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Import(_) | Stmt::ExportAll(_) | Stmt::TypeOnly | Stmt::Empty => {}
            Stmt::ExportNamed(export) => {
                if export.source.is_none() {
                    for spec in &mut export.specifiers {
                        if let Some(Expr::Ident(renamed)) = self.rewriter.ident(&spec.local, false) {
                            spec.local = renamed;
                        }
                    }
                }
            }
            Stmt::ExportDecl(inner) => self.stmt(inner),
            Stmt::ExportDefault(value) => match value {
                DefaultValue::Expr(expr) => self.expr(expr),
                DefaultValue::Function(function) => {
                    if let Some(name) = &mut function.name {
                        self.binding_name(name);
                    }
                    self.function(function, false);
                }
                DefaultValue::Class(class) => {
                    if let Some(name) = &mut class.name {
                        self.binding_name(name);
                    }
                    self.class(class, false);
                }
            },
            Stmt::Var(decl) => {
                for declarator in &mut decl.decls {
                    self.pattern(&mut declarator.binding, true);
                    if let Some(init) = &mut declarator.init {
                        self.expr(init);
                    }
                }
            }
            Stmt::Function(function) => {
                if let Some(name) = &mut function.name {
                    self.binding_name(name);
                }
                self.function(function, false);
            }
            Stmt::Class(class) => {
                if let Some(name) = &mut class.name {
                    self.binding_name(name);
                }
                self.class(class, false);
            }
            Stmt::Expr(expr) | Stmt::Throw(expr) => self.expr(expr),
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test);
                self.stmt(consequent);
                if let Some(alternate) = alternate {
                    self.stmt(alternate);
                }
            }
            Stmt::Block(body) => self.block(body),
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            Stmt::ForOf {
                kind,
                binding,
                right,
                body,
                ..
            } => {
                self.expr(right);
                let mut names = Vec::new();
                if *kind != VarKind::Var {
                    pattern_names(binding, &mut names);
                }
                self.scope.push(names);
                self.pattern(binding, true);
                self.stmt(body);
                self.scope.pop();
            }
            Stmt::While { test, body } => {
                self.expr(test);
                self.stmt(body);
            }
            Stmt::Try {
                block,
                param,
                handler,
                finalizer,
            } => {
                self.block(block);
                if let Some(handler) = handler {
                    let mut names = block_scoped_names(handler);
                    if let Some(param) = param {
                        pattern_names(param, &mut names);
                    }
                    self.scope.push(names);
                    if let Some(param) = param {
                        self.pattern(param, true);
                    }
                    self.stmts(handler);
                    self.scope.pop();
                }
                if let Some(finalizer) = finalizer {
                    self.block(finalizer);
                }
            }
        }
    }

    fn pattern(&mut self, pattern: &mut Pattern, is_declaration: bool) {
        match pattern {
            Pattern::Ident(name) => {
                if is_declaration {
                    self.binding_name(name);
                }
            }
            Pattern::Object { props, rest } => {
                for prop in props {
                    if let PropKey::Computed(key) = &mut prop.key {
                        self.expr(key);
                    }
                    self.pattern(&mut prop.value, is_declaration);
                }
                if let Some(rest) = rest
                    && is_declaration
                {
                    self.binding_name(rest);
                }
            }
            Pattern::Array(items) => {
                for item in items.iter_mut().flatten() {
                    self.pattern(item, is_declaration);
                }
            }
            Pattern::Default(inner, default) => {
                self.pattern(inner, is_declaration);
                self.expr(default);
            }
        }
    }

    fn function(&mut self, function: &mut Function, is_expression: bool) {
        let mut names = function_scope_names(&function.params, &function.body, false);
        if is_expression && let Some(name) = &function.name {
            names.push(name.clone());
        }
        self.scope.push(names);
        self.scope.this_depth += 1;
        for param in &mut function.params {
            self.pattern(param, true);
        }
        self.stmts(&mut function.body);
        self.scope.this_depth -= 1;
        self.scope.pop();
    }

    fn arrow(&mut self, arrow: &mut Arrow) {
        self.scope
            .push(function_scope_names(&arrow.params, &arrow.body, true));
        for param in &mut arrow.params {
            self.pattern(param, true);
        }
        self.stmts(&mut arrow.body);
        self.scope.pop();
    }

    fn class(&mut self, class: &mut Class, is_expression: bool) {
        if let Some(extends) = &mut class.extends {
            self.expr(extends);
        }
        let names = match (&class.name, is_expression) {
            (Some(name), true) => vec![name.clone()],
            _ => Vec::new(),
        };
        self.scope.push(names);
        for member in &mut class.members {
            if let PropKey::Computed(key) = &mut member.key {
                self.expr(key);
            }
            self.scope.this_depth += 1;
            match &mut member.kind {
                ClassMemberKind::Method(function) => self.function(function, true),
                ClassMemberKind::Property(Some(value)) => self.expr(value),
                ClassMemberKind::Property(None) => {}
            }
            self.scope.this_depth -= 1;
        }
        self.scope.pop();
    }

    /// Root of a member chain if the chain is eligible for `member_path`.
    fn chain_is_free(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Ident(name) => !self.scope.is_bound(name),
            Expr::ImportMeta => true,
            Expr::This => self.scope.this_depth == 0,
            Expr::Member(object, _) => self.chain_is_free(object),
            _ => false,
        }
    }

    fn expr(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Ident(name) => {
                if !self.scope.is_bound(name)
                    && let Some(replacement) = self.rewriter.ident(name, false)
                {
                    *expr = replacement;
                }
            }
            Expr::Str(_) | Expr::Num(_) | Expr::Bool(_) | Expr::Null | Expr::Undefined => {}
            Expr::Require { .. } | Expr::RequireResolve { .. } | Expr::UrlToken { .. } => {
                if let Some(replacement) = self.rewriter.module_reference(expr) {
                    *expr = replacement;
                }
            }
            Expr::DynamicImport { .. } => {
                if let Some(replacement) = self.rewriter.module_reference(expr) {
                    *expr = replacement;
                    return;
                }
                if let Expr::DynamicImport { arg, .. } = expr {
                    self.expr(arg);
                }
            }
            Expr::This => {
                if self.scope.this_depth == 0
                    && let Some(replacement) = self.rewriter.top_level_this()
                {
                    *expr = replacement;
                }
            }
            Expr::ImportMeta => {
                if let Some(replacement) = self.rewriter.import_meta() {
                    *expr = replacement;
                }
            }
            Expr::Member(..) => {
                if self.chain_is_free(expr)
                    && let Some(path) = expr.dotted_path()
                    && path.contains('.')
                    && let Some(replacement) = self.rewriter.member_path(&path)
                {
                    *expr = replacement;
                    return;
                }
                if let Expr::Member(object, _) = expr {
                    self.expr(object);
                }
            }
            Expr::Index(object, key) => {
                self.expr(object);
                self.expr(key);
            }
            Expr::Call(call) | Expr::New(call) => {
                self.expr(&mut call.callee);
                for arg in &mut call.args {
                    self.expr(arg);
                }
            }
            Expr::Assign { target, value, .. } => {
                self.write_target(target);
                self.expr(value);
            }
            Expr::Update { target, .. } => self.write_target(target),
            Expr::Unary(_, operand) | Expr::Spread(operand) | Expr::Await(operand) => {
                self.expr(operand)
            }
            Expr::Binary(_, left, right) => {
                self.expr(left);
                self.expr(right);
            }
            Expr::Cond(test, consequent, alternate) => {
                self.expr(test);
                self.expr(consequent);
                self.expr(alternate);
            }
            Expr::Function(function) => self.function(function, true),
            Expr::Arrow(arrow) => self.arrow(arrow),
            Expr::Class(class) => self.class(class, true),
            Expr::Object(props) => {
                for prop in props {
                    match prop {
                        Prop::KeyValue(key, value) => {
                            if let PropKey::Computed(key) = key {
                                self.expr(key);
                            }
                            self.expr(value);
                        }
                        Prop::Spread(value) => self.expr(value),
                    }
                }
            }
            Expr::Array(items) | Expr::Seq(items) | Expr::Template(_, items) => {
                for item in items {
                    self.expr(item);
                }
            }
        }
    }

    fn write_target(&mut self, target: &mut Expr) {
        if let Expr::Ident(name) = target {
            if !self.scope.is_bound(name)
                && let Some(replacement) = self.rewriter.ident(name, true)
            {
                *target = replacement;
            }
            return;
        }
        self.expr(target);
    }
}

#[cfg(test)]
mod tests {
    use super::super::build::*;
    use super::*;

    #[test]
    fn test_free_references_skip_nested_bindings() {
        // function f(a) { let b = a + c; return b + g(); }
        let stmt = function_decl(
            "f",
            &["a"],
            vec![
                var_decl(VarKind::Let, "b", Some(binary(BinaryOp::Add, ident("a"), ident("c")))),
                ret(binary(BinaryOp::Add, ident("b"), call(ident("g"), vec![]))),
            ],
        );
        let refs = collect_references(std::slice::from_ref(&stmt));
        assert_eq!(refs.free.iter().collect::<Vec<_>>(), vec!["c", "g"]);
        assert!(refs.nested.contains("a"));
        assert!(refs.nested.contains("b"));
    }

    #[test]
    fn test_top_level_this_and_await() {
        let refs = collect_references(&[expr_stmt(await_expr(Expr::This))]);
        assert!(refs.top_level_this);
        assert!(refs.top_level_await);

        let nested = collect_references(&[expr_stmt(function_expr(
            None,
            &[],
            vec![expr_stmt(Expr::This)],
        ))]);
        assert!(!nested.top_level_this);

        // Arrow functions see the outer `this` but own their `await`
        let arrow_this = collect_references(&[expr_stmt(arrow(&[], Expr::This))]);
        assert!(arrow_this.top_level_this);
        let arrow_await = collect_references(&[expr_stmt(arrow(&[], await_expr(ident("x"))))]);
        assert!(!arrow_await.top_level_await);
    }

    #[test]
    fn test_writes_record_try_context() {
        let stmts = vec![
            expr_stmt(assign(ident("a"), num(1.0))),
            Stmt::Try {
                block: vec![expr_stmt(update(UpdateOp::Increment, ident("b")))],
                param: None,
                handler: Some(vec![]),
                finalizer: None,
            },
        ];
        let refs = collect_references(&stmts);
        assert_eq!(
            refs.writes,
            vec![("a".to_string(), false), ("b".to_string(), true)]
        );
    }

    #[test]
    fn test_free_members() {
        let refs = collect_references(&[exports_assign("foo", num(1.0))]);
        assert_eq!(refs.free_members, vec![("exports".to_string(), "foo".to_string())]);
        assert!(refs.free.contains("exports"));
        assert!(!refs.value_refs.contains("exports"));
    }

    struct Renamer;

    impl Rewriter for Renamer {
        fn ident(&mut self, name: &str, _is_write: bool) -> Option<Expr> {
            (name == "x").then(|| ident("x2"))
        }

        fn binding(&mut self, name: &str) -> Option<String> {
            (name == "x").then(|| "x2".to_string())
        }

        fn member_path(&mut self, path: &str) -> Option<Expr> {
            (path == "process.env.NODE_ENV").then(|| str_lit("production"))
        }
    }

    #[test]
    fn test_rewrite_respects_shadowing() {
        // var x = 1; function f(x) { return x; } use(x, process.env.NODE_ENV);
        let mut stmts = vec![
            var_decl(VarKind::Var, "x", Some(num(1.0))),
            function_decl("f", &["x"], vec![ret(ident("x"))]),
            expr_stmt(call(
                ident("use"),
                vec![ident("x"), member(member(ident("process"), "env"), "NODE_ENV")],
            )),
        ];
        rewrite_stmts(&mut stmts, &mut Renamer);
        assert_eq!(stmts[0], var_decl(VarKind::Var, "x2", Some(num(1.0))));
        assert_eq!(stmts[1], function_decl("f", &["x"], vec![ret(ident("x"))]));
        assert_eq!(
            stmts[2],
            expr_stmt(call(ident("use"), vec![ident("x2"), str_lit("production")]))
        );
    }

    #[test]
    fn test_member_path_skips_shadowed_root() {
        let mut stmts = vec![function_decl(
            "f",
            &["process"],
            vec![ret(member(member(ident("process"), "env"), "NODE_ENV"))],
        )];
        let before = stmts.clone();
        rewrite_stmts(&mut stmts, &mut Renamer);
        assert_eq!(stmts, before);
    }
}
