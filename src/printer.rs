//! IR Printer
//!
//! Turns module IR back into JavaScript text. Output is readable rather
//! than minimal: two-space indentation, one statement per line, and only
//! the parentheses operator precedence requires.

use crate::ast::{
    Arrow, BinaryOp, Call, Class, ClassMember, ClassMemberKind, DefaultValue, ExportAll,
    ExportNamed, Expr, Function, ImportDecl, Pattern, Prop, PropKey, RESERVED_WORDS, Stmt,
    UnaryOp, UpdateOp, VarDecl, is_identifier,
};

// Binding power of expression forms; higher binds tighter. Binary
// operators sit at `BINARY_BASE + op.precedence()`.
const PREC_COMMA: u8 = 0;
const PREC_ASSIGN: u8 = 1;
const PREC_COND: u8 = 2;
const BINARY_BASE: u8 = 3;
const PREC_PREFIX: u8 = 16;
const PREC_POSTFIX: u8 = 17;
const PREC_CALL: u8 = 18;
const PREC_PRIMARY: u8 = 19;

#[derive(Debug, Default)]
pub struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    pub fn new() -> Self {
        Printer::default()
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    // =========================================================================
    // Output helpers
    // =========================================================================

    pub fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub fn write_line(&mut self) {
        self.out.push('\n');
    }

    pub fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    pub fn increase_indent(&mut self) {
        self.indent += 1;
    }

    pub fn decrease_indent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Pre-formatted lines (runtime helpers, comments), re-indented to the
    /// current level.
    pub fn write_lines(&mut self, text: &str) {
        for line in text.lines() {
            if line.is_empty() {
                self.write_line();
                continue;
            }
            self.write_indent();
            self.write(line);
            self.write_line();
        }
    }

    fn write_comma_separated<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Self, &T)) {
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                self.write(", ");
            }
            each(self, item);
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub fn print_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.print_stmt(stmt);
        }
    }

    /// One statement on its own line(s), indented, with a trailing newline.
    pub fn print_stmt(&mut self, stmt: &Stmt) {
        if matches!(stmt, Stmt::TypeOnly | Stmt::Empty) {
            return;
        }
        self.write_indent();
        self.emit_stmt(stmt);
        self.write_line();
    }

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Import(import) => self.emit_import(import),
            Stmt::ExportNamed(export) => self.emit_export_named(export),
            Stmt::ExportAll(export) => self.emit_export_all(export),
            Stmt::ExportDecl(inner) => {
                self.write("export ");
                self.emit_stmt(inner);
            }
            Stmt::ExportDefault(value) => {
                self.write("export default ");
                match value {
                    DefaultValue::Expr(expr) => {
                        self.emit_expr_stmt_start(expr, PREC_ASSIGN);
                        self.write(";");
                    }
                    DefaultValue::Function(function) => self.emit_function(function),
                    DefaultValue::Class(class) => self.emit_class(class),
                }
            }
            Stmt::Var(decl) => {
                self.emit_var_decl(decl);
                self.write(";");
            }
            Stmt::Function(function) => self.emit_function(function),
            Stmt::Class(class) => self.emit_class(class),
            Stmt::Expr(expr) => {
                self.emit_expr_stmt_start(expr, PREC_COMMA);
                self.write(";");
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.write("if (");
                self.emit_expr(test, PREC_COMMA);
                self.write(")");
                self.emit_body(consequent);
                if let Some(alternate) = alternate {
                    if matches!(consequent.as_ref(), Stmt::Block(_)) {
                        self.write(" else");
                    } else {
                        self.write_line();
                        self.write_indent();
                        self.write("else");
                    }
                    if matches!(alternate.as_ref(), Stmt::If { .. }) {
                        self.write(" ");
                        self.emit_stmt(alternate);
                    } else {
                        self.emit_body(alternate);
                    }
                }
            }
            Stmt::Block(body) => self.emit_block(body),
            Stmt::Return(value) => {
                self.write("return");
                if let Some(value) = value {
                    self.write(" ");
                    self.emit_expr(value, PREC_COMMA);
                }
                self.write(";");
            }
            Stmt::Throw(value) => {
                self.write("throw ");
                self.emit_expr(value, PREC_COMMA);
                self.write(";");
            }
            Stmt::ForOf {
                is_await,
                kind,
                binding,
                right,
                body,
            } => {
                self.write(if *is_await { "for await (" } else { "for (" });
                self.write(kind.as_str());
                self.write(" ");
                self.emit_pattern(binding);
                self.write(" of ");
                self.emit_expr(right, PREC_ASSIGN);
                self.write(")");
                self.emit_body(body);
            }
            Stmt::While { test, body } => {
                self.write("while (");
                self.emit_expr(test, PREC_COMMA);
                self.write(")");
                self.emit_body(body);
            }
            Stmt::Try {
                block,
                param,
                handler,
                finalizer,
            } => {
                self.write("try ");
                self.emit_block(block);
                if let Some(handler) = handler {
                    self.write(" catch ");
                    if let Some(param) = param {
                        self.write("(");
                        self.emit_pattern(param);
                        self.write(") ");
                    }
                    self.emit_block(handler);
                }
                if let Some(finalizer) = finalizer {
                    self.write(" finally ");
                    self.emit_block(finalizer);
                }
            }
            Stmt::TypeOnly | Stmt::Empty => self.write(";"),
        }
    }

    /// Body of `if`/`for`/`while`: blocks stay on the header line, single
    /// statements go on the next line, indented.
    fn emit_body(&mut self, body: &Stmt) {
        if let Stmt::Block(stmts) = body {
            self.write(" ");
            self.emit_block(stmts);
        } else {
            self.write_line();
            self.increase_indent();
            self.write_indent();
            self.emit_stmt(body);
            self.decrease_indent();
        }
    }

    fn emit_block(&mut self, stmts: &[Stmt]) {
        if stmts.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{");
        self.write_line();
        self.increase_indent();
        self.print_stmts(stmts);
        self.decrease_indent();
        self.write_indent();
        self.write("}");
    }

    fn emit_import(&mut self, import: &ImportDecl) {
        self.write("import ");
        if import.is_bare() {
            self.emit_string(&import.specifier);
            self.write(";");
            return;
        }
        let mut clauses = 0;
        if let Some(default) = &import.default {
            self.write(default);
            clauses += 1;
        }
        if let Some(namespace) = &import.namespace {
            if clauses > 0 {
                self.write(", ");
            }
            self.write("* as ");
            self.write(namespace);
            clauses += 1;
        }
        if !import.named.is_empty() {
            if clauses > 0 {
                self.write(", ");
            }
            self.write("{ ");
            self.write_comma_separated(&import.named, |p, spec| {
                if spec.imported != spec.local {
                    p.emit_module_export_name(&spec.imported);
                    p.write(" as ");
                }
                p.write(&spec.local);
            });
            self.write(" }");
        }
        self.write(" from ");
        self.emit_string(&import.specifier);
        self.write(";");
    }

    fn emit_export_named(&mut self, export: &ExportNamed) {
        if export.specifiers.is_empty() {
            self.write("export {}");
        } else {
            self.write("export { ");
            self.write_comma_separated(&export.specifiers, |p, spec| {
                p.emit_module_export_name(&spec.local);
                if spec.exported != spec.local {
                    p.write(" as ");
                    p.emit_module_export_name(&spec.exported);
                }
            });
            self.write(" }");
        }
        if let Some(source) = &export.source {
            self.write(" from ");
            self.emit_string(source);
        }
        self.write(";");
    }

    fn emit_export_all(&mut self, export: &ExportAll) {
        self.write("export * ");
        if let Some(alias) = &export.alias {
            self.write("as ");
            self.emit_module_export_name(alias);
            self.write(" ");
        }
        self.write("from ");
        self.emit_string(&export.source);
        self.write(";");
    }

    /// Export names that are not identifiers are written as strings.
    fn emit_module_export_name(&mut self, name: &str) {
        if is_property_name(name) {
            self.write(name);
        } else {
            self.emit_string(name);
        }
    }

    fn emit_var_decl(&mut self, decl: &VarDecl) {
        self.write(decl.kind.as_str());
        self.write(" ");
        self.write_comma_separated(&decl.decls, |p, declarator| {
            p.emit_pattern(&declarator.binding);
            if let Some(init) = &declarator.init {
                p.write(" = ");
                p.emit_expr(init, PREC_ASSIGN);
            }
        });
    }

    fn emit_function(&mut self, function: &Function) {
        if function.is_async {
            self.write("async ");
        }
        self.write("function");
        if function.is_generator {
            self.write("*");
        }
        if let Some(name) = &function.name {
            self.write(" ");
            self.write(name);
        }
        self.emit_params_and_body(&function.params, &function.body);
    }

    fn emit_params_and_body(&mut self, params: &[Pattern], body: &[Stmt]) {
        self.write("(");
        self.write_comma_separated(params, |p, param| p.emit_pattern(param));
        self.write(") ");
        self.emit_block(body);
    }

    fn emit_class(&mut self, class: &Class) {
        self.write("class");
        if let Some(name) = &class.name {
            self.write(" ");
            self.write(name);
        }
        if let Some(extends) = &class.extends {
            self.write(" extends ");
            self.emit_expr(extends, PREC_CALL);
        }
        if class.members.is_empty() {
            self.write(" {}");
            return;
        }
        self.write(" {");
        self.write_line();
        self.increase_indent();
        for member in &class.members {
            self.write_indent();
            self.emit_class_member(member);
            self.write_line();
        }
        self.decrease_indent();
        self.write_indent();
        self.write("}");
    }

    fn emit_class_member(&mut self, member: &ClassMember) {
        if member.is_static {
            self.write("static ");
        }
        match &member.kind {
            ClassMemberKind::Method(function) => {
                if function.is_async {
                    self.write("async ");
                }
                if function.is_generator {
                    self.write("*");
                }
                self.emit_prop_key(&member.key);
                self.emit_params_and_body(&function.params, &function.body);
            }
            ClassMemberKind::Property(value) => {
                self.emit_prop_key(&member.key);
                if let Some(value) = value {
                    self.write(" = ");
                    self.emit_expr(value, PREC_ASSIGN);
                }
                self.write(";");
            }
        }
    }

    fn emit_pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Ident(name) => self.write(name),
            Pattern::Object { props, rest } => {
                if props.is_empty() && rest.is_none() {
                    self.write("{}");
                    return;
                }
                self.write("{ ");
                self.write_comma_separated(props, |p, prop| {
                    let shorthand = match (&prop.key, &prop.value) {
                        (PropKey::Named(key), Pattern::Ident(name)) => key == name,
                        (PropKey::Named(key), Pattern::Default(inner, _)) => {
                            matches!(inner.as_ref(), Pattern::Ident(name) if name == key)
                        }
                        _ => false,
                    };
                    if !shorthand {
                        p.emit_prop_key(&prop.key);
                        p.write(": ");
                    }
                    p.emit_pattern(&prop.value);
                });
                if let Some(rest) = rest {
                    if !props.is_empty() {
                        self.write(", ");
                    }
                    self.write("...");
                    self.write(rest);
                }
                self.write(" }");
            }
            Pattern::Array(items) => {
                self.write("[");
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        self.write(", ");
                    }
                    if let Some(item) = item {
                        self.emit_pattern(item);
                    }
                }
                // A trailing hole needs its own comma.
                if matches!(items.last(), Some(None)) {
                    self.write(",");
                }
                self.write("]");
            }
            Pattern::Default(inner, default) => {
                self.emit_pattern(inner);
                self.write(" = ");
                self.emit_expr(default, PREC_ASSIGN);
            }
        }
    }

    fn emit_prop_key(&mut self, key: &PropKey) {
        match key {
            PropKey::Named(name) if is_property_name(name) => self.write(name),
            PropKey::Named(name) if is_array_index(name) => self.write(name),
            PropKey::Named(name) => self.emit_string(name),
            PropKey::Computed(expr) => {
                self.write("[");
                self.emit_expr(expr, PREC_ASSIGN);
                self.write("]");
            }
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub fn print_expr(&mut self, expr: &Expr) {
        self.emit_expr(expr, PREC_COMMA);
    }

    /// Expressions in statement position cannot start with `function`,
    /// `class` or `{`.
    fn emit_expr_stmt_start(&mut self, expr: &Expr, min: u8) {
        if starts_ambiguously(expr) {
            self.write("(");
            self.emit_expr(expr, PREC_COMMA);
            self.write(")");
        } else {
            self.emit_expr(expr, min);
        }
    }

    fn emit_expr(&mut self, expr: &Expr, min: u8) {
        let prec = precedence(expr);
        if prec < min {
            self.write("(");
            self.emit_expr_inner(expr);
            self.write(")");
        } else {
            self.emit_expr_inner(expr);
        }
    }

    fn emit_expr_inner(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(name) => self.write(name),
            Expr::Str(value) => self.emit_string(value),
            Expr::Num(value) => self.write(&format_number(*value)),
            Expr::Bool(value) => self.write(if *value { "true" } else { "false" }),
            Expr::Null => self.write("null"),
            Expr::Undefined => self.write("void 0"),
            Expr::This => self.write("this"),
            Expr::ImportMeta => self.write("import.meta"),
            Expr::Member(object, prop) => {
                self.emit_member_object(object);
                self.write(".");
                self.write(prop);
            }
            Expr::Index(object, key) => {
                self.emit_member_object(object);
                self.write("[");
                self.emit_expr(key, PREC_COMMA);
                self.write("]");
            }
            Expr::Call(call) => self.emit_call(call, false),
            Expr::New(call) => self.emit_call(call, true),
            Expr::Assign { op, target, value } => {
                self.emit_expr(target, PREC_POSTFIX);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.emit_expr(value, PREC_ASSIGN);
            }
            Expr::Update {
                op,
                prefix,
                target,
            } => {
                let text = match op {
                    UpdateOp::Increment => "++",
                    UpdateOp::Decrement => "--",
                };
                if *prefix {
                    self.write(text);
                    self.emit_expr(target, PREC_POSTFIX);
                } else {
                    self.emit_expr(target, PREC_POSTFIX);
                    self.write(text);
                }
            }
            Expr::Unary(op, operand) => {
                self.write(op.as_str());
                // `- -x` and `+ +x` must not fuse into `--`/`++`.
                let sign = match op {
                    UnaryOp::Minus => Some('-'),
                    UnaryOp::Plus => Some('+'),
                    _ => None,
                };
                if let Some(sign) = sign
                    && leading_sign(operand) == Some(sign)
                {
                    self.write(" ");
                }
                self.emit_expr(operand, PREC_PREFIX);
            }
            Expr::Binary(op, left, right) => {
                let prec = BINARY_BASE + op.precedence();
                let (left_min, right_min) = match op {
                    BinaryOp::Exp => (prec + 1, prec),
                    _ => (prec, prec + 1),
                };
                // `??` cannot mix with `||`/`&&` without parentheses.
                let left_min = if mixes_nullish(*op, left) { PREC_PRIMARY } else { left_min };
                let right_min = if mixes_nullish(*op, right) {
                    PREC_PRIMARY
                } else {
                    right_min
                };
                self.emit_expr(left, left_min);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.emit_expr(right, right_min);
            }
            Expr::Cond(test, consequent, alternate) => {
                self.emit_expr(test, PREC_COND + 1);
                self.write(" ? ");
                self.emit_expr(consequent, PREC_ASSIGN);
                self.write(" : ");
                self.emit_expr(alternate, PREC_ASSIGN);
            }
            Expr::Await(operand) => {
                self.write("await ");
                self.emit_expr(operand, PREC_PREFIX);
            }
            Expr::Function(function) => self.emit_function(function),
            Expr::Arrow(arrow) => self.emit_arrow(arrow),
            Expr::Class(class) => self.emit_class(class),
            Expr::Object(props) => self.emit_object(props),
            Expr::Array(items) => {
                self.write("[");
                self.write_comma_separated(items, |p, item| p.emit_expr(item, PREC_ASSIGN));
                self.write("]");
            }
            Expr::Spread(inner) => {
                self.write("...");
                self.emit_expr(inner, PREC_ASSIGN);
            }
            Expr::Template(quasis, exprs) => {
                self.write("`");
                for (index, quasi) in quasis.iter().enumerate() {
                    self.write(quasi);
                    if let Some(expr) = exprs.get(index) {
                        self.write("${");
                        self.emit_expr(expr, PREC_COMMA);
                        self.write("}");
                    }
                }
                self.write("`");
            }
            Expr::Seq(items) => {
                self.write_comma_separated(items, |p, item| p.emit_expr(item, PREC_ASSIGN));
            }
            Expr::Require { specifier, .. } => {
                self.write("require(");
                self.emit_string(specifier);
                self.write(")");
            }
            Expr::RequireResolve { specifier, .. } => {
                self.write("require.resolve(");
                self.emit_string(specifier);
                self.write(")");
            }
            Expr::DynamicImport { arg, .. } => {
                self.write("import(");
                self.emit_expr(arg, PREC_ASSIGN);
                self.write(")");
            }
            Expr::UrlToken { specifier, .. } => {
                self.write("new URL(");
                self.emit_string(specifier);
                self.write(", import.meta.url)");
            }
        }
    }

    fn emit_member_object(&mut self, object: &Expr) {
        // `1.toString()` does not parse.
        if matches!(object, Expr::Num(_)) {
            self.write("(");
            self.emit_expr_inner(object);
            self.write(")");
        } else {
            self.emit_expr(object, PREC_CALL);
        }
    }

    fn emit_call(&mut self, call: &Call, is_new: bool) {
        if let Some(comment) = &call.comment {
            self.write(comment);
            self.write(" ");
        }
        if is_new {
            self.write("new ");
            // The callee of `new` cannot itself contain a call.
            if contains_call(&call.callee) {
                self.write("(");
                self.emit_expr(&call.callee, PREC_COMMA);
                self.write(")");
            } else {
                self.emit_expr(&call.callee, PREC_CALL);
            }
        } else {
            self.emit_expr(&call.callee, PREC_CALL);
        }
        self.write("(");
        self.write_comma_separated(&call.args, |p, arg| p.emit_expr(arg, PREC_ASSIGN));
        self.write(")");
    }

    fn emit_arrow(&mut self, arrow: &Arrow) {
        if arrow.is_async {
            self.write("async ");
        }
        self.write("(");
        self.write_comma_separated(&arrow.params, |p, param| p.emit_pattern(param));
        self.write(") => ");
        match arrow.body.as_slice() {
            [Stmt::Return(Some(body))] => {
                if matches!(body, Expr::Object(_)) {
                    self.write("(");
                    self.emit_expr(body, PREC_COMMA);
                    self.write(")");
                } else {
                    self.emit_expr(body, PREC_ASSIGN);
                }
            }
            body => self.emit_block(body),
        }
    }

    fn emit_object(&mut self, props: &[Prop]) {
        if props.is_empty() {
            self.write("{}");
            return;
        }
        let multiline = props.len() > 4 || props.iter().any(prop_is_complex);
        if multiline {
            self.write("{");
            self.write_line();
            self.increase_indent();
            for (index, prop) in props.iter().enumerate() {
                self.write_indent();
                self.emit_prop(prop);
                if index + 1 < props.len() {
                    self.write(",");
                }
                self.write_line();
            }
            self.decrease_indent();
            self.write_indent();
            self.write("}");
        } else {
            self.write("{ ");
            self.write_comma_separated(props, |p, prop| p.emit_prop(prop));
            self.write(" }");
        }
    }

    fn emit_prop(&mut self, prop: &Prop) {
        match prop {
            Prop::Spread(value) => {
                self.write("...");
                self.emit_expr(value, PREC_ASSIGN);
            }
            Prop::KeyValue(PropKey::Named(key), Expr::Ident(name)) if key == name => {
                self.write(name);
            }
            Prop::KeyValue(key, Expr::Function(function)) if function.name.is_none() => {
                if function.is_async {
                    self.write("async ");
                }
                if function.is_generator {
                    self.write("*");
                }
                self.emit_prop_key(key);
                self.emit_params_and_body(&function.params, &function.body);
            }
            Prop::KeyValue(key, value) => {
                self.emit_prop_key(key);
                self.write(": ");
                self.emit_expr(value, PREC_ASSIGN);
            }
        }
    }

    fn emit_string(&mut self, value: &str) {
        let quoted = quote_string(value);
        self.write(&quoted);
    }
}

/// Print statements as a standalone piece of code.
pub fn print_stmts(stmts: &[Stmt]) -> String {
    let mut printer = Printer::new();
    printer.print_stmts(stmts);
    printer.finish()
}

pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::new();
    printer.print_expr(expr);
    printer.finish()
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Seq(_) => PREC_COMMA,
        Expr::Assign { .. } | Expr::Arrow(_) | Expr::Spread(_) => PREC_ASSIGN,
        Expr::Cond(..) => PREC_COND,
        Expr::Binary(op, ..) => BINARY_BASE + op.precedence(),
        Expr::Unary(..) | Expr::Await(_) | Expr::Undefined => PREC_PREFIX,
        Expr::Update { prefix: true, .. } => PREC_PREFIX,
        Expr::Update { prefix: false, .. } => PREC_POSTFIX,
        Expr::Num(value) if value.is_sign_negative() => PREC_PREFIX,
        Expr::Call(call) | Expr::New(call) if call.comment.is_some() => PREC_PREFIX,
        Expr::Call(_) | Expr::New(_) | Expr::Member(..) | Expr::Index(..) => PREC_CALL,
        Expr::Require { .. }
        | Expr::RequireResolve { .. }
        | Expr::DynamicImport { .. }
        | Expr::UrlToken { .. } => PREC_CALL,
        _ => PREC_PRIMARY,
    }
}

fn mixes_nullish(op: BinaryOp, child: &Expr) -> bool {
    match child {
        Expr::Binary(inner, ..) => match op {
            BinaryOp::Nullish => matches!(inner, BinaryOp::And | BinaryOp::Or),
            BinaryOp::And | BinaryOp::Or => *inner == BinaryOp::Nullish,
            _ => false,
        },
        _ => false,
    }
}

/// Whether printing `expr` would start with `function`, `class` or `{`.
fn starts_ambiguously(expr: &Expr) -> bool {
    match expr {
        Expr::Function(_) | Expr::Class(_) | Expr::Object(_) => true,
        Expr::Member(object, _) | Expr::Index(object, _) => starts_ambiguously(object),
        Expr::Call(call) => starts_ambiguously(&call.callee),
        Expr::Binary(_, left, _) => starts_ambiguously(left),
        Expr::Assign { target, .. } => starts_ambiguously(target),
        Expr::Cond(test, ..) => starts_ambiguously(test),
        Expr::Update {
            prefix: false,
            target,
            ..
        } => starts_ambiguously(target),
        Expr::Seq(items) => items.first().is_some_and(starts_ambiguously),
        _ => false,
    }
}

fn contains_call(expr: &Expr) -> bool {
    match expr {
        Expr::Call(_) | Expr::Require { .. } | Expr::DynamicImport { .. } => true,
        Expr::Member(object, _) | Expr::Index(object, _) => contains_call(object),
        _ => false,
    }
}

fn leading_sign(expr: &Expr) -> Option<char> {
    match expr {
        Expr::Unary(UnaryOp::Minus, _) => Some('-'),
        Expr::Unary(UnaryOp::Plus, _) => Some('+'),
        Expr::Update {
            op: UpdateOp::Decrement,
            prefix: true,
            ..
        } => Some('-'),
        Expr::Update {
            op: UpdateOp::Increment,
            prefix: true,
            ..
        } => Some('+'),
        Expr::Num(value) if value.is_sign_negative() => Some('-'),
        _ => None,
    }
}

fn prop_is_complex(prop: &Prop) -> bool {
    let value = match prop {
        Prop::KeyValue(_, value) | Prop::Spread(value) => value,
    };
    match value {
        Expr::Function(_) | Expr::Arrow(_) | Expr::Class(_) => true,
        Expr::Object(props) => !props.is_empty(),
        Expr::Array(items) => !items.is_empty(),
        _ => false,
    }
}

/// Property names may be reserved words; they only need identifier syntax.
fn is_property_name(name: &str) -> bool {
    is_identifier(name) || RESERVED_WORDS.contains(&name)
}

fn is_array_index(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| b.is_ascii_digit())
        && (name == "0" || !name.starts_with('0'))
}

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 && value.is_sign_negative() {
        return "-0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    format!("{}", value)
}

/// A double-quoted JavaScript string literal.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
#[path = "tests/printer_tests.rs"]
mod tests;
