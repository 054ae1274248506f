//! Output generation
//!
//! Turns every chunk into the text of one output file. Each module's live
//! statements are rewritten so that references use final names:
//! - imports of concatenated modules disappear and their uses become the
//!   target's renamed declaration
//! - imports of wrapped modules become `__toESM(require_x())` interop
//!   objects read by property
//! - CommonJS modules (and everything `require`d) become lazy
//!   `__commonJS` closures
//!
//! The chunk is then framed for the output format: ESM gets hoisted
//! external imports and an `export { ... }` clause, CommonJS assigns the
//! entry namespace to `module.exports`, and IIFE wraps everything in an
//! arrow function whose result may be stored in a global.

use crate::ast::build::{
    arrow, assign, call, export_all, expr_stmt, function_expr, ident, member, method_call, object,
    property, ret, str_lit, var_decl,
};
use crate::ast::visit::{Rewriter, rewrite_stmts};
use crate::ast::{
    DefaultValue, ExportNamed, ExportSpecifier, Expr, ImportDecl, ImportSpecifier, Stmt, VarKind,
};
use crate::chunks::{ChunkGraph, relative_import};
use crate::config::{BuildOptions, Format};
use crate::diagnostics::{DiagnosticBag, codes};
use crate::exports::{Binding, NamespaceExports};
use crate::linker::LinkedGraph;
use crate::module_graph::{ImportKind, Module, ModuleGraph, ModuleId, ModuleKind, RecordTarget};
use crate::parts::DEFAULT_EXPORT_LOCAL;
use crate::printer::Printer;
use crate::renamer::{Names, assign_names};
use crate::runtime::Helpers;
use crate::span::Span;
use crate::symbols::{InteropTarget, SymbolId, SymbolKind};
use crate::tree_shaking::Liveness;
use indexmap::IndexSet;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, debug_span};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputKind {
    EntryPoint,
    Chunk,
    Asset,
}

/// An import that survives into an output file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputImport {
    pub path: String,
    pub kind: ImportKind,
    pub external: bool,
}

/// One generated file.
#[derive(Clone, Debug)]
pub struct OutputFile {
    /// Relative to the output directory, `/`-separated
    pub path: String,
    pub kind: OutputKind,
    pub contents: Vec<u8>,
    pub entry: Option<ModuleId>,
    /// Modules emitted into this file with the bytes each contributed
    pub inputs: Vec<(ModuleId, usize)>,
    pub imports: Vec<OutputImport>,
    pub exports: Vec<String>,
}

impl OutputFile {
    /// Contents as text; assets that are not UTF-8 yield `None`.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.contents).ok()
    }
}

/// Generate every chunk, then the asset files chunks refer to.
pub fn generate(
    graph: &ModuleGraph,
    linked: &LinkedGraph,
    chunk_graph: &ChunkGraph,
    options: &BuildOptions,
) -> (Vec<OutputFile>, DiagnosticBag) {
    let _span = debug_span!("generate", chunks = chunk_graph.chunks.len()).entered();
    let count = chunk_graph.chunks.len();
    // Chunks that import from each other must agree on names.
    let names: Vec<Arc<Names>> = if options.splitting {
        let all: Vec<usize> = (0..count).collect();
        vec![Arc::new(assign_names(graph, linked, chunk_graph, &all)); count]
    } else {
        (0..count)
            .into_par_iter()
            .map(|index| Arc::new(assign_names(graph, linked, chunk_graph, &[index])))
            .collect()
    };

    let generated: Vec<(OutputFile, DiagnosticBag)> = (0..count)
        .into_par_iter()
        .map(|index| {
            let ctx = Ctx {
                graph,
                linked,
                chunk_graph,
                options,
                names: &names[index],
                chunk: index,
            };
            emit_chunk(&ctx)
        })
        .collect();

    let mut diagnostics = DiagnosticBag::new();
    let mut outputs = Vec::with_capacity(count);
    for (output, bag) in generated {
        outputs.push(output);
        diagnostics.extend(bag);
    }

    let mut written = IndexSet::new();
    for chunk in &chunk_graph.chunks {
        for &id in &chunk.modules {
            let module = graph.module(id);
            if let Some(asset) = &module.asset
                && written.insert(asset.file_name.clone())
            {
                outputs.push(OutputFile {
                    path: asset.file_name.clone(),
                    kind: OutputKind::Asset,
                    contents: asset.contents.clone(),
                    entry: None,
                    inputs: vec![(id, asset.contents.len())],
                    imports: Vec::new(),
                    exports: Vec::new(),
                });
            }
        }
    }
    debug!(outputs = outputs.len(), "output generated");
    (outputs, diagnostics)
}

// =============================================================================
// Chunk context
// =============================================================================

struct Ctx<'a> {
    graph: &'a ModuleGraph,
    linked: &'a LinkedGraph,
    chunk_graph: &'a ChunkGraph,
    options: &'a BuildOptions,
    names: &'a Names,
    chunk: usize,
}

impl<'a> Ctx<'a> {
    fn live(&self) -> &'a Liveness {
        self.chunk_graph.live(self.chunk)
    }

    fn esm_output(&self) -> bool {
        self.options.format == Format::Esm
    }

    fn name(&self, symbol: SymbolId) -> String {
        match self.names.get(symbol) {
            Some(name) => name.to_string(),
            None => self.linked.symbols.base(symbol).to_string(),
        }
    }

    fn binding_expr(&self, binding: &Binding) -> Expr {
        match binding {
            Binding::Symbol(symbol) => ident(&self.name(*symbol)),
            Binding::Property { object, name } => property(ident(&self.name(*object)), name),
            Binding::Namespace(module) => match self.linked.symbols.namespace(*module) {
                Some(symbol) => ident(&self.name(symbol)),
                None => Expr::Undefined,
            },
            Binding::Missing => Expr::Undefined,
        }
    }

    /// `require_x()` for a wrapped module.
    fn wrapper_call(&self, module: ModuleId) -> Option<Expr> {
        let wrapper = self.linked.symbols.wrapper(module)?;
        Some(call(ident(&self.name(wrapper)), vec![]))
    }

    /// Import path from this chunk to a file at the output root.
    fn path_to(&self, file_name: &str) -> String {
        relative_import(&self.chunk_graph.chunks[self.chunk].file_name, file_name)
    }
}

#[derive(Default)]
struct ChunkState {
    helpers: Helpers,
    diagnostics: DiagnosticBag,
    /// External imports lifted to the top of ESM output
    hoisted: Vec<Stmt>,
    imports: Vec<OutputImport>,
    inputs: Vec<(ModuleId, usize)>,
    exports: Vec<String>,
}

impl ChunkState {
    fn import(&mut self, path: &str, kind: ImportKind, external: bool) {
        let import = OutputImport {
            path: path.to_string(),
            kind,
            external,
        };
        if !self.imports.contains(&import) {
            self.imports.push(import);
        }
    }
}

fn emit_chunk(ctx: &Ctx) -> (OutputFile, DiagnosticBag) {
    let chunk = &ctx.chunk_graph.chunks[ctx.chunk];
    let format = ctx.options.format;
    let mut state = ChunkState::default();

    let mut body = Printer::new();
    if format == Format::Iife {
        body.increase_indent();
    }
    for &id in &chunk.modules {
        let module = ctx.graph.module(id);
        let stmts = ModuleEmitter::new(ctx, module, &mut state).emit();
        if stmts.is_empty() {
            continue;
        }
        if !body.is_empty() {
            body.write_line();
        }
        let start = body.len();
        body.write_lines(&format!("// {}", module.display));
        body.print_stmts(&stmts);
        state.inputs.push((id, body.len() - start));
    }
    let epilogue = epilogue(ctx, &mut state);
    if !epilogue.is_empty() {
        if !body.is_empty() {
            body.write_line();
        }
        body.print_stmts(&epilogue);
    }

    let mut out = Printer::new();
    let mut header = std::mem::take(&mut state.hoisted);
    header.extend(chunk_imports(ctx, &mut state));
    out.print_stmts(&header);
    let mut separate = !out.is_empty();
    if format == Format::Iife {
        if separate {
            out.write_line();
        }
        iife_open(ctx.options.global_name.as_deref(), &mut out);
        out.increase_indent();
        separate = false;
    }
    let helpers = state.helpers.source();
    if !helpers.is_empty() {
        if separate {
            out.write_line();
        }
        out.write_lines(&helpers);
        separate = true;
    }
    let body = body.finish();
    if !body.is_empty() {
        if separate {
            out.write_line();
        }
        out.write(&body);
    }
    if format == Format::Iife {
        out.decrease_indent();
        out.write("})();");
        out.write_line();
    }

    let kind = match chunk.entry() {
        Some(_) => OutputKind::EntryPoint,
        None => OutputKind::Chunk,
    };
    let output = OutputFile {
        path: chunk.file_name.clone(),
        kind,
        contents: out.finish().into_bytes(),
        entry: chunk.entry(),
        inputs: state.inputs,
        imports: state.imports,
        exports: state.exports,
    };
    (output, state.diagnostics)
}

/// `var name = (() => {`, creating the objects a dotted name hangs off.
fn iife_open(global_name: Option<&str>, out: &mut Printer) {
    let Some(global_name) = global_name else {
        out.write("(() => {");
        out.write_line();
        return;
    };
    let segments: Vec<&str> = global_name.split('.').collect();
    if segments.len() == 1 {
        out.write(&format!("var {} = (() => {{", global_name));
        out.write_line();
        return;
    }
    for depth in 1..segments.len() {
        let path = segments[..depth].join(".");
        if depth == 1 {
            out.write(&format!("var {} = {} || {{}};", path, path));
        } else {
            out.write(&format!("{} = {} || {{}};", path, path));
        }
        out.write_line();
    }
    out.write(&format!("{} = (() => {{", global_name));
    out.write_line();
}

/// `import { a } from "./chunk-X.js"` for every chunk this one depends on.
fn chunk_imports(ctx: &Ctx, state: &mut ChunkState) -> Vec<Stmt> {
    let chunk = &ctx.chunk_graph.chunks[ctx.chunk];
    let mut stmts = Vec::new();
    for (&target, symbols) in &chunk.imports {
        let path = ctx.chunk_graph.import_path(ctx.chunk, target);
        state.import(&path, ImportKind::ImportStatement, false);
        let named = symbols
            .iter()
            .map(|&symbol| {
                let name = ctx.name(symbol);
                ImportSpecifier {
                    imported: name.clone(),
                    local: name,
                    type_only: false,
                }
            })
            .collect();
        stmts.push(Stmt::Import(ImportDecl {
            specifier: path,
            default: None,
            namespace: None,
            named,
            type_only: false,
            span: Span::dummy(),
            record: None,
        }));
    }
    stmts
}

/// What the chunk hands to its host: ESM exports, `module.exports`, or the
/// IIFE return value.
fn epilogue(ctx: &Ctx, state: &mut ChunkState) -> Vec<Stmt> {
    let chunk = &ctx.chunk_graph.chunks[ctx.chunk];
    let entry = chunk.entry();
    let wrapped_entry = entry.filter(|&entry| ctx.linked.is_wrapped(entry));

    if ctx.options.format != Format::Esm {
        let Some(entry) = entry else {
            return Vec::new();
        };
        let value = match wrapped_entry.and_then(|entry| ctx.wrapper_call(entry)) {
            Some(run) => Some(run),
            None => ctx
                .linked
                .symbols
                .namespace(entry)
                .filter(|_| ctx.live().is_namespace_live(entry))
                .map(|namespace| {
                    state.helpers |= Helpers::TO_COMMON_JS;
                    call(ident("__toCommonJS"), vec![ident(&ctx.name(namespace))])
                }),
        };
        let Some(value) = value else {
            return Vec::new();
        };
        let stmt = match ctx.options.format {
            Format::Cjs => expr_stmt(assign(member(ident("module"), "exports"), value)),
            _ if ctx.options.global_name.is_some() => ret(value),
            // Nothing reads the result; a wrapped entry still has to run.
            _ if wrapped_entry.is_some() => expr_stmt(value),
            _ => return Vec::new(),
        };
        return vec![stmt];
    }

    let mut stmts = Vec::new();
    let mut specifiers = Vec::new();
    let mut exported = IndexSet::new();
    if let Some(entry) = wrapped_entry {
        if let Some(run) = ctx.wrapper_call(entry) {
            stmts.push(Stmt::ExportDefault(DefaultValue::Expr(run)));
            exported.insert("default".to_string());
        }
    } else if let Some(entry) = entry
        && let Some(namespace) = ctx.linked.namespace(entry)
    {
        for (name, binding) in &namespace.exports {
            let local = match binding {
                Binding::Missing => continue,
                Binding::Property { .. } => {
                    let Some(&temp) = ctx.linked.export_temps.get(&(entry, name.clone())) else {
                        continue;
                    };
                    let temp = ctx.name(temp);
                    stmts.push(var_decl(VarKind::Var, &temp, Some(ctx.binding_expr(binding))));
                    temp
                }
                _ => match ctx.binding_expr(binding) {
                    Expr::Ident(local) => local,
                    _ => continue,
                },
            };
            exported.insert(name.clone());
            specifiers.push(ExportSpecifier {
                local,
                exported: name.clone(),
            });
        }
    }
    for &symbol in &chunk.exports {
        let name = ctx.name(symbol);
        if exported.insert(name.clone()) {
            specifiers.push(ExportSpecifier {
                local: name.clone(),
                exported: name,
            });
        }
    }
    if !specifiers.is_empty() {
        stmts.push(Stmt::ExportNamed(ExportNamed {
            specifiers,
            source: None,
            type_only: false,
            span: Span::dummy(),
            record: None,
        }));
    }
    if wrapped_entry.is_none()
        && let Some(entry) = entry
        && let Some(namespace) = ctx.linked.namespace(entry)
    {
        for specifier in &namespace.external_stars {
            state.import(specifier, ImportKind::ImportStatement, true);
            stmts.push(export_all(specifier));
        }
    }
    state.exports = exported.into_iter().collect();
    stmts
}

// =============================================================================
// Modules
// =============================================================================

struct ModuleEmitter<'c, 'a> {
    ctx: &'c Ctx<'a>,
    module: &'a Module,
    wrapped: bool,
    state: &'c mut ChunkState,
    meta_warned: bool,
    /// Targets whose `require` already ran in this module
    required: FxHashSet<InteropTarget>,
}

impl<'c, 'a> ModuleEmitter<'c, 'a> {
    fn new(ctx: &'c Ctx<'a>, module: &'a Module, state: &'c mut ChunkState) -> Self {
        ModuleEmitter {
            ctx,
            module,
            wrapped: ctx.linked.is_wrapped(module.id),
            state,
            meta_warned: false,
            required: FxHashSet::default(),
        }
    }

    fn emit(mut self) -> Vec<Stmt> {
        let ctx = self.ctx;
        let module = self.module;
        let live = ctx.live();
        if !live.is_module_live(module.id) {
            return Vec::new();
        }
        let namespace = ctx.linked.namespace(module.id);
        let mut out = Vec::new();

        // Object that receives the module's exports, if one is built.
        let mut target = None;
        if self.wrapped {
            if module.kind == ModuleKind::Esm {
                self.state.helpers |= Helpers::MARK_AS_MODULE;
                out.push(expr_stmt(call(ident("__markAsModule"), vec![ident("exports")])));
                target = Some(ident("exports"));
            }
        } else if live.is_namespace_live(module.id)
            && let Some(symbol) = ctx.linked.symbols.namespace(module.id)
        {
            let name = ctx.name(symbol);
            out.push(var_decl(VarKind::Var, &name, Some(object(vec![]))));
            target = Some(ident(&name));
        }
        if let Some(target) = &target
            && let Some(namespace) = namespace
            && !namespace.exports.is_empty()
        {
            out.push(self.export_getters(target.clone(), namespace));
        }

        for part in live.live_parts(module.id) {
            self.emit_part(part, &mut out);
        }

        if let Some(target) = target
            && let Some(namespace) = namespace
        {
            for &dynamic in &namespace.dynamic {
                self.state.helpers |= Helpers::RE_EXPORT;
                out.push(expr_stmt(call(
                    ident("__reExport"),
                    vec![target.clone(), ident(&ctx.name(dynamic))],
                )));
            }
        }

        if !self.wrapped {
            return out;
        }
        let Some(wrapper) = ctx.linked.symbols.wrapper(module.id) else {
            return out;
        };
        self.state.helpers |= Helpers::COMMON_JS;
        let closure = function_expr(None, &["exports", "module"], out);
        vec![var_decl(
            VarKind::Var,
            &ctx.name(wrapper),
            Some(call(
                ident("__commonJS"),
                vec![object(vec![(module.display.as_str(), closure)])],
            )),
        )]
    }

    /// `__export(target, { a: () => a, ... })`
    fn export_getters(&mut self, target: Expr, namespace: &NamespaceExports) -> Stmt {
        self.state.helpers |= Helpers::EXPORT;
        let getters = namespace
            .exports
            .iter()
            .map(|(name, binding)| (name.as_str(), arrow(&[], self.ctx.binding_expr(binding))))
            .collect();
        expr_stmt(call(ident("__export"), vec![target, object(getters)]))
    }

    fn emit_part(&mut self, part: u32, out: &mut Vec<Stmt>) {
        let Some(stmt) = self.module.stmts.get(part as usize) else {
            return;
        };
        match stmt {
            Stmt::Import(decl) => self.import_decl(decl, out),
            Stmt::ExportNamed(export) => {
                if export.source.is_some()
                    && !export.type_only
                    && let Some(record) = export.record
                {
                    self.reexport(record, part, out);
                }
            }
            Stmt::ExportAll(export) => {
                if let Some(record) = export.record {
                    self.reexport(record, part, out);
                }
            }
            Stmt::ExportDecl(inner) => self.user_stmt((**inner).clone(), out),
            Stmt::ExportDefault(value) => {
                let stmt = self.default_decl(value);
                self.user_stmt(stmt, out);
            }
            Stmt::TypeOnly | Stmt::Empty => {}
            other => self.user_stmt(other.clone(), out),
        }
    }

    fn user_stmt(&mut self, stmt: Stmt, out: &mut Vec<Stmt>) {
        // Dead branches may hold `await`, which a wrapped closure cannot run.
        let Some(mut stmt) = stmt.fold_constant_branches() else {
            return;
        };
        rewrite_stmts(std::slice::from_mut(&mut stmt), self);
        out.push(stmt);
    }

    /// `export default` as a plain declaration of the default local.
    fn default_decl(&self, value: &DefaultValue) -> Stmt {
        match value {
            DefaultValue::Expr(expr) => {
                let expr = match (&self.module.asset, expr) {
                    (Some(asset), Expr::Str(_)) => str_lit(&self.ctx.path_to(&asset.file_name)),
                    _ => expr.clone(),
                };
                var_decl(VarKind::Var, DEFAULT_EXPORT_LOCAL, Some(expr))
            }
            DefaultValue::Function(function) => {
                let mut function = function.clone();
                if function.name.is_none() {
                    function.name = Some(DEFAULT_EXPORT_LOCAL.to_string());
                }
                Stmt::Function(function)
            }
            DefaultValue::Class(class) => {
                let mut class = class.clone();
                if class.name.is_none() {
                    class.name = Some(DEFAULT_EXPORT_LOCAL.to_string());
                }
                Stmt::Class(class)
            }
        }
    }

    fn local_name(&self, local: &str) -> String {
        match self.ctx.linked.symbols.lookup(self.module.id, local) {
            Some(symbol) => self.ctx.name(symbol),
            None => local.to_string(),
        }
    }

    fn live_interop(&self, target: InteropTarget) -> Option<String> {
        let symbol = self.ctx.linked.symbols.interop(self.module.id, &target)?;
        self.ctx
            .live()
            .is_symbol_live(symbol)
            .then(|| self.ctx.name(symbol))
    }

    /// Run a wrapped or external module the first time this module imports
    /// it. Later imports of the same target share the interop object.
    fn require_once(&mut self, target: InteropTarget, out: &mut Vec<Stmt>) {
        if self.required.contains(&target) {
            return;
        }
        let init = match &target {
            InteropTarget::Module(module) => match self.ctx.wrapper_call(*module) {
                Some(init) => init,
                None => return,
            },
            InteropTarget::External(specifier) => self.require_external(specifier),
        };
        let interop = self.live_interop(target.clone());
        let stmt = self.interop_stmt(interop, init);
        out.push(stmt);
        self.required.insert(target);
    }

    /// `var import_x = __toESM(init)`, or just `init;` when nothing reads
    /// the interop object.
    fn interop_stmt(&mut self, interop: Option<String>, init: Expr) -> Stmt {
        match interop {
            Some(name) => {
                self.state.helpers |= Helpers::TO_ESM;
                var_decl(
                    VarKind::Var,
                    &name,
                    Some(call(ident("__toESM"), vec![init])),
                )
            }
            None => expr_stmt(init),
        }
    }

    fn require_external(&mut self, specifier: &str) -> Expr {
        self.state
            .import(specifier, ImportKind::RequireCall, true);
        if self.ctx.options.format == Format::Cjs {
            call(ident("require"), vec![str_lit(specifier)])
        } else {
            self.state.helpers |= Helpers::REQUIRE;
            call(ident("__require"), vec![str_lit(specifier)])
        }
    }

    fn import_decl(&mut self, decl: &ImportDecl, out: &mut Vec<Stmt>) {
        if decl.type_only {
            return;
        }
        let Some(record) = decl.record else {
            return;
        };
        match self.module.record_target(record) {
            RecordTarget::Module(target) => {
                let target = *target;
                if !self.ctx.linked.is_wrapped(target) {
                    return;
                }
                self.require_once(InteropTarget::Module(target), out);
            }
            RecordTarget::External(specifier) => {
                if self.ctx.esm_output() {
                    let hoisted = ImportDecl {
                        specifier: specifier.clone(),
                        default: decl.default.as_deref().map(|local| self.local_name(local)),
                        namespace: decl.namespace.as_deref().map(|local| self.local_name(local)),
                        named: decl
                            .named
                            .iter()
                            .filter(|spec| !spec.type_only)
                            .map(|spec| ImportSpecifier {
                                imported: spec.imported.clone(),
                                local: self.local_name(&spec.local),
                                type_only: false,
                            })
                            .collect(),
                        type_only: false,
                        span: Span::dummy(),
                        record: None,
                    };
                    self.hoist(specifier, hoisted);
                } else {
                    self.require_once(InteropTarget::External(specifier.clone()), out);
                }
            }
            RecordTarget::Unresolved => {}
        }
    }

    fn hoist(&mut self, specifier: &str, decl: ImportDecl) {
        self.state
            .import(specifier, ImportKind::ImportStatement, true);
        let stmt = Stmt::Import(decl);
        if !self.state.hoisted.contains(&stmt) {
            self.state.hoisted.push(stmt);
        }
    }

    /// `export { a } from` and `export *` statements. Concatenated targets
    /// need nothing here: the namespace getters and the entry exports refer
    /// to the target's bindings directly.
    fn reexport(&mut self, record: u32, part: u32, out: &mut Vec<Stmt>) {
        match self.module.record_target(record) {
            RecordTarget::Module(target) => {
                let target = *target;
                if !self.ctx.linked.is_wrapped(target) {
                    return;
                }
                self.require_once(InteropTarget::Module(target), out);
            }
            RecordTarget::External(specifier) if self.ctx.esm_output() => {
                let specifier = specifier.clone();
                self.hoist_reexport(&specifier, part);
            }
            RecordTarget::External(specifier) => {
                self.require_once(InteropTarget::External(specifier.clone()), out);
            }
            RecordTarget::Unresolved => {}
        }
    }

    /// Imports that declare the bindings an external re-export part owns.
    fn hoist_reexport(&mut self, specifier: &str, part: u32) {
        let symbols = &self.ctx.linked.symbols;
        let live = self.ctx.live();
        let mut named = Vec::new();
        let mut namespaces = Vec::new();
        for &symbol in symbols.part_symbols(self.module.id, part) {
            if !live.is_symbol_live(symbol) {
                continue;
            }
            match symbols.symbol(symbol).kind {
                SymbolKind::Import => {
                    let Some(import) = symbols.import(symbol) else {
                        continue;
                    };
                    let local = self.ctx.name(symbol);
                    if import.imported == "*" {
                        namespaces.push(local);
                    } else {
                        named.push(ImportSpecifier {
                            imported: import.imported.clone(),
                            local,
                            type_only: false,
                        });
                    }
                }
                SymbolKind::Interop => namespaces.push(self.ctx.name(symbol)),
                _ => {}
            }
        }
        let decl = |namespace: Option<String>, named: Vec<ImportSpecifier>| ImportDecl {
            specifier: specifier.to_string(),
            default: None,
            namespace,
            named,
            type_only: false,
            span: Span::dummy(),
            record: None,
        };
        if !named.is_empty() {
            self.hoist(specifier, decl(None, named));
        }
        for namespace in namespaces {
            self.hoist(specifier, decl(Some(namespace), Vec::new()));
        }
    }

    fn dynamic_import(&mut self, target: ModuleId) -> Expr {
        let ctx = self.ctx;
        let wrapped = ctx.linked.is_wrapped(target);
        if ctx.options.splitting
            && let Some(chunk) = ctx.chunk_graph.entry_chunk(target)
        {
            let path = ctx.chunk_graph.import_path(ctx.chunk, chunk);
            self.state.import(&path, ImportKind::DynamicImport, false);
            let import = Expr::DynamicImport {
                arg: Box::new(str_lit(&path)),
                record: None,
            };
            if !wrapped {
                return import;
            }
            self.state.helpers |= Helpers::TO_ESM;
            return method_call(
                import,
                "then",
                vec![arrow(
                    &["m"],
                    call(ident("__toESM"), vec![member(ident("m"), "default")]),
                )],
            );
        }
        let Some(init) = ctx.wrapper_call(target) else {
            return Expr::Undefined;
        };
        self.state.helpers |= Helpers::TO_ESM;
        method_call(
            method_call(ident("Promise"), "resolve", vec![]),
            "then",
            vec![arrow(&[], call(ident("__toESM"), vec![init]))],
        )
    }

    fn record_span(&self, record: u32) -> Span {
        self.module
            .records
            .get(record as usize)
            .map(|record| record.span)
            .unwrap_or_else(Span::dummy)
    }
}

impl Rewriter for ModuleEmitter<'_, '_> {
    fn ident(&mut self, name: &str, _is_write: bool) -> Option<Expr> {
        let symbol = self.ctx.linked.symbols.lookup(self.module.id, name)?;
        Some(self.ctx.binding_expr(&self.ctx.linked.binding(symbol)))
    }

    fn member_path(&mut self, path: &str) -> Option<Expr> {
        let (root, prop) = path.split_once('.')?;
        if prop.contains('.') {
            return None;
        }
        let symbol = self.ctx.linked.symbols.lookup(self.module.id, root)?;
        let Binding::Namespace(target) = self.ctx.linked.binding(symbol) else {
            return None;
        };
        let namespace = self.ctx.linked.namespace(target)?;
        match namespace.get(prop) {
            Some(binding) => Some(self.ctx.binding_expr(binding)),
            None if namespace.dynamic.is_empty() => Some(Expr::Undefined),
            None => None,
        }
    }

    fn top_level_this(&mut self) -> Option<Expr> {
        if self.wrapped {
            Some(ident("exports"))
        } else {
            Some(Expr::Undefined)
        }
    }

    fn import_meta(&mut self) -> Option<Expr> {
        if self.ctx.esm_output() {
            return None;
        }
        if !self.meta_warned {
            self.meta_warned = true;
            self.state.diagnostics.warning(
                self.module.display.clone(),
                Span::dummy(),
                format!(
                    "\"import.meta\" is not available with the \"{}\" output format and will be empty",
                    self.ctx.options.format.name()
                ),
                codes::IMPORT_META_UNAVAILABLE,
            );
        }
        Some(Expr::Object(Vec::new()))
    }

    fn binding(&mut self, name: &str) -> Option<String> {
        let symbol = self.ctx.linked.symbols.lookup(self.module.id, name)?;
        Some(self.ctx.name(symbol))
    }

    fn module_reference(&mut self, expr: &Expr) -> Option<Expr> {
        match expr {
            Expr::Require {
                record: Some(record),
                ..
            } => match self.module.record_target(*record) {
                RecordTarget::Module(target) => self.ctx.wrapper_call(*target),
                RecordTarget::External(specifier) => {
                    if self.ctx.esm_output() {
                        let span = self.record_span(*record);
                        self.state.diagnostics.warning(
                            self.module.display.clone(),
                            span,
                            format!(
                                "\"require\" of \"{}\" stays a run-time call in ESM output",
                                specifier
                            ),
                            codes::UNBUNDLED_REQUIRE,
                        );
                    }
                    Some(self.require_external(specifier))
                }
                RecordTarget::Unresolved => None,
            },
            Expr::DynamicImport {
                record: Some(record),
                ..
            } => match self.module.record_target(*record) {
                RecordTarget::Module(target) => Some(self.dynamic_import(*target)),
                RecordTarget::External(specifier) => {
                    self.state
                        .import(specifier, ImportKind::DynamicImport, true);
                    None
                }
                RecordTarget::Unresolved => None,
            },
            Expr::UrlToken {
                record: Some(record),
                ..
            } => {
                let target = self.module.record_target(*record).module()?;
                let asset = self.ctx.graph.module(target).asset.as_ref()?;
                Some(Expr::UrlToken {
                    specifier: self.ctx.path_to(&asset.file_name),
                    record: None,
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "tests/output_tests.rs"]
mod tests;
