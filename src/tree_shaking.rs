//! Tree Shaking
//!
//! Marks the parts of the linked graph that must survive, starting from the
//! entry points. A part is live when
//! - it belongs to a module that is evaluated and may have side effects,
//! - it declares a symbol a live part uses, or
//! - it is the import statement that evaluates a wrapped or external module
//!   with side effects.
//!
//! A module is evaluated when one of its parts is live, when an evaluated
//! module imports it and it may have side effects, or when it is an entry.
//! `"sideEffects": false` only removes a module from the second rule; an
//! evaluated module without side effects still keeps only the parts that
//! are used.
//!
//! Marking is a worklist over [`Work`] items. The result is a fixpoint, so
//! the order items are processed in does not affect it.

use crate::config::Format;
use crate::diagnostics::{DiagnosticBag, ErrorKind, codes};
use crate::exports::Binding;
use crate::linker::{Dep, LinkedGraph};
use crate::module_graph::{ImportKind, ModuleGraph, ModuleId, RecordTarget};
use crate::parts::PartFlags;
use crate::span::Span;
use crate::symbols::{SymbolId, SymbolKind};
use fixedbitset::FixedBitSet;
use tracing::{debug, debug_span};

/// Live parts, modules, namespace objects and symbols.
#[derive(Clone, Debug)]
pub struct Liveness {
    /// `parts[module]` holds the live part indices of that module
    pub parts: Vec<FixedBitSet>,
    /// Modules evaluated by the bundle
    pub modules: FixedBitSet,
    /// Modules whose namespace object is materialized
    pub namespaces: FixedBitSet,
    pub symbols: FixedBitSet,
}

impl Liveness {
    fn new(graph: &ModuleGraph, linked: &LinkedGraph) -> Self {
        Liveness {
            parts: graph
                .iter()
                .map(|module| FixedBitSet::with_capacity(module.parts.len()))
                .collect(),
            modules: FixedBitSet::with_capacity(graph.len()),
            namespaces: FixedBitSet::with_capacity(graph.len()),
            symbols: FixedBitSet::with_capacity(linked.symbols.len()),
        }
    }

    pub fn is_part_live(&self, module: ModuleId, part: u32) -> bool {
        self.parts[module.index()].contains(part as usize)
    }

    pub fn is_module_live(&self, module: ModuleId) -> bool {
        self.modules.contains(module.index())
    }

    pub fn is_namespace_live(&self, module: ModuleId) -> bool {
        self.namespaces.contains(module.index())
    }

    pub fn is_symbol_live(&self, symbol: SymbolId) -> bool {
        self.symbols.contains(symbol.index())
    }

    /// Live parts of `module` in statement order.
    pub fn live_parts(&self, module: ModuleId) -> impl Iterator<Item = u32> + '_ {
        self.parts[module.index()].ones().map(|part| part as u32)
    }

    /// Union of two markings over the same graph.
    pub fn union_with(&mut self, other: &Liveness) {
        for (mine, theirs) in self.parts.iter_mut().zip(&other.parts) {
            mine.union_with(theirs);
        }
        self.modules.union_with(&other.modules);
        self.namespaces.union_with(&other.namespaces);
        self.symbols.union_with(&other.symbols);
    }
}

#[derive(Clone, Copy, Debug)]
enum Work {
    Module(ModuleId),
    Part(ModuleId, u32),
    Symbol(SymbolId),
    Namespace(ModuleId),
}

/// Mark everything reachable from `roots`. Roots are evaluated
/// unconditionally and every one of their exports counts as used.
pub fn shake(
    graph: &ModuleGraph,
    linked: &LinkedGraph,
    format: Format,
    roots: &[ModuleId],
) -> Liveness {
    let _span = debug_span!("tree_shake", roots = roots.len()).entered();
    let mut shaker = Shaker {
        graph,
        linked,
        live: Liveness::new(graph, linked),
        forced: FixedBitSet::with_capacity(graph.len()),
        work: Vec::new(),
    };
    for &injected in &graph.injected {
        shaker.forced.insert(injected.index());
    }
    for &root in roots {
        shaker.forced.insert(root.index());
        shaker.work.push(Work::Module(root));
        if linked.is_wrapped(root) {
            continue;
        }
        if let Some(namespace) = linked.namespace(root) {
            for (_, binding) in &namespace.exports {
                shaker.use_binding(binding);
            }
            for &symbol in &namespace.dynamic {
                shaker.work.push(Work::Symbol(symbol));
            }
        }
        // Non-ESM entries hand their namespace object to the host.
        if format != Format::Esm && linked.namespace(root).is_some_and(|ns| !ns.is_empty()) {
            shaker.work.push(Work::Namespace(root));
        }
    }
    shaker.run();

    let live = shaker.live;
    debug!(
        modules = live.modules.count_ones(..),
        symbols = live.symbols.count_ones(..),
        "tree shaking complete"
    );
    live
}

struct Shaker<'a> {
    graph: &'a ModuleGraph,
    linked: &'a LinkedGraph,
    live: Liveness,
    /// Modules treated as having side effects regardless of their manifest
    forced: FixedBitSet,
    work: Vec<Work>,
}

impl Shaker<'_> {
    fn run(&mut self) {
        while let Some(item) = self.work.pop() {
            match item {
                Work::Module(module) => self.include_module(module),
                Work::Part(module, part) => self.include_part(module, part),
                Work::Symbol(symbol) => self.use_symbol(symbol),
                Work::Namespace(module) => self.use_namespace(module),
            }
        }
    }

    fn has_side_effects(&self, module: ModuleId) -> bool {
        self.graph.module(module).manifest_side_effects || self.forced.contains(module.index())
    }

    fn include_module(&mut self, id: ModuleId) {
        if self.live.modules.put(id.index()) {
            return;
        }
        let module = self.graph.module(id);

        if self.linked.is_wrapped(id) {
            // The closure body runs as a whole.
            for part in 0..module.parts.len() as u32 {
                self.work.push(Work::Part(id, part));
            }
            if let Some(wrapper) = self.linked.symbols.wrapper(id) {
                self.work.push(Work::Symbol(wrapper));
            }
        } else if self.has_side_effects(id) {
            for (index, part) in module.parts.iter().enumerate() {
                if part.is_force_keep() {
                    self.work.push(Work::Part(id, index as u32));
                }
            }
        }

        for (index, record) in module.records.iter().enumerate() {
            if record.kind != ImportKind::ImportStatement {
                continue;
            }
            let part = self.linked.record_part(id, index as u32);
            match &record.target {
                RecordTarget::Module(target) if self.linked.is_wrapped(*target) => {
                    if self.has_side_effects(*target)
                        && let Some(part) = part
                    {
                        self.work.push(Work::Part(id, part));
                    }
                }
                RecordTarget::Module(target) => {
                    if self.has_side_effects(*target) {
                        self.work.push(Work::Module(*target));
                    }
                }
                RecordTarget::External(_) => {
                    if let Some(part) = part {
                        self.work.push(Work::Part(id, part));
                    }
                }
                RecordTarget::Unresolved => {}
            }
        }
    }

    fn include_part(&mut self, module: ModuleId, part: u32) {
        let parts = &mut self.live.parts[module.index()];
        if (part as usize) >= parts.len() || parts.put(part as usize) {
            return;
        }
        self.work.push(Work::Module(module));
        for symbol in self.linked.symbols.part_symbols(module, part) {
            // Interop objects of a live import must be declared with it.
            if self.linked.symbols.symbol(*symbol).kind == SymbolKind::Interop {
                self.live.symbols.insert(symbol.index());
            }
        }
        for dep in self.linked.part_deps(module, part) {
            match *dep {
                Dep::Symbol(symbol) => self.work.push(Work::Symbol(symbol)),
                Dep::Namespace(target) => self.work.push(Work::Namespace(target)),
                Dep::Module(target) => self.work.push(Work::Module(target)),
            }
        }
    }

    fn use_symbol(&mut self, id: SymbolId) {
        if self.live.symbols.put(id.index()) {
            return;
        }
        let symbol = self.linked.symbols.symbol(id);
        match symbol.kind {
            SymbolKind::Wrapper => self.work.push(Work::Module(symbol.module)),
            SymbolKind::Namespace => self.work.push(Work::Namespace(symbol.module)),
            SymbolKind::Value | SymbolKind::Import | SymbolKind::Interop => {
                for &part in &symbol.parts {
                    self.work.push(Work::Part(symbol.module, part));
                }
            }
        }
    }

    fn use_namespace(&mut self, module: ModuleId) {
        if self.live.namespaces.put(module.index()) {
            return;
        }
        if let Some(symbol) = self.linked.symbols.namespace(module) {
            self.live.symbols.insert(symbol.index());
        }
        self.work.push(Work::Module(module));
        let Some(namespace) = self.linked.namespace(module) else {
            return;
        };
        for (_, binding) in &namespace.exports {
            self.use_binding(binding);
        }
        for &symbol in &namespace.dynamic {
            self.work.push(Work::Symbol(symbol));
        }
    }

    fn use_binding(&mut self, binding: &Binding) {
        match binding {
            Binding::Symbol(symbol) => self.work.push(Work::Symbol(*symbol)),
            Binding::Property { object, .. } => self.work.push(Work::Symbol(*object)),
            Binding::Namespace(module) => self.work.push(Work::Namespace(*module)),
            Binding::Missing => {}
        }
    }
}

/// Shake once per entry without splitting (each output bundle only gets
/// what its own entry reaches), or once over all entries with splitting.
pub fn shake_entries(
    graph: &ModuleGraph,
    linked: &LinkedGraph,
    format: Format,
    splitting: bool,
) -> Vec<Liveness> {
    if splitting {
        vec![shake(graph, linked, format, &linked.entries)]
    } else {
        linked
            .entries
            .iter()
            .map(|&entry| shake(graph, linked, format, &[entry]))
            .collect()
    }
}

/// Top-level `await` only survives into ESM output.
pub fn check_top_level_await(
    graph: &ModuleGraph,
    live: &Liveness,
    format: Format,
    diagnostics: &mut DiagnosticBag,
) {
    if format == Format::Esm {
        return;
    }
    for module in graph.iter() {
        let has_live_await = live.live_parts(module.id).any(|part| {
            module.parts[part as usize]
                .flags
                .contains(PartFlags::HAS_TLA)
        });
        if has_live_await {
            diagnostics.error(
                ErrorKind::FormatCompatibility,
                module.display.clone(),
                Span::dummy(),
                format!(
                    "Top-level await is currently not supported with the \"{}\" output format",
                    format.name()
                ),
                codes::TOP_LEVEL_AWAIT_FORMAT,
            );
        }
    }
}

#[cfg(test)]
#[path = "tests/tree_shaking_tests.rs"]
mod tests;
