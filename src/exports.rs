//! Export Tables and Export Resolution
//!
//! This module answers "what does `import { name } from T` refer to":
//! - own exports (declarations, `export { a as b }`, `export default`)
//! - re-exports (`export { a } from`), followed to the declaring module
//! - star exports (`export * from`), merged unless two distinct origins
//!   provide the same name, in which case the name is ambiguous
//! - wrapped (CommonJS) and external modules, whose exports are read as
//!   properties of an interop object at run time
//!
//! Resolution walks the "what does this export alias" relation depth first
//! with an explicit stack. Meeting a `(module, name)` pair already on the
//! stack is a re-export cycle. Cycles closed through `export *` are legal
//! and simply contribute nothing; cycles made only of explicit re-exports
//! are errors reported with the full chain.

use crate::module_graph::{ModuleGraph, ModuleId, RecordTarget};
use crate::symbols::{InteropTarget, SymbolArena, SymbolId};
use fixedbitset::FixedBitSet;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Names a module exports through its own statements.
#[derive(Clone, Debug, Default)]
pub struct ExportTable {
    /// Exported name → local or hidden import symbol, in source order
    pub own: IndexMap<String, SymbolId>,
    /// Record indices of `export * from` statements, in source order
    pub stars: Vec<u32>,
}

/// What a resolved import stands for in the output.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Binding {
    /// A symbol in some module's scope
    Symbol(SymbolId),
    /// The namespace object of an (unwrapped) ECMAScript module
    Namespace(ModuleId),
    /// `object.name` read at run time
    Property { object: SymbolId, name: String },
    /// Known to be `undefined`
    Missing,
}

impl Binding {
    /// The symbol whose liveness the binding depends on.
    pub fn symbol(&self, symbols: &SymbolArena) -> Option<SymbolId> {
        match self {
            Binding::Symbol(id) => Some(*id),
            Binding::Namespace(module) => symbols.namespace(*module),
            Binding::Property { object, .. } => Some(*object),
            Binding::Missing => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportResolution {
    Found(Binding),
    NotFound,
    /// Distinct origins reached through different `export *` statements
    Ambiguous(Vec<ModuleId>),
    /// Explicit re-exports loop back; the chain ends where it started
    Cycle(Vec<(ModuleId, String)>),
    /// Only an external `export *` could provide the name
    External,
}

/// The statically known exports of a module, as its namespace object
/// would expose them.
#[derive(Clone, Debug, Default)]
pub struct NamespaceExports {
    /// Sorted by name; ambiguous names are omitted
    pub exports: Vec<(String, Binding)>,
    /// Interop objects copied in at run time with `__reExport`
    pub dynamic: Vec<SymbolId>,
    /// External specifiers re-exported with `export *`
    pub external_stars: Vec<String>,
}

impl NamespaceExports {
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.exports
            .binary_search_by(|(candidate, _)| candidate.as_str().cmp(name))
            .ok()
            .map(|index| &self.exports[index].1)
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty() && self.dynamic.is_empty()
    }
}

/// Stack frame: the pair being resolved and whether it was entered
/// through an `export *`.
#[derive(Debug)]
struct Frame {
    module: ModuleId,
    name: String,
    via_star: bool,
}

pub struct ExportResolver<'a> {
    graph: &'a ModuleGraph,
    symbols: &'a SymbolArena,
    tables: &'a [ExportTable],
    wrapped: &'a FixedBitSet,
    /// External imports stay `import` statements in ESM output
    esm_output: bool,
    cache: FxHashMap<(ModuleId, String), ExportResolution>,
    namespaces: FxHashMap<ModuleId, Arc<NamespaceExports>>,
    stack: Vec<Frame>,
    /// Bumped whenever a cycle is cut; results computed across a cut
    /// depend on the stack and are not cached
    cuts: usize,
}

impl<'a> ExportResolver<'a> {
    pub fn new(
        graph: &'a ModuleGraph,
        symbols: &'a SymbolArena,
        tables: &'a [ExportTable],
        wrapped: &'a FixedBitSet,
        esm_output: bool,
    ) -> Self {
        ExportResolver {
            graph,
            symbols,
            tables,
            wrapped,
            esm_output,
            cache: FxHashMap::default(),
            namespaces: FxHashMap::default(),
            stack: Vec::new(),
            cuts: 0,
        }
    }

    fn is_wrapped(&self, module: ModuleId) -> bool {
        self.wrapped.contains(module.index())
    }

    /// Resolve an import symbol to what it ultimately refers to. Symbols
    /// that are not imports resolve to themselves.
    pub fn resolve_import(&mut self, symbol: SymbolId) -> ExportResolution {
        let symbols = self.symbols;
        let Some(import) = symbols.import(symbol) else {
            return ExportResolution::Found(Binding::Symbol(symbol));
        };
        let importer = symbols.symbol(symbol).module;
        let graph = self.graph;
        let target = graph.module(importer).record_target(import.record);
        self.resolve_through(importer, target, &import.imported, symbol, false)
    }

    /// Resolve `name` as exported by `module`.
    pub fn resolve_export(&mut self, module: ModuleId, name: &str) -> ExportResolution {
        if self.is_wrapped(module) {
            return ExportResolution::NotFound;
        }
        self.resolve_in(module, name, false)
    }

    fn resolve_through(
        &mut self,
        importer: ModuleId,
        target: &RecordTarget,
        name: &str,
        symbol: SymbolId,
        via_star: bool,
    ) -> ExportResolution {
        match target {
            RecordTarget::Unresolved => ExportResolution::Found(Binding::Missing),
            RecordTarget::External(specifier) => {
                if self.esm_output {
                    return ExportResolution::Found(Binding::Symbol(symbol));
                }
                let target = InteropTarget::External(specifier.clone());
                match self.symbols.interop(importer, &target) {
                    Some(object) => ExportResolution::Found(property(object, name)),
                    None => ExportResolution::Found(Binding::Missing),
                }
            }
            RecordTarget::Module(target) => {
                let target = *target;
                if self.is_wrapped(target) {
                    return match self.symbols.interop(importer, &InteropTarget::Module(target)) {
                        Some(object) => ExportResolution::Found(property(object, name)),
                        None => ExportResolution::Found(Binding::Missing),
                    };
                }
                if name == "*" {
                    return ExportResolution::Found(Binding::Namespace(target));
                }
                self.resolve_in(target, name, via_star)
            }
        }
    }

    fn resolve_in(&mut self, module: ModuleId, name: &str, via_star: bool) -> ExportResolution {
        let key = (module, name.to_string());
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        if let Some(position) = self
            .stack
            .iter()
            .position(|frame| frame.module == module && frame.name == name)
        {
            self.cuts += 1;
            let through_star = via_star || self.stack[position + 1..].iter().any(|f| f.via_star);
            if through_star {
                return ExportResolution::NotFound;
            }
            let mut chain: Vec<(ModuleId, String)> = self.stack[position..]
                .iter()
                .map(|frame| (frame.module, frame.name.clone()))
                .collect();
            chain.push((module, name.to_string()));
            return ExportResolution::Cycle(chain);
        }

        self.stack.push(Frame {
            module,
            name: name.to_string(),
            via_star,
        });
        let cuts_before = self.cuts;
        let result = self.compute(module, name);
        self.stack.pop();
        if self.cuts == cuts_before {
            self.cache.insert(key, result.clone());
        }
        result
    }

    fn compute(&mut self, module: ModuleId, name: &str) -> ExportResolution {
        let tables = self.tables;
        let table = &tables[module.index()];
        if let Some(&symbol) = table.own.get(name) {
            return self.follow_own(symbol);
        }
        // `export *` never forwards a default export.
        if name == "default" {
            return ExportResolution::NotFound;
        }

        let graph = self.graph;
        let mut found: Vec<(Binding, ModuleId)> = Vec::new();
        let mut dynamic = None;
        let mut external = false;
        for &record in &table.stars {
            match graph.module(module).record_target(record) {
                RecordTarget::Module(source) if self.is_wrapped(*source) => {
                    if dynamic.is_none()
                        && let Some(object) = self
                            .symbols
                            .interop(module, &InteropTarget::Module(*source))
                    {
                        dynamic = Some(property(object, name));
                    }
                }
                RecordTarget::Module(source) => {
                    let source = *source;
                    if let ExportResolution::Found(binding) = self.resolve_in(source, name, true)
                        && !found.iter().any(|(existing, _)| *existing == binding)
                    {
                        found.push((binding, source));
                    }
                }
                RecordTarget::External(specifier) => {
                    external = true;
                    if dynamic.is_none()
                        && let Some(object) = self
                            .symbols
                            .interop(module, &InteropTarget::External(specifier.clone()))
                    {
                        dynamic = Some(property(object, name));
                    }
                }
                RecordTarget::Unresolved => {}
            }
        }

        match found.len() {
            1 => ExportResolution::Found(found.swap_remove(0).0),
            0 => match dynamic {
                Some(binding) => ExportResolution::Found(binding),
                None if external => ExportResolution::External,
                None => ExportResolution::NotFound,
            },
            _ => ExportResolution::Ambiguous(found.into_iter().map(|(_, origin)| origin).collect()),
        }
    }

    fn follow_own(&mut self, symbol: SymbolId) -> ExportResolution {
        let symbols = self.symbols;
        let Some(import) = symbols.import(symbol) else {
            return ExportResolution::Found(Binding::Symbol(symbol));
        };
        let importer = symbols.symbol(symbol).module;
        let graph = self.graph;
        let target = graph.module(importer).record_target(import.record);
        self.resolve_through(importer, target, &import.imported, symbol, false)
    }

    /// The namespace object contents of `module`. Works for wrapped
    /// ECMAScript modules too, where every star is dynamic.
    pub fn namespace(&mut self, module: ModuleId) -> Arc<NamespaceExports> {
        if let Some(hit) = self.namespaces.get(&module) {
            return hit.clone();
        }

        let mut names = IndexSet::new();
        let mut dynamic = IndexSet::new();
        let mut external_stars = Vec::new();
        let mut visited = FixedBitSet::with_capacity(self.graph.len());
        self.collect_names(module, true, &mut names, &mut dynamic, &mut external_stars, &mut visited);

        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        let wrapped = self.is_wrapped(module);
        let tables = self.tables;
        let mut exports = Vec::with_capacity(names.len());
        for name in names {
            let resolution = if wrapped {
                match tables[module.index()].own.get(&name) {
                    Some(&symbol) => self.follow_own(symbol),
                    None => ExportResolution::NotFound,
                }
            } else {
                self.resolve_in(module, &name, false)
            };
            if let ExportResolution::Found(binding) = resolution
                && binding != Binding::Missing
            {
                exports.push((name, binding));
            }
        }

        let result = Arc::new(NamespaceExports {
            exports,
            dynamic: dynamic.into_iter().collect(),
            external_stars,
        });
        self.namespaces.insert(module, result.clone());
        result
    }

    fn collect_names(
        &self,
        module: ModuleId,
        is_root: bool,
        names: &mut IndexSet<String>,
        dynamic: &mut IndexSet<SymbolId>,
        external_stars: &mut Vec<String>,
        visited: &mut FixedBitSet,
    ) {
        if visited.put(module.index()) {
            return;
        }
        let table = &self.tables[module.index()];
        for name in table.own.keys() {
            // A star never forwards `default`.
            if is_root || name != "default" {
                names.insert(name.clone());
            }
        }
        for &record in &table.stars {
            match self.graph.module(module).record_target(record) {
                RecordTarget::Module(source) if !self.is_wrapped(*source) && !self.is_wrapped(module) => {
                    self.collect_names(*source, false, names, dynamic, external_stars, visited);
                }
                RecordTarget::Module(source) => {
                    if let Some(object) =
                        self.symbols.interop(module, &InteropTarget::Module(*source))
                    {
                        dynamic.insert(object);
                    }
                }
                RecordTarget::External(specifier) => {
                    if let Some(object) = self
                        .symbols
                        .interop(module, &InteropTarget::External(specifier.clone()))
                    {
                        dynamic.insert(object);
                    }
                    external_stars.push(specifier.clone());
                }
                RecordTarget::Unresolved => {}
            }
        }
    }
}

fn property(object: SymbolId, name: &str) -> Binding {
    if name == "*" {
        Binding::Symbol(object)
    } else {
        Binding::Property {
            object,
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "tests/exports_tests.rs"]
mod tests;
