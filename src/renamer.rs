//! Renamer
//!
//! Module-scope bindings of different modules share one scope once they
//! are concatenated into a chunk. The renamer gives every symbol that is
//! declared in the output a name that is unique across that scope:
//! - symbols claim names in chunk evaluation order, so the first module to
//!   use `x` keeps it and later ones get `x2`, `x3`, ...
//! - reserved words, helper names, globals the code reads and names bound
//!   in nested scopes of live code are never claimed, so no rename can
//!   capture or shadow a reference
//!
//! With code splitting, one renamer covers every chunk so that a symbol
//! has the same name in the chunk that exports it and in every chunk that
//! imports it.

use crate::ast::RESERVED_WORDS;
use crate::chunks::ChunkGraph;
use crate::exports::Binding;
use crate::linker::LinkedGraph;
use crate::module_graph::ModuleGraph;
use crate::runtime::helper_names;
use crate::symbols::{SymbolId, SymbolKind};
use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

/// Free names a wrapped CommonJS closure receives or reads.
const MODULE_GLOBALS: &[&str] = &["exports", "module", "require"];

/// Names no symbol may take in any chunk.
static ALWAYS_RESERVED: Lazy<FxHashSet<String>> = Lazy::new(|| {
    RESERVED_WORDS
        .iter()
        .chain(MODULE_GLOBALS)
        .copied()
        .chain(helper_names())
        .map(str::to_string)
        .collect()
});

/// Final output names.
#[derive(Clone, Debug, Default)]
pub struct Names {
    names: FxHashMap<SymbolId, String>,
}

impl Names {
    pub fn get(&self, symbol: SymbolId) -> Option<&str> {
        self.names.get(&symbol).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

struct Renamer<'a> {
    linked: &'a LinkedGraph,
    reserved: FxHashSet<String>,
    taken: FxHashSet<String>,
    names: FxHashMap<SymbolId, String>,
}

impl Renamer<'_> {
    fn claim(&mut self, symbol: SymbolId) {
        if self.names.contains_key(&symbol) {
            return;
        }
        let base = self.linked.symbols.base(symbol);
        let mut name = base.to_string();
        let mut counter = 2;
        while self.reserved.contains(&name) || self.taken.contains(&name) {
            name = format!("{}{}", base, counter);
            counter += 1;
        }
        trace!(symbol = symbol.0, name = %name, "name claimed");
        self.taken.insert(name.clone());
        self.names.insert(symbol, name);
    }
}

/// Assign names for the code of `chunks`, which share one scope.
pub fn assign_names(
    graph: &ModuleGraph,
    linked: &LinkedGraph,
    chunk_graph: &ChunkGraph,
    chunks: &[usize],
) -> Names {
    let mut reserved = ALWAYS_RESERVED.clone();
    for &index in chunks {
        let live = chunk_graph.live(index);
        for &module in &chunk_graph.chunks[index].modules {
            let module = graph.module(module);
            reserved.extend(module.analysis.unbound.iter().cloned());
            for part in live.live_parts(module.id) {
                reserved.extend(module.parts[part as usize].refs.nested.iter().cloned());
            }
        }
    }

    let mut renamer = Renamer {
        linked,
        reserved,
        taken: FxHashSet::default(),
        names: FxHashMap::default(),
    };
    for &index in chunks {
        let chunk = &chunk_graph.chunks[index];
        let live = chunk_graph.live(index);
        for symbols in chunk.imports.values() {
            for &symbol in symbols {
                renamer.claim(symbol);
            }
        }
        for &module in &chunk.modules {
            if live.is_namespace_live(module)
                && let Some(namespace) = linked.symbols.namespace(module)
            {
                renamer.claim(namespace);
            }
            if let Some(wrapper) = linked.symbols.wrapper(module)
                && live.is_symbol_live(wrapper)
            {
                renamer.claim(wrapper);
            }
            for part in live.live_parts(module) {
                for &symbol in linked.symbols.part_symbols(module, part) {
                    let declared = match linked.symbols.symbol(symbol).kind {
                        SymbolKind::Value | SymbolKind::Interop => true,
                        // Imports resolved elsewhere are never declared.
                        SymbolKind::Import => linked.binding(symbol) == Binding::Symbol(symbol),
                        SymbolKind::Namespace | SymbolKind::Wrapper => false,
                    };
                    if declared {
                        renamer.claim(symbol);
                    }
                }
            }
        }
        if let Some(entry) = chunk.entry() {
            let mut temps: Vec<(&String, SymbolId)> = linked
                .export_temps
                .iter()
                .filter(|((module, _), _)| *module == entry)
                .map(|((_, name), &symbol)| (name, symbol))
                .collect();
            temps.sort();
            for (_, symbol) in temps {
                renamer.claim(symbol);
            }
        }
    }
    Names {
        names: renamer.names,
    }
}
