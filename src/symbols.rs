//! Symbol arena.
//!
//! Every module-scope binding of every module, plus the bindings the linker
//! synthesizes (namespace objects, CommonJS wrappers, interop objects), is a
//! [`Symbol`] in one arena per build. Symbols are addressed by [`SymbolId`]
//! and never removed, so ids stay valid for the rest of the pipeline.
//!
//! Names are interned in the arena's own [`Interner`]; nothing here is
//! process-global.

use crate::interner::{Atom, Interner};
use crate::module_graph::ModuleId;
use crate::span::Span;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// A declaration in module scope
    Value,
    /// An import binding. Also used for the hidden bindings behind
    /// `export { a } from` and `export * as ns from`.
    Import,
    /// `<stem>_exports`, the namespace object of an ECMAScript module
    Namespace,
    /// `require_<stem>`, the lazy initializer of a wrapped module
    Wrapper,
    /// `import_<stem>`, an importer's handle on a wrapped or external module
    Interop,
}

#[derive(Clone, Debug)]
pub struct Symbol {
    /// Name as written in the module
    pub name: Atom,
    /// Preferred name in the output
    pub base: Atom,
    pub module: ModuleId,
    pub kind: SymbolKind,
    /// Parts whose evaluation declares the symbol
    pub parts: SmallVec<[u32; 1]>,
}

/// Where an import binding points before linking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportBinding {
    /// Import record index in the importing module
    pub record: u32,
    /// Imported name; `"*"` for namespace imports
    pub imported: String,
    pub span: Span,
}

/// What an interop object stands for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InteropTarget {
    Module(ModuleId),
    External(String),
}

#[derive(Debug)]
pub struct SymbolArena {
    interner: Interner,
    symbols: Vec<Symbol>,
    scopes: Vec<FxHashMap<Atom, SymbolId>>,
    imports: FxHashMap<SymbolId, ImportBinding>,
    namespaces: Vec<Option<SymbolId>>,
    wrappers: Vec<Option<SymbolId>>,
    interop: IndexMap<(ModuleId, InteropTarget), SymbolId>,
    /// Symbols declared by each part, in creation order
    part_symbols: Vec<FxHashMap<u32, SmallVec<[SymbolId; 2]>>>,
}

impl SymbolArena {
    pub fn new(module_count: usize) -> Self {
        SymbolArena {
            interner: Interner::new(),
            symbols: Vec::new(),
            scopes: vec![FxHashMap::default(); module_count],
            imports: FxHashMap::default(),
            namespaces: vec![None; module_count],
            wrappers: vec![None; module_count],
            interop: IndexMap::new(),
            part_symbols: vec![FxHashMap::default(); module_count],
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn name(&self, id: SymbolId) -> &str {
        self.interner.resolve(self.symbols[id.index()].name)
    }

    pub fn base(&self, id: SymbolId) -> &str {
        self.interner.resolve(self.symbols[id.index()].base)
    }

    pub fn ids(&self) -> impl Iterator<Item = SymbolId> + use<> {
        (0..self.symbols.len() as u32).map(SymbolId)
    }

    /// Add a symbol that is not reachable by name from module scope.
    pub fn add(
        &mut self,
        module: ModuleId,
        name: &str,
        base: &str,
        kind: SymbolKind,
        part: Option<u32>,
    ) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        let symbol = Symbol {
            name: self.interner.intern(name),
            base: self.interner.intern(base),
            module,
            kind,
            parts: part.into_iter().collect(),
        };
        self.symbols.push(symbol);
        if let Some(part) = part {
            self.part_symbols[module.index()]
                .entry(part)
                .or_default()
                .push(id);
        }
        id
    }

    /// Declare `name` in the module scope of `module`. Redeclarations
    /// (`var x; var x;`, `function f` after `var f`) share one symbol.
    pub fn declare(
        &mut self,
        module: ModuleId,
        name: &str,
        base: &str,
        kind: SymbolKind,
        part: u32,
    ) -> SymbolId {
        let atom = self.interner.intern(name);
        if let Some(&existing) = self.scopes[module.index()].get(&atom) {
            let symbol = &mut self.symbols[existing.index()];
            if !symbol.parts.contains(&part) {
                symbol.parts.push(part);
            }
            return existing;
        }
        let id = self.add(module, name, base, kind, Some(part));
        self.scopes[module.index()].insert(atom, id);
        id
    }

    pub fn lookup(&self, module: ModuleId, name: &str) -> Option<SymbolId> {
        let atom = self.interner.get(name)?;
        self.scopes[module.index()].get(&atom).copied()
    }

    pub fn set_import(&mut self, id: SymbolId, binding: ImportBinding) {
        self.imports.insert(id, binding);
    }

    pub fn import(&self, id: SymbolId) -> Option<&ImportBinding> {
        self.imports.get(&id)
    }

    pub fn set_namespace(&mut self, module: ModuleId, id: SymbolId) {
        self.namespaces[module.index()] = Some(id);
    }

    pub fn namespace(&self, module: ModuleId) -> Option<SymbolId> {
        self.namespaces[module.index()]
    }

    pub fn set_wrapper(&mut self, module: ModuleId, id: SymbolId) {
        self.wrappers[module.index()] = Some(id);
    }

    pub fn wrapper(&self, module: ModuleId) -> Option<SymbolId> {
        self.wrappers[module.index()]
    }

    /// The interop object `importer` uses for `target`, created on first
    /// request and declared by `part`.
    pub fn add_interop(
        &mut self,
        importer: ModuleId,
        target: InteropTarget,
        base: &str,
        part: u32,
    ) -> SymbolId {
        if let Some(&existing) = self.interop.get(&(importer, target.clone())) {
            return existing;
        }
        let id = self.add(importer, base, base, SymbolKind::Interop, Some(part));
        self.interop.insert((importer, target), id);
        id
    }

    pub fn interop(&self, importer: ModuleId, target: &InteropTarget) -> Option<SymbolId> {
        self.interop.get(&(importer, target.clone())).copied()
    }

    /// The target an interop symbol stands for.
    pub fn interop_target(&self, id: SymbolId) -> Option<&InteropTarget> {
        self.interop
            .iter()
            .find(|&(_, &symbol)| symbol == id)
            .map(|((_, target), _)| target)
    }

    /// Symbols declared by `part` of `module`, in creation order.
    pub fn part_symbols(&self, module: ModuleId, part: u32) -> &[SymbolId] {
        self.part_symbols[module.index()]
            .get(&part)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeclaration_shares_symbol() {
        let mut arena = SymbolArena::new(1);
        let module = ModuleId(0);
        let first = arena.declare(module, "x", "x", SymbolKind::Value, 0);
        let second = arena.declare(module, "x", "x", SymbolKind::Value, 3);
        assert_eq!(first, second);
        assert_eq!(arena.symbol(first).parts.as_slice(), &[0, 3]);
        assert_eq!(arena.lookup(module, "x"), Some(first));
        assert_eq!(arena.lookup(module, "y"), None);
    }

    #[test]
    fn test_hidden_symbols_are_not_in_scope() {
        let mut arena = SymbolArena::new(1);
        let module = ModuleId(0);
        let hidden = arena.add(module, "a", "a", SymbolKind::Import, Some(1));
        assert_eq!(arena.lookup(module, "a"), None);
        assert_eq!(arena.part_symbols(module, 1), &[hidden]);
    }

    #[test]
    fn test_interop_is_per_importer_and_target() {
        let mut arena = SymbolArena::new(3);
        let target = InteropTarget::Module(ModuleId(2));
        let a = arena.add_interop(ModuleId(0), target.clone(), "import_lib", 0);
        let again = arena.add_interop(ModuleId(0), target.clone(), "import_lib", 4);
        let b = arena.add_interop(ModuleId(1), target.clone(), "import_lib", 0);
        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(arena.symbol(a).parts.as_slice(), &[0]);
        assert_eq!(arena.interop_target(b), Some(&target));
        assert_eq!(arena.base(a), "import_lib");
    }
}
