//! Symbol Linker
//!
//! Runs once over the whole module graph, after discovery and before tree
//! shaking. In order:
//! 1. decides which modules are wrapped in lazy `require`-able closures
//! 2. declares every module-scope symbol in one [`SymbolArena`], plus the
//!    synthetic namespace, wrapper and interop symbols
//! 3. builds each module's [`ExportTable`]
//! 4. binds every import (and re-export) to what it ultimately refers to,
//!    reporting missing, ambiguous and cyclic bindings
//! 5. computes the namespace object contents of every ECMAScript module
//! 6. reports advisories (assignments to imports, undefined namespace
//!    members, possibly missing CommonJS exports)
//! 7. turns each part's free references into dependency edges
//! 8. propagates top-level `await` up static import chains and rejects
//!    `require()` of the modules that end up containing one
//!
//! Everything iterates modules, parts and symbols in id order, so the
//! result is a pure function of the graph.

use crate::ast::{Stmt, identifier_from_stem};
use crate::config::{BuildOptions, Format};
use crate::diagnostics::{Diagnostic, DiagnosticBag, DiagnosticRelatedInfo, ErrorKind, codes};
use crate::exports::{Binding, ExportResolution, ExportResolver, ExportTable, NamespaceExports};
use crate::module_graph::{ImportKind, Module, ModuleGraph, ModuleId, ModuleKind, RecordTarget};
use crate::parts::{DEFAULT_EXPORT_LOCAL, default_export_local};
use crate::span::Span;
use crate::symbols::{ImportBinding, InteropTarget, SymbolArena, SymbolId, SymbolKind};
use fixedbitset::FixedBitSet;
use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::{debug, debug_span};

/// Something a part needs in order to evaluate correctly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dep {
    Symbol(SymbolId),
    /// The whole namespace object of a module
    Namespace(ModuleId),
    /// The module must be part of the bundle (asset references)
    Module(ModuleId),
}

/// The linked graph: symbols, export tables, bindings and part edges.
#[derive(Debug)]
pub struct LinkedGraph {
    pub symbols: SymbolArena,
    pub tables: Vec<ExportTable>,
    /// Modules emitted as `__commonJS` closures
    pub wrapped: FixedBitSet,
    /// Resolved target of every import symbol
    pub bindings: FxHashMap<SymbolId, Binding>,
    /// Namespace contents of every ECMAScript module
    pub namespaces: Vec<Option<Arc<NamespaceExports>>>,
    /// `deps[module][part]`
    pub deps: Vec<Vec<Vec<Dep>>>,
    /// Part that holds each import record, `record_parts[module][record]`
    pub record_parts: Vec<Vec<Option<u32>>>,
    /// Entry points, followed by dynamic-import targets when splitting
    pub entries: Vec<ModuleId>,
    /// `export_<name>` locals for ESM entry exports that are property reads
    pub export_temps: FxHashMap<(ModuleId, String), SymbolId>,
    /// Modules that contain top-level `await` or statically import one that does
    pub tla: FixedBitSet,
}

impl LinkedGraph {
    pub fn is_wrapped(&self, module: ModuleId) -> bool {
        self.wrapped.contains(module.index())
    }

    /// What a symbol stands for in the output.
    pub fn binding(&self, symbol: SymbolId) -> Binding {
        match self.bindings.get(&symbol) {
            Some(binding) => binding.clone(),
            None => Binding::Symbol(symbol),
        }
    }

    /// What `name` in module scope of `module` stands for; `None` for globals.
    pub fn resolve_local(&self, module: ModuleId, name: &str) -> Option<Binding> {
        self.symbols
            .lookup(module, name)
            .map(|symbol| self.binding(symbol))
    }

    pub fn namespace(&self, module: ModuleId) -> Option<&NamespaceExports> {
        self.namespaces[module.index()].as_deref()
    }

    pub fn part_deps(&self, module: ModuleId, part: u32) -> &[Dep] {
        &self.deps[module.index()][part as usize]
    }

    pub fn record_part(&self, module: ModuleId, record: u32) -> Option<u32> {
        self.record_parts[module.index()]
            .get(record as usize)
            .copied()
            .flatten()
    }

    pub fn is_entry(&self, module: ModuleId) -> bool {
        self.entries.contains(&module)
    }
}

/// Link `graph` for the output described by `options`.
pub fn link(graph: &ModuleGraph, options: &BuildOptions) -> (LinkedGraph, DiagnosticBag) {
    let _span = debug_span!("link").entered();
    Linker {
        graph,
        esm_output: options.format == Format::Esm,
        splitting: options.splitting,
        symbols: SymbolArena::new(graph.len()),
        tables: Vec::with_capacity(graph.len()),
        wrapped: FixedBitSet::with_capacity(graph.len()),
        diagnostics: DiagnosticBag::new(),
    }
    .link()
}

struct Linker<'g> {
    graph: &'g ModuleGraph,
    esm_output: bool,
    splitting: bool,
    symbols: SymbolArena,
    tables: Vec<ExportTable>,
    wrapped: FixedBitSet,
    diagnostics: DiagnosticBag,
}

impl Linker<'_> {
    fn link(mut self) -> (LinkedGraph, DiagnosticBag) {
        self.compute_wrapped();
        self.declare_symbols();
        self.collect_own_exports();
        let (bindings, namespaces) = self.bind_imports();
        self.check_usage(&bindings, &namespaces);
        let deps = self.part_deps(&bindings, &namespaces);
        let record_parts = self.record_parts();
        let tla = self.propagate_top_level_await();
        let entries = self.entries();
        let export_temps = self.export_temps(&entries, &namespaces);

        debug!(
            symbols = self.symbols.len(),
            wrapped = self.wrapped.count_ones(..),
            "linking complete"
        );
        let linked = LinkedGraph {
            symbols: self.symbols,
            tables: self.tables,
            wrapped: self.wrapped,
            bindings,
            namespaces,
            deps,
            record_parts,
            entries,
            export_temps,
            tla,
        };
        (linked, self.diagnostics)
    }

    // =========================================================================
    // Wrapping
    // =========================================================================

    /// CommonJS modules, `require()` targets and (without splitting)
    /// dynamic-import targets are wrapped; so is everything a wrapped
    /// module statically imports, since it must be initialized lazily too.
    fn compute_wrapped(&mut self) {
        let graph = self.graph;
        let mut stack = Vec::new();
        for module in graph.iter() {
            if module.kind == ModuleKind::CommonJs && !self.wrapped.put(module.id.index()) {
                stack.push(module.id);
            }
            for record in &module.records {
                let wraps = match record.kind {
                    ImportKind::RequireCall => true,
                    ImportKind::DynamicImport => !self.splitting,
                    _ => false,
                };
                if wraps
                    && let RecordTarget::Module(target) = record.target
                    && !self.wrapped.put(target.index())
                {
                    stack.push(target);
                }
            }
        }
        while let Some(id) = stack.pop() {
            for record in &graph.module(id).records {
                if record.kind == ImportKind::ImportStatement
                    && let RecordTarget::Module(target) = record.target
                    && !self.wrapped.put(target.index())
                {
                    stack.push(target);
                }
            }
        }
    }

    // =========================================================================
    // Symbols
    // =========================================================================

    fn declare_symbols(&mut self) {
        let graph = self.graph;
        for module in graph.iter() {
            let id = module.id;
            let stem = module.stem();
            let mut table = ExportTable::default();

            if module.kind == ModuleKind::Esm {
                let name = format!("{}_exports", stem);
                let namespace = self.symbols.add(id, &name, &name, SymbolKind::Namespace, None);
                self.symbols.set_namespace(id, namespace);
            }
            if self.wrapped.contains(id.index()) {
                let name = format!("require_{}", stem);
                let wrapper = self.symbols.add(id, &name, &name, SymbolKind::Wrapper, None);
                self.symbols.set_wrapper(id, wrapper);
            }

            for (index, (stmt, part)) in module.stmts.iter().zip(&module.parts).enumerate() {
                let part_index = index as u32;
                match stmt {
                    Stmt::Import(decl) => {
                        let Some(record) = decl.record.filter(|_| !decl.type_only) else {
                            continue;
                        };
                        if !decl.is_bare() {
                            self.add_interop(module, record, part_index, false);
                        }
                        let mut bindings = Vec::new();
                        if let Some(local) = &decl.default {
                            bindings.push((local, "default"));
                        }
                        if let Some(local) = &decl.namespace {
                            bindings.push((local, "*"));
                        }
                        for spec in decl.named.iter().filter(|spec| !spec.type_only) {
                            bindings.push((&spec.local, spec.imported.as_str()));
                        }
                        for (local, imported) in bindings {
                            let symbol =
                                self.symbols
                                    .declare(id, local, local, SymbolKind::Import, part_index);
                            self.symbols.set_import(
                                symbol,
                                ImportBinding {
                                    record,
                                    imported: imported.to_string(),
                                    span: decl.span,
                                },
                            );
                        }
                    }
                    Stmt::ExportNamed(export) if export.source.is_some() => {
                        let Some(record) = export.record.filter(|_| !export.type_only) else {
                            continue;
                        };
                        self.add_interop(module, record, part_index, false);
                        for spec in &export.specifiers {
                            let base = identifier_from_stem(&spec.local);
                            let symbol = self.symbols.add(
                                id,
                                &spec.local,
                                &base,
                                SymbolKind::Import,
                                Some(part_index),
                            );
                            self.symbols.set_import(
                                symbol,
                                ImportBinding {
                                    record,
                                    imported: spec.local.clone(),
                                    span: export.span,
                                },
                            );
                            table.own.insert(spec.exported.clone(), symbol);
                        }
                    }
                    Stmt::ExportAll(export) => {
                        let Some(record) = export.record else {
                            continue;
                        };
                        match &export.alias {
                            Some(alias) => {
                                self.add_interop(module, record, part_index, false);
                                let base = identifier_from_stem(alias);
                                let symbol = self.symbols.add(
                                    id,
                                    alias,
                                    &base,
                                    SymbolKind::Import,
                                    Some(part_index),
                                );
                                self.symbols.set_import(
                                    symbol,
                                    ImportBinding {
                                        record,
                                        imported: "*".to_string(),
                                        span: export.span,
                                    },
                                );
                                table.own.insert(alias.clone(), symbol);
                            }
                            None => {
                                self.add_interop(module, record, part_index, true);
                                table.stars.push(record);
                            }
                        }
                    }
                    _ => {
                        for name in &part.declared {
                            let base = if name == DEFAULT_EXPORT_LOCAL {
                                format!("{}_default", stem)
                            } else {
                                name.clone()
                            };
                            self.symbols
                                .declare(id, name, &base, SymbolKind::Value, part_index);
                        }
                    }
                }
            }
            self.tables.push(table);
        }
    }

    /// Interop objects stand in for modules whose exports are only known at
    /// run time: wrapped modules, and externals that are not imported with
    /// native `import` syntax.
    fn add_interop(&mut self, module: &Module, record: u32, part: u32, star: bool) {
        let (target, base) = match module.record_target(record) {
            RecordTarget::Module(target) if self.wrapped.contains(target.index()) => (
                InteropTarget::Module(*target),
                format!("import_{}", self.graph.module(*target).stem()),
            ),
            RecordTarget::External(specifier) if star || !self.esm_output => (
                InteropTarget::External(specifier.clone()),
                format!("import_{}", external_stem(specifier)),
            ),
            _ => return,
        };
        self.symbols.add_interop(module.id, target, &base, part);
    }

    fn collect_own_exports(&mut self) {
        let graph = self.graph;
        for module in graph.iter() {
            let id = module.id;
            let table = &mut self.tables[id.index()];
            for stmt in &module.stmts {
                match stmt {
                    Stmt::ExportNamed(export) if export.source.is_none() && !export.type_only => {
                        for spec in &export.specifiers {
                            if let Some(symbol) = self.symbols.lookup(id, &spec.local) {
                                table.own.insert(spec.exported.clone(), symbol);
                            }
                        }
                    }
                    Stmt::ExportDecl(inner) => {
                        for name in inner.declared_names() {
                            if let Some(symbol) = self.symbols.lookup(id, &name) {
                                table.own.insert(name, symbol);
                            }
                        }
                    }
                    Stmt::ExportDefault(value) => {
                        if let Some(symbol) = self.symbols.lookup(id, default_export_local(value)) {
                            table.own.insert("default".to_string(), symbol);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    // =========================================================================
    // Binding
    // =========================================================================

    #[allow(clippy::type_complexity)]
    fn bind_imports(
        &mut self,
    ) -> (FxHashMap<SymbolId, Binding>, Vec<Option<Arc<NamespaceExports>>>) {
        let graph = self.graph;
        let symbols = &self.symbols;
        let mut resolver =
            ExportResolver::new(graph, symbols, &self.tables, &self.wrapped, self.esm_output);
        let mut bindings = FxHashMap::default();
        let mut reported_cycles = FxHashSet::default();

        for symbol in symbols.ids() {
            let Some(import) = symbols.import(symbol) else {
                continue;
            };
            let importer = graph.module(symbols.symbol(symbol).module);
            let target = importer
                .record_target(import.record)
                .module()
                .map(|t| graph.module(t).display.as_str())
                .unwrap_or("");
            let resolution = resolver.resolve_import(symbol);
            let binding = match resolution {
                ExportResolution::Found(binding) => binding,
                ExportResolution::NotFound => {
                    self.diagnostics.error(
                        ErrorKind::ExportBinding,
                        importer.display.clone(),
                        import.span,
                        format!(
                            "No matching export in \"{}\" for import \"{}\"",
                            target, import.imported
                        ),
                        codes::NO_MATCHING_EXPORT,
                    );
                    Binding::Missing
                }
                ExportResolution::Ambiguous(origins) => {
                    let related = origins
                        .iter()
                        .map(|&origin| {
                            let display = &graph.module(origin).display;
                            DiagnosticRelatedInfo::new(
                                display.clone(),
                                Span::dummy(),
                                format!("One matching export is in \"{}\"", display),
                            )
                        })
                        .collect();
                    self.diagnostics.add(
                        Diagnostic::error(
                            ErrorKind::ExportBinding,
                            importer.display.clone(),
                            import.span,
                            format!(
                                "Ambiguous import \"{}\" has multiple matching exports",
                                import.imported
                            ),
                            codes::AMBIGUOUS_IMPORT,
                        )
                        .with_related_all(related),
                    );
                    Binding::Missing
                }
                ExportResolution::Cycle(chain) => {
                    let mut key = chain.clone();
                    key.sort();
                    key.dedup();
                    if reported_cycles.insert(key) {
                        let related = chain
                            .iter()
                            .map(|(module, name)| {
                                let display = &graph.module(*module).display;
                                DiagnosticRelatedInfo::new(
                                    display.clone(),
                                    Span::dummy(),
                                    format!("\"{}\" is re-exported from \"{}\"", name, display),
                                )
                            })
                            .collect();
                        self.diagnostics.add(
                            Diagnostic::error(
                                ErrorKind::Cycle,
                                importer.display.clone(),
                                import.span,
                                format!(
                                    "Detected cycle while resolving import \"{}\"",
                                    import.imported
                                ),
                                codes::REEXPORT_CYCLE,
                            )
                            .with_related_all(related),
                        );
                    }
                    Binding::Missing
                }
                ExportResolution::External => {
                    self.diagnostics.warning(
                        importer.display.clone(),
                        import.span,
                        format!(
                            "Import \"{}\" can only come from an external \"export *\" in \"{}\" and will be undefined",
                            import.imported, target
                        ),
                        codes::DYNAMIC_STAR_EXPORT,
                    );
                    Binding::Missing
                }
            };
            bindings.insert(symbol, binding);
        }

        let namespaces = graph
            .iter()
            .map(|module| (module.kind == ModuleKind::Esm).then(|| resolver.namespace(module.id)))
            .collect();
        (bindings, namespaces)
    }

    // =========================================================================
    // Advisories
    // =========================================================================

    fn check_usage(
        &mut self,
        bindings: &FxHashMap<SymbolId, Binding>,
        namespaces: &[Option<Arc<NamespaceExports>>],
    ) {
        let graph = self.graph;
        for module in graph.iter() {
            let id = module.id;
            let mut reported = FxHashSet::default();
            for part in &module.parts {
                for (name, in_try) in &part.refs.writes {
                    let Some(symbol) = self.symbols.lookup(id, name) else {
                        continue;
                    };
                    if self.symbols.import(symbol).is_none() {
                        continue;
                    }
                    let message = format!("Cannot assign to import \"{}\"", name);
                    if *in_try {
                        self.diagnostics.warning(
                            module.display.clone(),
                            Span::dummy(),
                            message,
                            codes::ASSIGN_TO_IMPORT,
                        );
                    } else {
                        self.diagnostics.error(
                            ErrorKind::ExportBinding,
                            module.display.clone(),
                            Span::dummy(),
                            message,
                            codes::ASSIGN_TO_IMPORT,
                        );
                    }
                }

                for (object, prop) in &part.refs.free_members {
                    let Some(symbol) = self.symbols.lookup(id, object) else {
                        continue;
                    };
                    let Some(Binding::Namespace(target)) = bindings.get(&symbol) else {
                        continue;
                    };
                    let Some(namespace) = namespaces[target.index()].as_deref() else {
                        continue;
                    };
                    if namespace.get(prop).is_none()
                        && namespace.dynamic.is_empty()
                        && reported.insert((object.clone(), prop.clone()))
                    {
                        self.diagnostics.warning(
                            module.display.clone(),
                            Span::dummy(),
                            format!(
                                "Import \"{}\" will always be undefined because there is no matching export in \"{}\"",
                                prop,
                                graph.module(*target).display
                            ),
                            codes::UNDEFINED_NAMESPACE_MEMBER,
                        );
                    }
                }
            }
        }

        for symbol in self.symbols.ids() {
            let Some(import) = self.symbols.import(symbol) else {
                continue;
            };
            if import.imported == "default" || import.imported == "*" {
                continue;
            }
            let importer = graph.module(self.symbols.symbol(symbol).module);
            let Some(target) = importer.record_target(import.record).module() else {
                continue;
            };
            let target = graph.module(target);
            if target.kind == ModuleKind::CommonJs
                && let Some(names) = &target.analysis.cjs_export_names
                && !names.contains(&import.imported)
            {
                self.diagnostics.warning(
                    importer.display.clone(),
                    import.span,
                    format!(
                        "Import \"{}\" will be undefined if \"{}\" does not export it at run time",
                        import.imported, target.display
                    ),
                    codes::POSSIBLY_MISSING_COMMONJS_EXPORT,
                );
            }
        }
    }

    // =========================================================================
    // Part edges
    // =========================================================================

    fn part_deps(
        &self,
        bindings: &FxHashMap<SymbolId, Binding>,
        namespaces: &[Option<Arc<NamespaceExports>>],
    ) -> Vec<Vec<Vec<Dep>>> {
        self.graph
            .iter()
            .map(|module| {
                module
                    .parts
                    .iter()
                    .map(|part| {
                        let mut deps = IndexSet::new();
                        for name in &part.refs.free {
                            let Some(symbol) = self.symbols.lookup(module.id, name) else {
                                continue;
                            };
                            match bindings.get(&symbol) {
                                None => {
                                    deps.insert(Dep::Symbol(symbol));
                                }
                                // `ns.x` only needs `x`; any other use needs the object.
                                Some(Binding::Namespace(target))
                                    if !part.refs.value_refs.contains(name) =>
                                {
                                    let namespace = namespaces[target.index()].as_deref();
                                    for (object, prop) in &part.refs.free_members {
                                        if object != name {
                                            continue;
                                        }
                                        match namespace.and_then(|ns| ns.get(prop)) {
                                            Some(binding) => deps.extend(binding_dep(binding)),
                                            None if namespace
                                                .is_some_and(|ns| !ns.dynamic.is_empty()) =>
                                            {
                                                deps.insert(Dep::Namespace(*target));
                                            }
                                            None => {}
                                        }
                                    }
                                }
                                Some(binding) => deps.extend(binding_dep(binding)),
                            }
                        }
                        for &record in &part.records {
                            let Some(record) = module.records.get(record as usize) else {
                                continue;
                            };
                            let RecordTarget::Module(target) = record.target else {
                                continue;
                            };
                            let needs_wrapper = match record.kind {
                                ImportKind::ImportStatement => self.wrapped.contains(target.index()),
                                ImportKind::RequireCall => true,
                                ImportKind::DynamicImport => !self.splitting,
                                ImportKind::UrlToken => {
                                    deps.insert(Dep::Module(target));
                                    false
                                }
                                ImportKind::EntryPoint | ImportKind::RequireResolve => false,
                            };
                            if needs_wrapper && let Some(wrapper) = self.symbols.wrapper(target) {
                                deps.insert(Dep::Symbol(wrapper));
                            }
                        }
                        deps.into_iter().collect()
                    })
                    .collect()
            })
            .collect()
    }

    fn record_parts(&self) -> Vec<Vec<Option<u32>>> {
        self.graph
            .iter()
            .map(|module| {
                let mut parts = vec![None; module.records.len()];
                for (index, part) in module.parts.iter().enumerate() {
                    for &record in &part.records {
                        if let Some(slot) = parts.get_mut(record as usize) {
                            *slot = Some(index as u32);
                        }
                    }
                }
                parts
            })
            .collect()
    }

    // =========================================================================
    // Top-level await
    // =========================================================================

    fn propagate_top_level_await(&mut self) -> FixedBitSet {
        let graph = self.graph;
        let mut tla = FixedBitSet::with_capacity(graph.len());
        // Module whose own `await` taints each tainted module
        let mut origin: Vec<Option<ModuleId>> = vec![None; graph.len()];
        for module in graph.iter() {
            if module.analysis.has_top_level_await {
                tla.insert(module.id.index());
                origin[module.id.index()] = Some(module.id);
            }
        }
        let mut changed = true;
        while changed {
            changed = false;
            for module in graph.iter() {
                if tla.contains(module.id.index()) {
                    continue;
                }
                let tainted_by = module.records.iter().find_map(|record| match record.target {
                    RecordTarget::Module(target)
                        if record.kind == ImportKind::ImportStatement
                            && tla.contains(target.index()) =>
                    {
                        origin[target.index()]
                    }
                    _ => None,
                });
                if let Some(source) = tainted_by {
                    tla.insert(module.id.index());
                    origin[module.id.index()] = Some(source);
                    changed = true;
                }
            }
        }

        for module in graph.iter() {
            for record in &module.records {
                let RecordTarget::Module(target) = record.target else {
                    continue;
                };
                let what = match record.kind {
                    ImportKind::RequireCall => "require call",
                    ImportKind::DynamicImport if !self.splitting => "dynamic import",
                    _ => continue,
                };
                if !tla.contains(target.index()) {
                    continue;
                }
                let mut diagnostic = Diagnostic::error(
                    ErrorKind::FormatCompatibility,
                    module.display.clone(),
                    record.span,
                    format!(
                        "This {} is not allowed because the imported file \"{}\" contains a top-level await",
                        what,
                        graph.module(target).display
                    ),
                    codes::REQUIRE_TOP_LEVEL_AWAIT,
                );
                if let Some(source) = origin[target.index()] {
                    let display = &graph.module(source).display;
                    diagnostic = diagnostic.with_related(DiagnosticRelatedInfo::new(
                        display.clone(),
                        Span::dummy(),
                        format!("The top-level await in \"{}\" is here", display),
                    ));
                }
                self.diagnostics.add(diagnostic);
            }
        }
        tla
    }

    // =========================================================================
    // Entries
    // =========================================================================

    fn entries(&self) -> Vec<ModuleId> {
        let mut entries: IndexSet<ModuleId> = self.graph.entries.iter().copied().collect();
        if self.splitting {
            for module in self.graph.iter() {
                for record in &module.records {
                    if record.kind == ImportKind::DynamicImport
                        && let RecordTarget::Module(target) = record.target
                    {
                        entries.insert(target);
                    }
                }
            }
        }
        entries.into_iter().collect()
    }

    /// ESM entries export local bindings; exports that are property reads
    /// on an interop object get a local copy first.
    fn export_temps(
        &mut self,
        entries: &[ModuleId],
        namespaces: &[Option<Arc<NamespaceExports>>],
    ) -> FxHashMap<(ModuleId, String), SymbolId> {
        let mut temps = FxHashMap::default();
        if !self.esm_output {
            return temps;
        }
        for &entry in entries {
            if self.wrapped.contains(entry.index()) {
                continue;
            }
            let Some(namespace) = namespaces[entry.index()].as_deref() else {
                continue;
            };
            for (name, binding) in &namespace.exports {
                if let Binding::Property { .. } = binding {
                    let base = format!("export_{}", identifier_from_stem(name));
                    let symbol = self.symbols.add(entry, &base, &base, SymbolKind::Value, None);
                    temps.insert((entry, name.clone()), symbol);
                }
            }
            let has_module_stars = namespace.dynamic.iter().any(|&object| {
                matches!(
                    self.symbols.interop_target(object),
                    Some(InteropTarget::Module(_))
                )
            });
            if has_module_stars {
                self.diagnostics.warning(
                    self.graph.module(entry).display.clone(),
                    Span::dummy(),
                    "Names re-exported with \"export *\" from a CommonJS module cannot be listed statically and are not exported from this entry point",
                    codes::DYNAMIC_STAR_EXPORT,
                );
            }
        }
        temps
    }
}

fn binding_dep(binding: &Binding) -> Option<Dep> {
    match binding {
        Binding::Symbol(symbol) => Some(Dep::Symbol(*symbol)),
        Binding::Property { object, .. } => Some(Dep::Symbol(*object)),
        Binding::Namespace(module) => Some(Dep::Namespace(*module)),
        Binding::Missing => None,
    }
}

/// Base for names derived from an external specifier:
/// `node:fs` → `fs`, `@scope/pkg` → `pkg`, `https://cdn/x.min.js` → `x`.
pub fn external_stem(specifier: &str) -> String {
    let last = specifier
        .rsplit(['/', ':'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(specifier);
    let stem = last.split('.').next().unwrap_or(last);
    identifier_from_stem(stem)
}

#[cfg(test)]
#[path = "tests/linker_tests.rs"]
mod tests;
