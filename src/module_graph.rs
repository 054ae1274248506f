//! Module Graph
//!
//! This module discovers the modules of a build, starting from its entry
//! points:
//! - resolves every import record of every module
//! - loads and parses newly discovered modules, one wave at a time, in
//!   parallel within a wave
//! - applies the per-module source transforms and splits each module into
//!   parts
//! - infers each module's kind (ECMAScript module or CommonJS)
//! - defers the re-exports of barrel files until an importer asks for them
//!
//! Modules live in an arena indexed by [`ModuleId`]. Ids are handed out in
//! discovery order, and discovery is sequential, so the graph is the same
//! for the same inputs regardless of how parsing was scheduled.

use crate::config::{BuildOptions, Loader, loader_for_path};
use crate::diagnostics::{DiagnosticBag, ErrorKind, codes};
use crate::fs::{FileSystem, normalize_path};
use crate::loaders::{Asset, LoadedModule, ModuleParser, load_module};
use crate::module_resolver::{ModulePath, ModuleResolver, Resolution};
use crate::package_json::PackageType;
use crate::parts::{ModuleAnalysis, Part, analyze_module};
use crate::plugins::{Plugin, ResolveArgs, ResolveOverride, hook_failure};
use crate::scanner::{ScannedRecord, scan_records};
use crate::side_effects::PurityOptions;
use crate::span::Span;
use crate::transforms::{
    DefineTable, Injection, apply_define, apply_inject, elide_unused_imports, static_export_names,
};
use crate::ast::{Stmt, identifier_from_stem};
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, debug_span};

/// Unique identifier for a module in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleId(pub u32);

impl ModuleId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How an import record was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    EntryPoint,
    ImportStatement,
    RequireCall,
    DynamicImport,
    RequireResolve,
    UrlToken,
}

impl ImportKind {
    /// Kinds that select the `require` export condition.
    pub fn is_require(&self) -> bool {
        matches!(self, ImportKind::RequireCall | ImportKind::RequireResolve)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ImportKind::EntryPoint => "entry-point",
            ImportKind::ImportStatement => "import-statement",
            ImportKind::RequireCall => "require-call",
            ImportKind::DynamicImport => "dynamic-import",
            ImportKind::RequireResolve => "require-resolve",
            ImportKind::UrlToken => "url-token",
        }
    }
}

/// Where an import record points after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordTarget {
    Module(ModuleId),
    /// Left as a runtime import of this specifier
    External(String),
    /// Resolution failed and an error has been reported, or the record is
    /// a barrel re-export nothing imports and was never loaded
    Unresolved,
}

impl RecordTarget {
    pub fn module(&self) -> Option<ModuleId> {
        match self {
            RecordTarget::Module(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub specifier: String,
    pub kind: ImportKind,
    pub span: Span,
    pub target: RecordTarget,
}

/// Source kind of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Esm,
    CommonJs,
    /// Neither ESM syntax nor CommonJS globals; settled once the whole
    /// graph is known
    Unknown,
}

/// Kind implied by syntax, file extension and the package `"type"`.
pub fn infer_kind(analysis: &ModuleAnalysis, path: &Path, package_type: Option<PackageType>) -> ModuleKind {
    if analysis.uses_esm_syntax {
        return ModuleKind::Esm;
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "mjs" | "mts" => return ModuleKind::Esm,
        "cjs" | "cts" => return ModuleKind::CommonJs,
        _ => {}
    }
    if analysis.uses_cjs_globals || analysis.has_top_level_return {
        return ModuleKind::CommonJs;
    }
    if package_type == Some(PackageType::Module) {
        return ModuleKind::Esm;
    }
    ModuleKind::Unknown
}

/// A module in the graph.
#[derive(Debug)]
pub struct Module {
    pub id: ModuleId,
    pub path: ModulePath,
    /// Path relative to the working directory, for messages and output
    pub display: String,
    pub loader: Loader,
    pub kind: ModuleKind,
    pub stmts: Vec<Stmt>,
    pub parts: Vec<Part>,
    pub analysis: ModuleAnalysis,
    pub records: Vec<ImportRecord>,
    /// The nearest package.json allows this module to have side effects
    pub manifest_side_effects: bool,
    pub source_len: usize,
    pub asset: Option<Asset>,
    pub is_entry: bool,
}

impl Module {
    /// Identifier-safe base for generated names. `index` files take their
    /// directory's name.
    pub fn stem(&self) -> String {
        let path = &self.path.path;
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("module");
        let stem = stem.split('.').next().unwrap_or(stem);
        if stem == "index"
            && let Some(dir) = path.parent().and_then(|d| d.file_name()).and_then(|d| d.to_str())
        {
            return identifier_from_stem(dir);
        }
        identifier_from_stem(stem)
    }

    pub fn record_target(&self, record: u32) -> &RecordTarget {
        self.records
            .get(record as usize)
            .map(|r| &r.target)
            .unwrap_or(&RecordTarget::Unresolved)
    }
}

/// All modules of a build.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    pub modules: Vec<Module>,
    /// Entry modules in the order they were given
    pub entries: Vec<ModuleId>,
    /// Modules imported into every entry by `inject`
    pub injected: Vec<ModuleId>,
    by_path: FxHashMap<ModulePath, ModuleId>,
}

impl ModuleGraph {
    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    pub fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.index()]
    }

    pub fn get(&self, path: &ModulePath) -> Option<ModuleId> {
        self.by_path.get(path).copied()
    }

    /// Find a module by its display path.
    pub fn find(&self, display: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.display == display)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }
}

// =============================================================================
// Graph Builder
// =============================================================================

/// Discovers and loads every module reachable from the entry points.
pub struct GraphBuilder<'b> {
    options: &'b BuildOptions,
    fs: Arc<dyn FileSystem>,
    parser: &'b dyn ModuleParser,
    plugins: &'b [Arc<dyn Plugin>],
    resolver: ModuleResolver,
    loaders: IndexMap<String, Loader>,
    define: DefineTable,
    purity: PurityOptions,
    injections: Vec<Injection>,
    diagnostics: DiagnosticBag,
    graph: ModuleGraph,
    /// Identity of every id handed out so far
    paths: Vec<ModulePath>,
    /// Ids queued for the next wave
    pending: Vec<ModuleId>,
    entry_ids: IndexSet<ModuleId>,
    /// Export names asked of each module so far
    requested: FxHashMap<ModuleId, Requested>,
    /// Loaded barrels that still hold unloaded records
    barrels: FxHashMap<ModuleId, Vec<DeferredRecord>>,
}

impl<'b> GraphBuilder<'b> {
    pub fn new(
        options: &'b BuildOptions,
        fs: Arc<dyn FileSystem>,
        parser: &'b dyn ModuleParser,
        plugins: &'b [Arc<dyn Plugin>],
        resolver: ModuleResolver,
        define: DefineTable,
    ) -> Self {
        GraphBuilder {
            options,
            fs,
            parser,
            plugins,
            resolver,
            loaders: options.loaders(),
            define,
            purity: PurityOptions {
                ignore_annotations: options.ignore_annotations,
            },
            injections: Vec::new(),
            diagnostics: DiagnosticBag::new(),
            graph: ModuleGraph::default(),
            paths: Vec::new(),
            pending: Vec::new(),
            entry_ids: IndexSet::new(),
            requested: FxHashMap::default(),
            barrels: FxHashMap::default(),
        }
    }

    /// Build the graph. Resolution and load failures are collected rather
    /// than returned, so one pass reports all of them.
    pub fn build(mut self) -> (ModuleGraph, DiagnosticBag) {
        let _span = debug_span!("graph").entered();

        // Injected files load first so their export names are known when
        // the rest of the graph is transformed.
        let options = self.options;
        for inject in &options.inject {
            let path = options.absolute(inject);
            if let Some(id) = self.resolve_entry(&path) {
                self.graph.injected.push(id);
            }
        }
        self.run_waves();
        self.injections = self
            .graph
            .injected
            .iter()
            .map(|&id| {
                let module = self.graph.module(id);
                Injection {
                    path: module.path.path.clone(),
                    exports: static_export_names(&module.stmts),
                }
            })
            .collect();

        for entry in &options.entry_points {
            let path = options.absolute(entry);
            if let Some(id) = self.resolve_entry(&path) {
                self.entry_ids.insert(id);
                if !self.graph.entries.contains(&id) {
                    self.graph.entries.push(id);
                }
            }
        }
        self.run_waves();

        for &id in &self.graph.entries {
            self.graph.modules[id.index()].is_entry = true;
        }
        self.settle_unknown_kinds();
        debug!(modules = self.graph.len(), "module graph complete");
        (self.graph, self.diagnostics)
    }

    fn resolve_entry(&mut self, path: &Path) -> Option<ModuleId> {
        let specifier = path.to_string_lossy().into_owned();
        let record = ScannedRecord {
            specifier,
            kind: ImportKind::EntryPoint,
            span: Span::dummy(),
        };
        let id = self.resolve_record(None, &record).module()?;
        self.request(id, Requested::All);
        Some(id)
    }

    fn enqueue(&mut self, path: ModulePath) -> ModuleId {
        if let Some(&id) = self.graph.by_path.get(&path) {
            return id;
        }
        let id = ModuleId(self.paths.len() as u32);
        self.graph.by_path.insert(path.clone(), id);
        self.paths.push(path);
        self.pending.push(id);
        id
    }

    fn run_waves(&mut self) {
        while !self.pending.is_empty() {
            let wave = std::mem::take(&mut self.pending);
            debug!(size = wave.len(), "loading wave");

            let fs = self.fs.as_ref();
            let parser = self.parser;
            let loaders = &self.loaders;
            let paths = &self.paths;
            let loaded: Vec<(Option<Loader>, anyhow::Result<LoadedModule>)> = wave
                .par_iter()
                .map(|&id| {
                    let path = &paths[id.index()];
                    let loader = if path.disabled {
                        Some(Loader::Empty)
                    } else {
                        loader_for_path(loaders, &path.path)
                    };
                    let result = match loader {
                        Some(loader) => load_module(fs, parser, path, loader),
                        None => Ok(LoadedModule::default()),
                    };
                    (loader, result)
                })
                .collect();

            for (id, (loader, result)) in wave.into_iter().zip(loaded) {
                self.add_module(id, loader, result);
            }
        }
    }

    fn add_module(&mut self, id: ModuleId, loader: Option<Loader>, result: anyhow::Result<LoadedModule>) {
        debug_assert_eq!(self.graph.modules.len(), id.index());
        let path = self.paths[id.index()].clone();
        let display = path.display(&self.options.working_dir);

        let loaded = match (loader, result) {
            (None, _) => {
                let ext = path
                    .path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| format!(".{}", e))
                    .unwrap_or_default();
                self.diagnostics.error(
                    ErrorKind::Load,
                    display.clone(),
                    Span::dummy(),
                    format!("No loader is configured for \"{}\" files: {}", ext, display),
                    codes::NO_LOADER,
                );
                LoadedModule::default()
            }
            (Some(_), Ok(loaded)) => loaded,
            (Some(_), Err(err)) => {
                self.diagnostics.error(
                    ErrorKind::Load,
                    display.clone(),
                    Span::dummy(),
                    format!("{:#}", err),
                    codes::LOAD_FAILED,
                );
                LoadedModule::default()
            }
        };
        let loader = loader.unwrap_or(Loader::Empty);
        let LoadedModule {
            mut stmts,
            source_len,
            asset,
        } = loaded;

        for plugin in self.plugins {
            if let Err(err) = plugin.on_parsed(&path, &mut stmts) {
                self.diagnostics
                    .add(hook_failure(plugin.as_ref(), "onParsed", &display, &err));
            }
        }

        let declared: IndexSet<String> = stmts.iter().flat_map(|s| s.declared_names()).collect();
        apply_define(&mut stmts, &self.define, &declared);
        if loader.is_typescript() {
            elide_unused_imports(&mut stmts);
        }
        let is_injected = self.graph.injected.contains(&id);
        if !self.injections.is_empty() && !is_injected {
            let (_, before) = analyze_module(&stmts, self.purity);
            apply_inject(
                &mut stmts,
                &self.injections,
                &before.unbound,
                self.entry_ids.contains(&id),
            );
        }

        let (scanned, per_stmt) = scan_records(&mut stmts);
        let (mut parts, analysis) = analyze_module(&stmts, self.purity);
        for (part, records) in parts.iter_mut().zip(per_stmt) {
            part.records = records;
        }

        let package_type = self.resolver.package_type(&path.path);
        let kind = if path.disabled {
            ModuleKind::CommonJs
        } else {
            infer_kind(&analysis, &path.path, package_type)
        };
        if kind == ModuleKind::Esm && analysis.has_top_level_return {
            self.diagnostics.error(
                ErrorKind::FormatCompatibility,
                display.clone(),
                Span::dummy(),
                "Top-level return cannot be used inside an ECMAScript module",
                codes::TOP_LEVEL_RETURN_IN_ESM,
            );
        }
        if analysis.uses_esm_syntax && analysis.uses_cjs_globals {
            self.diagnostics.warning(
                display.clone(),
                Span::dummy(),
                "This file uses ESM syntax, so CommonJS \"module\" and \"exports\" are treated as ordinary global variables",
                codes::COMMONJS_IN_ESM,
            );
        }
        let manifest_side_effects = self.resolver.manifest_side_effects(&path.path);

        let mut deferrable = if self.may_defer(&path, manifest_side_effects) {
            barrel_records(&stmts)
        } else {
            IndexMap::new()
        };
        let mut requests = requested_names(&stmts);
        let mut records = Vec::with_capacity(scanned.len());
        let mut deferred = Vec::new();
        for (index, record) in scanned.iter().enumerate() {
            let index = index as u32;
            let target = match deferrable.swap_remove(&index) {
                Some(exports) => {
                    deferred.push(DeferredRecord {
                        index,
                        record: record.clone(),
                        exports,
                    });
                    RecordTarget::Unresolved
                }
                None => {
                    let target = self.resolve_record(Some(&path.path), record);
                    if let RecordTarget::Module(module) = target {
                        let names = requests.remove(&index).unwrap_or(Requested::All);
                        self.request(module, names);
                    }
                    target
                }
            };
            records.push(ImportRecord {
                specifier: record.specifier.clone(),
                kind: record.kind,
                span: record.span,
                target,
            });
        }

        let module_display = display.as_str();
        debug!(
            module = module_display,
            kind = ?kind,
            records = records.len(),
            parts = parts.len(),
            "module discovered"
        );
        self.graph.modules.push(Module {
            id,
            path,
            display,
            loader,
            kind,
            stmts,
            parts,
            analysis,
            records,
            manifest_side_effects,
            source_len,
            asset,
            is_entry: false,
        });

        if !deferred.is_empty() {
            debug!(
                module = self.graph.modules[id.index()].display.as_str(),
                deferred = deferred.len(),
                "barrel re-exports deferred"
            );
            self.barrels.insert(id, deferred);
            self.release(id);
        }
    }

    /// Barrel deferral applies to side-effect-free modules and to packages
    /// listed in `optimize_imports`.
    fn may_defer(&mut self, path: &ModulePath, manifest_side_effects: bool) -> bool {
        if path.disabled {
            return false;
        }
        if !manifest_side_effects {
            return true;
        }
        if self.options.optimize_imports.is_empty() {
            return false;
        }
        self.resolver
            .nearest_package(&path.path)
            .and_then(|pkg| pkg.name.clone())
            .is_some_and(|name| self.options.optimize_imports.contains(&name))
    }

    /// Record that `names` of `id` are needed, loading any barrel records
    /// that provide them.
    fn request(&mut self, id: ModuleId, names: Requested) {
        let changed = match self.requested.get_mut(&id) {
            Some(existing) => existing.merge(names),
            None => {
                self.requested.insert(id, names);
                true
            }
        };
        if changed && self.barrels.contains_key(&id) {
            self.release(id);
        }
    }

    /// Resolve the deferred records of barrel `id` whose exports have been
    /// requested.
    fn release(&mut self, id: ModuleId) {
        let Some(requested) = self.requested.get(&id).cloned() else {
            return;
        };
        let Some(deferred) = self.barrels.get_mut(&id) else {
            return;
        };
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(deferred)
            .into_iter()
            .partition(|record| record.exports.iter().any(|(exported, _)| requested.contains(exported)));
        if waiting.is_empty() {
            self.barrels.remove(&id);
        } else {
            self.barrels.insert(id, waiting);
        }

        let importer = self.paths[id.index()].path.clone();
        for record in ready {
            let target = self.resolve_record(Some(&importer), &record.record);
            if let RecordTarget::Module(module) = target {
                let names = record.exports.into_iter().map(|(_, imported)| imported).collect();
                self.request(module, Requested::Names(names));
            }
            self.graph.modules[id.index()].records[record.index as usize].target = target;
        }
    }

    fn resolve_record(&mut self, importer: Option<&Path>, record: &ScannedRecord) -> RecordTarget {
        let containing = importer
            .map(|p| crate::fs::relative_display(p, &self.options.working_dir))
            .unwrap_or_default();
        let args = ResolveArgs {
            specifier: &record.specifier,
            importer,
            kind: record.kind,
        };
        for plugin in self.plugins {
            match plugin.on_resolve(&args) {
                Ok(Some(ResolveOverride::Path(path))) => {
                    let path = normalize_path(&self.options.working_dir.join(path));
                    return RecordTarget::Module(self.enqueue(ModulePath::file(path)));
                }
                Ok(Some(ResolveOverride::External(specifier))) => {
                    return RecordTarget::External(specifier);
                }
                Ok(None) => {}
                Err(err) => {
                    self.diagnostics
                        .add(hook_failure(plugin.as_ref(), "onResolve", &containing, &err));
                    return RecordTarget::Unresolved;
                }
            }
        }

        match self
            .resolver
            .resolve(&record.specifier, importer, record.kind, record.span)
        {
            Ok(Resolution::Internal(_)) if record.kind == ImportKind::RequireResolve => {
                RecordTarget::External(record.specifier.clone())
            }
            Ok(Resolution::Internal(path)) => RecordTarget::Module(self.enqueue(path)),
            Ok(Resolution::External(specifier)) => RecordTarget::External(specifier),
            Err(failure) => {
                self.diagnostics.add(failure.to_diagnostic());
                RecordTarget::Unresolved
            }
        }
    }

    /// Modules with neither ESM syntax nor CommonJS globals are CommonJS
    /// when something `require()`s them and ECMAScript modules otherwise.
    fn settle_unknown_kinds(&mut self) {
        let mut required = vec![false; self.graph.len()];
        for module in &self.graph.modules {
            for record in &module.records {
                if record.kind == ImportKind::RequireCall
                    && let RecordTarget::Module(target) = record.target
                {
                    required[target.index()] = true;
                }
            }
        }
        for module in &mut self.graph.modules {
            if module.kind == ModuleKind::Unknown {
                module.kind = if required[module.id.index()] {
                    ModuleKind::CommonJs
                } else {
                    ModuleKind::Esm
                };
            }
        }
    }
}

// =============================================================================
// Barrels
// =============================================================================

/// Export names an importer needs from a module.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Requested {
    All,
    Names(FxHashSet<String>),
}

impl Requested {
    fn contains(&self, name: &str) -> bool {
        match self {
            Requested::All => true,
            Requested::Names(names) => names.contains(name),
        }
    }

    /// Add `other`; true when something new was asked for.
    fn merge(&mut self, other: Requested) -> bool {
        match (&mut *self, other) {
            (Requested::All, _) => false,
            (_, Requested::All) => {
                *self = Requested::All;
                true
            }
            (Requested::Names(names), Requested::Names(other)) => {
                let before = names.len();
                names.extend(other);
                names.len() != before
            }
        }
    }
}

/// A barrel record held back until one of its exports is requested.
#[derive(Debug)]
struct DeferredRecord {
    index: u32,
    record: ScannedRecord,
    /// (exported name, name imported from the target)
    exports: Vec<(String, String)>,
}

/// Names each static import or re-export statement takes from its target,
/// by record index. Records missing here need the whole module.
fn requested_names(stmts: &[Stmt]) -> FxHashMap<u32, Requested> {
    let mut requests = FxHashMap::default();
    for stmt in stmts {
        match stmt {
            Stmt::Import(import) => {
                let Some(record) = import.record else {
                    continue;
                };
                if import.namespace.is_some() {
                    continue;
                }
                let mut names: FxHashSet<String> = import
                    .named
                    .iter()
                    .filter(|spec| !spec.type_only)
                    .map(|spec| spec.imported.clone())
                    .collect();
                if import.default.is_some() {
                    names.insert("default".to_string());
                }
                requests.insert(record, Requested::Names(names));
            }
            Stmt::ExportNamed(export) => {
                if let Some(record) = export.record {
                    let names = export.specifiers.iter().map(|spec| spec.local.clone()).collect();
                    requests.insert(record, Requested::Names(names));
                }
            }
            _ => {}
        }
    }
    requests
}

/// Records of a pure barrel that can wait until their exports are needed,
/// with the exports each provides. A pure barrel holds only imports and
/// re-exports; anything else, including a local export, makes every record
/// load eagerly. `export *`, namespace and bare imports always load.
fn barrel_records(stmts: &[Stmt]) -> IndexMap<u32, Vec<(String, String)>> {
    let mut imported: FxHashMap<&str, (u32, &str)> = FxHashMap::default();
    let mut locals: IndexMap<u32, Vec<&str>> = IndexMap::new();
    for stmt in stmts {
        let Stmt::Import(import) = stmt else {
            continue;
        };
        let Some(record) = import.record else {
            continue;
        };
        if import.type_only || import.is_bare() || import.namespace.is_some() {
            continue;
        }
        let bindings = import
            .default
            .iter()
            .map(|local| (local.as_str(), "default"))
            .chain(
                import
                    .named
                    .iter()
                    .filter(|spec| !spec.type_only)
                    .map(|spec| (spec.local.as_str(), spec.imported.as_str())),
            );
        for (local, name) in bindings {
            imported.insert(local, (record, name));
            locals.entry(record).or_default().push(local);
        }
    }

    let mut exports: IndexMap<u32, Vec<(String, String)>> = IndexMap::new();
    let mut exported_locals: FxHashSet<&str> = FxHashSet::default();
    for stmt in stmts {
        match stmt {
            Stmt::Import(_) | Stmt::ExportAll(_) | Stmt::Empty => {}
            Stmt::ExportNamed(export) if export.type_only => {}
            Stmt::ExportNamed(export) => match (&export.source, export.record) {
                (Some(_), Some(record)) => {
                    let provided = exports.entry(record).or_default();
                    for spec in &export.specifiers {
                        provided.push((spec.exported.clone(), spec.local.clone()));
                    }
                }
                (Some(_), None) => {}
                (None, _) => {
                    for spec in &export.specifiers {
                        let Some(&(record, name)) = imported.get(spec.local.as_str()) else {
                            return IndexMap::new();
                        };
                        exported_locals.insert(spec.local.as_str());
                        exports
                            .entry(record)
                            .or_default()
                            .push((spec.exported.clone(), name.to_string()));
                    }
                }
            },
            _ => return IndexMap::new(),
        }
    }

    // An import only waits when every binding it brings in is re-exported.
    for (record, bound) in &locals {
        if !bound.iter().all(|local| exported_locals.contains(local)) {
            exports.swap_remove(record);
        }
    }
    exports
}

#[cfg(test)]
#[path = "tests/module_graph_tests.rs"]
mod tests;
