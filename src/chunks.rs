//! Chunk assignment
//!
//! Groups live modules into output files:
//! - without splitting, one chunk per entry holding everything that entry
//!   reaches (shared modules are duplicated)
//! - with splitting, modules reached by exactly one entry go to that
//!   entry's chunk, and modules reached by the same set of several entries
//!   share one `chunk-<hash>.js`
//!
//! Modules inside a chunk follow one global evaluation order: a depth-first
//! post-order over static imports from the entries in the order they were
//! given, so dependencies come before dependents and ties fall back to
//! import order within each module.

use crate::exports::Binding;
use crate::fs::relative_path;
use crate::linker::{Dep, LinkedGraph};
use crate::loaders::content_hash;
use crate::module_graph::{ImportKind, ModuleGraph, ModuleId, RecordTarget};
use crate::symbols::SymbolId;
use crate::tree_shaking::Liveness;
use fixedbitset::FixedBitSet;
use indexmap::{IndexMap, IndexSet};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkKind {
    Entry(ModuleId),
    Shared,
}

#[derive(Clone, Debug)]
pub struct Chunk {
    /// Path relative to the output directory, `/`-separated
    pub file_name: String,
    pub kind: ChunkKind,
    /// Modules in evaluation order
    pub modules: Vec<ModuleId>,
    /// Index into [`ChunkGraph::liveness`]
    pub liveness: usize,
    /// Other chunks this one imports, in evaluation order, with the
    /// symbols it takes from each (empty for import-for-effect)
    pub imports: IndexMap<usize, Vec<SymbolId>>,
    /// Symbols other chunks import from this one, by id
    pub exports: Vec<SymbolId>,
}

impl Chunk {
    pub fn entry(&self) -> Option<ModuleId> {
        match self.kind {
            ChunkKind::Entry(module) => Some(module),
            ChunkKind::Shared => None,
        }
    }
}

#[derive(Debug)]
pub struct ChunkGraph {
    pub chunks: Vec<Chunk>,
    pub liveness: Vec<Liveness>,
    /// Home chunk of every live module; only meaningful with splitting
    module_chunks: Vec<Option<usize>>,
}

impl ChunkGraph {
    pub fn live(&self, chunk: usize) -> &Liveness {
        &self.liveness[self.chunks[chunk].liveness]
    }

    /// The chunk whose entry is `module`.
    pub fn entry_chunk(&self, module: ModuleId) -> Option<usize> {
        self.chunks
            .iter()
            .position(|chunk| chunk.kind == ChunkKind::Entry(module))
    }

    pub fn module_chunk(&self, module: ModuleId) -> Option<usize> {
        self.module_chunks.get(module.index()).copied().flatten()
    }

    /// Import path from one chunk to another, always starting with `.`.
    pub fn import_path(&self, from: usize, to: usize) -> String {
        relative_import(&self.chunks[from].file_name, &self.chunks[to].file_name)
    }
}

/// Path from the output file `from` to the output file `to`, both
/// relative to the output directory, as an import specifier.
pub fn relative_import(from: &str, to: &str) -> String {
    let from_dir = Path::new(from)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let to = Path::new(to);
    let rel = relative_path(&from_dir, to).unwrap_or_else(|| to.to_path_buf());
    let text = rel.to_string_lossy().replace('\\', "/");
    if text.starts_with("../") {
        text
    } else {
        format!("./{}", text)
    }
}

/// Lay out the chunks of a build. `liveness` holds one marking per entry
/// without splitting and a single marking with splitting.
pub fn build_chunks(
    graph: &ModuleGraph,
    linked: &LinkedGraph,
    liveness: Vec<Liveness>,
    splitting: bool,
) -> ChunkGraph {
    let names = entry_file_names(graph, &linked.entries);
    let mut chunk_graph = if splitting {
        split_chunks(graph, linked, liveness, &names)
    } else {
        let chunks = linked
            .entries
            .iter()
            .zip(names)
            .enumerate()
            .map(|(index, (&entry, file_name))| Chunk {
                file_name,
                kind: ChunkKind::Entry(entry),
                modules: evaluation_order(graph, &liveness[index], &[entry], true),
                liveness: index,
                imports: IndexMap::new(),
                exports: Vec::new(),
            })
            .collect();
        ChunkGraph {
            chunks,
            liveness,
            module_chunks: Vec::new(),
        }
    };
    if splitting {
        link_chunks(graph, linked, &mut chunk_graph);
    }
    debug!(chunks = chunk_graph.chunks.len(), "chunks assigned");
    chunk_graph
}

fn split_chunks(
    graph: &ModuleGraph,
    linked: &LinkedGraph,
    liveness: Vec<Liveness>,
    names: &[String],
) -> ChunkGraph {
    let live = &liveness[0];
    let order = evaluation_order(graph, live, &linked.entries, false);

    let mut reached_by = vec![FixedBitSet::with_capacity(linked.entries.len()); graph.len()];
    for (index, &entry) in linked.entries.iter().enumerate() {
        for module in evaluation_order(graph, live, &[entry], false) {
            reached_by[module.index()].insert(index);
        }
    }

    // Entry chunks first, in entry order, then shared chunks as they appear.
    let mut groups: IndexMap<Vec<usize>, Vec<ModuleId>> = linked
        .entries
        .iter()
        .enumerate()
        .map(|(index, _)| (vec![index], Vec::new()))
        .collect();
    for &module in &order {
        let key: Vec<usize> = reached_by[module.index()].ones().collect();
        if key.is_empty() {
            continue;
        }
        groups.entry(key).or_default().push(module);
    }

    let mut module_chunks = vec![None; graph.len()];
    let mut chunks = Vec::with_capacity(groups.len());
    for (index, (key, modules)) in groups.into_iter().enumerate() {
        for &module in &modules {
            module_chunks[module.index()] = Some(index);
        }
        let (file_name, kind) = if index < linked.entries.len() {
            (names[index].clone(), ChunkKind::Entry(linked.entries[key[0]]))
        } else {
            let paths: Vec<&str> = modules
                .iter()
                .map(|&module| graph.module(module).display.as_str())
                .collect();
            (
                format!("chunk-{}.js", content_hash(paths.join("\n").as_bytes())),
                ChunkKind::Shared,
            )
        };
        chunks.push(Chunk {
            file_name,
            kind,
            modules,
            liveness: 0,
            imports: IndexMap::new(),
            exports: Vec::new(),
        });
    }
    ChunkGraph {
        chunks,
        liveness,
        module_chunks,
    }
}

/// Cross-chunk imports and exports.
fn link_chunks(graph: &ModuleGraph, linked: &LinkedGraph, chunk_graph: &mut ChunkGraph) {
    let live = &chunk_graph.liveness[0];
    let mut exports: Vec<IndexSet<SymbolId>> = vec![IndexSet::new(); chunk_graph.chunks.len()];
    let mut all_imports = Vec::with_capacity(chunk_graph.chunks.len());

    for (index, chunk) in chunk_graph.chunks.iter().enumerate() {
        let mut imports: IndexMap<usize, Vec<SymbolId>> = IndexMap::new();
        // Evaluation order across chunks follows static imports.
        for &module in &chunk.modules {
            for record in &graph.module(module).records {
                if !matches!(record.kind, ImportKind::ImportStatement | ImportKind::RequireCall) {
                    continue;
                }
                if let RecordTarget::Module(target) = record.target
                    && let Some(home) = chunk_graph.module_chunk(target)
                    && home != index
                {
                    imports.entry(home).or_default();
                }
            }
        }
        // An entry whose module lives in a shared chunk still runs it.
        if let Some(entry) = chunk.entry()
            && let Some(home) = chunk_graph.module_chunk(entry)
            && home != index
        {
            imports.entry(home).or_default();
        }

        for symbol in chunk_needs(linked, live, chunk) {
            let Some(home) = chunk_graph.module_chunk(linked.symbols.symbol(symbol).module) else {
                continue;
            };
            if home == index {
                continue;
            }
            let list = imports.entry(home).or_default();
            if !list.contains(&symbol) {
                list.push(symbol);
            }
            exports[home].insert(symbol);
        }
        all_imports.push(imports);
    }

    for ((chunk, imports), exported) in chunk_graph.chunks.iter_mut().zip(all_imports).zip(exports) {
        chunk.imports = imports;
        let mut exported: Vec<SymbolId> = exported.into_iter().collect();
        exported.sort();
        chunk.exports = exported;
    }
}

/// Every symbol the code of `chunk` refers to.
pub fn chunk_needs(
    linked: &LinkedGraph,
    live: &Liveness,
    chunk: &Chunk,
) -> IndexSet<SymbolId> {
    let mut needs = IndexSet::new();
    let add_binding = |needs: &mut IndexSet<SymbolId>, binding: &Binding| match binding {
        Binding::Symbol(symbol) => {
            needs.insert(*symbol);
        }
        Binding::Property { object, .. } => {
            needs.insert(*object);
        }
        Binding::Namespace(module) => {
            if let Some(symbol) = linked.symbols.namespace(*module) {
                needs.insert(symbol);
            }
        }
        Binding::Missing => {}
    };

    for &module in &chunk.modules {
        for part in live.live_parts(module) {
            for dep in linked.part_deps(module, part) {
                match *dep {
                    Dep::Symbol(symbol) => {
                        needs.insert(symbol);
                    }
                    Dep::Namespace(target) => {
                        if let Some(symbol) = linked.symbols.namespace(target) {
                            needs.insert(symbol);
                        }
                    }
                    Dep::Module(_) => {}
                }
            }
        }
        if live.is_namespace_live(module)
            && let Some(namespace) = linked.namespace(module)
        {
            for (_, binding) in &namespace.exports {
                add_binding(&mut needs, binding);
            }
            needs.extend(namespace.dynamic.iter().copied());
        }
    }
    if let Some(entry) = chunk.entry() {
        if linked.is_wrapped(entry) {
            needs.extend(linked.symbols.wrapper(entry));
        } else if let Some(namespace) = linked.namespace(entry) {
            for (_, binding) in &namespace.exports {
                add_binding(&mut needs, binding);
            }
        }
    }
    needs
}

/// Depth-first post-order over the static imports of live modules.
/// `follow_dynamic` also walks dynamic imports, whose targets are bundled
/// into the importer's chunk without splitting.
pub fn evaluation_order(
    graph: &ModuleGraph,
    live: &Liveness,
    roots: &[ModuleId],
    follow_dynamic: bool,
) -> Vec<ModuleId> {
    let mut visited = FixedBitSet::with_capacity(graph.len());
    let mut order = Vec::new();
    for &root in roots {
        if !live.is_module_live(root) || visited.put(root.index()) {
            continue;
        }
        let mut stack = vec![(root, 0usize)];
        while let Some((module, next)) = stack.last_mut() {
            let records = &graph.module(*module).records;
            let mut descend = None;
            while *next < records.len() {
                let record = &records[*next];
                *next += 1;
                let follow = match record.kind {
                    ImportKind::ImportStatement | ImportKind::RequireCall | ImportKind::UrlToken => {
                        true
                    }
                    ImportKind::DynamicImport => follow_dynamic,
                    ImportKind::EntryPoint | ImportKind::RequireResolve => false,
                };
                if follow
                    && let RecordTarget::Module(target) = record.target
                    && live.is_module_live(target)
                    && !visited.put(target.index())
                {
                    descend = Some(target);
                    break;
                }
            }
            match descend {
                Some(target) => stack.push((target, 0)),
                None => {
                    order.push(*module);
                    stack.pop();
                }
            }
        }
    }
    order
}

/// Entry file names relative to the deepest directory containing every
/// entry, with a `.js` extension.
fn entry_file_names(graph: &ModuleGraph, entries: &[ModuleId]) -> Vec<String> {
    let paths: Vec<&Path> = entries
        .iter()
        .map(|&entry| graph.module(entry).path.path.as_path())
        .collect();
    let base = common_dir(&paths);
    let mut taken = IndexSet::new();
    paths
        .iter()
        .map(|path| {
            let rel = path.strip_prefix(&base).unwrap_or(path);
            let stem = rel.with_extension("");
            let stem = stem.to_string_lossy().replace('\\', "/");
            let mut name = format!("{}.js", stem);
            let mut counter = 2;
            while !taken.insert(name.clone()) {
                name = format!("{}{}.js", stem, counter);
                counter += 1;
            }
            name
        })
        .collect()
}

fn common_dir(paths: &[&Path]) -> PathBuf {
    let mut iter = paths.iter();
    let Some(first) = iter.next() else {
        return PathBuf::new();
    };
    let mut base = first.parent().map(Path::to_path_buf).unwrap_or_default();
    for path in iter {
        while !path.starts_with(&base) {
            if !base.pop() {
                return PathBuf::new();
            }
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::Stmt;
    use crate::test_fixtures::Project;
    use crate::tree_shaking::shake_entries;

    fn log(value: crate::ast::Expr) -> Stmt {
        expr_stmt(method_call(ident("console"), "log", vec![value]))
    }

    fn chunks_of(project: &Project) -> (ModuleGraph, ChunkGraph) {
        let (graph, linked, diagnostics) = project.link();
        assert!(!diagnostics.has_errors(), "{:?}", diagnostics.into_sorted());
        let splitting = project.options.splitting;
        let live = shake_entries(&graph, &linked, project.options.format, splitting);
        let chunks = build_chunks(&graph, &linked, live, splitting);
        (graph, chunks)
    }

    fn displays(graph: &ModuleGraph, modules: &[ModuleId]) -> Vec<String> {
        modules
            .iter()
            .map(|&module| graph.module(module).display.clone())
            .collect()
    }

    fn two_entries() -> Project {
        Project::new(&["src/a.js", "src/b.js"])
            .module(
                "src/a.js",
                vec![import_named("./shared", &[("s", "s")]), log(ident("s"))],
            )
            .module(
                "src/b.js",
                vec![
                    import_named("./shared", &[("s", "s")]),
                    import_bare("./only-b"),
                    log(ident("s")),
                ],
            )
            .module("src/shared.js", vec![export_const("s", num(1.0))])
            .module("src/only-b.js", vec![log(str_lit("b"))])
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let project = Project::new(&["src/index.js"])
            .module(
                "src/index.js",
                vec![import_bare("./a"), import_bare("./b"), log(num(0.0))],
            )
            .module("src/a.js", vec![import_bare("./c"), log(str_lit("a"))])
            .module("src/b.js", vec![import_bare("./c"), log(str_lit("b"))])
            .module("src/c.js", vec![log(str_lit("c"))]);
        let (graph, chunks) = chunks_of(&project);
        assert_eq!(chunks.chunks.len(), 1);
        assert_eq!(chunks.chunks[0].file_name, "index.js");
        assert_eq!(
            displays(&graph, &chunks.chunks[0].modules),
            vec!["src/c.js", "src/a.js", "src/b.js", "src/index.js"]
        );
    }

    #[test]
    fn test_without_splitting_shared_code_is_duplicated() {
        let (graph, chunks) = chunks_of(&two_entries());
        let names: Vec<_> = chunks.chunks.iter().map(|c| c.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.js", "b.js"]);
        assert_eq!(
            displays(&graph, &chunks.chunks[0].modules),
            vec!["src/shared.js", "src/a.js"]
        );
        assert_eq!(
            displays(&graph, &chunks.chunks[1].modules),
            vec!["src/shared.js", "src/only-b.js", "src/b.js"]
        );
    }

    #[test]
    fn test_splitting_factors_out_shared_chunk() {
        let project = two_entries().configure(|options| options.splitting = true);
        let (graph, chunks) = chunks_of(&project);
        assert_eq!(chunks.chunks.len(), 3);
        let shared = &chunks.chunks[2];
        assert_eq!(shared.kind, ChunkKind::Shared);
        assert!(shared.file_name.starts_with("chunk-"));
        assert_eq!(displays(&graph, &shared.modules), vec!["src/shared.js"]);
        assert_eq!(
            displays(&graph, &chunks.chunks[1].modules),
            vec!["src/only-b.js", "src/b.js"]
        );

        // Both entries import `s` from the shared chunk.
        assert_eq!(shared.exports.len(), 1);
        for entry in 0..2 {
            let imported = &chunks.chunks[entry].imports[&2];
            assert_eq!(imported, &shared.exports);
        }
        assert_eq!(chunks.import_path(0, 2), format!("./{}", shared.file_name));
    }

    #[test]
    fn test_entry_names_are_relative_to_common_directory() {
        let project = Project::new(&["src/pages/home.ts", "src/admin/index.js"])
            .module("src/pages/home.ts", vec![log(num(1.0))])
            .module("src/admin/index.js", vec![log(num(2.0))]);
        let (_, chunks) = chunks_of(&project);
        let names: Vec<_> = chunks.chunks.iter().map(|c| c.file_name.as_str()).collect();
        assert_eq!(names, vec!["pages/home.js", "admin/index.js"]);
        assert_eq!(chunks.import_path(0, 1), "../admin/index.js");
    }
}
