//! Build manifest.
//!
//! A JSON description of what went where: every input with its imports
//! and the outputs it ended up in, and every output with the inputs that
//! contributed bytes to it.

use crate::config::BuildOptions;
use crate::fs::relative_display;
use crate::module_graph::{ImportKind, ModuleGraph, ModuleKind, RecordTarget};
use crate::output::{OutputFile, OutputImport, OutputKind};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct Metafile {
    pub inputs: IndexMap<String, MetaInput>,
    pub outputs: IndexMap<String, MetaOutput>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MetaInput {
    pub bytes: usize,
    pub imports: Vec<MetaInputImport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
    /// Output files this input was emitted into
    pub outputs: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MetaInputImport {
    pub path: String,
    pub kind: ImportKind,
    #[serde(skip_serializing_if = "is_false")]
    pub external: bool,
    /// The specifier as written, when it differs from `path`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaOutput {
    pub bytes: usize,
    pub inputs: IndexMap<String, MetaOutputInput>,
    pub imports: Vec<MetaOutputImport>,
    pub exports: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
    pub kind: OutputKind,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaOutputInput {
    pub bytes_in_output: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct MetaOutputImport {
    pub path: String,
    pub kind: ImportKind,
    #[serde(skip_serializing_if = "is_false")]
    pub external: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Metafile {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("could not serialize the metafile")
    }
}

/// Manifest for a finished build. Output keys are relative to the working
/// directory, like input keys.
pub fn build_metafile(graph: &ModuleGraph, outputs: &[OutputFile], options: &BuildOptions) -> Metafile {
    let outdir = options.absolute_outdir();
    let output_key = |path: &str| relative_display(&outdir.join(path), &options.working_dir);

    let mut inputs: IndexMap<String, MetaInput> = IndexMap::new();
    for module in graph.iter() {
        let imports = module
            .records
            .iter()
            .filter_map(|record| {
                let (path, external) = match &record.target {
                    RecordTarget::Module(target) => (graph.module(*target).display.clone(), false),
                    RecordTarget::External(specifier) => (specifier.clone(), true),
                    RecordTarget::Unresolved => return None,
                };
                let original = (record.specifier != path).then(|| record.specifier.clone());
                Some(MetaInputImport {
                    path,
                    kind: record.kind,
                    external,
                    original,
                })
            })
            .collect();
        let format = match module.kind {
            ModuleKind::Esm => Some("esm"),
            ModuleKind::CommonJs => Some("cjs"),
            ModuleKind::Unknown => None,
        };
        inputs.insert(
            module.display.clone(),
            MetaInput {
                bytes: module.source_len,
                imports,
                format,
                outputs: Vec::new(),
            },
        );
    }

    let mut meta_outputs = IndexMap::new();
    for output in outputs {
        let key = output_key(&output.path);
        let mut contributed = IndexMap::new();
        for &(module, bytes) in &output.inputs {
            let display = &graph.module(module).display;
            contributed.insert(
                display.clone(),
                MetaOutputInput {
                    bytes_in_output: bytes,
                },
            );
            if let Some(input) = inputs.get_mut(display)
                && !input.outputs.contains(&key)
            {
                input.outputs.push(key.clone());
            }
        }
        let imports = output
            .imports
            .iter()
            .map(|OutputImport { path, kind, external }| MetaOutputImport {
                path: if *external { path.clone() } else { resolve_chunk_path(&key, path) },
                kind: *kind,
                external: *external,
            })
            .collect();
        meta_outputs.insert(
            key,
            MetaOutput {
                bytes: output.contents.len(),
                inputs: contributed,
                imports,
                exports: output.exports.clone(),
                entry_point: output.entry.map(|entry| graph.module(entry).display.clone()),
                kind: output.kind,
            },
        );
    }

    Metafile {
        inputs,
        outputs: meta_outputs,
    }
}

/// `./chunk.js` imported from `out/pages/a.js` is `out/pages/chunk.js`.
fn resolve_chunk_path(from_key: &str, specifier: &str) -> String {
    let mut segments: Vec<&str> = from_key.split('/').collect();
    segments.pop();
    for segment in specifier.split('/') {
        match segment {
            "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
