//! Build driver.
//!
//! [`Bundler::build`] runs the whole pipeline for one set of options:
//! graph building, linking, tree shaking, chunking, output generation and
//! the `on_chunk` plugin hooks. Every phase collects diagnostics instead of
//! stopping at the first problem; the build fails after the phase that
//! produced errors, and never hands back output once an error exists.

use crate::chunks::build_chunks;
use crate::config::{BuildOptions, Format};
use crate::diagnostics::{Diagnostic, DiagnosticBag, ErrorKind, codes};
use crate::fs::FileSystem;
use crate::linker::link;
use crate::loaders::ModuleParser;
use crate::metafile::{Metafile, build_metafile};
use crate::module_graph::GraphBuilder;
use crate::module_resolver::{ModuleResolver, ResolverOptions};
use crate::output::{OutputFile, OutputKind, generate};
use crate::plugins::{ChunkArgs, Plugin, hook_failure};
use crate::span::Span;
use crate::transforms::DefineTable;
use crate::tree_shaking::{check_top_level_await, shake_entries};
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn};

/// Everything a successful build produced.
#[derive(Debug)]
pub struct BuildResult {
    pub outputs: Vec<OutputFile>,
    /// Advisories, sorted by file and position
    pub warnings: Vec<Diagnostic>,
    pub metafile: Option<Metafile>,
    /// Absolute output directory
    pub outdir: PathBuf,
}

impl BuildResult {
    pub fn output(&self, path: &str) -> Option<&OutputFile> {
        self.outputs.iter().find(|output| output.path == path)
    }

    pub fn output_text(&self, path: &str) -> Option<&str> {
        self.output(path).and_then(OutputFile::text)
    }

    /// Write every output file below [`BuildResult::outdir`], creating
    /// directories as needed. Returns the written paths.
    pub fn write(&self) -> Result<Vec<PathBuf>> {
        self.write_to(&self.outdir)
    }

    pub fn write_to(&self, outdir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.outputs.len());
        for output in &self.outputs {
            let path = outdir.join(&output.path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("could not create {}", parent.display()))?;
            }
            std::fs::write(&path, &output.contents)
                .with_context(|| format!("could not write {}", path.display()))?;
            written.push(path);
        }
        Ok(written)
    }
}

/// A failed build: every error, plus the advisories raised before it failed.
#[derive(Debug)]
pub struct BuildFailure {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl BuildFailure {
    fn from_bag(bag: DiagnosticBag) -> Self {
        let (errors, warnings) = bag.into_sorted().into_iter().partition(Diagnostic::is_error);
        BuildFailure { errors, warnings }
    }

    pub fn has_code(&self, code: u32) -> bool {
        self.errors.iter().any(|error| error.code == code)
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "{}", error)?;
        }
        write!(
            f,
            "build failed with {} error{}",
            self.errors.len(),
            if self.errors.len() == 1 { "" } else { "s" }
        )
    }
}

impl std::error::Error for BuildFailure {}

pub struct Bundler {
    options: BuildOptions,
    fs: Arc<dyn FileSystem>,
    parser: Arc<dyn ModuleParser>,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl Bundler {
    pub fn new(options: BuildOptions, fs: Arc<dyn FileSystem>, parser: Arc<dyn ModuleParser>) -> Self {
        Bundler {
            options,
            fs,
            parser,
            plugins: Vec::new(),
        }
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn build(&self) -> Result<BuildResult, BuildFailure> {
        let options = &self.options;
        let _span = info_span!("build", entries = options.entry_points.len()).entered();
        let start = Instant::now();
        let mut diagnostics = DiagnosticBag::new();

        if options.splitting && options.format != Format::Esm {
            diagnostics.error(
                ErrorKind::FormatCompatibility,
                "",
                Span::dummy(),
                format!(
                    "Splitting currently only works with the \"esm\" format, not \"{}\"",
                    options.format.name()
                ),
                codes::SPLITTING_REQUIRES_ESM,
            );
            return Err(BuildFailure::from_bag(diagnostics));
        }
        let setup = options.validate().and_then(|()| {
            let resolver = ModuleResolver::new(
                self.fs.clone(),
                ResolverOptions::from_build_options(options),
            )?;
            let define = DefineTable::parse(&options.define)?;
            Ok((resolver, define))
        });
        let (resolver, define) = match setup {
            Ok(setup) => setup,
            Err(err) => {
                diagnostics.error(
                    ErrorKind::Config,
                    "",
                    Span::dummy(),
                    format!("{:#}", err),
                    codes::INVALID_CONFIG,
                );
                return Err(BuildFailure::from_bag(diagnostics));
            }
        };

        let (graph, graph_diagnostics) = GraphBuilder::new(
            options,
            self.fs.clone(),
            self.parser.as_ref(),
            &self.plugins,
            resolver,
            define,
        )
        .build();
        diagnostics.extend(graph_diagnostics);
        if diagnostics.has_errors() {
            return Err(BuildFailure::from_bag(diagnostics));
        }

        let (linked, link_diagnostics) = link(&graph, options);
        diagnostics.extend(link_diagnostics);
        if diagnostics.has_errors() {
            return Err(BuildFailure::from_bag(diagnostics));
        }

        let liveness = shake_entries(&graph, &linked, options.format, options.splitting);
        for live in &liveness {
            check_top_level_await(&graph, live, options.format, &mut diagnostics);
        }
        if diagnostics.has_errors() {
            return Err(BuildFailure::from_bag(diagnostics));
        }

        let chunk_graph = build_chunks(&graph, &linked, liveness, options.splitting);
        let (mut outputs, output_diagnostics) = generate(&graph, &linked, &chunk_graph, options);
        diagnostics.extend(output_diagnostics);

        self.run_chunk_hooks(&mut outputs, &mut diagnostics);
        if diagnostics.has_errors() {
            return Err(BuildFailure::from_bag(diagnostics));
        }

        let metafile = options
            .metafile
            .then(|| build_metafile(&graph, &outputs, options));
        let warnings = diagnostics.into_sorted();
        for warning in &warnings {
            warn!(code = warning.code, file = %warning.file_name, "{}", warning.message);
        }
        info!(
            modules = graph.len(),
            outputs = outputs.len(),
            warnings = warnings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "build complete"
        );
        Ok(BuildResult {
            outputs,
            warnings,
            metafile,
            outdir: options.absolute_outdir(),
        })
    }

    /// Let plugins edit the text of every generated chunk. Assets pass
    /// through untouched.
    fn run_chunk_hooks(&self, outputs: &mut [OutputFile], diagnostics: &mut DiagnosticBag) {
        if self.plugins.is_empty() {
            return;
        }
        for output in outputs.iter_mut() {
            if output.kind == OutputKind::Asset {
                continue;
            }
            let Ok(mut text) = String::from_utf8(std::mem::take(&mut output.contents)) else {
                continue;
            };
            for plugin in &self.plugins {
                let mut args = ChunkArgs {
                    path: Path::new(&output.path),
                    contents: &mut text,
                };
                if let Err(err) = plugin.on_chunk(&mut args) {
                    diagnostics.add(hook_failure(plugin.as_ref(), "on_chunk", &output.path, &err));
                }
            }
            output.contents = text.into_bytes();
        }
    }
}
