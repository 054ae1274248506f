//! Shared test fixtures
//!
//! `Project` assembles an in-memory project (files plus pre-parsed module
//! IR) and runs any prefix of the pipeline over it, so unit tests of later
//! phases do not repeat the setup of earlier ones.

use crate::ast::Stmt;
use crate::bundler::{BuildFailure, BuildResult, Bundler};
use crate::config::{BuildOptions, Format};
use crate::diagnostics::DiagnosticBag;
use crate::fs::{FileSystem, MemoryFileSystem};
use crate::linker::{LinkedGraph, link};
use crate::loaders::PreparsedParser;
use crate::module_graph::{GraphBuilder, ModuleGraph};
use crate::module_resolver::{ModuleResolver, ResolverOptions};
use crate::plugins::Plugin;
use crate::transforms::DefineTable;
use std::path::PathBuf;
use std::sync::Arc;

/// Working directory of every fixture project.
pub const ROOT: &str = "/proj";

pub struct Project {
    pub fs: MemoryFileSystem,
    pub parser: Arc<PreparsedParser>,
    pub options: BuildOptions,
    pub plugins: Vec<Arc<dyn Plugin>>,
}

impl Project {
    /// A project with the given entry points, relative to [`ROOT`].
    pub fn new(entries: &[&str]) -> Self {
        Project {
            fs: MemoryFileSystem::new(),
            parser: Arc::new(PreparsedParser::new()),
            options: BuildOptions::new(ROOT, entries.iter().map(PathBuf::from).collect()),
            plugins: Vec::new(),
        }
    }

    /// A script module at `path` (relative to [`ROOT`]) with the given IR.
    pub fn module(mut self, path: &str, stmts: Vec<Stmt>) -> Self {
        let path = PathBuf::from(ROOT).join(path);
        self.fs.insert(&path, format!("// {}", path.display()));
        self.parser.insert(&path, stmts);
        self
    }

    /// A plain file (manifests, assets) at `path` relative to [`ROOT`].
    pub fn file(mut self, path: &str, contents: &str) -> Self {
        self.fs.insert(PathBuf::from(ROOT).join(path), contents);
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.options.format = format;
        self
    }

    pub fn configure(mut self, f: impl FnOnce(&mut BuildOptions)) -> Self {
        f(&mut self.options);
        self
    }

    pub fn plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn graph(&self) -> (ModuleGraph, DiagnosticBag) {
        let fs: Arc<dyn FileSystem> = Arc::new(self.fs.clone());
        let resolver = ModuleResolver::new(fs.clone(), ResolverOptions::from_build_options(&self.options))
            .expect("resolver options");
        let define = DefineTable::parse(&self.options.define).expect("define table");
        GraphBuilder::new(
            &self.options,
            fs,
            self.parser.as_ref(),
            &self.plugins,
            resolver,
            define,
        )
        .build()
    }

    /// Graph and link diagnostics together.
    pub fn link(&self) -> (ModuleGraph, LinkedGraph, DiagnosticBag) {
        let (graph, mut diagnostics) = self.graph();
        let (linked, link_diagnostics) = link(&graph, &self.options);
        diagnostics.extend(link_diagnostics);
        (graph, linked, diagnostics)
    }

    pub fn bundler(&self) -> Bundler {
        let mut bundler = Bundler::new(
            self.options.clone(),
            Arc::new(self.fs.clone()),
            self.parser.clone(),
        );
        for plugin in &self.plugins {
            bundler = bundler.with_plugin(plugin.clone());
        }
        bundler
    }

    pub fn bundle(&self) -> Result<BuildResult, BuildFailure> {
        self.bundler().build()
    }

    /// Bundle and return the text of the output file at `path` (relative
    /// to the output directory).
    pub fn output(&self, path: &str) -> String {
        let result = match self.bundle() {
            Ok(result) => result,
            Err(failure) => panic!("build failed:\n{}", failure),
        };
        match result.output_text(path) {
            Some(text) => text.to_string(),
            None => panic!(
                "no output named {}; have {:?}",
                path,
                result.outputs.iter().map(|o| o.path.clone()).collect::<Vec<_>>()
            ),
        }
    }
}
