//! In-memory projects for the end-to-end tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use tsz_bundler::ast::Stmt;
use tsz_bundler::{BuildFailure, BuildOptions, BuildResult, Bundler, MemoryFileSystem, PreparsedParser};

pub const ROOT: &str = "/proj";

pub struct TestProject {
    pub fs: MemoryFileSystem,
    pub parser: Arc<PreparsedParser>,
    pub options: BuildOptions,
}

impl TestProject {
    pub fn new(entries: &[&str]) -> Self {
        TestProject {
            fs: MemoryFileSystem::new(),
            parser: Arc::new(PreparsedParser::new()),
            options: BuildOptions::new(ROOT, entries.iter().map(PathBuf::from).collect()),
        }
    }

    pub fn module(mut self, path: &str, stmts: Vec<Stmt>) -> Self {
        let path = PathBuf::from(ROOT).join(path);
        self.fs.insert(&path, format!("// {}", path.display()));
        self.parser.insert(&path, stmts);
        self
    }

    pub fn file(mut self, path: &str, contents: &str) -> Self {
        self.fs.insert(PathBuf::from(ROOT).join(path), contents);
        self
    }

    pub fn configure(mut self, f: impl FnOnce(&mut BuildOptions)) -> Self {
        f(&mut self.options);
        self
    }

    pub fn bundle(&self) -> Result<BuildResult, BuildFailure> {
        Bundler::new(
            self.options.clone(),
            Arc::new(self.fs.clone()),
            self.parser.clone(),
        )
        .build()
    }

    pub fn output(&self, path: &str) -> String {
        let result = match self.bundle() {
            Ok(result) => result,
            Err(failure) => panic!("build failed:\n{}", failure),
        };
        result
            .output_text(path)
            .unwrap_or_else(|| panic!("no output named {}", path))
            .to_string()
    }
}
