//! Plugin extension points.
//!
//! Plugins hook into three fixed points of a build:
//! - before resolve: redirect a specifier to a file or mark it external
//! - after parse: edit a module's IR before it is scanned and linked
//! - before chunk emission: edit the final text of an output file
//!
//! Hook failures never abort the build on the spot. They become `plugin`
//! diagnostics and fail the build together with every other error.

use crate::ast::Stmt;
use crate::diagnostics::{Diagnostic, ErrorKind, codes};
use crate::module_graph::ImportKind;
use crate::module_resolver::ModulePath;
use crate::span::Span;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// What `on_resolve` sees.
#[derive(Clone, Copy, Debug)]
pub struct ResolveArgs<'a> {
    pub specifier: &'a str,
    /// `None` for entry points
    pub importer: Option<&'a Path>,
    pub kind: ImportKind,
}

/// A plugin's answer to a resolve request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveOverride {
    /// Bundle this file instead
    Path(PathBuf),
    /// Leave the import in the output, rewritten to this specifier
    External(String),
}

/// An output file about to be written.
#[derive(Debug)]
pub struct ChunkArgs<'a> {
    /// Path relative to the output directory
    pub path: &'a Path,
    pub contents: &'a mut String,
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn on_resolve(&self, _args: &ResolveArgs<'_>) -> Result<Option<ResolveOverride>> {
        Ok(None)
    }

    fn on_parsed(&self, _module: &ModulePath, _stmts: &mut Vec<Stmt>) -> Result<()> {
        Ok(())
    }

    fn on_chunk(&self, _chunk: &mut ChunkArgs<'_>) -> Result<()> {
        Ok(())
    }
}

/// Diagnostic for a failed hook.
pub fn hook_failure(plugin: &dyn Plugin, hook: &str, file: &str, err: &anyhow::Error) -> Diagnostic {
    Diagnostic::error(
        ErrorKind::Plugin,
        file,
        Span::dummy(),
        format!("[plugin {}] {} failed: {:#}", plugin.name(), hook, err),
        codes::PLUGIN_FAILED,
    )
}
