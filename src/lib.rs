//! tsz-bundler: module-graph linking for JavaScript and TypeScript bundles.
//!
//! A build runs five phases over one arena of modules:
//! resolve specifiers, build the module graph, link symbols across
//! modules, shake unused parts, and generate output chunks.
//! [`Bundler`] drives all of them; the phase modules are public for
//! embedders that want to stop early or inspect intermediate results.

// Shared test fixtures: in-memory projects run through any prefix of the pipeline
#[cfg(test)]
pub mod test_fixtures;

// Span - Source location tracking (byte offsets)
pub mod span;

// Diagnostics - Error collection, codes, and severity
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticSeverity, ErrorKind};

// Reporter - Colored terminal rendering of diagnostics
pub mod reporter;

// Tracing subscriber setup (TSZ_BUNDLE_LOG / TSZ_BUNDLE_LOG_FORMAT)
pub mod tracing_config;

// Build options and their validation
pub mod config;
pub use config::{BuildOptions, Format, Loader, Platform};

// Lenient JSON for config files
pub mod jsonc;

// File system seam
pub mod fs;
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};

// Module IR produced by the external parser
pub mod ast;

// Per-build name interning
pub mod interner;

// Purity annotations and the side-effect policy for top-level statements
pub mod annotations;
pub mod side_effects;

// Resolution: package.json, tsconfig paths, and the resolver itself
pub mod module_resolver;
pub mod package_json;
pub mod tsconfig;

// Loaders and the parser seam
pub mod loaders;
pub use loaders::{ModuleParser, ParsedModule, PreparsedParser};

// Source transforms applied before linking (define, inject, import elision)
pub mod transforms;

// Import record scanning and part analysis
pub mod parts;
pub mod scanner;

// Graph Builder
pub mod module_graph;

// Symbol Linker
pub mod exports;
pub mod linker;
pub mod symbols;

// Tree Shaker
pub mod tree_shaking;

// Output Generator: chunks, names, runtime helpers, printing
pub mod chunks;
pub mod output;
pub mod printer;
pub mod renamer;
pub mod runtime;

// Build manifest
pub mod metafile;

// Plugin hooks
pub mod plugins;
pub use plugins::Plugin;

// Build driver
pub mod bundler;
pub use bundler::{BuildFailure, BuildResult, Bundler};
