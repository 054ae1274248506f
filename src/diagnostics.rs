//! Diagnostic Infrastructure
//!
//! This module provides infrastructure for collecting the errors and
//! advisories produced while resolving, linking, and emitting a bundle.
//! Every phase reports into a `DiagnosticBag`; nothing stops at the first
//! failure, so one build attempt surfaces every problem at once.
//!
//! # Components
//!
//! - `Diagnostic` - A single message with location, severity, and kind
//! - `DiagnosticBag` - A collection of diagnostics for a build
//! - `DiagnosticSeverity` - Error, Warning, Info, or Hint
//! - `ErrorKind` - Which part of the pipeline raised the diagnostic
//!
//! # Example
//!
//! ```ignore
//! let mut bag = DiagnosticBag::new();
//! bag.add(Diagnostic::error(ErrorKind::Resolution, "src/a.js", span, "Could not resolve \"x\"", codes::CANNOT_RESOLVE));
//! assert!(bag.has_errors());
//! ```

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric diagnostic codes, grouped by kind.
pub mod codes {
    /// Specifier could not be resolved to a file.
    pub const CANNOT_RESOLVE: u32 = 1001;
    /// Package `exports` has no entry for the requested subpath.
    pub const NOT_EXPORTED_BY_PACKAGE: u32 = 1002;
    /// Package `exports`/`imports` target is malformed or escapes the package.
    pub const INVALID_PACKAGE_TARGET: u32 = 1003;
    /// A package.json could not be read or parsed.
    pub const PACKAGE_JSON_ERROR: u32 = 1004;
    /// No loader is configured for the resolved file's extension.
    pub const NO_LOADER: u32 = 1005;

    /// Named import has no matching export in a static ESM module.
    pub const NO_MATCHING_EXPORT: u32 = 2001;
    /// Named import matches several conflicting `export *` sources.
    pub const AMBIGUOUS_IMPORT: u32 = 2002;
    /// Assignment to an import binding.
    pub const ASSIGN_TO_IMPORT: u32 = 2003;

    /// Re-export chain loops back on itself.
    pub const REEXPORT_CYCLE: u32 = 3001;

    /// Top-level await with a format that cannot express it.
    pub const TOP_LEVEL_AWAIT_FORMAT: u32 = 4001;
    /// `require()` of a module whose import closure uses top-level await.
    pub const REQUIRE_TOP_LEVEL_AWAIT: u32 = 4002;
    /// Top-level return inside an ECMAScript module.
    pub const TOP_LEVEL_RETURN_IN_ESM: u32 = 4003;
    /// Code splitting requested with a non-ESM format.
    pub const SPLITTING_REQUIRES_ESM: u32 = 4004;

    /// File could not be read or parsed.
    pub const LOAD_FAILED: u32 = 5001;
    /// Build options or tsconfig are invalid.
    pub const INVALID_CONFIG: u32 = 6001;
    /// A plugin hook returned an error.
    pub const PLUGIN_FAILED: u32 = 7001;

    /// Named import against a CommonJS module that does not seem to export it.
    pub const POSSIBLY_MISSING_COMMONJS_EXPORT: u32 = 8001;
    /// Namespace member access that can never be defined.
    pub const UNDEFINED_NAMESPACE_MEMBER: u32 = 8002;
    /// CommonJS globals used inside an ECMAScript module.
    pub const COMMONJS_IN_ESM: u32 = 8003;
    /// `import.meta` with a format that has no equivalent.
    pub const IMPORT_META_UNAVAILABLE: u32 = 8004;
    /// Re-export from a module whose export names are only known at run time.
    pub const DYNAMIC_STAR_EXPORT: u32 = 8005;
    /// `require` used in a way that cannot be bundled.
    pub const UNBUNDLED_REQUIRE: u32 = 8006;
}

// =============================================================================
// Diagnostic Severity
// =============================================================================

/// The severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// A hint (lowest severity)
    Hint = 4,
    /// Informational message
    Info = 3,
    /// A warning
    Warning = 2,
    /// An error (highest severity)
    Error = 1,
}

impl DiagnosticSeverity {
    /// Get the severity name for display.
    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info => "info",
            DiagnosticSeverity::Hint => "hint",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DiagnosticSeverity::Error)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, DiagnosticSeverity::Warning)
    }
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which stage of the pipeline raised a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Resolution,
    ExportBinding,
    Cycle,
    FormatCompatibility,
    Load,
    Config,
    Plugin,
    Advisory,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Resolution => "resolution",
            ErrorKind::ExportBinding => "export-binding",
            ErrorKind::Cycle => "cycle",
            ErrorKind::FormatCompatibility => "format-compatibility",
            ErrorKind::Load => "load",
            ErrorKind::Config => "config",
            ErrorKind::Plugin => "plugin",
            ErrorKind::Advisory => "advisory",
        }
    }
}

// =============================================================================
// Related Information
// =============================================================================

/// Additional location attached to a diagnostic, such as one link in a
/// re-export cycle or the other side of an ambiguous star export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRelatedInfo {
    /// File containing the related information
    pub file_name: String,
    /// Location span
    pub span: Span,
    /// Message explaining the relationship
    pub message: String,
}

impl DiagnosticRelatedInfo {
    pub fn new(file_name: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        DiagnosticRelatedInfo {
            file_name: file_name.into(),
            span,
            message: message.into(),
        }
    }
}

// =============================================================================
// Diagnostic
// =============================================================================

/// A diagnostic message with location, severity, and code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The file the diagnostic points at (display path)
    pub file_name: String,
    /// The source span (byte offsets)
    pub span: Span,
    /// The diagnostic message
    pub message: String,
    /// The severity level
    pub severity: DiagnosticSeverity,
    /// Pipeline stage that raised it
    pub kind: ErrorKind,
    /// Numeric code from [`codes`]
    pub code: u32,
    /// Optional related information
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub related: Vec<DiagnosticRelatedInfo>,
}

impl Diagnostic {
    pub fn new(
        kind: ErrorKind,
        file_name: impl Into<String>,
        span: Span,
        message: impl Into<String>,
        severity: DiagnosticSeverity,
        code: u32,
    ) -> Self {
        Diagnostic {
            file_name: file_name.into(),
            span,
            message: message.into(),
            severity,
            kind,
            code,
            related: Vec::new(),
        }
    }

    /// Create an error diagnostic.
    pub fn error(
        kind: ErrorKind,
        file_name: impl Into<String>,
        span: Span,
        message: impl Into<String>,
        code: u32,
    ) -> Self {
        Self::new(kind, file_name, span, message, DiagnosticSeverity::Error, code)
    }

    /// Create an advisory. Advisories never block output.
    pub fn warning(
        file_name: impl Into<String>,
        span: Span,
        message: impl Into<String>,
        code: u32,
    ) -> Self {
        Self::new(
            ErrorKind::Advisory,
            file_name,
            span,
            message,
            DiagnosticSeverity::Warning,
            code,
        )
    }

    /// Add related information.
    pub fn with_related(mut self, info: DiagnosticRelatedInfo) -> Self {
        self.related.push(info);
        self
    }

    /// Add multiple related information items.
    pub fn with_related_all(mut self, infos: Vec<DiagnosticRelatedInfo>) -> Self {
        self.related.extend(infos);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }

    pub fn is_warning(&self) -> bool {
        self.severity.is_warning()
    }

    /// Format the diagnostic in a simple single-line form.
    ///
    /// Returns a string like: `src/a.js: error[B1001]: Could not resolve "x"`
    pub fn format_simple(&self) -> String {
        if self.file_name.is_empty() {
            format!("{}[B{}]: {}", self.severity, self.code, self.message)
        } else {
            format!(
                "{}: {}[B{}]: {}",
                self.file_name, self.severity, self.code, self.message
            )
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

// =============================================================================
// DiagnosticBag
// =============================================================================

/// A collection of diagnostics for one build.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticBag {
    /// The collected diagnostics
    diagnostics: Vec<Diagnostic>,
    /// Error count
    error_count: usize,
    /// Warning count
    warning_count: usize,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        DiagnosticBag::default()
    }

    /// Add a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            DiagnosticSeverity::Error => self.error_count += 1,
            DiagnosticSeverity::Warning => self.warning_count += 1,
            _ => {}
        }
        self.diagnostics.push(diagnostic);
    }

    /// Add an error diagnostic.
    pub fn error(
        &mut self,
        kind: ErrorKind,
        file_name: impl Into<String>,
        span: Span,
        message: impl Into<String>,
        code: u32,
    ) {
        self.add(Diagnostic::error(kind, file_name, span, message, code));
    }

    /// Add an advisory.
    pub fn warning(
        &mut self,
        file_name: impl Into<String>,
        span: Span,
        message: impl Into<String>,
        code: u32,
    ) {
        self.add(Diagnostic::warning(file_name, span, message, code));
    }

    /// Move every diagnostic from `other` into this bag.
    pub fn extend(&mut self, other: DiagnosticBag) {
        for diagnostic in other.diagnostics {
            self.add(diagnostic);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.warning_count > 0
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Get only errors.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// Get only warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }

    /// Consume the bag, returning diagnostics in a stable order: by file,
    /// then by position, then by message. Phases run in a fixed order but
    /// parsing waves may finish in any order, so callers always sort.
    pub fn into_sorted(mut self) -> Vec<Diagnostic> {
        self.diagnostics.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.file_name.cmp(&b.file_name))
                .then_with(|| a.span.start.cmp(&b.span.start))
                .then_with(|| a.message.cmp(&b.message))
        });
        self.diagnostics.dedup();
        self.diagnostics
    }
}

impl IntoIterator for DiagnosticBag {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bag_counts_by_severity() {
        let mut bag = DiagnosticBag::new();
        bag.error(
            ErrorKind::Resolution,
            "a.js",
            Span::new(0, 3),
            "Could not resolve \"x\"",
            codes::CANNOT_RESOLVE,
        );
        bag.warning("b.js", Span::dummy(), "hmm", codes::COMMONJS_IN_ESM);

        assert!(bag.has_errors());
        assert!(bag.has_warnings());
        assert_eq!(bag.error_count(), 1);
        assert_eq!(bag.warning_count(), 1);
        assert_eq!(bag.errors().count(), 1);
    }

    #[test]
    fn test_format_simple() {
        let diag = Diagnostic::error(
            ErrorKind::ExportBinding,
            "src/entry.js",
            Span::dummy(),
            "No matching export",
            codes::NO_MATCHING_EXPORT,
        );
        assert_eq!(
            diag.format_simple(),
            "src/entry.js: error[B2001]: No matching export"
        );
    }

    #[test]
    fn test_into_sorted_puts_errors_first_and_dedups() {
        let mut bag = DiagnosticBag::new();
        bag.warning("a.js", Span::dummy(), "w", codes::COMMONJS_IN_ESM);
        bag.error(ErrorKind::Cycle, "b.js", Span::dummy(), "c", codes::REEXPORT_CYCLE);
        bag.error(ErrorKind::Cycle, "b.js", Span::dummy(), "c", codes::REEXPORT_CYCLE);

        let sorted = bag.into_sorted();
        assert_eq!(sorted.len(), 2);
        assert!(sorted[0].is_error());
        assert!(sorted[1].is_warning());
    }

    #[test]
    fn test_error_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ErrorKind::FormatCompatibility).unwrap();
        assert_eq!(json, "\"format-compatibility\"");
    }
}
