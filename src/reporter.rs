//! Terminal rendering of build diagnostics.

use crate::diagnostics::{Diagnostic, DiagnosticRelatedInfo, DiagnosticSeverity};
use crate::fs::FileSystem;
use crate::span::Span;
use colored::Colorize;
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::sync::Arc;

pub struct Reporter {
    color: bool,
    fs: Arc<dyn FileSystem>,
    /// Display paths in diagnostics are relative to this directory
    root: PathBuf,
    sources: FxHashMap<String, Option<Source>>,
}

struct Source {
    text: String,
    /// Byte offset of the start of every line
    line_starts: Vec<u32>,
}

impl Source {
    fn new(text: String) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(memchr::memchr_iter(b'\n', text.as_bytes()).map(|pos| pos as u32 + 1));
        Source { text, line_starts }
    }

    /// One-based line and column of a byte offset.
    fn position(&self, offset: u32) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        (line as u32 + 1, offset - self.line_starts[line] + 1)
    }

    fn line(&self, line: u32) -> Option<&str> {
        let start = *self.line_starts.get(line as usize - 1)? as usize;
        let end = self
            .line_starts
            .get(line as usize)
            .map(|&next| next as usize - 1)
            .unwrap_or(self.text.len());
        self.text.get(start..end).map(|line| line.trim_end_matches('\r'))
    }
}

impl Reporter {
    pub fn new(color: bool, fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Reporter {
            color,
            fs,
            root: root.into(),
            sources: FxHashMap::default(),
        }
    }

    pub fn render(&mut self, diagnostics: &[Diagnostic]) -> String {
        let mut out = String::new();
        for (index, diagnostic) in diagnostics.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&self.format_diagnostic(diagnostic));
        }
        out
    }

    /// One-line summary such as `2 errors, 1 warning`.
    pub fn summary(&self, diagnostics: &[Diagnostic]) -> String {
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        let warnings = diagnostics.iter().filter(|d| d.is_warning()).count();
        let plural = |count: usize, word: &str| {
            if count == 1 {
                format!("1 {}", word)
            } else {
                format!("{} {}s", count, word)
            }
        };
        let text = format!("{}, {}", plural(errors, "error"), plural(warnings, "warning"));
        if !self.color {
            return text;
        }
        if errors > 0 {
            text.red().bold().to_string()
        } else {
            text.bold().to_string()
        }
    }

    pub fn format_diagnostic(&mut self, diagnostic: &Diagnostic) -> String {
        let mut output = match self.format_location(&diagnostic.file_name, diagnostic.span) {
            Some(location) => location,
            None if !diagnostic.file_name.is_empty() => diagnostic.file_name.clone(),
            None => "<build>".to_string(),
        };
        output.push_str(" - ");
        output.push_str(&self.format_severity(diagnostic.severity));
        output.push(' ');
        output.push_str(&self.format_code(diagnostic.code));
        output.push_str(": ");
        output.push_str(&diagnostic.message);

        if let Some(snippet) = self.format_snippet(&diagnostic.file_name, diagnostic.span) {
            output.push_str(&snippet);
        }
        for related in &diagnostic.related {
            output.push('\n');
            output.push_str(&self.format_related(related));
            if let Some(snippet) = self.format_snippet(&related.file_name, related.span) {
                output.push_str(&snippet);
            }
        }
        output
    }

    /// The offending line with the span underlined:
    ///
    /// ```text
    ///     3   import { y } from "./ab";
    ///                  ~
    /// ```
    fn format_snippet(&mut self, file: &str, span: Span) -> Option<String> {
        if span.is_empty() {
            return None;
        }
        let color = self.color;
        let source = self.source(file)?;
        let (line, column) = source.position(span.start);
        let text = source.line(line)?;

        let mut underline = String::new();
        let first = column as usize - 1;
        let width = (span.end - span.start) as usize;
        for (index, ch) in text.chars().enumerate() {
            if index < first {
                underline.push(if ch == '\t' { '\t' } else { ' ' });
            } else if index < first + width {
                underline.push('~');
            } else {
                break;
            }
        }
        if !underline.contains('~') {
            underline.push('~');
        }
        let underline = if color {
            underline.red().to_string()
        } else {
            underline
        };
        Some(format!("\n  {:>3}   {}\n        {}", line, text, underline))
    }

    fn format_related(&mut self, related: &DiagnosticRelatedInfo) -> String {
        let location = self
            .format_location(&related.file_name, related.span)
            .unwrap_or_else(|| related.file_name.clone());
        let prefix = if self.color {
            "  Related".dimmed().to_string()
        } else {
            "  Related".to_string()
        };
        format!("{}: {} - {}", prefix, location, related.message)
    }

    fn format_location(&mut self, file: &str, span: Span) -> Option<String> {
        if file.is_empty() || span.is_empty() {
            return None;
        }
        let (line, column) = self.source(file)?.position(span.start);
        Some(format!("{}:{}:{}", file, line, column))
    }

    fn source(&mut self, file: &str) -> Option<&Source> {
        if !self.sources.contains_key(file) {
            let text = self.fs.read_to_string(&self.root.join(file)).ok();
            self.sources.insert(file.to_string(), text.map(Source::new));
        }
        self.sources.get(file)?.as_ref()
    }

    fn format_severity(&self, severity: DiagnosticSeverity) -> String {
        let label = severity.name();
        if !self.color {
            return label.to_string();
        }
        match severity {
            DiagnosticSeverity::Error => label.red().bold().to_string(),
            DiagnosticSeverity::Warning => label.yellow().bold().to_string(),
            DiagnosticSeverity::Info => label.blue().bold().to_string(),
            DiagnosticSeverity::Hint => label.cyan().bold().to_string(),
        }
    }

    fn format_code(&self, code: u32) -> String {
        let label = format!("B{}", code);
        if self.color {
            label.bright_blue().to_string()
        } else {
            label
        }
    }
}
