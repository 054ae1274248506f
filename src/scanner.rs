//! Import record scanning.
//!
//! Every `import`, `export ... from`, `export * from`, `require("x")`,
//! `require.resolve("x")`, `import("x")` and `new URL("x", import.meta.url)`
//! becomes one import record. The scanner numbers records in source order
//! and writes each record's index back into the IR node, so later phases
//! can go from a node straight to its resolved target.

use crate::ast::visit::{Rewriter, rewrite_stmts};
use crate::ast::{Expr, Stmt};
use crate::module_graph::ImportKind;
use crate::span::Span;
use smallvec::SmallVec;

/// A record as written, before resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannedRecord {
    pub specifier: String,
    pub kind: ImportKind,
    pub span: Span,
}

/// Records found in `stmts`, and the record indices used by each statement.
pub fn scan_records(stmts: &mut [Stmt]) -> (Vec<ScannedRecord>, Vec<SmallVec<[u32; 2]>>) {
    let mut scanner = Scanner::default();
    let mut per_stmt = Vec::with_capacity(stmts.len());
    for stmt in stmts.iter_mut() {
        scanner.current.clear();
        scanner.module_syntax(stmt);
        rewrite_stmts(std::slice::from_mut(stmt), &mut scanner);
        per_stmt.push(scanner.current.clone());
    }
    (scanner.records, per_stmt)
}

#[derive(Default)]
struct Scanner {
    records: Vec<ScannedRecord>,
    current: SmallVec<[u32; 2]>,
}

impl Scanner {
    fn add(&mut self, specifier: &str, kind: ImportKind, span: Span) -> u32 {
        let index = self.records.len() as u32;
        self.records.push(ScannedRecord {
            specifier: specifier.to_string(),
            kind,
            span,
        });
        self.current.push(index);
        index
    }

    fn module_syntax(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Import(import) if !import.type_only => {
                import.record = Some(self.add(&import.specifier, ImportKind::ImportStatement, import.span));
            }
            Stmt::ExportNamed(export) if !export.type_only => {
                if let Some(source) = &export.source {
                    let index = self.add(source, ImportKind::ImportStatement, export.span);
                    export.record = Some(index);
                }
            }
            Stmt::ExportAll(export) => {
                export.record = Some(self.add(&export.source, ImportKind::ImportStatement, export.span));
            }
            _ => {}
        }
    }
}

impl Rewriter for Scanner {
    fn module_reference(&mut self, expr: &Expr) -> Option<Expr> {
        match expr {
            Expr::Require { specifier, .. } => {
                let record = self.add(specifier, ImportKind::RequireCall, Span::dummy());
                Some(Expr::Require {
                    specifier: specifier.clone(),
                    record: Some(record),
                })
            }
            Expr::RequireResolve { specifier, .. } => {
                let record = self.add(specifier, ImportKind::RequireResolve, Span::dummy());
                Some(Expr::RequireResolve {
                    specifier: specifier.clone(),
                    record: Some(record),
                })
            }
            Expr::UrlToken { specifier, .. } => {
                let record = self.add(specifier, ImportKind::UrlToken, Span::dummy());
                Some(Expr::UrlToken {
                    specifier: specifier.clone(),
                    record: Some(record),
                })
            }
            Expr::DynamicImport { arg, .. } => {
                let Expr::Str(specifier) = arg.as_ref() else {
                    return None;
                };
                let record = self.add(specifier, ImportKind::DynamicImport, Span::dummy());
                Some(Expr::DynamicImport {
                    arg: arg.clone(),
                    record: Some(record),
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;

    #[test]
    fn test_records_in_source_order() {
        let mut stmts = vec![
            import_named("./a", &[("x", "x")]),
            export_from("./b", &[("y", "y")]),
            export_all("./c"),
            const_decl("d", require("./d")),
            expr_stmt(arrow(&[], dynamic_import("./e"))),
        ];
        let (records, per_stmt) = scan_records(&mut stmts);
        let specifiers: Vec<_> = records.iter().map(|r| r.specifier.as_str()).collect();
        assert_eq!(specifiers, vec!["./a", "./b", "./c", "./d", "./e"]);
        assert_eq!(records[3].kind, ImportKind::RequireCall);
        assert_eq!(records[4].kind, ImportKind::DynamicImport);
        assert_eq!(per_stmt[3].as_slice(), &[3]);
        let Stmt::Import(import) = &stmts[0] else {
            panic!("expected import");
        };
        assert_eq!(import.record, Some(0));
        let Stmt::Var(decl) = &stmts[3] else {
            panic!("expected var");
        };
        assert_eq!(
            decl.decls[0].init,
            Some(Expr::Require {
                specifier: "./d".to_string(),
                record: Some(3)
            })
        );
    }

    #[test]
    fn test_type_only_and_non_literal_imports_have_no_record() {
        let mut type_import = import_named("./types", &[("T", "T")]);
        if let Stmt::Import(import) = &mut type_import {
            import.type_only = true;
        }
        let mut stmts = vec![
            type_import,
            expr_stmt(Expr::DynamicImport {
                arg: Box::new(ident("name")),
                record: None,
            }),
        ];
        let (records, _) = scan_records(&mut stmts);
        assert!(records.is_empty());
    }
}
