use std::path::Path;

use swc_core::{
    common::{
        comments::SingleThreadedComments, sync::Lrc, FileName, Globals, Mark, SourceMap, Span,
        Spanned, GLOBALS,
    },
    ecma::{
        ast::{EsVersion, Module},
        codegen::{text_writer::JsWriter, Config as CodegenConfig, Emitter},
        parser::{parse_file_as_module, EsSyntax, Syntax, TsSyntax},
        transforms::base::resolver,
        visit::VisitMutWith,
    },
};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{CodemodError, Result};

// -----------------------------------------------------------------------------
// Dialects
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    Js,
    Ts,
    #[default]
    Tsx,
}

impl Dialect {
    /// `.ts`/`.mts`/`.cts` parse as TypeScript without JSX, other TypeScript
    /// extensions as TSX, everything else as JavaScript with JSX enabled.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("ts" | "mts" | "cts") => Dialect::Ts,
            Some("tsx") => Dialect::Tsx,
            _ => Dialect::Js,
        }
    }

    fn syntax(self) -> Syntax {
        match self {
            Dialect::Js => Syntax::Es(EsSyntax {
                jsx: true,
                ..Default::default()
            }),
            Dialect::Ts => Syntax::Typescript(TsSyntax {
                tsx: false,
                ..Default::default()
            }),
            Dialect::Tsx => Syntax::Typescript(TsSyntax {
                tsx: true,
                ..Default::default()
            }),
        }
    }

    fn is_typescript(self) -> bool {
        !matches!(self, Dialect::Js)
    }
}

// -----------------------------------------------------------------------------
// Source unit
// -----------------------------------------------------------------------------

/// One parsed file. Identifiers carry resolver contexts, so two identifiers
/// refer to the same binding iff their `Id`s are equal.
pub struct SourceUnit {
    pub name: String,
    pub dialect: Dialect,
    pub module: Module,
    cm: Lrc<SourceMap>,
    comments: SingleThreadedComments,
}

impl SourceUnit {
    pub fn parse(name: &str, source: &str, dialect: Dialect) -> Result<Self> {
        let cm: Lrc<SourceMap> = Default::default();
        let fm = cm.new_source_file(
            Lrc::new(FileName::Custom(name.to_string())),
            source.to_string(),
        );
        let comments = SingleThreadedComments::default();

        let mut recovered = vec![];
        let parsed = parse_file_as_module(
            &fm,
            dialect.syntax(),
            EsVersion::EsNext,
            Some(&comments),
            &mut recovered,
        );
        // Recovered errors still mean the tree may not reflect the text.
        let mut module = match parsed {
            Ok(module) => match recovered.into_iter().next() {
                None => module,
                Some(err) => return Err(parse_failure(&cm, name, err.span(), &err.kind().msg())),
            },
            Err(err) => return Err(parse_failure(&cm, name, err.span(), &err.kind().msg())),
        };

        GLOBALS.set(&Globals::new(), || {
            let unresolved_mark = Mark::new();
            let top_level_mark = Mark::new();
            module.visit_mut_with(&mut resolver(
                unresolved_mark,
                top_level_mark,
                dialect.is_typescript(),
            ));
        });

        Ok(Self {
            name: name.to_string(),
            dialect,
            module,
            cm,
            comments,
        })
    }

    pub fn print(&self) -> Result<String> {
        let mut buf = vec![];
        {
            let wr = JsWriter::new(self.cm.clone(), "\n", &mut buf, None);
            let mut emitter = Emitter {
                cfg: CodegenConfig::default().with_target(EsVersion::EsNext),
                cm: self.cm.clone(),
                comments: Some(&self.comments),
                wr,
            };
            emitter.emit_module(&self.module).map_err(CodemodError::Emit)?;
        }
        Ok(String::from_utf8(buf)?)
    }

    /// 1-based (line, column) of a span start; `(0, 0)` for synthesized nodes.
    pub fn location(&self, span: Span) -> (usize, usize) {
        location(&self.cm, span)
    }

    pub fn diagnostic(
        &self,
        span: Span,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Diagnostic {
        Diagnostic::new(self.name.clone(), self.location(span), kind, message)
    }
}

fn location(cm: &SourceMap, span: Span) -> (usize, usize) {
    if span.is_dummy() {
        return (0, 0);
    }
    let loc = cm.lookup_char_pos(span.lo);
    (loc.line, loc.col.0 + 1)
}

fn parse_failure(cm: &SourceMap, name: &str, span: Span, msg: &str) -> CodemodError {
    CodemodError::Parse(Diagnostic::new(
        name,
        location(cm, span),
        DiagnosticKind::ParseFailure,
        msg,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_core::ecma::ast::{ModuleDecl, ModuleItem};

    #[test]
    fn dialect_follows_extension() {
        assert_eq!(Dialect::from_path(Path::new("a/b.tsx")), Dialect::Tsx);
        assert_eq!(Dialect::from_path(Path::new("a/b.ts")), Dialect::Ts);
        assert_eq!(Dialect::from_path(Path::new("a/b.jsx")), Dialect::Js);
        assert_eq!(Dialect::from_path(Path::new("a/b.mjs")), Dialect::Js);
    }

    #[test]
    fn parses_jsx_and_keeps_comments() {
        let src = "// keep me\nimport Router from 'next/router';\nexport const A = () => <a onClick={() => Router.back()} />;\n";
        let unit = SourceUnit::parse("a.jsx", src, Dialect::Js).unwrap();
        assert!(matches!(
            unit.module.body[0],
            ModuleItem::ModuleDecl(ModuleDecl::Import(_))
        ));
        let out = unit.print().unwrap();
        assert!(out.contains("// keep me"));
        assert!(out.contains("Router.back()"));
    }

    #[test]
    fn parse_failure_carries_location() {
        let err = SourceUnit::parse("broken.ts", "const = 1;\n", Dialect::Ts)
            .err()
            .unwrap();
        let d = err.diagnostic().unwrap();
        assert_eq!(d.kind, DiagnosticKind::ParseFailure);
        assert_eq!(d.file, "broken.ts");
        assert_eq!(d.line, 1);
    }
}
