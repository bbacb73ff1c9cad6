use swc_core::{
    common::DUMMY_SP,
    ecma::ast::*,
};

use crate::tree::SourceUnit;

// -----------------------------------------------------------------------------
// Directive prologue
// -----------------------------------------------------------------------------

/// Value of a directive-shaped statement (`"use client";`).
pub(crate) fn directive_value(stmt: &Stmt) -> Option<&str> {
    match stmt {
        Stmt::Expr(ExprStmt { expr, .. }) => match &**expr {
            Expr::Lit(Lit::Str(s)) => Some(&*s.value),
            _ => None,
        },
        _ => None,
    }
}

fn module_directive(item: &ModuleItem) -> Option<&str> {
    match item {
        ModuleItem::Stmt(stmt) => directive_value(stmt),
        ModuleItem::ModuleDecl(_) => None,
    }
}

/// Number of leading directive statements.
pub(crate) fn prologue_len(body: &[ModuleItem]) -> usize {
    body.iter().take_while(|item| module_directive(item).is_some()).count()
}

pub(crate) fn block_prologue_len(stmts: &[Stmt]) -> usize {
    stmts.iter().take_while(|s| directive_value(s).is_some()).count()
}

/// Puts `"literal";` at body position 0, moving it there if it already sits
/// later in the prologue. Returns whether the module changed.
pub fn ensure_leading_directive(unit: &mut SourceUnit, literal: &str) -> bool {
    let body = &mut unit.module.body;
    if body.first().and_then(module_directive) == Some(literal) {
        return false;
    }

    let existing = body[..prologue_len(body)]
        .iter()
        .position(|item| module_directive(item) == Some(literal));
    let item = match existing {
        Some(idx) => body.remove(idx),
        None => ModuleItem::Stmt(Stmt::Expr(ExprStmt {
            span: DUMMY_SP,
            expr: Box::new(Expr::Lit(Lit::Str(Str {
                span: DUMMY_SP,
                value: literal.into(),
                raw: None,
            }))),
        })),
    };
    body.insert(0, item);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Dialect, SourceUnit};

    fn unit(src: &str) -> SourceUnit {
        SourceUnit::parse("t.js", src, Dialect::Js).unwrap()
    }

    fn count(u: &SourceUnit, literal: &str) -> usize {
        u.module
            .body
            .iter()
            .filter(|i| module_directive(i) == Some(literal))
            .count()
    }

    #[test]
    fn prepends_once() {
        let mut u = unit("import a from 'a';\n");
        assert!(ensure_leading_directive(&mut u, "use client"));
        assert!(!ensure_leading_directive(&mut u, "use client"));
        assert_eq!(module_directive(&u.module.body[0]), Some("use client"));
        assert_eq!(count(&u, "use client"), 1);
    }

    #[test]
    fn noop_when_already_first() {
        let mut u = unit("'use client';\nexport default 1;\n");
        assert!(!ensure_leading_directive(&mut u, "use client"));
        assert_eq!(u.module.body.len(), 2);
    }

    #[test]
    fn moves_directive_to_front_of_prologue() {
        let mut u = unit("'use strict';\n'use client';\nfoo();\n");
        assert!(ensure_leading_directive(&mut u, "use client"));
        assert_eq!(module_directive(&u.module.body[0]), Some("use client"));
        assert_eq!(module_directive(&u.module.body[1]), Some("use strict"));
        assert_eq!(count(&u, "use client"), 1);
    }

    #[test]
    fn string_after_code_is_not_a_directive() {
        let mut u = unit("foo();\n'use client';\n");
        assert!(ensure_leading_directive(&mut u, "use client"));
        assert_eq!(module_directive(&u.module.body[0]), Some("use client"));
        assert_eq!(u.module.body.len(), 3);
    }
}
