use swc_core::common::Span;

use crate::matcher::CallSiteMatch;

// -----------------------------------------------------------------------------
// Scope frames
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Function declarations and expressions, class and object methods.
    Function,
    Arrow,
    Constructor,
    Getter,
    Setter,
}

/// A function-like node on the path from the module root to a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionAncestor {
    pub kind: FunctionKind,
    pub span: Span,
    /// Span of the block body; `None` for expression-bodied arrows and
    /// body-less declarations.
    pub body: Option<Span>,
}

/// Where the local binding for a call site is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeFrame {
    Module,
    Block { body: Span, kind: FunctionKind },
}

/// Innermost function-like ancestor whose block body encloses the call.
///
/// A call sitting in a parameter default is not inside the body, so the
/// search moves on to the next enclosing function.
pub fn resolve_frame(m: &CallSiteMatch) -> ScopeFrame {
    m.ancestors
        .iter()
        .rev()
        .find_map(|a| {
            a.body
                .filter(|body| encloses(*body, m.span))
                .map(|body| ScopeFrame::Block { body, kind: a.kind })
        })
        .unwrap_or(ScopeFrame::Module)
}

fn encloses(outer: Span, inner: Span) -> bool {
    outer.lo <= inner.lo && inner.hi <= outer.hi
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_core::common::{BytePos, SyntaxContext};

    fn span(lo: u32, hi: u32) -> Span {
        Span::new(BytePos(lo), BytePos(hi))
    }

    fn call_at(lo: u32, hi: u32, ancestors: Vec<FunctionAncestor>) -> CallSiteMatch {
        CallSiteMatch {
            span: span(lo, hi),
            method: "push".into(),
            arg_count: 2,
            binding: ("Nav".into(), SyntaxContext::empty()),
            ancestors,
        }
    }

    #[test]
    fn no_function_ancestor_falls_back_to_module() {
        assert_eq!(resolve_frame(&call_at(10, 20, vec![])), ScopeFrame::Module);
    }

    #[test]
    fn innermost_block_body_wins() {
        let outer = FunctionAncestor {
            kind: FunctionKind::Function,
            span: span(1, 100),
            body: Some(span(10, 100)),
        };
        let inner = FunctionAncestor {
            kind: FunctionKind::Arrow,
            span: span(20, 90),
            body: Some(span(30, 90)),
        };
        assert_eq!(
            resolve_frame(&call_at(40, 50, vec![outer, inner])),
            ScopeFrame::Block {
                body: span(30, 90),
                kind: FunctionKind::Arrow
            }
        );
    }

    #[test]
    fn expression_bodied_arrow_is_skipped() {
        let outer = FunctionAncestor {
            kind: FunctionKind::Function,
            span: span(1, 100),
            body: Some(span(10, 100)),
        };
        let arrow = FunctionAncestor {
            kind: FunctionKind::Arrow,
            span: span(20, 60),
            body: None,
        };
        assert_eq!(
            resolve_frame(&call_at(40, 50, vec![outer, arrow])),
            ScopeFrame::Block {
                body: span(10, 100),
                kind: FunctionKind::Function
            }
        );
    }

    #[test]
    fn call_in_parameter_default_uses_enclosing_frame() {
        let f = FunctionAncestor {
            kind: FunctionKind::Function,
            span: span(1, 100),
            body: Some(span(60, 100)),
        };
        assert_eq!(resolve_frame(&call_at(20, 40, vec![f])), ScopeFrame::Module);
    }
}
