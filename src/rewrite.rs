use std::collections::HashMap;

use swc_core::{
    common::{Span, SyntaxContext, DUMMY_SP},
    ecma::{
        ast::*,
        visit::{VisitMut, VisitMutWith},
    },
};

use crate::matcher::CallSiteMatch;
use crate::tree::SourceUnit;

// -----------------------------------------------------------------------------
// Call rewriting
// -----------------------------------------------------------------------------

/// Turns every targeted `Legacy.method(template, resolved)` into
/// `binding.method(resolved)`. Returns how many calls were replaced.
///
/// Argument shapes were vetted by the matcher; this only narrows.
pub fn rewrite_calls(unit: &mut SourceUnit, targets: &[&CallSiteMatch], binding: &str) -> usize {
    let mut rewriter = CallRewriter {
        targets: targets
            .iter()
            .map(|m| (m.span, (m.binding.clone(), m.method.clone())))
            .collect(),
        binding,
        rewritten: 0,
    };
    unit.module.visit_mut_with(&mut rewriter);
    rewriter.rewritten
}

struct CallRewriter<'a> {
    targets: HashMap<Span, (Id, String)>,
    binding: &'a str,
    rewritten: usize,
}

impl CallRewriter<'_> {
    /// The callee still reads `<legacy>.<method>`.
    fn still_legacy(call: &CallExpr, legacy: &Id, method: &str) -> Option<Span> {
        let Callee::Expr(callee) = &call.callee else {
            return None;
        };
        match &**callee {
            Expr::Member(MemberExpr {
                span,
                obj,
                prop: MemberProp::Ident(prop),
                ..
            }) if &*prop.sym == method => match &**obj {
                Expr::Ident(obj) if obj.sym == legacy.0 && obj.ctxt == legacy.1 => Some(*span),
                _ => None,
            },
            _ => None,
        }
    }
}

impl VisitMut for CallRewriter<'_> {
    fn visit_mut_call_expr(&mut self, n: &mut CallExpr) {
        // Inner calls first: a match may sit inside another match's last argument.
        n.visit_mut_children_with(self);

        let Some((legacy, method)) = self.targets.get(&n.span) else {
            return;
        };
        let Some(member_span) = Self::still_legacy(n, legacy, method) else {
            return;
        };

        let resolved = n.args.pop();
        n.args = resolved.into_iter().collect();
        n.callee = Callee::Expr(Box::new(Expr::Member(MemberExpr {
            span: member_span,
            obj: Box::new(Expr::Ident(Ident::new(
                self.binding.into(),
                DUMMY_SP,
                SyntaxContext::empty(),
            ))),
            prop: MemberProp::Ident(IdentName::new(method.as_str().into(), DUMMY_SP)),
        })));
        n.type_args = None;
        self.rewritten += 1;
    }
}
