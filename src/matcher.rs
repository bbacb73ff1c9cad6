use swc_core::{
    common::{Span, Spanned},
    ecma::{
        ast::{Id, *},
        visit::{Visit, VisitWith},
    },
};

use crate::config::CodemodConfig;
use crate::imports::{legacy_default_import, LegacyImport};
use crate::scope::{FunctionAncestor, FunctionKind};
use crate::tree::SourceUnit;

// -----------------------------------------------------------------------------
// Call-site matching
// -----------------------------------------------------------------------------

/// The legacy API took `(template, resolved)`; only the resolved argument
/// survives the rewrite.
const MAX_LEGACY_ARGS: usize = 2;

/// `<legacy>.<method>(...)` whose callee object resolves to the legacy import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSiteMatch {
    pub span: Span,
    pub method: String,
    pub arg_count: usize,
    pub binding: Id,
    /// Function-like ancestors, outermost first.
    pub ancestors: Vec<FunctionAncestor>,
}

/// A resolved legacy call that cannot be narrowed safely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub call: Span,
    /// Where the offending argument starts.
    pub at: Span,
    pub method: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct MatchSet {
    pub legacy: Option<LegacyImport>,
    pub matches: Vec<CallSiteMatch>,
    pub rejections: Vec<Rejection>,
}

/// Scans the unit for legacy calls in document order. Read-only.
pub fn find_matches(unit: &SourceUnit, config: &CodemodConfig) -> MatchSet {
    let Some(legacy) = legacy_default_import(
        &unit.module,
        &config.legacy_module,
        &config.legacy_local_name,
    ) else {
        return MatchSet::default();
    };

    let mut collector = CallSiteCollector {
        legacy: &legacy.id,
        config,
        ancestors: vec![],
        matches: vec![],
        rejections: vec![],
    };
    unit.module.visit_with(&mut collector);

    let CallSiteCollector {
        mut matches,
        mut rejections,
        ..
    } = collector;
    matches.sort_by_key(|m| m.span.lo);
    rejections.sort_by_key(|r| r.call.lo);

    MatchSet {
        legacy: Some(legacy),
        matches,
        rejections,
    }
}

struct CallSiteCollector<'a> {
    legacy: &'a Id,
    config: &'a CodemodConfig,
    ancestors: Vec<FunctionAncestor>,
    matches: Vec<CallSiteMatch>,
    rejections: Vec<Rejection>,
}

impl CallSiteCollector<'_> {
    fn enter<N: VisitWith<Self>>(&mut self, kind: FunctionKind, span: Span, body: Option<Span>, node: &N) {
        self.ancestors.push(FunctionAncestor { kind, span, body });
        node.visit_children_with(self);
        self.ancestors.pop();
    }

    fn inspect(&mut self, call: &CallExpr) {
        let Callee::Expr(callee) = &call.callee else {
            return;
        };
        let Expr::Member(MemberExpr {
            obj,
            prop: MemberProp::Ident(prop),
            ..
        }) = &**callee
        else {
            return;
        };
        let Expr::Ident(obj) = &**obj else {
            return;
        };
        // Identity, not spelling: a shadowing local has a different context.
        if obj.sym != self.legacy.0 || obj.ctxt != self.legacy.1 {
            return;
        }
        if !self.config.is_rewrite_method(&prop.sym) {
            return;
        }

        match check_arguments(&call.args) {
            Ok(()) => self.matches.push(CallSiteMatch {
                span: call.span,
                method: prop.sym.to_string(),
                arg_count: call.args.len(),
                binding: obj.to_id(),
                ancestors: self.ancestors.clone(),
            }),
            Err((at, reason)) => self.rejections.push(Rejection {
                call: call.span,
                at: at.unwrap_or(call.span),
                method: prop.sym.to_string(),
                reason,
            }),
        }
    }
}

impl Visit for CallSiteCollector<'_> {
    fn visit_function(&mut self, f: &Function) {
        let body = f.body.as_ref().map(|b| b.span);
        self.enter(FunctionKind::Function, f.span, body, f);
    }

    fn visit_arrow_expr(&mut self, a: &ArrowExpr) {
        let body = match &*a.body {
            BlockStmtOrExpr::BlockStmt(b) => Some(b.span),
            BlockStmtOrExpr::Expr(_) => None,
        };
        self.enter(FunctionKind::Arrow, a.span, body, a);
    }

    fn visit_constructor(&mut self, c: &Constructor) {
        let body = c.body.as_ref().map(|b| b.span);
        self.enter(FunctionKind::Constructor, c.span, body, c);
    }

    fn visit_getter_prop(&mut self, g: &GetterProp) {
        let body = g.body.as_ref().map(|b| b.span);
        self.enter(FunctionKind::Getter, g.span, body, g);
    }

    fn visit_setter_prop(&mut self, s: &SetterProp) {
        let body = s.body.as_ref().map(|b| b.span);
        self.enter(FunctionKind::Setter, s.span, body, s);
    }

    fn visit_call_expr(&mut self, n: &CallExpr) {
        self.inspect(n);
        n.visit_children_with(self);
    }
}

// -----------------------------------------------------------------------------
// Argument shape
// -----------------------------------------------------------------------------

/// Every argument but the last is dropped by the rewrite, so each of those
/// must be free of side effects.
fn check_arguments(args: &[ExprOrSpread]) -> Result<(), (Option<Span>, String)> {
    if let Some(spread) = args.iter().find_map(|a| a.spread) {
        return Err((
            Some(spread),
            "spread arguments cannot be narrowed to the resolved argument".into(),
        ));
    }
    if args.len() > MAX_LEGACY_ARGS {
        return Err((
            args.get(MAX_LEGACY_ARGS).map(|a| a.expr.span()),
            format!(
                "expected at most {MAX_LEGACY_ARGS} arguments, found {}",
                args.len()
            ),
        ));
    }
    let dropped = &args[..args.len().saturating_sub(1)];
    match dropped.iter().find(|a| !is_droppable(&a.expr)) {
        Some(arg) => Err((
            Some(arg.expr.span()),
            format!(
                "dropped leading argument is {}, not a literal or identifier",
                describe(&arg.expr)
            ),
        )),
        None => Ok(()),
    }
}

fn is_droppable(expr: &Expr) -> bool {
    match expr {
        Expr::Lit(_) | Expr::Ident(_) => true,
        Expr::Tpl(t) => t.exprs.is_empty(),
        Expr::Paren(p) => is_droppable(&p.expr),
        _ => false,
    }
}

fn describe(expr: &Expr) -> &'static str {
    match expr {
        Expr::Call(_) | Expr::OptChain(_) => "a call expression",
        Expr::New(_) => "a constructor call",
        Expr::Member(_) => "a member access",
        Expr::Tpl(_) => "a template literal with substitutions",
        Expr::Object(_) => "an object literal",
        Expr::Array(_) => "an array literal",
        Expr::Assign(_) | Expr::Update(_) => "an assignment",
        Expr::Await(_) | Expr::Yield(_) => "a suspension point",
        _ => "a computed expression",
    }
}
