use swc_core::{
    common::{BytePos, Span, SyntaxContext, DUMMY_SP},
    ecma::{
        ast::{Id, *},
        utils::find_pat_ids,
        visit::{Visit, VisitMut, VisitMutWith, VisitWith},
    },
};

use crate::directive::{block_prologue_len, prologue_len};
use crate::scope::ScopeFrame;
use crate::tree::SourceUnit;

// -----------------------------------------------------------------------------
// Local binding injection
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingPlan {
    /// Declare `const <binding> = <primitive>()` at the head of the frame.
    Insert,
    /// A suitable declaration already precedes every call site.
    Reuse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingConflict {
    pub span: Span,
    pub reason: String,
}

/// Decides whether `binding` can be declared in `frame` without shadowing or
/// being shadowed by anything already there.
pub fn check_local_binding(
    unit: &SourceUnit,
    frame: ScopeFrame,
    binding: &str,
    primitive: &str,
    call_sites: &[Span],
) -> Result<BindingPlan, BindingConflict> {
    let first_call = call_sites.iter().map(|s| s.lo).min();

    match frame {
        ScopeFrame::Module => {
            let reusable = reusable_declaration(module_stmts(&unit.module.body), binding, primitive);
            let mut scan = NameScan::new(binding);
            unit.module.visit_with(&mut scan);
            judge(binding, reusable, scan.found, first_call)
        }
        ScopeFrame::Block { body, .. } => {
            if let Some(span) = shadowed_primitive(&unit.module, body, primitive) {
                return Err(BindingConflict {
                    span,
                    reason: format!(
                        "`{primitive}` is declared locally and would shadow the imported one here"
                    ),
                });
            }
            let mut finder = FrameFinder {
                body,
                binding,
                primitive,
                first_call,
                outcome: None,
            };
            unit.module.visit_with(&mut finder);
            // The matcher produced this span, so the frame exists.
            finder.outcome.unwrap_or(Ok(BindingPlan::Insert))
        }
    }
}

fn module_stmts(body: &[ModuleItem]) -> impl Iterator<Item = &Stmt> {
    body.iter().filter_map(|item| match item {
        ModuleItem::Stmt(stmt) => Some(stmt),
        ModuleItem::ModuleDecl(_) => None,
    })
}

/// One occurrence of the binding's name inside a frame.
struct Occurrence {
    id: Id,
    span: Span,
}

fn judge(
    binding: &str,
    reusable: Option<(Id, Span)>,
    occurrences: Vec<Occurrence>,
    first_call: Option<BytePos>,
) -> Result<BindingPlan, BindingConflict> {
    if let Some(clash) = occurrences
        .iter()
        .find(|o| reusable.as_ref().map_or(true, |(id, _)| *id != o.id))
    {
        return Err(BindingConflict {
            span: clash.span,
            reason: format!(
                "`{binding}` is already bound in this scope; refusing to shadow it"
            ),
        });
    }
    match reusable {
        Some((_, decl)) if first_call.is_some_and(|lo| decl.lo > lo) => Err(BindingConflict {
            span: decl,
            reason: format!("`{binding}` is declared after a call site that would use it"),
        }),
        Some(_) => Ok(BindingPlan::Reuse),
        None => Ok(BindingPlan::Insert),
    }
}

/// `<binding> = <primitive>(...)` among the frame's own statements.
fn reusable_declaration<'a>(
    stmts: impl Iterator<Item = &'a Stmt>,
    binding: &str,
    primitive: &str,
) -> Option<(Id, Span)> {
    stmts
        .filter_map(|stmt| match stmt {
            Stmt::Decl(Decl::Var(var)) => Some(var),
            _ => None,
        })
        .flat_map(|var| var.decls.iter())
        .find_map(|decl| {
            let Pat::Ident(name) = &decl.name else {
                return None;
            };
            if &*name.id.sym != binding {
                return None;
            }
            invokes(decl.init.as_deref()?, primitive).then(|| (name.id.to_id(), decl.span))
        })
}

fn invokes(expr: &Expr, primitive: &str) -> bool {
    match expr {
        Expr::Call(CallExpr {
            callee: Callee::Expr(callee),
            ..
        }) => matches!(&**callee, Expr::Ident(i) if &*i.sym == primitive),
        _ => false,
    }
}

// -----------------------------------------------------------------------------
// Name scanning
// -----------------------------------------------------------------------------

/// Collects every identifier spelled like the binding.
struct NameScan<'a> {
    name: &'a str,
    found: Vec<Occurrence>,
}

impl<'a> NameScan<'a> {
    fn new(name: &'a str) -> Self {
        Self { name, found: vec![] }
    }
}

impl Visit for NameScan<'_> {
    fn visit_ident(&mut self, i: &Ident) {
        if &*i.sym == self.name {
            self.found.push(Occurrence {
                id: i.to_id(),
                span: i.span,
            });
        }
    }

    // Lowercase JSX tags are intrinsic elements, not references.
    fn visit_jsx_element_name(&mut self, n: &JSXElementName) {
        match n {
            JSXElementName::Ident(i) if i.sym.starts_with(|c: char| c.is_ascii_lowercase()) => {}
            JSXElementName::JSXNamespacedName(_) => {}
            _ => n.visit_children_with(self),
        }
    }
}

// -----------------------------------------------------------------------------
// Primitive shadowing
// -----------------------------------------------------------------------------

/// A non-module-level declaration of `primitive` whose scope encloses the
/// frame `body`, so `primitive()` at the head of the frame would not reach the
/// import. Module-level declarations are import conflicts instead.
fn shadowed_primitive(module: &Module, body: Span, primitive: &str) -> Option<Span> {
    let mut scan = ShadowScan {
        name: primitive,
        scopes: vec![],
        found: vec![],
    };
    module.visit_with(&mut scan);
    scan.found
        .into_iter()
        .find(|(scope, _)| scope.lo <= body.lo && body.hi <= scope.hi)
        .map(|(_, decl)| decl)
}

/// Records `(scope, declaration)` for every local declaration of `name`.
/// Block-level declarations are attributed to their block, `var` to the
/// enclosing function.
struct ShadowScan<'a> {
    name: &'a str,
    /// Innermost last; `true` marks function scopes.
    scopes: Vec<(Span, bool)>,
    found: Vec<(Span, Span)>,
}

impl ShadowScan<'_> {
    fn declare(&mut self, ident: &Ident, hoisted: bool) {
        if &*ident.sym != self.name {
            return;
        }
        let scope = self
            .scopes
            .iter()
            .rev()
            .find(|(_, function)| *function || !hoisted);
        if let Some(&(scope, _)) = scope {
            self.found.push((scope, ident.span));
        }
    }

    fn declare_pat(&mut self, pat: &Pat, hoisted: bool) {
        for ident in find_pat_ids::<_, Ident>(pat) {
            self.declare(&ident, hoisted);
        }
    }

    fn enter(&mut self, scope: Span, function: bool, visit: impl FnOnce(&mut Self)) {
        self.scopes.push((scope, function));
        visit(self);
        self.scopes.pop();
    }
}

impl Visit for ShadowScan<'_> {
    fn visit_import_decl(&mut self, _: &ImportDecl) {}

    fn visit_fn_decl(&mut self, n: &FnDecl) {
        self.declare(&n.ident, false);
        n.function.visit_with(self);
    }

    fn visit_class_decl(&mut self, n: &ClassDecl) {
        self.declare(&n.ident, false);
        n.class.visit_with(self);
    }

    fn visit_fn_expr(&mut self, n: &FnExpr) {
        self.enter(n.function.span, true, |this| {
            if let Some(ident) = &n.ident {
                this.declare(ident, false);
            }
            n.function.visit_with(this);
        });
    }

    fn visit_class_expr(&mut self, n: &ClassExpr) {
        self.enter(n.class.span, false, |this| {
            if let Some(ident) = &n.ident {
                this.declare(ident, false);
            }
            n.class.visit_with(this);
        });
    }

    fn visit_function(&mut self, f: &Function) {
        self.enter(f.span, true, |this| {
            for p in &f.params {
                this.declare_pat(&p.pat, false);
            }
            f.visit_children_with(this);
        });
    }

    fn visit_arrow_expr(&mut self, a: &ArrowExpr) {
        self.enter(a.span, true, |this| {
            for p in &a.params {
                this.declare_pat(p, false);
            }
            a.visit_children_with(this);
        });
    }

    fn visit_constructor(&mut self, c: &Constructor) {
        self.enter(c.span, true, |this| {
            for p in &c.params {
                match p {
                    ParamOrTsParamProp::Param(p) => this.declare_pat(&p.pat, false),
                    ParamOrTsParamProp::TsParamProp(p) => {
                        for ident in find_pat_ids::<_, Ident>(&p.param) {
                            this.declare(&ident, false);
                        }
                    }
                }
            }
            c.visit_children_with(this);
        });
    }

    fn visit_getter_prop(&mut self, g: &GetterProp) {
        self.enter(g.span, true, |this| g.visit_children_with(this));
    }

    fn visit_setter_prop(&mut self, s: &SetterProp) {
        self.enter(s.span, true, |this| {
            this.declare_pat(&s.param, false);
            s.visit_children_with(this);
        });
    }

    fn visit_catch_clause(&mut self, c: &CatchClause) {
        self.enter(c.span, false, |this| {
            if let Some(param) = &c.param {
                this.declare_pat(param, false);
            }
            c.visit_children_with(this);
        });
    }

    fn visit_block_stmt(&mut self, b: &BlockStmt) {
        self.enter(b.span, false, |this| b.visit_children_with(this));
    }

    fn visit_var_decl(&mut self, v: &VarDecl) {
        let hoisted = v.kind == VarDeclKind::Var;
        for d in &v.decls {
            self.declare_pat(&d.name, hoisted);
        }
        v.visit_children_with(self);
    }

    fn visit_using_decl(&mut self, u: &UsingDecl) {
        for d in &u.decls {
            self.declare_pat(&d.name, false);
        }
        u.visit_children_with(self);
    }
}

/// Finds the function-like node owning `body` and judges its params and body.
struct FrameFinder<'a> {
    body: Span,
    binding: &'a str,
    primitive: &'a str,
    first_call: Option<BytePos>,
    outcome: Option<Result<BindingPlan, BindingConflict>>,
}

impl FrameFinder<'_> {
    fn judge_frame(&mut self, params: Vec<Id>, param_span: Span, block: &BlockStmt) {
        if let Some(id) = params.iter().find(|id| &*id.0 == self.binding) {
            self.outcome = Some(Err(BindingConflict {
                span: param_span,
                reason: format!("`{}` is already a parameter of this function", id.0),
            }));
            return;
        }
        let reusable = reusable_declaration(block.stmts.iter(), self.binding, self.primitive);
        let mut scan = NameScan::new(self.binding);
        block.visit_with(&mut scan);
        self.outcome = Some(judge(self.binding, reusable, scan.found, self.first_call));
    }

    fn owns<'b>(&self, body: Option<&'b BlockStmt>) -> Option<&'b BlockStmt> {
        body.filter(|b| b.span == self.body)
    }
}

impl Visit for FrameFinder<'_> {
    fn visit_function(&mut self, f: &Function) {
        if let Some(block) = self.owns(f.body.as_ref()) {
            let params = f.params.iter().flat_map(|p| find_pat_ids::<_, Id>(&p.pat)).collect();
            return self.judge_frame(params, f.span, block);
        }
        f.visit_children_with(self);
    }

    fn visit_arrow_expr(&mut self, a: &ArrowExpr) {
        if let BlockStmtOrExpr::BlockStmt(b) = &*a.body {
            if let Some(block) = self.owns(Some(b)) {
                let params = a.params.iter().flat_map(|p| find_pat_ids::<_, Id>(p)).collect();
                return self.judge_frame(params, a.span, block);
            }
        }
        a.visit_children_with(self);
    }

    fn visit_constructor(&mut self, c: &Constructor) {
        if let Some(block) = self.owns(c.body.as_ref()) {
            let params = c
                .params
                .iter()
                .flat_map(|p| match p {
                    ParamOrTsParamProp::Param(p) => find_pat_ids::<_, Id>(&p.pat),
                    ParamOrTsParamProp::TsParamProp(p) => find_pat_ids::<_, Id>(&p.param),
                })
                .collect();
            return self.judge_frame(params, c.span, block);
        }
        c.visit_children_with(self);
    }

    fn visit_getter_prop(&mut self, g: &GetterProp) {
        if let Some(block) = self.owns(g.body.as_ref()) {
            return self.judge_frame(vec![], g.span, block);
        }
        g.visit_children_with(self);
    }

    fn visit_setter_prop(&mut self, s: &SetterProp) {
        if let Some(block) = self.owns(s.body.as_ref()) {
            let params = find_pat_ids::<_, Id>(&*s.param);
            return self.judge_frame(params, s.span, block);
        }
        s.visit_children_with(self);
    }
}

// -----------------------------------------------------------------------------
// Insertion
// -----------------------------------------------------------------------------

/// Ensures `const <binding> = init()` heads the frame, after any directive
/// prologue (and, for the module, after the leading imports). Returns whether
/// a declaration was inserted.
pub fn ensure_local_binding(
    unit: &mut SourceUnit,
    frame: ScopeFrame,
    binding: &str,
    primitive: &str,
    init: impl FnOnce() -> Box<Expr>,
) -> bool {
    let decl = || declaration(binding, init());
    match frame {
        ScopeFrame::Module => {
            let body = &mut unit.module.body;
            let existing = reusable_declaration(module_stmts(body), binding, primitive);
            if existing.is_some() {
                return false;
            }
            let at = prologue_len(body)
                + body[prologue_len(body)..]
                    .iter()
                    .take_while(|item| matches!(item, ModuleItem::ModuleDecl(ModuleDecl::Import(_))))
                    .count();
            body.insert(at, ModuleItem::Stmt(decl()));
            true
        }
        ScopeFrame::Block { body, .. } => {
            let mut inserter = BlockInserter {
                body,
                binding,
                primitive,
                stmt: Some(decl),
                inserted: false,
            };
            unit.module.visit_mut_with(&mut inserter);
            inserter.inserted
        }
    }
}

fn declaration(binding: &str, init: Box<Expr>) -> Stmt {
    Stmt::Decl(Decl::Var(Box::new(VarDecl {
        span: DUMMY_SP,
        kind: VarDeclKind::Const,
        declare: false,
        decls: vec![VarDeclarator {
            span: DUMMY_SP,
            name: Pat::Ident(BindingIdent {
                id: Ident::new(binding.into(), DUMMY_SP, SyntaxContext::empty()),
                type_ann: None,
            }),
            init: Some(init),
            definite: false,
        }],
        ctxt: SyntaxContext::empty(),
    })))
}

struct BlockInserter<'a, F: FnOnce() -> Stmt> {
    body: Span,
    binding: &'a str,
    primitive: &'a str,
    stmt: Option<F>,
    inserted: bool,
}

impl<F: FnOnce() -> Stmt> VisitMut for BlockInserter<'_, F> {
    fn visit_mut_block_stmt(&mut self, block: &mut BlockStmt) {
        if block.span != self.body {
            return block.visit_mut_children_with(self);
        }
        let Some(make) = self.stmt.take() else {
            return;
        };
        if reusable_declaration(block.stmts.iter(), self.binding, self.primitive).is_some() {
            return;
        }
        let at = block_prologue_len(&block.stmts);
        block.stmts.insert(at, make());
        self.inserted = true;
    }
}
