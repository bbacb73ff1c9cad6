use swc_core::{
    common::{Span, SyntaxContext, DUMMY_SP},
    ecma::{
        ast::{Id, ImportPhase, *},
        utils::find_pat_ids,
        visit::{Visit, VisitWith},
    },
};

use crate::directive::prologue_len;
use crate::tree::SourceUnit;

// -----------------------------------------------------------------------------
// Import declaration manager
// -----------------------------------------------------------------------------

/// The default import the legacy facility is reached through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyImport {
    pub id: Id,
    /// Span of the whole import declaration.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConflict {
    pub span: Span,
    pub reason: String,
}

fn import_decls(module: &Module) -> impl Iterator<Item = &ImportDecl> {
    module.body.iter().filter_map(|item| match item {
        ModuleItem::ModuleDecl(ModuleDecl::Import(decl)) => Some(decl),
        _ => None,
    })
}

/// Name a named specifier imports, e.g. `a` for both `{ a }` and `{ a as b }`.
fn imported_name(named: &ImportNamedSpecifier) -> &str {
    match &named.imported {
        Some(ModuleExportName::Ident(i)) => &*i.sym,
        Some(ModuleExportName::Str(s)) => &*s.value,
        None => &*named.local.sym,
    }
}

/// A declaration that can take another named specifier without a second
/// declaration for the same module.
fn is_mergeable(decl: &ImportDecl) -> bool {
    !decl.type_only
        && !decl
            .specifiers
            .iter()
            .any(|s| matches!(s, ImportSpecifier::Namespace(_)))
}

/// The local a specifier binds when it imports the default export, covering
/// both `import X from ..` and `import { default as X } from ..`.
fn default_local(spec: &ImportSpecifier) -> Option<&Ident> {
    match spec {
        ImportSpecifier::Default(d) => Some(&d.local),
        ImportSpecifier::Named(n) if !n.is_type_only && imported_name(n) == "default" => {
            Some(&n.local)
        }
        _ => None,
    }
}

/// The default export of `source` bound as `local`, if imported.
pub fn legacy_default_import(module: &Module, source: &str, local: &str) -> Option<LegacyImport> {
    import_decls(module)
        .filter(|decl| !decl.type_only && &*decl.src.value == source)
        .find_map(|decl| {
            decl.specifiers
                .iter()
                .filter_map(default_local)
                .find(|ident| &*ident.sym == local)
                .map(|ident| LegacyImport {
                    id: ident.to_id(),
                    span: decl.span,
                })
        })
}

/// Checks that `{ name }` from `source` can be present without clashing with
/// another binding of the same name or needing a second declaration.
pub fn check_named_import(unit: &SourceUnit, source: &str, name: &str) -> Result<(), ImportConflict> {
    let module = &unit.module;
    let mut present = false;

    for decl in import_decls(module) {
        let same_source = &*decl.src.value == source;
        for spec in &decl.specifiers {
            let (local, span) = match spec {
                ImportSpecifier::Named(n) => (&n.local, n.span),
                ImportSpecifier::Default(d) => (&d.local, d.span),
                ImportSpecifier::Namespace(ns) => (&ns.local, ns.span),
            };
            if &*local.sym != name {
                continue;
            }
            match spec {
                ImportSpecifier::Named(n)
                    if same_source
                        && !decl.type_only
                        && !n.is_type_only
                        && imported_name(n) == name =>
                {
                    present = true;
                }
                ImportSpecifier::Named(n) if same_source => {
                    return Err(ImportConflict {
                        span,
                        reason: format!(
                            "`{name}` is already bound to `{}` from \"{source}\"",
                            imported_name(n)
                        ),
                    });
                }
                _ => {
                    return Err(ImportConflict {
                        span,
                        reason: format!(
                            "`{name}` is already imported from \"{}\"",
                            decl.src.value
                        ),
                    });
                }
            }
        }
    }

    if let Some(span) = top_level_declaration(module, name) {
        return Err(ImportConflict {
            span,
            reason: format!("`{name}` is already declared at module level"),
        });
    }

    if !present {
        let mut for_source = import_decls(module).filter(|d| &*d.src.value == source).peekable();
        if let Some(first) = for_source.peek() {
            let span = first.span;
            if !for_source.any(is_mergeable) {
                return Err(ImportConflict {
                    span,
                    reason: format!(
                        "\"{source}\" is only imported as a namespace or type-only; cannot merge `{name}`"
                    ),
                });
            }
        }
    }
    Ok(())
}

fn top_level_declaration(module: &Module, name: &str) -> Option<Span> {
    let named = |ident: &Ident| (&*ident.sym == name).then_some(ident.span);
    module.body.iter().find_map(|item| {
        let decl = match item {
            ModuleItem::Stmt(Stmt::Decl(decl)) => decl,
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl { decl, .. })) => decl,
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(d)) => {
                return match &d.decl {
                    DefaultDecl::Fn(f) => f.ident.as_ref().and_then(named),
                    DefaultDecl::Class(c) => c.ident.as_ref().and_then(named),
                    DefaultDecl::TsInterfaceDecl(i) => named(&i.id),
                };
            }
            ModuleItem::ModuleDecl(ModuleDecl::TsImportEquals(d)) => return named(&d.id),
            _ => return None,
        };
        match decl {
            Decl::Fn(f) => named(&f.ident),
            Decl::Class(c) => named(&c.ident),
            Decl::Var(v) => var_declares(&v.decls, name),
            Decl::Using(u) => var_declares(&u.decls, name),
            Decl::TsEnum(e) => named(&e.id),
            Decl::TsInterface(i) => named(&i.id),
            Decl::TsTypeAlias(t) => named(&t.id),
            Decl::TsModule(m) => match &m.id {
                TsModuleName::Ident(i) => named(i),
                TsModuleName::Str(_) => None,
            },
        }
    })
}

fn var_declares(decls: &[VarDeclarator], name: &str) -> Option<Span> {
    decls.iter().find_map(|d| {
        find_pat_ids::<_, Id>(&d.name)
            .iter()
            .any(|id| &*id.0 == name)
            .then_some(d.span)
    })
}

/// Ensures `import { name } from "source"` exists. Returns whether the module
/// was modified.
pub fn ensure_named_import(
    unit: &mut SourceUnit,
    source: &str,
    name: &str,
) -> Result<bool, ImportConflict> {
    check_named_import(unit, source, name)?;

    let already = import_decls(&unit.module)
        .filter(|d| &*d.src.value == source && !d.type_only)
        .flat_map(|d| d.specifiers.iter())
        .any(|s| match s {
            ImportSpecifier::Named(n) => {
                !n.is_type_only && &*n.local.sym == name && imported_name(n) == name
            }
            _ => false,
        });
    if already {
        return Ok(false);
    }

    let specifier = ImportSpecifier::Named(ImportNamedSpecifier {
        span: DUMMY_SP,
        local: Ident::new(name.into(), DUMMY_SP, SyntaxContext::empty()),
        imported: None,
        is_type_only: false,
    });

    let existing = unit.module.body.iter_mut().find_map(|item| match item {
        ModuleItem::ModuleDecl(ModuleDecl::Import(decl))
            if &*decl.src.value == source && is_mergeable(decl) =>
        {
            Some(decl)
        }
        _ => None,
    });
    if let Some(decl) = existing {
        decl.specifiers.push(specifier);
        return Ok(true);
    }

    let decl = ModuleItem::ModuleDecl(ModuleDecl::Import(ImportDecl {
        span: DUMMY_SP,
        specifiers: vec![specifier],
        src: Box::new(Str {
            span: DUMMY_SP,
            value: source.into(),
            raw: None,
        }),
        type_only: false,
        with: None,
        phase: ImportPhase::Evaluation,
    }));
    let at = unit
        .module
        .body
        .iter()
        .position(|item| matches!(item, ModuleItem::ModuleDecl(ModuleDecl::Import(_))))
        .unwrap_or_else(|| prologue_len(&unit.module.body));
    unit.module.body.insert(at, decl);
    Ok(true)
}

/// Strips the default specifier bound to `local` from imports of `source`,
/// dropping the declaration once nothing is left in it.
pub fn remove_default_import(unit: &mut SourceUnit, source: &str, local: &str) -> bool {
    let mut removed = false;
    unit.module.body.retain_mut(|item| {
        let ModuleItem::ModuleDecl(ModuleDecl::Import(decl)) = item else {
            return true;
        };
        if &*decl.src.value != source {
            return true;
        }
        let before = decl.specifiers.len();
        decl.specifiers
            .retain(|s| default_local(s).map_or(true, |ident| &*ident.sym != local));
        if decl.specifiers.len() == before {
            return true;
        }
        removed = true;
        !decl.specifiers.is_empty()
    });
    removed
}

/// Number of references to `id` outside import declarations.
pub fn count_references(module: &Module, id: &Id) -> usize {
    let mut counter = ReferenceCounter { id, count: 0 };
    module.visit_with(&mut counter);
    counter.count
}

struct ReferenceCounter<'a> {
    id: &'a Id,
    count: usize,
}

impl Visit for ReferenceCounter<'_> {
    fn visit_import_decl(&mut self, _: &ImportDecl) {}

    fn visit_ident(&mut self, i: &Ident) {
        if i.sym == self.id.0 && i.ctxt == self.id.1 {
            self.count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Dialect;

    fn unit(src: &str) -> SourceUnit {
        SourceUnit::parse("t.tsx", src, Dialect::Tsx).unwrap()
    }

    fn decls_for(u: &SourceUnit, source: &str) -> usize {
        import_decls(&u.module).filter(|d| &*d.src.value == source).count()
    }

    #[test]
    fn finds_legacy_default_import_by_local_name() {
        let u = unit("import Nav, { withRouter } from 'legacy-router';\n");
        assert!(legacy_default_import(&u.module, "legacy-router", "Nav").is_some());
        assert!(legacy_default_import(&u.module, "legacy-router", "Router").is_none());
        assert!(legacy_default_import(&u.module, "other", "Nav").is_none());
    }

    #[test]
    fn default_imported_by_name_counts_as_legacy_import() {
        let mut u = unit("import { default as Nav, withRouter } from 'legacy-router';\n");
        assert!(legacy_default_import(&u.module, "legacy-router", "Nav").is_some());
        assert!(remove_default_import(&mut u, "legacy-router", "Nav"));
        assert_eq!(decls_for(&u, "legacy-router"), 1);
        assert!(u.print().unwrap().contains("withRouter"));

        let u = unit("import { Nav } from 'legacy-router';\n");
        assert!(legacy_default_import(&u.module, "legacy-router", "Nav").is_none());
    }

    #[test]
    fn merges_into_existing_declaration() {
        let mut u = unit("import { usePathname } from 'next/navigation';\nimport a from 'a';\n");
        assert_eq!(ensure_named_import(&mut u, "next/navigation", "useRouter"), Ok(true));
        assert_eq!(decls_for(&u, "next/navigation"), 1);
        assert_eq!(ensure_named_import(&mut u, "next/navigation", "useRouter"), Ok(false));
        let out = u.print().unwrap();
        assert!(out.contains("usePathname, useRouter"));
    }

    #[test]
    fn inserts_before_first_import() {
        let mut u = unit("'use client';\nimport a from 'a';\nconst b = 1;\n");
        assert_eq!(ensure_named_import(&mut u, "next/navigation", "useRouter"), Ok(true));
        assert!(matches!(u.module.body[0], ModuleItem::Stmt(_)));
        match &u.module.body[1] {
            ModuleItem::ModuleDecl(ModuleDecl::Import(d)) => assert_eq!(&*d.src.value, "next/navigation"),
            other => panic!("expected import, got {other:?}"),
        }
    }

    #[test]
    fn inserts_after_prologue_without_imports() {
        let mut u = unit("'use client';\nexport const x = 1;\n");
        assert_eq!(ensure_named_import(&mut u, "next/navigation", "useRouter"), Ok(true));
        assert!(matches!(
            u.module.body[1],
            ModuleItem::ModuleDecl(ModuleDecl::Import(_))
        ));
    }

    #[test]
    fn aliased_or_foreign_binding_is_a_conflict() {
        let u = unit("import { useRouter } from 'other-lib';\n");
        assert!(check_named_import(&u, "next/navigation", "useRouter").is_err());
        let u = unit("import { something as useRouter } from 'next/navigation';\n");
        assert!(check_named_import(&u, "next/navigation", "useRouter").is_err());
        let u = unit("import useRouter from 'next/navigation';\n");
        assert!(check_named_import(&u, "next/navigation", "useRouter").is_err());
        let u = unit("function useRouter() {}\n");
        assert!(check_named_import(&u, "next/navigation", "useRouter").is_err());
    }

    #[test]
    fn default_export_and_ts_declarations_are_conflicts() {
        for src in [
            "export default function useRouter() {}\n",
            "export default class useRouter {}\n",
            "enum useRouter { A }\n",
            "export namespace useRouter { export const a = 1; }\n",
            "import useRouter = require('x');\n",
        ] {
            let u = unit(src);
            let err = check_named_import(&u, "next/navigation", "useRouter")
                .expect_err(src);
            assert!(err.reason.contains("module level"), "{src}: {}", err.reason);
        }
        let u = unit("export default function () {}\n");
        assert!(check_named_import(&u, "next/navigation", "useRouter").is_ok());
    }

    #[test]
    fn namespace_only_declaration_cannot_be_merged() {
        let u = unit("import * as nav from 'next/navigation';\n");
        let err = check_named_import(&u, "next/navigation", "useRouter").unwrap_err();
        assert!(err.reason.contains("namespace"));
    }

    #[test]
    fn removing_default_keeps_other_specifiers() {
        let mut u = unit("import Nav, { withRouter } from 'legacy-router';\n");
        assert!(remove_default_import(&mut u, "legacy-router", "Nav"));
        assert_eq!(decls_for(&u, "legacy-router"), 1);
        assert!(u.print().unwrap().contains("withRouter"));
        assert!(!remove_default_import(&mut u, "legacy-router", "Nav"));
    }

    #[test]
    fn removing_only_specifier_drops_declaration() {
        let mut u = unit("import Nav from 'legacy-router';\nimport Other from 'other';\n");
        assert!(remove_default_import(&mut u, "legacy-router", "Nav"));
        assert_eq!(decls_for(&u, "legacy-router"), 0);
        assert_eq!(decls_for(&u, "other"), 1);
    }

    #[test]
    fn counts_references_but_not_shadowed_names() {
        let u = unit(
            "import Nav from 'legacy-router';\nNav.events.on('x', f);\nfunction g(Nav) { Nav.push(1); }\n",
        );
        let legacy = legacy_default_import(&u.module, "legacy-router", "Nav").unwrap();
        assert_eq!(count_references(&u.module, &legacy.id), 1);
    }
}
