use std::path::Path;

use swc_core::{
    common::{SyntaxContext, DUMMY_SP},
    ecma::ast::*,
};
use tracing::{debug, info, warn};

use crate::config::CodemodConfig;
use crate::declare::{check_local_binding, ensure_local_binding, BindingPlan};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::directive::ensure_leading_directive;
use crate::error::Result;
use crate::imports::{
    check_named_import, count_references, ensure_named_import, remove_default_import,
};
use crate::matcher::{find_matches, CallSiteMatch};
use crate::rewrite::rewrite_calls;
use crate::scope::{resolve_frame, ScopeFrame};
use crate::tree::{Dialect, SourceUnit};

// -----------------------------------------------------------------------------
// Rewrite driver
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TransformOutput {
    /// Rewritten text, or the input verbatim when nothing changed.
    pub source_text: String,
    pub changed: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Rewrites one in-memory module, parsed as TSX.
pub fn transform(source: &str, config: &CodemodConfig) -> Result<TransformOutput> {
    transform_with("<input>", source, Dialect::default(), config)
}

/// Rewrites one file's text, picking the dialect from its extension.
pub fn transform_file(path: &Path, source: &str, config: &CodemodConfig) -> Result<TransformOutput> {
    transform_with(
        &path.display().to_string(),
        source,
        Dialect::from_path(path),
        config,
    )
}

pub fn transform_with(
    name: &str,
    source: &str,
    dialect: Dialect,
    config: &CodemodConfig,
) -> Result<TransformOutput> {
    let mut unit = SourceUnit::parse(name, source, dialect)?;
    let found = find_matches(&unit, config);

    let mut diagnostics: Vec<Diagnostic> = found
        .rejections
        .iter()
        .map(|r| {
            unit.diagnostic(
                r.at,
                DiagnosticKind::UnsupportedArgumentShape,
                format!("`{}.{}`: {}", config.legacy_local_name, r.method, r.reason),
            )
        })
        .collect();
    let unchanged = |diagnostics| TransformOutput {
        source_text: source.to_string(),
        changed: false,
        diagnostics,
    };

    let Some(legacy) = found.legacy.as_ref().filter(|_| !found.matches.is_empty()) else {
        debug!(file = name, rejected = found.rejections.len(), "no rewritable call sites");
        return Ok(unchanged(diagnostics));
    };

    // Nothing is touched unless the new primitive can be imported cleanly.
    if let Err(conflict) = check_named_import(&unit, &config.new_module, &config.new_primitive) {
        warn!(file = name, reason = %conflict.reason, "import conflict; leaving file untouched");
        diagnostics.push(unit.diagnostic(
            conflict.span,
            DiagnosticKind::ImportConflict,
            conflict.reason,
        ));
        return Ok(unchanged(diagnostics));
    }

    // Group call sites by frame, in order of each frame's first call site.
    let mut frames: Vec<(ScopeFrame, Vec<&CallSiteMatch>)> = vec![];
    for m in &found.matches {
        let frame = resolve_frame(m);
        match frames.iter_mut().find(|(f, _)| *f == frame) {
            Some((_, sites)) => sites.push(m),
            None => frames.push((frame, vec![m])),
        }
    }

    // Judge every frame against the untouched tree before mutating any of them.
    let mut planned = vec![];
    for (frame, sites) in frames {
        let spans: Vec<_> = sites.iter().map(|m| m.span).collect();
        match check_local_binding(
            &unit,
            frame,
            &config.binding_name,
            &config.new_primitive,
            &spans,
        ) {
            Ok(plan) => planned.push((frame, plan, sites)),
            Err(conflict) => {
                warn!(file = name, sites = sites.len(), reason = %conflict.reason, "binding conflict");
                diagnostics.push(unit.diagnostic(
                    conflict.span,
                    DiagnosticKind::BindingConflict,
                    format!(
                        "{}; {} call site(s) left unchanged",
                        conflict.reason,
                        sites.len()
                    ),
                ));
            }
        }
    }
    if planned.is_empty() {
        return Ok(unchanged(diagnostics));
    }

    for (frame, plan, _) in &planned {
        if *plan == BindingPlan::Insert {
            ensure_local_binding(
                &mut unit,
                *frame,
                &config.binding_name,
                &config.new_primitive,
                || primitive_call(&config.new_primitive),
            );
        }
    }
    let targets: Vec<&CallSiteMatch> = planned
        .iter()
        .flat_map(|(_, _, sites)| sites.iter().copied())
        .collect();
    let rewritten = rewrite_calls(&mut unit, &targets, &config.binding_name);
    if rewritten == 0 {
        return Ok(unchanged(diagnostics));
    }

    if let Err(conflict) = ensure_named_import(&mut unit, &config.new_module, &config.new_primitive)
    {
        diagnostics.push(unit.diagnostic(
            conflict.span,
            DiagnosticKind::ImportConflict,
            conflict.reason,
        ));
    }

    let remaining = count_references(&unit.module, &legacy.id);
    if remaining == 0 {
        remove_default_import(&mut unit, &config.legacy_module, &config.legacy_local_name);
    } else {
        diagnostics.push(unit.diagnostic(
            legacy.span,
            DiagnosticKind::LegacyImportRetained,
            format!(
                "`{}` is still referenced {remaining} time(s); import from \"{}\" kept",
                config.legacy_local_name, config.legacy_module
            ),
        ));
    }

    ensure_leading_directive(&mut unit, &config.directive);

    info!(file = name, rewritten, frames = planned.len(), "rewrote legacy call sites");
    Ok(TransformOutput {
        source_text: unit.print()?,
        changed: true,
        diagnostics,
    })
}

/// `<primitive>()`
fn primitive_call(primitive: &str) -> Box<Expr> {
    Box::new(Expr::Call(CallExpr {
        span: DUMMY_SP,
        callee: Callee::Expr(Box::new(Expr::Ident(Ident::new(
            primitive.into(),
            DUMMY_SP,
            SyntaxContext::empty(),
        )))),
        args: vec![],
        type_args: None,
        ctxt: SyntaxContext::empty(),
    }))
}
