use std::collections::BTreeSet;

use swc_core::ecma::ast::Ident;

use crate::error::{CodemodError, Result};

// -----------------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------------

/// Describes one legacy-facility → hook-primitive migration.
///
/// The legacy facility is pure data here: a module specifier plus the local
/// name of its default import. Call sites are matched by resolving the callee
/// identifier to that import binding, never by comparing names alone.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodemodConfig {
    /// Module whose default export is the legacy navigation object.
    pub legacy_module: String,
    /// Local name the legacy default import is bound to.
    pub legacy_local_name: String,
    /// Methods on the legacy object that get rewritten.
    pub rewrite_methods: BTreeSet<String>,
    /// Module exporting the new primitive.
    pub new_module: String,
    /// Named export invoked to obtain the scope-local object.
    pub new_primitive: String,
    /// Directive inserted at the top of every rewritten module.
    pub directive: String,
    /// Name of the injected local binding.
    pub binding_name: String,
}

impl Default for CodemodConfig {
    fn default() -> Self {
        Self {
            legacy_module: "next/router".into(),
            legacy_local_name: "Router".into(),
            rewrite_methods: ["push", "replace"].iter().map(|s| s.to_string()).collect(),
            new_module: "next/navigation".into(),
            new_primitive: "useRouter".into(),
            directive: "use client".into(),
            binding_name: "router".into(),
        }
    }
}

impl CodemodConfig {
    /// Parse a JSON object; missing keys fall back to the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.legacy_module.is_empty() || self.new_module.is_empty() {
            return Err(CodemodError::Config("module specifiers must not be empty".into()));
        }
        for (key, value) in [
            ("legacy_local_name", &self.legacy_local_name),
            ("new_primitive", &self.new_primitive),
            ("binding_name", &self.binding_name),
        ] {
            if !is_identifier(value) {
                return Err(CodemodError::Config(format!(
                    "`{key}` must be a JavaScript identifier, got {value:?}"
                )));
            }
        }
        if self.rewrite_methods.is_empty() {
            return Err(CodemodError::Config("`rewrite_methods` must not be empty".into()));
        }
        if let Some(bad) = self.rewrite_methods.iter().find(|m| !is_identifier_name(m)) {
            return Err(CodemodError::Config(format!(
                "rewrite method {bad:?} is not an identifier"
            )));
        }
        if self.binding_name == self.new_primitive || self.binding_name == self.legacy_local_name {
            return Err(CodemodError::Config(
                "`binding_name` must differ from the imported names".into(),
            ));
        }
        if self.directive.is_empty() {
            return Err(CodemodError::Config("`directive` must not be empty".into()));
        }
        Ok(())
    }

    pub fn is_rewrite_method(&self, name: &str) -> bool {
        self.rewrite_methods.contains(name)
    }
}

/// A name usable as a binding: Unicode `ID_Start`/`ID_Continue` and not a
/// reserved word.
fn is_identifier(s: &str) -> bool {
    Ident::verify_symbol(s).is_ok()
}

/// A name usable after `.`, where reserved words are allowed.
fn is_identifier_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(Ident::is_valid_start) && chars.all(Ident::is_valid_continue)
}
