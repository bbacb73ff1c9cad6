use std::fmt;

// -----------------------------------------------------------------------------
// Diagnostics
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DiagnosticKind {
    /// The file could not be parsed; nothing was rewritten.
    ParseFailure,
    /// A dropped leading argument was not a literal or plain identifier.
    UnsupportedArgumentShape,
    /// The local binding name is already in use inside the target scope.
    BindingConflict,
    /// The new primitive cannot be imported without clashing with an existing import.
    ImportConflict,
    /// Some references to the legacy import survived, so the import was kept.
    LegacyImportRetained,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::ParseFailure => "parse-failure",
            DiagnosticKind::UnsupportedArgumentShape => "unsupported-argument-shape",
            DiagnosticKind::BindingConflict => "binding-conflict",
            DiagnosticKind::ImportConflict => "import-conflict",
            DiagnosticKind::LegacyImportRetained => "legacy-import-retained",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,   // 1-based
    pub column: usize, // 1-based
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        file: impl Into<String>,
        (line, column): (usize, usize),
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file,
            self.line,
            self.column,
            self.kind.as_str(),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_grep_friendly() {
        let d = Diagnostic::new(
            "app/page.tsx",
            (3, 14),
            DiagnosticKind::BindingConflict,
            "`router` is already bound",
        );
        assert_eq!(
            d.to_string(),
            "app/page.tsx:3:14: binding-conflict: `router` is already bound"
        );
    }

    #[test]
    fn serializes_kind_by_variant_name() {
        let d = Diagnostic::new("a.js", (1, 1), DiagnosticKind::ImportConflict, "x");
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "ImportConflict");
        assert_eq!(json["line"], 1);
    }
}
