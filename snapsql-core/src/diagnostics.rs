use crate::Position;

/// How severe a [`Diagnostic`] is.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Severity {
    /// Compilation cannot proceed past this point.
    Error,
    /// Compilation proceeds but the result may not be what was intended.
    Warning,
}

/// A single compile-time finding, accumulated by a [`Collector`] rather
/// than raised at the first failure.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub struct Diagnostic {
    /// Error vs. warning.
    pub severity: Severity,
    /// A short machine-stable tag, e.g. `"duplicate_clause"`.
    pub kind: &'static str,
    /// The human-readable message.
    pub message: String,
    /// The originating file, if known.
    pub file: Option<String>,
    /// Where in the source this finding applies.
    pub position: Position,
    /// An optional excerpt of the offending source.
    pub context: Option<String>,
    /// Suggested fixes, if any.
    pub suggestions: Vec<String>,
    /// IDs of related diagnostics (e.g. the other nodes in a cycle).
    pub related: Vec<String>,
}

impl Diagnostic {
    /// Builds a bare error diagnostic; use the builder methods to attach
    /// context, suggestions, or related IDs.
    pub fn error(kind: &'static str, message: impl Into<String>, position: Position) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message: message.into(),
            file: None,
            position,
            context: None,
            suggestions: vec![],
            related: vec![],
        }
    }

    /// Builds a bare warning diagnostic.
    pub fn warning(kind: &'static str, message: impl Into<String>, position: Position) -> Self {
        Self { severity: Severity::Warning, ..Self::error(kind, message, position) }
    }

    /// Attaches a source file name.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attaches a source excerpt.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Appends a suggested fix.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Appends a related diagnostic ID.
    pub fn with_related(mut self, related: impl Into<String>) -> Self {
        self.related.push(related.into());
        self
    }

    /// True for [`Severity::Error`].
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

/// A bounded collector for compile-time diagnostics, shared by reference
/// across the validator, reference resolver, and type-checker so that a UI
/// can show several findings from a single compile pass at once.
#[derive(Clone, Debug)]
pub struct Collector {
    diagnostics: Vec<Diagnostic>,
    cap: usize,
    total_pushed: usize,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Collector {
    /// Creates a collector that retains at most `cap` diagnostics.
    pub fn new(cap: usize) -> Self {
        Self { diagnostics: vec![], cap, total_pushed: 0 }
    }

    /// Records a diagnostic; silently drops it once `cap` is reached, but
    /// still counts it in [`Collector::total_pushed`].
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.total_pushed += 1;
        if self.diagnostics.len() < self.cap {
            self.diagnostics.push(diagnostic);
        }
    }

    /// All retained diagnostics, in push order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Retained diagnostics of [`Severity::Error`].
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// Retained diagnostics of [`Severity::Warning`].
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// True if no errors were recorded (dropped-for-cap errors still count).
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    /// The true number of diagnostics pushed, including ones dropped for
    /// exceeding the cap.
    pub fn total_pushed(&self) -> usize {
        self.total_pushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_retained_diagnostics_but_keeps_true_count() {
        let mut c = Collector::new(2);
        for i in 0..5 {
            c.push(Diagnostic::error("x", format!("err {i}"), Position::START));
        }
        assert_eq!(c.diagnostics().len(), 2);
        assert_eq!(c.total_pushed(), 5);
        assert!(!c.is_ok());
    }

    #[test]
    fn separates_errors_and_warnings() {
        let mut c = Collector::new(10);
        c.push(Diagnostic::warning("w", "careful", Position::START));
        c.push(Diagnostic::error("e", "bad", Position::START));
        assert_eq!(c.warnings().count(), 1);
        assert_eq!(c.errors().count(), 1);
        assert!(!c.is_ok());
    }
}
