//! # Diagnostics Module
//!
//! Findings produced while the router validates handlers against the
//! specification, and the counting logger that collects them.
//!
//! Every check runs under a [`Severity`] chosen by the router options. A
//! finding at `Off` is dropped; anything else is counted, kept, and emitted
//! through `tracing` when it reaches the configured log level. A build fails
//! iff the error bucket is non-zero.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;
use tracing::{error, info, warn};

/// Severity of a finding, also used as the policy for a class of checks.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suppress the check entirely.
    Off,
    Info,
    Warn,
    #[default]
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Off => "off",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        })
    }
}

/// Stable machine-readable code of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    IncompatibleType,
    UnmappedProperty,
    UnexpectedField,
    UnsupportedMapKey,
    NoMatchingAlternative,
    AmbiguousAlternative,
    UncoveredVariant,
    NegatedSchemaMatch,
    UnknownOperation,
    DuplicateOperation,
    UnhandledOperation,
    MissingRequestBody,
    UnhandledRequestBody,
    UnknownParameter,
    UnhandledParameter,
    UnknownResponse,
    UnhandledResponse,
    InvalidStatusTag,
    DuplicateStatusTag,
    MissingStatusTag,
    MissingCodec,
    UnsupportedPathTemplate,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::IncompatibleType => "incompatible-type",
            DiagnosticKind::UnmappedProperty => "unmapped-property",
            DiagnosticKind::UnexpectedField => "unexpected-field",
            DiagnosticKind::UnsupportedMapKey => "unsupported-map-key",
            DiagnosticKind::NoMatchingAlternative => "no-matching-alternative",
            DiagnosticKind::AmbiguousAlternative => "ambiguous-alternative",
            DiagnosticKind::UncoveredVariant => "uncovered-variant",
            DiagnosticKind::NegatedSchemaMatch => "negated-schema-match",
            DiagnosticKind::UnknownOperation => "unknown-operation",
            DiagnosticKind::DuplicateOperation => "duplicate-operation",
            DiagnosticKind::UnhandledOperation => "unhandled-operation",
            DiagnosticKind::MissingRequestBody => "missing-request-body",
            DiagnosticKind::UnhandledRequestBody => "unhandled-request-body",
            DiagnosticKind::UnknownParameter => "unknown-parameter",
            DiagnosticKind::UnhandledParameter => "unhandled-parameter",
            DiagnosticKind::UnknownResponse => "unknown-response",
            DiagnosticKind::UnhandledResponse => "unhandled-response",
            DiagnosticKind::InvalidStatusTag => "invalid-status-tag",
            DiagnosticKind::DuplicateStatusTag => "duplicate-status-tag",
            DiagnosticKind::MissingStatusTag => "missing-status-tag",
            DiagnosticKind::MissingCodec => "missing-codec",
            DiagnosticKind::UnsupportedPathTemplate => "unsupported-path-template",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Operation id the finding belongs to, if any.
    pub operation: Option<String>,
    /// Where in the specification: a context such as `request body application/json`
    /// followed by a JSON pointer into the schema.
    pub location: String,
    /// The offending type or field.
    pub subject: String,
    pub message: String,
    /// Where the handler involved was constructed.
    pub source: Option<&'static Location<'static>>,
}

impl Diagnostic {
    pub fn new(severity: Severity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            operation: None,
            location: String::new(),
            subject: String::new(),
            message: message.into(),
            source: None,
        }
    }

    pub fn operation(mut self, id: impl Into<String>) -> Self {
        self.operation = Some(id.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn source(mut self, source: Option<&'static Location<'static>>) -> Self {
        self.source = source;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.kind)?;
        if let Some(op) = &self.operation {
            write!(f, "{op}: ")?;
        }
        if !self.location.is_empty() {
            write!(f, "{}: ", self.location)?;
        }
        f.write_str(&self.message)?;
        if let Some(src) = self.source {
            write!(f, " (handler at {}:{})", src.file(), src.line())?;
        }
        Ok(())
    }
}

/// Counting logger for one validation pass.
#[derive(Debug, Default)]
pub struct Diagnostics {
    level: Severity,
    silent: bool,
    entries: Vec<Diagnostic>,
    infos: usize,
    warnings: usize,
    errors: usize,
}

impl Diagnostics {
    /// Emit findings at `level` or above through `tracing`; `Off` emits nothing.
    pub fn new(level: Severity) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// A sink that counts but never logs, used to probe compatibility.
    pub fn silent() -> Self {
        Self {
            level: Severity::Off,
            silent: true,
            ..Self::default()
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Off => return,
            Severity::Info => self.infos += 1,
            Severity::Warn => self.warnings += 1,
            Severity::Error => self.errors += 1,
        }
        if !self.silent && self.level != Severity::Off && diagnostic.severity >= self.level {
            let kind = diagnostic.kind.as_str();
            let operation = diagnostic.operation.as_deref().unwrap_or("-");
            match diagnostic.severity {
                Severity::Info => info!(kind, operation, "{diagnostic}"),
                Severity::Warn => warn!(kind, operation, "{diagnostic}"),
                Severity::Error => error!(kind, operation, "{diagnostic}"),
                Severity::Off => {}
            }
        }
        self.entries.push(diagnostic);
    }

    pub fn infos(&self) -> usize {
        self.infos
    }

    pub fn warnings(&self) -> usize {
        self.warnings
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }

    /// `Err` iff at least one error was reported.
    pub fn must_have_no_errors(self) -> Result<Vec<Diagnostic>, crate::errors::BuildError> {
        if self.errors == 0 {
            Ok(self.entries)
        } else {
            Err(crate::errors::BuildError::new(self.entries))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_bucket_and_drops_off() {
        let mut sink = Diagnostics::new(Severity::Warn);
        sink.report(Diagnostic::new(Severity::Info, DiagnosticKind::MissingCodec, "a"));
        sink.report(Diagnostic::new(Severity::Warn, DiagnosticKind::MissingCodec, "b"));
        sink.report(Diagnostic::new(Severity::Off, DiagnosticKind::MissingCodec, "c"));
        assert_eq!((sink.infos(), sink.warnings(), sink.errors()), (1, 1, 0));
        assert_eq!(sink.entries().len(), 2);
        assert!(sink.must_have_no_errors().is_ok());
    }

    #[test]
    fn test_errors_fail_the_pass() {
        let mut sink = Diagnostics::silent();
        sink.report(
            Diagnostic::new(Severity::Error, DiagnosticKind::UnknownOperation, "no such op")
                .operation("ghost"),
        );
        let err = sink.must_have_no_errors().unwrap_err();
        assert_eq!(err.errors().count(), 1);
        assert!(err.to_string().contains("[unknown-operation] ghost: no such op"));
    }

    #[test]
    fn test_severity_order_and_serde() {
        assert!(Severity::Off < Severity::Info);
        assert!(Severity::Warn < Severity::Error);
        let s: Severity = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(s, Severity::Warn);
    }
}
