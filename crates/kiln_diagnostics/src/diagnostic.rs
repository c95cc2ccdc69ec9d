//! Structured diagnostic messages tied to pipeline objects and targets.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A structured diagnostic message attached to a pipeline object.
///
/// Diagnostics are the primary mechanism for reporting errors, warnings, and
/// notes to the user. Each diagnostic includes:
/// - A severity level and unique code
/// - A primary message
/// - Optionally, the source-root-relative path of the object involved and
///   the GPU family of the failed (object, target) pair
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The unique code identifying the type of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// Source-root-relative path of the object this diagnostic is about.
    pub object: Option<PathBuf>,
    /// GPU family name when the failure is scoped to one (object, target) pair.
    pub gpu_family: Option<String>,
    /// Explanatory footnotes (e.g., "note: ...").
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates a new error diagnostic with the given code and message.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            object: None,
            gpu_family: None,
            notes: Vec::new(),
        }
    }

    /// Creates a new warning diagnostic with the given code and message.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            object: None,
            gpu_family: None,
            notes: Vec::new(),
        }
    }

    /// Creates a new note diagnostic with the given code and message.
    pub fn note(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            code,
            message: message.into(),
            object: None,
            gpu_family: None,
            notes: Vec::new(),
        }
    }

    /// Attaches the offending object's relative path.
    pub fn with_object(mut self, relative_path: impl Into<PathBuf>) -> Self {
        self.object = Some(relative_path.into());
        self
    }

    /// Attaches the GPU family of the failed (object, target) pair.
    pub fn with_gpu_family(mut self, family: impl Into<String>) -> Self {
        self.gpu_family = Some(family.into());
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;
    use std::path::Path;

    #[test]
    fn create_error() {
        let code = DiagnosticCode::new(Category::Error, 101);
        let diag = Diagnostic::error(code, "failed to load scene");
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "failed to load scene");
        assert_eq!(format!("{}", diag.code), "E101");
        assert!(diag.object.is_none());
    }

    #[test]
    fn create_warning() {
        let code = DiagnosticCode::new(Category::Cache, 1);
        let diag = Diagnostic::warning(code, "cache unavailable");
        assert_eq!(diag.severity, Severity::Warning);
    }

    #[test]
    fn builder_methods() {
        let code = DiagnosticCode::new(Category::Validation, 203);
        let diag = Diagnostic::error(code, "non-square source image")
            .with_object("textures/banner.png")
            .with_gpu_family("powervr")
            .with_note("PVRTC formats require square input");
        assert_eq!(diag.object.as_deref(), Some(Path::new("textures/banner.png")));
        assert_eq!(diag.gpu_family.as_deref(), Some("powervr"));
        assert_eq!(diag.notes.len(), 1);
    }
}
