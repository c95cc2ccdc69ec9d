//! Diagnostic rendering for human-readable terminal output.

use crate::diagnostic::Diagnostic;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a compact terminal format.
///
/// Produces output like:
/// ```text
/// error[V203]: non-square source image (100x200)
///   --> textures/banner.png (powervr)
///    = note: PVRTC formats require square input
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn severity_prefix(&self, diag: &Diagnostic) -> String {
        if self.color {
            let ansi = match diag.severity {
                crate::Severity::Error => "\x1b[31m",
                crate::Severity::Warning => "\x1b[33m",
                crate::Severity::Note => "\x1b[36m",
            };
            format!("{ansi}{}\x1b[0m", diag.severity)
        } else {
            diag.severity.to_string()
        }
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = String::new();

        // Header line: severity[CODE]: message
        out.push_str(&format!(
            "{}[{}]: {}\n",
            self.severity_prefix(diag),
            diag.code,
            diag.message
        ));

        // Object line
        if let Some(object) = &diag.object {
            match &diag.gpu_family {
                Some(family) => {
                    out.push_str(&format!("  --> {} ({family})\n", object.display()));
                }
                None => {
                    out.push_str(&format!("  --> {}\n", object.display()));
                }
            }
        }

        // Notes
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }

        out
    }
}
