//! Compiler log parsing.
//!
//! Passes run with `-file-line-error`, so most errors arrive as
//! `path:line: message`; fatal conditions still use the classic `! message`
//! form followed by an `l.<line>` context line.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based pass that produced this line.
    pub pass: u32,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Diagnostic {
    pub fn error(pass: u32, message: impl Into<String>) -> Self {
        Self {
            pass,
            severity: Severity::Error,
            message: message.into(),
            file: None,
            line: None,
        }
    }

    pub fn warning(pass: u32, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(pass, message)
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{level}: {file}:{line}: {}", self.message),
            (None, Some(line)) => write!(f, "{level}: line {line}: {}", self.message),
            _ => write!(f, "{level}: {}", self.message),
        }
    }
}

/// Extracts error and warning lines from one pass's log.
pub fn parse_log(log: &str, pass: u32) -> Vec<Diagnostic> {
    let lines: Vec<&str> = log.lines().collect();
    let mut diagnostics = Vec::new();

    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim_end();

        if let Some(message) = line.strip_prefix('!') {
            let mut diag = Diagnostic::error(pass, message.trim());
            diag.line = context_line_number(&lines[i + 1..]);
            diagnostics.push(diag);
        } else if let Some((file, number, message)) = parse_file_line_error(line) {
            diagnostics.push(Diagnostic {
                file: Some(file),
                line: Some(number),
                ..Diagnostic::error(pass, message)
            });
        } else if line.contains("Warning:") {
            diagnostics.push(Diagnostic::warning(pass, line.trim()));
        }
    }

    diagnostics
}

/// `l.42 \badmacro` within the few lines after a `!` error.
fn context_line_number(following: &[&str]) -> Option<u32> {
    following.iter().take(6).find_map(|l| {
        let rest = l.trim_start().strip_prefix("l.")?;
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    })
}

/// Parses `path:line: message`, the `-file-line-error` form.
fn parse_file_line_error(line: &str) -> Option<(String, u32, String)> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let mut search = 0;
    while let Some(rel) = line[search..].find(':') {
        let colon = search + rel;
        let rest = &line[colon + 1..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let file = &line[..colon];
        if colon > 0 && digits > 0 && rest[digits..].starts_with(": ") && looks_like_path(file) {
            let number = rest[..digits].parse().ok()?;
            return Some((
                file.to_string(),
                number,
                rest[digits + 2..].trim().to_string(),
            ));
        }
        search = colon + 1;
    }
    None
}

fn looks_like_path(candidate: &str) -> bool {
    candidate.contains('.') || candidate.contains('/') || candidate.contains('\\')
}

// ────────────────────────────────────────────────────────────────────────────
// Rerun detection
// ────────────────────────────────────────────────────────────────────────────

const LABELS_CHANGED_MARKERS: &[&str] = &[
    "Rerun to get",
    "Label(s) may have changed",
    "Please rerun",
];

const UNDEFINED_REFERENCES_MARKER: &str = "There were undefined references";

/// True when the log asks for another pass at all.
pub fn needs_rerun(log: &str) -> bool {
    LABELS_CHANGED_MARKERS.iter().any(|m| log.contains(m))
        || log.contains(UNDEFINED_REFERENCES_MARKER)
}

/// What a pass's log says about cross-reference state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RerunSignal {
    /// The compiler explicitly asked for another pass.
    pub labels_changed: bool,
    /// Undefined reference/citation warnings, verbatim.
    pub unresolved: BTreeSet<String>,
}

impl RerunSignal {
    pub fn from_log(log: &str) -> Self {
        let labels_changed = LABELS_CHANGED_MARKERS.iter().any(|m| log.contains(m));
        let mut unresolved: BTreeSet<String> = log
            .lines()
            .filter(|l| {
                (l.contains("Reference `") || l.contains("Citation `")) && l.contains("undefined")
            })
            .map(|l| l.trim().to_string())
            .collect();
        if unresolved.is_empty() && log.contains(UNDEFINED_REFERENCES_MARKER) {
            unresolved.insert(UNDEFINED_REFERENCES_MARKER.to_string());
        }
        Self {
            labels_changed,
            unresolved,
        }
    }

    /// Another pass can only help if labels moved or the set of unresolved
    /// references changed since the previous pass.
    pub fn wants_another_pass(&self, previous: Option<&RerunSignal>) -> bool {
        if self.labels_changed {
            return true;
        }
        if self.unresolved.is_empty() {
            return false;
        }
        match previous {
            None => true,
            Some(prev) => prev.unresolved != self.unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAILED_LOG: &str = "\
This is pdfTeX, Version 3.141592653
(./resume.tex
LaTeX2e <2023-11-01>
./resume.tex:42: Undefined control sequence.
l.42 \\badmacro
              {x}
LaTeX Warning: Reference `sec:intro' on page 1 undefined on input line 10.
! Emergency stop.
<*> resume.tex
";

    #[test]
    fn test_parses_file_line_errors() {
        let diags = parse_log(FAILED_LOG, 1);
        let first = &diags[0];
        assert!(first.is_error());
        assert_eq!(first.file.as_deref(), Some("./resume.tex"));
        assert_eq!(first.line, Some(42));
        assert_eq!(first.message, "Undefined control sequence.");
    }

    #[test]
    fn test_parses_bang_errors_and_warnings() {
        let diags = parse_log(FAILED_LOG, 2);
        assert_eq!(diags.len(), 3);
        assert_eq!(diags[1].severity, Severity::Warning);
        assert!(diags[1].message.starts_with("LaTeX Warning: Reference"));
        assert_eq!(diags[2].message, "Emergency stop.");
        assert!(diags.iter().all(|d| d.pass == 2));
    }

    #[test]
    fn test_bang_error_picks_up_context_line() {
        let diags = parse_log("! Missing $ inserted.\n<inserted text>\n$\nl.17 x^\n", 1);
        assert_eq!(diags[0].line, Some(17));
    }

    #[test]
    fn test_prose_with_colons_is_not_an_error() {
        assert!(parse_file_line_error("Output written on resume.pdf (1 page).").is_none());
        assert!(parse_file_line_error("Time: 12: noon").is_none());
        assert!(parse_file_line_error("  ./a.tex:3: indented").is_none());
    }

    #[test]
    fn test_clean_log_has_no_diagnostics() {
        let log = "This is pdfTeX\nOutput written on resume.pdf (1 page, 4200 bytes).\n";
        assert!(parse_log(log, 1).is_empty());
    }

    #[test]
    fn test_display_formats() {
        let mut d = Diagnostic::error(1, "Undefined control sequence.");
        d.file = Some("a.tex".to_string());
        d.line = Some(3);
        assert_eq!(d.to_string(), "error: a.tex:3: Undefined control sequence.");
        assert_eq!(Diagnostic::warning(1, "x").to_string(), "warning: x");
    }

    #[test]
    fn test_needs_rerun_markers() {
        assert!(needs_rerun("(rerunfilecheck) Rerun to get outlines right"));
        assert!(needs_rerun("LaTeX Warning: There were undefined references."));
        assert!(!needs_rerun("Output written on resume.pdf (1 page)."));
    }

    #[test]
    fn test_rerun_when_labels_changed() {
        let signal = RerunSignal::from_log(
            "LaTeX Warning: Label(s) may have changed. Rerun to get cross-references right.",
        );
        assert!(signal.labels_changed);
        assert!(signal.wants_another_pass(None));
    }

    #[test]
    fn test_no_rerun_for_clean_log() {
        let signal = RerunSignal::from_log("Output written on resume.pdf");
        assert!(!signal.wants_another_pass(None));
    }

    #[test]
    fn test_same_unresolved_references_stop_the_loop() {
        let log = "LaTeX Warning: Reference `missing' on page 1 undefined on input line 3.\n\
                   LaTeX Warning: There were undefined references.";
        let first = RerunSignal::from_log(log);
        assert!(first.wants_another_pass(None));
        let second = RerunSignal::from_log(log);
        assert!(!second.wants_another_pass(Some(&first)));
    }

    #[test]
    fn test_new_unresolved_references_continue() {
        let first = RerunSignal::from_log("LaTeX Warning: There were undefined references.");
        let second = RerunSignal::from_log(
            "LaTeX Warning: Citation `knuth' on page 1 undefined on input line 9.",
        );
        assert!(second.wants_another_pass(Some(&first)));
    }
}
