//! Parser diagnostics
//!
//! Diagnostics stream to a caller-supplied sink (stderr in the CLI, a
//! buffer in tests), one line per entry, prefixed by the file being
//! parsed and the severity. Each parser run keeps per-severity counters
//! and prints a one-line summary when anything was logged; a file parses
//! successfully iff its error counter stays at zero.

use std::io::Write;

/// Severity of a diagnostic, in counter order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Message,
    Debug,
}

const SEVERITY_COUNT: usize = 4;

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Message => "message",
            Severity::Debug => "debug",
        }
    }

    fn index(self) -> usize {
        match self {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Message => 2,
            Severity::Debug => 3,
        }
    }
}

/// Per-file diagnostic logger: counts by severity and writes lines to the
/// shared sink as they happen.
pub struct Diagnostics<'w> {
    path: String,
    out: &'w mut dyn Write,
    counts: [usize; SEVERITY_COUNT],
}

impl<'w> Diagnostics<'w> {
    pub fn new(path: &str, out: &'w mut dyn Write) -> Diagnostics<'w> {
        Diagnostics {
            path: path.to_string(),
            out,
            counts: [0; SEVERITY_COUNT],
        }
    }

    /// Logs one diagnostic line and bumps its severity counter.
    pub fn log(&mut self, severity: Severity, text: &str) {
        // Sink failures (a closed stderr) are not worth dying over.
        let _ = writeln!(self.out, "{}: {}: {}", self.path, severity.label(), text);
        self.counts[severity.index()] += 1;
    }

    pub fn error(&mut self, text: &str) {
        self.log(Severity::Error, text);
    }

    pub fn warning(&mut self, text: &str) {
        self.log(Severity::Warning, text);
    }

    pub fn message(&mut self, text: &str) {
        self.log(Severity::Message, text);
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.counts[severity.index()]
    }

    pub fn error_count(&self) -> usize {
        self.counts[Severity::Error.index()]
    }

    /// Prints the per-file summary line, if anything was logged.
    pub fn summarize(&mut self) {
        if self.counts.iter().sum::<usize>() == 0 {
            return;
        }
        let _ = writeln!(
            self.out,
            "{}: {} errors, {} warnings, {} messages, {} debugs",
            self.path, self.counts[0], self.counts[1], self.counts[2], self.counts[3]
        );
    }

    /// Reborrows the underlying sink, e.g. for a nested parser run.
    pub fn sink(&mut self) -> &mut dyn Write {
        &mut *self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_lines() {
        let mut buf = Vec::new();
        let mut diags = Diagnostics::new("demo.midl", &mut buf);
        diags.error("bad token");
        diags.warning("odd spacing");
        diags.error("another");
        assert_eq!(diags.error_count(), 2);
        assert_eq!(diags.count(Severity::Warning), 1);
        diags.summarize();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("demo.midl: error: bad token"));
        assert!(text.contains("demo.midl: warning: odd spacing"));
        assert!(text.contains("demo.midl: 2 errors, 1 warnings, 0 messages, 0 debugs"));
    }

    #[test]
    fn test_silent_run_has_no_summary() {
        let mut buf = Vec::new();
        let mut diags = Diagnostics::new("demo.midl", &mut buf);
        diags.summarize();
        assert!(buf.is_empty());
    }
}
