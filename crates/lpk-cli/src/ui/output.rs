//! Console implementation of [`Reporter`].
//!
//! Progress goes to stderr so command output on stdout (JSON, tables) can be
//! piped. Lines are written under a lock; concurrent imports interleave by
//! line, never mid-line.

use std::io::Write;
use std::sync::Mutex;

use crossterm::style::Stylize;
use lpk_core::Reporter;

use super::theme::{Status, Theme};

#[derive(Debug, Default)]
pub struct ConsoleReporter {
    theme: Theme,
    quiet: bool,
    lock: Mutex<()>,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            ..Self::default()
        }
    }

    fn line(&self, text: &str) {
        let _held = self.lock.lock();
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{text}");
    }

    /// `  <mark> [subject] message`. Failures and warnings ignore `quiet`.
    fn status(&self, status: Status, subject: Option<&str>, message: &str) {
        if self.quiet && !matches!(status, Status::Failed | Status::Warning) {
            return;
        }
        let mark = self.theme.mark(status);
        let message = message.with(self.theme.text(status));
        match subject {
            Some(subject) => self.line(&format!(
                "  {mark} {} {message}",
                subject.with(self.theme.package)
            )),
            None => self.line(&format!("  {mark} {message}")),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        if !self.quiet {
            self.line("");
            self.line(&format!("{} {}", title.bold(), "─".repeat(40).dark_grey()));
        }
    }

    fn extracting(&self, source: &str, current: u64, total: Option<u64>) {
        // One line per archive; per-entry detail goes to the debug log.
        if total == Some(current) {
            self.status(
                Status::Active,
                Some(source),
                &format!("extracted {current} entries"),
            );
        }
    }

    fn parsing(&self, what: &str) {
        self.status(Status::Active, None, &format!("reading {what}"));
    }

    fn installing(&self, package: &str) {
        self.status(Status::Active, Some(package), "installing");
    }

    fn removing(&self, package: &str) {
        self.status(Status::Active, Some(package), "removing");
    }

    fn done(&self, package: &str, detail: &str) {
        self.status(Status::Done, Some(package), detail);
    }

    fn failed(&self, package: &str, reason: &str) {
        self.status(Status::Failed, Some(package), reason);
    }

    fn info(&self, msg: &str) {
        self.status(Status::Info, None, msg);
    }

    fn success(&self, msg: &str) {
        self.status(Status::Done, None, msg);
    }

    fn warning(&self, msg: &str) {
        self.status(Status::Warning, None, msg);
    }

    fn error(&self, msg: &str) {
        self.status(Status::Failed, None, msg);
    }
}
