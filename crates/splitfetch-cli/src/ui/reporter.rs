//! Terminal implementation of the core `Reporter`.

use std::io::{IsTerminal, Write, stdout};

use crossterm::QueueableCommand;
use crossterm::cursor::MoveToColumn;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use splitfetch_core::{Progress, Reporter};

use super::progress::{format_progress_line, format_size};

/// Prints progress and status lines to stdout.
///
/// Progress bars are redrawn in place on a terminal and suppressed
/// otherwise, so piped output only carries the final lines. Concurrent
/// downloads share one line and may interleave.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    live: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            live: stdout().is_terminal(),
        }
    }

    fn line(&self, text: &str) {
        let mut out = stdout().lock();
        if self.live {
            out.queue(MoveToColumn(0)).ok();
            out.queue(Clear(ClearType::CurrentLine)).ok();
        }
        writeln!(out, "{text}").ok();
        out.flush().ok();
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        self.line("");
        self.line(&title.bold().to_string());
    }

    fn downloading(&self, label: &str, progress: &Progress) {
        if !self.live {
            return;
        }
        let mut out = stdout().lock();
        out.queue(MoveToColumn(0)).ok();
        out.queue(Clear(ClearType::CurrentLine)).ok();
        write!(out, "  {}", format_progress_line(label, progress)).ok();
        out.flush().ok();
    }

    fn downloaded(&self, label: &str, bytes: u64) {
        self.line(&format!(
            "  {} {label} {}",
            "✓".green(),
            format!("({})", format_size(bytes)).dark_grey()
        ));
    }

    fn retrying(&self, label: &str, attempt: u32, reason: &str) {
        self.line(&format!(
            "  {} {label}: retry {attempt} ({reason})",
            "↻".yellow()
        ));
    }

    fn info(&self, msg: &str) {
        self.line(&format!("  {msg}"));
    }

    fn success(&self, msg: &str) {
        self.line(&format!("{} {msg}", "✓".green()));
    }

    fn warning(&self, msg: &str) {
        self.line(&format!("{} {msg}", "⚠".yellow()));
    }

    fn error(&self, msg: &str) {
        self.line(&format!("{} {msg}", "✗".red()));
    }
}
