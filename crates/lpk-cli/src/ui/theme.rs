//! Colors and status marks shared by the reporter and tables.

use crossterm::style::{Color, StyledContent, Stylize};

/// What a console line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    Done,
    Failed,
    Warning,
    Info,
}

impl Status {
    fn mark(self) -> &'static str {
        match self {
            Self::Active => "●",
            Self::Done => "✓",
            Self::Failed => "✗",
            Self::Warning => "⚠",
            Self::Info => "ℹ",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    /// Package identifiers and archive names.
    pub package: Color,
    /// Phase names, details, sizes.
    pub secondary: Color,
    pub active: Color,
    pub done: Color,
    pub failed: Color,
    pub warning: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            package: Color::Cyan,
            secondary: Color::DarkGrey,
            active: Color::Blue,
            done: Color::Green,
            failed: Color::Red,
            warning: Color::Yellow,
        }
    }
}

impl Theme {
    pub fn mark(&self, status: Status) -> StyledContent<&'static str> {
        let color = match status {
            Status::Active => self.active,
            Status::Done => self.done,
            Status::Failed => self.failed,
            Status::Warning => self.warning,
            Status::Info => Color::Reset,
        };
        status.mark().with(color)
    }

    /// Color of the message text that follows a mark.
    pub fn text(&self, status: Status) -> Color {
        match status {
            Status::Failed => self.failed,
            Status::Warning => self.warning,
            Status::Active | Status::Done | Status::Info => self.secondary,
        }
    }
}

/// Byte count as B, KB or MB with one decimal.
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let size = bytes as f64;
    if size >= KIB * KIB {
        format!("{:.1} MB", size / (KIB * KIB))
    } else if size >= KIB {
        format!("{:.1} KB", size / KIB)
    } else {
        format!("{bytes} B")
    }
}
