//! Terminal styling and the console status sink.
//!
//! Colour is on unless `NO_COLOR` is set or `--no-color` is passed.

use crate::status::{StatusLevel, StatusLine, StatusSink};
use colored::{ColoredString, Colorize};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

static PLAIN: AtomicBool = AtomicBool::new(false);

pub fn init_color(no_color_flag: bool) {
    let env_off = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    if no_color_flag || env_off {
        PLAIN.store(true, Ordering::Relaxed);
        colored::control::set_override(false);
    }
}

/// Semantic colours of console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Accent,
    Success,
    Warn,
    Error,
    Muted,
}

impl Tone {
    fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Accent => (0x2D, 0x8C, 0xFF),
            Self::Success => (0x2F, 0xBF, 0x71),
            Self::Warn => (0xFF, 0xB0, 0x20),
            Self::Error => (0xE2, 0x3D, 0x2D),
            Self::Muted => (0x8B, 0x7F, 0x77),
        }
    }

    fn of(level: StatusLevel) -> Option<Self> {
        match level {
            StatusLevel::Info => None,
            StatusLevel::Warning => Some(Self::Warn),
            StatusLevel::Error => Some(Self::Error),
        }
    }
}

fn styled(text: &str, tone: Tone) -> ColoredString {
    let (r, g, b) = tone.rgb();
    text.truecolor(r, g, b)
}

pub fn paint(text: &str, tone: Tone) -> String {
    if PLAIN.load(Ordering::Relaxed) {
        text.to_string()
    } else {
        styled(text, tone).to_string()
    }
}

pub fn muted(text: &str) -> String {
    paint(text, Tone::Muted)
}

pub fn heading(text: &str) -> String {
    if PLAIN.load(Ordering::Relaxed) {
        text.to_string()
    } else {
        styled(text, Tone::Accent).bold().to_string()
    }
}

pub fn icon_ok(label: &str) -> String {
    format!("{} {label}", paint("✓", Tone::Success))
}

pub fn icon_fail(label: &str) -> String {
    format!("{} {label}", paint("✗", Tone::Error))
}

pub fn icon_warn(label: &str) -> String {
    format!("{} {label}", paint("⚠", Tone::Warn))
}

/// "  Label : value"
pub fn label_value(label: &str, value: &str) -> String {
    format!("  {} : {}", muted(label), paint(value, Tone::Accent))
}

/// Status lines on stdout as `[HH:MM:SS] message`, alerts on stderr.
#[derive(Debug, Default)]
pub struct ConsoleStatus;

impl StatusSink for ConsoleStatus {
    fn line(&self, line: StatusLine) {
        let clock = muted(&format!("[{}]", line.at.format("%H:%M:%S")));
        let message = match Tone::of(line.level) {
            Some(tone) => paint(&line.message, tone),
            None => line.message,
        };
        let _ = writeln!(std::io::stdout().lock(), "{clock} {message}");
    }

    fn alert(&self, title: &str, message: &str) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err);
        let _ = writeln!(err, "{}", icon_fail(&heading(title)));
        let _ = writeln!(err, "  {message}");
    }
}
