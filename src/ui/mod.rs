use colored::*;
use lazy_static::lazy_static;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Level {
    /// Text-mode tag put in front of the message
    fn tag(self) -> Option<&'static str> {
        match self {
            Level::Warn => Some("warning"),
            Level::Error => Some("error"),
            Level::Debug => Some("debug"),
            Level::Info | Level::Success => None,
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Level::Warn | Level::Error | Level::Debug)
    }
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    format: OutputFormat,
    color: bool,
}

lazy_static! {
    static ref SETTINGS: RwLock<Settings> = RwLock::new(Settings {
        format: OutputFormat::Text,
        color: true,
    });
}

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_debug_mode(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

pub fn init(format: OutputFormat, color: bool) {
    if let Ok(mut settings) = SETTINGS.write() {
        *settings = Settings { format, color };
    }
}

fn settings() -> Settings {
    SETTINGS.read().map(|s| *s).unwrap_or(Settings {
        format: OutputFormat::Text,
        color: false,
    })
}

pub fn get_output_format() -> OutputFormat {
    settings().format
}

/// One JSON line per event.
#[derive(Serialize)]
struct Event<'a> {
    level: Level,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

fn paint(level: Level, text: &str) -> String {
    match level {
        Level::Info => text.normal().to_string(),
        Level::Success => text.green().bold().to_string(),
        Level::Warn => text.yellow().bold().to_string(),
        Level::Error => text.red().bold().to_string(),
        Level::Debug => text.dimmed().to_string(),
    }
}

fn text_line(level: Level, message: &str, color: bool) -> String {
    let line = match level.tag() {
        Some(tag) => format!("{tag}: {message}"),
        None => message.to_string(),
    };
    if color { paint(level, &line) } else { line }
}

/// Emit one user-facing event.
///
/// Text mode writes a plain (optionally colored) line, JSON mode writes
/// `{"level", "code", "message", "data"}`. Warnings, errors and debug output go
/// to stderr so stdout stays clean for results. Debug events are dropped unless
/// `--debug` is on.
pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    if level == Level::Debug && !is_debug_enabled() {
        return;
    }

    let settings = settings();
    let line = match settings.format {
        OutputFormat::Text => text_line(level, message, settings.color),
        OutputFormat::Json => {
            let event = Event {
                level,
                code,
                message,
                data,
            };
            match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(_) => return,
            }
        }
    };

    let _ = if level.to_stderr() {
        writeln!(io::stderr().lock(), "{line}")
    } else {
        writeln!(io::stdout().lock(), "{line}")
    };
}

pub mod prelude {
    pub use super::{Level, OutputFormat, emit, get_output_format};
}
