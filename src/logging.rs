use chrono::Local;
use colored::*;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use tracing::Level;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Step,
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn label(self) -> &'static str {
        match self {
            LogLevel::Step => "STEP",
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    fn color(self) -> &'static str {
        match self {
            LogLevel::Step => "purple",
            LogLevel::Info => "blue",
            LogLevel::Success => "green",
            LogLevel::Warning => "yellow",
            LogLevel::Error => "red",
        }
    }
}

const ALL_LEVELS: [LogLevel; 5] = [
    LogLevel::Step,
    LogLevel::Info,
    LogLevel::Success,
    LogLevel::Warning,
    LogLevel::Error,
];

// Prefix width is fixed so messages line up regardless of level.
static PREFIX_WIDTH: Lazy<usize> = Lazy::new(|| {
    ALL_LEVELS
        .iter()
        .map(|l| l.label().len() + 4)
        .max()
        .unwrap_or(11)
        + 1
});

static LOG_PREFIXES: Lazy<HashMap<LogLevel, String>> = Lazy::new(|| {
    colored::control::set_override(true);
    ALL_LEVELS
        .iter()
        .map(|&level| {
            let visible = level.label().len() + 4;
            let padding = PREFIX_WIDTH.saturating_sub(visible);
            let bracketed = format!("[ {} ]", level.label().color(level.color()).bold());
            (level, format!("{}{}", bracketed, " ".repeat(padding)))
        })
        .collect()
});

struct ChronoLocalTimer;
impl FormatTime for ChronoLocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

pub fn setup_logging() {
    let format = tracing_subscriber::fmt::format()
        .with_timer(ChronoLocalTimer)
        .with_level(false)
        .with_target(false)
        .compact();

    tracing_subscriber::fmt()
        .event_format(format)
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .init();
}

pub fn log(level: LogLevel, message: &str) {
    let prefix = LOG_PREFIXES
        .get(&level)
        .cloned()
        .unwrap_or_else(|| format!("[ {} ] ", level.label()));

    match level {
        LogLevel::Error => eprintln!("{}{}", prefix, message),
        _ => println!("{}{}", prefix, message),
    }
}
