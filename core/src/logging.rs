// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! A small internal logger.
//!
//! Nothing in this workspace's dependency graph pulls in `log` or
//! `tracing`, and this crate does not add one: every diagnostic print in
//! the index build/consolidate/compact paths goes through here instead, so
//! a caller can redirect or silence it without an extra crate. The level
//! is read once from `ANN_LOG_LEVEL` (`error`, `warn`, `info`, `debug`,
//! `trace`; default `warn`) and cached; `set_level` overrides it at
//! runtime, which is what tests use instead of re-reading the environment.

use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Level {
    fn from_env_str(s: &str) -> Option<Level> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Some(Level::Error),
            "warn" | "warning" => Some(Level::Warn),
            "info" => Some(Level::Info),
            "debug" => Some(Level::Debug),
            "trace" => Some(Level::Trace),
            _ => None,
        }
    }
}

static LEVEL: RwLock<Option<Level>> = RwLock::new(None);

fn current_level() -> Level {
    if let Some(level) = *LEVEL.read().unwrap_or_else(|e| e.into_inner()) {
        return level;
    }
    let level = std::env::var("ANN_LOG_LEVEL")
        .ok()
        .and_then(|s| Level::from_env_str(&s))
        .unwrap_or(Level::Warn);
    *LEVEL.write().unwrap_or_else(|e| e.into_inner()) = Some(level);
    level
}

/// Overrides the cached level. Intended for tests; production callers
/// should set `ANN_LOG_LEVEL` before the first log call instead.
pub fn set_level(level: Level) {
    *LEVEL.write().unwrap_or_else(|e| e.into_inner()) = Some(level);
}

/// `error` and `warn` go to stderr via `ANN_LOG_SINK=stderr` (the default);
/// setting it to `stdout` routes everything to stdout instead, which is
/// useful when a test harness only captures one stream.
fn sink_is_stdout() -> bool {
    std::env::var("ANN_LOG_SINK")
        .map(|s| s.eq_ignore_ascii_case("stdout"))
        .unwrap_or(false)
}

#[doc(hidden)]
pub fn log_line(level: Level, args: std::fmt::Arguments) {
    if level > current_level() {
        return;
    }
    let tag = match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    };
    if sink_is_stdout() {
        println!("[{tag}] {args}");
    } else {
        eprintln!("[{tag}] {args}");
    }
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::log_line($crate::logging::Level::Error, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::log_line($crate::logging::Level::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::log_line($crate::logging::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::log_line($crate::logging::Level::Debug, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering_matches_verbosity() {
        assert!(Level::Error < Level::Warn);
        assert!(Level::Warn < Level::Info);
        assert!(Level::Info < Level::Debug);
        assert!(Level::Debug < Level::Trace);
    }

    #[test]
    fn set_level_overrides_cache() {
        set_level(Level::Trace);
        assert_eq!(current_level(), Level::Trace);
        set_level(Level::Error);
        assert_eq!(current_level(), Level::Error);
    }

    #[test]
    fn from_env_str_accepts_known_names() {
        assert_eq!(Level::from_env_str("debug"), Some(Level::Debug));
        assert_eq!(Level::from_env_str("WARN"), Some(Level::Warn));
        assert_eq!(Level::from_env_str("bogus"), None);
    }
}
