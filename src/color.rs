#![allow(clippy::module_name_repetitions)]
//! Colored stderr for dockertools.
//!
//! Stdout is the data channel (mapping lines, tag lines, validation errors,
//! the CI set-output line) and is never painted. Progress, skips and failures
//! go to stderr through `log_*_stderr`, which add color only.
//!
//! Whether stderr is colored is decided in this order: `NO_COLOR` set turns it
//! off, then `--color`, then `DOCKERTOOLS_COLOR`, and otherwise stderr being a
//! terminal. Callers resolve it once per command:
//!
//! ```text
//! let use_err = dockertools::color_enabled_stderr();
//! ```

use clap::ValueEnum;
use once_cell::sync::OnceCell;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

static COLOR_MODE: OnceCell<ColorMode> = OnceCell::new();

/// Record the `--color` choice; the first call wins.
pub fn set_color_mode(mode: ColorMode) {
    let _ = COLOR_MODE.set(mode);
}

pub(crate) fn parse_color_mode(s: &str) -> Option<ColorMode> {
    match s.trim().to_ascii_lowercase().as_str() {
        "auto" => Some(ColorMode::Auto),
        "always" | "on" | "true" | "yes" => Some(ColorMode::Always),
        "never" | "off" | "false" | "no" => Some(ColorMode::Never),
        _ => None,
    }
}

/// The mode in force given `NO_COLOR`, the flag and the environment value.
fn effective_mode(no_color: bool, flag: Option<ColorMode>, env: Option<&str>) -> ColorMode {
    if no_color {
        return ColorMode::Never;
    }
    flag.or_else(|| env.and_then(parse_color_mode))
        .unwrap_or(ColorMode::Auto)
}

fn color_enabled_for(is_tty: bool) -> bool {
    // https://no-color.org/: presence alone disables color.
    let no_color = std::env::var_os("NO_COLOR").is_some();
    let env = std::env::var("DOCKERTOOLS_COLOR").ok();
    match effective_mode(no_color, COLOR_MODE.get().copied(), env.as_deref()) {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => is_tty,
    }
}

pub fn color_enabled_stderr() -> bool {
    color_enabled_for(atty::is(atty::Stream::Stderr))
}

/// Wrap `s` in `code` and a reset when `enabled`.
pub fn paint(enabled: bool, code: &str, s: &str) -> String {
    if enabled {
        format!("{code}{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

#[derive(Copy, Clone)]
enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn code(self) -> &'static str {
        match self {
            Level::Info => "\x1b[36;1m",
            Level::Warn => "\x1b[33m",
            Level::Error => "\x1b[31;1m",
        }
    }
}

fn log_stderr(level: Level, use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, level.code(), msg));
}

pub fn log_info_stderr(use_color: bool, msg: &str) {
    log_stderr(Level::Info, use_color, msg);
}

pub fn log_warn_stderr(use_color: bool, msg: &str) {
    log_stderr(Level::Warn, use_color, msg);
}

pub fn log_error_stderr(use_color: bool, msg: &str) {
    log_stderr(Level::Error, use_color, msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color_mode_aliases() {
        assert_eq!(parse_color_mode(" Always "), Some(ColorMode::Always));
        assert_eq!(parse_color_mode("off"), Some(ColorMode::Never));
        assert_eq!(parse_color_mode("auto"), Some(ColorMode::Auto));
        assert_eq!(parse_color_mode("rainbow"), None);
    }

    #[test]
    fn test_no_color_beats_flag_and_env() {
        assert_eq!(
            effective_mode(true, Some(ColorMode::Always), Some("always")),
            ColorMode::Never
        );
    }

    #[test]
    fn test_flag_beats_env() {
        assert_eq!(
            effective_mode(false, Some(ColorMode::Never), Some("always")),
            ColorMode::Never
        );
        assert_eq!(effective_mode(false, None, Some("always")), ColorMode::Always);
    }

    #[test]
    fn test_unknown_env_value_falls_back_to_auto() {
        assert_eq!(effective_mode(false, None, Some("rainbow")), ColorMode::Auto);
        assert_eq!(effective_mode(false, None, None), ColorMode::Auto);
    }

    #[test]
    fn test_paint_only_when_enabled() {
        assert_eq!(paint(false, "\x1b[31m", "x"), "x");
        assert_eq!(paint(true, "\x1b[31m", "x"), "\x1b[31mx\x1b[0m");
    }
}
