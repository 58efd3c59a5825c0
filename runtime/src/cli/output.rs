// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! Terminal output helpers shared by the subcommands.
//!
//! Global flags are published through environment variables by `main` so
//! every command can check them without threading a context around.

use serde::Serialize;

pub fn is_json() -> bool {
    std::env::var_os("VIDGRAB_JSON").is_some()
}

pub fn is_quiet() -> bool {
    std::env::var_os("VIDGRAB_QUIET").is_some()
}

fn color_enabled() -> bool {
    std::env::var_os("VIDGRAB_NO_COLOR").is_none() && std::env::var_os("NO_COLOR").is_none()
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  failed to serialize output: {e}"),
    }
}

/// Status symbols, colored unless disabled.
pub struct Styled {
    color: bool,
}

impl Styled {
    pub fn new() -> Self {
        Self {
            color: color_enabled(),
        }
    }

    fn paint(&self, code: &str, s: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{s}\x1b[0m")
        } else {
            s.to_string()
        }
    }

    pub fn ok_sym(&self) -> String {
        self.paint("32", "✓")
    }

    pub fn warn_sym(&self) -> String {
        self.paint("33", "!")
    }

    pub fn err_sym(&self) -> String {
        self.paint("31", "✗")
    }

    pub fn dim(&self, s: &str) -> String {
        self.paint("2", s)
    }
}

impl Default for Styled {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_paint() {
        let s = Styled { color: false };
        assert_eq!(s.ok_sym(), "✓");
        assert_eq!(s.dim("x"), "x");
    }

    #[test]
    fn test_colored_paint() {
        let s = Styled { color: true };
        assert_eq!(s.err_sym(), "\x1b[31m✗\x1b[0m");
    }
}
