//! Shell quoting for recipe lines and composed build commands.
//!
//! Makefile recipes run under the shell of the backend family, so the
//! quoting flavour follows the policy rather than the host platform.

use std::fmt;

use shell_quote::{QuoteRefExt, Sh};

/// Shell family that will interpret a quoted word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlavor {
    /// POSIX `sh`.
    Posix,
    /// `cmd.exe` and compatible command interpreters.
    Windows,
}

impl ShellFlavor {
    /// Flavour matching a policy's `windows_shell` knob.
    #[must_use]
    pub const fn from_windows_shell(windows: bool) -> Self {
        if windows { Self::Windows } else { Self::Posix }
    }
}

/// A word could not be quoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// Line breaks cannot survive a single recipe line.
    ContainsLineBreak,
}

impl fmt::Display for QuoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContainsLineBreak => f.write_str(
                "arguments containing carriage returns or line feeds cannot be safely quoted",
            ),
        }
    }
}

impl std::error::Error for QuoteError {}

/// Whether `arg` needs quoting for `flavor`.
#[must_use]
pub fn needs_quotes(arg: &str, flavor: ShellFlavor) -> bool {
    if arg.is_empty() {
        return true;
    }
    match flavor {
        ShellFlavor::Posix => arg.chars().any(|ch| {
            !(ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | '=' | '+' | ',' | ':' | '@' | '%'))
        }),
        ShellFlavor::Windows => arg.chars().any(|ch| {
            matches!(
                ch,
                ' ' | '\t' | '"' | '^' | '&' | '|' | '<' | '>' | '%' | '!'
            )
        }),
    }
}

/// Quote `arg` for `flavor`, leaving plain words untouched.
///
/// # Errors
///
/// Returns [`QuoteError::ContainsLineBreak`] for words spanning lines.
pub fn quote(arg: &str, flavor: ShellFlavor) -> Result<String, QuoteError> {
    if arg.chars().any(|ch| matches!(ch, '\n' | '\r')) {
        return Err(QuoteError::ContainsLineBreak);
    }
    if !needs_quotes(arg, flavor) {
        return Ok(arg.to_owned());
    }
    Ok(match flavor {
        ShellFlavor::Posix => quote_posix(arg),
        ShellFlavor::Windows => quote_windows(arg),
    })
}

/// Double every `$` so make passes the word to the shell unexpanded.
#[must_use]
pub fn escape_make(word: &str) -> String {
    word.replace('$', "$$")
}

/// Wrap `arg` in double quotes without escaping, as include paths and file
/// names are spelled in makefiles.
#[must_use]
pub fn double_quote(arg: &str) -> String {
    format!("\"{arg}\"")
}

fn quote_posix(arg: &str) -> String {
    let bytes: Vec<u8> = arg.quoted(Sh);
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            debug_assert!(false, "quoted args must be valid UTF-8: {err}");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    }
}

fn quote_windows(arg: &str) -> String {
    let mut buf = String::with_capacity(arg.len() + 2);
    buf.push('"');
    for ch in arg.chars() {
        match ch {
            '"' | '^' | '&' | '|' | '<' | '>' | '!' => {
                buf.push('^');
                buf.push(ch);
            }
            '%' => buf.push_str("%%"),
            _ => buf.push(ch),
        }
    }
    buf.push('"');
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ShellFlavor::Posix)]
    #[case(ShellFlavor::Windows)]
    fn plain_words_are_untouched(#[case] flavor: ShellFlavor) {
        assert_eq!(quote("lib.lib", flavor), Ok("lib.lib".to_owned()));
    }

    #[rstest]
    #[case("", "\"\"")]
    #[case("needs space", "\"needs space\"")]
    #[case("pipe|test", "\"pipe^|test\"")]
    #[case("%TEMP%", "\"%%TEMP%%\"")]
    #[case("say \"hi\"", "\"say ^\"hi^\"\"")]
    fn windows_metacharacters_are_escaped(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(quote(input, ShellFlavor::Windows), Ok(expected.to_owned()));
    }

    #[rstest]
    fn posix_spaces_are_quoted() {
        let quoted = quote("needs space", ShellFlavor::Posix).expect("quote");
        assert_ne!(quoted, "needs space");
        assert!(quoted.contains('\'') || quoted.contains('"'), "{quoted}");
    }

    #[rstest]
    #[case("$HOME", "$$HOME")]
    #[case("cost: $$5", "cost: $$$$5")]
    #[case("plain", "plain")]
    fn make_escaping_doubles_dollars(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_make(input), expected);
    }

    #[rstest]
    #[case(ShellFlavor::Posix)]
    #[case(ShellFlavor::Windows)]
    fn line_breaks_are_rejected(#[case] flavor: ShellFlavor) {
        assert_eq!(
            quote("line\nbreak", flavor),
            Err(QuoteError::ContainsLineBreak)
        );
    }
}
