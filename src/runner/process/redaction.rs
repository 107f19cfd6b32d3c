//! Redaction of sensitive `KEY=value` arguments before commands are logged.
//!
//! Make tools accept variable assignments on the command line, so a
//! `TOKEN=...` forwarded with `build -- ...` would otherwise reach the log.

/// A single command argument as logged.
#[derive(Debug, Clone)]
pub struct CommandArg(String);
impl CommandArg {
    #[must_use]
    pub const fn new(arg: String) -> Self {
        Self(arg)
    }
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Whether a variable name looks like it holds a credential.
///
/// Names are split on `_` and `-` so `DB_PASSWORD` and `github-token`
/// match as well as the bare keywords.
fn is_sensitive_key(key: &str) -> bool {
    const SENSITIVE_KEYS: [&str; 7] = [
        "password",
        "passwd",
        "token",
        "secret",
        "apikey",
        "auth",
        "authorization",
    ];
    let matches = |word: &str| {
        SENSITIVE_KEYS
            .iter()
            .any(|candidate| word.eq_ignore_ascii_case(candidate))
    };
    let compact: String = key.chars().filter(|c| !matches!(c, '_' | '-')).collect();
    matches(&compact) || key.split(['_', '-']).any(matches)
}

/// Check if `arg` contains a sensitive keyword.
#[must_use]
pub fn contains_sensitive_keyword(arg: &CommandArg) -> bool {
    arg.as_str()
        .split_once('=')
        .is_some_and(|(key, _)| is_sensitive_key(key.trim()))
}

/// Determine whether the argument should be redacted.
#[must_use]
pub fn is_sensitive_arg(arg: &CommandArg) -> bool {
    contains_sensitive_keyword(arg)
}

/// Redact sensitive information in a single argument.
///
/// Sensitive values are replaced with `***REDACTED***`, preserving keys.
#[must_use]
pub fn redact_argument(arg: &CommandArg) -> CommandArg {
    if is_sensitive_arg(arg) {
        if let Some((key, _)) = arg.as_str().split_once('=') {
            let trimmed = key.trim();
            return CommandArg::new(format!("{trimmed}=***REDACTED***"));
        }
        return CommandArg::new(String::from("***REDACTED***"));
    }
    arg.clone()
}

/// Redact sensitive information from all `args`.
#[must_use]
pub fn redact_sensitive_args(args: &[CommandArg]) -> Vec<CommandArg> {
    args.iter().map(redact_argument).collect()
}
