//! Structured command tokens.
//!
//! Commands stay as token lists until render time so quoting, separator
//! conversion and object-name mangling are applied in one place.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

/// A file location independent of where the makefile runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Location {
    /// Relative to the project source root, or absolute.
    Source(Utf8PathBuf),
    /// Relative to the build root, or absolute.
    Build(Utf8PathBuf),
    /// Object file compiled from `source` for the target whose build
    /// directory is `dir`; the final name depends on the mangling policy.
    Object {
        /// Target build directory relative to the build root.
        dir: Utf8PathBuf,
        /// Source path relative to the target's source directory.
        source: Utf8PathBuf,
        /// Object file suffix.
        suffix: String,
    },
}

impl Location {
    /// Location inside the build tree.
    pub fn build(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Build(path.into())
    }

    /// Location inside the source tree.
    pub fn source(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Source(path.into())
    }
}

/// One word of a command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Token {
    /// A plain word, quoted for the recipe shell when needed.
    Literal(String),
    /// Emitted verbatim, e.g. make variable references.
    Raw(String),
    /// A path composed relative to where the recipe runs.
    Path(Location),
    /// A path glued to a flag, such as `-fo=` followed by an object.
    PrefixedPath {
        /// Text placed before the path.
        prefix: String,
        /// The path.
        path: Location,
    },
    /// Output file of the named target.
    TargetFile(String),
    /// Redirect standard output to the null device.
    NullRedirect,
    /// Recursive invocation of the make program.
    MakeProgram,
}

impl Token {
    /// A literal word.
    pub fn literal(word: impl Into<String>) -> Self {
        Self::Literal(word.into())
    }

    /// A verbatim word.
    pub fn raw(word: impl Into<String>) -> Self {
        Self::Raw(word.into())
    }

    /// Parse a user-supplied argument, recognising `$<TARGET_FILE:name>`.
    #[must_use]
    pub fn from_argument(arg: &str) -> Self {
        arg.strip_prefix("$<TARGET_FILE:")
            .and_then(|rest| rest.strip_suffix('>'))
            .filter(|name| !name.is_empty())
            .map_or_else(|| Self::literal(arg), |name| Self::TargetFile(name.to_owned()))
    }
}

/// Whether a command runs a tool or re-enters the make program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommandKind {
    /// Compiler, archiver, linker or user command.
    Tool,
    /// Recursive make invocation; receives the silent flag.
    Invocation,
}

/// A build step as a token list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    /// Words in order.
    pub tokens: Vec<Token>,
    /// Directory the command should run in, relative to the build root.
    pub working_dir: Option<Utf8PathBuf>,
    /// Tool or invocation.
    pub kind: CommandKind,
}

impl CommandSpec {
    /// A tool command with no working directory.
    #[must_use]
    pub const fn tool(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            working_dir: None,
            kind: CommandKind::Tool,
        }
    }

    /// Re-enter the make program for `directory` and build `goal`.
    #[must_use]
    pub fn invocation(directory: &Utf8Path, goal: Token) -> Self {
        Self {
            tokens: vec![Token::MakeProgram, goal],
            working_dir: Some(directory.to_owned()),
            kind: CommandKind::Invocation,
        }
    }

    /// Build a tool command from user argument words.
    pub fn from_argv<S: AsRef<str>>(argv: &[S], working_dir: &Utf8Path) -> Self {
        Self {
            tokens: argv
                .iter()
                .map(|arg| Token::from_argument(arg.as_ref()))
                .collect(),
            working_dir: Some(working_dir.to_owned()),
            kind: CommandKind::Tool,
        }
    }

    /// Set the working directory.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Values substituted into a rule template.
#[derive(Debug, Default)]
pub(crate) struct TemplateValues<'a> {
    pub compiler: Option<&'a str>,
    pub flags: Option<String>,
    pub defines: Option<String>,
    pub includes: Option<String>,
    pub link_flags: Option<String>,
    pub object: Option<Location>,
    pub source: Option<Location>,
    pub target: Option<Location>,
    pub objects: Vec<Location>,
    pub link_libraries: Vec<Token>,
}

/// Expand a `<PLACEHOLDER>` template into tokens.
///
/// Words without a placeholder become literals. A placeholder with leading
/// text keeps that text as a prefix; list placeholders repeat it per element.
/// Placeholders without a value vanish.
pub(crate) fn expand_template(template: &str, values: &TemplateValues<'_>) -> Vec<Token> {
    let mut tokens = Vec::new();
    for word in template.split_whitespace() {
        let Some((prefix, slot)) = split_placeholder(word) else {
            tokens.push(Token::literal(word));
            continue;
        };
        let raw = |value: Option<&String>| value.map(|v| Token::raw(format!("{prefix}{v}")));
        let path = |value: Option<&Location>| value.map(|p| prefixed(prefix, p.clone()));
        match slot {
            "COMPILER" => tokens.extend(values.compiler.map(|c| Token::raw(format!("{prefix}{c}")))),
            "FLAGS" => tokens.extend(raw(values.flags.as_ref())),
            "DEFINES" => tokens.extend(raw(values.defines.as_ref())),
            "INCLUDES" => tokens.extend(raw(values.includes.as_ref())),
            "LINK_FLAGS" => tokens.extend(raw(values.link_flags.as_ref())),
            "OBJECT" => tokens.extend(path(values.object.as_ref())),
            "SOURCE" => tokens.extend(path(values.source.as_ref())),
            "TARGET" => tokens.extend(path(values.target.as_ref())),
            "OBJECTS" => tokens.extend(values.objects.iter().map(|o| prefixed(prefix, o.clone()))),
            "LINK_LIBRARIES" => tokens.extend(values.link_libraries.iter().cloned()),
            _ => tokens.push(Token::literal(word)),
        }
    }
    tokens
}

fn prefixed(prefix: &str, path: Location) -> Token {
    if prefix.is_empty() {
        Token::Path(path)
    } else {
        Token::PrefixedPath {
            prefix: prefix.to_owned(),
            path,
        }
    }
}

fn split_placeholder(word: &str) -> Option<(&str, &str)> {
    let open = word.find('<')?;
    let rest = word.get(open + 1..)?.strip_suffix('>')?;
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
        return None;
    }
    Some((word.get(..open)?, rest))
}
