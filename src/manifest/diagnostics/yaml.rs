//! YAML parse diagnostics.
//!
//! `serde_saphyr` reports a line and column; these helpers turn that into a
//! byte span over the manifest text and attach a hint for common mistakes.

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_saphyr::{Error as YamlError, Location};
use thiserror::Error;

use super::{ManifestName, ManifestSource};
use crate::manifest::hints::{YAML_HINTS, find_hint};

/// Byte offset of a 1-based line and column, clamped to the line's end.
/// Both `\n` and `\r\n` line endings are accepted.
fn byte_offset(src: &str, line: u64, column: u64) -> usize {
    let target_line = usize::try_from(line.saturating_sub(1)).unwrap_or(usize::MAX);
    let target_column = usize::try_from(column.saturating_sub(1)).unwrap_or(usize::MAX);
    let mut offset = 0usize;
    for (idx, segment) in src.split_inclusive('\n').enumerate() {
        if idx == target_line {
            let text = segment.trim_end_matches(['\n', '\r']);
            return offset
                + text
                    .char_indices()
                    .nth(target_column)
                    .map_or(text.len(), |(at, _)| at);
        }
        offset += segment.len();
    }
    src.len()
}

/// One-character span at `loc`, or the character before it when `loc`
/// sits on a line break or the end of input.
fn to_span(src: &ManifestSource, loc: Location) -> SourceSpan {
    let at = byte_offset(src.as_str(), loc.line(), loc.column());
    let bytes = src.as_str().as_bytes();
    let is_break = |b: u8| b == b'\n' || b == b'\r';
    let (start, end) = match bytes.get(at) {
        Some(&b) if !is_break(b) => (at, at + 1),
        _ if at > 0 && bytes.get(at - 1).is_some_and(|p| !is_break(*p)) => (at - 1, at),
        _ => (at, at),
    };
    SourceSpan::new(start.into(), end.saturating_sub(start))
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(makegen::yaml::parse))]
struct YamlDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("parse error here")]
    span: Option<SourceSpan>,
    #[help]
    help: Option<String>,
    #[source]
    source: YamlError,
    message: String,
}

fn indented_with_tab(src: &ManifestSource, loc: Location) -> bool {
    let line_idx = usize::try_from(loc.line().saturating_sub(1)).unwrap_or(usize::MAX);
    src.as_str()
        .lines()
        .nth(line_idx)
        .is_some_and(|line| {
            line.chars()
                .take_while(|c| c.is_whitespace())
                .any(|c| c == '\t')
        })
}

fn hint_for(err_text: &str, src: &ManifestSource, loc: Option<Location>) -> Option<String> {
    if loc.is_some_and(|l| indented_with_tab(src, l)) {
        return Some("Use spaces for indentation; tabs are invalid in YAML.".to_owned());
    }
    find_hint(&YAML_HINTS, err_text)
}

/// Map a YAML parse error into a diagnostic with a span and, where one
/// applies, a hint.
#[must_use]
pub fn map_yaml_error(
    err: YamlError,
    src: &ManifestSource,
    name: &ManifestName,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    let loc = err.location();
    let (line, column, span) = loc.map_or((1, 1, None), |l| {
        (l.line(), l.column(), Some(to_span(src, l)))
    });
    let err_text = err.to_string();
    let help = hint_for(&err_text, src, loc);
    Box::new(YamlDiagnostic {
        src: NamedSource::new(name.as_str(), src.as_str().to_owned()),
        span,
        help,
        source: err,
        message: format!("YAML parse error at line {line}, column {column}: {err_text}"),
    })
}
