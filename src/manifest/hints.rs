//! Hints attached to manifest diagnostics, matched by message substring.

pub(crate) const YAML_HINTS: [(&str, &str); 4] = [
    (
        "did not find expected '-'",
        "Start list items with '-' and ensure proper indentation.",
    ),
    (
        "mapping values are not allowed",
        "Check for a stray ':' or add quotes around values where needed.",
    ),
    (
        "found character that cannot start any token",
        "Remove stray characters and ensure indentation uses spaces (no tabs).",
    ),
    (
        "unknown escape character",
        "Use valid YAML escape sequences or quote the string.",
    ),
];

pub(crate) const STRUCTURE_HINTS: [(&str, &str); 3] = [
    (
        "unknown variant",
        "Target kinds are executable, static-library, shared-library and utility.",
    ),
    (
        "unknown field",
        "Check the spelling of the key; unknown keys are rejected.",
    ),
    (
        "missing field `kind`",
        "Every target needs a kind.",
    ),
];

/// First hint whose needle occurs in `message`, ignoring case.
pub(crate) fn find_hint(table: &[(&str, &str)], message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    table
        .iter()
        .find(|(needle, _)| lower.contains(&needle.to_lowercase()))
        .map(|(_, hint)| (*hint).to_owned())
}
