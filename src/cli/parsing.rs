//! CLI parsing helpers for clap value parsers.

use crate::backend::Backend;
use itertools::Itertools;

pub(super) fn parse_jobs(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("{s} is not a valid number"))?;
    if (1..=super::MAX_JOBS).contains(&value) {
        Ok(value)
    } else {
        Err(format!("jobs must be between 1 and {}", super::MAX_JOBS))
    }
}

/// Resolve a generator by display name or slug, returning its display name.
pub(super) fn parse_generator(s: &str) -> Result<String, String> {
    Backend::by_name(s)
        .map(|backend| backend.name.to_owned())
        .ok_or_else(|| {
            format!(
                "unknown generator '{s}'; available: {}",
                Backend::all().iter().map(|b| b.name).join(", ")
            )
        })
}
