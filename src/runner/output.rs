//! Standard output helpers.
//!
//! A closed pipe (`makegen list-generators | head -1`) is not an error.

use anyhow::{Context, Result};
use std::io::{self, Write};

fn is_broken_pipe(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::BrokenPipe
}

fn write_all_ignoring_broken_pipe(writer: &mut impl Write, buf: &[u8]) -> io::Result<()> {
    match writer.write_all(buf) {
        Ok(()) => Ok(()),
        Err(err) if is_broken_pipe(&err) => Ok(()),
        Err(err) => Err(err),
    }
}

fn flush_ignoring_broken_pipe(writer: &mut impl Write) -> io::Result<()> {
    match writer.flush() {
        Ok(()) => Ok(()),
        Err(err) if is_broken_pipe(&err) => Ok(()),
        Err(err) => Err(err),
    }
}

pub(super) fn write_lines<W: Write>(writer: &mut W, lines: &[String]) -> Result<()> {
    let mut text = lines.join("\n");
    text.push('\n');
    write_all_ignoring_broken_pipe(writer, text.as_bytes()).context("failed to write output")?;
    flush_ignoring_broken_pipe(writer).context("failed to flush output")?;
    Ok(())
}

/// Write `lines` to standard output, one per line.
pub(super) fn write_stdout(lines: &[String]) -> Result<()> {
    write_lines(&mut io::stdout().lock(), lines)
}
