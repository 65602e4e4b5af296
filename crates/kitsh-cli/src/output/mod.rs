//! Rendering of command results.
//!
//! Human output is aligned tables and coloured status words. JSON output is
//! one compact document per record so results can be piped line by line.

mod table;

use std::fmt::Display;
use std::io::Write;

use clap::ValueEnum;
use colored::{Color, Colorize};
use serde::Serialize;

pub(crate) use table::Table;

use crate::{AppError, IoStreams};

/// Output format selection for command results.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    #[default]
    Auto,
    /// Always render tables and status words.
    Human,
    /// Always emit JSON documents.
    Json,
}

/// Output format after resolving `auto` based on TTY detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ResolvedOutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub(crate) const fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Auto if stdout_is_terminal => ResolvedOutputFormat::Human,
            Self::Auto | Self::Json => ResolvedOutputFormat::Json,
            Self::Human => ResolvedOutputFormat::Human,
        }
    }
}

/// Writes a line to stdout.
pub(crate) fn write_line<W: Write, E: Write>(
    io: &mut IoStreams<'_, W, E>,
    text: impl Display,
) -> Result<(), AppError> {
    writeln!(io.stdout, "{text}").map_err(AppError::Output)
}

/// Writes a line to stdout, coloured when stdout is a terminal.
pub(crate) fn write_coloured<W: Write, E: Write>(
    io: &mut IoStreams<'_, W, E>,
    text: &str,
    colour: Color,
) -> Result<(), AppError> {
    if io.stdout_is_terminal() {
        write_line(io, text.color(colour))
    } else {
        write_line(io, text)
    }
}

/// Writes a rendered table to stdout.
pub(crate) fn write_table<W: Write, E: Write>(
    io: &mut IoStreams<'_, W, E>,
    table: &Table,
) -> Result<(), AppError> {
    io.stdout
        .write_all(table.render().as_bytes())
        .map_err(AppError::Output)
}

/// Writes each record as one compact JSON document per line.
pub(crate) fn write_json_lines<W, E, T>(
    io: &mut IoStreams<'_, W, E>,
    records: &[T],
) -> Result<(), AppError>
where
    W: Write,
    E: Write,
    T: Serialize,
{
    for record in records {
        serde_json::to_writer(&mut *io.stdout, record)
            .map_err(|error| AppError::Output(error.into()))?;
        io.stdout.write_all(b"\n").map_err(AppError::Output)?;
    }
    Ok(())
}

/// Writes `value` as indented JSON followed by a newline.
pub(crate) fn write_json_pretty<W, E, T>(
    io: &mut IoStreams<'_, W, E>,
    value: &T,
) -> Result<(), AppError>
where
    W: Write,
    E: Write,
    T: Serialize + ?Sized,
{
    serde_json::to_writer_pretty(&mut *io.stdout, value)
        .map_err(|error| AppError::Output(error.into()))?;
    io.stdout.write_all(b"\n").map_err(AppError::Output)
}
