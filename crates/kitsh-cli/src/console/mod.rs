//! Interactive console session.
//!
//! A session reads one line at a time, tokenizes it, drops leading global
//! options and feeds the remaining tokens back into the command pipeline in
//! the same process. Commands run strictly one after another. A console
//! started from inside another console is refused through the
//! [`ExecutionContext`] marker.

mod editor;
mod history;
mod tokenizer;

use std::io::Write;
use std::iter;

use colored::Colorize;
use thiserror::Error;

pub(crate) use editor::{LineReader, LineReaderFactory, ReadOutcome, TerminalReaderFactory};
pub(crate) use history::{HistoryError, HistoryStore};
use tokenizer::split_words;

use crate::{AppError, IoStreams};

pub(crate) const PROMPT: &str = "kitsh> ";

/// Failures of the console input machinery.
#[derive(Debug, Error)]
pub(crate) enum ConsoleError {
    #[error("line editor failed: {0}")]
    Editor(#[from] rustyline::error::ReadlineError),
}

/// Sentinel present while a console session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConsoleMarker;

/// Per-invocation context threaded through the command pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ExecutionContext {
    console: Option<ConsoleMarker>,
}

impl ExecutionContext {
    pub(crate) const fn in_console(self) -> bool {
        self.console.is_some()
    }

    /// Returns the context for commands issued inside a new console.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::RecursiveConsole`] when a console is already
    /// running in this context.
    pub(crate) fn enter_console(self) -> Result<Self, AppError> {
        if self.in_console() {
            return Err(AppError::RecursiveConsole);
        }
        Ok(Self {
            console: Some(ConsoleMarker),
        })
    }
}

/// The command pipeline a console re-enters for every line.
pub(crate) trait Pipeline<W: Write, E: Write> {
    /// Runs one command given its tokens, global options excluded.
    fn execute(
        &mut self,
        args: &[String],
        context: ExecutionContext,
        io: &mut IoStreams<'_, W, E>,
    ) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    Idle,
    ReadingLine,
    Dispatching,
    RenderingResult,
    Aborted,
}

/// One run of the read-eval-print loop.
pub(crate) struct ConsoleSession<'a> {
    reader: &'a mut dyn LineReader,
    history: &'a HistoryStore,
    entries: Vec<String>,
    state: SessionState,
}

impl<'a> ConsoleSession<'a> {
    /// Prepares a session whose history starts with `entries`.
    pub(crate) fn new(
        reader: &'a mut dyn LineReader,
        history: &'a HistoryStore,
        entries: Vec<String>,
    ) -> Self {
        Self {
            reader,
            history,
            entries,
            state: SessionState::Idle,
        }
    }

    pub(crate) const fn state(&self) -> SessionState {
        self.state
    }

    /// Runs until the input is interrupted or exhausted, then persists the
    /// history. `context` must already carry the console marker.
    pub(crate) fn run<P, W, E>(
        &mut self,
        pipeline: &mut P,
        context: ExecutionContext,
        io: &mut IoStreams<'_, W, E>,
    ) -> Result<(), AppError>
    where
        P: Pipeline<W, E>,
        W: Write,
        E: Write,
    {
        let outcome = self.read_eval_loop(pipeline, context, io);
        if let Err(error) = self.history.save(&self.entries) {
            report_warning(&error, io);
        }
        outcome
    }

    fn read_eval_loop<P, W, E>(
        &mut self,
        pipeline: &mut P,
        context: ExecutionContext,
        io: &mut IoStreams<'_, W, E>,
    ) -> Result<(), AppError>
    where
        P: Pipeline<W, E>,
        W: Write,
        E: Write,
    {
        loop {
            self.transition(SessionState::ReadingLine);
            let line = match self.reader.read_line(PROMPT)? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Interrupted | ReadOutcome::Eof => {
                    self.transition(SessionState::Aborted);
                    return Ok(());
                }
            };

            let args = command_tokens(&line);
            if args.is_empty() {
                self.transition(SessionState::Idle);
                continue;
            }

            self.transition(SessionState::Dispatching);
            if let Err(error) = pipeline.execute(&args, context, io) {
                report_error(&error, io);
            }

            self.transition(SessionState::RenderingResult);
            self.reader.add_history(&line);
            self.entries.push(line);
            self.transition(SessionState::Idle);
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::trace!(target: "kitsh::console", from = ?self.state, to = ?next, "console state");
        self.state = next;
    }
}

/// Tokens of `line` with leading global options removed.
///
/// A dotted command such as `img.CreateImage` takes the rest of the line
/// verbatim as its single payload token. Only a payload that is one fully
/// quoted word is unwrapped, so an unquoted JSON object keeps its quotes.
pub(crate) fn command_tokens(line: &str) -> Vec<String> {
    let mut words = split_words(line)
        .into_iter()
        .skip_while(|word| word.text.starts_with('-'));
    let Some(command) = words.next() else {
        return Vec::new();
    };
    if !command.text.contains('.') {
        return iter::once(command.text)
            .chain(words.map(|word| word.text))
            .collect();
    }

    let payload = line.get(command.span.end..).unwrap_or_default().trim();
    let rest: Vec<_> = words.collect();
    let payload = match rest.as_slice() {
        [only] if is_fully_quoted(payload) => only.text.clone(),
        _ => payload.to_owned(),
    };
    if payload.is_empty() {
        vec![command.text]
    } else {
        vec![command.text, payload]
    }
}

fn is_fully_quoted(text: &str) -> bool {
    let mut characters = text.chars();
    match (characters.next(), characters.next_back()) {
        (Some(open), Some(close)) => open == close && tokenizer::is_quote(open),
        _ => false,
    }
}

/// Writes an error to the error stream, in red on a terminal.
pub(crate) fn report_error<W: Write, E: Write>(error: &AppError, io: &mut IoStreams<'_, W, E>) {
    let message = error.to_string();
    let written = if io.stderr_is_terminal() {
        writeln!(io.stderr, "{}", message.red())
    } else {
        writeln!(io.stderr, "{message}")
    };
    if written.is_err() {
        tracing::warn!(target: "kitsh::console", %message, "failed to report error");
    }
}

fn report_warning<W: Write, E: Write>(error: &HistoryError, io: &mut IoStreams<'_, W, E>) {
    tracing::warn!(target: "kitsh::console", %error, "history not saved");
    let message = format!("warning: {error}");
    let written = if io.stderr_is_terminal() {
        writeln!(io.stderr, "{}", message.yellow())
    } else {
        writeln!(io.stderr, "{message}")
    };
    if written.is_err() {
        tracing::warn!(target: "kitsh::console", "failed to report history warning");
    }
}

/// Loads the history for a new session, reporting but tolerating failures.
pub(crate) fn load_history<W: Write, E: Write>(
    store: &HistoryStore,
    io: &mut IoStreams<'_, W, E>,
) -> Vec<String> {
    store.load().unwrap_or_else(|error| {
        report_warning(&error, io);
        Vec::new()
    })
}

#[cfg(test)]
mod tests;
