//! Line input for the console.
//!
//! The session reads through the [`LineReader`] trait so tests can script
//! input. The terminal implementation uses `rustyline` for editing, in-memory
//! recall and first-word completion.

use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Context, Editor, Helper, Highlighter, Hinter, Validator};

use super::ConsoleError;

/// Result of one attempt to read a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    Line(String),
    Interrupted,
    Eof,
}

/// Source of console input lines.
pub(crate) trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ConsoleError>;

    /// Makes `line` available to in-session recall.
    fn add_history(&mut self, line: &str);
}

/// Builds a [`LineReader`] for one session.
pub(crate) trait LineReaderFactory {
    /// `history` seeds recall; `completions` are the first-word candidates.
    fn create(
        &self,
        history: &[String],
        completions: Vec<String>,
    ) -> Result<Box<dyn LineReader>, ConsoleError>;
}

/// Interactive terminal input.
pub(crate) struct TerminalReaderFactory;

impl LineReaderFactory for TerminalReaderFactory {
    fn create(
        &self,
        history: &[String],
        completions: Vec<String>,
    ) -> Result<Box<dyn LineReader>, ConsoleError> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .build();
        let mut editor =
            Editor::<CommandCompleter, DefaultHistory>::with_config(config).map_err(ConsoleError::Editor)?;
        editor.set_helper(Some(CommandCompleter {
            candidates: completions,
        }));
        let mut reader = TerminalReader { editor };
        for entry in history {
            reader.add_history(entry);
        }
        Ok(Box::new(reader))
    }
}

struct TerminalReader {
    editor: Editor<CommandCompleter, DefaultHistory>,
}

impl LineReader for TerminalReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ConsoleError> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(error) => Err(ConsoleError::Editor(error)),
        }
    }

    fn add_history(&mut self, line: &str) {
        if let Err(error) = self.editor.add_history_entry(line) {
            tracing::warn!(target: "kitsh::console", %error, "failed to record history entry");
        }
    }
}

#[derive(Helper, Highlighter, Hinter, Validator)]
struct CommandCompleter {
    candidates: Vec<String>,
}

impl Completer for CommandCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let head = line.get(..pos).unwrap_or(line);
        let word = head.trim_start();
        if word.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }
        let start = head.len() - word.len();
        Ok((start, complete_prefix(&self.candidates, word)))
    }
}

/// Candidates starting with `prefix`, ignoring ASCII case.
fn complete_prefix(candidates: &[String], prefix: &str) -> Vec<String> {
    let prefix = prefix.to_ascii_lowercase();
    candidates
        .iter()
        .filter(|candidate| candidate.to_ascii_lowercase().starts_with(&prefix))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn candidates() -> Vec<String> {
        ["console", "image", "img.CreateImage", "img.GetImages", "vm", "vm.IsAlive"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[rstest]
    #[case("IMG.get", &["img.GetImages"])]
    #[case("im", &["image", "img.CreateImage", "img.GetImages"])]
    #[case("vm.", &["vm.IsAlive"])]
    #[case("x", &[])]
    fn prefix_matches_ignore_case(#[case] prefix: &str, #[case] expected: &[&str]) {
        assert_eq!(complete_prefix(&candidates(), prefix), expected);
    }

    #[test]
    fn empty_prefix_offers_everything() {
        assert_eq!(complete_prefix(&candidates(), "").len(), candidates().len());
    }
}
