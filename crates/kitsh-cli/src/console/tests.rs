use super::*;

use rstest::rstest;
use tempfile::TempDir;

use crate::dispatch::DispatchError;
use crate::tests::support::ScriptedReader;

#[derive(Default)]
struct RecordingPipeline {
    commands: Vec<Vec<String>>,
    failing: Option<&'static str>,
}

impl RecordingPipeline {
    fn failing_on(command: &'static str) -> Self {
        Self {
            failing: Some(command),
            ..Self::default()
        }
    }
}

impl<W: Write, E: Write> Pipeline<W, E> for RecordingPipeline {
    fn execute(
        &mut self,
        args: &[String],
        context: ExecutionContext,
        _io: &mut IoStreams<'_, W, E>,
    ) -> Result<(), AppError> {
        self.commands.push(args.to_vec());
        let command = args.first().map(String::as_str);
        if command == Some("console") {
            context.enter_console()?;
        }
        if command.is_some() && command == self.failing {
            return Err(AppError::Dispatch(DispatchError::Syntax(
                command.unwrap_or_default().to_owned(),
            )));
        }
        Ok(())
    }
}

struct SessionRun {
    result: Result<(), AppError>,
    state: SessionState,
    stderr: String,
}

fn run_session(
    reader: &mut ScriptedReader,
    store: &HistoryStore,
    pipeline: &mut RecordingPipeline,
) -> SessionRun {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let (result, state) = {
        let mut io = IoStreams::with_terminal_status(&mut stdout, &mut stderr, false);
        let entries = load_history(store, &mut io);
        let context = ExecutionContext::default()
            .enter_console()
            .expect("outer console starts");
        let mut session = ConsoleSession::new(reader, store, entries);
        let result = session.run(pipeline, context, &mut io);
        (result, session.state())
    };
    SessionRun {
        result,
        state,
        stderr: String::from_utf8(stderr).expect("stderr utf8"),
    }
}

fn history_in(dir: &TempDir) -> HistoryStore {
    HistoryStore::new(Some(dir.path().join("history")))
}

#[test]
fn nested_console_is_rejected() {
    let outer = ExecutionContext::default()
        .enter_console()
        .expect("outer console starts");
    assert!(outer.in_console());
    let error = outer.enter_console().expect_err("nesting is refused");
    assert!(matches!(error, AppError::RecursiveConsole));
}

#[test]
fn console_line_reports_recursion_and_keeps_running() {
    let mut reader = ScriptedReader::lines(&["console", "img list"]);
    let mut pipeline = RecordingPipeline::default();
    let run = run_session(&mut reader, &HistoryStore::default(), &mut pipeline);

    assert!(run.result.is_ok());
    assert_eq!(pipeline.commands.len(), 2);
    assert!(run.stderr.contains("console commands cannot be nested"));
}

#[test]
fn history_is_appended_in_entry_order() {
    let dir = TempDir::new().expect("temp dir");
    let store = history_in(&dir);
    store
        .save(&[String::from("vm list")])
        .expect("seed history");

    let mut reader = ScriptedReader::lines(&["L1", "L2", "L3"]);
    let run = run_session(&mut reader, &store, &mut RecordingPipeline::default());

    assert!(run.result.is_ok());
    let contents = std::fs::read_to_string(dir.path().join("history")).expect("read history");
    assert_eq!(contents, "vm list\nL1\nL2\nL3\n");
}

#[rstest]
#[case("--ssl img list", &["img", "list"])]
#[case("-t img list", &["img", "list"])]
#[case("img list --output json", &["img", "list", "--output", "json"])]
#[case(r#"img.CreateImage '{"size": 1}'"#, &["img.CreateImage", r#"{"size": 1}"#])]
#[case(
    r#"img.CreateImage {"format": "QCOW2", "size": 10}"#,
    &["img.CreateImage", r#"{"format": "QCOW2", "size": 10}"#]
)]
#[case(r#"--ssl vm.IsAlive   {"id": "a b"}  "#, &["vm.IsAlive", r#"{"id": "a b"}"#])]
#[case("vm.Shutdown", &["vm.Shutdown"])]
fn leading_options_are_dropped(#[case] line: &str, #[case] expected: &[&str]) {
    assert_eq!(command_tokens(line), expected);
}

#[test]
fn unquoted_json_payload_reaches_the_pipeline_intact() {
    let dir = TempDir::new().expect("temp dir");
    let store = history_in(&dir);
    let line = r#"img.CreateImage {"format": "QCOW2", "size": 10}"#;
    let mut reader = ScriptedReader::lines(&[line]);
    let mut pipeline = RecordingPipeline::default();

    let run = run_session(&mut reader, &store, &mut pipeline);

    assert!(run.result.is_ok());
    let [command] = pipeline.commands.as_slice() else {
        panic!("expected one command, got {:?}", pipeline.commands);
    };
    assert_eq!(command.first().map(String::as_str), Some("img.CreateImage"));
    let payload: serde_json::Value =
        serde_json::from_str(command.get(1).expect("payload token")).expect("payload is json");
    assert_eq!(payload, serde_json::json!({"format": "QCOW2", "size": 10}));
}

#[test]
fn blank_and_option_only_lines_are_skipped() {
    let dir = TempDir::new().expect("temp dir");
    let store = history_in(&dir);
    let mut reader = ScriptedReader::lines(&["", "   ", "--ssl"]);
    let mut pipeline = RecordingPipeline::default();
    let run = run_session(&mut reader, &store, &mut pipeline);

    assert!(run.result.is_ok());
    assert!(pipeline.commands.is_empty());
    assert!(store.load().expect("load history").is_empty());
    assert_eq!(run.state, SessionState::Aborted);
}

#[test]
fn failed_command_does_not_end_the_session() {
    let mut reader = ScriptedReader::lines(&["boom now", "img list"]);
    let mut pipeline = RecordingPipeline::failing_on("boom");
    let run = run_session(&mut reader, &HistoryStore::default(), &mut pipeline);

    assert!(run.result.is_ok());
    assert_eq!(pipeline.commands.len(), 2);
    assert!(run.stderr.contains("invalid syntax"));
    assert_eq!(reader.recalled(), ["boom now", "img list"]);
}

#[test]
fn interrupt_ends_the_session_and_flushes_history() {
    let dir = TempDir::new().expect("temp dir");
    let store = history_in(&dir);
    let mut reader = ScriptedReader::new(vec![
        ReadOutcome::Line(String::from("vm list")),
        ReadOutcome::Interrupted,
        ReadOutcome::Line(String::from("never read")),
    ]);
    let mut pipeline = RecordingPipeline::default();
    let run = run_session(&mut reader, &store, &mut pipeline);

    assert!(run.result.is_ok());
    assert_eq!(run.state, SessionState::Aborted);
    assert_eq!(pipeline.commands, vec![vec!["vm", "list"]]);
    assert_eq!(store.load().expect("load history"), ["vm list"]);
}

#[test]
fn unwritable_history_is_a_warning() {
    let dir = TempDir::new().expect("temp dir");
    let store = HistoryStore::new(Some(dir.path().to_path_buf()));
    let mut reader = ScriptedReader::lines(&["img list"]);
    let run = run_session(&mut reader, &store, &mut RecordingPipeline::default());

    assert!(run.result.is_ok());
    assert!(run.stderr.contains("warning: failed to write history"));
}
