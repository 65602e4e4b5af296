//! Test doubles for the shell runtime.
//!
//! Supplies stub channels for the dispatcher, a fake JSONL service for the
//! socket transport, scripted console input and a static configuration loader
//! so scenarios stay focused on their assertions.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use kitsh_config::Config;
use serde_json::{Value, json};

use crate::console::{ConsoleError, LineReader, LineReaderFactory, ReadOutcome};
use crate::rpc::{Route, RpcChannel};
use crate::transport::TransportError;
use crate::vnc::StopSignal;
use crate::{AppError, ConfigLoader, Connector};

pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(crate) const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Hands out one prepared channel and counts the connections made.
pub(crate) struct StubConnector {
    channel: Arc<dyn RpcChannel>,
    connects: Cell<usize>,
}

impl StubConnector {
    pub(crate) fn new(channel: Arc<dyn RpcChannel>) -> Self {
        Self {
            channel,
            connects: Cell::new(0),
        }
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.get()
    }
}

impl Connector for StubConnector {
    fn connect(&self, _config: &Config) -> Result<Arc<dyn RpcChannel>, AppError> {
        self.connects.set(self.connects.get() + 1);
        Ok(Arc::clone(&self.channel))
    }
}

/// Records every call and answers with empty messages.
#[derive(Default)]
pub(crate) struct RecordingChannel {
    calls: Mutex<Vec<(Route, Value)>>,
}

impl RecordingChannel {
    pub(crate) fn calls(&self) -> Vec<(Route, Value)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, route: Route, request: Value) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((route, request));
        }
    }
}

impl RpcChannel for RecordingChannel {
    fn unary(&self, route: Route, request: Value) -> Result<Value, TransportError> {
        self.record(route, request);
        Ok(json!({}))
    }

    fn server_stream(&self, route: Route, request: Value) -> Result<Vec<Value>, TransportError> {
        self.record(route, request);
        Ok(Vec::new())
    }
}

/// Answers every call with the request it received.
pub(crate) struct EchoChannel;

impl RpcChannel for EchoChannel {
    fn unary(&self, _route: Route, request: Value) -> Result<Value, TransportError> {
        Ok(request)
    }

    fn server_stream(&self, _route: Route, request: Value) -> Result<Vec<Value>, TransportError> {
        Ok(vec![request])
    }
}

/// Fails every call as if the connection dropped.
pub(crate) struct FailingChannel;

impl RpcChannel for FailingChannel {
    fn unary(&self, _route: Route, _request: Value) -> Result<Value, TransportError> {
        Err(TransportError::Closed)
    }

    fn server_stream(&self, _route: Route, _request: Value) -> Result<Vec<Value>, TransportError> {
        Err(TransportError::Closed)
    }
}

/// Answers with a fixed reply or item list.
pub(crate) struct ScriptedChannel {
    reply: Value,
    items: Vec<Value>,
}

impl ScriptedChannel {
    pub(crate) fn unary(reply: Value) -> Self {
        Self {
            reply,
            items: Vec::new(),
        }
    }

    pub(crate) fn stream(items: Vec<Value>) -> Self {
        Self {
            reply: json!({}),
            items,
        }
    }
}

impl RpcChannel for ScriptedChannel {
    fn unary(&self, _route: Route, _request: Value) -> Result<Value, TransportError> {
        Ok(self.reply.clone())
    }

    fn server_stream(&self, _route: Route, _request: Value) -> Result<Vec<Value>, TransportError> {
        Ok(self.items.clone())
    }
}

/// A JSONL service on an ephemeral port.
///
/// Each element of `replies` answers one request line, in order. The
/// connection closes once the replies run out.
pub(crate) struct FakeService {
    port: u16,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl FakeService {
    pub(crate) fn spawn(replies: Vec<Vec<String>>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake service")?;
        listener
            .set_nonblocking(true)
            .context("fake service nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let requests: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            if let Err(error) = Self::serve_client(&listener, replies, &recorded) {
                tracing::debug!(%error, "fake service stopped");
            }
        });
        Ok(Self { port, requests })
    }

    pub(crate) fn target(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Requests received so far, as decoded JSON lines.
    pub(crate) fn requests(&self) -> Result<Vec<Value>> {
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }

    fn serve_client(
        listener: &TcpListener,
        replies: Vec<Vec<String>>,
        requests: &Mutex<Vec<Value>>,
    ) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let stream = loop {
            match listener.accept() {
                Ok((stream, _)) => break stream,
                Err(ref error)
                    if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
                {
                    thread::sleep(Duration::from_millis(10));
                }
                // No client arrived; the shell failed before dialling.
                Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(error) => return Err(error).context("accept connection"),
            }
        };
        stream
            .set_nonblocking(false)
            .context("fake service blocking stream")?;
        Self::answer(stream, replies, requests)
    }

    fn answer(
        mut stream: TcpStream,
        replies: Vec<Vec<String>>,
        requests: &Mutex<Vec<Value>>,
    ) -> Result<()> {
        let mut reader = BufReader::new(stream.try_clone().context("clone stream")?);
        for lines in replies {
            let mut request = String::new();
            if reader.read_line(&mut request).context("read request")? == 0 {
                return Ok(());
            }
            let decoded: Value = serde_json::from_str(&request).context("decode request")?;
            requests
                .lock()
                .map_err(|error| anyhow!("lock requests: {error}"))?
                .push(decoded);
            write_lines(&mut stream, &lines).context("write reply")?;
        }
        Ok(())
    }
}

pub(crate) fn write_lines(stream: &mut impl Write, lines: &[String]) -> io::Result<()> {
    for line in lines {
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\n")?;
    }
    stream.flush()
}

/// A unary `reply` line carrying `body`.
pub(crate) fn reply(body: &Value) -> Vec<String> {
    vec![json!({"kind": "reply", "body": body}).to_string()]
}

/// `item` lines for `bodies` followed by the stream `end`.
pub(crate) fn stream_of(bodies: &[Value]) -> Vec<String> {
    bodies
        .iter()
        .map(|body| json!({"kind": "item", "body": body}).to_string())
        .chain(std::iter::once(json!({"kind": "end"}).to_string()))
        .collect()
}

/// Console input played back from a script; exhausted scripts read as EOF.
pub(crate) struct ScriptedReader {
    script: VecDeque<ReadOutcome>,
    recalled: Vec<String>,
}

impl ScriptedReader {
    pub(crate) fn new(script: Vec<ReadOutcome>) -> Self {
        Self {
            script: script.into(),
            recalled: Vec::new(),
        }
    }

    pub(crate) fn lines(lines: &[&str]) -> Self {
        Self::new(
            lines
                .iter()
                .map(|line| ReadOutcome::Line((*line).to_owned()))
                .collect(),
        )
    }

    /// Lines handed to in-session recall, in order.
    pub(crate) fn recalled(&self) -> &[String] {
        &self.recalled
    }
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome, ConsoleError> {
        Ok(self.script.pop_front().unwrap_or(ReadOutcome::Eof))
    }

    fn add_history(&mut self, line: &str) {
        self.recalled.push(line.to_owned());
    }
}

/// Builds scripted readers and remembers how each session was seeded.
#[derive(Default)]
pub(crate) struct ScriptedReaderFactory {
    lines: Vec<String>,
    created: Cell<usize>,
    seeded_history: RefCell<Vec<String>>,
    completions: RefCell<Vec<String>>,
}

impl ScriptedReaderFactory {
    pub(crate) fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|line| (*line).to_owned()).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn created(&self) -> usize {
        self.created.get()
    }

    pub(crate) fn seeded_history(&self) -> Vec<String> {
        self.seeded_history.borrow().clone()
    }

    pub(crate) fn completions(&self) -> Vec<String> {
        self.completions.borrow().clone()
    }
}

impl LineReaderFactory for ScriptedReaderFactory {
    fn create(
        &self,
        history: &[String],
        completions: Vec<String>,
    ) -> Result<Box<dyn LineReader>, ConsoleError> {
        self.created.set(self.created.get() + 1);
        *self.seeded_history.borrow_mut() = history.to_vec();
        *self.completions.borrow_mut() = completions;
        let script = self
            .lines
            .iter()
            .cloned()
            .map(ReadOutcome::Line)
            .collect();
        Ok(Box::new(ScriptedReader::new(script)))
    }
}

/// Returns from the stop wait immediately.
#[derive(Default)]
pub(crate) struct ImmediateStop {
    waits: Cell<usize>,
}

impl ImmediateStop {
    pub(crate) fn waits(&self) -> usize {
        self.waits.get()
    }
}

impl StopSignal for ImmediateStop {
    fn wait(&self) -> io::Result<()> {
        self.waits.set(self.waits.get() + 1);
        Ok(())
    }
}
