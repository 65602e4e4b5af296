//! Remote procedure call boundary for the kitsune service.
//!
//! Calls travel as newline-delimited JSON. Each call writes one request line
//! naming the service, the method and the request body, then reads tagged
//! response lines until a terminal message arrives:
//!
//! - `reply` carries the single response of a unary call;
//! - `item` carries one element of a server stream, closed by `end`;
//! - `status` reports that the service rejected the call.

mod client;

use std::io::{BufRead, BufReader, Write};
use std::sync::{Mutex, PoisonError};

use kitsh_config::Target;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(crate) use client::{CallError, KitsuneClient, MachineRegistry, MetadataRegistry};

use crate::transport::{Connection, TransportError, connect};

const EMPTY_LINE_LIMIT: usize = 10;

/// Identifies one remote operation on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Route {
    pub(crate) service: &'static str,
    pub(crate) method: &'static str,
}

impl Route {
    pub(crate) const fn new(service: &'static str, method: &'static str) -> Self {
        Self { service, method }
    }
}

/// A live handle able to invoke remote operations.
///
/// Requests and responses cross this boundary as generic JSON values so that
/// typed clients and the dynamic dispatcher share one transport.
pub(crate) trait RpcChannel: Send + Sync {
    /// Performs a call that yields exactly one response.
    fn unary(&self, route: Route, request: Value) -> Result<Value, TransportError>;

    /// Performs a call that yields a sequence of responses.
    fn server_stream(&self, route: Route, request: Value) -> Result<Vec<Value>, TransportError>;
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    service: &'a str,
    method: &'a str,
    request: &'a Value,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WireMessage {
    Reply {
        #[serde(default)]
        body: Value,
    },
    Item {
        #[serde(default)]
        body: Value,
    },
    End,
    Status {
        code: i32,
        #[serde(default)]
        message: String,
    },
}

impl WireMessage {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Reply { .. } => "reply",
            Self::Item { .. } => "item",
            Self::End => "end",
            Self::Status { .. } => "status",
        }
    }
}

/// JSONL channel over a TCP or TLS socket.
///
/// The connection opens on the first call and is reused until a call fails,
/// after which the next call dials again.
pub(crate) struct SocketChannel {
    target: Target,
    ssl: bool,
    connection: Mutex<Option<BufReader<Connection>>>,
}

impl SocketChannel {
    pub(crate) const fn new(target: Target, ssl: bool) -> Self {
        Self {
            target,
            ssl,
            connection: Mutex::new(None),
        }
    }

    fn with_connection<T>(
        &self,
        call: impl FnOnce(&mut BufReader<Connection>) -> Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        let mut guard = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            let connection = connect(&self.target, self.ssl)?;
            *guard = Some(BufReader::new(connection));
        }
        let connection = guard.as_mut().ok_or(TransportError::Closed)?;
        let result = call(connection);
        if let Err(error) = &result {
            tracing::debug!(target: "kitsh::rpc", %error, "dropping connection");
            *guard = None;
        }
        result
    }
}

impl RpcChannel for SocketChannel {
    fn unary(&self, route: Route, request: Value) -> Result<Value, TransportError> {
        self.with_connection(|connection| {
            send_request(connection, route, &request)?;
            match read_message(connection)? {
                WireMessage::Reply { body } => Ok(body),
                WireMessage::Status { code, message } => {
                    Err(TransportError::Status { code, message })
                }
                other => Err(TransportError::UnexpectedMessage {
                    kind: other.kind(),
                    call: "unary",
                }),
            }
        })
    }

    fn server_stream(&self, route: Route, request: Value) -> Result<Vec<Value>, TransportError> {
        self.with_connection(|connection| {
            send_request(connection, route, &request)?;
            let mut items = Vec::new();
            loop {
                match read_message(connection)? {
                    WireMessage::Item { body } => items.push(body),
                    WireMessage::End => return Ok(items),
                    WireMessage::Status { code, message } => {
                        return Err(TransportError::Status { code, message });
                    }
                    other => {
                        return Err(TransportError::UnexpectedMessage {
                            kind: other.kind(),
                            call: "streaming",
                        });
                    }
                }
            }
        })
    }
}

fn send_request<S: Write>(
    connection: &mut BufReader<S>,
    route: Route,
    request: &Value,
) -> Result<(), TransportError> {
    let wire = WireRequest {
        service: route.service,
        method: route.method,
        request,
    };
    let mut line = serde_json::to_vec(&wire).map_err(TransportError::SerialiseRequest)?;
    line.push(b'\n');
    tracing::debug!(
        target: "kitsh::rpc",
        service = route.service,
        method = route.method,
        "sending request"
    );
    let stream = connection.get_mut();
    stream
        .write_all(&line)
        .map_err(TransportError::SendRequest)?;
    stream.flush().map_err(TransportError::SendRequest)
}

fn read_message<R: BufRead>(reader: &mut R) -> Result<WireMessage, TransportError> {
    let mut line = String::new();
    let mut consecutive_empty_lines = 0;
    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .map_err(TransportError::ReadResponse)?;
        if read == 0 {
            return Err(TransportError::Closed);
        }
        if line.trim().is_empty() {
            consecutive_empty_lines += 1;
            if consecutive_empty_lines >= EMPTY_LINE_LIMIT {
                return Err(TransportError::Closed);
            }
            continue;
        }
        return serde_json::from_str(&line).map_err(TransportError::ParseMessage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use rstest::rstest;

    #[rstest]
    #[case(r#"{"kind":"reply","body":{"alive":true}}"#, "reply")]
    #[case(r#"{"kind":"item"}"#, "item")]
    #[case(r#"{"kind":"end"}"#, "end")]
    #[case(r#"{"kind":"status","code":5,"message":"not found"}"#, "status")]
    fn parses_tagged_messages(#[case] line: &str, #[case] kind: &str) {
        let mut reader = Cursor::new(format!("{line}\n"));
        let message = read_message(&mut reader).expect("message parses");
        assert_eq!(message.kind(), kind);
    }

    #[test]
    fn skips_blank_lines_before_a_message() {
        let mut reader = Cursor::new("\n\n{\"kind\":\"end\"}\n");
        let message = read_message(&mut reader).expect("message parses");
        assert!(matches!(message, WireMessage::End));
    }

    #[test]
    fn endless_blank_lines_close_the_call() {
        let mut reader = Cursor::new("\n".repeat(EMPTY_LINE_LIMIT + 1));
        let error = read_message(&mut reader).expect_err("blank stream fails");
        assert!(matches!(error, TransportError::Closed));
    }

    #[test]
    fn end_of_stream_is_closed() {
        let mut reader = Cursor::new("");
        let error = read_message(&mut reader).expect_err("empty stream fails");
        assert!(matches!(error, TransportError::Closed));
    }

    #[test]
    fn request_line_names_route() {
        let mut connection = BufReader::new(Cursor::new(Vec::new()));
        let route = Route::new("kitsune.proto.v1.ImageRegistryService", "GetImages");
        send_request(&mut connection, route, &serde_json::json!({})).expect("request sent");
        let written = String::from_utf8(connection.into_inner().into_inner()).expect("utf8");
        assert_eq!(
            written,
            "{\"service\":\"kitsune.proto.v1.ImageRegistryService\",\"method\":\"GetImages\",\"request\":{}}\n"
        );
    }
}
