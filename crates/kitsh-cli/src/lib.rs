//! Runtime of the kitsune operator shell.
//!
//! The module owns argument parsing, configuration bootstrapping and the
//! command pipeline shared by one-shot invocations and the interactive
//! console. Configuration loading, the service connection, console input and
//! the viewer stop signal are all reached through traits so tests can
//! substitute them.

use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::iter;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::error::ErrorKind;
use kitsh_config::Config;

mod cli;
mod config;
mod console;
mod dispatch;
mod errors;
mod handlers;
mod output;
mod registry;
mod rpc;
mod telemetry;
mod transport;
mod vnc;

use cli::{Cli, CliCommand, completion_candidates};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use config::{ConfigArgumentSplit, split_config_arguments};
use console::{
    ConsoleSession, ExecutionContext, HistoryStore, LineReaderFactory, Pipeline,
    TerminalReaderFactory, load_history, report_error,
};
use dispatch::{InvocationResult, RawCommand};
pub(crate) use errors::AppError;
use handlers::HandlerContext;
use output::{ResolvedOutputFormat, write_json_pretty};
use registry::{RegistryCatalog, standard_method_names};
use rpc::{KitsuneClient, RpcChannel, SocketChannel};
use vnc::{EnterKey, StopSignal};

/// Bundles the IO streams provided to the shell runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
    stdout_is_terminal: bool,
    stderr_is_terminal: bool,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal: io::stdout().is_terminal(),
            stderr_is_terminal: io::stderr().is_terminal(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_terminal_status(
        stdout: &'a mut W,
        stderr: &'a mut E,
        is_terminal: bool,
    ) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal: is_terminal,
            stderr_is_terminal: is_terminal,
        }
    }

    pub(crate) const fn stdout_is_terminal(&self) -> bool {
        self.stdout_is_terminal
    }

    pub(crate) const fn stderr_is_terminal(&self) -> bool {
        self.stderr_is_terminal
    }
}

/// Opens the channel to the configured service.
pub(crate) trait Connector {
    fn connect(&self, config: &Config) -> Result<Arc<dyn RpcChannel>, AppError>;
}

/// Connects over TCP, or TLS when `--ssl` is set.
struct SocketConnector;

impl Connector for SocketConnector {
    fn connect(&self, config: &Config) -> Result<Arc<dyn RpcChannel>, AppError> {
        let target = config.target()?;
        tracing::debug!(
            target: "kitsh::rpc",
            target_authority = %target.authority(),
            ssl = config.ssl,
            "connecting"
        );
        Ok(Arc::new(SocketChannel::new(target, config.ssl)))
    }
}

/// Process-level collaborators of the shell.
#[derive(Clone, Copy)]
pub(crate) struct Services<'a> {
    pub(crate) connector: &'a dyn Connector,
    pub(crate) line_readers: &'a dyn LineReaderFactory,
    pub(crate) stop: &'a dyn StopSignal,
}

impl Services<'static> {
    fn system() -> Self {
        Self {
            connector: &SocketConnector,
            line_readers: &TerminalReaderFactory,
            stop: &EnterKey,
        }
    }
}

/// Runs the shell using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr);
    run_with_loader(args, &mut io, &OrthoConfigLoader, Services::system())
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    io: &mut IoStreams<'_, W, E>,
    loader: &L,
    services: Services<'_>,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    } = split_config_arguments(&args);

    let result = loader.load(&config_arguments).and_then(|config| {
        telemetry::initialise(&config)?;
        let tokens = command_arguments
            .into_iter()
            .map(|argument| {
                argument.into_string().map_err(|raw| {
                    AppError::InvalidArgument(raw.to_string_lossy().into_owned())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Shell::new(&config, services).execute(&tokens, ExecutionContext::default(), io)
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::debug!(target: "kitsh", %error, "command failed");
            report_error(&error, io);
            ExitCode::from(error.exit_status())
        }
    }
}

/// A live connection and the registries bound to it.
struct Remote {
    client: KitsuneClient,
    catalog: RegistryCatalog,
}

/// Connects on first use and reuses the connection for later commands.
fn connect_remote<'r>(
    slot: &'r mut Option<Remote>,
    connector: &dyn Connector,
    config: &Config,
) -> Result<&'r Remote, AppError> {
    let remote = match slot.take() {
        Some(remote) => remote,
        None => {
            let channel = connector.connect(config)?;
            Remote {
                client: KitsuneClient::new(Arc::clone(&channel)),
                catalog: RegistryCatalog::connect(channel),
            }
        }
    };
    Ok(slot.insert(remote))
}

/// The command pipeline: parses one tokenized command and runs it.
struct Shell<'a> {
    config: &'a Config,
    services: Services<'a>,
    remote: Option<Remote>,
}

impl<'a> Shell<'a> {
    const fn new(config: &'a Config, services: Services<'a>) -> Self {
        Self {
            config,
            services,
            remote: None,
        }
    }

    fn console<W: Write, E: Write>(
        &mut self,
        context: ExecutionContext,
        io: &mut IoStreams<'_, W, E>,
    ) -> Result<(), AppError> {
        let nested = context.enter_console()?;
        let store = HistoryStore::new(self.config.history_path());
        let entries = load_history(&store, io);
        let methods = self.remote.as_ref().map_or_else(standard_method_names, |remote| {
            remote.catalog.method_names()
        });
        let mut reader = self
            .services
            .line_readers
            .create(&entries, completion_candidates(methods))?;
        tracing::debug!(
            target: "kitsh::console",
            history = entries.len(),
            "console started"
        );
        let mut session = ConsoleSession::new(reader.as_mut(), &store, entries);
        let outcome = session.run(self, nested, io);
        tracing::debug!(target: "kitsh::console", state = ?session.state(), "console ended");
        outcome
    }

    fn handler_context(
        &mut self,
        format: ResolvedOutputFormat,
    ) -> Result<HandlerContext<'_>, AppError> {
        let remote = connect_remote(&mut self.remote, self.services.connector, self.config)?;
        Ok(HandlerContext {
            client: &remote.client,
            config: self.config,
            format,
            stop: self.services.stop,
        })
    }

    fn dynamic<W: Write, E: Write>(
        &mut self,
        tokens: &[String],
        io: &mut IoStreams<'_, W, E>,
    ) -> Result<(), AppError> {
        let command = RawCommand::from_tokens(tokens)?;
        let remote = connect_remote(&mut self.remote, self.services.connector, self.config)?;
        match dispatch::dispatch(&remote.catalog, &command)? {
            InvocationResult::Success(value) => write_json_pretty(io, &value),
            InvocationResult::Remote(error) => Err(AppError::Remote(error)),
        }
    }
}

impl<W: Write, E: Write> Pipeline<W, E> for Shell<'_> {
    fn execute(
        &mut self,
        args: &[String],
        context: ExecutionContext,
        io: &mut IoStreams<'_, W, E>,
    ) -> Result<(), AppError> {
        let argv = iter::once("kitsh").chain(args.iter().map(String::as_str));
        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(error)
                if matches!(
                    error.kind(),
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
                ) =>
            {
                return write!(io.stdout, "{}", error.render()).map_err(AppError::Output);
            }
            Err(error) => return Err(AppError::CliUsage(error)),
        };
        let format = cli.output.resolve(io.stdout_is_terminal());

        match cli.command {
            CliCommand::Console => self.console(context, io),
            CliCommand::Dynamic(tokens) => self.dynamic(&tokens, io),
            CliCommand::Image { action } => {
                handlers::image::run(action, &self.handler_context(format)?, io)
            }
            CliCommand::Vm { action } => handlers::vm::run(action, &self.handler_context(format)?, io),
        }
    }
}

#[cfg(test)]
mod tests;
