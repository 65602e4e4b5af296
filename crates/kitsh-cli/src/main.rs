//! Binary entrypoint for the `kitsh` operator shell.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut stdout = stdout.lock();
    let mut stderr = stderr.lock();
    let exit_code = kitsh_cli::run(std::env::args_os(), &mut stdout, &mut stderr);
    if stdout.flush().is_err() {
        return ExitCode::FAILURE;
    }
    exit_code
}
