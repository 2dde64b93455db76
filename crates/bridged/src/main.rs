use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match bridged::run_bridge() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Telemetry may not be installed yet, so report on stderr directly.
            writeln!(io::stderr().lock(), "bridged: {error}").ok();
            ExitCode::FAILURE
        }
    }
}
