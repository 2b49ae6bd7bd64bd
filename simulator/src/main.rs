mod bootstrap;
mod cli;
mod commands;
mod config;
mod context;
mod logging;
mod output;

use std::process::ExitCode;

use bootstrap::{Bootstrap, BootstrapError};
use logging::{LoggerHandle, new_logger};

fn main() -> ExitCode {
    // Flags are not parsed yet, so start at debug and rebuild once the
    // configured level is known.
    let logger = match new_logger("debug", "console") {
        Ok(logger) => LoggerHandle::new(logger),
        Err(e) => {
            output::error_stderr(&format!("can't initialize logger: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let code = match Bootstrap::new(logger.clone()) {
        Ok(bootstrap) => match bootstrap.execute(std::env::args_os()) {
            Ok(code) => code,
            Err(BootstrapError::Usage(e)) => {
                // --help lands here too, with exit code 0
                let _ = e.print();
                u8::try_from(e.exit_code()).unwrap_or(2)
            }
            Err(e) => {
                output::error_stderr(&e.to_string());
                1
            }
        },
        Err(e) => {
            output::error_stderr(&format!("can't determine working directory: {e}"));
            1
        }
    };

    logger.sync();
    ExitCode::from(code)
}
