use drs4rc_client::Validity;
use serde::Serialize;

use crate::cmd::{open_session, ConnectOptions};
use crate::exit::{client_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct AckOutput<'a> {
    operation: &'a str,
    valid: bool,
}

#[derive(Serialize)]
struct StatusOutput {
    running: bool,
}

pub fn start(connect: &ConnectOptions, format: OutputFormat) -> CliResult<i32> {
    let mut session = open_session(connect)?;
    let validity = session
        .start_acquisition()
        .map_err(|err| client_error("start failed", err))?;
    Ok(print_ack("start", validity, format))
}

pub fn stop(connect: &ConnectOptions, format: OutputFormat) -> CliResult<i32> {
    let mut session = open_session(connect)?;
    let validity = session
        .stop_acquisition()
        .map_err(|err| client_error("stop failed", err))?;
    Ok(print_ack("stop", validity, format))
}

pub fn status(connect: &ConnectOptions, format: OutputFormat) -> CliResult<i32> {
    let mut session = open_session(connect)?;
    let running = session
        .is_acquisition_running()
        .map_err(|err| client_error("status failed", err))?;

    let state = if running { "running" } else { "stopped" };
    print_record(
        &StatusOutput { running },
        &[("acquisition", state.to_string())],
        state,
        format,
    );
    Ok(SUCCESS)
}

/// Print an acknowledgement. A rejected request exits with [`FAILURE`].
pub fn print_ack(operation: &str, validity: Validity, format: OutputFormat) -> i32 {
    let valid = validity.is_valid();
    let verdict = if valid { "accepted" } else { "rejected" };
    print_record(
        &AckOutput { operation, valid },
        &[("operation", operation.to_string()), ("server", verdict.to_string())],
        verdict,
        format,
    );
    if valid {
        SUCCESS
    } else {
        FAILURE
    }
}
