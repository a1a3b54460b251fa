use drs4rc_client::ResetTarget;

use crate::cmd::acquire::print_ack;
use crate::cmd::{open_session, ConnectOptions, ResetArgs};
use crate::exit::{client_error, CliResult};
use crate::output::OutputFormat;

pub fn run(args: ResetArgs, connect: &ConnectOptions, format: OutputFormat) -> CliResult<i32> {
    let target = ResetTarget::from(args.target);
    let mut session = open_session(connect)?;
    let validity = session
        .reset(target)
        .map_err(|err| client_error(&format!("reset {target} failed"), err))?;

    Ok(print_ack(&format!("reset {target}"), validity, format))
}
