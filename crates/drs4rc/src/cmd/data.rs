use drs4rc_client::SpectrumKind;

use crate::cmd::{open_session, ConnectOptions, SpectrumArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_spectrum, OutputFormat};

pub fn run(args: SpectrumArgs, connect: &ConnectOptions, format: OutputFormat) -> CliResult<i32> {
    let kind = SpectrumKind::from(args.spectrum);
    let mut session = open_session(connect)?;
    let spectrum = session
        .spectrum(kind)
        .map_err(|err| client_error(&format!("data of {kind} failed"), err))?;

    print_spectrum(kind, &spectrum, format);
    Ok(SUCCESS)
}
