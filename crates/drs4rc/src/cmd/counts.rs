use drs4rc_client::SpectrumKind;
use serde::Serialize;

use crate::cmd::{open_session, ConnectOptions, SpectrumArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct CountsOutput {
    spectrum: SpectrumKind,
    counts: u64,
}

pub fn run(args: SpectrumArgs, connect: &ConnectOptions, format: OutputFormat) -> CliResult<i32> {
    let kind = SpectrumKind::from(args.spectrum);
    let mut session = open_session(connect)?;
    let counts = session
        .counts(kind)
        .map_err(|err| client_error(&format!("counts of {kind} failed"), err))?;

    print_record(
        &CountsOutput {
            spectrum: kind,
            counts,
        },
        &[("spectrum", kind.to_string()), ("counts", counts.to_string())],
        &counts.to_string(),
        format,
    );
    Ok(SUCCESS)
}
