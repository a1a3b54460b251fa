use serde::Serialize;

use crate::cmd::{open_session, ConnectOptions};
use crate::exit::{client_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, print_record, OutputFormat};

#[derive(Serialize)]
struct SettingsOutput<'a> {
    settings: &'a str,
}

#[derive(Serialize)]
struct VersionOutput {
    major: u32,
    minor: u32,
    version: String,
}

pub fn settings(connect: &ConnectOptions, format: OutputFormat) -> CliResult<i32> {
    let mut session = open_session(connect)?;
    let Some(document) = session
        .settings()
        .map_err(|err| client_error("settings failed", err))?
    else {
        eprintln!("server rejected the settings request");
        return Ok(FAILURE);
    };

    // The document is XML; every human-readable format prints it verbatim.
    match format {
        OutputFormat::Json => print_json(&SettingsOutput {
            settings: &document,
        }),
        _ => println!("{document}"),
    }
    Ok(SUCCESS)
}

pub fn server_version(connect: &ConnectOptions, format: OutputFormat) -> CliResult<i32> {
    let mut session = open_session(connect)?;
    let Some(version) = session
        .server_version()
        .map_err(|err| client_error("server version failed", err))?
    else {
        eprintln!("server rejected the version request");
        return Ok(FAILURE);
    };

    print_record(
        &VersionOutput {
            major: version.major,
            minor: version.minor,
            version: version.to_string(),
        },
        &[("server version", version.to_string())],
        &version.to_string(),
        format,
    );
    Ok(SUCCESS)
}
