use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use drs4rc_client::{connect_with_config, ResetTarget, Session, SessionConfig, SpectrumKind};

use crate::exit::{client_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod acquire;
pub mod counts;
pub mod data;
pub mod reset;
pub mod settings;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the acquisition.
    Start,
    /// Stop the acquisition.
    Stop,
    /// Report whether the acquisition is running.
    Status,
    /// Reset one or all spectra.
    Reset(ResetArgs),
    /// Print the integral counts of a spectrum.
    Counts(SpectrumArgs),
    /// Fetch and print a full spectrum.
    Data(SpectrumArgs),
    /// Print the server's settings document.
    Settings,
    /// Print the server software version.
    ServerVersion,
    /// Reset a spectrum, wait for counts, then fetch and plot it, repeatedly.
    Watch(WatchArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, connect: &ConnectOptions, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Start => acquire::start(connect, format),
        Command::Stop => acquire::stop(connect, format),
        Command::Status => acquire::status(connect, format),
        Command::Reset(args) => reset::run(args, connect, format),
        Command::Counts(args) => counts::run(args, connect, format),
        Command::Data(args) => data::run(args, connect, format),
        Command::Settings => settings::settings(connect, format),
        Command::ServerVersion => settings::server_version(connect, format),
        Command::Watch(args) => watch::run(args, connect, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where and how to reach the measurement server.
#[derive(Args, Debug)]
pub struct ConnectOptions {
    /// Server address (host:port).
    #[arg(
        long,
        env = "DRS4RC_ADDR",
        default_value = "127.0.0.1:4000",
        global = true
    )]
    pub addr: String,
    /// Read/write timeout per exchange (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s", global = true)]
    pub timeout: String,
    /// TCP connect timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", global = true)]
    pub connect_timeout: String,
}

impl ConnectOptions {
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let timeout = parse_duration("timeout", &self.timeout)?;
        let mut config = SessionConfig {
            connect_timeout: parse_duration("connect-timeout", &self.connect_timeout)?,
            ..SessionConfig::default()
        };
        config.frame.read_timeout = Some(timeout);
        config.frame.write_timeout = Some(timeout);
        Ok(config)
    }
}

/// Connect to the server named by `options`.
pub fn open_session(options: &ConnectOptions) -> CliResult<Session> {
    let config = options.session_config()?;
    connect_with_config(&options.addr, &config)
        .map_err(|err| client_error(&format!("connect to {} failed", options.addr), err))
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum SpectrumArg {
    Ab,
    Ba,
    Merged,
    Prompt,
}

impl From<SpectrumArg> for SpectrumKind {
    fn from(arg: SpectrumArg) -> Self {
        match arg {
            SpectrumArg::Ab => SpectrumKind::Ab,
            SpectrumArg::Ba => SpectrumKind::Ba,
            SpectrumArg::Merged => SpectrumKind::Merged,
            SpectrumArg::Prompt => SpectrumKind::Prompt,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ResetArg {
    All,
    Ab,
    Ba,
    Merged,
    Prompt,
}

impl From<ResetArg> for ResetTarget {
    fn from(arg: ResetArg) -> Self {
        match arg {
            ResetArg::All => ResetTarget::All,
            ResetArg::Ab => ResetTarget::Spectrum(SpectrumKind::Ab),
            ResetArg::Ba => ResetTarget::Spectrum(SpectrumKind::Ba),
            ResetArg::Merged => ResetTarget::Spectrum(SpectrumKind::Merged),
            ResetArg::Prompt => ResetTarget::Spectrum(SpectrumKind::Prompt),
        }
    }
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Spectrum to reset.
    #[arg(value_enum, default_value = "all")]
    pub target: ResetArg,
}

#[derive(Args, Debug)]
pub struct SpectrumArgs {
    /// Spectrum to query.
    #[arg(value_enum)]
    pub spectrum: SpectrumArg,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Spectrum to watch.
    #[arg(value_enum)]
    pub spectrum: SpectrumArg,
    /// Integral counts to collect before each fetch.
    #[arg(long, default_value_t = 1000)]
    pub threshold: u64,
    /// Stop after N spectra. Default: run until Ctrl-C.
    #[arg(long)]
    pub iterations: Option<u32>,
    /// Initial delay between count polls (e.g. 100ms).
    #[arg(long, default_value = "100ms")]
    pub poll_interval: String,
    /// Longest delay between count polls.
    #[arg(long, default_value = "2s")]
    pub max_interval: String,
    /// Growth factor for the poll delay after each miss.
    #[arg(long, default_value_t = 1.5)]
    pub backoff: f64,
    /// Give up if the threshold is not reached within this time.
    #[arg(long, default_value = "300s")]
    pub deadline: String,
    /// Keep accumulating instead of resetting the spectrum before each round.
    #[arg(long)]
    pub no_reset: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `5s` or a bare number of seconds.
pub fn parse_duration(name: &str, input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, format!("{name} must not be empty")));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid {name} value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, format!("{name} must be greater than zero")));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}
