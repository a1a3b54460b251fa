use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use drs4rc_client::{poll_until, PollConfig, ResetTarget, SpectrumKind};
use tracing::{info, warn};

use crate::cmd::{open_session, parse_duration, ConnectOptions, WatchArgs};
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_spectrum, OutputFormat};

pub fn run(args: WatchArgs, connect: &ConnectOptions, format: OutputFormat) -> CliResult<i32> {
    let kind = SpectrumKind::from(args.spectrum);
    let poll = poll_config(&args)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut session = open_session(connect)?;
    let mut rounds = 0u32;

    while running.load(Ordering::SeqCst) && args.iterations.is_none_or(|n| rounds < n) {
        if !args.no_reset {
            let validity = session
                .reset(ResetTarget::Spectrum(kind))
                .map_err(|err| client_error(&format!("reset {kind} failed"), err))?;
            if !validity.is_valid() {
                warn!(spectrum = %kind, "server rejected the reset request");
            }
        }

        // `Some(None)` ends the wait early on Ctrl-C.
        let reached = poll_until(&poll, || {
            if !running.load(Ordering::SeqCst) {
                return Ok(Some(None));
            }
            let counts = session.counts(kind)?;
            Ok((counts >= args.threshold).then_some(Some(counts)))
        })
        .map_err(|err| client_error(&format!("waiting for {kind} counts failed"), err))?;

        let Some(counts) = reached else {
            break;
        };
        info!(spectrum = %kind, counts, round = rounds + 1, "threshold reached");

        let spectrum = session
            .spectrum(kind)
            .map_err(|err| client_error(&format!("data of {kind} failed"), err))?;
        print_spectrum(kind, &spectrum, format);
        rounds = rounds.saturating_add(1);
    }

    info!(rounds, "watch finished");
    session
        .close()
        .map_err(|err| client_error("close failed", err))?;
    Ok(SUCCESS)
}

fn poll_config(args: &WatchArgs) -> CliResult<PollConfig> {
    if !args.backoff.is_finite() || args.backoff < 1.0 {
        return Err(CliError::new(USAGE, "backoff must be a number >= 1.0"));
    }
    Ok(PollConfig {
        interval: parse_duration("poll-interval", &args.poll_interval)?,
        max_interval: parse_duration("max-interval", &args.max_interval)?,
        backoff: args.backoff,
        deadline: parse_duration("deadline", &args.deadline)?,
    })
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
