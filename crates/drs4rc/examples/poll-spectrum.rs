//! Minimal acquisition loop: reset the AB spectrum, wait for 1000 counts,
//! fetch it and print a summary. Repeats three times.
//!
//! Run with a measurement server listening on port 4000:
//!   cargo run --example poll-spectrum -- 127.0.0.1:4000

use drs4rc::client::{connect, PollConfig, SpectrumKind};

const THRESHOLD: u64 = 1000;
const ROUNDS: usize = 3;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("127.0.0.1:{}", drs4rc::transport::DEFAULT_PORT));

    let mut session = connect(&addr)?;
    eprintln!("Connected to {}", session.peer_addr()?);

    let poll = PollConfig::default();
    for round in 1..=ROUNDS {
        session.reset_all_spectra()?;
        let counts = session.wait_for_counts(SpectrumKind::Ab, THRESHOLD, &poll)?;
        let spectrum = session.spectrum(SpectrumKind::Ab)?;

        println!(
            "round {round}: {counts} counts, {} channels x {} ps, peak at {:?}",
            spectrum.channel_count,
            spectrum.channel_width_ps,
            spectrum.peak_channel()
        );
    }

    session.close()?;
    Ok(())
}
