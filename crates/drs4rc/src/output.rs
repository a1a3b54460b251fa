use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use drs4rc_client::{Spectrum, SpectrumKind};
use serde::Serialize;

const PLOT_WIDTH: usize = 64;
const PLOT_HEIGHT: usize = 12;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print a flat record: JSON object, two-column table, `key: value` lines,
/// or just `raw`.
pub fn print_record<T: Serialize>(
    record: &T,
    rows: &[(&str, String)],
    raw: &str,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(record),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (key, value) in rows {
                table.add_row(vec![key.to_string(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
            for (key, value) in rows {
                println!("  {:<width$}  {value}", format!("{key}:"), width = width + 1);
            }
        }
        OutputFormat::Raw => println!("{raw}"),
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

#[derive(Serialize)]
struct SpectrumOutput<'a> {
    spectrum: SpectrumKind,
    #[serde(flatten)]
    data: &'a Spectrum,
    peak_channel: Option<usize>,
    timestamp: String,
}

pub fn print_spectrum(kind: SpectrumKind, spectrum: &Spectrum, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SpectrumOutput {
            spectrum: kind,
            data: spectrum,
            peak_channel: spectrum.peak_channel(),
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            println!("{}", spectrum_summary(kind, spectrum));
            if spectrum.is_empty() {
                return;
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "TIME [ps]", "COUNTS"]);
            for (channel, (time, counts)) in spectrum
                .time_axis_ps()
                .zip(&spectrum.histogram)
                .enumerate()
                .filter(|(_, (_, counts))| **counts > 0)
            {
                table.add_row(vec![
                    channel.to_string(),
                    format!("{time:.1}"),
                    counts.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{}", spectrum_summary(kind, spectrum));
            for line in render_semilog(&spectrum.histogram, PLOT_WIDTH, PLOT_HEIGHT) {
                println!("{line}");
            }
        }
        OutputFormat::Raw => {
            for counts in &spectrum.histogram {
                println!("{counts}");
            }
        }
    }
}

fn spectrum_summary(kind: SpectrumKind, spectrum: &Spectrum) -> String {
    let peak = spectrum
        .peak_channel()
        .map(|channel| channel.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{kind} spectrum: {} channels x {} ps, {} counts, peak at channel {peak}",
        spectrum.channel_count, spectrum.channel_width_ps, spectrum.integral_counts
    )
}

/// Render `histogram` as a text plot with a logarithmic count axis.
///
/// Channels are grouped into at most `width` columns; each column shows the
/// largest count in its group. Empty columns stay blank.
pub fn render_semilog(histogram: &[u64], width: usize, height: usize) -> Vec<String> {
    if histogram.is_empty() || width == 0 || height == 0 {
        return vec!["(no data)".to_string()];
    }

    let group = histogram.len().div_ceil(width);
    let columns: Vec<u64> = histogram
        .chunks(group)
        .map(|chunk| chunk.iter().copied().max().unwrap_or(0))
        .collect();
    let max = columns.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return vec!["(all channels empty)".to_string()];
    }

    let top = ((max as f64) + 1.0).log10();
    let levels: Vec<usize> = columns
        .iter()
        .map(|&counts| {
            if counts == 0 {
                0
            } else {
                // At least one row for any non-empty column.
                let scaled = ((counts as f64) + 1.0).log10() / top * height as f64;
                (scaled.round() as usize).clamp(1, height)
            }
        })
        .collect();

    let label_width = max.to_string().len();
    let mut lines = Vec::with_capacity(height + 2);
    for row in (1..=height).rev() {
        let label = if row == height {
            max.to_string()
        } else if row == 1 {
            "1".to_string()
        } else {
            String::new()
        };
        let bars: String = levels
            .iter()
            .map(|&level| if level >= row { '#' } else { ' ' })
            .collect();
        lines.push(format!("{label:>label_width$} |{bars}"));
    }
    lines.push(format!(
        "{:>label_width$} +{}",
        "",
        "-".repeat(columns.len())
    ));
    lines.push(format!(
        "{:>label_width$}  0{:>pad$}",
        "",
        histogram.len() - 1,
        pad = columns.len().saturating_sub(1)
    ));
    lines
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
