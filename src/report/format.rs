//! Formatted terminal output.
//!
//! Formatting lives here so the numeric code stays free of presentation
//! concerns and output changes stay localized.

use crate::distance::DistanceEstimate;
use crate::domain::{DistanceKind, Measured, Observable};
use crate::io::{BandColumn, RowError};
use crate::photometry::{AbsoluteMagnitudeRun, ReddeningSource};
use crate::scaling::SolarParameters;

/// At most this many skipped rows are listed individually.
const MAX_ROW_ERRORS: usize = 10;

/// Header line shared by every subcommand.
pub fn format_input_summary(command: &str, stars: usize, rows_read: usize) -> String {
    format!("=== smag {command} ===\nStars: {stars} (rows read: {rows_read})\n")
}

pub fn format_row_errors(errors: &[RowError]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut out = format!("Skipped rows: {}\n", errors.len());
    for e in errors.iter().take(MAX_ROW_ERRORS) {
        out.push_str(&format!("  line {}: {}\n", e.line, e.message));
    }
    if errors.len() > MAX_ROW_ERRORS {
        out.push_str(&format!("  ... and {} more\n", errors.len() - MAX_ROW_ERRORS));
    }
    out
}

/// Radius, mass, log g, luminosity and Mbol per star (solar units).
pub fn format_parameters_table(ids: &[String], params: &[SolarParameters], band: Option<BandColumn<'_>>) -> String {
    let mut header = format!(
        "{:<16} {:>16} {:>16} {:>16} {:>18} {:>16}",
        "id", "R/Rsun", "M/Msun", "log g", "L/Lsun", "Mbol"
    );
    if let Some(b) = band {
        header.push_str(&format!(" {:>16}", format!("M_{}", b.band)));
    }
    let header = header.trim_end();
    let mut out = format!("{header}\n{}\n", "-".repeat(header.len()));

    for (i, (id, p)) in ids.iter().zip(params).enumerate() {
        let mut line = format!(
            "{:<16} {:>16} {:>16} {:>16} {:>18} {:>16}",
            truncate(id, 16),
            fmt_measured(p.radius, 3),
            fmt_measured(p.mass, 3),
            fmt_measured(p.logg, 3),
            fmt_measured(p.luminosity, 2),
            fmt_measured(p.bolometric_magnitude, 3),
        );
        if let Some(m) = band.and_then(|b| b.magnitudes.get(i)) {
            line.push_str(&format!(" {:>16}", fmt_measured(*m, 3)));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Reference line for the Sun in the band of `smag scale --band`.
pub fn format_solar_reference(band: &str, magnitude: Option<f64>) -> String {
    match magnitude {
        Some(m) => format!("Sun in {band}: {m:.2} mag\n"),
        None => format!("Sun in {band}: no tabulated magnitude\n"),
    }
}

pub fn format_distance_table(
    ids: &[String],
    parallax_mas: &Observable,
    estimates: &[DistanceEstimate],
    length_scale: f64,
) -> String {
    let mut out = format!("Prior length scale: {length_scale:.1} pc\n");
    out.push_str(&format!(
        "{:<16} {:>10} {:>10} {:>12} {:>12}\n",
        "id", "plx[mas]", "err[mas]", "1/plx[pc]", "mode[pc]"
    ));
    out.push_str(&format!(
        "{:-<16} {:-<10} {:-<10} {:-<12} {:-<12}\n",
        "", "", "", "", ""
    ));

    for (i, (id, est)) in ids.iter().zip(estimates).enumerate() {
        let w = parallax_mas.value(i);
        let naive = if w > 0.0 { format!("{:.1}", 1000.0 / w) } else { "-".to_string() };
        let mode = match est {
            DistanceEstimate::Mode(r) => format!("{r:.1}"),
            DistanceEstimate::Degenerate { .. } => "degenerate".to_string(),
        };
        let line = format!(
            "{:<16} {:>10.4} {:>10} {:>12} {:>12}",
            truncate(id, 16),
            w,
            parallax_mas.error(i).map(|s| format!("{s:.4}")).unwrap_or_else(|| "-".to_string()),
            naive,
            mode,
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }

    let degenerate = estimates.iter().filter(|e| e.is_degenerate()).count();
    if degenerate > 0 {
        out.push_str(&format!("\n{degenerate} star(s) without a unique posterior mode.\n"));
    }
    out
}

pub fn format_magnitude_table(ids: &[String], run: &AbsoluteMagnitudeRun) -> String {
    let mut out = String::new();
    out.push_str(&format!("Band: {}\n", run.band));
    out.push_str(&format!(
        "Distance: {}\n",
        match run.distance_kind {
            DistanceKind::Naive => "naive (1/parallax)",
            DistanceKind::Proper => "supplied",
        }
    ));
    out.push_str(&format!(
        "Reddening: {}\n\n",
        match run.reddening_source {
            ReddeningSource::Map => "dust map",
            ReddeningSource::Fallback => "none (dust map unavailable, assumed zero)",
        }
    ));

    out.push_str(&format!(
        "{:<16} {:>10} {:>8} {:>8} {:>8} {:>16}\n",
        "id", "r[pc]", "mu0", "E(B-V)", "A", "M"
    ));
    out.push_str(&format!(
        "{:-<16} {:-<10} {:-<8} {:-<8} {:-<8} {:-<16}\n",
        "", "", "", "", "", ""
    ));

    for (i, (id, m)) in ids.iter().zip(&run.magnitudes).enumerate() {
        let line = format!(
            "{:<16} {:>10} {:>8} {:>8} {:>8} {:>16}",
            truncate(id, 16),
            fmt_value(run.distance[i], 1),
            fmt_value(run.distance_modulus[i], 3),
            fmt_value(run.reddening[i], 3),
            fmt_value(run.extinction[i], 3),
            fmt_measured(*m, 3),
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn fmt_value(v: f64, decimals: usize) -> String {
    if v.is_finite() {
        format!("{v:.decimals$}")
    } else {
        "-".to_string()
    }
}

fn fmt_measured(m: Measured, decimals: usize) -> String {
    if !m.value.is_finite() {
        return "-".to_string();
    }
    format!("{:.decimals$} ± {:.decimals$}", m.value, m.sigma)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_marks_cut_ids() {
        assert_eq!(truncate("KIC12345678", 16), "KIC12345678");
        assert_eq!(truncate("2MASS J19000000+4000000", 8), "2MASS J.");
    }

    #[test]
    fn distance_table_flags_degenerate_stars() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let parallax = Observable::new(vec![10.0, -0.2]).with_error(0.1);
        let estimates = vec![
            DistanceEstimate::Mode(100.0),
            DistanceEstimate::Degenerate { real_roots: vec![] },
        ];
        let text = format_distance_table(&ids, &parallax, &estimates, 1350.0);

        assert!(text.starts_with("Prior length scale: 1350.0 pc"));
        let b_line = text.lines().find(|l| l.starts_with("b ")).unwrap();
        assert!(b_line.contains(" - "));
        assert!(b_line.ends_with("degenerate"));
        assert!(text.contains("1 star(s) without a unique posterior mode."));
    }

    #[test]
    fn magnitude_table_reports_fallback() {
        let run = AbsoluteMagnitudeRun {
            band: "Ks".to_string(),
            distance_kind: DistanceKind::Naive,
            reddening_source: ReddeningSource::Fallback,
            distance: vec![100.0],
            distance_modulus: vec![5.0],
            reddening: vec![0.0],
            extinction: vec![0.0],
            magnitudes: vec![Measured::new(5.0, 0.05)],
        };
        let text = format_magnitude_table(&["sun".to_string()], &run);
        assert!(text.contains("assumed zero"));
        assert!(text.contains("5.000 ± 0.050"));
    }

    #[test]
    fn solar_reference_line() {
        assert_eq!(format_solar_reference("Ks", Some(3.28)), "Sun in Ks: 3.28 mag\n");
        assert!(format_solar_reference("g", None).contains("no tabulated"));
    }

    #[test]
    fn row_errors_are_capped() {
        let errors: Vec<RowError> = (0..12)
            .map(|i| RowError {
                line: i + 2,
                message: "CSV parse error".to_string(),
            })
            .collect();
        let text = format_row_errors(&errors);
        assert!(text.starts_with("Skipped rows: 12"));
        assert!(text.contains("... and 2 more"));
        assert_eq!(format_row_errors(&[]), "");
    }
}
