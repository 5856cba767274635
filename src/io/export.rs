//! Export per-star results to CSV.
//!
//! Radius, mass and luminosity are written in solar units. Values that could
//! not be computed (e.g. a degenerate distance) are left blank.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::distance::DistanceEstimate;
use crate::domain::{Measured, Observable};
use crate::error::AppError;
use crate::photometry::AbsoluteMagnitudeRun;
use crate::scaling::SolarParameters;

/// Band magnitudes attached to a parameter export.
#[derive(Debug, Clone, Copy)]
pub struct BandColumn<'a> {
    pub band: &'a str,
    pub magnitudes: &'a [Measured],
}

pub fn write_parameters_csv(
    path: &Path,
    ids: &[String],
    params: &[SolarParameters],
    band: Option<BandColumn<'_>>,
) -> Result<(), AppError> {
    write_to(path, |out| write_parameters(out, ids, params, band))
}

pub fn write_distances_csv(
    path: &Path,
    ids: &[String],
    parallax_mas: &Observable,
    estimates: &[DistanceEstimate],
) -> Result<(), AppError> {
    write_to(path, |out| write_distances(out, ids, parallax_mas, estimates))
}

pub fn write_magnitudes_csv(path: &Path, ids: &[String], run: &AbsoluteMagnitudeRun) -> Result<(), AppError> {
    write_to(path, |out| write_magnitudes(out, ids, run))
}

fn write_to<F>(path: &Path, body: F) -> Result<(), AppError>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    body(&mut out)
        .and_then(|_| out.flush())
        .map_err(|e| AppError::io(format!("Failed to write export CSV '{}': {e}", path.display())))
}

fn write_parameters<W: Write>(
    out: &mut W,
    ids: &[String],
    params: &[SolarParameters],
    band: Option<BandColumn<'_>>,
) -> std::io::Result<()> {
    write!(
        out,
        "id,radius,radius_err,mass,mass_err,logg,logg_err,luminosity,luminosity_err,mbol,mbol_err"
    )?;
    if let Some(b) = band {
        write!(out, ",m_{0},m_{0}_err", b.band)?;
    }
    writeln!(out)?;

    for (i, (id, p)) in ids.iter().zip(params).enumerate() {
        write!(
            out,
            "{id},{},{},{},{},{}",
            measured(p.radius, 6),
            measured(p.mass, 6),
            measured(p.logg, 6),
            measured(p.luminosity, 6),
            measured(p.bolometric_magnitude, 6),
        )?;
        if let Some(m) = band.and_then(|b| b.magnitudes.get(i)) {
            write!(out, ",{}", measured(*m, 6))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_distances<W: Write>(
    out: &mut W,
    ids: &[String],
    parallax_mas: &Observable,
    estimates: &[DistanceEstimate],
) -> std::io::Result<()> {
    writeln!(out, "id,parallax_mas,parallax_err_mas,distance_pc,status")?;
    for (i, (id, est)) in ids.iter().zip(estimates).enumerate() {
        let (distance, status) = match est {
            DistanceEstimate::Mode(r) => (cell(*r, 4), "ok".to_string()),
            DistanceEstimate::Degenerate { real_roots } => {
                (String::new(), format!("degenerate ({} roots)", real_roots.len()))
            }
        };
        writeln!(
            out,
            "{id},{},{},{distance},{status}",
            cell(parallax_mas.value(i), 6),
            parallax_mas.error(i).map(|s| cell(s, 6)).unwrap_or_default(),
        )?;
    }
    Ok(())
}

fn write_magnitudes<W: Write>(out: &mut W, ids: &[String], run: &AbsoluteMagnitudeRun) -> std::io::Result<()> {
    writeln!(
        out,
        "id,band,distance_pc,distance_modulus,ebv,extinction,abs_mag,abs_mag_err"
    )?;
    for (i, id) in ids.iter().enumerate().take(run.magnitudes.len()) {
        writeln!(
            out,
            "{id},{},{},{},{},{},{}",
            run.band,
            cell(run.distance[i], 4),
            cell(run.distance_modulus[i], 6),
            cell(run.reddening[i], 6),
            cell(run.extinction[i], 6),
            measured(run.magnitudes[i], 6),
        )?;
    }
    Ok(())
}

fn cell(v: f64, decimals: usize) -> String {
    if v.is_finite() {
        format!("{v:.decimals$}")
    } else {
        String::new()
    }
}

fn measured(m: Measured, decimals: usize) -> String {
    format!("{},{}", cell(m.value, decimals), cell(m.sigma, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DistanceKind;
    use crate::photometry::ReddeningSource;

    #[test]
    fn distance_rows_mark_degenerate_stars() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let parallax = Observable::new(vec![10.0, 0.5]).with_error(0.1);
        let estimates = vec![
            DistanceEstimate::Mode(100.019),
            DistanceEstimate::Degenerate { real_roots: vec![1.0, 2.0] },
        ];

        let mut buf = Vec::new();
        write_distances(&mut buf, &ids, &parallax, &estimates).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "id,parallax_mas,parallax_err_mas,distance_pc,status");
        assert_eq!(lines[1], "a,10.000000,0.100000,100.0190,ok");
        assert_eq!(lines[2], "b,0.500000,0.100000,,degenerate (2 roots)");
    }

    #[test]
    fn parameter_rows_include_band_columns() {
        let ids = vec!["sun".to_string()];
        let one = Measured::new(1.0, 0.1);
        let params = vec![SolarParameters {
            radius: one,
            mass: one,
            logg: Measured::new(4.44, 0.01),
            luminosity: one,
            bolometric_magnitude: Measured::new(4.74, 0.2),
        }];
        let mags = [Measured::new(3.28, 0.05)];

        let mut buf = Vec::new();
        let band = BandColumn { band: "Ks", magnitudes: &mags };
        write_parameters(&mut buf, &ids, &params, Some(band)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].ends_with(",mbol,mbol_err,m_Ks,m_Ks_err"));
        assert!(lines[1].starts_with("sun,1.000000,0.100000,"));
        assert!(lines[1].ends_with(",3.280000,0.050000"));
    }

    #[test]
    fn magnitude_rows_blank_non_finite_values() {
        let run = AbsoluteMagnitudeRun {
            band: "Ks".to_string(),
            distance_kind: DistanceKind::Proper,
            reddening_source: ReddeningSource::Fallback,
            distance: vec![f64::NAN],
            distance_modulus: vec![f64::NAN],
            reddening: vec![0.0],
            extinction: vec![0.0],
            magnitudes: vec![Measured::new(f64::NAN, 0.05)],
        };

        let mut buf = Vec::new();
        write_magnitudes(&mut buf, &["x".to_string()], &run).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().nth(1), Some("x,Ks,,,0.000000,0.000000,,0.050000"));
    }
}
