//! JSON result files.
//!
//! A result file carries the tool name, a UTC generation timestamp, the
//! subcommand that produced it and one entry per star.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{DistanceKind, Measured};
use crate::error::AppError;
use crate::photometry::{AbsoluteMagnitudeRun, ReddeningSource};
use crate::scaling::SolarParameters;

#[derive(Debug, Clone, Serialize)]
pub struct ResultsFile<T> {
    pub tool: String,
    pub generated: DateTime<Utc>,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_kind: Option<DistanceKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reddening_source: Option<ReddeningSource>,
    pub stars: Vec<T>,
}

impl<T> ResultsFile<T> {
    pub fn new(command: &str, stars: Vec<T>) -> Self {
        Self {
            tool: "smag".to_string(),
            generated: Utc::now(),
            command: command.to_string(),
            band: None,
            distance_kind: None,
            reddening_source: None,
            stars,
        }
    }
}

/// One star of a `scale` run, radius/mass/luminosity in solar units.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterRow {
    pub id: String,
    #[serde(flatten)]
    pub parameters: SolarParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_magnitude: Option<Measured>,
}

/// One star of an `absmag` run.
#[derive(Debug, Clone, Serialize)]
pub struct MagnitudeRow {
    pub id: String,
    pub distance: Option<f64>,
    pub distance_modulus: Option<f64>,
    pub reddening: Option<f64>,
    pub extinction: Option<f64>,
    pub magnitude: Option<Measured>,
}

pub fn parameter_results(
    ids: &[String],
    params: &[SolarParameters],
    band: Option<(&str, &[Measured])>,
) -> ResultsFile<ParameterRow> {
    let stars = ids
        .iter()
        .zip(params)
        .enumerate()
        .map(|(i, (id, p))| ParameterRow {
            id: id.clone(),
            parameters: *p,
            band_magnitude: band.and_then(|(_, m)| m.get(i).copied()),
        })
        .collect();
    let mut file = ResultsFile::new("scale", stars);
    file.band = band.map(|(b, _)| b.to_string());
    file
}

/// Non-finite values (stars without a usable distance) become `null`.
pub fn magnitude_results(ids: &[String], run: &AbsoluteMagnitudeRun) -> ResultsFile<MagnitudeRow> {
    let finite = |v: f64| v.is_finite().then_some(v);
    let stars = ids
        .iter()
        .zip(&run.magnitudes)
        .enumerate()
        .map(|(i, (id, m))| MagnitudeRow {
            id: id.clone(),
            distance: finite(run.distance[i]),
            distance_modulus: finite(run.distance_modulus[i]),
            reddening: finite(run.reddening[i]),
            extinction: finite(run.extinction[i]),
            magnitude: m.value.is_finite().then_some(*m),
        })
        .collect();
    let mut file = ResultsFile::new("absmag", stars);
    file.band = Some(run.band.clone());
    file.distance_kind = Some(run.distance_kind);
    file.reddening_source = Some(run.reddening_source);
    file
}

pub fn write_results_json<T: Serialize>(path: &Path, results: &ResultsFile<T>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create results JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), results)
        .map_err(|e| AppError::io(format!("Failed to write results JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_results_use_null_for_missing_distances() {
        let run = AbsoluteMagnitudeRun {
            band: "H".to_string(),
            distance_kind: DistanceKind::Naive,
            reddening_source: ReddeningSource::Map,
            distance: vec![100.0, f64::NAN],
            distance_modulus: vec![5.0, f64::NAN],
            reddening: vec![0.01, f64::NAN],
            extinction: vec![0.00327, f64::NAN],
            magnitudes: vec![Measured::new(4.9, 0.06), Measured::new(f64::NAN, f64::NAN)],
        };
        let ids = vec!["a".to_string(), "b".to_string()];

        let json = serde_json::to_value(magnitude_results(&ids, &run)).unwrap();
        assert_eq!(json["tool"], "smag");
        assert_eq!(json["command"], "absmag");
        assert_eq!(json["band"], "H");
        assert_eq!(json["distance_kind"], "naive");
        assert_eq!(json["reddening_source"], "map");
        assert_eq!(json["stars"][0]["magnitude"]["value"], 4.9);
        assert_eq!(json["stars"][0]["reddening"], 0.01);
        assert!(json["stars"][1]["distance"].is_null());
        assert!(json["stars"][1]["reddening"].is_null());
        assert!(json["stars"][1]["magnitude"].is_null());
        assert!(json["generated"].is_string());
    }

    #[test]
    fn parameter_rows_flatten_parameters() {
        let m = Measured::new(1.0, 0.1);
        let params = [SolarParameters {
            radius: m,
            mass: m,
            logg: m,
            luminosity: m,
            bolometric_magnitude: m,
        }];
        let ids = vec!["sun".to_string()];

        let json = serde_json::to_value(parameter_results(&ids, &params, None)).unwrap();
        assert_eq!(json["stars"][0]["radius"]["sigma"], 0.1);
        assert!(json["stars"][0].get("band_magnitude").is_none());
        assert!(json.get("band").is_none());
    }
}
