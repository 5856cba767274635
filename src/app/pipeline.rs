//! Shared run logic behind the `smag` subcommands.
//!
//! Each subcommand is star table -> numeric core -> output struct; printing
//! and exports stay in `app`. The `*_table` functions take an already parsed
//! table so they can be tested without touching the filesystem.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::constants::ConstantTable;
use crate::data::ExtinctionMap;
use crate::distance::{DistanceEstimate, mode_distances_mas};
use crate::domain::{DistanceMode, Frame, Measured, Observable};
use crate::error::AppError;
use crate::io::{StarTable, load_star_table};
use crate::photometry::{AbsoluteMagnitudePipeline, AbsoluteMagnitudeRun};
use crate::scaling::{
    Corrections, FixedCorrection, MassSource, RadiusSource, ScalingRelations, SolarParameters,
    seismic_absolute_magnitudes,
};

/// Resolved settings for one `smag` invocation.
#[derive(Debug, Clone)]
pub enum RunConfig {
    Scale(ScaleConfig),
    Distance(DistanceConfig),
    Absmag(AbsmagConfig),
}

#[derive(Debug, Clone)]
pub struct ScaleConfig {
    pub input: PathBuf,
    /// Band and bolometric correction for band magnitudes.
    pub band: Option<(String, FixedCorrection)>,
    pub export: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DistanceConfig {
    pub input: PathBuf,
    /// Prior length scale (pc), used when the table has no `length_scale` column.
    pub length_scale: f64,
    pub export: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AbsmagConfig {
    pub input: PathBuf,
    pub band: Option<String>,
    pub frame: Option<Frame>,
    pub distance: DistanceMode,
    pub length_scale: f64,
    pub extinction: bool,
    pub export: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ScaleOutput {
    pub table: StarTable,
    pub parameters: Vec<SolarParameters>,
    pub band_magnitudes: Option<(String, Vec<Measured>)>,
    /// Tabulated solar magnitude in the requested band, when known.
    pub solar_band_magnitude: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct DistanceOutput {
    pub table: StarTable,
    pub parallax: Observable,
    pub estimates: Vec<DistanceEstimate>,
}

#[derive(Debug, Clone)]
pub struct AbsmagOutput {
    pub table: StarTable,
    pub run: AbsoluteMagnitudeRun,
}

pub fn run_scale(config: &ScaleConfig, constants: &ConstantTable) -> Result<ScaleOutput, AppError> {
    let table = load_star_table(&config.input)?;
    scale_table(table, config.band.as_ref(), constants)
}

pub fn run_distance(config: &DistanceConfig) -> Result<DistanceOutput, AppError> {
    let table = load_star_table(&config.input)?;
    distance_table(table, config.length_scale)
}

pub fn run_absmag(
    config: &AbsmagConfig,
    constants: &ConstantTable,
    map: &dyn ExtinctionMap,
) -> Result<AbsmagOutput, AppError> {
    let table = load_star_table(&config.input)?;
    let run = absmag_table(&table, config, constants, map)?;
    Ok(AbsmagOutput { table, run })
}

/// Scaling relations for every star of `table`.
///
/// `radius` and `mass` columns (solar units) override the scaling values;
/// `dnu_corr` is the per-star dnu correction factor.
pub fn scale_table(
    table: StarTable,
    band: Option<&(String, FixedCorrection)>,
    constants: &ConstantTable,
) -> Result<ScaleOutput, AppError> {
    let numax = table.observable("numax", "numax_err")?;
    let dnu = table.observable("dnu", "dnu_err")?;
    let teff = table.observable("teff", "teff_err")?;

    let radius = match table.optional_observable("radius", "radius_err")? {
        Some(r) => RadiusSource::Override(scale_observable(&r, constants.solar_radius)),
        None => RadiusSource::Scaling,
    };
    let mass = match table.optional_observable("mass", "mass_err")? {
        Some(m) => MassSource::Override(scale_observable(&m, constants.solar_mass)),
        None => MassSource::Scaling,
    };
    let corrections = Corrections {
        dnu_factor: table.optional_observable("dnu_corr", "dnu_corr_err")?,
        radius,
        mass,
    };

    let relations = ScalingRelations::new(constants, numax, dnu, teff)?.with_corrections(corrections)?;
    let parameters = relations
        .evaluate()
        .iter()
        .map(|p| p.in_solar_units(constants))
        .collect();

    let (band_magnitudes, solar_band_magnitude) = match band {
        Some((band, bc)) => {
            let feh = table
                .optional_observable("feh", "feh_err")?
                .unwrap_or_else(|| Observable::scalar(0.0));
            let mags = seismic_absolute_magnitudes(&relations, &feh, band, bc)?;
            let solar = match constants.solar_magnitude(band) {
                Ok(m) => Some(m),
                Err(e) => {
                    debug!(error = %e, "no solar reference magnitude");
                    None
                }
            };
            (Some((band.clone(), mags)), solar)
        }
        None => (None, None),
    };

    info!(stars = relations.len(), "evaluated scaling relations");

    Ok(ScaleOutput {
        table,
        parameters,
        band_magnitudes,
        solar_band_magnitude,
    })
}

/// Posterior-mode distances from the `parallax`/`parallax_err` columns (mas).
///
/// A `length_scale` column, when present, gives a per-star prior length.
pub fn distance_table(table: StarTable, length_scale: f64) -> Result<DistanceOutput, AppError> {
    let parallax = table.observable("parallax", "parallax_err")?;
    let length = match table.optional_column("length_scale")? {
        Some(cells) if cells.iter().all(Option::is_some) => {
            Observable::new(cells.into_iter().flatten().collect())
        }
        _ => Observable::scalar(length_scale),
    };

    let estimates = mode_distances_mas(&parallax, &length)?;
    log_degenerate(&estimates);

    Ok(DistanceOutput {
        table,
        parallax,
        estimates,
    })
}

/// Absolute magnitudes for every star of `table` in `config.band`.
pub fn absmag_table(
    table: &StarTable,
    config: &AbsmagConfig,
    constants: &ConstantTable,
    map: &dyn ExtinctionMap,
) -> Result<AbsoluteMagnitudeRun, AppError> {
    let mut pipeline = AbsoluteMagnitudePipeline::new();

    let (lon_names, lat_names) = match config.frame {
        Some(Frame::Galactic) => (&["l", "glon"][..], &["b", "glat"][..]),
        _ => (&["ra"][..], &["dec"][..]),
    };
    if let (Some(lon), Some(lat)) = (table.first_present(lon_names), table.first_present(lat_names)) {
        pipeline = pipeline.position(table.required_column(lon)?, table.required_column(lat)?);
    }
    if let Some(frame) = config.frame {
        pipeline = pipeline.frame(frame);
    }
    if let Some(band) = &config.band {
        pipeline = pipeline.band(band.clone());
    }
    if let Some(mag) = table.optional_observable("mag", "mag_err")? {
        pipeline = pipeline.magnitude(mag);
    }

    match config.distance {
        DistanceMode::Posterior => {
            if let Some(parallax) = table.optional_observable("parallax", "parallax_err")? {
                let estimates = mode_distances_mas(&parallax, &Observable::scalar(config.length_scale))?;
                log_degenerate(&estimates);
                let distances = estimates
                    .iter()
                    .map(|e| e.distance().unwrap_or(f64::NAN))
                    .collect();
                pipeline = pipeline.distance(Observable::new(distances));
            }
        }
        DistanceMode::Naive => {
            if let Some(parallax) = table.optional_observable("parallax", "parallax_err")? {
                pipeline = pipeline.parallax(parallax);
            }
        }
        DistanceMode::Column => {
            if let Some(distance) = table.optional_observable("distance", "distance_err")? {
                pipeline = pipeline.distance(distance);
            }
        }
    }

    pipeline.configure()?.compute(constants, map)
}

fn scale_observable(obs: &Observable, unit: f64) -> Observable {
    obs.map(|v| v * unit, |_, s| s * unit)
}

fn log_degenerate(estimates: &[DistanceEstimate]) {
    let degenerate = estimates.iter().filter(|e| e.is_degenerate()).count();
    if degenerate > 0 {
        warn!(degenerate, "stars without a unique posterior mode; their distance is left empty");
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::data::ZeroReddening;
    use crate::error::ErrorKind;
    use crate::io::read_star_table;

    fn absmag_config(distance: DistanceMode) -> AbsmagConfig {
        AbsmagConfig {
            input: PathBuf::from("unused.csv"),
            band: None,
            frame: None,
            distance,
            length_scale: 1000.0,
            extinction: false,
            export: None,
            export_json: None,
        }
    }

    #[test]
    fn scale_reports_solar_units_and_band_magnitudes() {
        let csv = "id,numax,dnu,teff\nsun,3090,135.1,5778\n";
        let table = read_star_table(csv.as_bytes()).unwrap();
        let constants = ConstantTable::default();
        let band = ("Ks".to_string(), FixedCorrection { value: 1.46, sigma: 0.0 });

        let out = scale_table(table, Some(&band), &constants).unwrap();
        let p = out.parameters[0];
        assert_relative_eq!(p.radius.value, 1.0, max_relative = 1e-12);
        assert_relative_eq!(p.mass.value, 1.0, max_relative = 1e-12);

        assert_eq!(out.solar_band_magnitude, Some(3.28));
        let (name, mags) = out.band_magnitudes.unwrap();
        assert_eq!(name, "Ks");
        assert_relative_eq!(mags[0].value, constants.solar_mbol - 1.46, epsilon = 1e-12);
    }

    #[test]
    fn scale_radius_column_overrides_luminosity_radius() {
        let csv = "numax,dnu,teff,radius\n3090,135.1,5778,2.0\n";
        let table = read_star_table(csv.as_bytes()).unwrap();
        let out = scale_table(table, None, &ConstantTable::default()).unwrap();

        let p = out.parameters[0];
        assert_relative_eq!(p.radius.value, 1.0, max_relative = 1e-12);
        assert_relative_eq!(p.luminosity.value, 4.0, max_relative = 1e-12);
    }

    #[test]
    fn distance_uses_per_star_length_scale_column() {
        let csv = "id,parallax,parallax_err,length_scale\na,10,0.1,1000\nb,10,0.1,1000\n";
        let table = read_star_table(csv.as_bytes()).unwrap();
        let out = distance_table(table, 5000.0).unwrap();
        assert_eq!(out.estimates.len(), 2);
        assert_relative_eq!(
            out.estimates[0].distance().unwrap(),
            100.019_007_033,
            max_relative = 1e-8
        );
    }

    #[test]
    fn absmag_from_distance_column() {
        let csv = "id,ra,dec,mag,mag_err,distance\nx,10,20,10.0,0.02,100\n";
        let table = read_star_table(csv.as_bytes()).unwrap();
        let run = absmag_table(
            &table,
            &absmag_config(DistanceMode::Column),
            &ConstantTable::default(),
            &ZeroReddening,
        )
        .unwrap();

        assert_eq!(run.band, "Ks");
        assert_relative_eq!(run.magnitudes[0].value, 5.0, epsilon = 1e-12);
        assert_relative_eq!(
            run.magnitudes[0].sigma,
            (0.02f64.powi(2) + 0.05f64.powi(2)).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn absmag_posterior_distance_is_proper() {
        let csv = "ra,dec,mag,parallax,parallax_err\n10,20,10.0,10,0.1\n";
        let table = read_star_table(csv.as_bytes()).unwrap();
        let run = absmag_table(
            &table,
            &absmag_config(DistanceMode::Posterior),
            &ConstantTable::default(),
            &ZeroReddening,
        )
        .unwrap();

        assert_eq!(run.distance_kind, crate::domain::DistanceKind::Proper);
        assert_relative_eq!(run.distance[0], 100.019_007_033, max_relative = 1e-8);
    }

    #[test]
    fn absmag_galactic_columns() {
        let csv = "l,b,mag,parallax\n30,5,10.0,10\n";
        let table = read_star_table(csv.as_bytes()).unwrap();
        let mut config = absmag_config(DistanceMode::Naive);
        config.frame = Some(Frame::Galactic);

        let run = absmag_table(&table, &config, &ConstantTable::default(), &ZeroReddening).unwrap();
        assert_eq!(run.distance_kind, crate::domain::DistanceKind::Naive);
        assert_relative_eq!(run.distance[0], 100.0, epsilon = 1e-12);
    }

    #[test]
    fn absmag_without_positions_is_a_configuration_error() {
        let csv = "mag,distance\n10,100\n";
        let table = read_star_table(csv.as_bytes()).unwrap();
        let err = absmag_table(
            &table,
            &absmag_config(DistanceMode::Column),
            &ConstantTable::default(),
            &ZeroReddening,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn absmag_rejects_unknown_band() {
        let csv = "ra,dec,mag,distance\n1,2,10,100\n";
        let table = read_star_table(csv.as_bytes()).unwrap();
        let mut config = absmag_config(DistanceMode::Column);
        config.band = Some("Kepler".to_string());

        let err = absmag_table(&table, &config, &ConstantTable::default(), &ZeroReddening).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedBand);
    }

    /// Fails the whole request on a distance that is not finite and positive.
    struct StrictMap;

    impl ExtinctionMap for StrictMap {
        fn reddening(&self, query: &crate::data::ReddeningQuery<'_>) -> Result<Vec<f64>, AppError> {
            if query.distances.iter().any(|d| !d.is_finite() || *d <= 0.0) {
                return Err(AppError::service("bad distance"));
            }
            Ok(vec![0.5; query.distances.len()])
        }
    }

    #[test]
    fn absmag_negative_parallax_keeps_other_stars_reddened() {
        let csv = "id,ra,dec,mag,parallax\na,10,20,10.0,10\nb,11,21,10.0,-0.1\n";
        let table = read_star_table(csv.as_bytes()).unwrap();
        let run = absmag_table(
            &table,
            &absmag_config(DistanceMode::Naive),
            &ConstantTable::default(),
            &StrictMap,
        )
        .unwrap();

        assert_eq!(run.reddening_source, crate::photometry::ReddeningSource::Map);
        assert_eq!(run.reddening[0], 0.5);
        assert!(run.reddening[1].is_nan());
        assert!(run.magnitudes[1].value.is_nan());
    }
}
