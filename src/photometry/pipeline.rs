//! Absolute magnitudes from apparent magnitudes, distances and dust.
//!
//! Usage is builder -> validated config -> run:
//!
//! ```text
//! let config = AbsoluteMagnitudePipeline::new()
//!     .parallax(parallax_mas)
//!     .position(ra, dec)
//!     .magnitude(ks)
//!     .configure()?;
//! let run = config.compute(&ConstantTable::default(), &BayestarClient::from_env())?;
//! ```
//!
//! Setters can be called in any order. A directly supplied distance always
//! wins over one derived from a parallax.

use std::f64::consts::LN_10;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constants::ConstantTable;
use crate::data::{ExtinctionMap, ReddeningQuery};
use crate::domain::{DEFAULT_BAND, DistanceKind, Frame, Measured, Observable, SkyPositions, batch_len};
use crate::error::AppError;

/// Parallaxes outside this range (mas) are almost certainly in the wrong unit.
const PARALLAX_SANITY_MAS: (f64, f64) = (0.01, 5.0);

/// Accumulates pipeline inputs for one batch of stars.
#[derive(Debug, Clone, Default)]
pub struct AbsoluteMagnitudePipeline {
    parallax: Option<Observable>,
    distance: Option<Observable>,
    longitude: Option<Vec<f64>>,
    latitude: Option<Vec<f64>>,
    frame: Option<Frame>,
    magnitude: Option<Observable>,
    band: Option<String>,
}

impl AbsoluteMagnitudePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parallax in milliarcseconds. Used for a naive `1000 / parallax`
    /// distance unless a distance is also given.
    pub fn parallax(mut self, parallax_mas: Observable) -> Self {
        let (lo, hi) = PARALLAX_SANITY_MAS;
        let outside = parallax_mas
            .values()
            .iter()
            .filter(|w| !(lo..=hi).contains(*w))
            .count();
        if outside > 0 {
            warn!(
                outside,
                "parallaxes outside {lo}-{hi} mas; check they are in milliarcseconds"
            );
        }
        self.parallax = Some(parallax_mas);
        self
    }

    /// Distance in parsecs, e.g. a posterior-mode estimate.
    pub fn distance(mut self, distance_pc: Observable) -> Self {
        self.distance = Some(distance_pc);
        self
    }

    /// Sky position in degrees (RA/Dec or l/b depending on the frame).
    pub fn position(mut self, longitude: Vec<f64>, latitude: Vec<f64>) -> Self {
        self.longitude = Some(longitude);
        self.latitude = Some(latitude);
        self
    }

    pub fn frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Apparent magnitude in the configured band.
    pub fn magnitude(mut self, magnitude: Observable) -> Self {
        self.magnitude = Some(magnitude);
        self
    }

    pub fn band(mut self, band: impl Into<String>) -> Self {
        self.band = Some(band.into());
        self
    }

    /// Forget everything set so far.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.parallax.is_none()
            && self.distance.is_none()
            && self.longitude.is_none()
            && self.magnitude.is_none()
            && self.band.is_none()
            && self.frame.is_none()
    }

    /// Validate the inputs and resolve defaults.
    pub fn configure(&self) -> Result<PipelineConfig, AppError> {
        let (longitude, latitude) = match (&self.longitude, &self.latitude) {
            (Some(lon), Some(lat)) => (lon.clone(), lat.clone()),
            _ => {
                return Err(AppError::configuration(
                    "No sky position given; set one with position().",
                ));
            }
        };
        if longitude.len() != latitude.len() {
            return Err(AppError::invalid_input(format!(
                "Got {} longitudes but {} latitudes.",
                longitude.len(),
                latitude.len()
            )));
        }

        let (distance, distance_kind) = match (&self.distance, &self.parallax) {
            (Some(d), parallax) => {
                if parallax.is_some() {
                    warn!("both distance and parallax given; using the distance");
                }
                (d.clone(), DistanceKind::Proper)
            }
            (None, Some(p)) => (naive_distance(p), DistanceKind::Naive),
            (None, None) => {
                return Err(AppError::configuration(
                    "No distance given; set a parallax or a distance.",
                ));
            }
        };

        let magnitude = self.magnitude.clone().ok_or_else(|| {
            AppError::configuration("No apparent magnitude given; set one with magnitude().")
        })?;

        let band = match &self.band {
            Some(b) => b.clone(),
            None => {
                warn!(band = DEFAULT_BAND, "no band given; assuming {DEFAULT_BAND}");
                DEFAULT_BAND.to_string()
            }
        };
        let frame = match self.frame {
            Some(f) => f,
            None => {
                warn!(frame = %Frame::Icrs, "no frame given; assuming ICRS");
                Frame::Icrs
            }
        };

        let position_batch = Observable::new(longitude.clone());
        let n = batch_len(&[
            ("position", &position_batch),
            ("distance", &distance),
            ("magnitude", &magnitude),
        ])?;

        let broadcast = |v: Vec<f64>| if v.len() == 1 { vec![v[0]; n] } else { v };
        let positions = SkyPositions {
            longitude: broadcast(longitude),
            latitude: broadcast(latitude),
            frame,
        };

        Ok(PipelineConfig {
            positions,
            distance,
            distance_kind,
            magnitude,
            band,
            n,
        })
    }
}

/// `r = 1000 / parallax` (pc), `sigma_r = 1000 / parallax^2 * sigma_parallax`.
fn naive_distance(parallax_mas: &Observable) -> Observable {
    parallax_mas.map(|w| 1000.0 / w, |w, s| (1000.0 / (w * w) * s).abs())
}

/// Where the reddening of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReddeningSource {
    /// Values returned by the extinction map.
    Map,
    /// The map failed (or was never queried); no star got map reddening.
    Fallback,
}

/// Validated pipeline inputs. Every per-star vector has been broadcast.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub positions: SkyPositions,
    /// Distance (pc).
    pub distance: Observable,
    pub distance_kind: DistanceKind,
    pub magnitude: Observable,
    pub band: String,
    n: usize,
}

impl PipelineConfig {
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn distances(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.distance.value(i)).collect()
    }

    /// `mu_0 = 5 log10(r) - 5`.
    pub fn distance_modulus(&self) -> Vec<f64> {
        self.distances()
            .iter()
            .map(|r| 5.0 * r.log10() - 5.0)
            .collect()
    }

    pub fn compute(
        &self,
        constants: &ConstantTable,
        map: &dyn ExtinctionMap,
    ) -> Result<AbsoluteMagnitudeRun, AppError> {
        // Before anything else: an unknown band must not cost a service call.
        let coefficient = constants.extinction_coefficient(&self.band)?;

        let distances = self.distances();
        let distance_modulus = self.distance_modulus();

        let (reddening, reddening_source) = self.query_reddening(map, &distances);
        let extinction: Vec<f64> = reddening.iter().map(|e| e * coefficient).collect();
        let unusable = distances.iter().filter(|r| !usable_distance(**r)).count();
        if unusable > 0 {
            warn!(unusable, "stars without a usable distance; their magnitude is left empty");
        }

        if !self.magnitude.has_errors() && !self.distance.has_errors() {
            debug!("no magnitude or distance uncertainties; only the extinction term remains");
        }

        let magnitudes = (0..self.n)
            .map(|i| {
                let r = distances[i];
                if !usable_distance(r) {
                    return Measured::new(f64::NAN, f64::NAN);
                }
                let value = self.magnitude.value(i) - distance_modulus[i] - extinction[i];
                let sigma = magnitude_uncertainty(
                    self.magnitude.error(i),
                    r,
                    self.distance.error(i),
                    constants.extinction_sigma,
                );
                Measured::new(value, sigma)
            })
            .collect();

        info!(stars = self.n, band = %self.band, "computed absolute magnitudes");

        Ok(AbsoluteMagnitudeRun {
            band: self.band.clone(),
            distance_kind: self.distance_kind,
            reddening_source,
            distance: distances,
            distance_modulus,
            reddening,
            extinction,
            magnitudes,
        })
    }

    /// E(B-V) per star. Only stars with a usable distance are sent to the
    /// map; the others get NaN. A failed query zeroes the queried stars.
    fn query_reddening(&self, map: &dyn ExtinctionMap, distances: &[f64]) -> (Vec<f64>, ReddeningSource) {
        let usable: Vec<usize> = (0..self.n).filter(|&i| usable_distance(distances[i])).collect();
        let mut reddening = vec![f64::NAN; self.n];
        if usable.is_empty() {
            warn!("no star has a usable distance; skipping the dust map");
            return (reddening, ReddeningSource::Fallback);
        }

        let positions = SkyPositions {
            longitude: usable.iter().map(|&i| self.positions.longitude[i]).collect(),
            latitude: usable.iter().map(|&i| self.positions.latitude[i]).collect(),
            frame: self.positions.frame,
        };
        let queried: Vec<f64> = usable.iter().map(|&i| distances[i]).collect();
        let query = ReddeningQuery {
            positions: &positions,
            distances: &queried,
        };

        let (values, source) = match map.reddening(&query) {
            Ok(ebv) if ebv.len() == usable.len() => (ebv, ReddeningSource::Map),
            Ok(ebv) => {
                warn!(
                    expected = usable.len(),
                    got = ebv.len(),
                    "dust map returned the wrong number of values; using zero reddening"
                );
                (vec![0.0; usable.len()], ReddeningSource::Fallback)
            }
            Err(e) => {
                warn!(error = %e, "dust map query failed; using zero reddening");
                (vec![0.0; usable.len()], ReddeningSource::Fallback)
            }
        };
        for (&i, ebv) in usable.iter().zip(values) {
            reddening[i] = ebv;
        }
        (reddening, source)
    }
}

/// A distance the dust map can be queried at.
fn usable_distance(r: f64) -> bool {
    r.is_finite() && r > 0.0
}

/// Outputs of one pipeline computation, one entry per star.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbsoluteMagnitudeRun {
    pub band: String,
    pub distance_kind: DistanceKind,
    pub reddening_source: ReddeningSource,
    /// Distance used (pc).
    pub distance: Vec<f64>,
    pub distance_modulus: Vec<f64>,
    /// E(B-V); NaN for stars without a usable distance.
    pub reddening: Vec<f64>,
    /// Band extinction (mag).
    pub extinction: Vec<f64>,
    pub magnitudes: Vec<Measured>,
}

/// 1-sigma uncertainty on `M = m - mu_0 - A`.
///
/// The magnitude and distance terms combine in quadrature when present; the
/// assumed extinction uncertainty is always added.
pub fn magnitude_uncertainty(
    magnitude_err: Option<f64>,
    distance: f64,
    distance_err: Option<f64>,
    extinction_sigma: f64,
) -> f64 {
    let distance_term = distance_err.map(|s| 5.0 / (distance * LN_10) * s);
    let base = match (magnitude_err, distance_term) {
        (None, None) => 0.0,
        (None, Some(d)) => d.abs(),
        (Some(m), None) => m,
        (Some(m), Some(d)) => (m * m + d * d).sqrt(),
    };
    (base * base + extinction_sigma * extinction_sigma).sqrt()
}
