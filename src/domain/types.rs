//! Shared domain types.
//!
//! These types are lightweight and serializable so they can be:
//!
//! - passed between the estimator, the distance solver and the magnitude pipeline
//! - exported to JSON/CSV
//! - built by hand in tests without any I/O

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Band used when a magnitude is supplied without naming its band.
pub const DEFAULT_BAND: &str = "Ks";

/// A batch of measured values with optional 1-sigma uncertainties.
///
/// A batch of length 1 broadcasts against any other batch length, so a scalar
/// prior length scale or a single catalogue-wide error can be combined with a
/// full star list.
///
/// A missing uncertainty (either no error batch at all, or `None` for a given
/// star) means the value is treated as exact: it contributes nothing to any
/// propagated error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observable {
    values: Vec<f64>,
    errors: Vec<Option<f64>>,
}

impl Observable {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            errors: Vec::new(),
        }
    }

    pub fn scalar(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Attach per-star uncertainties.
    pub fn with_errors(mut self, errors: Vec<f64>) -> Self {
        self.errors = errors.into_iter().map(Some).collect();
        self
    }

    /// Attach a single uncertainty shared by every star.
    pub fn with_error(self, sigma: f64) -> Self {
        self.with_errors(vec![sigma])
    }

    /// Attach uncertainties where some stars may have none (e.g. blank CSV cells).
    pub fn with_optional_errors(mut self, errors: Vec<Option<f64>>) -> Self {
        self.errors = if errors.iter().all(Option::is_none) {
            Vec::new()
        } else {
            errors
        };
        self
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True if at least one star carries an uncertainty.
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(Option::is_some)
    }

    /// Value for star `i`, broadcasting a length-1 batch.
    pub fn value(&self, i: usize) -> f64 {
        if self.values.len() == 1 {
            self.values[0]
        } else {
            self.values[i]
        }
    }

    /// Uncertainty for star `i`, or `None` when it is treated as exact.
    pub fn error(&self, i: usize) -> Option<f64> {
        match self.errors.len() {
            0 => None,
            1 => self.errors[0],
            _ => self.errors[i],
        }
    }

    /// Transform values and uncertainties, keeping the batch shape.
    ///
    /// `error` gets each star's (broadcast) value and its sigma. A single
    /// shared sigma on a multi-star batch is expanded per star, since the
    /// transformed sigma usually depends on the value.
    pub fn map(&self, value: impl Fn(f64) -> f64, error: impl Fn(f64, f64) -> f64) -> Self {
        let values = self.values.iter().map(|&v| value(v)).collect();
        let k = match self.errors.len() {
            0 => 0,
            1 => self.values.len().max(1),
            e => e,
        };
        let errors = (0..k)
            .map(|i| {
                let v = self.values.get(i).or(self.values.first()).copied()?;
                let s = self.errors.get(i).or(self.errors.first()).copied().flatten()?;
                Some(error(v, s))
            })
            .collect();
        Self { values, errors }
    }

    fn error_len(&self) -> usize {
        self.errors.len()
    }
}

/// Resolve the common batch length of several observables.
///
/// Every value batch (and every non-empty error batch) must have length 1 or
/// the common length. The names are only used for error messages.
pub fn batch_len(inputs: &[(&str, &Observable)]) -> Result<usize, AppError> {
    let mut n = 0usize;
    for (_, obs) in inputs {
        n = n.max(obs.len()).max(obs.error_len());
    }
    if n == 0 {
        return Err(AppError::invalid_input("Empty input batch."));
    }

    for (name, obs) in inputs {
        if obs.is_empty() {
            return Err(AppError::invalid_input(format!("'{name}' has no values.")));
        }
        if obs.len() != 1 && obs.len() != n {
            return Err(AppError::invalid_input(format!(
                "'{name}' has {} values but the batch has {n} stars.",
                obs.len()
            )));
        }
        let e = obs.error_len();
        if e > 1 && e != n {
            return Err(AppError::invalid_input(format!(
                "'{name}' has {e} uncertainties but the batch has {n} stars."
            )));
        }
    }
    Ok(n)
}

/// A derived per-star value with its propagated 1-sigma uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measured {
    pub value: f64,
    pub sigma: f64,
}

impl Measured {
    pub fn new(value: f64, sigma: f64) -> Self {
        Self { value, sigma }
    }

    pub fn exact(value: f64) -> Self {
        Self { value, sigma: 0.0 }
    }
}

/// Reference frame of a sky position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Frame {
    /// Equatorial (RA, Dec), J2000 / ICRS.
    #[default]
    Icrs,
    /// Galactic (l, b).
    Galactic,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Icrs => write!(f, "icrs"),
            Frame::Galactic => write!(f, "galactic"),
        }
    }
}

/// Per-star sky positions in degrees.
///
/// `longitude`/`latitude` are RA/Dec for [`Frame::Icrs`] and l/b for
/// [`Frame::Galactic`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyPositions {
    pub longitude: Vec<f64>,
    pub latitude: Vec<f64>,
    pub frame: Frame,
}

impl SkyPositions {
    pub fn len(&self) -> usize {
        self.longitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.longitude.is_empty()
    }
}

/// How the distance entering the magnitude pipeline was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceKind {
    /// `1000 / parallax`; biased for low signal-to-noise parallaxes.
    Naive,
    /// Supplied directly, e.g. a posterior-mode estimate.
    Proper,
}

/// Where `smag absmag` gets each star's distance from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DistanceMode {
    /// Posterior mode from `parallax`/`parallax_err` and the prior length scale.
    #[default]
    Posterior,
    /// `1000 / parallax`.
    Naive,
    /// The `distance`/`distance_err` columns (pc).
    Column,
}
