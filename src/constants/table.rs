//! Literature constants and per-band coefficients.
//!
//! Sources:
//! - extinction coefficients `A_band / E(B-V)`: Green et al. (2018), Bayestar17
//! - solar asteroseismic reference values: Huber et al. (2011)
//! - solar bolometric magnitude: Torres (2010)
//! - solar apparent magnitudes: Bohlin & Gilliland (2004)
//!
//! All values are SI except the surface gravity, which is kept in cgs so that
//! `log g` comes out in the conventional dex(cm s^-2).

use std::collections::BTreeMap;
use std::f64::consts::PI;

use crate::error::{AppError, ErrorKind};

/// Every photometric band the crate knows by name.
///
/// Not every known band has tabulated coefficients; lookups for a known band
/// without a value still fail with `UnsupportedBand`.
pub const KNOWN_BANDS: &[&str] = &[
    "g", "r", "i", "z", "y", "J", "H", "Ks", "G", "W1", "W2", "W3", "W4", "B", "V", "R", "I",
    "Gaia", "Gaia_B", "Gaia_R", "Kepler",
];

const GREEN_2018_COEFFS: &[(&str, f64)] = &[
    ("g", 3.384),
    ("r", 2.483),
    ("i", 1.838),
    ("z", 1.414),
    ("y", 1.126),
    ("J", 0.650),
    ("H", 0.327),
    ("Ks", 0.161),
];

const SOLAR_APPARENT_MAGS: &[(&str, f64)] = &[("J", 3.64), ("H", 3.32), ("Ks", 3.28)];

/// Physical and solar reference constants plus per-band lookup tables.
///
/// `ConstantTable::default()` carries the literature values. Tests and callers
/// with their own calibration can override individual entries.
#[derive(Debug, Clone)]
pub struct ConstantTable {
    /// Solar radius (m).
    pub solar_radius: f64,
    /// Solar effective temperature (K).
    pub solar_teff: f64,
    /// Solar mass (kg).
    pub solar_mass: f64,
    /// Solar surface gravity (cm s^-2).
    pub solar_gravity: f64,
    /// Solar bolometric absolute magnitude.
    pub solar_mbol: f64,
    /// Solar numax (uHz) and its literature uncertainty.
    pub numax_sun: f64,
    pub numax_sun_err: f64,
    /// Solar large frequency separation (uHz) and its literature uncertainty.
    pub dnu_sun: f64,
    pub dnu_sun_err: f64,
    /// Stefan-Boltzmann constant (W m^-2 K^-4).
    pub stefan_boltzmann: f64,
    /// Assumed 1-sigma uncertainty on the band extinction (mag), added in
    /// quadrature to every absolute magnitude.
    pub extinction_sigma: f64,
    extinction_coefficients: BTreeMap<String, f64>,
    solar_magnitudes: BTreeMap<String, f64>,
}

impl Default for ConstantTable {
    fn default() -> Self {
        Self {
            solar_radius: 695_700e3,
            solar_teff: 5778.0,
            solar_mass: 1.989e30,
            solar_gravity: 27_400.0,
            solar_mbol: 4.74,
            numax_sun: 3090.0,
            numax_sun_err: 30.0,
            dnu_sun: 135.1,
            dnu_sun_err: 0.1,
            stefan_boltzmann: 5.670_367e-8,
            extinction_sigma: 0.05,
            extinction_coefficients: to_table(GREEN_2018_COEFFS),
            solar_magnitudes: to_table(SOLAR_APPARENT_MAGS),
        }
    }
}

impl ConstantTable {
    /// Solar luminosity (W), `4 pi sigma_SB R_sun^2 T_sun^4`.
    pub fn solar_luminosity(&self) -> f64 {
        4.0 * PI * self.stefan_boltzmann * self.solar_radius.powi(2) * self.solar_teff.powi(4)
    }

    /// `A_band / E(B-V)` for `band`.
    pub fn extinction_coefficient(&self, band: &str) -> Result<f64, AppError> {
        self.extinction_coefficients
            .get(band)
            .copied()
            .ok_or_else(|| AppError::unsupported_band(band, &self.extinction_bands()))
    }

    /// Apparent magnitude of the Sun in `band`.
    pub fn solar_magnitude(&self, band: &str) -> Result<f64, AppError> {
        self.solar_magnitudes.get(band).copied().ok_or_else(|| {
            let known: Vec<&str> = self.solar_magnitudes.keys().map(String::as_str).collect();
            AppError::unsupported_band(band, &known)
        })
    }

    /// Bands with a tabulated extinction coefficient, in sorted order.
    pub fn extinction_bands(&self) -> Vec<&str> {
        self.extinction_coefficients.keys().map(String::as_str).collect()
    }

    pub fn is_known_band(band: &str) -> bool {
        KNOWN_BANDS.contains(&band)
    }

    /// Fail with `UnsupportedBand` unless `band` is one of [`KNOWN_BANDS`].
    pub fn ensure_known_band(band: &str) -> Result<(), AppError> {
        if Self::is_known_band(band) {
            Ok(())
        } else {
            Err(AppError::new(
                ErrorKind::UnsupportedBand,
                format!("Unknown band '{band}'. Known bands: {}.", KNOWN_BANDS.join(", ")),
            ))
        }
    }

    pub fn with_extinction_coefficient(mut self, band: &str, value: f64) -> Self {
        self.extinction_coefficients.insert(band.to_string(), value);
        self
    }

    pub fn with_extinction_sigma(mut self, sigma: f64) -> Self {
        self.extinction_sigma = sigma;
        self
    }
}

fn to_table(rows: &[(&str, f64)]) -> BTreeMap<String, f64> {
    rows.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn green_coefficients_are_tabulated() {
        let table = ConstantTable::default();
        assert_eq!(table.extinction_coefficient("Ks").unwrap(), 0.161);
        assert_eq!(table.extinction_coefficient("g").unwrap(), 3.384);
        assert_eq!(table.extinction_bands().len(), 8);
    }

    #[test]
    fn band_lookup_is_exact_not_substring() {
        let table = ConstantTable::default();
        let err = table.extinction_coefficient("K").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedBand);
    }

    #[test]
    fn known_band_without_coefficient_is_unsupported() {
        let table = ConstantTable::default();
        assert!(ConstantTable::is_known_band("Kepler"));
        assert!(table.extinction_coefficient("Kepler").is_err());
        assert!(ConstantTable::ensure_known_band("U").is_err());
    }

    #[test]
    fn solar_magnitudes_and_luminosity() {
        let table = ConstantTable::default();
        assert_eq!(table.solar_magnitude("H").unwrap(), 3.32);
        assert!(table.solar_magnitude("g").is_err());

        // The nominal solar luminosity is 3.828e26 W; our R/T give ~3.846e26 W.
        let l = table.solar_luminosity();
        assert!((l / 3.828e26 - 1.0).abs() < 0.01, "L_sun = {l}");
    }

    #[test]
    fn overrides_replace_entries() {
        let table = ConstantTable::default()
            .with_extinction_coefficient("Ks", 0.0)
            .with_extinction_coefficient("Kepler", 0.8)
            .with_extinction_sigma(0.1);
        assert_eq!(table.extinction_coefficient("Ks").unwrap(), 0.0);
        assert_eq!(table.extinction_coefficient("Kepler").unwrap(), 0.8);
        assert_eq!(table.extinction_sigma, 0.1);
    }
}
