//! Bolometric corrections and seismic band magnitudes.
//!
//! Computing a bolometric correction needs synthetic spectra and passband
//! integration, which live outside this crate. We only define the provider
//! boundary and the composition `M_band = Mbol - BC`.

use crate::constants::ConstantTable;
use crate::domain::{Measured, Observable};
use crate::error::AppError;
use crate::math::quadrature;
use crate::scaling::ScalingRelations;

/// Per-star atmospheric parameters for which a correction is requested.
#[derive(Debug, Clone, Copy)]
pub struct BolometricQuery<'a> {
    /// Effective temperature (K).
    pub teff: &'a [f64],
    /// log10 surface gravity (cgs).
    pub logg: &'a [f64],
    /// Metallicity [Fe/H] (dex).
    pub feh: &'a [f64],
    pub band: &'a str,
}

impl BolometricQuery<'_> {
    pub fn len(&self) -> usize {
        self.teff.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teff.is_empty()
    }
}

/// A source of bolometric corrections `BC_band` (one per star).
pub trait BolometricCorrection {
    fn correction(&self, query: &BolometricQuery<'_>) -> Result<Vec<Measured>, AppError>;
}

/// The same correction for every star, e.g. a value precomputed elsewhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedCorrection {
    pub value: f64,
    pub sigma: f64,
}

impl BolometricCorrection for FixedCorrection {
    fn correction(&self, query: &BolometricQuery<'_>) -> Result<Vec<Measured>, AppError> {
        ConstantTable::ensure_known_band(query.band)?;
        Ok(vec![Measured::new(self.value, self.sigma); query.len()])
    }
}

/// `M_band = Mbol - BC` with `sigma = sqrt(sigma_Mbol^2 + sigma_BC^2)`.
pub fn band_magnitudes(bolometric: &[Measured], corrections: &[Measured]) -> Result<Vec<Measured>, AppError> {
    if bolometric.len() != corrections.len() {
        return Err(AppError::invalid_input(format!(
            "Got {} bolometric corrections for {} stars.",
            corrections.len(),
            bolometric.len()
        )));
    }
    Ok(bolometric
        .iter()
        .zip(corrections)
        .map(|(mbol, bc)| Measured::new(mbol.value - bc.value, quadrature(&[mbol.sigma, bc.sigma])))
        .collect())
}

/// Absolute magnitude in `band` from the seismic luminosity of each star.
///
/// `feh` may be a single value for the whole batch.
pub fn seismic_absolute_magnitudes(
    relations: &ScalingRelations<'_>,
    feh: &Observable,
    band: &str,
    provider: &dyn BolometricCorrection,
) -> Result<Vec<Measured>, AppError> {
    ConstantTable::ensure_known_band(band)?;

    let n = relations.len();
    if feh.len() != 1 && feh.len() != n {
        return Err(AppError::invalid_input(format!(
            "'feh' has {} values but the batch has {n} stars.",
            feh.len()
        )));
    }

    let params = relations.evaluate();
    let teff = relations.teff();
    let logg: Vec<f64> = params.iter().map(|p| p.logg.value).collect();
    let feh: Vec<f64> = (0..n).map(|i| feh.value(i)).collect();

    let query = BolometricQuery {
        teff: &teff,
        logg: &logg,
        feh: &feh,
        band,
    };
    let corrections = provider.correction(&query)?;

    let mbol: Vec<Measured> = params.iter().map(|p| p.bolometric_magnitude).collect();
    band_magnitudes(&mbol, &corrections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Correction that grows with temperature, to check the query is wired through.
    struct LinearInTeff;

    impl BolometricCorrection for LinearInTeff {
        fn correction(&self, query: &BolometricQuery<'_>) -> Result<Vec<Measured>, AppError> {
            assert_eq!(query.band, "Ks");
            assert_eq!(query.teff.len(), query.logg.len());
            assert_eq!(query.feh, &[-0.2, -0.2]);
            Ok(query
                .teff
                .iter()
                .map(|t| Measured::new(t / 1000.0, 0.02))
                .collect())
        }
    }

    fn relations(table: &ConstantTable) -> ScalingRelations<'_> {
        ScalingRelations::new(
            table,
            Observable::new(vec![30.0, 100.0]).with_error(1.0),
            Observable::new(vec![4.0, 9.0]).with_error(0.05),
            Observable::new(vec![4700.0, 5000.0]).with_error(80.0),
        )
        .unwrap()
    }

    #[test]
    fn band_magnitude_subtracts_correction() {
        let table = ConstantTable::default();
        let rel = relations(&table);
        let mags =
            seismic_absolute_magnitudes(&rel, &Observable::scalar(-0.2), "Ks", &LinearInTeff).unwrap();

        let params = rel.evaluate();
        for ((m, p), t) in mags.iter().zip(&params).zip([4700.0, 5000.0]) {
            assert!((m.value - (p.bolometric_magnitude.value - t / 1000.0)).abs() < 1e-12);
            let expected = (p.bolometric_magnitude.sigma.powi(2) + 0.02f64.powi(2)).sqrt();
            assert!((m.sigma - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn fixed_correction_rejects_unknown_band() {
        let table = ConstantTable::default();
        let rel = relations(&table);
        let bc = FixedCorrection { value: 2.0, sigma: 0.05 };
        let err = seismic_absolute_magnitudes(&rel, &Observable::scalar(0.0), "U", &bc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedBand);

        let ok = seismic_absolute_magnitudes(&rel, &Observable::scalar(0.0), "Kepler", &bc).unwrap();
        assert_eq!(ok.len(), 2);
    }

    #[test]
    fn mismatched_correction_count_is_rejected() {
        let mbol = [Measured::exact(1.0), Measured::exact(2.0)];
        let err = band_magnitudes(&mbol, &[Measured::exact(0.1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
