//! Asteroseismic scaling relations with first-order uncertainty propagation.
//!
//! With `x = numax / numax_sun`, `y = dnu / (f * dnu_sun)` and `z = Teff / T_sun`:
//!
//! - `R    = R_sun * x   * y^-2 * z^0.5`
//! - `M    = M_sun * x^3 * y^-4 * z^1.5`
//! - `g    = g_sun * x   * z^0.5`
//! - `L    = 4 pi sigma_SB R^2 Teff^4`
//! - `Mbol = -2.5 log10(L / L_sun) + Mbol_sun`
//!
//! `f` is an optional per-star correction to the dnu relation (1 by default).
//!
//! Every relation is a product of powers, so each partial derivative is the
//! value times `exponent / variable`. The solar reference frequencies appear as
//! divisors and contribute their own literature uncertainty.

use std::f64::consts::{LN_10, PI};

use serde::Serialize;

use crate::constants::ConstantTable;
use crate::domain::{Measured, Observable, batch_len};
use crate::error::AppError;
use crate::math::Propagation;

/// Which radius feeds the luminosity relation.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RadiusSource {
    /// Use the scaling-relation radius.
    #[default]
    Scaling,
    /// Use an externally measured radius (m) with its own uncertainty.
    Override(Observable),
}

/// Which mass downstream consumers should prefer.
///
/// No relation in this module depends on mass, so an override only changes
/// what [`ScalingRelations::effective_mass`] reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MassSource {
    #[default]
    Scaling,
    /// Externally measured mass (kg) with its own uncertainty.
    Override(Observable),
}

/// Optional adjustments applied before the relations are evaluated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corrections {
    /// Per-star dnu correction factor `f`; `None` means `f = 1` for every star.
    pub dnu_factor: Option<Observable>,
    pub radius: RadiusSource,
    pub mass: MassSource,
}

/// All derived quantities for one star.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StellarParameters {
    /// Radius (m).
    pub radius: Measured,
    /// Mass (kg).
    pub mass: Measured,
    /// log10 of surface gravity in cm s^-2.
    pub logg: Measured,
    /// Luminosity (W).
    pub luminosity: Measured,
    /// Bolometric absolute magnitude.
    pub bolometric_magnitude: Measured,
}

/// [`StellarParameters`] with radius, mass and luminosity in solar units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolarParameters {
    pub radius: Measured,
    pub mass: Measured,
    pub logg: Measured,
    pub luminosity: Measured,
    pub bolometric_magnitude: Measured,
}

impl StellarParameters {
    pub fn in_solar_units(&self, constants: &ConstantTable) -> SolarParameters {
        let scale = |m: Measured, unit: f64| Measured::new(m.value / unit, m.sigma / unit);
        SolarParameters {
            radius: scale(self.radius, constants.solar_radius),
            mass: scale(self.mass, constants.solar_mass),
            logg: self.logg,
            luminosity: scale(self.luminosity, constants.solar_luminosity()),
            bolometric_magnitude: self.bolometric_magnitude,
        }
    }
}

/// Per-star inputs after broadcasting.
#[derive(Debug, Clone, Copy)]
struct Star {
    numax: f64,
    numax_err: Option<f64>,
    dnu: f64,
    dnu_err: Option<f64>,
    teff: f64,
    teff_err: Option<f64>,
    factor: f64,
    factor_err: Option<f64>,
}

/// Scaling-relation estimator for a batch of stars.
#[derive(Debug, Clone)]
pub struct ScalingRelations<'a> {
    constants: &'a ConstantTable,
    numax: Observable,
    dnu: Observable,
    teff: Observable,
    corrections: Corrections,
    n: usize,
}

impl<'a> ScalingRelations<'a> {
    /// `numax` and `dnu` in uHz, `teff` in K.
    pub fn new(
        constants: &'a ConstantTable,
        numax: Observable,
        dnu: Observable,
        teff: Observable,
    ) -> Result<Self, AppError> {
        let n = batch_len(&[("numax", &numax), ("dnu", &dnu), ("teff", &teff)])?;
        Ok(Self {
            constants,
            numax,
            dnu,
            teff,
            corrections: Corrections::default(),
            n,
        })
    }

    pub fn with_corrections(mut self, corrections: Corrections) -> Result<Self, AppError> {
        let mut inputs = vec![
            ("numax", &self.numax),
            ("dnu", &self.dnu),
            ("teff", &self.teff),
        ];
        if let Some(f) = &corrections.dnu_factor {
            inputs.push(("dnu correction", f));
        }
        if let RadiusSource::Override(r) = &corrections.radius {
            inputs.push(("radius override", r));
        }
        if let MassSource::Override(m) = &corrections.mass {
            inputs.push(("mass override", m));
        }
        self.n = batch_len(&inputs)?;
        self.corrections = corrections;
        Ok(self)
    }

    /// Number of stars in the batch.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn teff(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.teff.value(i)).collect()
    }

    fn star(&self, i: usize) -> Star {
        let (factor, factor_err) = match &self.corrections.dnu_factor {
            Some(f) => (f.value(i), f.error(i)),
            None => (1.0, None),
        };
        Star {
            numax: self.numax.value(i),
            numax_err: self.numax.error(i),
            dnu: self.dnu.value(i),
            dnu_err: self.dnu.error(i),
            teff: self.teff.value(i),
            teff_err: self.teff.error(i),
            factor,
            factor_err,
        }
    }

    fn stars(&self) -> impl Iterator<Item = Star> + '_ {
        (0..self.n).map(|i| self.star(i))
    }

    /// Scaling-relation radius (m), regardless of any override.
    pub fn radius(&self) -> Vec<Measured> {
        self.stars().map(|s| self.radius_of(&s)).collect()
    }

    /// Scaling-relation mass (kg), regardless of any override.
    pub fn mass(&self) -> Vec<Measured> {
        self.stars().map(|s| self.mass_of(&s)).collect()
    }

    pub fn logg(&self) -> Vec<Measured> {
        self.stars().map(|s| self.logg_of(&s)).collect()
    }

    /// Radius preferred for downstream composition: the override if one is set.
    pub fn effective_radius(&self) -> Vec<Measured> {
        (0..self.n).map(|i| self.effective_radius_at(i)).collect()
    }

    /// Mass preferred for downstream composition: the override if one is set.
    pub fn effective_mass(&self) -> Vec<Measured> {
        match &self.corrections.mass {
            MassSource::Scaling => self.mass(),
            MassSource::Override(m) => (0..self.n).map(|i| override_at(m, i)).collect(),
        }
    }

    pub fn luminosity(&self) -> Vec<Measured> {
        (0..self.n).map(|i| self.luminosity_at(i)).collect()
    }

    pub fn bolometric_magnitude(&self) -> Vec<Measured> {
        self.luminosity()
            .into_iter()
            .map(|l| self.bolometric_of(l))
            .collect()
    }

    /// Evaluate every relation for every star.
    pub fn evaluate(&self) -> Vec<StellarParameters> {
        (0..self.n)
            .map(|i| {
                let s = self.star(i);
                let radius = self.radius_of(&s);
                let luminosity = self.luminosity_of(&s, self.effective_radius_with(i, || radius));
                StellarParameters {
                    radius,
                    mass: self.mass_of(&s),
                    logg: self.logg_of(&s),
                    luminosity,
                    bolometric_magnitude: self.bolometric_of(luminosity),
                }
            })
            .collect()
    }

    fn radius_of(&self, s: &Star) -> Measured {
        let c = self.constants;
        let r = c.solar_radius
            * (s.numax / c.numax_sun)
            * (s.dnu / (s.factor * c.dnu_sun)).powi(-2)
            * (s.teff / c.solar_teff).sqrt();

        let sigma = Propagation::new()
            .term(r / s.numax, s.numax_err)
            .term(-2.0 * r / s.dnu, s.dnu_err)
            .term(0.5 * r / s.teff, s.teff_err)
            .term(-r / c.numax_sun, Some(c.numax_sun_err))
            .term(2.0 * r / c.dnu_sun, Some(c.dnu_sun_err))
            .term(2.0 * r / s.factor, s.factor_err)
            .sigma();
        Measured::new(r, sigma)
    }

    fn mass_of(&self, s: &Star) -> Measured {
        let c = self.constants;
        let m = c.solar_mass
            * (s.numax / c.numax_sun).powi(3)
            * (s.dnu / (s.factor * c.dnu_sun)).powi(-4)
            * (s.teff / c.solar_teff).powf(1.5);

        let sigma = Propagation::new()
            .term(3.0 * m / s.numax, s.numax_err)
            .term(-4.0 * m / s.dnu, s.dnu_err)
            .term(1.5 * m / s.teff, s.teff_err)
            .term(-3.0 * m / c.numax_sun, Some(c.numax_sun_err))
            .term(4.0 * m / c.dnu_sun, Some(c.dnu_sun_err))
            .term(4.0 * m / s.factor, s.factor_err)
            .sigma();
        Measured::new(m, sigma)
    }

    fn logg_of(&self, s: &Star) -> Measured {
        let c = self.constants;
        let g = c.solar_gravity * (s.numax / c.numax_sun) * (s.teff / c.solar_teff).sqrt();

        let sigma_g = Propagation::new()
            .term(g / s.numax, s.numax_err)
            .term(0.5 * g / s.teff, s.teff_err)
            .term(-g / c.numax_sun, Some(c.numax_sun_err))
            .sigma();
        Measured::new(g.log10(), sigma_g / (g * LN_10))
    }

    fn effective_radius_at(&self, i: usize) -> Measured {
        self.effective_radius_with(i, || self.radius_of(&self.star(i)))
    }

    /// The override for star `i`, or the scaling radius from `scaling`.
    fn effective_radius_with(&self, i: usize, scaling: impl FnOnce() -> Measured) -> Measured {
        match &self.corrections.radius {
            RadiusSource::Scaling => scaling(),
            RadiusSource::Override(r) => override_at(r, i),
        }
    }

    fn luminosity_at(&self, i: usize) -> Measured {
        self.luminosity_of(&self.star(i), self.effective_radius_at(i))
    }

    fn luminosity_of(&self, s: &Star, r: Measured) -> Measured {
        let l = 4.0 * PI * self.constants.stefan_boltzmann * r.value.powi(2) * s.teff.powi(4);

        let sigma = Propagation::new()
            .term(2.0 * l / r.value, Some(r.sigma))
            .term(4.0 * l / s.teff, s.teff_err)
            .sigma();
        Measured::new(l, sigma)
    }

    fn bolometric_of(&self, l: Measured) -> Measured {
        let c = self.constants;
        let mbol = -2.5 * (l.value / c.solar_luminosity()).log10() + c.solar_mbol;
        let sigma = Propagation::new()
            .term(-2.5 / (l.value * LN_10), Some(l.sigma))
            .sigma();
        Measured::new(mbol, sigma)
    }
}

fn override_at(obs: &Observable, i: usize) -> Measured {
    Measured::new(obs.value(i), obs.error(i).unwrap_or(0.0))
}
