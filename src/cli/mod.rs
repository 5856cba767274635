//! Command-line parsing for `smag`.
//!
//! Argument parsing and command dispatch stay separate from the numeric code;
//! `app` turns these structs into plain run configs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{DistanceMode, Frame};

/// Default exponential-prior length scale (pc).
pub const DEFAULT_LENGTH_SCALE: f64 = 1350.0;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "smag",
    version,
    about = "Asteroseismic stellar parameters, parallax distances and absolute magnitudes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Radius, mass, log g, luminosity and Mbol from numax, dnu and Teff.
    ///
    /// Reads `numax`, `dnu`, `teff` (plus optional `*_err`, `dnu_corr`,
    /// `radius`, `mass` and `feh` columns).
    Scale(ScaleArgs),
    /// Posterior-mode distances from `parallax` and `parallax_err` (mas).
    Distance(DistanceArgs),
    /// Absolute magnitudes from `mag`, a distance and the dust map.
    ///
    /// Positions come from `ra`/`dec` (or `l`/`b` with `--frame galactic`).
    Absmag(AbsmagArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct ScaleArgs {
    /// Star table (CSV).
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Also report band absolute magnitudes `Mbol - BC` in this band.
    #[arg(long, requires = "bc")]
    pub band: Option<String>,

    /// Bolometric correction applied to every star (mag).
    #[arg(long, requires = "band")]
    pub bc: Option<f64>,

    /// Uncertainty of the bolometric correction (mag).
    #[arg(long, default_value_t = 0.0)]
    pub bc_err: f64,

    /// Export per-star results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export per-star results to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct DistanceArgs {
    /// Star table (CSV).
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Length scale of the exponentially decreasing space-density prior (pc).
    #[arg(long, default_value_t = DEFAULT_LENGTH_SCALE)]
    pub length_scale: f64,

    /// Export per-star distances to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct AbsmagArgs {
    /// Star table (CSV).
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Band of the `mag` column (defaults to Ks).
    #[arg(long)]
    pub band: Option<String>,

    /// Frame of the position columns (defaults to icrs).
    #[arg(long, value_enum)]
    pub frame: Option<Frame>,

    /// Distance source.
    #[arg(long, value_enum, default_value_t = DistanceMode::Posterior)]
    pub distance: DistanceMode,

    /// Prior length scale for `--distance posterior` (pc).
    #[arg(long, default_value_t = DEFAULT_LENGTH_SCALE)]
    pub length_scale: f64,

    /// Skip the dust map and assume zero reddening.
    #[arg(long)]
    pub no_extinction: bool,

    /// Export per-star results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export per-star results to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}
