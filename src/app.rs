//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - installs the log subscriber
//! - parses CLI arguments into a run config
//! - runs the requested computation
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{AbsmagArgs, Cli, Command, DistanceArgs, ScaleArgs};
use crate::constants::ConstantTable;
use crate::data::{BayestarClient, ExtinctionMap, ZeroReddening};
use crate::error::AppError;
use crate::io::BandColumn;
use crate::scaling::FixedCorrection;

pub mod pipeline;

use pipeline::{AbsmagConfig, DistanceConfig, RunConfig, ScaleConfig};

/// Entry point for the `smag` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();

    let cli = Cli::parse();
    let constants = ConstantTable::default();

    match run_config_from_args(&cli.command) {
        RunConfig::Scale(config) => handle_scale(&config, &constants),
        RunConfig::Distance(config) => handle_distance(&config),
        RunConfig::Absmag(config) => handle_absmag(&config, &constants),
    }
}

/// Log to stderr; `RUST_LOG` overrides the default `info` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_scale(config: &ScaleConfig, constants: &ConstantTable) -> Result<(), AppError> {
    let out = pipeline::run_scale(config, constants)?;
    let ids = out.table.ids();
    let band = out.band_magnitudes.as_ref().map(|(band, magnitudes)| BandColumn {
        band,
        magnitudes,
    });

    println!(
        "{}",
        crate::report::format_input_summary("scale", out.table.len(), out.table.rows_read)
    );
    print!("{}", crate::report::format_row_errors(&out.table.row_errors));
    println!("{}", crate::report::format_parameters_table(ids, &out.parameters, band));
    if let Some(b) = band {
        print!("{}", crate::report::format_solar_reference(b.band, out.solar_band_magnitude));
    }

    if let Some(path) = &config.export {
        crate::io::write_parameters_csv(path, ids, &out.parameters, band)?;
        info!(path = %path.display(), "wrote CSV export");
    }
    if let Some(path) = &config.export_json {
        let results = crate::io::parameter_results(ids, &out.parameters, band.map(|b| (b.band, b.magnitudes)));
        crate::io::write_results_json(path, &results)?;
        info!(path = %path.display(), "wrote JSON export");
    }
    Ok(())
}

fn handle_distance(config: &DistanceConfig) -> Result<(), AppError> {
    let out = pipeline::run_distance(config)?;
    let ids = out.table.ids();

    println!(
        "{}",
        crate::report::format_input_summary("distance", out.table.len(), out.table.rows_read)
    );
    print!("{}", crate::report::format_row_errors(&out.table.row_errors));
    println!(
        "{}",
        crate::report::format_distance_table(ids, &out.parallax, &out.estimates, config.length_scale)
    );

    if let Some(path) = &config.export {
        crate::io::write_distances_csv(path, ids, &out.parallax, &out.estimates)?;
        info!(path = %path.display(), "wrote CSV export");
    }
    Ok(())
}

fn handle_absmag(config: &AbsmagConfig, constants: &ConstantTable) -> Result<(), AppError> {
    let map: Box<dyn ExtinctionMap> = if config.extinction {
        let client = BayestarClient::from_env();
        info!(url = client.url(), "using dust map service");
        Box::new(client)
    } else {
        Box::new(ZeroReddening)
    };

    let out = pipeline::run_absmag(config, constants, map.as_ref())?;
    let ids = out.table.ids();

    println!(
        "{}",
        crate::report::format_input_summary("absmag", out.table.len(), out.table.rows_read)
    );
    print!("{}", crate::report::format_row_errors(&out.table.row_errors));
    println!("{}", crate::report::format_magnitude_table(ids, &out.run));

    if let Some(path) = &config.export {
        crate::io::write_magnitudes_csv(path, ids, &out.run)?;
        info!(path = %path.display(), "wrote CSV export");
    }
    if let Some(path) = &config.export_json {
        crate::io::write_results_json(path, &crate::io::magnitude_results(ids, &out.run))?;
        info!(path = %path.display(), "wrote JSON export");
    }
    Ok(())
}

pub fn run_config_from_args(command: &Command) -> RunConfig {
    match command {
        Command::Scale(args) => RunConfig::Scale(scale_config_from_args(args)),
        Command::Distance(args) => RunConfig::Distance(distance_config_from_args(args)),
        Command::Absmag(args) => RunConfig::Absmag(absmag_config_from_args(args)),
    }
}

fn scale_config_from_args(args: &ScaleArgs) -> ScaleConfig {
    let band = match (&args.band, args.bc) {
        (Some(band), Some(bc)) => Some((
            band.clone(),
            FixedCorrection {
                value: bc,
                sigma: args.bc_err,
            },
        )),
        _ => None,
    };
    ScaleConfig {
        input: args.input.clone(),
        band,
        export: args.export.clone(),
        export_json: args.export_json.clone(),
    }
}

fn distance_config_from_args(args: &DistanceArgs) -> DistanceConfig {
    DistanceConfig {
        input: args.input.clone(),
        length_scale: args.length_scale,
        export: args.export.clone(),
    }
}

fn absmag_config_from_args(args: &AbsmagArgs) -> AbsmagConfig {
    AbsmagConfig {
        input: args.input.clone(),
        band: args.band.clone(),
        frame: args.frame,
        distance: args.distance,
        length_scale: args.length_scale,
        extinction: !args.no_extinction,
        export: args.export.clone(),
        export_json: args.export_json.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_extinction_flag_disables_the_map() {
        let cli = Cli::try_parse_from(["smag", "absmag", "--input", "s.csv", "--no-extinction"]).unwrap();
        let RunConfig::Absmag(config) = run_config_from_args(&cli.command) else {
            panic!("expected absmag config");
        };
        assert!(!config.extinction);
    }

    #[test]
    fn scale_band_becomes_fixed_correction() {
        let cli = Cli::try_parse_from([
            "smag", "scale", "--input", "s.csv", "--band", "Ks", "--bc", "1.9", "--bc-err", "0.03",
        ])
        .unwrap();
        let RunConfig::Scale(config) = run_config_from_args(&cli.command) else {
            panic!("expected scale config");
        };
        let (band, bc) = config.band.unwrap();
        assert_eq!(band, "Ks");
        assert_eq!(bc, FixedCorrection { value: 1.9, sigma: 0.03 });
    }
}
