//! Equatorial (ICRS) to Galactic coordinate conversion.
//!
//! Dust maps such as Bayestar are indexed in Galactic `(l, b)`, while most
//! catalogues give `(RA, Dec)`. The rotation below is the Hipparcos-defined
//! ICRS -> Galactic matrix (ESA 1997, Vol. 1, Sec. 1.5.3).

use nalgebra::{Matrix3, Vector3};

use crate::domain::{Frame, SkyPositions};

#[rustfmt::skip]
fn icrs_to_galactic_matrix() -> Matrix3<f64> {
    Matrix3::new(
        -0.054_875_560_416_215_4, -0.873_437_090_234_885_0, -0.483_835_015_548_713_2,
         0.494_109_427_875_583_7, -0.444_829_629_960_011_2,  0.746_982_244_497_218_9,
        -0.867_666_149_019_004_7, -0.198_076_373_431_201_5,  0.455_983_776_175_066_9,
    )
}

/// Convert one ICRS `(ra, dec)` in degrees to Galactic `(l, b)` in degrees.
///
/// `l` is wrapped into `[0, 360)`.
pub fn icrs_to_galactic(ra_deg: f64, dec_deg: f64) -> (f64, f64) {
    let (ra, dec) = (ra_deg.to_radians(), dec_deg.to_radians());
    let eq = Vector3::new(dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin());
    let gal = icrs_to_galactic_matrix() * eq;

    let b = gal.z.clamp(-1.0, 1.0).asin();
    let l = gal.y.atan2(gal.x).to_degrees().rem_euclid(360.0);
    (l, b.to_degrees())
}

/// Express `positions` in the Galactic frame.
pub fn to_galactic(positions: &SkyPositions) -> SkyPositions {
    match positions.frame {
        Frame::Galactic => positions.clone(),
        Frame::Icrs => {
            let (longitude, latitude) = positions
                .longitude
                .iter()
                .zip(&positions.latitude)
                .map(|(&ra, &dec)| icrs_to_galactic(ra, dec))
                .unzip();
            SkyPositions {
                longitude,
                latitude,
                frame: Frame::Galactic,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angular_gap(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    #[test]
    fn galactic_centre_maps_to_origin() {
        let (l, b) = icrs_to_galactic(266.404_99, -28.936_17);
        assert!(angular_gap(l, 0.0) < 1e-3, "l = {l}");
        assert!(b.abs() < 1e-3, "b = {b}");
    }

    #[test]
    fn north_galactic_pole() {
        let (_, b) = icrs_to_galactic(192.859_48, 27.128_25);
        assert!((b - 90.0).abs() < 1e-3, "b = {b}");
    }

    #[test]
    fn galactic_positions_pass_through() {
        let pos = SkyPositions {
            longitude: vec![10.0],
            latitude: vec![-5.0],
            frame: Frame::Galactic,
        };
        assert_eq!(to_galactic(&pos), pos);
    }
}
