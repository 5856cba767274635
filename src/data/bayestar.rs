//! Dust reddening lookups.
//!
//! The magnitude pipeline only sees the [`ExtinctionMap`] trait. The default
//! implementation queries the Bayestar 3D dust map web service; tests and
//! offline runs use [`ZeroReddening`] or their own map.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::SkyPositions;
use crate::error::AppError;
use crate::math::to_galactic;

const DEFAULT_URL: &str = "http://argonaut.skymaps.info/gal-lb-query-light";
const DEFAULT_VERSION: &str = "bayestar2017";

/// One reddening request for a batch of stars.
#[derive(Debug, Clone, Copy)]
pub struct ReddeningQuery<'a> {
    pub positions: &'a SkyPositions,
    /// Distance to each star (pc).
    pub distances: &'a [f64],
}

/// A source of E(B-V) reddening values, one per star.
pub trait ExtinctionMap {
    fn reddening(&self, query: &ReddeningQuery<'_>) -> Result<Vec<f64>, AppError>;
}

/// A map with no dust anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroReddening;

impl ExtinctionMap for ZeroReddening {
    fn reddening(&self, query: &ReddeningQuery<'_>) -> Result<Vec<f64>, AppError> {
        Ok(vec![0.0; query.distances.len()])
    }
}

/// Blocking client for the Bayestar web query.
pub struct BayestarClient {
    client: Client,
    url: String,
    version: String,
}

impl BayestarClient {
    pub fn new(url: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            version: version.into(),
        }
    }

    /// Read `BAYESTAR_URL` / `BAYESTAR_VERSION` (a `.env` file is honoured),
    /// falling back to the public endpoint and the 2017 map.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let url = std::env::var("BAYESTAR_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let version =
            std::env::var("BAYESTAR_VERSION").unwrap_or_else(|_| DEFAULT_VERSION.to_string());
        Self::new(url, version)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ExtinctionMap for BayestarClient {
    fn reddening(&self, query: &ReddeningQuery<'_>) -> Result<Vec<f64>, AppError> {
        let body = build_request(query, &self.version);
        debug!(url = %self.url, stars = body.l.len(), "querying dust map");

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|e| AppError::service(format!("Dust map request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::service(format!(
                "Dust map request failed with status {}.",
                resp.status()
            )));
        }

        let body: QueryResponse = resp
            .json()
            .map_err(|e| AppError::service(format!("Failed to parse dust map response: {e}")))?;

        Ok(decode_response(body))
    }
}

/// Request body: Galactic coordinates (deg) and distances (kpc).
#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    l: Vec<f64>,
    b: Vec<f64>,
    d: Vec<f64>,
    mode: &'static str,
    version: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(alias = "EBV")]
    ebv: Vec<Option<f64>>,
}

fn build_request<'a>(query: &ReddeningQuery<'_>, version: &'a str) -> QueryRequest<'a> {
    let galactic = to_galactic(query.positions);
    QueryRequest {
        l: galactic.longitude,
        b: galactic.latitude,
        d: query.distances.iter().map(|pc| pc / 1000.0).collect(),
        mode: "median",
        version,
    }
}

/// Stars outside the map footprint come back as `null`; they get no reddening.
fn decode_response(body: QueryResponse) -> Vec<f64> {
    let missing = body.ebv.iter().filter(|v| v.is_none()).count();
    if missing > 0 {
        debug!(missing, "dust map has no coverage for some stars; using zero reddening");
    }
    body.ebv.into_iter().map(|v| v.unwrap_or(0.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frame;

    #[test]
    fn request_is_galactic_in_kpc() {
        let positions = SkyPositions {
            longitude: vec![266.404_99],
            latitude: vec![-28.936_17],
            frame: Frame::Icrs,
        };
        let distances = [8000.0];
        let query = ReddeningQuery {
            positions: &positions,
            distances: &distances,
        };

        let req = build_request(&query, "bayestar2017");
        assert!(req.b[0].abs() < 1e-3);
        assert!(req.l[0] < 1e-3 || req.l[0] > 360.0 - 1e-3);
        assert_eq!(req.d, vec![8.0]);

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["mode"], "median");
        assert_eq!(json["version"], "bayestar2017");
    }

    #[test]
    fn null_reddening_becomes_zero() {
        let body: QueryResponse = serde_json::from_str(r#"{"EBV": [0.12, null, 0.3]}"#).unwrap();
        assert_eq!(decode_response(body), vec![0.12, 0.0, 0.3]);
    }

    #[test]
    fn zero_map_matches_batch() {
        let positions = SkyPositions {
            longitude: vec![1.0, 2.0],
            latitude: vec![3.0, 4.0],
            frame: Frame::Galactic,
        };
        let distances = [100.0, 200.0];
        let query = ReddeningQuery {
            positions: &positions,
            distances: &distances,
        };
        assert_eq!(ZeroReddening.reddening(&query).unwrap(), vec![0.0, 0.0]);
    }
}
