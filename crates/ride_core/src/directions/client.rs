use reqwest::{blocking::Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

use super::error::DirectionsError;
use super::parser::parse_directions_json;
use super::{DirectionsGateway, RouteResult};
use crate::geo::Coordinate;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_DIRECTIONS_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Thin blocking client for the Google Directions API.
#[derive(Debug, Clone)]
pub struct GoogleDirectionsClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GoogleDirectionsClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, DirectionsError> {
        Self::with_endpoint(DEFAULT_DIRECTIONS_ENDPOINT, api_key)
    }

    /// Point the client at a different endpoint (a proxy or a local stub server).
    pub fn with_endpoint(
        endpoint: &str,
        api_key: impl Into<String>,
    ) -> Result<Self, DirectionsError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.into(),
        })
    }

    /// Request a driving route and parse the first route's first leg.
    pub fn fetch(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteResult, DirectionsError> {
        let mut url = Url::parse(&self.endpoint).map_err(|err| DirectionsError::Api {
            status: "INVALID_ENDPOINT".to_string(),
            message: Some(err.to_string()),
        })?;
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair(
                "origin",
                &format!("{},{}", origin.latitude, origin.longitude),
            )
            .append_pair(
                "destination",
                &format!("{},{}", destination.latitude, destination.longitude),
            )
            .append_pair("mode", "driving");

        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(DirectionsError::HttpStatus(status.as_u16()));
        }
        let body = response.text()?;
        parse_directions_json(&body)
    }
}

impl DirectionsGateway for GoogleDirectionsClient {
    fn fetch_route(&self, origin: Coordinate, destination: Coordinate) -> Option<RouteResult> {
        match self.fetch(origin, destination) {
            Ok(route) => Some(route),
            Err(DirectionsError::ZeroResults) => {
                debug!("directions returned zero results");
                None
            }
            Err(error) => {
                warn!(%error, "directions fetch failed, using straight-line route");
                None
            }
        }
    }
}
