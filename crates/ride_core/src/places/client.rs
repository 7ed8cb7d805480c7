use reqwest::{blocking::Client, Url};
use serde::Deserialize;
use std::time::Duration;

use super::{PlaceSuggestion, PlacesLookup};
use crate::error::PlacesError;
use crate::geo::Coordinate;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const AUTOCOMPLETE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/place/autocomplete/json";
const DETAILS_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/place/details/json";
const DEFAULT_BIAS_RADIUS_M: u32 = 20_000;

/// Blocking client for Google Places autocomplete and details.
#[derive(Debug, Clone)]
pub struct GooglePlacesClient {
    client: Client,
    api_key: String,
}

impl GooglePlacesClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, PlacesError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    fn get<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T, PlacesError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(PlacesError::HttpStatus(status.as_u16()));
        }
        Ok(response.json()?)
    }
}

#[derive(Deserialize)]
struct AutocompleteResponse {
    status: String,
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
struct Prediction {
    place_id: String,
    description: String,
    structured_formatting: Option<StructuredFormatting>,
}

#[derive(Deserialize)]
struct StructuredFormatting {
    main_text: String,
    #[serde(default)]
    secondary_text: String,
}

#[derive(Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<DetailsResult>,
}

#[derive(Deserialize)]
struct DetailsResult {
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
struct Geometry {
    location: Option<LatLngLiteral>,
}

#[derive(Deserialize)]
struct LatLngLiteral {
    lat: f64,
    lng: f64,
}

impl PlacesLookup for GooglePlacesClient {
    fn autocomplete(
        &self,
        query: &str,
        near: Option<Coordinate>,
    ) -> Result<Vec<PlaceSuggestion>, PlacesError> {
        let mut url = Url::parse(AUTOCOMPLETE_ENDPOINT)
            .map_err(|err| PlacesError::Api(format!("failed to build places URL: {err}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("key", &self.api_key)
                .append_pair("input", query)
                .append_pair("types", "geocode");
            if let Some(near) = near {
                pairs
                    .append_pair(
                        "location",
                        &format!("{},{}", near.latitude, near.longitude),
                    )
                    .append_pair("radius", &DEFAULT_BIAS_RADIUS_M.to_string());
            }
        }

        let parsed: AutocompleteResponse = self.get(url)?;
        if parsed.status != "OK" && parsed.status != "ZERO_RESULTS" {
            return Err(PlacesError::Api(parsed.status));
        }
        Ok(parsed
            .predictions
            .into_iter()
            .map(|prediction| {
                let (name, subtitle) = match prediction.structured_formatting {
                    Some(formatting) => (formatting.main_text, formatting.secondary_text),
                    None => (prediction.description, String::new()),
                };
                PlaceSuggestion {
                    id: prediction.place_id,
                    name,
                    subtitle,
                    coordinate: None,
                }
            })
            .collect())
    }

    fn resolve(&self, place_id: &str) -> Result<Option<Coordinate>, PlacesError> {
        let mut url = Url::parse(DETAILS_ENDPOINT)
            .map_err(|err| PlacesError::Api(format!("failed to build places URL: {err}")))?;
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("place_id", place_id)
            .append_pair("fields", "geometry");

        let parsed: DetailsResponse = self.get(url)?;
        if parsed.status != "OK" {
            return Ok(None);
        }
        Ok(parsed
            .result
            .and_then(|result| result.geometry)
            .and_then(|geometry| geometry.location)
            .and_then(|location| Coordinate::new(location.lat, location.lng).ok()))
    }
}
