//! Minimal Google Directions JSON response structures.

use serde::Deserialize;

#[derive(Deserialize)]
pub(super) struct DirectionsResponse {
    pub(super) status: String,
    #[serde(default)]
    pub(super) error_message: Option<String>,
    #[serde(default)]
    pub(super) routes: Vec<DirectionsRoute>,
}

#[derive(Deserialize)]
pub(super) struct DirectionsRoute {
    pub(super) overview_polyline: Option<EncodedPolyline>,
    #[serde(default)]
    pub(super) legs: Vec<DirectionsLeg>,
}

#[derive(Deserialize)]
pub(super) struct EncodedPolyline {
    pub(super) points: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct DirectionsLeg {
    pub(super) distance: Option<TextValue>,
    pub(super) duration: Option<TextValue>,
    #[serde(default)]
    pub(super) steps: Vec<DirectionsStep>,
}

#[derive(Deserialize)]
pub(super) struct DirectionsStep {
    pub(super) html_instructions: Option<String>,
    pub(super) distance: Option<TextValue>,
    pub(super) duration: Option<TextValue>,
}

/// `{ "text": "1.2 km", "value": 1234 }`; only the numeric value is used.
#[derive(Deserialize)]
pub(super) struct TextValue {
    pub(super) value: f64,
}

pub(super) fn value_or_zero(field: &Option<TextValue>) -> f64 {
    field.as_ref().map(|field| field.value).unwrap_or(0.0)
}
