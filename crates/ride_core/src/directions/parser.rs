use super::error::DirectionsError;
use super::response::{value_or_zero, DirectionsResponse};
use super::{RawStep, RouteResult};

/// Parse a Directions API body into the first route's first leg.
pub fn parse_directions_json(body: &str) -> Result<RouteResult, DirectionsError> {
    let response: DirectionsResponse = serde_json::from_str(body)?;
    parse_directions_response(response)
}

pub(super) fn parse_directions_response(
    resp: DirectionsResponse,
) -> Result<RouteResult, DirectionsError> {
    match resp.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Err(DirectionsError::ZeroResults),
        _ => {
            return Err(DirectionsError::Api {
                status: resp.status,
                message: resp.error_message,
            })
        }
    }

    let route = resp
        .routes
        .into_iter()
        .next()
        .ok_or(DirectionsError::MissingRoute)?;
    let encoded_polyline = route
        .overview_polyline
        .and_then(|polyline| polyline.points)
        .filter(|points| !points.is_empty())
        .ok_or(DirectionsError::MissingRoute)?;
    let leg = route
        .legs
        .into_iter()
        .next()
        .ok_or(DirectionsError::MissingRoute)?;

    let steps = leg
        .steps
        .iter()
        .map(|step| RawStep {
            instruction_markup: step.html_instructions.clone().unwrap_or_default(),
            distance_meters: value_or_zero(&step.distance),
            duration_seconds: value_or_zero(&step.duration),
        })
        .collect();

    Ok(RouteResult {
        encoded_polyline,
        distance_meters: value_or_zero(&leg.distance),
        duration_seconds: value_or_zero(&leg.duration),
        steps,
    })
}
