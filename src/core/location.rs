use thiserror::Error;

use crate::models::Coordinate;

/// Why a location string could not be turned into a [`Coordinate`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("location is missing")]
    Empty,

    #[error("location must be exactly \"<lat>,<lon>\": {0:?}")]
    Malformed(String),

    #[error("coordinate is not a number: {0:?}")]
    NotNumeric(String),

    #[error("coordinate ({latitude}, {longitude}) is out of range")]
    OutOfRange { latitude: f64, longitude: f64 },
}

/// Parse a raw `"<lat>,<lon>"` string into a validated coordinate
///
/// Only the exact two-token split is accepted. Surrounding whitespace,
/// extra separators and non-finite values are all rejected.
pub fn parse_location(raw: Option<&str>) -> Result<Coordinate, LocationError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(LocationError::Empty),
    };

    let (lat, lon) = raw
        .split_once(',')
        .filter(|(_, rest)| !rest.contains(','))
        .ok_or_else(|| LocationError::Malformed(raw.to_string()))?;

    let latitude = parse_component(lat)?;
    let longitude = parse_component(lon)?;

    Coordinate::new(latitude, longitude)
}

/// Validate a query-supplied latitude/longitude pair
///
/// Used where the two components arrive separately (query strings) rather
/// than as one stored location string.
pub fn parse_query_coordinate(
    latitude: Option<&str>,
    longitude: Option<&str>,
) -> Result<Coordinate, LocationError> {
    let (Some(lat), Some(lon)) = (latitude, longitude) else {
        return Err(LocationError::Empty);
    };

    let latitude = parse_component(lat.trim())?;
    let longitude = parse_component(lon.trim())?;

    Coordinate::new(latitude, longitude)
}

#[inline]
fn parse_component(token: &str) -> Result<f64, LocationError> {
    token
        .parse::<f64>()
        .map_err(|_| LocationError::NotNumeric(token.to_string()))
}
