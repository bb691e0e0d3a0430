//! Route extraction and polyline encoding.

use geo::Coord;

use crate::processing::types::FieldMap;

/// Polyline precision (1e5), the format map clients expect.
pub const ROUTE_PRECISION: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Failed to encode map polyline: {0}")]
    Encode(String),
}

/// Positions of the samples that carry both coordinates, in sample order.
/// `x` is longitude and `y` latitude, in degrees.
pub fn route_points(records: &[FieldMap]) -> Vec<Coord<f64>> {
    records
        .iter()
        .filter_map(|record| {
            let lat = record.degrees_f64("position_lat")?;
            let lng = record.degrees_f64("position_long")?;
            Some(Coord { x: lng, y: lat })
        })
        .collect()
}

/// Encode a route; an empty route has no polyline.
pub fn encode_route(points: &[Coord<f64>]) -> Result<Option<String>, RouteError> {
    if points.is_empty() {
        return Ok(None);
    }

    polyline::encode_coordinates(points.iter().copied(), ROUTE_PRECISION)
        .map(Some)
        .map_err(|e| RouteError::Encode(e.to_string()))
}
