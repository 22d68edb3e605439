use thiserror::Error;

/// Spatial reference identifier for WGS84 geographic coordinates.
pub const SRID_WGS84: u32 = 4326;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("not a point geometry: '{0}'")]
    NotAPoint(String),
    #[error("bad coordinates in geometry: '{0}'")]
    BadCoordinates(String),
}

/// Builds the stored geometry literal for a coordinate pair, longitude first.
pub fn to_ewkt(longitude: f64, latitude: f64) -> String {
    format!("SRID={SRID_WGS84};POINT({longitude} {latitude})")
}

/// Converts the store's native geometry literal (EWKT, optionally without the
/// SRID prefix) into plain WKT for responses. This is the only place in the
/// crate that knows how geometry is persisted.
pub fn ewkt_to_wkt(raw: &str) -> Result<String, GeometryError> {
    let value = raw.trim();
    let value = match value.split_once(';') {
        Some((srid, rest)) if srid.starts_with("SRID=") => rest,
        Some(_) => return Err(GeometryError::NotAPoint(raw.to_string())),
        None => value,
    };

    let inner = value
        .strip_prefix("POINT")
        .map(str::trim)
        .and_then(|v| v.strip_prefix('('))
        .and_then(|v| v.strip_suffix(')'))
        .ok_or_else(|| GeometryError::NotAPoint(raw.to_string()))?;

    let mut coords = inner.split_whitespace();
    let longitude: f64 = coords
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| GeometryError::BadCoordinates(raw.to_string()))?;
    let latitude: f64 = coords
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| GeometryError::BadCoordinates(raw.to_string()))?;
    if coords.next().is_some() {
        return Err(GeometryError::BadCoordinates(raw.to_string()));
    }

    Ok(format!("POINT ({longitude} {latitude})"))
}
