use axum::{
    Json,
    extract::{Path, Query, State},
};
use jiff::civil::{Date, DateTime};
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::filters::{self, InvalidFilter};
use crate::store::{self, TrackRecord};

/// Optional filter parameters on the track endpoint. Kept as raw strings so
/// parse failures surface as 422 filter errors, not framework 400s.
#[derive(Debug, Deserialize)]
pub struct TrackQuery {
    pub for_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// GET /api/v1/vehicles/: latest track per known vehicle.
#[tracing::instrument(skip_all)]
pub async fn latest_tracks(
    State(state): State<AppState>,
) -> Result<Json<Vec<TrackRecord>>, AppError> {
    let tracks = store::latest_per_vehicle(&state.pool).await?;
    Ok(Json(tracks))
}

/// GET /api/v1/vehicles/:vehicle_id: latest track for one vehicle.
#[tracing::instrument(skip_all, fields(vehicle_id = %vehicle_id))]
pub async fn latest_track_for_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<i64>,
) -> Result<Json<TrackRecord>, AppError> {
    if !store::exists_for_vehicle(&state.pool, vehicle_id).await? {
        return Err(AppError::NotFound(format!(
            "no records for vehicle {vehicle_id}"
        )));
    }
    // Existence was just confirmed and nothing deletes, so a miss here is an
    // invariant violation; it still maps to NotFound.
    match store::latest_for_vehicle(&state.pool, vehicle_id).await? {
        Some(track) => Ok(Json(track)),
        None => Err(AppError::NotFound(format!(
            "no records for vehicle {vehicle_id}"
        ))),
    }
}

/// GET /api/v1/vehicles/:vehicle_id/track: records for one vehicle within a
/// day or an explicit time range. Unknown vehicles 404 before any filter
/// validation runs.
#[tracing::instrument(skip_all, fields(vehicle_id = %vehicle_id))]
pub async fn tracks_for_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<i64>,
    Query(params): Query<TrackQuery>,
) -> Result<Json<Vec<TrackRecord>>, AppError> {
    if !store::exists_for_vehicle(&state.pool, vehicle_id).await? {
        return Err(AppError::NotFound(format!(
            "no records for vehicle {vehicle_id}"
        )));
    }

    let for_date = params.for_date.as_deref().map(parse_date).transpose()?;
    let start_time = params
        .start_time
        .as_deref()
        .map(|v| parse_datetime("start_time", v))
        .transpose()?;
    let end_time = params
        .end_time
        .as_deref()
        .map(|v| parse_datetime("end_time", v))
        .transpose()?;

    let range = filters::validate(for_date, start_time, end_time)?;

    let tracks = store::range_for_vehicle(&state.pool, vehicle_id, &range.start, &range.end).await?;
    if tracks.is_empty() {
        return Err(AppError::NotFound(format!(
            "no records for vehicle {vehicle_id} in range {} to {}",
            range.start, range.end
        )));
    }
    Ok(Json(tracks))
}

fn parse_date(value: &str) -> Result<Date, InvalidFilter> {
    value.trim().parse().map_err(|_| InvalidFilter::Unparsable {
        param: "for_date",
        value: value.to_string(),
    })
}

fn parse_datetime(param: &'static str, value: &str) -> Result<DateTime, InvalidFilter> {
    // Accept both "YYYY-MM-DDTHH:MM:SS" and the space-separated form.
    value
        .trim()
        .replace(' ', "T")
        .parse()
        .map_err(|_| InvalidFilter::Unparsable {
            param,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::{date, datetime};

    #[test]
    fn parses_dates_and_timestamps() {
        assert_eq!(parse_date("2023-06-15"), Ok(date(2023, 6, 15)));
        assert_eq!(
            parse_datetime("start_time", "2023-06-15T08:30:00"),
            Ok(datetime(2023, 6, 15, 8, 30, 0, 0))
        );
        assert_eq!(
            parse_datetime("start_time", "2023-06-15 08:30:00"),
            Ok(datetime(2023, 6, 15, 8, 30, 0, 0))
        );
    }

    #[test]
    fn bad_inputs_become_filter_errors() {
        assert!(matches!(
            parse_date("15/06/2023"),
            Err(InvalidFilter::Unparsable { param: "for_date", .. })
        ));
        assert!(matches!(
            parse_datetime("end_time", "noon"),
            Err(InvalidFilter::Unparsable { param: "end_time", .. })
        ));
    }
}
