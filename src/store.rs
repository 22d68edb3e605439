use std::str::FromStr;
use std::time::Duration;

use jiff::civil::DateTime;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use crate::error::AppError;
use crate::geometry;

/// One GPS sample for a vehicle, as served to API callers. `geometry` is
/// plain WKT here; the stored native form never leaves this module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: Option<i64>,
    pub longitude: f64,
    pub latitude: f64,
    pub speed: f64,
    pub gps_time: DateTime,
    pub vehicle_id: i64,
    pub geometry: String,
}

/// A row prepared by the loader for insertion. `geometry` is the EWKT
/// literal synthesized from the coordinates.
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub id: Option<i64>,
    pub longitude: f64,
    pub latitude: f64,
    pub speed: f64,
    pub gps_time: DateTime,
    pub vehicle_id: i64,
    pub geometry: String,
}

#[derive(FromRow)]
struct TrackRow {
    id: i64,
    longitude: f64,
    latitude: f64,
    speed: f64,
    gps_time: String,
    vehicle_id: i64,
    geometry: String,
}

impl TrackRow {
    fn into_record(self) -> Result<TrackRecord, AppError> {
        Ok(TrackRecord {
            id: Some(self.id),
            longitude: self.longitude,
            latitude: self.latitude,
            speed: self.speed,
            gps_time: self.gps_time.parse()?,
            vehicle_id: self.vehicle_id,
            geometry: geometry::ewkt_to_wkt(&self.geometry)?,
        })
    }
}

/// Canonical stored form of `gps_time`: fixed-width ISO-8601 with microsecond
/// padding, so lexicographic comparison in SQL equals temporal comparison.
fn format_gps_time(dt: &DateTime) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:06}",
        dt.year(),
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.subsec_nanosecond() / 1000
    )
}

const SELECT_COLUMNS: &str = "id, longitude, latitude, speed, gps_time, vehicle_id, geometry";

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        // Prevent transient "database is locked" errors under concurrent reads.
        .busy_timeout(Duration::from_secs(5));

    // SQLite permits limited write concurrency; a single connection also keeps
    // in-memory databases alive for the whole pool lifetime.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS track (
            id          INTEGER PRIMARY KEY,
            longitude   REAL    NOT NULL,
            latitude    REAL    NOT NULL,
            speed       REAL    NOT NULL,
            gps_time    TEXT    NOT NULL,
            vehicle_id  INTEGER NOT NULL,
            geometry    TEXT    NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_track_vehicle_time ON track (vehicle_id, gps_time)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Latest record per distinct vehicle. The window function guarantees exactly
/// one row per vehicle even when two records tie on the maximum `gps_time`.
pub async fn latest_per_vehicle(pool: &SqlitePool) -> Result<Vec<TrackRecord>, AppError> {
    let rows: Vec<TrackRow> = sqlx::query_as(&format!(
        "SELECT {SELECT_COLUMNS} FROM (
            SELECT *, ROW_NUMBER() OVER (
                PARTITION BY vehicle_id ORDER BY gps_time DESC
            ) AS rn FROM track
        ) WHERE rn = 1 ORDER BY vehicle_id"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TrackRow::into_record).collect()
}

/// Latest record for one vehicle, or `None` if it has no records.
pub async fn latest_for_vehicle(
    pool: &SqlitePool,
    vehicle_id: i64,
) -> Result<Option<TrackRecord>, AppError> {
    let row: Option<TrackRow> = sqlx::query_as(&format!(
        "SELECT {SELECT_COLUMNS} FROM track
         WHERE vehicle_id = ? ORDER BY gps_time DESC LIMIT 1"
    ))
    .bind(vehicle_id)
    .fetch_optional(pool)
    .await?;

    row.map(TrackRow::into_record).transpose()
}

/// All records for one vehicle with `gps_time` in the closed interval
/// `[start, end]`, ascending by time.
pub async fn range_for_vehicle(
    pool: &SqlitePool,
    vehicle_id: i64,
    start: &DateTime,
    end: &DateTime,
) -> Result<Vec<TrackRecord>, AppError> {
    let rows: Vec<TrackRow> = sqlx::query_as(&format!(
        "SELECT {SELECT_COLUMNS} FROM track
         WHERE vehicle_id = ? AND gps_time >= ? AND gps_time <= ?
         ORDER BY gps_time ASC"
    ))
    .bind(vehicle_id)
    .bind(format_gps_time(start))
    .bind(format_gps_time(end))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TrackRow::into_record).collect()
}

pub async fn exists_for_vehicle(pool: &SqlitePool, vehicle_id: i64) -> Result<bool, AppError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM track WHERE vehicle_id = ?)")
            .bind(vehicle_id)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Bulk insert for the batch loader. One transaction; any failing row rolls
/// the whole batch back.
pub async fn insert_all(pool: &SqlitePool, rows: &[NewTrack]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for row in rows {
        sqlx::query(
            "INSERT INTO track (id, longitude, latitude, speed, gps_time, vehicle_id, geometry)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.id)
        .bind(row.longitude)
        .bind(row.latitude)
        .bind(row.speed)
        .bind(format_gps_time(&row.gps_time))
        .bind(row.vehicle_id)
        .bind(&row.geometry)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}
