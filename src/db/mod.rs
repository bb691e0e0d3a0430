//! SQLite persistence for import audit rows and the workout graph.
//!
//! Fixed-point values are stored as canonical decimal text so they read back
//! exactly; ids of imports, workouts and users are UUID text.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    DeviceInfo, FileIdentity, ImportRecord, ImportStatus, IntensityLevel, Lap, LapTrigger,
    RecordPoint, Sport, SubSport, Workout, WorkoutGraph, WorkoutSource,
};

/// SQLite caps bound parameters per statement at 32766.
const MAX_BOUND_PARAMETERS: usize = 32_766;

const IMPORT_COLUMNS: &str = "id, user_id, workout_id, original_filename, file_size, file_hash, \
     storage_path, fit_serial_number, fit_time_created, fit_manufacturer, fit_product, fit_type, \
     status, error_message, uploaded_at, processed_at";

const WORKOUT_COLUMNS: &str = "id, user_id, session_id, title, source, external_id, sport, \
     sub_sport, started_at, ended_at, total_elapsed_time, total_timer_time, total_moving_time, \
     total_distance, total_ascent, total_descent, min_altitude, max_altitude, total_calories, \
     total_work, avg_heart_rate, max_heart_rate, min_heart_rate, avg_speed, max_speed, avg_power, \
     max_power, normalized_power, avg_cadence, max_cadence, training_stress_score, \
     intensity_factor, training_effect_aerobic, training_effect_anaerobic, \
     avg_vertical_oscillation, avg_stance_time, avg_stride_length, avg_vertical_ratio, \
     total_strokes, avg_stroke_distance, pool_length, start_lat, start_long, end_lat, end_long, \
     map_polyline";

const LAP_COLUMNS: &str = "workout_id, lap_number, lap_trigger, intensity, started_at, ended_at, \
     total_elapsed_time, total_timer_time, total_distance, total_ascent, total_descent, \
     min_altitude, max_altitude, total_calories, total_work, avg_heart_rate, max_heart_rate, \
     avg_speed, max_speed, avg_power, max_power, normalized_power, avg_cadence, max_cadence, \
     avg_vertical_oscillation, avg_stance_time, avg_stride_length, avg_vertical_ratio, \
     start_lat, start_long, end_lat, end_long";
const LAP_COLUMN_COUNT: usize = 32;

const RECORD_COLUMNS: &str = "workout_id, timestamp, elapsed_seconds, latitude, longitude, \
     altitude, distance, speed, heart_rate, power, accumulated_power, cadence, \
     vertical_oscillation, stance_time, stride_length, vertical_ratio, temperature, activity_type";
const RECORD_COLUMN_COUNT: usize = 18;

const DEVICE_COLUMNS: &str = "workout_id, device_index, manufacturer, product_name, product_id, \
     serial_number, device_type, software_version, hardware_version, battery_status, \
     battery_level";

/// How a graph insert ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Graph committed and the import row flipped to `completed`.
    Completed { processed_at: DateTime<Utc> },
    /// Another import of the same file by the same user completed first.
    /// Nothing was written.
    AlreadyCompleted,
}

/// Row counts below one workout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphCounts {
    pub workouts: i64,
    pub laps: i64,
    pub records: i64,
    pub devices: i64,
}

/// Database handle for the import pipeline.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `database_url` and run
    /// migrations. In-memory databases are pinned to one connection so every
    /// query sees the same data.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = database_url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get a reference to the pool for advanced operations
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        self.migrate_workouts().await?;
        self.migrate_imports().await?;
        Ok(())
    }

    async fn migrate_workouts(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS workouts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                session_id INTEGER,
                title TEXT NOT NULL,
                source TEXT NOT NULL,
                external_id TEXT,
                sport TEXT NOT NULL,
                sub_sport TEXT NOT NULL,
                started_at TEXT,
                ended_at TEXT,
                total_elapsed_time TEXT,
                total_timer_time TEXT,
                total_moving_time TEXT,
                total_distance TEXT,
                total_ascent INTEGER,
                total_descent INTEGER,
                min_altitude TEXT,
                max_altitude TEXT,
                total_calories INTEGER,
                total_work INTEGER,
                avg_heart_rate INTEGER,
                max_heart_rate INTEGER,
                min_heart_rate INTEGER,
                avg_speed TEXT,
                max_speed TEXT,
                avg_power INTEGER,
                max_power INTEGER,
                normalized_power INTEGER,
                avg_cadence INTEGER,
                max_cadence INTEGER,
                training_stress_score TEXT,
                intensity_factor TEXT,
                training_effect_aerobic TEXT,
                training_effect_anaerobic TEXT,
                avg_vertical_oscillation TEXT,
                avg_stance_time TEXT,
                avg_stride_length TEXT,
                avg_vertical_ratio TEXT,
                total_strokes INTEGER,
                avg_stroke_distance TEXT,
                pool_length TEXT,
                start_lat TEXT,
                start_long TEXT,
                end_lat TEXT,
                end_long TEXT,
                map_polyline TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_workouts_user_started ON workouts(user_id, started_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS laps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workout_id TEXT NOT NULL REFERENCES workouts(id) ON DELETE CASCADE,
                lap_number INTEGER NOT NULL,
                lap_trigger TEXT NOT NULL,
                intensity TEXT NOT NULL,
                started_at TEXT,
                ended_at TEXT,
                total_elapsed_time TEXT,
                total_timer_time TEXT,
                total_distance TEXT,
                total_ascent INTEGER,
                total_descent INTEGER,
                min_altitude TEXT,
                max_altitude TEXT,
                total_calories INTEGER,
                total_work INTEGER,
                avg_heart_rate INTEGER,
                max_heart_rate INTEGER,
                avg_speed TEXT,
                max_speed TEXT,
                avg_power INTEGER,
                max_power INTEGER,
                normalized_power INTEGER,
                avg_cadence INTEGER,
                max_cadence INTEGER,
                avg_vertical_oscillation TEXT,
                avg_stance_time TEXT,
                avg_stride_length TEXT,
                avg_vertical_ratio TEXT,
                start_lat TEXT,
                start_long TEXT,
                end_lat TEXT,
                end_long TEXT,
                UNIQUE(workout_id, lap_number)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS record_points (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workout_id TEXT NOT NULL REFERENCES workouts(id) ON DELETE CASCADE,
                timestamp TEXT NOT NULL,
                elapsed_seconds TEXT NOT NULL,
                latitude TEXT,
                longitude TEXT,
                altitude TEXT,
                distance TEXT,
                speed TEXT,
                heart_rate INTEGER,
                power INTEGER,
                accumulated_power INTEGER,
                cadence INTEGER,
                vertical_oscillation TEXT,
                stance_time TEXT,
                stride_length TEXT,
                vertical_ratio TEXT,
                temperature TEXT,
                activity_type TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_record_points_workout_ts ON record_points(workout_id, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS device_infos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workout_id TEXT NOT NULL REFERENCES workouts(id) ON DELETE CASCADE,
                device_index TEXT NOT NULL,
                manufacturer TEXT,
                product_name TEXT,
                product_id INTEGER,
                serial_number TEXT,
                device_type TEXT,
                software_version TEXT,
                hardware_version TEXT,
                battery_status TEXT,
                battery_level INTEGER,
                UNIQUE(workout_id, device_index)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn migrate_imports(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS import_records (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                workout_id TEXT REFERENCES workouts(id) ON DELETE SET NULL,
                original_filename TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                file_hash TEXT NOT NULL,
                storage_path TEXT,
                fit_serial_number TEXT,
                fit_time_created TEXT,
                fit_manufacturer TEXT,
                fit_product TEXT,
                fit_type TEXT,
                status TEXT NOT NULL,
                error_message TEXT,
                uploaded_at TEXT NOT NULL,
                processed_at TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_import_records_user_uploaded ON import_records(user_id, uploaded_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        // At most one live completed import per (user, file content).
        sqlx::query(
            r"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_import_records_completed_hash
            ON import_records(user_id, file_hash)
            WHERE status = 'completed' AND workout_id IS NOT NULL
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Import records
    // ------------------------------------------------------------------

    pub async fn create_import(&self, record: &ImportRecord) -> Result<(), sqlx::Error> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("INSERT INTO import_records ({IMPORT_COLUMNS}) "));
        builder.push_values(std::iter::once(record), |mut b, r| {
            b.push_bind(r.id.to_string())
                .push_bind(r.user_id.to_string())
                .push_bind(r.workout_id.map(|id| id.to_string()))
                .push_bind(r.original_filename.clone())
                .push_bind(r.file_size)
                .push_bind(r.file_hash.clone())
                .push_bind(r.storage_path.clone())
                .push_bind(r.identity.serial_number.clone())
                .push_bind(r.identity.time_created)
                .push_bind(r.identity.manufacturer.clone())
                .push_bind(r.identity.product.clone())
                .push_bind(r.identity.file_type.clone())
                .push_bind(r.status.as_str())
                .push_bind(r.error_message.clone())
                .push_bind(r.uploaded_at)
                .push_bind(r.processed_at);
        });
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    /// Latest completed import of this content for this user whose workout
    /// still exists.
    pub async fn find_completed_import(
        &self,
        user_id: Uuid,
        file_hash: &str,
    ) -> Result<Option<ImportRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {IMPORT_COLUMNS} FROM import_records \
             WHERE user_id = ? AND file_hash = ? AND status = 'completed' \
             AND workout_id IS NOT NULL \
             ORDER BY processed_at DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(user_id.to_string())
            .bind(file_hash)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(import_from_row).transpose()
    }

    pub async fn get_import(&self, id: Uuid) -> Result<Option<ImportRecord>, sqlx::Error> {
        let sql = format!("SELECT {IMPORT_COLUMNS} FROM import_records WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(import_from_row).transpose()
    }

    /// Import `id` if it belongs to `user_id`.
    pub async fn get_import_for_user(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ImportRecord>, sqlx::Error> {
        Ok(self
            .get_import(id)
            .await?
            .filter(|record| record.user_id == user_id))
    }

    /// Newest first.
    pub async fn list_imports(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ImportRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {IMPORT_COLUMNS} FROM import_records WHERE user_id = ? \
             ORDER BY uploaded_at DESC LIMIT ?"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(import_from_row).collect()
    }

    pub async fn mark_import_failed(&self, id: Uuid, message: &str) -> Result<(), sqlx::Error> {
        self.finish_import(id, ImportStatus::Failed, Some(message))
            .await
    }

    pub async fn mark_import_duplicate(
        &self,
        id: Uuid,
        message: &str,
    ) -> Result<(), sqlx::Error> {
        self.finish_import(id, ImportStatus::Duplicate, Some(message))
            .await
    }

    async fn finish_import(
        &self,
        id: Uuid,
        status: ImportStatus,
        message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE import_records SET status = ?, error_message = ?, processed_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(message)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Workout graph
    // ------------------------------------------------------------------

    /// Insert the whole graph and complete import `import_id` in one
    /// transaction. Any error rolls everything back.
    pub async fn persist_graph(
        &self,
        import_id: Uuid,
        graph: &WorkoutGraph,
        batch_size: usize,
    ) -> Result<PersistOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        insert_workout(&mut tx, &graph.workout).await?;

        for chunk in graph.laps.chunks(MAX_BOUND_PARAMETERS / LAP_COLUMN_COUNT) {
            insert_laps(&mut tx, chunk).await?;
        }

        let record_batch = batch_size.clamp(1, MAX_BOUND_PARAMETERS / RECORD_COLUMN_COUNT);
        for chunk in graph.records.chunks(record_batch) {
            insert_record_points(&mut tx, chunk).await?;
        }

        if !graph.devices.is_empty() {
            insert_devices(&mut tx, &graph.devices).await?;
        }

        let processed_at = Utc::now();
        let completed = sqlx::query(
            "UPDATE import_records SET status = ?, workout_id = ?, processed_at = ?, error_message = NULL WHERE id = ?",
        )
        .bind(ImportStatus::Completed.as_str())
        .bind(graph.workout.id.to_string())
        .bind(processed_at)
        .bind(import_id.to_string())
        .execute(&mut *tx)
        .await;

        match completed {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                tx.rollback().await?;
                return Ok(PersistOutcome::AlreadyCompleted);
            }
            Err(err) => return Err(err),
        }

        tx.commit().await?;
        Ok(PersistOutcome::Completed { processed_at })
    }

    pub async fn get_workout(&self, id: Uuid) -> Result<Option<Workout>, sqlx::Error> {
        let sql = format!("SELECT {WORKOUT_COLUMNS} FROM workouts WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(workout_from_row).transpose()
    }

    /// Ordered by lap number.
    pub async fn laps_for(&self, workout_id: Uuid) -> Result<Vec<Lap>, sqlx::Error> {
        let sql =
            format!("SELECT {LAP_COLUMNS} FROM laps WHERE workout_id = ? ORDER BY lap_number");
        let rows = sqlx::query(&sql)
            .bind(workout_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(lap_from_row).collect()
    }

    /// Ordered by elapsed seconds, then insertion order.
    pub async fn record_points_for(
        &self,
        workout_id: Uuid,
    ) -> Result<Vec<RecordPoint>, sqlx::Error> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM record_points WHERE workout_id = ? \
             ORDER BY CAST(elapsed_seconds AS REAL), id"
        );
        let rows = sqlx::query(&sql)
            .bind(workout_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_point_from_row).collect()
    }

    pub async fn devices_for(&self, workout_id: Uuid) -> Result<Vec<DeviceInfo>, sqlx::Error> {
        let sql =
            format!("SELECT {DEVICE_COLUMNS} FROM device_infos WHERE workout_id = ? ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(workout_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(device_from_row).collect()
    }

    /// Delete a workout; its laps, samples and devices go with it.
    pub async fn delete_workout(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM workouts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn graph_counts(&self, workout_id: Uuid) -> Result<GraphCounts, sqlx::Error> {
        let id = workout_id.to_string();
        let row = sqlx::query(
            r"
            SELECT
                (SELECT COUNT(*) FROM workouts WHERE id = ?1) AS workouts,
                (SELECT COUNT(*) FROM laps WHERE workout_id = ?1) AS laps,
                (SELECT COUNT(*) FROM record_points WHERE workout_id = ?1) AS records,
                (SELECT COUNT(*) FROM device_infos WHERE workout_id = ?1) AS devices
            ",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(GraphCounts {
            workouts: row.try_get("workouts")?,
            laps: row.try_get("laps")?,
            records: row.try_get("records")?,
            devices: row.try_get("devices")?,
        })
    }

    /// Workouts owned by `user_id`, regardless of how they were created.
    pub async fn count_workouts(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM workouts WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await
    }

    pub async fn count_imports(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM import_records WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await
    }
}

type Tx<'c> = sqlx::Transaction<'c, Sqlite>;

async fn insert_workout(tx: &mut Tx<'_>, w: &Workout) -> Result<(), sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("INSERT INTO workouts ({WORKOUT_COLUMNS}) "));
    builder.push_values(std::iter::once(w), |mut b, w| {
        b.push_bind(w.id.to_string())
            .push_bind(w.user_id.to_string())
            .push_bind(w.session_id)
            .push_bind(w.title.clone())
            .push_bind(w.source.as_str())
            .push_bind(w.external_id.clone())
            .push_bind(w.sport.as_str())
            .push_bind(w.sub_sport.as_str())
            .push_bind(w.started_at)
            .push_bind(w.ended_at)
            .push_bind(dec(w.total_elapsed_time))
            .push_bind(dec(w.total_timer_time))
            .push_bind(dec(w.total_moving_time))
            .push_bind(dec(w.total_distance))
            .push_bind(w.total_ascent)
            .push_bind(w.total_descent)
            .push_bind(dec(w.min_altitude))
            .push_bind(dec(w.max_altitude))
            .push_bind(w.total_calories)
            .push_bind(w.total_work)
            .push_bind(w.avg_heart_rate)
            .push_bind(w.max_heart_rate)
            .push_bind(w.min_heart_rate)
            .push_bind(dec(w.avg_speed))
            .push_bind(dec(w.max_speed))
            .push_bind(w.avg_power)
            .push_bind(w.max_power)
            .push_bind(w.normalized_power)
            .push_bind(w.avg_cadence)
            .push_bind(w.max_cadence)
            .push_bind(dec(w.training_stress_score))
            .push_bind(dec(w.intensity_factor))
            .push_bind(dec(w.training_effect_aerobic))
            .push_bind(dec(w.training_effect_anaerobic))
            .push_bind(dec(w.avg_vertical_oscillation))
            .push_bind(dec(w.avg_stance_time))
            .push_bind(dec(w.avg_stride_length))
            .push_bind(dec(w.avg_vertical_ratio))
            .push_bind(w.total_strokes)
            .push_bind(dec(w.avg_stroke_distance))
            .push_bind(dec(w.pool_length))
            .push_bind(dec(w.start_lat))
            .push_bind(dec(w.start_long))
            .push_bind(dec(w.end_lat))
            .push_bind(dec(w.end_long))
            .push_bind(w.map_polyline.clone());
    });
    builder.build().execute(&mut **tx).await?;
    Ok(())
}

async fn insert_laps(tx: &mut Tx<'_>, laps: &[Lap]) -> Result<(), sqlx::Error> {
    if laps.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("INSERT INTO laps ({LAP_COLUMNS}) "));
    builder.push_values(laps, |mut b, lap| {
        b.push_bind(lap.workout_id.to_string())
            .push_bind(lap.lap_number)
            .push_bind(lap.lap_trigger.as_str())
            .push_bind(lap.intensity.as_str())
            .push_bind(lap.started_at)
            .push_bind(lap.ended_at)
            .push_bind(dec(lap.total_elapsed_time))
            .push_bind(dec(lap.total_timer_time))
            .push_bind(dec(lap.total_distance))
            .push_bind(lap.total_ascent)
            .push_bind(lap.total_descent)
            .push_bind(dec(lap.min_altitude))
            .push_bind(dec(lap.max_altitude))
            .push_bind(lap.total_calories)
            .push_bind(lap.total_work)
            .push_bind(lap.avg_heart_rate)
            .push_bind(lap.max_heart_rate)
            .push_bind(dec(lap.avg_speed))
            .push_bind(dec(lap.max_speed))
            .push_bind(lap.avg_power)
            .push_bind(lap.max_power)
            .push_bind(lap.normalized_power)
            .push_bind(lap.avg_cadence)
            .push_bind(lap.max_cadence)
            .push_bind(dec(lap.avg_vertical_oscillation))
            .push_bind(dec(lap.avg_stance_time))
            .push_bind(dec(lap.avg_stride_length))
            .push_bind(dec(lap.avg_vertical_ratio))
            .push_bind(dec(lap.start_lat))
            .push_bind(dec(lap.start_long))
            .push_bind(dec(lap.end_lat))
            .push_bind(dec(lap.end_long));
    });
    builder.build().execute(&mut **tx).await?;
    Ok(())
}

async fn insert_record_points(tx: &mut Tx<'_>, points: &[RecordPoint]) -> Result<(), sqlx::Error> {
    if points.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("INSERT INTO record_points ({RECORD_COLUMNS}) "));
    builder.push_values(points, |mut b, p| {
        b.push_bind(p.workout_id.to_string())
            .push_bind(p.timestamp)
            .push_bind(p.elapsed_seconds.normalize().to_string())
            .push_bind(dec(p.latitude))
            .push_bind(dec(p.longitude))
            .push_bind(dec(p.altitude))
            .push_bind(dec(p.distance))
            .push_bind(dec(p.speed))
            .push_bind(p.heart_rate)
            .push_bind(p.power)
            .push_bind(p.accumulated_power)
            .push_bind(p.cadence)
            .push_bind(dec(p.vertical_oscillation))
            .push_bind(dec(p.stance_time))
            .push_bind(dec(p.stride_length))
            .push_bind(dec(p.vertical_ratio))
            .push_bind(dec(p.temperature))
            .push_bind(p.activity_type.clone());
    });
    builder.build().execute(&mut **tx).await?;
    Ok(())
}

async fn insert_devices(tx: &mut Tx<'_>, devices: &[DeviceInfo]) -> Result<(), sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("INSERT INTO device_infos ({DEVICE_COLUMNS}) "));
    builder.push_values(devices, |mut b, d| {
        b.push_bind(d.workout_id.to_string())
            .push_bind(d.device_index.clone())
            .push_bind(d.manufacturer.clone())
            .push_bind(d.product_name.clone())
            .push_bind(d.product_id)
            .push_bind(d.serial_number.clone())
            .push_bind(d.device_type.clone())
            .push_bind(d.software_version.clone())
            .push_bind(d.hardware_version.clone())
            .push_bind(d.battery_status.clone())
            .push_bind(d.battery_level);
    });
    builder.build().execute(&mut **tx).await?;
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

fn dec(value: Option<Decimal>) -> Option<String> {
    value.map(|d| d.normalize().to_string())
}

fn decode_error(column: &str, source: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

fn get_dec(row: &SqliteRow, column: &str) -> Result<Option<Decimal>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|text| Decimal::from_str(&text).map_err(|e| decode_error(column, e)))
        .transpose()
}

fn get_uuid(row: &SqliteRow, column: &str) -> Result<Uuid, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| decode_error(column, e))
}

fn get_opt_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|text| Uuid::parse_str(&text).map_err(|e| decode_error(column, e)))
        .transpose()
}

fn import_from_row(row: &SqliteRow) -> Result<ImportRecord, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(ImportRecord {
        id: get_uuid(row, "id")?,
        user_id: get_uuid(row, "user_id")?,
        workout_id: get_opt_uuid(row, "workout_id")?,
        original_filename: row.try_get("original_filename")?,
        file_size: row.try_get("file_size")?,
        file_hash: row.try_get("file_hash")?,
        storage_path: row.try_get("storage_path")?,
        identity: FileIdentity {
            serial_number: row.try_get("fit_serial_number")?,
            time_created: row.try_get("fit_time_created")?,
            manufacturer: row.try_get("fit_manufacturer")?,
            product: row.try_get("fit_product")?,
            file_type: row.try_get("fit_type")?,
        },
        status: ImportStatus::parse(&status),
        error_message: row.try_get("error_message")?,
        uploaded_at: row.try_get("uploaded_at")?,
        processed_at: row.try_get("processed_at")?,
    })
}

fn workout_from_row(row: &SqliteRow) -> Result<Workout, sqlx::Error> {
    let source: String = row.try_get("source")?;
    let sport: String = row.try_get("sport")?;
    let sub_sport: String = row.try_get("sub_sport")?;

    Ok(Workout {
        id: get_uuid(row, "id")?,
        user_id: get_uuid(row, "user_id")?,
        session_id: row.try_get("session_id")?,
        title: row.try_get("title")?,
        source: WorkoutSource::parse(&source),
        external_id: row.try_get("external_id")?,
        sport: Sport::parse(&sport),
        sub_sport: SubSport::parse(&sub_sport),
        started_at: row.try_get("started_at")?,
        ended_at: row.try_get("ended_at")?,
        total_elapsed_time: get_dec(row, "total_elapsed_time")?,
        total_timer_time: get_dec(row, "total_timer_time")?,
        total_moving_time: get_dec(row, "total_moving_time")?,
        total_distance: get_dec(row, "total_distance")?,
        total_ascent: row.try_get("total_ascent")?,
        total_descent: row.try_get("total_descent")?,
        min_altitude: get_dec(row, "min_altitude")?,
        max_altitude: get_dec(row, "max_altitude")?,
        total_calories: row.try_get("total_calories")?,
        total_work: row.try_get("total_work")?,
        avg_heart_rate: row.try_get("avg_heart_rate")?,
        max_heart_rate: row.try_get("max_heart_rate")?,
        min_heart_rate: row.try_get("min_heart_rate")?,
        avg_speed: get_dec(row, "avg_speed")?,
        max_speed: get_dec(row, "max_speed")?,
        avg_power: row.try_get("avg_power")?,
        max_power: row.try_get("max_power")?,
        normalized_power: row.try_get("normalized_power")?,
        avg_cadence: row.try_get("avg_cadence")?,
        max_cadence: row.try_get("max_cadence")?,
        training_stress_score: get_dec(row, "training_stress_score")?,
        intensity_factor: get_dec(row, "intensity_factor")?,
        training_effect_aerobic: get_dec(row, "training_effect_aerobic")?,
        training_effect_anaerobic: get_dec(row, "training_effect_anaerobic")?,
        avg_vertical_oscillation: get_dec(row, "avg_vertical_oscillation")?,
        avg_stance_time: get_dec(row, "avg_stance_time")?,
        avg_stride_length: get_dec(row, "avg_stride_length")?,
        avg_vertical_ratio: get_dec(row, "avg_vertical_ratio")?,
        total_strokes: row.try_get("total_strokes")?,
        avg_stroke_distance: get_dec(row, "avg_stroke_distance")?,
        pool_length: get_dec(row, "pool_length")?,
        start_lat: get_dec(row, "start_lat")?,
        start_long: get_dec(row, "start_long")?,
        end_lat: get_dec(row, "end_lat")?,
        end_long: get_dec(row, "end_long")?,
        map_polyline: row.try_get("map_polyline")?,
    })
}

fn lap_from_row(row: &SqliteRow) -> Result<Lap, sqlx::Error> {
    let trigger: String = row.try_get("lap_trigger")?;
    let intensity: String = row.try_get("intensity")?;

    Ok(Lap {
        workout_id: get_uuid(row, "workout_id")?,
        lap_number: row.try_get("lap_number")?,
        lap_trigger: LapTrigger::parse(&trigger),
        intensity: IntensityLevel::parse(&intensity),
        started_at: row.try_get("started_at")?,
        ended_at: row.try_get("ended_at")?,
        total_elapsed_time: get_dec(row, "total_elapsed_time")?,
        total_timer_time: get_dec(row, "total_timer_time")?,
        total_distance: get_dec(row, "total_distance")?,
        total_ascent: row.try_get("total_ascent")?,
        total_descent: row.try_get("total_descent")?,
        min_altitude: get_dec(row, "min_altitude")?,
        max_altitude: get_dec(row, "max_altitude")?,
        total_calories: row.try_get("total_calories")?,
        total_work: row.try_get("total_work")?,
        avg_heart_rate: row.try_get("avg_heart_rate")?,
        max_heart_rate: row.try_get("max_heart_rate")?,
        avg_speed: get_dec(row, "avg_speed")?,
        max_speed: get_dec(row, "max_speed")?,
        avg_power: row.try_get("avg_power")?,
        max_power: row.try_get("max_power")?,
        normalized_power: row.try_get("normalized_power")?,
        avg_cadence: row.try_get("avg_cadence")?,
        max_cadence: row.try_get("max_cadence")?,
        avg_vertical_oscillation: get_dec(row, "avg_vertical_oscillation")?,
        avg_stance_time: get_dec(row, "avg_stance_time")?,
        avg_stride_length: get_dec(row, "avg_stride_length")?,
        avg_vertical_ratio: get_dec(row, "avg_vertical_ratio")?,
        start_lat: get_dec(row, "start_lat")?,
        start_long: get_dec(row, "start_long")?,
        end_lat: get_dec(row, "end_lat")?,
        end_long: get_dec(row, "end_long")?,
    })
}

fn record_point_from_row(row: &SqliteRow) -> Result<RecordPoint, sqlx::Error> {
    let elapsed: String = row.try_get("elapsed_seconds")?;

    Ok(RecordPoint {
        workout_id: get_uuid(row, "workout_id")?,
        timestamp: row.try_get("timestamp")?,
        elapsed_seconds: Decimal::from_str(&elapsed)
            .map_err(|e| decode_error("elapsed_seconds", e))?,
        latitude: get_dec(row, "latitude")?,
        longitude: get_dec(row, "longitude")?,
        altitude: get_dec(row, "altitude")?,
        distance: get_dec(row, "distance")?,
        speed: get_dec(row, "speed")?,
        heart_rate: row.try_get("heart_rate")?,
        power: row.try_get("power")?,
        accumulated_power: row.try_get("accumulated_power")?,
        cadence: row.try_get("cadence")?,
        vertical_oscillation: get_dec(row, "vertical_oscillation")?,
        stance_time: get_dec(row, "stance_time")?,
        stride_length: get_dec(row, "stride_length")?,
        vertical_ratio: get_dec(row, "vertical_ratio")?,
        temperature: get_dec(row, "temperature")?,
        activity_type: row.try_get("activity_type")?,
    })
}

fn device_from_row(row: &SqliteRow) -> Result<DeviceInfo, sqlx::Error> {
    Ok(DeviceInfo {
        workout_id: get_uuid(row, "workout_id")?,
        device_index: row.try_get("device_index")?,
        manufacturer: row.try_get("manufacturer")?,
        product_name: row.try_get("product_name")?,
        product_id: row.try_get("product_id")?,
        serial_number: row.try_get("serial_number")?,
        device_type: row.try_get("device_type")?,
        software_version: row.try_get("software_version")?,
        hardware_version: row.try_get("hardware_version")?,
        battery_status: row.try_get("battery_status")?,
        battery_level: row.try_get("battery_level")?,
    })
}
