#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use fitvault::db::Database;
use fitvault::error::ImportError;
use fitvault::processing::{FieldValue, FitImporter, MessageDecoder, MessageKind, RawMessage, message};
use tempfile::NamedTempFile;

/// Decoder that ignores the file contents and replays a fixed script.
pub struct ScriptedDecoder {
    script: Result<Vec<RawMessage>, String>,
}

impl ScriptedDecoder {
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self {
            script: Ok(messages),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            script: Err(reason.to_string()),
        }
    }
}

impl MessageDecoder for ScriptedDecoder {
    fn decode(&self, _path: &Path) -> Result<Vec<RawMessage>, ImportError> {
        self.script.clone().map_err(ImportError::Decode)
    }
}

pub async fn memory_db() -> Database {
    Database::new("sqlite::memory:").await.unwrap()
}

pub fn importer(db: &Database, messages: Vec<RawMessage>) -> FitImporter {
    FitImporter::with_decoder(db.clone(), Arc::new(ScriptedDecoder::new(messages)))
}

/// A file on disk with the given bytes; the hash is what matters.
pub fn fit_file(bytes: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".fit").tempfile().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 4, 6, 30, 0).unwrap()
}

pub fn at(seconds: i64) -> FieldValue {
    FieldValue::Timestamp(start_time() + Duration::seconds(seconds))
}

pub fn semicircles(degrees: f64) -> FieldValue {
    FieldValue::Integer((degrees * 2f64.powi(31) / 180.0).round() as i64)
}

pub fn file_id() -> RawMessage {
    message(
        MessageKind::FileId,
        [
            ("type", FieldValue::from("activity")),
            ("manufacturer", FieldValue::from("garmin")),
            ("product_name", FieldValue::from("Forerunner 965")),
            ("serial_number", FieldValue::from(3_412_345_678_i64)),
            ("time_created", at(0)),
        ],
    )
}

pub fn running_session(duration_seconds: i64) -> RawMessage {
    message(
        MessageKind::Session,
        [
            ("sport", FieldValue::from("running")),
            ("sub_sport", FieldValue::from("trail")),
            ("start_time", at(0)),
            ("timestamp", at(duration_seconds)),
            ("total_elapsed_time", FieldValue::from(duration_seconds as f64)),
            ("total_timer_time", FieldValue::from(duration_seconds as f64)),
            ("total_distance", FieldValue::from(10_000.5)),
            ("avg_speed", FieldValue::from(2.0)),
            ("enhanced_avg_speed", FieldValue::from(2.05)),
            ("avg_heart_rate", FieldValue::from(148)),
            ("max_heart_rate", FieldValue::from(171)),
            ("total_ascent", FieldValue::from(0)),
        ],
    )
}

pub fn lap(embedded_number: i64, start: i64, end: i64) -> RawMessage {
    message(
        MessageKind::Lap,
        [
            ("message_index", FieldValue::from(embedded_number)),
            ("lap_number", FieldValue::from(embedded_number)),
            ("start_time", at(start)),
            ("timestamp", at(end)),
            ("lap_trigger", FieldValue::from("distance")),
            ("intensity", FieldValue::from("active")),
            ("total_elapsed_time", FieldValue::from((end - start) as f64)),
        ],
    )
}

pub fn record(seconds: i64, position: Option<(f64, f64)>) -> RawMessage {
    let mut fields = vec![
        ("timestamp", at(seconds)),
        ("heart_rate", FieldValue::from(140 + seconds % 20)),
    ];
    if let Some((lat, lng)) = position {
        fields.push(("position_lat", semicircles(lat)));
        fields.push(("position_long", semicircles(lng)));
    }
    message(MessageKind::Record, fields)
}

pub fn device(index: &str, extra: Vec<(&str, FieldValue)>) -> RawMessage {
    let mut fields = vec![("device_index", FieldValue::from(index))];
    fields.extend(extra);
    message(MessageKind::DeviceInfo, fields)
}

/// A complete one-lap run with `records` one-second samples along a line.
pub fn activity(records: usize) -> Vec<RawMessage> {
    let mut messages = vec![file_id(), device("creator", vec![])];
    messages.push(lap(0, 0, records as i64));
    messages.extend((0..records as i64).map(|i| {
        let offset = i as f64 * 0.0001;
        record(i, Some((37.7749 + offset, -122.4194 - offset)))
    }));
    messages.push(running_session(records as i64));
    messages
}
