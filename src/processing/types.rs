use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{ImportRecord, Workout};
use crate::processing::coerce;

/// A single decoded field value, independent of the decoder's own model.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// Message kinds the importer reads. Everything else is dropped at the
/// decoder boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    FileId,
    Session,
    Lap,
    Record,
    DeviceInfo,
    Workout,
}

/// Named fields of one message. Lookups go through the coercion helpers so
/// a missing or malformed field reads as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    fields: HashMap<String, FieldValue>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn decimal(&self, name: &str, precision: u32) -> Option<Decimal> {
        coerce::safe_decimal(self.get(name), precision)
    }

    /// First present value among `names`, so enhanced variants can be listed
    /// ahead of their legacy counterparts.
    pub fn decimal_preferring(&self, names: &[&str], precision: u32) -> Option<Decimal> {
        names.iter().find_map(|name| self.decimal(name, precision))
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        coerce::safe_int(self.get(name))
    }

    pub fn int_preferring(&self, names: &[&str]) -> Option<i64> {
        names.iter().find_map(|name| self.int(name))
    }

    pub fn text(&self, name: &str) -> Option<String> {
        coerce::safe_text(self.get(name))
    }

    pub fn timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.get(name) {
            Some(FieldValue::Timestamp(ts)) => Some(*ts),
            _ => None,
        }
    }

    pub fn degrees(&self, name: &str) -> Option<Decimal> {
        coerce::convert_angular_to_degrees(self.get(name))
    }

    /// Degrees as floating point, for route encoding.
    pub fn degrees_f64(&self, name: &str) -> Option<f64> {
        coerce::angular_to_degrees_f64(self.get(name))
    }
}

impl<S: Into<String>> FromIterator<(S, FieldValue)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (S, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

/// One message as yielded by a [`MessageDecoder`](crate::processing::MessageDecoder).
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub kind: MessageKind,
    pub fields: FieldMap,
}

impl RawMessage {
    pub fn new(kind: MessageKind, fields: FieldMap) -> Self {
        Self { kind, fields }
    }
}

/// Decoded file partitioned by message kind, in file order.
#[derive(Debug, Clone, Default)]
pub struct DecodedFit {
    pub file_id: Option<FieldMap>,
    pub session: Option<FieldMap>,
    /// How many session messages the file carried; only the last is kept.
    pub session_count: usize,
    pub laps: Vec<FieldMap>,
    pub records: Vec<FieldMap>,
    pub devices: Vec<FieldMap>,
    pub workout: Option<FieldMap>,
}

/// Caller-supplied knobs for a single import.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// External storage location of the original upload, recorded verbatim.
    pub storage_path: Option<String>,
    /// Short-circuit re-uploads of an already imported file.
    pub check_duplicates: bool,
    /// Name to record instead of the on-disk file name.
    pub original_filename: Option<String>,
    /// Pre-planned session to link the workout to.
    pub session_id: Option<i64>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            storage_path: None,
            check_duplicates: true,
            original_filename: None,
            session_id: None,
        }
    }
}

/// Successful result of an import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub workout: Workout,
    pub import: ImportRecord,
    /// Non-fatal conditions met along the way.
    pub warnings: Vec<String>,
    /// True when the file had already been imported and nothing was written.
    pub duplicate: bool,
}
