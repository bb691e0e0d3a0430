//! Decoder boundary: turns a FIT file into [`RawMessage`]s and sorts them by
//! kind.

use std::fs::File;
use std::path::Path;

use chrono::Utc;
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value};

use crate::error::ImportError;
use crate::processing::types::{DecodedFit, FieldMap, FieldValue, MessageKind, RawMessage};

/// Source of decoded messages for a file on disk.
pub trait MessageDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Vec<RawMessage>, ImportError>;
}

/// [`MessageDecoder`] backed by `fitparser`, which validates the FIT header
/// and CRCs and applies profile scales, offsets and enum names.
#[derive(Debug, Default, Clone, Copy)]
pub struct FitparserDecoder;

impl MessageDecoder for FitparserDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<RawMessage>, ImportError> {
        let mut file = File::open(path)?;
        let records = fitparser::from_reader(&mut file)
            .map_err(|err| ImportError::Decode(err.to_string()))?;
        Ok(records.iter().filter_map(to_raw_message).collect())
    }
}

fn message_kind(kind: MesgNum) -> Option<MessageKind> {
    match kind {
        MesgNum::FileId => Some(MessageKind::FileId),
        MesgNum::Session => Some(MessageKind::Session),
        MesgNum::Lap => Some(MessageKind::Lap),
        MesgNum::Record => Some(MessageKind::Record),
        MesgNum::DeviceInfo => Some(MessageKind::DeviceInfo),
        MesgNum::Workout => Some(MessageKind::Workout),
        _ => None,
    }
}

fn to_raw_message(record: &FitDataRecord) -> Option<RawMessage> {
    let kind = message_kind(record.kind())?;
    let fields = record
        .fields()
        .iter()
        .filter_map(|field| Some((field.name().to_string(), field_value(field.value())?)))
        .collect();
    Some(RawMessage::new(kind, fields))
}

fn field_value(value: &Value) -> Option<FieldValue> {
    let integer = |raw: i64| Some(FieldValue::Integer(raw));
    match value {
        Value::Timestamp(ts) => Some(FieldValue::Timestamp(ts.with_timezone(&Utc))),
        Value::String(text) => Some(FieldValue::Text(text.clone())),
        Value::Float32(raw) => Some(FieldValue::Float(f64::from(*raw))),
        Value::Float64(raw) => Some(FieldValue::Float(*raw)),
        Value::Byte(raw) | Value::Enum(raw) | Value::UInt8(raw) | Value::UInt8z(raw) => {
            integer(i64::from(*raw))
        }
        Value::SInt8(raw) => integer(i64::from(*raw)),
        Value::SInt16(raw) => integer(i64::from(*raw)),
        Value::UInt16(raw) | Value::UInt16z(raw) => integer(i64::from(*raw)),
        Value::SInt32(raw) => integer(i64::from(*raw)),
        Value::UInt32(raw) | Value::UInt32z(raw) => integer(i64::from(*raw)),
        Value::SInt64(raw) => integer(*raw),
        Value::UInt64(raw) | Value::UInt64z(raw) => i64::try_from(*raw).ok().and_then(integer),
        // Arrays (e.g. per-zone times) are not part of the workout graph.
        _ => None,
    }
}

/// Sort messages into the sections the importer consumes. Singleton
/// sections keep the last message of their kind.
pub fn partition(messages: Vec<RawMessage>) -> DecodedFit {
    let mut decoded = DecodedFit::default();

    for message in messages {
        match message.kind {
            MessageKind::FileId => decoded.file_id = Some(message.fields),
            MessageKind::Session => {
                decoded.session_count += 1;
                decoded.session = Some(message.fields);
            }
            MessageKind::Lap => decoded.laps.push(message.fields),
            MessageKind::Record => decoded.records.push(message.fields),
            MessageKind::DeviceInfo => decoded.devices.push(message.fields),
            MessageKind::Workout => decoded.workout = Some(message.fields),
        }
    }

    decoded
}

/// Convenience for building a message from `(name, value)` pairs.
pub fn message<I, S>(kind: MessageKind, fields: I) -> RawMessage
where
    I: IntoIterator<Item = (S, FieldValue)>,
    S: Into<String>,
{
    RawMessage::new(kind, fields.into_iter().collect::<FieldMap>())
}
