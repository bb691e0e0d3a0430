//! Builds the typed workout graph from decoded message sections.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    DeviceInfo, FileIdentity, Lap, RecordPoint, Sport, SubSport, UNKNOWN_DEVICE_INDEX, Workout,
    WorkoutGraph, WorkoutSource,
};
use crate::processing::mapping::{map_intensity, map_lap_trigger, map_sport, map_sub_sport};
use crate::processing::route::{encode_route, route_points};
use crate::processing::types::{DecodedFit, FieldMap};

/// Identity of the workout being built.
#[derive(Debug, Clone, Copy)]
pub struct WorkoutContext {
    pub workout_id: Uuid,
    pub user_id: Uuid,
    pub session_id: Option<i64>,
}

/// Assemble the full graph for one session. Non-fatal problems are pushed
/// onto `warnings`.
pub fn derive_workout_graph(
    session: &FieldMap,
    decoded: &DecodedFit,
    context: WorkoutContext,
    warnings: &mut Vec<String>,
) -> WorkoutGraph {
    let workout = build_workout(session, decoded, context, warnings);
    let laps = decoded
        .laps
        .iter()
        .enumerate()
        .map(|(idx, lap)| build_lap(context.workout_id, idx as i64 + 1, lap, warnings))
        .collect();
    let records = build_record_points(context.workout_id, &decoded.records);
    let devices = build_devices(context.workout_id, &decoded.devices);

    WorkoutGraph {
        workout,
        laps,
        records,
        devices,
    }
}

/// `file_id` metadata for the import audit row.
pub fn file_identity(file_id: Option<&FieldMap>) -> FileIdentity {
    let Some(file_id) = file_id else {
        return FileIdentity::default();
    };

    FileIdentity {
        serial_number: file_id.text("serial_number"),
        time_created: file_id.timestamp("time_created"),
        manufacturer: file_id.text("manufacturer"),
        product: file_id
            .text("product_name")
            .or_else(|| file_id.text("garmin_product"))
            .or_else(|| file_id.text("product")),
        file_type: file_id.text("type"),
    }
}

/// `"{sport} ({sub sport})"`, dropping the clause for the generic sub sport.
pub fn synthesize_title(sport: Sport, sub_sport: SubSport) -> String {
    if sub_sport == SubSport::Generic {
        sport.display_name().to_string()
    } else {
        format!("{} ({})", sport.display_name(), sub_sport.display_name())
    }
}

pub fn build_workout(
    session: &FieldMap,
    decoded: &DecodedFit,
    context: WorkoutContext,
    warnings: &mut Vec<String>,
) -> Workout {
    let sport = map_sport(session.text("sport").as_deref());
    let sub_sport = map_sub_sport(session.text("sub_sport").as_deref());

    let title = decoded
        .workout
        .as_ref()
        .and_then(|workout| workout.text("wkt_name"))
        .unwrap_or_else(|| synthesize_title(sport, sub_sport));

    let started_at = session
        .timestamp("start_time")
        .or_else(|| session.timestamp("timestamp"));
    let ended_at = ordered_end(started_at, session.timestamp("timestamp"), "Workout", warnings);

    let first = decoded.records.first();
    let last = decoded.records.last();

    let map_polyline = match encode_route(&route_points(&decoded.records)) {
        Ok(encoded) => encoded,
        Err(err) => {
            warnings.push(err.to_string());
            None
        }
    };

    Workout {
        id: context.workout_id,
        user_id: context.user_id,
        session_id: context.session_id,
        title,
        source: WorkoutSource::GarminFit,
        external_id: decoded
            .file_id
            .as_ref()
            .and_then(|file_id| file_id.text("serial_number")),
        sport,
        sub_sport,
        started_at,
        ended_at,

        total_elapsed_time: session.decimal("total_elapsed_time", 2),
        total_timer_time: session.decimal("total_timer_time", 2),
        total_moving_time: session.decimal("total_moving_time", 2),
        total_distance: session.decimal("total_distance", 2),

        total_ascent: session.int("total_ascent"),
        total_descent: session.int("total_descent"),
        min_altitude: session.decimal_preferring(&["enhanced_min_altitude", "min_altitude"], 2),
        max_altitude: session.decimal_preferring(&["enhanced_max_altitude", "max_altitude"], 2),

        total_calories: session.int("total_calories"),
        total_work: session.int("total_work"),

        avg_heart_rate: session.int("avg_heart_rate"),
        max_heart_rate: session.int("max_heart_rate"),
        min_heart_rate: session.int("min_heart_rate"),

        avg_speed: session.decimal_preferring(&["enhanced_avg_speed", "avg_speed"], 3),
        max_speed: session.decimal_preferring(&["enhanced_max_speed", "max_speed"], 3),

        avg_power: session.int("avg_power"),
        max_power: session.int("max_power"),
        normalized_power: session.int("normalized_power"),

        avg_cadence: session.int_preferring(&["avg_cadence", "avg_running_cadence"]),
        max_cadence: session.int_preferring(&["max_cadence", "max_running_cadence"]),

        training_stress_score: session.decimal("training_stress_score", 2),
        intensity_factor: session.decimal("intensity_factor", 3),
        training_effect_aerobic: session.decimal("total_training_effect", 1),
        training_effect_anaerobic: session.decimal("total_anaerobic_training_effect", 1),

        avg_vertical_oscillation: session.decimal("avg_vertical_oscillation", 1),
        avg_stance_time: session.decimal("avg_stance_time", 1),
        avg_stride_length: session.decimal("avg_step_length", 1),
        avg_vertical_ratio: session.decimal("avg_vertical_ratio", 2),

        total_strokes: session.int_preferring(&["total_strokes", "total_cycles"]),
        avg_stroke_distance: session.decimal("avg_stroke_distance", 2),
        pool_length: session.decimal("pool_length", 2),

        start_lat: first.and_then(|r| r.degrees("position_lat")),
        start_long: first.and_then(|r| r.degrees("position_long")),
        end_lat: last.and_then(|r| r.degrees("position_lat")),
        end_long: last.and_then(|r| r.degrees("position_long")),

        map_polyline,
    }
}

pub fn build_lap(
    workout_id: Uuid,
    lap_number: i64,
    lap: &FieldMap,
    warnings: &mut Vec<String>,
) -> Lap {
    let started_at = lap
        .timestamp("start_time")
        .or_else(|| lap.timestamp("timestamp"));
    let ended_at = ordered_end(
        started_at,
        lap.timestamp("timestamp"),
        &format!("Lap {lap_number}"),
        warnings,
    );

    Lap {
        workout_id,
        lap_number,
        lap_trigger: map_lap_trigger(lap.text("lap_trigger").as_deref()),
        intensity: map_intensity(lap.text("intensity").as_deref()),

        started_at,
        ended_at,
        total_elapsed_time: lap.decimal("total_elapsed_time", 2),
        total_timer_time: lap.decimal("total_timer_time", 2),

        total_distance: lap.decimal("total_distance", 2),
        total_ascent: lap.int("total_ascent"),
        total_descent: lap.int("total_descent"),
        min_altitude: lap.decimal_preferring(&["enhanced_min_altitude", "min_altitude"], 2),
        max_altitude: lap.decimal_preferring(&["enhanced_max_altitude", "max_altitude"], 2),

        total_calories: lap.int("total_calories"),
        total_work: lap.int("total_work"),

        avg_heart_rate: lap.int("avg_heart_rate"),
        max_heart_rate: lap.int("max_heart_rate"),

        avg_speed: lap.decimal_preferring(&["enhanced_avg_speed", "avg_speed"], 3),
        max_speed: lap.decimal_preferring(&["enhanced_max_speed", "max_speed"], 3),

        avg_power: lap.int("avg_power"),
        max_power: lap.int("max_power"),
        normalized_power: lap.int("normalized_power"),

        avg_cadence: lap.int_preferring(&["avg_cadence", "avg_running_cadence"]),
        max_cadence: lap.int_preferring(&["max_cadence", "max_running_cadence"]),

        avg_vertical_oscillation: lap.decimal("avg_vertical_oscillation", 1),
        avg_stance_time: lap.decimal("avg_stance_time", 1),
        avg_stride_length: lap.decimal("avg_step_length", 1),
        avg_vertical_ratio: lap.decimal("avg_vertical_ratio", 2),

        start_lat: lap.degrees("start_position_lat"),
        start_long: lap.degrees("start_position_long"),
        end_lat: lap.degrees("end_position_lat"),
        end_long: lap.degrees("end_position_long"),
    }
}

/// Samples with `elapsed_seconds` measured from the first sample. Samples
/// without a timestamp are dropped, and nothing is kept when the first
/// sample has no timestamp to measure from.
pub fn build_record_points(workout_id: Uuid, records: &[FieldMap]) -> Vec<RecordPoint> {
    let Some(start) = records.first().and_then(|first| first.timestamp("timestamp")) else {
        return Vec::new();
    };

    records
        .iter()
        .filter_map(|record| {
            let timestamp = record.timestamp("timestamp")?;
            Some(RecordPoint {
                workout_id,
                timestamp,
                elapsed_seconds: elapsed_seconds(start, timestamp),

                latitude: record.degrees("position_lat"),
                longitude: record.degrees("position_long"),
                altitude: record.decimal_preferring(&["enhanced_altitude", "altitude"], 2),
                distance: record.decimal("distance", 2),
                speed: record.decimal_preferring(&["enhanced_speed", "speed"], 3),

                heart_rate: record.int("heart_rate"),
                power: record.int("power"),
                accumulated_power: record.int("accumulated_power"),
                cadence: record.int("cadence"),

                vertical_oscillation: record.decimal("vertical_oscillation", 1),
                stance_time: record.decimal("stance_time", 1),
                stride_length: record.decimal("step_length", 1),
                vertical_ratio: record.decimal("vertical_ratio", 2),

                temperature: record.decimal("temperature", 2),
                activity_type: record.text("activity_type"),
            })
        })
        .collect()
}

/// One row per device index, in order of first appearance. Later reports of
/// the same device only fill attributes earlier ones lacked.
pub fn build_devices(workout_id: Uuid, devices: &[FieldMap]) -> Vec<DeviceInfo> {
    let mut rows: Vec<DeviceInfo> = Vec::new();

    for device in devices {
        let row = DeviceInfo {
            workout_id,
            device_index: device
                .text("device_index")
                .unwrap_or_else(|| UNKNOWN_DEVICE_INDEX.to_string()),
            manufacturer: device.text("manufacturer"),
            product_name: device
                .text("product_name")
                .or_else(|| device.text("garmin_product")),
            product_id: device.int("product"),
            serial_number: device.text("serial_number"),
            device_type: [
                "device_type",
                "antplus_device_type",
                "ant_device_type",
                "local_device_type",
            ]
            .iter()
            .find_map(|name| device.text(name)),
            software_version: device.text("software_version"),
            hardware_version: device.text("hardware_version"),
            battery_status: device.text("battery_status"),
            battery_level: device.int("battery_level"),
        };

        match rows
            .iter_mut()
            .find(|existing| existing.device_index == row.device_index)
        {
            Some(existing) => existing.absorb(row),
            None => rows.push(row),
        }
    }

    rows
}

fn elapsed_seconds(start: DateTime<Utc>, timestamp: DateTime<Utc>) -> Decimal {
    Decimal::new((timestamp - start).num_milliseconds(), 3).normalize()
}

/// Keep `end` only when it does not precede `start`.
fn ordered_end(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    label: &str,
    warnings: &mut Vec<String>,
) -> Option<DateTime<Utc>> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            warnings.push(format!(
                "{label} ends ({end}) before it starts ({start}); end time dropped"
            ));
            None
        }
        _ => end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IntensityLevel, LapTrigger};
    use crate::processing::types::FieldValue;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 7, 0, 0).unwrap()
    }

    fn context() -> WorkoutContext {
        WorkoutContext {
            workout_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            session_id: None,
        }
    }

    #[test]
    fn title_omits_generic_sub_sport() {
        assert_eq!(synthesize_title(Sport::Running, SubSport::Generic), "Running");
        assert_eq!(
            synthesize_title(Sport::Running, SubSport::Trail),
            "Running (Trail)"
        );
    }

    #[test]
    fn workout_name_overrides_synthesized_title() {
        let session = FieldMap::new().with("sport", "cycling");
        let decoded = DecodedFit {
            workout: Some(FieldMap::new().with("wkt_name", "Sweet Spot 3x15")),
            ..Default::default()
        };

        let workout = build_workout(&session, &decoded, context(), &mut Vec::new());
        assert_eq!(workout.title, "Sweet Spot 3x15");
        assert_eq!(workout.sport, Sport::Cycling);
    }

    #[test]
    fn start_falls_back_to_session_timestamp() {
        let session = FieldMap::new().with("timestamp", t0());
        let workout = build_workout(&session, &DecodedFit::default(), context(), &mut Vec::new());

        assert_eq!(workout.started_at, Some(t0()));
        assert_eq!(workout.ended_at, Some(t0()));
    }

    #[test]
    fn end_before_start_is_dropped_with_warning() {
        let session = FieldMap::new()
            .with("start_time", t0())
            .with("timestamp", t0() - Duration::seconds(10));
        let mut warnings = Vec::new();

        let workout = build_workout(&session, &DecodedFit::default(), context(), &mut warnings);

        assert_eq!(workout.ended_at, None);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn legacy_speed_used_when_enhanced_missing() {
        let session = FieldMap::new()
            .with("avg_speed", 2.0)
            .with("max_speed", 3.5)
            .with("enhanced_max_speed", 3.75);

        let workout = build_workout(&session, &DecodedFit::default(), context(), &mut Vec::new());
        assert_eq!(workout.avg_speed, Some(Decimal::new(2, 0)));
        assert_eq!(workout.max_speed, Some(Decimal::new(375, 2)));
    }

    #[test]
    fn absent_metrics_stay_absent_and_zero_stays_zero() {
        let session = FieldMap::new().with("total_ascent", 0);
        let workout = build_workout(&session, &DecodedFit::default(), context(), &mut Vec::new());

        assert_eq!(workout.total_ascent, Some(0));
        assert_eq!(workout.total_descent, None);
        assert_eq!(workout.avg_power, None);
    }

    #[test]
    fn lap_vocabulary_and_cadence_fallback() {
        let lap = FieldMap::new()
            .with("lap_trigger", "Distance")
            .with("intensity", "warmup")
            .with("avg_running_cadence", 86)
            .with("lap_number", 7);

        let built = build_lap(Uuid::nil(), 2, &lap, &mut Vec::new());
        assert_eq!(built.lap_number, 2);
        assert_eq!(built.lap_trigger, LapTrigger::Distance);
        assert_eq!(built.intensity, IntensityLevel::Warmup);
        assert_eq!(built.avg_cadence, Some(86));
    }

    #[test]
    fn elapsed_is_measured_from_first_sample() {
        let records = vec![
            FieldMap::new().with("timestamp", t0()).with("elapsed_time", 99.0),
            FieldMap::new().with("heart_rate", 120),
            FieldMap::new().with("timestamp", t0() + Duration::milliseconds(1500)),
        ];

        let points = build_record_points(Uuid::nil(), &records);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].elapsed_seconds, Decimal::ZERO);
        assert_eq!(points[1].elapsed_seconds, Decimal::new(15, 1));
    }

    #[test]
    fn no_reference_timestamp_means_no_points() {
        let records = vec![
            FieldMap::new().with("heart_rate", 120),
            FieldMap::new().with("timestamp", t0()),
        ];
        assert!(build_record_points(Uuid::nil(), &records).is_empty());
    }

    #[test]
    fn devices_merge_by_index() {
        let devices = vec![
            FieldMap::new()
                .with("device_index", "creator")
                .with("manufacturer", "garmin")
                .with("product", 3113),
            FieldMap::new()
                .with("device_index", 1)
                .with("antplus_device_type", "heart_rate"),
            FieldMap::new()
                .with("device_index", "creator")
                .with("battery_status", "good"),
            FieldMap::new().with("manufacturer", "stryd"),
        ];

        let rows = build_devices(Uuid::nil(), &devices);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].device_index, "creator");
        assert_eq!(rows[0].product_id, Some(3113));
        assert_eq!(rows[0].battery_status.as_deref(), Some("good"));
        assert_eq!(rows[1].device_index, "1");
        assert_eq!(rows[1].device_type.as_deref(), Some("heart_rate"));
        assert_eq!(rows[2].device_index, UNKNOWN_DEVICE_INDEX);
    }

    #[test]
    fn identity_uses_none_for_missing_fields() {
        let file_id = FieldMap::new()
            .with("manufacturer", "garmin")
            .with("garmin_product", "fr965")
            .with("serial_number", FieldValue::Integer(3_999_123_456));

        let identity = file_identity(Some(&file_id));
        assert_eq!(identity.product.as_deref(), Some("fr965"));
        assert_eq!(identity.serial_number.as_deref(), Some("3999123456"));
        assert_eq!(identity.file_type, None);
        assert_eq!(file_identity(None), FileIdentity::default());
    }
}
