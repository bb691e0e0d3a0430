use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::vocab::{IntensityLevel, LapTrigger, Sport, SubSport, WorkoutSource};

/// One performed activity. Distances are meters, durations seconds, speeds
/// m/s, work joules. Every metric is optional: `None` means the source did
/// not report it, which is different from a reported zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Pre-planned session this workout fulfils, if any.
    pub session_id: Option<i64>,
    pub title: String,
    pub source: WorkoutSource,
    pub external_id: Option<String>,
    pub sport: Sport,
    pub sub_sport: SubSport,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,

    pub total_elapsed_time: Option<Decimal>,
    pub total_timer_time: Option<Decimal>,
    pub total_moving_time: Option<Decimal>,
    pub total_distance: Option<Decimal>,

    pub total_ascent: Option<i64>,
    pub total_descent: Option<i64>,
    pub min_altitude: Option<Decimal>,
    pub max_altitude: Option<Decimal>,

    pub total_calories: Option<i64>,
    pub total_work: Option<i64>,

    pub avg_heart_rate: Option<i64>,
    pub max_heart_rate: Option<i64>,
    pub min_heart_rate: Option<i64>,

    pub avg_speed: Option<Decimal>,
    pub max_speed: Option<Decimal>,

    pub avg_power: Option<i64>,
    pub max_power: Option<i64>,
    pub normalized_power: Option<i64>,

    pub avg_cadence: Option<i64>,
    pub max_cadence: Option<i64>,

    pub training_stress_score: Option<Decimal>,
    pub intensity_factor: Option<Decimal>,
    pub training_effect_aerobic: Option<Decimal>,
    pub training_effect_anaerobic: Option<Decimal>,

    pub avg_vertical_oscillation: Option<Decimal>,
    pub avg_stance_time: Option<Decimal>,
    pub avg_stride_length: Option<Decimal>,
    pub avg_vertical_ratio: Option<Decimal>,

    pub total_strokes: Option<i64>,
    pub avg_stroke_distance: Option<Decimal>,
    pub pool_length: Option<Decimal>,

    pub start_lat: Option<Decimal>,
    pub start_long: Option<Decimal>,
    pub end_lat: Option<Decimal>,
    pub end_long: Option<Decimal>,

    /// Route encoded with the 1e5 polyline algorithm.
    pub map_polyline: Option<String>,
}

/// One device-reported interval. `lap_number` runs 1..N in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    pub workout_id: Uuid,
    pub lap_number: i64,
    pub lap_trigger: LapTrigger,
    pub intensity: IntensityLevel,

    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub total_elapsed_time: Option<Decimal>,
    pub total_timer_time: Option<Decimal>,

    pub total_distance: Option<Decimal>,
    pub total_ascent: Option<i64>,
    pub total_descent: Option<i64>,
    pub min_altitude: Option<Decimal>,
    pub max_altitude: Option<Decimal>,

    pub total_calories: Option<i64>,
    pub total_work: Option<i64>,

    pub avg_heart_rate: Option<i64>,
    pub max_heart_rate: Option<i64>,

    pub avg_speed: Option<Decimal>,
    pub max_speed: Option<Decimal>,

    pub avg_power: Option<i64>,
    pub max_power: Option<i64>,
    pub normalized_power: Option<i64>,

    pub avg_cadence: Option<i64>,
    pub max_cadence: Option<i64>,

    pub avg_vertical_oscillation: Option<Decimal>,
    pub avg_stance_time: Option<Decimal>,
    pub avg_stride_length: Option<Decimal>,
    pub avg_vertical_ratio: Option<Decimal>,

    pub start_lat: Option<Decimal>,
    pub start_long: Option<Decimal>,
    pub end_lat: Option<Decimal>,
    pub end_long: Option<Decimal>,
}

/// One time-series sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPoint {
    pub workout_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the first sample of the workout, always derived from
    /// timestamps.
    pub elapsed_seconds: Decimal,

    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub altitude: Option<Decimal>,
    pub distance: Option<Decimal>,
    pub speed: Option<Decimal>,

    pub heart_rate: Option<i64>,
    pub power: Option<i64>,
    pub accumulated_power: Option<i64>,
    pub cadence: Option<i64>,

    pub vertical_oscillation: Option<Decimal>,
    pub stance_time: Option<Decimal>,
    pub stride_length: Option<Decimal>,
    pub vertical_ratio: Option<Decimal>,

    pub temperature: Option<Decimal>,
    pub activity_type: Option<String>,
}

/// A device that took part in recording a workout, keyed by its role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub workout_id: Uuid,
    /// `creator`, `1`, `2`, ... or [`UNKNOWN_DEVICE_INDEX`].
    pub device_index: String,
    pub manufacturer: Option<String>,
    pub product_name: Option<String>,
    pub product_id: Option<i64>,
    pub serial_number: Option<String>,
    pub device_type: Option<String>,
    pub software_version: Option<String>,
    pub hardware_version: Option<String>,
    pub battery_status: Option<String>,
    pub battery_level: Option<i64>,
}

pub const UNKNOWN_DEVICE_INDEX: &str = "unknown";

impl DeviceInfo {
    /// Fill attributes this row lacks from another report of the same device.
    pub fn absorb(&mut self, other: DeviceInfo) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut self.manufacturer, other.manufacturer);
        fill(&mut self.product_name, other.product_name);
        fill(&mut self.product_id, other.product_id);
        fill(&mut self.serial_number, other.serial_number);
        fill(&mut self.device_type, other.device_type);
        fill(&mut self.software_version, other.software_version);
        fill(&mut self.hardware_version, other.hardware_version);
        fill(&mut self.battery_status, other.battery_status);
        fill(&mut self.battery_level, other.battery_level);
    }
}

/// Everything a single import writes below the workout.
#[derive(Debug, Clone, Default)]
pub struct WorkoutGraph {
    pub workout: Workout,
    pub laps: Vec<Lap>,
    pub records: Vec<RecordPoint>,
    pub devices: Vec<DeviceInfo>,
}
