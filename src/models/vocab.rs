//! Canonical vocabularies shared by the workout graph.
//!
//! Every enum stores as its lowercase `as_str` value and parses back with
//! [`parse`](Sport::parse); unknown database values fall back to the same
//! default the vendor mapping tables use.

use serde::{Deserialize, Serialize};

/// Where a workout came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutSource {
    #[default]
    Manual,
    GarminFit,
    GarminConnect,
    AppleHealth,
    Strava,
    Wahoo,
    Polar,
    Whoop,
    Other,
}

impl WorkoutSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::GarminFit => "garmin_fit",
            Self::GarminConnect => "garmin_connect",
            Self::AppleHealth => "apple_health",
            Self::Strava => "strava",
            Self::Wahoo => "wahoo",
            Self::Polar => "polar",
            Self::Whoop => "whoop",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "manual" => Self::Manual,
            "garmin_fit" => Self::GarminFit,
            "garmin_connect" => Self::GarminConnect,
            "apple_health" => Self::AppleHealth,
            "strava" => Self::Strava,
            "wahoo" => Self::Wahoo,
            "polar" => Self::Polar,
            "whoop" => Self::Whoop,
            _ => Self::Other,
        }
    }
}

/// Top-level activity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Running,
    Cycling,
    Swimming,
    Strength,
    Crossfit,
    Rowing,
    Walking,
    Hiking,
    Yoga,
    Elliptical,
    StairClimbing,
    Skiing,
    #[default]
    Other,
}

impl Sport {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Cycling => "cycling",
            Self::Swimming => "swimming",
            Self::Strength => "strength",
            Self::Crossfit => "crossfit",
            Self::Rowing => "rowing",
            Self::Walking => "walking",
            Self::Hiking => "hiking",
            Self::Yoga => "yoga",
            Self::Elliptical => "elliptical",
            Self::StairClimbing => "stair_climbing",
            Self::Skiing => "skiing",
            Self::Other => "other",
        }
    }

    /// Human label used when synthesizing workout titles.
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Cycling => "Cycling",
            Self::Swimming => "Swimming",
            Self::Strength => "Strength Training",
            Self::Crossfit => "CrossFit",
            Self::Rowing => "Rowing",
            Self::Walking => "Walking",
            Self::Hiking => "Hiking",
            Self::Yoga => "Yoga",
            Self::Elliptical => "Elliptical",
            Self::StairClimbing => "Stair Climbing",
            Self::Skiing => "Skiing",
            Self::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "running" => Self::Running,
            "cycling" => Self::Cycling,
            "swimming" => Self::Swimming,
            "strength" => Self::Strength,
            "crossfit" => Self::Crossfit,
            "rowing" => Self::Rowing,
            "walking" => Self::Walking,
            "hiking" => Self::Hiking,
            "yoga" => Self::Yoga,
            "elliptical" => Self::Elliptical,
            "stair_climbing" => Self::StairClimbing,
            "skiing" => Self::Skiing,
            _ => Self::Other,
        }
    }
}

/// Refinement of [`Sport`] (environment or discipline).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubSport {
    #[default]
    Generic,
    Treadmill,
    Street,
    Trail,
    Track,
    #[serde(rename = "virtual_activity")]
    Virtual,
    IndoorCycling,
    Mountain,
    OpenWater,
    LapSwimming,
    Freestyle,
}

impl SubSport {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Treadmill => "treadmill",
            Self::Street => "street",
            Self::Trail => "trail",
            Self::Track => "track",
            Self::Virtual => "virtual_activity",
            Self::IndoorCycling => "indoor_cycling",
            Self::Mountain => "mountain",
            Self::OpenWater => "open_water",
            Self::LapSwimming => "lap_swimming",
            Self::Freestyle => "freestyle",
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Generic => "Generic",
            Self::Treadmill => "Treadmill",
            Self::Street => "Street/Road",
            Self::Trail => "Trail",
            Self::Track => "Track",
            Self::Virtual => "Virtual/Indoor",
            Self::IndoorCycling => "Indoor Cycling",
            Self::Mountain => "Mountain",
            Self::OpenWater => "Open Water",
            Self::LapSwimming => "Lap Swimming",
            Self::Freestyle => "Freestyle",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "treadmill" => Self::Treadmill,
            "street" => Self::Street,
            "trail" => Self::Trail,
            "track" => Self::Track,
            "virtual_activity" => Self::Virtual,
            "indoor_cycling" => Self::IndoorCycling,
            "mountain" => Self::Mountain,
            "open_water" => Self::OpenWater,
            "lap_swimming" => Self::LapSwimming,
            "freestyle" => Self::Freestyle,
            _ => Self::Generic,
        }
    }
}

/// What closed a lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LapTrigger {
    #[default]
    Manual,
    Time,
    Distance,
    #[serde(rename = "position_start")]
    Position,
    #[serde(rename = "fitness_equipment")]
    FitnessEquipment,
    SessionEnd,
}

impl LapTrigger {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Time => "time",
            Self::Distance => "distance",
            Self::Position => "position_start",
            Self::FitnessEquipment => "fitness_equipment",
            Self::SessionEnd => "session_end",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "time" => Self::Time,
            "distance" => Self::Distance,
            "position_start" => Self::Position,
            "fitness_equipment" => Self::FitnessEquipment,
            "session_end" => Self::SessionEnd,
            _ => Self::Manual,
        }
    }
}

/// Training intensity of a lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntensityLevel {
    Rest,
    Warmup,
    #[default]
    Active,
    Recovery,
    Tempo,
    Threshold,
    Vo2max,
    Anaerobic,
    Sprint,
    Cooldown,
}

impl IntensityLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::Warmup => "warmup",
            Self::Active => "active",
            Self::Recovery => "recovery",
            Self::Tempo => "tempo",
            Self::Threshold => "threshold",
            Self::Vo2max => "vo2max",
            Self::Anaerobic => "anaerobic",
            Self::Sprint => "sprint",
            Self::Cooldown => "cooldown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "rest" => Self::Rest,
            "warmup" => Self::Warmup,
            "recovery" => Self::Recovery,
            "tempo" => Self::Tempo,
            "threshold" => Self::Threshold,
            "vo2max" => Self::Vo2max,
            "anaerobic" => Self::Anaerobic,
            "sprint" => Self::Sprint,
            "cooldown" => Self::Cooldown,
            _ => Self::Active,
        }
    }
}
