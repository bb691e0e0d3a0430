//! Vendor vocabulary to canonical vocabulary.
//!
//! Keys are the lowercase profile names the decoder emits. Lookups lowercase
//! their input and fall back to the canonical default when the value is
//! missing or unknown.

use crate::models::{IntensityLevel, LapTrigger, Sport, SubSport};

const SPORTS: &[(&str, Sport)] = &[
    ("running", Sport::Running),
    ("cycling", Sport::Cycling),
    ("swimming", Sport::Swimming),
    ("fitness_equipment", Sport::Strength),
    ("training", Sport::Strength),
    ("walking", Sport::Walking),
    ("hiking", Sport::Hiking),
    ("rowing", Sport::Rowing),
    ("elliptical", Sport::Elliptical),
    ("stair_climbing", Sport::StairClimbing),
    ("alpine_skiing", Sport::Skiing),
    ("snowboarding", Sport::Skiing),
];

const SUB_SPORTS: &[(&str, SubSport)] = &[
    ("generic", SubSport::Generic),
    ("treadmill", SubSport::Treadmill),
    ("street", SubSport::Street),
    ("trail", SubSport::Trail),
    ("track", SubSport::Track),
    ("spin", SubSport::IndoorCycling),
    ("indoor_cycling", SubSport::IndoorCycling),
    ("virtual_activity", SubSport::Virtual),
    ("open_water", SubSport::OpenWater),
    ("lap_swimming", SubSport::LapSwimming),
];

const LAP_TRIGGERS: &[(&str, LapTrigger)] = &[
    ("manual", LapTrigger::Manual),
    ("time", LapTrigger::Time),
    ("distance", LapTrigger::Distance),
    ("position_start", LapTrigger::Position),
    ("session_end", LapTrigger::SessionEnd),
];

const INTENSITIES: &[(&str, IntensityLevel)] = &[
    ("warmup", IntensityLevel::Warmup),
    ("cooldown", IntensityLevel::Cooldown),
    ("rest", IntensityLevel::Rest),
    ("recovery", IntensityLevel::Recovery),
    ("active", IntensityLevel::Active),
];

fn lookup<T: Copy>(table: &[(&str, T)], raw: Option<&str>, fallback: T) -> T {
    let Some(raw) = raw else {
        return fallback;
    };
    let key = raw.trim().to_lowercase();
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| *value)
        .unwrap_or(fallback)
}

pub fn map_sport(raw: Option<&str>) -> Sport {
    lookup(SPORTS, raw, Sport::Other)
}

pub fn map_sub_sport(raw: Option<&str>) -> SubSport {
    lookup(SUB_SPORTS, raw, SubSport::Generic)
}

pub fn map_lap_trigger(raw: Option<&str>) -> LapTrigger {
    lookup(LAP_TRIGGERS, raw, LapTrigger::Manual)
}

pub fn map_intensity(raw: Option<&str>) -> IntensityLevel {
    lookup(INTENSITIES, raw, IntensityLevel::Active)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sport_lookup_ignores_case() {
        assert_eq!(map_sport(Some("Running")), Sport::Running);
        assert_eq!(map_sport(Some("ALPINE_SKIING")), Sport::Skiing);
        assert_eq!(map_sport(Some("training")), Sport::Strength);
    }

    #[test]
    fn unknown_and_missing_values_fall_back() {
        assert_eq!(map_sport(Some("kitesurfing")), Sport::Other);
        assert_eq!(map_sport(None), Sport::Other);
        assert_eq!(map_sub_sport(Some("e_bike_fitness")), SubSport::Generic);
        assert_eq!(map_sub_sport(None), SubSport::Generic);
        assert_eq!(map_lap_trigger(Some("heart_rate")), LapTrigger::Manual);
        assert_eq!(map_lap_trigger(None), LapTrigger::Manual);
        assert_eq!(map_intensity(Some("interval")), IntensityLevel::Active);
        assert_eq!(map_intensity(None), IntensityLevel::Active);
    }

    #[test]
    fn sub_sport_aliases() {
        assert_eq!(map_sub_sport(Some("spin")), SubSport::IndoorCycling);
        assert_eq!(map_sub_sport(Some("virtual_activity")), SubSport::Virtual);
    }

    #[test]
    fn lap_vocabularies() {
        assert_eq!(map_lap_trigger(Some("session_end")), LapTrigger::SessionEnd);
        assert_eq!(map_lap_trigger(Some("position_start")), LapTrigger::Position);
        assert_eq!(map_intensity(Some("Warmup")), IntensityLevel::Warmup);
    }
}
