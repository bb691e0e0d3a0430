pub mod import;
pub mod vocab;
pub mod workout;

pub use import::{FileIdentity, ImportRecord, ImportStatus};
pub use vocab::{IntensityLevel, LapTrigger, Sport, SubSport, WorkoutSource};
pub use workout::{DeviceInfo, Lap, RecordPoint, UNKNOWN_DEVICE_INDEX, Workout, WorkoutGraph};
