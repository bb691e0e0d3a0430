use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Duplicate,
}

impl ImportStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Duplicate => "duplicate",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "duplicate" => Self::Duplicate,
            _ => Self::Pending,
        }
    }
}

/// Metadata from the `file_id` message. Absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileIdentity {
    pub serial_number: Option<String>,
    pub time_created: Option<DateTime<Utc>>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub file_type: Option<String>,
}

/// Audit row for one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workout_id: Option<Uuid>,
    pub original_filename: String,
    pub file_size: i64,
    /// Lowercase hex SHA-256 of the file bytes.
    pub file_hash: String,
    pub storage_path: Option<String>,
    #[serde(flatten)]
    pub identity: FileIdentity,
    pub status: ImportStatus,
    pub error_message: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}
