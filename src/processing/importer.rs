//! FIT import orchestration: hash, duplicate check, decode, derive and
//! persist the workout graph in one transaction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use crate::db::{Database, PersistOutcome};
use crate::error::ImportError;
use crate::models::{FileIdentity, ImportRecord, ImportStatus};
use crate::processing::extract::{WorkoutContext, derive_workout_graph, file_identity};
use crate::processing::parse::{FitparserDecoder, MessageDecoder, partition};
use crate::processing::types::{DecodedFit, ImportOptions, ImportOutcome};

/// Read size for streaming the file through the hasher.
pub const HASH_CHUNK_SIZE: usize = 8192;

/// Default number of record points per bulk insert statement.
pub const DEFAULT_RECORD_BATCH_SIZE: usize = 1000;

/// Imports FIT files for users into the workout store.
#[derive(Clone)]
pub struct FitImporter {
    db: Database,
    decoder: Arc<dyn MessageDecoder>,
    batch_size: usize,
}

impl FitImporter {
    pub fn new(db: Database) -> Self {
        Self::with_decoder(db, Arc::new(FitparserDecoder))
    }

    pub fn with_decoder(db: Database, decoder: Arc<dyn MessageDecoder>) -> Self {
        Self {
            db,
            decoder,
            batch_size: DEFAULT_RECORD_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Import the FIT file at `path` for `user_id`.
    ///
    /// A file whose bytes were already imported by this user returns the
    /// earlier result with `duplicate` set and nothing new written. Files
    /// that cannot be decoded or lack a session summary leave a `failed`
    /// import row behind and return the error. The workout graph is written
    /// in a single transaction, so a failure while persisting leaves no
    /// workout rows at all.
    #[tracing::instrument(
        skip_all,
        fields(
            path = %path.display(),
            %user_id,
            file_hash = tracing::field::Empty,
            import_id = tracing::field::Empty,
        )
    )]
    pub async fn import_file(
        &self,
        path: &Path,
        user_id: Uuid,
        options: ImportOptions,
    ) -> Result<ImportOutcome, ImportError> {
        let (file_hash, file_size) = file_sha256(path).await?;
        tracing::Span::current().record("file_hash", file_hash.as_str());

        let original_filename = options
            .original_filename
            .clone()
            .unwrap_or_else(|| file_name(path));

        if options.check_duplicates {
            if let Some(existing) = self.db.find_completed_import(user_id, &file_hash).await? {
                if let Some(outcome) = self.duplicate_outcome(existing, &original_filename).await? {
                    tracing::info!(
                        import_id = %outcome.import.id,
                        workout_id = %outcome.workout.id,
                        "Duplicate FIT file, returning earlier import"
                    );
                    return Ok(outcome);
                }
            }
        }

        let mut import = ImportRecord {
            id: Uuid::new_v4(),
            user_id,
            workout_id: None,
            original_filename,
            file_size,
            file_hash,
            storage_path: options.storage_path.clone(),
            identity: FileIdentity::default(),
            status: ImportStatus::Processing,
            error_message: None,
            uploaded_at: Utc::now(),
            processed_at: None,
        };
        tracing::Span::current().record("import_id", tracing::field::display(import.id));

        let decoded = match self.decode(path).await {
            Ok(decoded) => decoded,
            Err(err) => return Err(self.reject(import, err).await),
        };
        import.identity = file_identity(decoded.file_id.as_ref());

        let Some(session) = decoded.session.as_ref() else {
            return Err(self.reject(import, ImportError::MissingSession).await);
        };

        let mut warnings = Vec::new();
        if decoded.session_count > 1 {
            warnings.push(format!(
                "FIT file contains {} sessions; only the last one was imported",
                decoded.session_count
            ));
        }

        self.db.create_import(&import).await?;

        let context = WorkoutContext {
            workout_id: Uuid::new_v4(),
            user_id,
            session_id: options.session_id,
        };
        let graph = derive_workout_graph(session, &decoded, context, &mut warnings);
        tracing::debug!(
            laps = graph.laps.len(),
            records = graph.records.len(),
            devices = graph.devices.len(),
            "Derived workout graph"
        );

        let persisted = match self.db.persist_graph(import.id, &graph, self.batch_size).await {
            Ok(persisted) => persisted,
            Err(err) => {
                let message = err.to_string();
                if let Err(mark_err) = self.db.mark_import_failed(import.id, &message).await {
                    tracing::error!(error = %mark_err, "Failed to mark import as failed");
                }
                tracing::error!(error = %message, "Workout graph insert rolled back");
                return Err(err.into());
            }
        };

        match persisted {
            PersistOutcome::Completed { processed_at } => {
                import.status = ImportStatus::Completed;
                import.workout_id = Some(graph.workout.id);
                import.processed_at = Some(processed_at);

                log_warnings(&warnings);
                tracing::info!(
                    workout_id = %graph.workout.id,
                    records = graph.records.len(),
                    laps = graph.laps.len(),
                    "FIT import completed"
                );

                Ok(ImportOutcome {
                    workout: graph.workout,
                    import,
                    warnings,
                    duplicate: false,
                })
            }
            PersistOutcome::AlreadyCompleted => {
                // A concurrent import of the same bytes committed first.
                let message = duplicate_warning(&import.original_filename);
                self.db.mark_import_duplicate(import.id, &message).await?;

                let winner = self
                    .db
                    .find_completed_import(user_id, &import.file_hash)
                    .await?
                    .ok_or_else(|| ImportError::NotFound("completed import".to_string()))?;
                let mut outcome = self
                    .duplicate_outcome(winner, &import.original_filename)
                    .await?
                    .ok_or_else(|| ImportError::NotFound("workout".to_string()))?;

                warnings.append(&mut outcome.warnings);
                outcome.warnings = warnings;
                log_warnings(&outcome.warnings);
                Ok(outcome)
            }
        }
    }

    async fn decode(&self, path: &Path) -> Result<DecodedFit, ImportError> {
        let decoder = Arc::clone(&self.decoder);
        let path: PathBuf = path.to_path_buf();
        let messages = tokio::task::spawn_blocking(move || decoder.decode(&path))
            .await
            .map_err(|err| ImportError::Decode(format!("decoder task failed: {err}")))??;
        Ok(partition(messages))
    }

    /// Earlier import as a duplicate result, or `None` if its workout no
    /// longer exists.
    async fn duplicate_outcome(
        &self,
        existing: ImportRecord,
        filename: &str,
    ) -> Result<Option<ImportOutcome>, ImportError> {
        let Some(workout_id) = existing.workout_id else {
            return Ok(None);
        };
        let Some(workout) = self.db.get_workout(workout_id).await? else {
            return Ok(None);
        };

        Ok(Some(ImportOutcome {
            workout,
            import: existing,
            warnings: vec![duplicate_warning(filename)],
            duplicate: true,
        }))
    }

    /// Record a rejected file as a failed import and hand the error back.
    async fn reject(&self, mut import: ImportRecord, err: ImportError) -> ImportError {
        import.status = ImportStatus::Failed;
        import.error_message = Some(err.to_string());
        import.processed_at = Some(Utc::now());

        tracing::warn!(error = %err, "Rejected FIT file");
        if let Err(db_err) = self.db.create_import(&import).await {
            tracing::error!(error = %db_err, "Failed to record rejected import");
        }
        err
    }
}

/// Lowercase hex SHA-256 and byte size of the file, read in fixed chunks.
pub async fn file_sha256(path: &Path) -> Result<(String, i64), std::io::Error> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    let mut size: u64 = 0;

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        size += read as u64;
    }

    Ok((
        hex::encode(hasher.finalize()),
        i64::try_from(size).unwrap_or(i64::MAX),
    ))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn duplicate_warning(filename: &str) -> String {
    format!("Duplicate file detected: {filename}")
}

fn log_warnings(warnings: &[String]) {
    for warning in warnings {
        tracing::warn!(%warning, "FIT import warning");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_in_chunks() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"abc").unwrap();

        let (hash, size) = file_sha256(file.path()).await.unwrap();
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(size, 3);
    }

    #[tokio::test]
    async fn hash_spans_multiple_chunks() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let bytes = vec![7u8; HASH_CHUNK_SIZE * 2 + 17];
        std::fs::write(file.path(), &bytes).unwrap();

        let (hash, size) = file_sha256(file.path()).await.unwrap();
        assert_eq!(hash, hex::encode(Sha256::digest(&bytes)));
        assert_eq!(size, bytes.len() as i64);
    }

    #[test]
    fn file_name_uses_last_component() {
        assert_eq!(file_name(Path::new("/tmp/uploads/run.fit")), "run.fit");
    }
}
