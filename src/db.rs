use futures::future::BoxFuture;

use crate::errors::BackendError;
use crate::recording::{Id, NewRecording, Recording};

#[cfg(test)]
pub(crate) mod mock;

pub trait Db: Send + Sync {
    /// Appends a row, returning it with its assigned ID and creation time.
    fn insert(&self, recording: NewRecording) -> BoxFuture<'_, Result<Recording, BackendError>>;

    /// Returns every row, newest first.
    fn list(&self) -> BoxFuture<'_, Result<Vec<Recording>, BackendError>>;

    fn retrieve(&self, id: Id) -> BoxFuture<'_, Result<Option<Recording>, BackendError>>;

    /// Removes exactly one row, or fails with [`BackendError::NotFound`].
    fn delete(&self, id: Id) -> BoxFuture<'_, Result<(), BackendError>>;
}

pub use self::sqlite::*;

mod sqlite {
    use std::convert::TryFrom;
    use std::path::Path;

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
    use time::OffsetDateTime;

    use crate::errors::BackendError;
    use crate::recording::{Id, NewRecording, Recording};

    /// A single connection serializes every call against the file.
    const MAX_CONNECTIONS: u32 = 1;

    #[derive(sqlx::FromRow)]
    struct RecordingRow {
        id: i64,
        filename: String,
        filepath: String,
        filesize: i64,
        created_at: i64,
    }

    pub struct SqliteDb {
        pool: SqlitePool,
    }

    impl SqliteDb {
        pub fn new(pool: SqlitePool) -> Self {
            SqliteDb { pool }
        }

        /// Opens (creating if necessary) the index at `path` and ensures
        /// its schema exists.
        pub async fn open(path: impl AsRef<Path>) -> Result<Self, BackendError> {
            let options = SqliteConnectOptions::new()
                .filename(path.as_ref())
                .create_if_missing(true);

            let pool = SqlitePoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .connect_with(options)
                .await
                .map_err(|source| BackendError::IndexUnavailable { source })?;

            let db = SqliteDb::new(pool);
            db.initialize().await?;

            Ok(db)
        }

        /// Creates the schema if it doesn't exist yet.
        pub async fn initialize(&self) -> Result<(), BackendError> {
            sqlx::query(include_str!("queries/schema.sql"))
                .execute(&self.pool)
                .await
                .map_err(|source| BackendError::IndexUnavailable { source })?;

            Ok(())
        }
    }

    // these can be simplified once async functions in traits are usable
    // behind `dyn`
    impl super::Db for SqliteDb {
        fn insert(
            &self,
            recording: NewRecording,
        ) -> BoxFuture<'_, Result<Recording, BackendError>> {
            async move {
                let created_at = now_millis();
                let size = i64::try_from(recording.size_bytes)
                    .map_err(|_| BackendError::BlobTooLarge(recording.size_bytes))?;

                let id = sqlx::query(include_str!("queries/create.sql"))
                    .bind(&recording.display_name)
                    .bind(&recording.storage_key)
                    .bind(size)
                    .bind(created_at)
                    .execute(&self.pool)
                    .await
                    .map_err(|source| BackendError::IndexWriteError { source })?
                    .last_insert_rowid();

                Ok(Recording::new(
                    id,
                    recording.display_name,
                    recording.storage_key,
                    recording.size_bytes,
                    from_millis(id, created_at)?,
                ))
            }
            .boxed()
        }

        fn list(&self) -> BoxFuture<'_, Result<Vec<Recording>, BackendError>> {
            async move {
                let rows = sqlx::query_as::<_, RecordingRow>(include_str!("queries/list.sql"))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|source| BackendError::IndexReadError { source })?;

                rows.into_iter().map(to_recording).collect()
            }
            .boxed()
        }

        fn retrieve(&self, id: Id) -> BoxFuture<'_, Result<Option<Recording>, BackendError>> {
            async move {
                let row = sqlx::query_as::<_, RecordingRow>(include_str!("queries/retrieve.sql"))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|source| BackendError::IndexReadError { source })?;

                row.map(to_recording).transpose()
            }
            .boxed()
        }

        fn delete(&self, id: Id) -> BoxFuture<'_, Result<(), BackendError>> {
            async move {
                let count = sqlx::query(include_str!("queries/delete.sql"))
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(|source| BackendError::IndexWriteError { source })?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NotFound(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }
    }

    fn to_recording(row: RecordingRow) -> Result<Recording, BackendError> {
        let size_bytes =
            u64::try_from(row.filesize).map_err(|_| BackendError::CorruptIndexRow { id: row.id })?;

        Ok(Recording::new(
            row.id,
            row.filename,
            row.filepath,
            size_bytes,
            from_millis(row.id, row.created_at)?,
        ))
    }

    fn now_millis() -> i64 {
        (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
    }

    fn from_millis(id: Id, millis: i64) -> Result<OffsetDateTime, BackendError> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
            .map_err(|_| BackendError::CorruptIndexRow { id })
    }
}
