use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use futures::future::{BoxFuture, FutureExt};
use time::OffsetDateTime;

use crate::db::Db;
use crate::errors::BackendError;
use crate::recording::{Id, NewRecording, Recording};

/// An in-memory index whose writes can be made to fail.
#[derive(Default)]
pub(crate) struct MockDb {
    pub(crate) rows: RwLock<Vec<Recording>>,
    pub(crate) fail_inserts: AtomicBool,
    pub(crate) fail_deletes: AtomicBool,
}

impl MockDb {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().unwrap().len()
    }
}

fn write_failure() -> BackendError {
    BackendError::IndexWriteError {
        source: sqlx::Error::PoolClosed,
    }
}

impl Db for MockDb {
    fn insert(&self, recording: NewRecording) -> BoxFuture<'_, Result<Recording, BackendError>> {
        async move {
            if self.fail_inserts.load(Ordering::SeqCst) {
                return Err(write_failure());
            }

            let mut rows = self.rows.write().unwrap();
            let id = rows.iter().map(Recording::id).max().unwrap_or(0) + 1;
            let row = Recording::new(
                id,
                recording.display_name,
                recording.storage_key,
                recording.size_bytes,
                OffsetDateTime::now_utc(),
            );

            rows.push(row.clone());

            Ok(row)
        }
        .boxed()
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<Recording>, BackendError>> {
        let mut rows = self.rows.read().unwrap().clone();
        rows.sort_by(|a, b| b.id().cmp(&a.id()));

        async move { Ok(rows) }.boxed()
    }

    fn retrieve(&self, id: Id) -> BoxFuture<'_, Result<Option<Recording>, BackendError>> {
        let row = self
            .rows
            .read()
            .unwrap()
            .iter()
            .find(|r| r.id() == id)
            .cloned();

        async move { Ok(row) }.boxed()
    }

    fn delete(&self, id: Id) -> BoxFuture<'_, Result<(), BackendError>> {
        async move {
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(write_failure());
            }

            let mut rows = self.rows.write().unwrap();
            let before = rows.len();
            rows.retain(|r| r.id() != id);

            if rows.len() == before {
                Err(BackendError::NotFound(id))
            } else {
                Ok(())
            }
        }
        .boxed()
    }
}
