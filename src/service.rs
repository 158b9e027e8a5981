//! The four recording operations and the ordering rules between the blob
//! store and the index.
//!
//! Ingest writes the blob before the row; delete removes the blob before
//! the row. There is no transaction spanning both, so a failure between
//! the two steps is logged and reported rather than rolled back.

use std::path::PathBuf;

use log::{debug, error, o, warn};
use warp::http::header::{self, HeaderName};
use warp::http::StatusCode;

use crate::environment::Environment;
use crate::errors::BackendError;
use crate::range::{self, RangePlan};
use crate::recording::{Id, NewRecording, RecordingView};
use crate::store::ByteStream;

/// Blobs are browser-recorded media.
pub const CONTENT_TYPE: &str = "video/webm";

/// An uploaded file part.
pub struct IncomingFile {
    /// The filename the client supplied, if any.
    pub name: Option<String>,

    /// The raw content.
    pub body: ByteStream,
}

impl IncomingFile {
    pub fn new(name: Option<String>, body: ByteStream) -> Self {
        IncomingFile { name, body }
    }
}

/// Describes how to answer a retrieve request: what to send, from which
/// blob, and with which status and headers.
#[derive(Clone, Debug, PartialEq)]
pub struct Playback {
    pub id: Id,
    pub key: String,
    pub path: PathBuf,
    pub total_length: u64,
    pub plan: RangePlan,
}

impl Playback {
    pub fn status(&self) -> StatusCode {
        if self.plan.is_partial() {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        }
    }

    pub fn headers(&self) -> Vec<(HeaderName, String)> {
        let (_, length) = self.window();

        let mut headers = vec![
            (header::CONTENT_TYPE, CONTENT_TYPE.to_owned()),
            (header::CONTENT_LENGTH, length.to_string()),
            (header::ACCEPT_RANGES, "bytes".to_owned()),
        ];

        if let RangePlan::Partial { start, end, .. } = self.plan {
            headers.push((
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", start, end, self.total_length),
            ));
        }

        headers
    }

    /// The `(offset, length)` region of the blob to stream.
    pub fn window(&self) -> (u64, u64) {
        self.plan.window().unwrap_or((0, 0))
    }
}

/// Stores an upload and records it in the index.
pub async fn ingest(
    environment: &Environment,
    file: Option<IncomingFile>,
) -> Result<RecordingView, BackendError> {
    let IncomingFile { name, body } = file.ok_or(BackendError::NoFileProvided)?;
    let name = name.filter(|name| !name.trim().is_empty());
    let logger = &environment.logger;

    debug!(logger, "Saving recording to store..."; "name" => ?name);
    let blob = environment.store.save(name.as_deref(), body).await?;

    let logger = logger.new(o!("key" => blob.key.clone()));
    let display_name = name.unwrap_or_else(|| blob.key.clone());

    debug!(logger, "Writing metadata to index..."; "size" => blob.size_bytes);
    let recording = environment
        .db
        .insert(NewRecording::new(
            display_name,
            blob.key.clone(),
            blob.size_bytes,
        ))
        .await
        .map_err(|e| {
            error!(logger, "Index insert failed, blob is orphaned"; "path" => %blob.path.display(), "error" => ?e);
            e
        })?;

    Ok(recording.view())
}

/// Lists every recording, newest first.
pub async fn list(environment: &Environment) -> Result<Vec<RecordingView>, BackendError> {
    let recordings = environment.db.list().await?;

    Ok(recordings.iter().map(|r| r.view()).collect())
}

/// Works out what to send for a recording given an optional `Range`
/// header.
pub async fn retrieve(
    environment: &Environment,
    id: Id,
    range_header: Option<&str>,
) -> Result<Playback, BackendError> {
    let recording = environment
        .db
        .retrieve(id)
        .await?
        .ok_or(BackendError::NotFound(id))?;

    let key = recording.storage_key().to_owned();
    let logger = environment.logger.new(o!("id" => id, "key" => key.clone()));

    let total_length = match environment.store.stat(&key).await? {
        Some(size) => size,
        None => {
            warn!(logger, "Stale index row: blob is missing");
            return Err(BackendError::FileMissing { id, key });
        }
    };

    if total_length != recording.size_bytes() {
        warn!(logger, "Blob size differs from index"; "indexed" => recording.size_bytes(), "actual" => total_length);
    }

    let plan = range::resolve(range_header, total_length);

    if plan == RangePlan::Unsatisfiable {
        debug!(logger, "Unsatisfiable range"; "range" => ?range_header, "total" => total_length);
        return Err(BackendError::RangeNotSatisfiable { total_length });
    }

    Ok(Playback {
        id,
        path: environment.store.path_for(&key),
        key,
        total_length,
        plan,
    })
}

/// Opens the byte stream a [`Playback`] describes.
pub async fn open(
    environment: &Environment,
    playback: &Playback,
) -> Result<ByteStream, BackendError> {
    let (offset, length) = playback.window();

    environment
        .store
        .open(&playback.key, offset, length)
        .await?
        .ok_or_else(|| BackendError::FileMissing {
            id: playback.id,
            key: playback.key.clone(),
        })
}

/// Removes a recording's blob and then its row.
pub async fn delete(environment: &Environment, id: Id) -> Result<(), BackendError> {
    let recording = environment
        .db
        .retrieve(id)
        .await?
        .ok_or(BackendError::NotFound(id))?;

    let key = recording.storage_key();
    let logger = environment.logger.new(o!("id" => id, "key" => key.to_owned()));

    debug!(logger, "Deleting blob...");
    environment.store.delete(key).await.map_err(|e| {
        error!(logger, "Blob deletion failed, keeping index row"; "error" => ?e);
        e
    })?;

    debug!(logger, "Deleting index row...");
    environment.db.delete(id).await.map_err(|e| {
        match &e {
            BackendError::NotFound(_) => {
                debug!(logger, "Index row already removed by another request")
            }
            _ => error!(logger, "Index delete failed, row outlives its blob"; "error" => ?e),
        }
        e
    })
}
