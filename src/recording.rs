use std::path::Path;

use serde::Serialize;
use time::OffsetDateTime;

/// An ID in the index.
pub type Id = i64;

/// A single recording in the index.
#[derive(Clone, Debug, PartialEq)]
pub struct Recording {
    /// The ID assigned on insert.
    pub(crate) id: Id,

    /// The original filename supplied by the uploader.
    pub(crate) display_name: String,

    /// The blob store's generated filename.
    pub(crate) storage_key: String,

    /// The size of the blob when it was ingested.
    pub(crate) size_bytes: u64,

    /// The date and time it was inserted.
    pub(crate) created_at: OffsetDateTime,
}

impl Recording {
    pub fn new(
        id: Id,
        display_name: String,
        storage_key: String,
        size_bytes: u64,
        created_at: OffsetDateTime,
    ) -> Self {
        Recording {
            id,
            display_name,
            storage_key,
            size_bytes,
            created_at,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Redacts the recording for clients: only the final segment of the
    /// storage key survives.
    pub fn view(&self) -> RecordingView {
        let filepath = Path::new(&self.storage_key)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        RecordingView {
            id: self.id,
            filename: self.display_name.clone(),
            filepath,
            filesize: self.size_bytes,
            created_at: self.created_at,
        }
    }
}

/// A recording before the index has assigned it an ID.
#[derive(Clone, Debug)]
pub struct NewRecording {
    pub(crate) display_name: String,
    pub(crate) storage_key: String,
    pub(crate) size_bytes: u64,
}

impl NewRecording {
    pub fn new(display_name: String, storage_key: String, size_bytes: u64) -> Self {
        NewRecording {
            display_name,
            storage_key,
            size_bytes,
        }
    }
}

/// The client-facing form of a recording.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingView {
    pub id: Id,
    pub filename: String,
    pub filepath: String,
    pub filesize: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
