use std::io;
use std::path::{Path, PathBuf};
use std::convert::TryFrom;

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{BoxStream, StreamExt};
use time::OffsetDateTime;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::errors::BackendError;

#[cfg(test)]
pub(crate) mod mock;

/// A stream of raw blob data.
pub type ByteStream = BoxStream<'static, Result<Bytes, BackendError>>;

/// Returns the current time in milliseconds since the Unix epoch.
pub type Clock = fn() -> u128;

/// The extension used when the uploader's filename doesn't provide one.
pub const DEFAULT_EXTENSION: &str = ".webm";

const TOKEN_LENGTH: usize = 12;
const MAX_EXTENSION_LENGTH: usize = 16;
const MAX_KEY_ATTEMPTS: usize = 8;
const READ_CHUNK_SIZE: usize = 64 * 1024;

pub trait Store: Send + Sync {
    /// Saves the given data under a freshly generated key.
    fn save(&self, name_hint: Option<&str>, body: ByteStream)
        -> BoxFuture<'_, Result<StoredBlob, BackendError>>;

    /// Deletes the given object. Deleting an absent object succeeds.
    fn delete(&self, key: &str) -> BoxFuture<'_, Result<(), BackendError>>;

    /// Returns where the given object lives. Doesn't touch the disk.
    fn path_for(&self, key: &str) -> PathBuf;

    /// Returns the current size of the given object, if it exists.
    fn stat(&self, key: &str) -> BoxFuture<'_, Result<Option<u64>, BackendError>>;

    /// Streams `length` bytes of the given object starting at `offset`,
    /// or `None` if the object doesn't exist.
    fn open(
        &self,
        key: &str,
        offset: u64,
        length: u64,
    ) -> BoxFuture<'_, Result<Option<ByteStream>, BackendError>>;
}

/// The outcome of a successful [`Store::save`].
#[derive(Clone, Debug, PartialEq)]
pub struct StoredBlob {
    pub key: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// A store that keeps each blob as a file under a single directory.
pub struct FsStore {
    root: PathBuf,
    clock: Clock,
}

impl FsStore {
    /// Creates a new instance, creating `root` if it doesn't exist yet.
    pub async fn create(root: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let root = root.into();

        fs::create_dir_all(&root)
            .await
            .map_err(|source| BackendError::StorageWriteError { source })?;

        Ok(FsStore {
            root,
            clock: system_clock,
        })
    }

    /// Replaces the clock used to prefix new keys.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Store for FsStore {
    fn save(
        &self,
        name_hint: Option<&str>,
        body: ByteStream,
    ) -> BoxFuture<'_, Result<StoredBlob, BackendError>> {
        let extension = extension_for(name_hint);

        save(self, extension, body).boxed()
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<(), BackendError>> {
        if key.is_empty() {
            return async { Ok(()) }.boxed();
        }

        let path = self.path_for(key);

        async move {
            match fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(BackendError::StorageDeleteError { source }),
            }
        }
        .boxed()
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // only the final segment, so a key can never leave the root
        if key.is_empty() {
            return self.root.join("_");
        }

        match Path::new(key).file_name() {
            Some(name) => self.root.join(name),
            None => self.root.join(key.replace(&['/', '\\', '.'][..], "_")),
        }
    }

    fn stat(&self, key: &str) -> BoxFuture<'_, Result<Option<u64>, BackendError>> {
        let path = self.path_for(key);

        async move {
            match fs::metadata(&path).await {
                Ok(metadata) if metadata.is_file() => Ok(Some(metadata.len())),
                Ok(_) => Ok(None),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(source) => Err(BackendError::StorageReadError { source }),
            }
        }
        .boxed()
    }

    fn open(
        &self,
        key: &str,
        offset: u64,
        length: u64,
    ) -> BoxFuture<'_, Result<Option<ByteStream>, BackendError>> {
        let path = self.path_for(key);

        async move {
            let mut file = match File::open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(source) => return Err(BackendError::StorageReadError { source }),
            };

            file.seek(io::SeekFrom::Start(offset))
                .await
                .map_err(|source| BackendError::StorageReadError { source })?;

            let stream = ReaderStream::with_capacity(file.take(length), READ_CHUNK_SIZE)
                .map(|chunk| chunk.map_err(|source| BackendError::StorageReadError { source }));

            Ok(Some(stream.boxed()))
        }
        .boxed()
    }
}

async fn save(
    store: &FsStore,
    extension: String,
    mut body: ByteStream,
) -> Result<StoredBlob, BackendError> {
    let (key, path, mut file) = create_unique(store, &extension).await?;

    match write_body(&mut file, &mut body).await {
        Ok(size_bytes) => Ok(StoredBlob {
            key,
            path,
            size_bytes,
        }),
        Err(e) => {
            drop(file);
            // the partial file must not outlive the failed upload
            let _ = fs::remove_file(&path).await;

            Err(e)
        }
    }
}

async fn create_unique(
    store: &FsStore,
    extension: &str,
) -> Result<(String, PathBuf, File), BackendError> {
    let mut attempts = 1;

    loop {
        let key = storage_key((store.clock)(), &random_token(), extension);
        let path = store.root.join(&key);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((key, path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempts < MAX_KEY_ATTEMPTS => {
                attempts += 1;
            }
            Err(source) => return Err(BackendError::StorageWriteError { source }),
        }
    }
}

async fn write_body(file: &mut File, body: &mut ByteStream) -> Result<u64, BackendError> {
    let mut size_bytes = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;

        file.write_all(&chunk)
            .await
            .map_err(|source| BackendError::StorageWriteError { source })?;
        size_bytes += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|source| BackendError::StorageWriteError { source })?;

    Ok(size_bytes)
}

/// Builds a key of the form `<millis>-<token><extension>`.
pub fn storage_key(millis: u128, token: &str, extension: &str) -> String {
    format!("{}-{}{}", millis, token, extension)
}

/// Derives the extension (with its leading dot) to give a new blob.
pub fn extension_for(name_hint: Option<&str>) -> String {
    name_hint
        .and_then(|name| Path::new(name).extension())
        .and_then(|extension| extension.to_str())
        .filter(|extension| {
            !extension.is_empty()
                && extension.len() <= MAX_EXTENSION_LENGTH
                && extension.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|extension| format!(".{}", extension.to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_owned())
}

fn random_token() -> String {
    let mut token = to_base36(Uuid::new_v4().as_u128());
    token.truncate(TOKEN_LENGTH);
    token
}

fn to_base36(mut n: u128) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if n == 0 {
        return "0".to_owned();
    }

    let mut digits = Vec::new();

    while n > 0 {
        digits.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }

    digits.iter().rev().map(|&d| d as char).collect()
}

fn system_clock() -> u128 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;

    // keys only need a non-negative prefix; clocks before 1970 count as 0
    u128::try_from(millis).unwrap_or(0)
}
