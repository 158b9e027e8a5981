use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::errors::BackendError;
use crate::store::{extension_for, storage_key, ByteStream, Store, StoredBlob};

/// An in-memory store whose writes and deletes can be made to fail.
#[derive(Default)]
pub(crate) struct MockStore {
    pub(crate) map: RwLock<HashMap<String, Vec<u8>>>,
    pub(crate) fail_saves: AtomicBool,
    pub(crate) fail_deletes: AtomicBool,
    counter: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.read().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap().len()
    }
}

impl Store for MockStore {
    fn save(
        &self,
        name_hint: Option<&str>,
        body: ByteStream,
    ) -> BoxFuture<'_, Result<StoredBlob, BackendError>> {
        let extension = extension_for(name_hint);

        mock_save(self, extension, body).boxed()
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<(), BackendError>> {
        let key = key.to_owned();

        async move {
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(BackendError::StorageDeleteError {
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "mock delete failure"),
                });
            }

            self.map.write().unwrap().remove(&key);

            Ok(())
        }
        .boxed()
    }

    fn path_for(&self, key: &str) -> PathBuf {
        PathBuf::from("/mock").join(key)
    }

    fn stat(&self, key: &str) -> BoxFuture<'_, Result<Option<u64>, BackendError>> {
        let size = self
            .map
            .read()
            .unwrap()
            .get(key)
            .map(|data| data.len() as u64);

        async move { Ok(size) }.boxed()
    }

    fn open(
        &self,
        key: &str,
        offset: u64,
        length: u64,
    ) -> BoxFuture<'_, Result<Option<ByteStream>, BackendError>> {
        let window = self.map.read().unwrap().get(key).map(|data| {
            let start = (offset as usize).min(data.len());
            let end = (start + length as usize).min(data.len());

            Bytes::copy_from_slice(&data[start..end])
        });

        async move {
            Ok(window.map(|data| stream::once(async move { Ok(data) }).boxed()))
        }
        .boxed()
    }
}

async fn mock_save(
    store: &MockStore,
    extension: String,
    body: ByteStream,
) -> Result<StoredBlob, BackendError> {
    let chunks: Vec<Bytes> = body.try_collect().await?;

    if store.fail_saves.load(Ordering::SeqCst) {
        return Err(BackendError::StorageWriteError {
            source: io::Error::new(io::ErrorKind::Other, "mock disk full"),
        });
    }

    let n = store.counter.fetch_add(1, Ordering::SeqCst);
    let key = storage_key(n as u128, "mock", &extension);
    let data = chunks.concat();
    let size_bytes = data.len() as u64;

    store.map.write().unwrap().insert(key.clone(), data);

    Ok(StoredBlob {
        path: store.path_for(&key),
        key,
        size_bytes,
    })
}
