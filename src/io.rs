use bytes::Buf;
use futures::stream::StreamExt;
use warp::multipart::{FormData, Part};

use crate::errors::BackendError;
use crate::service::IncomingFile;
use crate::store::ByteStream;

/// The form field carrying the recording.
pub const FILE_FIELD: &str = "video";

/// Finds the recording in a form submission. Parts before it are
/// skipped; parts after it are never read.
pub async fn parse_upload(mut form: FormData) -> Result<Option<IncomingFile>, BackendError> {
    while let Some(part) = form.next().await {
        let part = part.map_err(|_| BackendError::MalformedFormSubmission)?;

        if part.name() == FILE_FIELD {
            let name = part.filename().map(str::to_owned);

            return Ok(Some(IncomingFile::new(name, part_as_stream(part))));
        }
    }

    Ok(None)
}

/// Streams raw data from [`Part`] without buffering it.
pub fn part_as_stream(raw: Part) -> ByteStream {
    raw.stream()
        .map(|r| {
            r.map(|mut x| x.copy_to_bytes(x.remaining()))
                .map_err(|_| BackendError::MalformedFormSubmission)
        })
        .boxed()
}
