use std::time::{Duration, Instant};

use log::{debug, o, trace};
use warp::{
    filters::multipart::FormData,
    http::{HeaderValue, Response, StatusCode},
    hyper::Body,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::environment::Environment;
use crate::errors::BackendError;
use crate::io::parse_upload;
use crate::recording::Id;
use crate::routes::{
    rejection::{Context, Rejection},
    response::SuccessResponse,
};
use crate::service;

const SERVER_TIMING_HEADER: &str = "server-timing";
const UPLOAD_MESSAGE: &str = "Upload successful";
const DELETE_MESSAGE: &str = "Deleted";

type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($body:tt)+) => {{
        let start = Instant::now();

        // TODO when `try` blocks are stabilized, we can wrap the body
        // and return the headers even on errors
        let result = { $($body)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    }};
}

pub async fn list(environment: Environment) -> RouteResult {
    timed! {
        let recordings = service::list(&environment)
            .await
            .map_err(|e: BackendError| Rejection::new(Context::list(), e))?;

        json(&recordings)
    }
}

pub async fn upload(environment: Environment, content: FormData) -> RouteResult {
    timed! {
        let logger = environment.logger.clone();

        debug!(logger, "Parsing submission...");
        let file = parse_upload(content)
            .await
            .map_err(|e| Rejection::new(Context::upload(None), e))?;

        let name = file.as_ref().and_then(|f| f.name.clone());
        let error_handler = |e: BackendError| Rejection::new(Context::upload(name.clone()), e);

        let recording = service::ingest(&environment, file)
            .await
            .map_err(error_handler)?;

        debug!(logger, "Stored recording"; "id" => recording.id);

        with_status(
            json(&SuccessResponse::Upload {
                message: UPLOAD_MESSAGE,
                recording,
            }),
            StatusCode::CREATED,
        )
    }
}

pub async fn retrieve(environment: Environment, id: String, range: Option<String>) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::retrieve(id.clone()), e);

        let id = parse_id(&id).map_err(error_handler)?;
        let logger = environment.logger.new(o!("id" => id));

        trace!(logger, "Resolving playback..."; "range" => ?range);
        let playback = service::retrieve(&environment, id, range.as_deref())
            .await
            .map_err(error_handler)?;
        let body = service::open(&environment, &playback)
            .await
            .map_err(error_handler)?;

        debug!(logger, "Streaming recording"; "status" => %playback.status(), "window" => ?playback.window());

        let mut response = Response::new(Body::wrap_stream(body));
        *response.status_mut() = playback.status();

        let headers = response.headers_mut();
        for (name, value) in playback.headers() {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(name, value);
            }
        }

        response
    }
}

pub async fn delete(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::delete(id.clone()), e);

        let id = parse_id(&id).map_err(error_handler)?;

        service::delete(&environment, id)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Deleted {
            message: DELETE_MESSAGE,
        })
    }
}

fn parse_id(id: &str) -> Result<Id, BackendError> {
    id.parse::<Id>()
        .map_err(|_| BackendError::InvalidId(id.to_owned()))
}

fn format_server_timing(duration: Duration) -> String {
    format!("handler;dur={}", duration.as_millis())
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::{format_server_timing, parse_id};
    use crate::errors::BackendError;

    #[test]
    fn ids_must_be_decimal_integers() {
        assert_eq!(parse_id("42").expect("parse id"), 42);

        for bad in &["abc", "", "1.5", "0x10"] {
            assert!(matches!(parse_id(bad), Err(BackendError::InvalidId(s)) if s == *bad));
        }
    }

    #[test]
    fn server_timing_is_in_milliseconds() {
        assert_eq!(
            format_server_timing(Duration::from_micros(12_500)),
            "handler;dur=12"
        );
    }
}
