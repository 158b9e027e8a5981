use std::convert::Infallible;
use std::sync::Arc;

use log::{debug, error, Logger};
use warp::http::header;
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_header, with_status, Reply};
use warp::Filter;

use crate::environment::Environment;
use crate::errors::BackendError;

pub mod admin;
mod handlers;
mod rejection;
mod response;

pub use internal::*;

const API_PATH: &str = "api";
const RECORDINGS_PATH: &str = "recordings";

/// Builds every route under `/api`, with error formatting and CORS.
pub fn make_routes(
    environment: Environment,
) -> impl Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone {
    let logger = environment.logger.clone();

    admin::make_health_route(environment.clone())
        .or(make_list_route(environment.clone()))
        .or(make_upload_route(environment.clone()))
        .or(make_retrieve_route(environment.clone()))
        .or(make_delete_route(environment))
        .recover(move |r| format_rejection(logger.clone(), r))
        .with(
            warp::cors()
                .allow_any_origin()
                .allow_methods(vec!["GET", "POST", "DELETE"])
                .allow_headers(vec!["content-type", "range"])
                .expose_headers(vec!["accept-ranges", "content-length", "content-range"]),
        )
}

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<Box<dyn Reply>, Infallible> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let reply = with_status(json(&r.flatten()), status_code_for(e));

        return Ok(match e {
            BackendError::RangeNotSatisfiable { total_length } => Box::new(with_header(
                reply,
                header::CONTENT_RANGE,
                format!("bytes */{}", total_length),
            )),
            _ => Box::new(reply),
        });
    }

    let (status, message) = if rej.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if rej.find::<reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "File too large")
    } else if is_malformed_body(&rej) {
        (StatusCode::BAD_REQUEST, "Malformed form submission")
    } else if rej.find::<reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        (StatusCode::BAD_REQUEST, "Bad request")
    };

    debug!(logger, "Request rejected"; "rejection" => ?rej, "status" => %status);

    Ok(Box::new(with_status(
        json(&rejection::FlattenedRejection::new(message)),
        status,
    )))
}

/// Rejections from `or` chains are combined, so a body problem in one
/// route must win over a method mismatch in another.
fn is_malformed_body(rej: &reject::Rejection) -> bool {
    rej.find::<reject::InvalidHeader>().is_some()
        || rej.find::<reject::MissingHeader>().is_some()
        || rej.find::<reject::LengthRequired>().is_some()
        || rej.find::<reject::UnsupportedMediaType>().is_some()
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        NoFileProvided | InvalidId(..) | MalformedFormSubmission => StatusCode::BAD_REQUEST,
        NotFound(..) | FileMissing { .. } => StatusCode::NOT_FOUND,
        RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use warp::filters::multipart::form;
    use warp::filters::BoxedFilter;
    use warp::header::optional;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{delete, get as g, path as p, path::param as par, post};

    use super::{handlers, API_PATH, RECORDINGS_PATH};
    use crate::environment::Environment;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let $route_variable = warp::any()
                .map(move || environment.clone())
                .and(p(API_PATH))
                .and(p(RECORDINGS_PATH));

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_list_route => list, rt; end(), g());
    route!(make_retrieve_route => retrieve, rt; par::<String>(), end(), g(), optional::<String>("range"));
    route!(make_delete_route => delete, rt; par::<String>(), end(), delete());

    /// The size limit comes from configuration, so this one is built by
    /// hand.
    pub fn make_upload_route(environment: Environment) -> Route {
        let max_length = environment.config.max_upload_bytes;

        warp::any()
            .map(move || environment.clone())
            .and(p(API_PATH))
            .and(p(RECORDINGS_PATH))
            .and(end())
            .and(post())
            .and(form().max_length(max_length))
            .and_then(handlers::upload)
            .boxed()
    }
}
