use warp::reject;
use warp::reply::{json, Reply};
use warp::Filter;

use super::response::SuccessResponse;
use super::API_PATH;
use crate::environment::Environment;

pub fn make_health_route(
    _environment: Environment,
) -> impl warp::Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone {
    warp::path(API_PATH)
        .and(warp::path("health"))
        .and(warp::path::end())
        .and(warp::get())
        .map(|| json(&SuccessResponse::Health { ok: true }))
}
