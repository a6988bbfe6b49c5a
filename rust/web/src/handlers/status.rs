use crate::errors::IntoErrorResponse;
use crate::router::ConnectionEventRouter;
use serde::Serialize;
use std::sync::Arc;
use warp::reply::{Json, Response};
use warp::Reply;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

pub fn health() -> Json {
    warp::reply::json(&HealthBody { status: "ok" })
}

/// Matchmaking occupancy: whether someone is waiting and how many games run.
pub async fn lobby(router: Arc<ConnectionEventRouter>) -> Response {
    match router.snapshot() {
        Ok(snapshot) => warp::reply::json(&snapshot).into_response(),
        Err(err) => err.into_http_response(),
    }
}
