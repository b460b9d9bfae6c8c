use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use hyper::StatusCode;

use crate::error::{DaemonError, Result};

type RespBody = BoxBody<Bytes, hyper::Error>;

/// Liveness response: 200 for as long as the main loop task is still polling.
///
/// There is no readiness distinction to make here — a daemon with zero
/// usable pipes fails at startup (`DaemonError::NoPipes`) rather than running
/// in a degraded state, so "alive" and "ready" always coincide.
pub fn health_check_response() -> Result<Response<RespBody>> {
    let body = Full::new(Bytes::from_static(b"ok\n")).map_err(|never| match never {}).boxed();

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain")
        .body(body)
        .map_err(|e| DaemonError::Fatal(format!("failed to build health response: {e}")))
}
