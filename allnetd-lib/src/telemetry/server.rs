use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::Registry;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::telemetry::{handle_metrics, health_check_response};

/// Loopback HTTP server exposing `/metrics` and `/healthz`.
///
/// Started only when `metrics.listen` is configured (SPEC_FULL.md ambient
/// stack). Runs on its own task; it never touches pipe I/O or the dispatch
/// path, only the `Metrics` registry the daemon updates as it runs.
pub async fn start_metrics_server(
    addr: SocketAddr,
    registry: Registry,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = Arc::new(registry);
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "metrics server listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "metrics server: accept error");
                continue;
            }
        };

        let registry = registry.clone();
        tokio::spawn(async move {
            let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                let registry = registry.clone();
                async move {
                    let resp = match req.uri().path() {
                        "/metrics" => handle_metrics(&registry),
                        "/healthz" => health_check_response(),
                        _ => {
                            let body = Full::new(Bytes::from("not found"))
                                .map_err(|never| match never {})
                                .boxed();
                            let mut resp = hyper::Response::new(body);
                            *resp.status_mut() = hyper::StatusCode::NOT_FOUND;
                            Ok(resp)
                        }
                    };
                    match resp {
                        Ok(resp) => Ok::<_, hyper::Error>(resp),
                        Err(_) => {
                            let body = Full::new(Bytes::from("internal error"))
                                .map_err(|never| match never {})
                                .boxed();
                            let mut resp = hyper::Response::new(body);
                            *resp.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
                            Ok(resp)
                        }
                    }
                }
            });

            let builder = ConnBuilder::new(TokioExecutor::new());
            if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                warn!(?peer, error = %e, "metrics server: serve_connection error");
            }
        });
    }
}
