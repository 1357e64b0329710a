//! Throwaway HTTP server standing in for the sync API in tests.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};

pub struct Seen {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub fn json_response(status: u16, value: serde_json::Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(value.to_string()))
        .unwrap()
}

/// Serves `handler` on an ephemeral local port and returns its base URL.
pub async fn spawn_api<F>(handler: F) -> String
where
    F: Fn(Seen) -> Response<Body> + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    let make_service = make_service_fn(move |_| {
        let handler = handler.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let handler = handler.clone();
                async move {
                    let (parts, body) = req.into_parts();
                    let body = hyper::body::to_bytes(body).await?;
                    let seen = Seen {
                        method: parts.method,
                        path: parts.uri.path().to_string(),
                        headers: parts.headers,
                        body,
                    };
                    Ok::<_, hyper::Error>(handler(seen))
                }
            }))
        }
    });

    let server = Server::bind(&([127, 0, 0, 1], 0).into()).serve(make_service);
    let addr = server.local_addr();
    tokio::spawn(server);
    format!("http://{}", addr)
}
