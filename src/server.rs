use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use http::header::{
    HeaderValue, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION,
};
use http::{Method, StatusCode};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use percent_encoding::percent_decode_str;

use crate::client::CloudSyncClient;
use crate::dashboard::Dashboard;
use crate::error::{Error, Result};

const DOWNLOAD_PREFIX: &str = "/download/";

/// Binds the dashboard server and returns its address with the future that runs it.
pub fn bind(
    addr: SocketAddr,
    client: CloudSyncClient,
) -> Result<(SocketAddr, impl Future<Output = hyper::Result<()>> + Send)> {
    let client = Arc::new(client);
    let make_service = make_service_fn(move |_| {
        let client = client.clone();
        async move {
            let func = move |req| {
                let client = client.clone();
                async move { Ok::<_, Infallible>(route(&client, req).await) }
            };
            Ok::<_, Infallible>(service_fn(func))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_service);
    Ok((server.local_addr(), server))
}

pub async fn serve(addr: SocketAddr, client: CloudSyncClient) -> Result<()> {
    let (addr, server) = bind(addr, client)?;
    tracing::info!("Serving dashboard on http://{}", addr);
    server.await?;
    Ok(())
}

async fn route(client: &CloudSyncClient, req: Request<Body>) -> Response<Body> {
    let path = req.uri().path().to_string();
    tracing::info!("{} {}", req.method(), path);
    if req.method() != Method::GET {
        return text(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
    }

    match path.as_str() {
        "/" => match Dashboard::load(client).await {
            Ok(dashboard) => respond(
                StatusCode::OK,
                "text/html; charset=utf-8",
                dashboard.render_page("/download"),
            ),
            Err(e) => failure(e),
        },
        "/charts.json" => match Dashboard::load(client).await {
            Ok(dashboard) => respond(
                StatusCode::OK,
                "application/json",
                dashboard.chart_configs().to_string(),
            ),
            Err(e) => failure(e),
        },
        p if p.starts_with(DOWNLOAD_PREFIX) && p.len() > DOWNLOAD_PREFIX.len() => {
            let id = match percent_decode_str(&p[DOWNLOAD_PREFIX.len()..]).decode_utf8() {
                Ok(id) => id.into_owned(),
                Err(_) => return text(StatusCode::BAD_REQUEST, "file id is not valid UTF-8"),
            };
            match client.download_response(&id).await {
                Ok(upstream) => {
                    let mut res = Response::new(Body::empty());
                    for name in &[CONTENT_TYPE, CONTENT_DISPOSITION, CONTENT_LENGTH] {
                        if let Some(value) = upstream.headers().get(name) {
                            res.headers_mut().insert(name.clone(), value.clone());
                        }
                    }
                    *res.body_mut() = Body::wrap_stream(upstream.bytes_stream());
                    res
                }
                Err(e) => failure(e),
            }
        }
        _ => text(StatusCode::NOT_FOUND, "not found"),
    }
}

fn respond(status: StatusCode, content_type: &'static str, body: String) -> Response<Body> {
    let mut res = Response::new(Body::from(body));
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    res
}

fn text(status: StatusCode, body: &str) -> Response<Body> {
    respond(status, "text/plain; charset=utf-8", body.to_string())
}

/// Unauthorized sends the browser to the sync server's login page, anything else is a 502.
fn failure(e: Error) -> Response<Body> {
    if let Error::Unauthorized { login_url } = &e {
        if let Ok(location) = HeaderValue::from_str(login_url) {
            let mut res = text(StatusCode::FOUND, "login required");
            res.headers_mut().insert(LOCATION, location);
            return res;
        }
    }
    tracing::error!("dashboard request failed: {}", e);
    let body = serde_json::json!({ "error": e.to_string() }).to_string();
    respond(StatusCode::BAD_GATEWAY, "application/json", body)
}
