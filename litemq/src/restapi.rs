use crate::{Context, Result};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{error, info};
use std::convert::Infallible;
use tokio::net::TcpListener;

/// Start the admin HTTP API on a separate task.
pub async fn start_http(context: Context, url: &str) -> Result<()> {
    let listener = TcpListener::bind(url).await?;

    info!("Start HTTP admin API on {}", url);

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("HTTP accept error {:?}", e);
                    continue;
                }
            };

            let io = TokioIo::new(stream);
            let ctx = context.clone();

            tokio::spawn(async move {
                let svc = service_fn(move |req: Request<Incoming>| route(req, ctx.clone()));

                if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                    error!("HTTP error {:?}", e);
                }
            });
        }
    });

    Ok(())
}

pub(crate) async fn route<B>(req: Request<B>, context: Context) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/health") => Response::new(Full::new(Bytes::from_static(b"OK"))),
        (&Method::GET, "/queues") => match serde_json::to_string(&context.registry.snapshot()) {
            Ok(body) => {
                let mut res = Response::new(Full::new(Bytes::from(body)));

                res.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                res
            }
            Err(e) => {
                error!("Cannot serialize queues {:?}", e);

                with_status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
        _ => with_status(StatusCode::NOT_FOUND),
    };

    Ok(response)
}

fn with_status(status: StatusCode) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::new()));
    *res.status_mut() = status;

    res
}
