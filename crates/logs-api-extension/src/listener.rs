// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{http, Method, Request, StatusCode};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error};

use crate::error::IngestionParseError;
use crate::http_utils::{log_and_create_http_response, verify_request_content_length, HttpResponse};
use crate::lambda::LogBatch;
use crate::queue::HandoffQueue;

/// HTTP endpoint the Logs API pushes batches to.
///
/// Binding happens in [`LogsListener::bind`], so once it returns the socket already accepts
/// connections and the subscription can be issued. Each accepted batch is pushed onto the
/// [`HandoffQueue`] and acknowledged right away; processing happens later on the coordinator.
pub struct LogsListener {
    listener: TcpListener,
    queue: Arc<HandoffQueue>,
    max_content_length: usize,
}

impl LogsListener {
    pub async fn bind(
        addr: &str,
        port: u16,
        queue: Arc<HandoffQueue>,
        max_content_length: usize,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind((addr, port)).await?;
        Ok(LogsListener {
            listener,
            queue,
            max_content_length,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop on its own task for the rest of the process.
    pub fn spawn(self) -> JoinHandle<io::Result<()>> {
        tokio::spawn(self.serve())
    }

    pub async fn serve(self) -> io::Result<()> {
        let LogsListener {
            listener,
            queue,
            max_content_length,
        } = self;
        if let Ok(addr) = listener.local_addr() {
            debug!("Logs listener accepting pushes on {addr}");
        }

        let service = service_fn(move |req: Request<Incoming>| {
            let queue = Arc::clone(&queue);
            Self::handle_push(req, queue, max_content_length)
        });

        let server = hyper::server::conn::http1::Builder::new();
        let mut joinset = JoinSet::new();

        loop {
            let conn = tokio::select! {
                con_res = listener.accept() => match con_res {
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::ConnectionAborted
                                | io::ErrorKind::ConnectionReset
                                | io::ErrorKind::ConnectionRefused
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!("Logs listener error: {e}");
                        return Err(e);
                    }
                    Ok((conn, _)) => conn,
                },
                finished = async {
                    match joinset.join_next().await {
                        Some(finished) => finished,
                        None => std::future::pending().await,
                    }
                } => match finished {
                    Err(e) if e.is_panic() => {
                        error!("Logs connection handler panicked: {:?}", e);
                        continue;
                    },
                    Ok(()) | Err(_) => continue,
                },
            };
            let conn = hyper_util::rt::TokioIo::new(conn);
            let server = server.clone();
            let service = service.clone();
            joinset.spawn(async move {
                if let Err(e) = server.serve_connection(conn, service).await {
                    debug!("Logs connection error: {e}");
                }
            });
        }
    }

    async fn handle_push(
        req: Request<Incoming>,
        queue: Arc<HandoffQueue>,
        max_content_length: usize,
    ) -> http::Result<HttpResponse> {
        if req.method() != Method::POST {
            return log_and_create_http_response(
                &format!("Unsupported method {} on logs endpoint", req.method()),
                StatusCode::METHOD_NOT_ALLOWED,
            );
        }

        let (parts, body) = req.into_parts();
        if let Some(response) = verify_request_content_length(
            &parts.headers,
            max_content_length,
            "Error processing log batch",
        ) {
            return response;
        }

        // Content-Length was checked above; chunked pushes are capped while reading
        let body = match Limited::new(body, max_content_length).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                return log_and_create_http_response(
                    "Error processing log batch: Payload too large",
                    StatusCode::PAYLOAD_TOO_LARGE,
                );
            }
            Err(e) => {
                return log_and_create_http_response(
                    &format!("Error reading log batch body: {e}"),
                    StatusCode::BAD_REQUEST,
                );
            }
        };

        let batch = match parse_batch(&body) {
            Ok(batch) => batch,
            Err(e) => {
                return log_and_create_http_response(&e.to_string(), StatusCode::BAD_REQUEST);
            }
        };

        let records = batch.len();
        match queue.push(batch) {
            Ok(()) => log_and_create_http_response(
                &format!("Queued batch of {records} log records"),
                StatusCode::OK,
            ),
            Err(e) => log_and_create_http_response(
                &format!("Dropping batch of {records} log records: {e}"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        }
    }
}

fn parse_batch(body: &Bytes) -> Result<LogBatch, IngestionParseError> {
    Ok(serde_json::from_slice::<LogBatch>(body)?)
}
