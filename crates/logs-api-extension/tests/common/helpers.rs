// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use logs_api_extension::lambda::{LogBatch, LogRecord};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

pub fn function_record(record: &str) -> LogRecord {
    LogRecord {
        record_type: "function".to_string(),
        time: Some("2020-08-20T12:31:32.123Z".to_string()),
        record: json!(record),
    }
}

pub fn batch_of(records: &[&str]) -> LogBatch {
    records.iter().map(|r| function_record(r)).collect()
}

/// Logs API push body for the given records
pub fn push_body(records: &[&str]) -> Vec<u8> {
    let records: Vec<_> = records
        .iter()
        .map(|r| json!({"time": "2020-08-20T12:31:32.123Z", "type": "function", "record": r}))
        .collect();
    serde_json::to_vec(&records).expect("Failed to serialize push body")
}

/// Send an HTTP request over TCP and return the response
pub async fn send_tcp_request(
    addr: SocketAddr,
    method: &str,
    body: Option<Vec<u8>>,
) -> Result<Response<hyper::body::Incoming>, Box<dyn std::error::Error + Send + Sync>> {
    let stream = timeout(Duration::from_secs(2), tokio::net::TcpStream::connect(addr)).await??;

    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    tokio::spawn(async move {
        let _ = conn.await;
    });

    let body = body.unwrap_or_default();
    let request = Request::builder()
        .uri("/")
        .method(method)
        .header("Host", addr.to_string())
        .header("Content-Type", "application/json")
        .header("Content-Length", body.len().to_string())
        .body(Full::new(Bytes::from(body)))?;

    Ok(timeout(Duration::from_secs(2), sender.send_request(request)).await??)
}

/// Reads a response body as a string
pub async fn body_string(response: Response<hyper::body::Incoming>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Response body is not UTF-8")
}

/// Sends `body` as a single-chunk `Transfer-Encoding: chunked` POST and returns the status code
pub async fn send_chunked_push(
    addr: SocketAddr,
    body: &[u8],
) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
    let mut stream =
        timeout(Duration::from_secs(2), tokio::net::TcpStream::connect(addr)).await??;

    let mut request = format!(
        "POST / HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n{:x}\r\n",
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(body);
    request.extend_from_slice(b"\r\n0\r\n\r\n");
    stream.write_all(&request).await?;

    let mut response = Vec::new();
    timeout(Duration::from_secs(2), stream.read_to_end(&mut response)).await??;
    let status_line = String::from_utf8_lossy(&response);
    let status = status_line
        .split_whitespace()
        .nth(1)
        .ok_or("empty response")?
        .parse::<u16>()?;
    Ok(status)
}
