// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use bytes::Bytes;
use core::time::Duration;
use http_body_util::Full;
use hyper::{
    header,
    http::{self, HeaderMap},
    Response, StatusCode,
};
use serde_json::json;
use tracing::{debug, error, warn};

pub type HttpResponse = Response<Full<Bytes>>;

/// Logs `message` (debug for success statuses, warn for 4xx, error otherwise) and returns it
/// as a JSON response with the given status.
///
/// Response body format:
/// {
///     "message": message
/// }
pub fn log_and_create_http_response(
    message: &str,
    status: StatusCode,
) -> http::Result<HttpResponse> {
    if status.is_success() {
        debug!("{message}");
    } else if status.is_client_error() {
        warn!("{message}");
    } else {
        error!("{message}");
    }
    let body = json!({ "message": message }).to_string();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
}

/// Checks the request's Content-Length against `max_content_length`. A chunked request
/// (Transfer-Encoding present, no Content-Length) passes.
///
/// Returns `None` when the request may proceed, otherwise the error response to send.
pub fn verify_request_content_length(
    header_map: &HeaderMap,
    max_content_length: usize,
    error_message_prefix: &str,
) -> Option<http::Result<HttpResponse>> {
    let Some(content_length_header) = header_map.get(header::CONTENT_LENGTH) else {
        if header_map.contains_key(header::TRANSFER_ENCODING) {
            return None;
        }
        return Some(log_and_create_http_response(
            &format!("{error_message_prefix}: Missing Content-Length and Transfer-Encoding header"),
            StatusCode::LENGTH_REQUIRED,
        ));
    };

    let content_length = content_length_header
        .to_str()
        .ok()
        .and_then(|val| val.trim().parse::<usize>().ok());
    match content_length {
        None => Some(log_and_create_http_response(
            &format!("{error_message_prefix}: Invalid Content-Length header"),
            StatusCode::BAD_REQUEST,
        )),
        Some(len) if len > max_content_length => Some(log_and_create_http_response(
            &format!("{error_message_prefix}: Payload too large"),
            StatusCode::PAYLOAD_TOO_LARGE,
        )),
        Some(_) => None,
    }
}

/// Builds the client used against the Lambda runtime API. `timeout` is left unset for
/// long-poll calls, which must wait as long as the platform holds them.
pub fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client, reqwest::Error> {
    // The runtime API lives inside the sandbox; never route it through a proxy.
    let mut builder = reqwest::Client::builder().no_proxy().http1_only();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}
