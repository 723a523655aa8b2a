use std::borrow::Cow;

/// Estimate bytes sent for an HTTP request.
///
/// Best-effort HTTP/1.1 framing: request line + headers + CRLF + body. Callers are expected to
/// have made Host/Content-Length explicit already.
pub fn estimate_request_bytes(
    method: &http::Method,
    uri: &http::Uri,
    headers: &http::HeaderMap,
    body_len: u64,
) -> u64 {
    let mut bytes = request_line_bytes(method, uri);
    for (name, value) in headers {
        bytes = bytes.saturating_add(header_bytes(name.as_str().as_bytes(), value.as_bytes()));
    }

    // End of headers.
    bytes.saturating_add(2).saturating_add(body_len)
}

pub(super) fn estimate_response_head_bytes(
    version: http::Version,
    status: http::StatusCode,
    headers: &http::HeaderMap,
) -> u64 {
    let mut bytes = status_line_bytes(version, status);
    for (name, value) in headers {
        bytes = bytes.saturating_add(header_bytes(name.as_str().as_bytes(), value.as_bytes()));
    }
    bytes.saturating_add(2)
}

fn request_line_bytes(method: &http::Method, uri: &http::Uri) -> u64 {
    let path = uri.path_and_query().map_or("/", |p| p.as_str());

    // "METHOD SP path SP HTTP/1.1 CRLF"
    (method.as_str().len() as u64)
        .saturating_add(1)
        .saturating_add(path.len() as u64)
        .saturating_add(1)
        .saturating_add("HTTP/1.1".len() as u64)
        .saturating_add(2)
}

fn status_line_bytes(version: http::Version, status: http::StatusCode) -> u64 {
    let version_str: Cow<'static, str> = match version {
        http::Version::HTTP_10 => Cow::Borrowed("HTTP/1.0"),
        http::Version::HTTP_2 => Cow::Borrowed("HTTP/2"),
        http::Version::HTTP_3 => Cow::Borrowed("HTTP/3"),
        _ => Cow::Borrowed("HTTP/1.1"),
    };

    // "HTTP/1.1 SP 200 CRLF" (reason-phrase ignored)
    (version_str.len() as u64)
        .saturating_add(1)
        .saturating_add(status.as_str().len() as u64)
        .saturating_add(2)
}

fn header_bytes(name: &[u8], value: &[u8]) -> u64 {
    // "name: value\r\n"
    (name.len() as u64)
        .saturating_add(2)
        .saturating_add(value.len() as u64)
        .saturating_add(2)
}
