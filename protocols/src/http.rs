//! # HTTP Plumbing
//!
//! Just enough HTTP/1.1 to talk to a plug: request builders that
//! always close the connection, and a tolerant response parser. Plug
//! firmwares are sloppy about header casing and line endings, so the
//! parser is forgiving where the RFC allows it cheaply.

use anyhow::{Context, Result};

const USER_AGENT: &str = "plugscout";

/// A parsed HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    /// First header value with the given name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A GET request with the connection closed after the response.
pub fn get_request(host: &str, path: &str) -> String {
    format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         User-Agent: {USER_AGENT}\r\n\
         Connection: close\r\n\
         \r\n"
    )
}

/// A POST request carrying `body`, with extra headers (SOAP needs its
/// action header) spliced in before the blank line.
pub fn post_request(
    host: &str,
    path: &str,
    extra_headers: &[(&str, &str)],
    content_type: &str,
    body: &str,
) -> String {
    let mut request = format!(
        "POST {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         User-Agent: {USER_AGENT}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n",
        body.len()
    );
    for (name, value) in extra_headers {
        request.push_str(name);
        request.push_str(": ");
        request.push_str(value);
        request.push_str("\r\n");
    }
    request.push_str("\r\n");
    request.push_str(body);
    request
}

/// Parse a raw response. Works on the full byte stream of a closed
/// connection, so the body is whatever followed the header block,
/// trimmed to Content-Length when the header is present and shorter.
pub fn parse_response(raw: &[u8]) -> Result<Response> {
    let text = String::from_utf8_lossy(raw);
    let (head, body) = match text.split_once("\r\n\r\n") {
        Some(parts) => parts,
        None => text
            .split_once("\n\n")
            .context("response has no header/body separator")?,
    };

    let mut lines = head.lines();
    let status_line = lines.next().context("response is empty")?;
    let status = parse_status_line(status_line)?;

    let mut headers = Vec::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let mut body = body.to_string();
    let declared = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok());
    if let Some(length) = declared {
        // Only ever shrink, and never mid-character.
        if length < body.len() && body.is_char_boundary(length) {
            body.truncate(length);
        }
    }

    Ok(Response {
        status,
        headers,
        body,
    })
}

fn parse_status_line(line: &str) -> Result<u16> {
    if !line.starts_with("HTTP/") {
        anyhow::bail!("not an HTTP status line: {line:?}");
    }
    line.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .with_context(|| format!("no status code in {line:?}"))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
