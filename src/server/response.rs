use http::StatusCode;
use may_minihttp::Response as RawResponse;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::warn;

/// minihttp keeps header lines as `&'static str`, so every line written is
/// leaked. Lines are interned: a repeated line such as a content type costs
/// one allocation for the life of the process, while each distinct line
/// (per-request `Location` or `ETag` values) costs one more.
static HEADER_LINES: Lazy<Mutex<HashSet<&'static str>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Interned line count past which a warning is logged once.
const HEADER_LINES_WARN_AT: usize = 10_000;

fn intern(line: String) -> &'static str {
    let Ok(mut lines) = HEADER_LINES.lock() else {
        return Box::leak(line.into_boxed_str());
    };
    if let Some(existing) = lines.get(line.as_str()) {
        return existing;
    }
    let leaked: &'static str = Box::leak(line.into_boxed_str());
    lines.insert(leaked);
    if lines.len() == HEADER_LINES_WARN_AT {
        warn!(
            lines = lines.len(),
            "many distinct response header lines interned; per-request header values are never freed"
        );
    }
    leaked
}

pub(crate) fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

/// `Name: value` lines for every header with a textual value.
pub(crate) fn header_lines(headers: &http::HeaderMap) -> Vec<String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some(format!("{}: {}", name.as_str(), value))
        })
        .collect()
}

/// Copy status, headers and body of a router response onto the wire response.
pub fn write_response(res: &mut RawResponse, response: http::Response<Vec<u8>>) {
    let (parts, body) = response.into_parts();
    res.status_code(parts.status.as_u16() as usize, reason(parts.status));
    for line in header_lines(&parts.headers) {
        res.header(intern(line));
    }
    res.body_vec(body);
}
