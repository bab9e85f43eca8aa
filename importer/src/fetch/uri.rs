//! URI helpers: data URIs, scheme detection and base-relative resolution.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Whether the URI is an inline `data:` URI.
pub fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

/// Whether the URI starts with a scheme such as `https:` or `file:`.
///
/// Windows drive letters (`C:\...`) are not treated as schemes.
pub fn has_scheme(uri: &str) -> bool {
    let Some(colon) = uri.find(':') else {
        return false;
    };
    let scheme = &uri[..colon];
    scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Whether the URI must be used verbatim rather than joined to a base.
pub fn is_absolute(uri: &str) -> bool {
    has_scheme(uri) || uri.starts_with('/')
}

/// Decode a `data:[<mime>][;base64],<payload>` URI.
///
/// Returns the MIME type (empty if absent) and the decoded bytes, or `None`
/// if the URI is not a data URI or its payload is malformed.
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let comma = rest.find(',')?;
    let (header, payload) = (&rest[..comma], &rest[comma + 1..]);

    let (mime, is_base64) = match header.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (header, false),
    };
    let mime = mime.split(';').next().unwrap_or_default().to_owned();

    if is_base64 {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(cleaned).ok().map(|bytes| (mime, bytes))
    } else {
        Some((mime, percent_decode(payload).into_bytes()))
    }
}

/// Decode `%XX` escapes. Invalid escapes are kept verbatim.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let Some(byte) = hex_pair(bytes[i + 1], bytes[i + 2])
        {
            out.push(byte);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let digit = |c: u8| (c as char).to_digit(16).map(|d| d as u8);
    Some((digit(hi)? << 4) | digit(lo)?)
}

/// Resolve a resource URI against the document base URL.
///
/// Absolute URIs (with a scheme or a leading `/`) are returned unchanged.
/// Relative URIs are joined to the directory part of `base_url`, collapsing
/// `.` and `..` segments that stay inside the base.
pub fn resolve(base_url: &str, uri: &str) -> String {
    if is_absolute(uri) || base_url.is_empty() {
        return uri.to_owned();
    }

    // Strip query/fragment from the base, then drop its file name.
    let base = base_url.split(['?', '#']).next().unwrap_or_default();
    let dir = match base.rfind('/') {
        Some(pos) => &base[..=pos],
        None => "",
    };

    let mut segments: Vec<&str> = dir.split('/').collect();
    // `dir` ends with '/' so the last segment is always empty
    segments.pop();
    for part in uri.split('/') {
        match part {
            "." => {}
            ".." => {
                if segments.last().is_some_and(|s| !s.is_empty() && *s != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
