//! Resolution of redirect targets against the URL that produced them.

use url::Url;

use super::error::ServerErrorKind;

/// Resolve a `Location` header value against `current_url`.
///
/// Absolute targets must use http or https. Paths starting with `/` keep the
/// current scheme, host and port; other relative paths are resolved against
/// the directory of the current path. Both are then run through
/// [`normalize_path`].
pub fn resolve_location(current_url: &str, location: &str) -> Result<String, ServerErrorKind> {
    let location = location.trim();
    if location.is_empty() {
        return Err(ServerErrorKind::EmptyLocation);
    }

    if let Some(scheme) = scheme_of(location) {
        let scheme = scheme.to_ascii_lowercase();
        return match scheme.as_str() {
            "http" | "https" => Ok(location.to_string()),
            _ => Err(ServerErrorKind::DisallowedScheme(scheme)),
        };
    }

    let base = Url::parse(current_url)
        .map_err(|_| ServerErrorKind::InvalidUrl(current_url.to_string()))?;
    let host = base
        .host_str()
        .ok_or_else(|| ServerErrorKind::InvalidUrl(current_url.to_string()))?;
    let origin = match written_port(current_url, &base) {
        Some(port) => format!("{}://{}:{}", base.scheme(), host, port),
        None => format!("{}://{}", base.scheme(), host),
    };

    let (path, suffix) = split_suffix(location);
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}{}", base_directory(base.path()), path)
    };

    Ok(format!("{}{}{}", origin, normalize_path(&joined), suffix))
}

/// Collapse `.` and `..` segments and empty segments of a path.
///
/// A `..` with nothing left to pop is kept literally instead of being
/// rejected, and an empty result becomes `/`.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if path.starts_with('/') {
        format!("/{}", joined)
    } else if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

// Url::port() hides a default port written explicitly, so read it back from the text
fn written_port(current_url: &str, base: &Url) -> Option<u16> {
    base.port().or_else(|| {
        let (_, rest) = current_url.trim().split_once("://")?;
        let authority = &rest[..rest.find(['/', '?', '#']).unwrap_or(rest.len())];
        let (_, port) = authority.rsplit_once(':')?;
        if port.contains(']') {
            return None;
        }
        port.parse().ok()
    })
}

// Scheme per RFC 3986: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) followed by ':'
fn scheme_of(location: &str) -> Option<&str> {
    let (candidate, _) = location.split_once(':')?;
    let mut chars = candidate.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(candidate)
}

fn split_suffix(location: &str) -> (&str, &str) {
    match location.find(['?', '#']) {
        Some(idx) => location.split_at(idx),
        None => (location, ""),
    }
}

fn base_directory(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "/",
    }
}
