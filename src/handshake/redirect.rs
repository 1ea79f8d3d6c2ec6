//! Resolution and sanitization of the post-login redirect target.

use std::fmt::Write as _;
use tracing::warn;
use url::Url;

/// Query parameter of the capture page that carries the real target.
pub const NEXT_PARAM: &str = "next";

// Placeholder origin used to resolve relative targets; never sent anywhere.
const LOCAL_ORIGIN: &str = "http://gate.invalid/";

/// Resolve the local URL a login attempt returns to once it completes.
///
/// `requested_url` is either the capture page URL (the target sits in its `next`
/// query parameter and the capture page fragment is appended to it) or a local path.
/// Anything that is not a path under `base_path` falls back to `<base_path>/`.
#[must_use]
pub fn resolve_redirect_target(requested_url: &str, base_path: &str) -> String {
    match candidate_target(requested_url).and_then(|target| sanitize(&target, base_path)) {
        Some(target) => target,
        None => {
            warn!("Rejected non-local redirect target, falling back to application root");
            default_target(base_path)
        }
    }
}

#[must_use]
pub fn default_target(base_path: &str) -> String {
    format!("{base_path}/")
}

fn candidate_target(requested_url: &str) -> Option<String> {
    let requested_url = requested_url.trim();
    if requested_url.starts_with('/') && !requested_url.starts_with("//") {
        return Some(requested_url.to_string());
    }

    let parsed = Url::parse(requested_url).ok()?;
    let next = parsed
        .query_pairs()
        .find(|(key, _)| key == NEXT_PARAM)
        .map(|(_, value)| value.into_owned());

    let mut target = match next {
        Some(next) => next,
        None => {
            let mut target = parsed.path().to_string();
            if let Some(query) = parsed.query() {
                target.push('?');
                target.push_str(query);
            }
            target
        }
    };

    if let Some(fragment) = parsed.fragment() {
        if !target.contains('#') {
            target.push('#');
            target.push_str(fragment);
        }
    }

    Some(target)
}

/// Return `target` when it is a same-application path, `None` otherwise.
///
/// Non-ASCII characters come back percent-encoded so the result is always a
/// valid `Location` header value; everything else is kept verbatim.
#[must_use]
pub fn sanitize(target: &str, base_path: &str) -> Option<String> {
    if !target.starts_with('/') || target.starts_with("//") {
        return None;
    }
    if target.contains('\\') || target.chars().any(|c| c.is_control()) {
        return None;
    }

    let origin = Url::parse(LOCAL_ORIGIN).ok()?;
    let resolved = origin.join(target).ok()?;
    if resolved.origin() != origin.origin() {
        return None;
    }

    let path = resolved.path();
    let under_base = base_path.is_empty()
        || path == base_path
        || path
            .strip_prefix(base_path)
            .is_some_and(|rest| rest.starts_with('/'));
    under_base.then(|| encode_non_ascii(target))
}

fn encode_non_ascii(target: &str) -> String {
    let mut encoded = String::with_capacity(target.len());
    for c in target.chars() {
        if c.is_ascii() {
            encoded.push(c);
            continue;
        }
        let mut buf = [0; 4];
        for byte in c.encode_utf8(&mut buf).bytes() {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}
