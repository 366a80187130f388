//! Upstream target resolution.
//!
//! # Responsibilities
//! - Turn the path below the mount point into an absolute upstream URL
//! - Repair a scheme separator collapsed by path normalisation (`https:/host`)
//! - Expand `{method}` / `{METHOD}` templates with the selected method
//! - Percent-decode the inbound query string and append it
//!
//! # Design Decisions
//! - Only exactly one collapsed slash is repaired; `https:///host` and schemes
//!   other than http/https are rejected rather than guessed at
//! - Templates are expanded before the query string is appended, so only the
//!   path can carry them

use std::borrow::Cow;

use axum::http::Method;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::http::response::ProxyError;

const SCHEMES: [&str; 2] = ["https", "http"];

/// Brace spellings a template token may arrive in. Paths are matched raw, so
/// the percent-encoded forms are the common case.
const TEMPLATE_BRACES: [(&str, &str); 5] = [
    ("%7B", "%7D"),
    ("%7b", "%7d"),
    ("%7B", "%7d"),
    ("%7b", "%7D"),
    ("{", "}"),
];

/// Resolve the upstream URL from the path remaining after the mount point and
/// the raw inbound query string.
pub fn resolve_target(
    remainder: &str,
    query: Option<&str>,
    method: &Method,
) -> Result<Url, ProxyError> {
    let path = remainder.strip_prefix('/').unwrap_or(remainder);
    let mut target = expand_method_template(&repair_scheme_separator(path), method);

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(&percent_decode_str(query).decode_utf8_lossy());
    }

    validate(target)
}

/// Restore `scheme://` when a path normaliser collapsed it to `scheme:/`.
///
/// Already well-formed targets are returned untouched, so the repair is
/// idempotent.
pub fn repair_scheme_separator(path: &str) -> Cow<'_, str> {
    for scheme in SCHEMES {
        let split = scheme.len();
        // Compared as bytes: the path may carry multi-byte characters.
        let bytes = path.as_bytes();
        if bytes.len() < split + 2
            || !bytes[..split].eq_ignore_ascii_case(scheme.as_bytes())
            || &bytes[split..split + 2] != b":/"
        {
            continue;
        }

        let rest = &path[split + 2..];
        if rest.starts_with('/') {
            return Cow::Borrowed(path);
        }
        return Cow::Owned(format!("{}://{}", &path[..split], rest));
    }
    Cow::Borrowed(path)
}

fn expand_method_template(target: &str, method: &Method) -> String {
    if !target.contains("method") && !target.contains("METHOD") {
        return target.to_string();
    }

    let lower = method.as_str().to_ascii_lowercase();
    let upper = method.as_str().to_ascii_uppercase();
    let mut expanded = target.to_string();
    for (open, close) in TEMPLATE_BRACES {
        expanded = expanded
            .replace(&format!("{open}method{close}"), &lower)
            .replace(&format!("{open}METHOD{close}"), &upper);
    }
    expanded
}

fn validate(target: String) -> Result<Url, ProxyError> {
    let invalid = |reason: &str| ProxyError::InvalidTarget {
        target: target.clone(),
        reason: reason.to_string(),
    };

    let Some((scheme, rest)) = target.split_once("://") else {
        return Err(invalid("expected an absolute http:// or https:// URL"));
    };
    if !SCHEMES.iter().any(|s| scheme.eq_ignore_ascii_case(s)) {
        return Err(invalid("only http and https upstreams are supported"));
    }
    if rest.is_empty() || rest.starts_with('/') {
        return Err(invalid("missing upstream host"));
    }

    let url = Url::parse(&target).map_err(|e| invalid(&e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing upstream host"));
    }
    Ok(url)
}
