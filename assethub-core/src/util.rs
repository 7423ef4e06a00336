//! Identifier and URL helpers
//!
//! Every uuid that crosses the wire is canonicalised to the lowercase
//! 8-4-4-4-12 form before it is stored or compared. The URL matchers here
//! are the sole parser used by the request dispatcher.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

static USER_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-zA-Z0-9_@]{1,64}$").expect("invalid regex"));

/// Mint a fresh version-4 uuid in canonical form.
pub fn new_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Parse any accepted uuid representation and re-emit the canonical
/// lowercase hyphenated form.
pub fn canonical_uuid(raw: &str) -> Result<String> {
    let parsed = Uuid::parse_str(raw)
        .map_err(|e| Error::Validation(format!("invalid uuid \"{}\": {}", raw, e)))?;
    Ok(parsed.as_hyphenated().to_string())
}

/// Check whether a user id contains only permitted characters.
pub fn is_valid_user_id(user_id: &str) -> bool {
    USER_ID_PATTERN.is_match(user_id)
}

/// True iff `url` equals `/<name>`, or `/<name>/` when
/// `allow_trailing_slash` is set.
pub fn match_root(url: &str, name: &str, allow_trailing_slash: bool) -> bool {
    if allow_trailing_slash && url.len() == name.len() + 2 {
        if let Some(stripped) = url.strip_prefix('/') {
            if let Some(stripped) = stripped.strip_suffix('/') {
                if stripped == name {
                    return true;
                }
            }
        }
    }

    url.strip_prefix('/') == Some(name)
}

/// True iff `url` starts with `/<prefix>`.
pub fn match_prefix(url: &str, prefix: &str) -> bool {
    url.strip_prefix('/')
        .is_some_and(|rest| rest.starts_with(prefix))
}

/// Parse `/<prefix>/<uuid>[/<suffix>][/]` and return the canonicalised
/// uuid. The uuid segment must be exactly 36 characters.
pub fn match_uuid_path(url: &str, prefix: &str, suffix: &str) -> Option<String> {
    let base_len = prefix.len() + 2;
    if url.get(..base_len)? != format!("/{}/", prefix) {
        return None;
    }

    let raw_uuid = url.get(base_len..base_len + 36)?;
    let rest = url.get(base_len + 36..)?;

    let rest_matches = if suffix.is_empty() {
        rest.is_empty() || rest == "/"
    } else {
        rest.strip_prefix('/')
            .map(|r| r == suffix || r.strip_suffix('/') == Some(suffix))
            .unwrap_or(false)
    };
    if !rest_matches {
        return None;
    }

    canonical_uuid(raw_uuid).ok()
}
