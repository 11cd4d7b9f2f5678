//! Remote key layout.
//!
//! Every backend stores a resource under `{storage_prefix}{escape_id(id)}.enc`.
//! Ids may contain path separators (session ids are `project/session`), so
//! the id is flattened into a single key segment. The escaping is reversible:
//!
//! | char | escaped |
//! |------|---------|
//! | `%`  | `%25`   |
//! | `/`  | `%2F`   |
//! | `\`  | `%5C`   |

use crate::error::{CoreError, Result};
use crate::types::ResourceType;

/// Suffix appended to every remote key.
pub const REMOTE_SUFFIX: &str = ".enc";

/// Flatten an id into a single key segment.
pub fn escape_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for ch in id.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '\\' => out.push_str("%5C"),
            c => out.push(c),
        }
    }
    out
}

/// Exact inverse of [`escape_id`].
pub fn unescape_id(escaped: &str) -> Result<String> {
    let mut out = String::with_capacity(escaped.len());
    let mut rest = escaped;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let seq = rest.get(pos..pos + 3).unwrap_or("");
        match seq {
            "%25" => out.push('%'),
            "%2F" => out.push('/'),
            "%5C" => out.push('\\'),
            _ => return Err(CoreError::MalformedEscape(escaped.to_string())),
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Ok(out)
}

/// The remote key for `(resource_type, id)`.
pub fn remote_key(resource_type: ResourceType, id: &str) -> String {
    format!(
        "{}{}{}",
        resource_type.config().storage_prefix,
        escape_id(id),
        REMOTE_SUFFIX
    )
}

/// Recover the id from a remote key.
///
/// Returns `Ok(None)` for keys under the prefix that are not resource
/// objects (no `.enc` suffix, or nested deeper than one segment).
pub fn id_from_remote_key(resource_type: ResourceType, key: &str) -> Result<Option<String>> {
    let prefix = resource_type.config().storage_prefix;
    let Some(leaf) = key.strip_prefix(prefix) else {
        return Err(CoreError::ForeignKey {
            key: key.to_string(),
            prefix: prefix.to_string(),
        });
    };
    let Some(escaped) = leaf.strip_suffix(REMOTE_SUFFIX) else {
        return Ok(None);
    };
    if escaped.is_empty() || escaped.contains('/') {
        return Ok(None);
    }
    unescape_id(escaped).map(Some)
}
