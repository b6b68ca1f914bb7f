//! Filter-facet signatures.
//!
//! Non-default query facets partition a category's pagination space into
//! independent tracks, each with its own synced pages and high-water mark.
//! The signature is the stable identity of one track: a SHA-256 digest of
//! the facets in canonical form.

use sha2::{Digest, Sha256};

/// Compute the signature for a set of non-default query facets.
///
/// Returns `None` when no facets are present (the unfiltered track).
/// Facets are canonicalized into a JSON object keyed by facet name before
/// hashing, so the signature does not depend on argument order.
pub fn facet_signature(facets: &[(&str, String)]) -> Option<String> {
    if facets.is_empty() {
        return None;
    }

    let mut canonical = serde_json::Map::new();
    for (name, value) in facets {
        canonical.insert((*name).to_string(), serde_json::Value::String(value.clone()));
    }

    let mut hasher = Sha256::new();
    hasher.update(serde_json::Value::Object(canonical).to_string().as_bytes());
    Some(hex::encode(hasher.finalize()))
}
