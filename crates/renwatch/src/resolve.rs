//! Image-name prefix derivation for fuzzy lookup.
//!
//! Job names coming out of the render farm carry scene and camera
//! suffixes that the tracking database does not store. When an exact name
//! lookup fails, the engine falls back to a prefix match: the leading
//! project number, a period, and the first two underscore-joined
//! segments, compared against whitespace-stripped stored names.

use std::sync::LazyLock;

use regex::Regex;

static RE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\.\s*[A-Za-z0-9]+_[A-Za-z0-9]+)").unwrap());

/// Derive the lookup prefix from a manifest's logical name. Whitespace
/// inside the matched prefix is stripped. Names that do not fit the
/// pattern fall back to themselves unchanged.
pub fn name_prefix(name: &str) -> String {
    match RE_PREFIX.captures(name) {
        Some(caps) => caps[1].replace(' ', ""),
        None => name.to_string(),
    }
}
