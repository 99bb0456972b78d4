//! Passthrough classification.
//!
//! A request bypasses the site cache when its path is any of:
//! - an already-resolved page (`/p/<digits>...`)
//! - a static asset (`.js`, `.css`, `.ico`, `.png`, `.jpg`, `.svg`)
//! - an API call (`/api`, `/api/...`)
//! - one of the error pages (`/404`, `/500`)
//! - a slug ending in a numeric identifier (`/item-17`)
//!
//! The query string is not part of the path.

use std::sync::LazyLock;
use regex::RegexSet;

static PASSTHROUGH: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"^/p/\d+",
        r"\.(js|css|ico|png|jpg|svg)$",
        r"^/api(/|$)",
        r"^/(404|500)$",
        r"\w+-\d+$",
    ])
    .expect("passthrough patterns are valid")
});

/// Returns true when the request should go straight to the backend.
pub fn classify(path: &str) -> bool {
    PASSTHROUGH.is_match(path)
}
