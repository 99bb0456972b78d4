//! Composition payload and landing page selection.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

/// Errors from a landing page resolution.
///
/// Cloneable so a single in-flight result can be shared between waiters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Transport failure talking to the CMS.
    #[error("CMS request failed: {0}")]
    Network(String),

    /// The CMS answered with a non-success status.
    #[error("CMS returned status {0}")]
    Status(u16),

    /// The body could not be understood.
    #[error("Malformed composition: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
pub struct Composition {
    #[serde(default, deserialize_with = "null_as_default")]
    pub pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub id: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: PageMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    #[serde(default)]
    pub navigation_item: Option<Value>,
    #[serde(default, deserialize_with = "lenient_index")]
    pub index: Option<f64>,
}

/// `null` reads the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Numbers and numeric strings order pages; anything else leaves the page
/// unindexed.
fn lenient_index<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|i| i.is_finite()),
        _ => None,
    })
}

impl PageMetadata {
    fn is_navigation_item(&self) -> bool {
        matches!(self.navigation_item, Some(Value::Bool(true)))
    }
}

impl Composition {
    /// First navigation page by ascending `index`; pages without an index sort
    /// last, ties keep document order.
    pub fn landing_page_id(&self) -> Result<Option<String>, ResolveError> {
        let mut nav: Vec<&Page> = self
            .pages
            .iter()
            .filter(|p| p.metadata.is_navigation_item())
            .collect();

        nav.sort_by(|a, b| match (a.metadata.index, b.metadata.index) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        match nav.first() {
            Some(page) => page_id(&page.id).map(Some),
            None => Ok(None),
        }
    }
}

fn page_id(id: &Value) -> Result<String, ResolveError> {
    match id {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(ResolveError::Malformed(format!("unusable page id {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landing(json: &str) -> Result<Option<String>, ResolveError> {
        serde_json::from_str::<Composition>(json).unwrap().landing_page_id()
    }

    #[test]
    fn test_picks_lowest_index_navigation_page() {
        let json = r#"{"pages": [
            {"id": "about", "metadata": {"navigationItem": true, "index": 2}},
            {"id": "draft", "metadata": {"navigationItem": false, "index": 0}},
            {"id": "home", "metadata": {"navigationItem": true, "index": 1}},
            {"id": "misc", "metadata": {"navigationItem": true}}
        ]}"#;
        assert_eq!(landing(json).unwrap().as_deref(), Some("home"));
    }

    #[test]
    fn test_ties_keep_document_order() {
        let json = r#"{"pages": [
            {"id": "first", "metadata": {"navigationItem": true, "index": 0}},
            {"id": "second", "metadata": {"navigationItem": true, "index": 0}}
        ]}"#;
        assert_eq!(landing(json).unwrap().as_deref(), Some("first"));
    }

    #[test]
    fn test_numeric_ids() {
        let json = r#"{"pages": [{"id": 42, "metadata": {"navigationItem": true, "index": 0}}]}"#;
        assert_eq!(landing(json).unwrap().as_deref(), Some("42"));
    }

    #[test]
    fn test_no_navigation_pages() {
        assert_eq!(landing(r#"{"pages": []}"#).unwrap(), None);
        assert_eq!(landing(r#"{}"#).unwrap(), None);
        // Only a literal `true` counts.
        let json = r#"{"pages": [{"id": "x", "metadata": {"navigationItem": "true"}}]}"#;
        assert_eq!(landing(json).unwrap(), None);
    }

    #[test]
    fn test_null_pages_and_metadata() {
        assert_eq!(landing(r#"{"pages": null}"#).unwrap(), None);
        let json = r#"{"pages": [{"id": "x", "metadata": null}]}"#;
        assert_eq!(landing(json).unwrap(), None);
    }

    #[test]
    fn test_string_and_odd_indexes() {
        let json = r#"{"pages": [
            {"id": "unordered", "metadata": {"navigationItem": true, "index": {"n": 0}}},
            {"id": "ten", "metadata": {"navigationItem": true, "index": "10"}},
            {"id": "two", "metadata": {"navigationItem": true, "index": "2"}},
            {"id": "word", "metadata": {"navigationItem": true, "index": "first"}}
        ]}"#;
        assert_eq!(landing(json).unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn test_missing_id_is_malformed() {
        let json = r#"{"pages": [{"metadata": {"navigationItem": true}}]}"#;
        assert!(matches!(landing(json), Err(ResolveError::Malformed(_))));
    }
}
