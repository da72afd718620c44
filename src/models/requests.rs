//! Request DTOs for the admin API
//!
//! Defines the query parameters accepted by the admin endpoints.

use serde::Deserialize;

/// Query string for the entry inspection endpoint (GET /entries?key=...)
#[derive(Debug, Clone, Deserialize)]
pub struct EntryQuery {
    /// Resource key to inspect, e.g. `/service-1/segment-3`
    #[serde(default)]
    pub key: String,
}

impl EntryQuery {
    /// Validates the query
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > u16::MAX as usize {
            return Some("Key does not fit a frame".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_query_deserialize() {
        let json = r#"{"key": "/svc/seg-1"}"#;
        let query: EntryQuery = serde_json::from_str(json).unwrap();
        assert_eq!(query.key, "/svc/seg-1");
        assert!(query.validate().is_none());
    }

    #[test]
    fn test_entry_query_missing_key_defaults_empty() {
        let query: EntryQuery = serde_json::from_str("{}").unwrap();
        assert!(query.key.is_empty());
        assert!(query.validate().is_some());
    }

    #[test]
    fn test_entry_query_rejects_oversized_key() {
        let query = EntryQuery {
            key: "k".repeat(u16::MAX as usize + 1),
        };
        assert!(query.validate().is_some());
    }
}
