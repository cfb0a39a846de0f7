//! Admin-configurable registry of clause groups.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered key → label map of the valid clause groups. Each key partitions
/// the clause set into an independent forest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupRegistry {
    groups: BTreeMap<String, String>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The one place the fallback group table lives.
    pub fn default_groups() -> Self {
        let mut groups = Self::new();
        groups.insert("character", "Character");
        groups.insert("council", "Council");
        groups.insert("coordinator", "Coordinator");
        groups
    }

    /// Builds a registry from raw key/label pairs as submitted by the
    /// settings form: keys are lowercased and stripped to `[a-z0-9_-]`,
    /// and pairs with an empty key or label are dropped.
    pub fn sanitize(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut groups = Self::new();
        for (key, label) in pairs {
            let key = sanitize_key(&key);
            let label = label.trim();
            if !key.is_empty() && !label.is_empty() {
                groups.insert(key, label);
            }
        }
        groups
    }

    pub fn insert(&mut self, key: impl Into<String>, label: impl Into<String>) {
        self.groups.insert(key.into(), label.into());
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.groups.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn sanitize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_three_groups() {
        let groups = GroupRegistry::default_groups();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups.label("character"), Some("Character"));
        assert_eq!(groups.label("council"), Some("Council"));
        assert_eq!(groups.label("coordinator"), Some("Coordinator"));
        assert_eq!(groups.label("board"), None);
    }

    #[test]
    fn sanitize_drops_incomplete_pairs_and_cleans_keys() {
        let groups = GroupRegistry::sanitize(vec![
            ("  Board Members! ".to_string(), " Board ".to_string()),
            ("".to_string(), "Orphan label".to_string()),
            ("orphan_key".to_string(), "   ".to_string()),
            ("ad-hoc".to_string(), "Ad Hoc".to_string()),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.label("boardmembers"), Some("Board"));
        assert_eq!(groups.label("ad-hoc"), Some("Ad Hoc"));
    }

    #[test]
    fn registry_round_trips_through_json() {
        let groups = GroupRegistry::default_groups();
        let json = serde_json::to_string(&groups).unwrap();
        let back: GroupRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, groups);
        // transparent map form
        assert!(json.contains("\"council\":\"Council\""));
    }

    #[test]
    fn iter_yields_keys_in_order() {
        let groups = GroupRegistry::default_groups();
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["character", "council", "coordinator"]);
    }
}
