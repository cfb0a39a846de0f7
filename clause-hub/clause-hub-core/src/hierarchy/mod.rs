//! Parent-link inference from hierarchical clause titles.
//!
//! Titles conventionally encode their position (`10`, `10_c`, `10_c_i`), so a
//! missing or wrong parent pointer can be reconstructed by dropping the last
//! title token and looking the remainder up. [`repair_parents`] applies that
//! rule across the whole store in one batch.


use anyhow::Result;
use std::collections::HashMap;
use uuid::Uuid;

use crate::storage::ClauseStore;

/// Canonical lookup form of a title: lowercase, with `.` separators folded
/// into `_` so `10.C` and `10_c` resolve to the same node.
pub fn normalize_title(title: &str) -> String {
    title.replace('.', "_").to_lowercase()
}

/// Re-derive parent links from titles across every group.
///
/// Builds a normalized-title index over all clauses, then for each clause
/// whose title has more than one token looks up the title with the last token
/// dropped. A hit that differs from the stored parent is written back through
/// the store. Clauses whose derived parent does not exist are left untouched,
/// and a second run changes nothing.
pub fn repair_parents(store: &mut ClauseStore) -> Result<usize> {
    let mut by_title: HashMap<String, Uuid> = HashMap::new();
    for clause in store.iter() {
        by_title.insert(normalize_title(&clause.title), clause.id);
    }

    let mut pending: Vec<(Uuid, Uuid)> = Vec::new();
    for clause in store.iter() {
        let normalized = normalize_title(&clause.title);
        let parts: Vec<&str> = normalized.split('_').collect();
        if parts.len() < 2 {
            continue;
        }
        let parent_title = parts[..parts.len() - 1].join("_");
        if let Some(&parent_id) = by_title.get(&parent_title) {
            if parent_id != clause.id && clause.parent != Some(parent_id) {
                pending.push((clause.id, parent_id));
            }
        }
    }

    let updated = pending.len();
    for (id, parent) in pending {
        store.set_parent(id, Some(parent))?;
    }
    tracing::info!(updated, "repaired clause parent links");
    Ok(updated)
}
