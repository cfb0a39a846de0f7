//! Bulk prefix rename across a clause subtree.
//!
//! Titles encode hierarchy, so renumbering a branch means rewriting every
//! title under a prefix plus the derived section ids, consistently. The
//! engine is two-phase: [`preview`] validates and reports every planned
//! change without touching the store, [`execute`] re-validates and applies
//! them, collecting per-item failures instead of aborting the batch.


use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::{Clause, ClauseQuery, ClauseStore, QueryOrder};

/// Validation failures surfaced before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenameError {
    #[error("All fields are required.")]
    InvalidInput,
    #[error("Old and new prefixes are the same.")]
    SamePrefix,
    #[error("A clause with title \"{0}\" already exists in this group.")]
    TitleExists(String),
    #[error("No clauses found with prefix \"{0}\".")]
    NoClauses(String),
    #[error("Conflict: \"{from}\" would become \"{to}\" which already exists.")]
    Conflict { from: String, to: String },
}

impl RenameError {
    /// Stable machine-readable code paired with the display message.
    pub fn code(&self) -> &'static str {
        match self {
            RenameError::InvalidInput => "invalid_input",
            RenameError::SamePrefix => "same_prefix",
            RenameError::TitleExists(_) => "title_exists",
            RenameError::NoClauses(_) => "no_clauses",
            RenameError::Conflict { .. } => "conflict",
        }
    }
}

/// One planned change, as shown to the editor before confirming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenamePreview {
    pub id: Uuid,
    pub old_title: String,
    pub new_title: String,
    pub old_section_id: String,
    pub new_section_id: String,
    pub old_parent_id: Option<Uuid>,
    pub old_parent_title: String,
    pub new_parent_title: String,
    pub parent_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameSuccess {
    pub id: Uuid,
    pub old_title: String,
    pub new_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameFailure {
    pub id: Uuid,
    pub title: String,
    pub error: String,
}

/// Outcome of [`execute`]: applied items and per-item storage failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenameOutcome {
    pub succeeded: Vec<RenameSuccess>,
    pub failed: Vec<RenameFailure>,
}

/// Replace the leading prefix segment of a title. Exact matches become the
/// new prefix; `prefix_`-led titles keep their suffix; anything else is
/// returned unchanged.
pub fn rewrite_title(old_title: &str, old_prefix: &str, new_prefix: &str) -> String {
    if old_title == old_prefix {
        return new_prefix.to_string();
    }
    if let Some(suffix) = old_title.strip_prefix(old_prefix) {
        if suffix.starts_with('_') {
            return format!("{new_prefix}{suffix}");
        }
    }
    old_title.to_string()
}

/// Track the derived section id through a title change: when it equals the
/// old title's last `_`-token it follows the new title's last token,
/// otherwise a hand-set section id is preserved.
pub fn rewrite_section_id(old_section: &str, old_title: &str, new_title: &str) -> String {
    let old_last = old_title.rsplit('_').next().unwrap_or(old_title);
    let new_last = new_title.rsplit('_').next().unwrap_or(new_title);
    if old_section == old_last {
        new_last.to_string()
    } else {
        old_section.to_string()
    }
}

fn clauses_by_prefix<'a>(store: &'a ClauseStore, prefix: &str, group: &str) -> Vec<&'a Clause> {
    let branch = format!("{prefix}_");
    store
        .list(&ClauseQuery {
            group: Some(group.to_string()),
            order: QueryOrder::Title,
            ..ClauseQuery::default()
        })
        .into_iter()
        .filter(|c| c.title == prefix || c.title.starts_with(&branch))
        .collect()
}

/// Validate a prefix rename and report every planned change.
///
/// Checks run in order: all parameters present, prefixes differ, the new
/// prefix is not already a title in the group, at least one clause matches,
/// and no computed title collides with an existing one. The first failure
/// returns immediately; nothing is written.
pub fn preview(
    store: &ClauseStore,
    old_prefix: &str,
    new_prefix: &str,
    group: &str,
) -> Result<Vec<RenamePreview>, RenameError> {
    if old_prefix.is_empty() || new_prefix.is_empty() || group.is_empty() {
        return Err(RenameError::InvalidInput);
    }
    if old_prefix == new_prefix {
        return Err(RenameError::SamePrefix);
    }
    if store.title_exists(new_prefix, group, None) {
        return Err(RenameError::TitleExists(new_prefix.to_string()));
    }

    let matched = clauses_by_prefix(store, old_prefix, group);
    if matched.is_empty() {
        return Err(RenameError::NoClauses(old_prefix.to_string()));
    }

    // first pass: compute every new title and check for collisions with
    // titles outside the rename set
    let mut new_titles: HashMap<Uuid, String> = HashMap::new();
    for clause in &matched {
        let new_title = rewrite_title(&clause.title, old_prefix, new_prefix);
        if clause.title != new_prefix && store.title_exists(&new_title, group, Some(clause.id)) {
            return Err(RenameError::Conflict {
                from: clause.title.clone(),
                to: new_title,
            });
        }
        new_titles.insert(clause.id, new_title);
    }

    // second pass: full rows with parent display titles
    let mut rows = Vec::with_capacity(matched.len());
    for clause in &matched {
        let new_title = new_titles.get(&clause.id).cloned().unwrap_or_default();
        let old_parent_title = clause
            .parent
            .and_then(|p| store.get(p))
            .map(|p| p.title.clone())
            .unwrap_or_default();
        let new_parent_title = clause
            .parent
            .and_then(|p| new_titles.get(&p).cloned())
            .unwrap_or_else(|| old_parent_title.clone());
        rows.push(RenamePreview {
            id: clause.id,
            old_title: clause.title.clone(),
            new_section_id: rewrite_section_id(&clause.section_id, &clause.title, &new_title),
            new_title,
            old_section_id: clause.section_id.clone(),
            old_parent_id: clause.parent,
            parent_changed: old_parent_title != new_parent_title,
            old_parent_title,
            new_parent_title,
        });
    }
    Ok(rows)
}

/// Apply a prefix rename, re-validating first.
///
/// Each item gets its title, slug, and section id written; a storage failure
/// on one item lands in the `failed` bucket and the batch continues. There is
/// no rollback of items already applied.
pub fn execute(
    store: &mut ClauseStore,
    old_prefix: &str,
    new_prefix: &str,
    group: &str,
) -> Result<RenameOutcome, RenameError> {
    let rows = preview(store, old_prefix, new_prefix, group)?;

    let mut outcome = RenameOutcome::default();
    for row in rows {
        if let Err(err) = store.rename(row.id, row.new_title.clone()) {
            outcome.failed.push(RenameFailure {
                id: row.id,
                title: row.old_title,
                error: err.to_string(),
            });
            continue;
        }
        if let Err(err) = store.set_section_id(row.id, row.new_section_id.clone()) {
            outcome.failed.push(RenameFailure {
                id: row.id,
                title: row.old_title,
                error: err.to_string(),
            });
            continue;
        }
        outcome.succeeded.push(RenameSuccess {
            id: row.id,
            old_title: row.old_title,
            new_title: row.new_title,
        });
    }

    tracing::info!(
        old_prefix,
        new_prefix,
        group,
        succeeded = outcome.succeeded.len(),
        failed = outcome.failed.len(),
        "bulk rename applied"
    );
    Ok(outcome)
}
