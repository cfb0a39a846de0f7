//! Filesystem-backed storage for bylaw clauses.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::GroupRegistry;
use crate::render::slugify;

const SETTINGS_FILE: &str = "settings.json";

/// Optional vote annotation attached to a clause. Inert data; rendered as a
/// tooltip when any field is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl VoteInfo {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.reference.is_none() && self.url.is_none()
    }

    /// Collapse blank fields, so a form posting empty strings stores the same
    /// record as one omitting them.
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        }
        Self {
            date: clean(self.date),
            reference: clean(self.reference),
            url: clean(self.url),
        }
    }
}

/// One node of the bylaw tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clause {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub parent: Option<Uuid>,
    pub group: String,
    #[serde(default)]
    pub section_id: String,
    #[serde(default)]
    pub sequence: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub vote: VoteInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Clause {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Fields supplied when creating a clause. Everything except title and group
/// may be left at its default.
#[derive(Debug, Clone, Default)]
pub struct NewClause {
    pub title: String,
    pub content: String,
    pub group: String,
    pub parent: Option<Uuid>,
    pub section_id: String,
    pub sequence: String,
    pub tags: String,
    pub vote: VoteInfo,
}

/// Which parent linkage a listing should match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentSelector {
    #[default]
    Any,
    /// Parent absent, empty, or zero.
    Root,
    ChildrenOf(Uuid),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryOrder {
    #[default]
    Title,
    ModifiedDesc,
}

/// Filter for [`ClauseStore::list`]; the record-listing boundary the rest of
/// the crate reads through.
#[derive(Debug, Clone, Default)]
pub struct ClauseQuery {
    pub parent: ParentSelector,
    pub group: Option<String>,
    pub title_prefix: Option<String>,
    pub order: QueryOrder,
    pub limit: Option<usize>,
}

impl ClauseQuery {
    pub fn roots_of_group(group: Option<&str>) -> Self {
        Self {
            parent: ParentSelector::Root,
            group: group.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn children_of(parent: Uuid) -> Self {
        Self {
            parent: ParentSelector::ChildrenOf(parent),
            ..Self::default()
        }
    }
}

/// Persisted alongside the records: the admin-configurable group set and the
/// counter every render-cache key incorporates.
#[derive(Debug, Serialize, Deserialize)]
struct StoreSettings {
    groups: GroupRegistry,
    cache_version: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            groups: GroupRegistry::default_groups(),
            cache_version: 0,
        }
    }
}

/// Simple filesystem-backed store for `Clause` records. Each clause lives in
/// its own `{id}.json` file; group settings and the cache version share a
/// sidecar file.
pub struct ClauseStore {
    clauses: HashMap<Uuid, Clause>,
    dir: PathBuf,
    settings: StoreSettings,
}

impl ClauseStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        // load existing records
        let mut clauses = HashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = Uuid::parse_str(stem) {
                    let data = std::fs::read_to_string(entry.path())?;
                    if let Ok(mut clause) = serde_json::from_str::<Clause>(&data) {
                        // nil is the legacy "no parent" encoding; a self-parent
                        // on disk is kept as-is and handled by the renderer
                        if clause.parent == Some(Uuid::nil()) {
                            clause.parent = None;
                        }
                        clauses.insert(id, clause);
                    }
                }
            }
        }

        let settings_path = dir.join(SETTINGS_FILE);
        let mut settings: StoreSettings = if settings_path.exists() {
            let data = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&data).unwrap_or_default()
        } else {
            StoreSettings::default()
        };
        if settings.groups.is_empty() {
            settings.groups = GroupRegistry::default_groups();
        }

        Ok(Self {
            clauses,
            dir,
            settings,
        })
    }

    /// Directory where records are persisted.
    pub fn data_dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Iterate over all clauses in the store, in no particular order.
    pub fn iter(&self) -> std::collections::hash_map::Values<'_, Uuid, Clause> {
        self.clauses.values()
    }

    fn path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn write_record(&self, clause: &Clause) -> Result<()> {
        let data = serde_json::to_string_pretty(clause)?;
        std::fs::write(self.path(clause.id), data)?;
        Ok(())
    }

    fn save_settings(&self) -> Result<()> {
        let path = self.dir.join(SETTINGS_FILE);
        let data = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Any record write moves the version forward, which retires every
    /// outstanding render-cache key at once.
    fn bump_version(&mut self) -> Result<()> {
        self.settings.cache_version += 1;
        self.save_settings()
    }

    pub fn cache_version(&self) -> u64 {
        self.settings.cache_version
    }

    pub fn groups(&self) -> &GroupRegistry {
        &self.settings.groups
    }

    pub fn set_groups(&mut self, groups: GroupRegistry) -> Result<()> {
        self.settings.groups = if groups.is_empty() {
            GroupRegistry::default_groups()
        } else {
            groups
        };
        self.save_settings()
    }

    /// Create a clause, deriving its slug and clearing a self- or nil-parent.
    pub fn create(&mut self, new: NewClause) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let clause = Clause {
            id,
            slug: slugify(&new.title),
            title: new.title,
            content: new.content,
            parent: normalize_parent(id, new.parent),
            group: new.group,
            section_id: new.section_id,
            sequence: new.sequence,
            tags: new.tags,
            vote: new.vote.normalized(),
            created_at: now,
            updated_at: now,
        };
        self.write_record(&clause)?;
        self.clauses.insert(id, clause);
        self.bump_version()?;
        Ok(id)
    }

    pub fn get(&self, id: Uuid) -> Option<&Clause> {
        self.clauses.get(&id)
    }

    fn with_clause(&mut self, id: Uuid, f: impl FnOnce(&mut Clause)) -> Result<()> {
        {
            let clause = self
                .clauses
                .get_mut(&id)
                .ok_or_else(|| anyhow!("clause not found: {id}"))?;
            f(clause);
            clause.updated_at = Utc::now();
        }
        if let Some(clause) = self.clauses.get(&id) {
            self.write_record(clause)?;
        }
        self.bump_version()
    }

    pub fn update_content(&mut self, id: Uuid, content: &str) -> Result<()> {
        self.with_clause(id, |c| c.content = content.to_string())
    }

    /// Retitle a clause, recomputing its slug.
    pub fn rename(&mut self, id: Uuid, title: String) -> Result<()> {
        self.with_clause(id, |c| {
            c.slug = slugify(&title);
            c.title = title;
        })
    }

    pub fn set_section_id(&mut self, id: Uuid, section_id: String) -> Result<()> {
        self.with_clause(id, |c| c.section_id = section_id)
    }

    pub fn set_sequence(&mut self, id: Uuid, sequence: String) -> Result<()> {
        self.with_clause(id, |c| c.sequence = sequence)
    }

    pub fn set_tags(&mut self, id: Uuid, tags: String) -> Result<()> {
        self.with_clause(id, |c| c.tags = tags)
    }

    pub fn set_group(&mut self, id: Uuid, group: String) -> Result<()> {
        self.with_clause(id, |c| c.group = group)
    }

    pub fn set_vote(&mut self, id: Uuid, vote: VoteInfo) -> Result<()> {
        let vote = vote.normalized();
        self.with_clause(id, |c| c.vote = vote)
    }

    /// Re-parent a clause. A parent equal to the clause itself, or the nil
    /// id, is stored as "no parent".
    pub fn set_parent(&mut self, id: Uuid, parent: Option<Uuid>) -> Result<()> {
        let parent = normalize_parent(id, parent);
        self.with_clause(id, |c| c.parent = parent)
    }

    /// Remove a clause record. Children keep their dangling parent id and
    /// surface as roots when rendered.
    pub fn delete(&mut self, id: Uuid) -> Result<()> {
        self.clauses
            .remove(&id)
            .ok_or_else(|| anyhow!("clause not found: {id}"))?;
        let _ = std::fs::remove_file(self.path(id));
        self.bump_version()?;
        Ok(())
    }

    /// List clauses matching a filter, sorted and bounded per the query.
    pub fn list(&self, query: &ClauseQuery) -> Vec<&Clause> {
        let mut out: Vec<&Clause> = self
            .clauses
            .values()
            .filter(|c| match query.parent {
                ParentSelector::Any => true,
                ParentSelector::Root => c.parent.is_none(),
                ParentSelector::ChildrenOf(parent) => c.parent == Some(parent),
            })
            .filter(|c| query.group.as_deref().is_none_or(|g| c.group == g))
            .filter(|c| {
                query
                    .title_prefix
                    .as_deref()
                    .is_none_or(|p| c.title.starts_with(p))
            })
            .collect();
        match query.order {
            QueryOrder::Title => out.sort_by(|a, b| a.title.cmp(&b.title)),
            QueryOrder::ModifiedDesc => out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        }
        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        out
    }

    /// Exact-title existence check within a group, optionally excluding one
    /// clause (the one being renamed).
    pub fn title_exists(&self, title: &str, group: &str, exclude: Option<Uuid>) -> bool {
        self.clauses
            .values()
            .any(|c| c.group == group && c.title == title && Some(c.id) != exclude)
    }

    /// Exact-title lookup, optionally scoped to one group. Titles are not
    /// unique across groups; the first match wins.
    pub fn find_by_title(&self, title: &str, group: Option<&str>) -> Option<&Clause> {
        self.clauses
            .values()
            .find(|c| c.title == title && group.is_none_or(|g| c.group == g))
    }

    /// Most recent modification time among clauses, optionally scoped to one
    /// group. Feeds the rendered "Last Updated" line.
    pub fn latest_modified(&self, group: Option<&str>) -> Option<DateTime<Utc>> {
        self.clauses
            .values()
            .filter(|c| group.is_none_or(|g| c.group == g))
            .map(|c| c.updated_at)
            .max()
    }
}

fn normalize_parent(id: Uuid, parent: Option<Uuid>) -> Option<Uuid> {
    match parent {
        Some(p) if p == id || p.is_nil() => None,
        other => other,
    }
}
