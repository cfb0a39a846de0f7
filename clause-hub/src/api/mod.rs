//! HTTP API layer exposing clause CRUD, hierarchy tools, and the rendered
//! bylaw page.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use clause_hub_core::cache::RenderCache;
use clause_hub_core::config::GroupRegistry;
use clause_hub_core::events::{ClauseEvent, EventBus};
use clause_hub_core::hierarchy;
use clause_hub_core::render::{self, ContentFilter};
use clause_hub_core::rename::{self, RenameError, RenameOutcome, RenamePreview};
use clause_hub_core::storage::{
    Clause, ClauseQuery, ClauseStore, NewClause, QueryOrder, VoteInfo,
};

const DEFAULT_PER_PAGE: usize = 20;
const MAX_PER_PAGE: usize = 100;

/// Shared application state: the clause store behind a lock, the render
/// cache, and the event bus.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<ClauseStore>>,
    pub cache: Arc<RenderCache>,
    pub events: EventBus,
    pub filter: Arc<dyn ContentFilter>,
}

#[derive(Serialize, Deserialize)]
struct ClauseRequest {
    title: String,
    #[serde(default)]
    content: String,
    group: String,
    #[serde(default)]
    parent: Option<Uuid>,
    #[serde(default)]
    section_id: String,
    #[serde(default)]
    sequence: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    vote: VoteInfo,
}

#[derive(Serialize, Deserialize)]
struct ClauseResponse {
    id: Uuid,
    title: String,
    slug: String,
    content: String,
    parent: Option<Uuid>,
    group: String,
    section_id: String,
    sequence: String,
    tags: String,
    vote: VoteInfo,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&Clause> for ClauseResponse {
    fn from(clause: &Clause) -> Self {
        Self {
            id: clause.id,
            title: clause.title.clone(),
            slug: clause.slug.clone(),
            content: clause.content.clone(),
            parent: clause.parent,
            group: clause.group.clone(),
            section_id: clause.section_id.clone(),
            sequence: clause.sequence.clone(),
            tags: clause.tags.clone(),
            vote: clause.vote.clone(),
            created_at: clause.created_at,
            updated_at: clause.updated_at,
        }
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Serialize, Deserialize, Default)]
struct ClauseUpdate {
    content: Option<String>,
    section_id: Option<String>,
    sequence: Option<String>,
    tags: Option<String>,
    group: Option<String>,
    vote: Option<VoteInfo>,
}

#[derive(Serialize, Deserialize)]
struct RetitleRequest {
    title: String,
}

#[derive(Serialize, Deserialize)]
struct MoveRequest {
    #[serde(default)]
    parent: Option<Uuid>,
}

/// Sortable columns of the browse table.
#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SortColumn {
    Title,
    Group,
    Parent,
    Modified,
}

#[derive(Deserialize)]
struct BrowseParams {
    group: Option<String>,
    prefix: Option<String>,
    sort: Option<SortColumn>,
    page: Option<usize>,
    per_page: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct ClauseSummary {
    id: Uuid,
    title: String,
    group: String,
    section_id: String,
    sequence: String,
    tags: String,
    parent: Option<Uuid>,
    parent_title: String,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct BrowsePage {
    items: Vec<ClauseSummary>,
    page: usize,
    per_page: usize,
    total_items: usize,
    total_pages: usize,
}

#[derive(Deserialize)]
struct ParentOptionsParams {
    group: Option<String>,
    exclude: Option<Uuid>,
}

#[derive(Serialize, Deserialize)]
struct ParentOption {
    id: Uuid,
    title: String,
    snippet: String,
}

#[derive(Serialize, Deserialize)]
struct RenameBatchRequest {
    old_prefix: String,
    new_prefix: String,
    group: String,
}

#[derive(Serialize, Deserialize)]
struct RenameErrorBody {
    error: String,
    message: String,
}

#[derive(Serialize, Deserialize)]
struct RepairResponse {
    updated: usize,
}

#[derive(Deserialize)]
struct BylawsParams {
    group: Option<String>,
}

pub fn router(
    store: Arc<RwLock<ClauseStore>>,
    cache: Arc<RenderCache>,
    events: EventBus,
    filter: Arc<dyn ContentFilter>,
) -> Router {
    let app_state = AppState {
        store,
        cache,
        events,
        filter,
    };
    Router::new()
        .route("/clauses", post(create_clause).get(browse_clauses))
        .route(
            "/clauses/{id}",
            get(get_clause).put(update_clause).delete(delete_clause),
        )
        .route("/clauses/{id}/rename", put(rename_clause))
        .route("/clauses/{id}/move", put(move_clause))
        .route("/parent-options", get(parent_options))
        .route("/groups", get(get_groups).put(put_groups))
        .route("/rename/preview", post(rename_preview))
        .route("/rename/execute", post(rename_execute))
        .route("/repair-parents", post(repair_parents))
        .route("/bylaws", get(render_bylaws))
        .with_state(app_state)
}

async fn create_clause(
    State(state): State<AppState>,
    Json(req): Json<ClauseRequest>,
) -> Result<Json<ClauseResponse>, StatusCode> {
    let mut store = state.store.write().await;
    let id = store
        .create(NewClause {
            title: req.title,
            content: req.content,
            group: req.group,
            parent: req.parent,
            section_id: req.section_id,
            sequence: req.sequence,
            tags: req.tags,
            vote: req.vote,
        })
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let response = store
        .get(id)
        .map(ClauseResponse::from)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
    drop(store);
    state.events.send(ClauseEvent::Created { id });
    Ok(Json(response))
}

async fn get_clause(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClauseResponse>, StatusCode> {
    let store = state.store.read().await;
    store
        .get(id)
        .map(ClauseResponse::from)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_clause(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ClauseUpdate>,
) -> StatusCode {
    let mut store = state.store.write().await;
    if store.get(id).is_none() {
        return StatusCode::NOT_FOUND;
    }
    let result = apply_update(&mut store, id, req);
    drop(store);
    match result {
        Ok(()) => {
            state.events.send(ClauseEvent::Updated { id });
            StatusCode::NO_CONTENT
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn apply_update(store: &mut ClauseStore, id: Uuid, req: ClauseUpdate) -> anyhow::Result<()> {
    if let Some(content) = req.content {
        store.update_content(id, &content)?;
    }
    if let Some(section_id) = req.section_id {
        store.set_section_id(id, section_id)?;
    }
    if let Some(sequence) = req.sequence {
        store.set_sequence(id, sequence)?;
    }
    if let Some(tags) = req.tags {
        store.set_tags(id, tags)?;
    }
    if let Some(group) = req.group {
        store.set_group(id, group)?;
    }
    if let Some(vote) = req.vote {
        store.set_vote(id, vote)?;
    }
    Ok(())
}

async fn rename_clause(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RetitleRequest>,
) -> StatusCode {
    let mut store = state.store.write().await;
    if store.get(id).is_none() {
        return StatusCode::NOT_FOUND;
    }
    match store.rename(id, req.title.clone()) {
        Ok(()) => {
            drop(store);
            state.events.send(ClauseEvent::Renamed {
                id,
                title: req.title,
            });
            StatusCode::NO_CONTENT
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn move_clause(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MoveRequest>,
) -> StatusCode {
    let mut store = state.store.write().await;
    if store.get(id).is_none() {
        return StatusCode::NOT_FOUND;
    }
    match store.set_parent(id, req.parent) {
        Ok(()) => {
            // a self- or nil-parent was cleared at write; report what landed
            let new_parent = store.get(id).and_then(|c| c.parent);
            drop(store);
            state.events.send(ClauseEvent::Moved { id, new_parent });
            StatusCode::NO_CONTENT
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn delete_clause(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    let mut store = state.store.write().await;
    match store.delete(id) {
        Ok(()) => {
            drop(store);
            state.events.send(ClauseEvent::Deleted { id });
            StatusCode::NO_CONTENT
        }
        Err(_) => StatusCode::NOT_FOUND,
    }
}

async fn browse_clauses(
    State(state): State<AppState>,
    Query(params): Query<BrowseParams>,
) -> Json<BrowsePage> {
    let store = state.store.read().await;
    let mut rows = store.list(&ClauseQuery {
        group: params.group.clone(),
        title_prefix: params.prefix.clone(),
        order: QueryOrder::Title,
        ..ClauseQuery::default()
    });
    match params.sort.unwrap_or(SortColumn::Title) {
        SortColumn::Title => {}
        SortColumn::Group => {
            rows.sort_by(|a, b| a.group.cmp(&b.group).then_with(|| a.title.cmp(&b.title)))
        }
        SortColumn::Parent => rows.sort_by_cached_key(|c| {
            (
                c.parent
                    .and_then(|p| store.get(p))
                    .map(|p| p.title.clone())
                    .unwrap_or_default(),
                c.title.clone(),
            )
        }),
        SortColumn::Modified => rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
    }

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);
    let total_items = rows.len();
    let total_pages = total_items.div_ceil(per_page);
    let items = rows
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .map(|c| ClauseSummary {
            id: c.id,
            title: c.title.clone(),
            group: c.group.clone(),
            section_id: c.section_id.clone(),
            sequence: c.sequence.clone(),
            tags: c.tags.clone(),
            parent: c.parent,
            parent_title: c
                .parent
                .and_then(|p| store.get(p))
                .map(|p| p.title.clone())
                .unwrap_or_default(),
            updated_at: c.updated_at,
        })
        .collect();
    Json(BrowsePage {
        items,
        page,
        per_page,
        total_items,
        total_pages,
    })
}

async fn parent_options(
    State(state): State<AppState>,
    Query(params): Query<ParentOptionsParams>,
) -> Json<Vec<ParentOption>> {
    let store = state.store.read().await;
    let options = store
        .list(&ClauseQuery {
            group: params.group.clone(),
            order: QueryOrder::Title,
            ..ClauseQuery::default()
        })
        .into_iter()
        .filter(|c| Some(c.id) != params.exclude)
        .map(|c| ParentOption {
            id: c.id,
            title: c.title.clone(),
            snippet: render::strip_tags(&c.content).chars().take(30).collect(),
        })
        .collect();
    Json(options)
}

async fn get_groups(State(state): State<AppState>) -> Json<GroupRegistry> {
    let store = state.store.read().await;
    Json(store.groups().clone())
}

async fn put_groups(
    State(state): State<AppState>,
    Json(body): Json<BTreeMap<String, String>>,
) -> Result<Json<GroupRegistry>, StatusCode> {
    let mut store = state.store.write().await;
    store
        .set_groups(GroupRegistry::sanitize(body))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(store.groups().clone()))
}

fn rename_error(err: RenameError) -> (StatusCode, Json<RenameErrorBody>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(RenameErrorBody {
            error: err.code().to_string(),
            message: err.to_string(),
        }),
    )
}

async fn rename_preview(
    State(state): State<AppState>,
    Json(req): Json<RenameBatchRequest>,
) -> Result<Json<Vec<RenamePreview>>, (StatusCode, Json<RenameErrorBody>)> {
    let store = state.store.read().await;
    rename::preview(&store, &req.old_prefix, &req.new_prefix, &req.group)
        .map(Json)
        .map_err(rename_error)
}

async fn rename_execute(
    State(state): State<AppState>,
    Json(req): Json<RenameBatchRequest>,
) -> Result<Json<RenameOutcome>, (StatusCode, Json<RenameErrorBody>)> {
    let mut store = state.store.write().await;
    let outcome = rename::execute(&mut store, &req.old_prefix, &req.new_prefix, &req.group)
        .map_err(rename_error)?;
    drop(store);
    state.events.send(ClauseEvent::BulkRenamed {
        succeeded: outcome.succeeded.len(),
        failed: outcome.failed.len(),
    });
    Ok(Json(outcome))
}

async fn repair_parents(State(state): State<AppState>) -> Result<Json<RepairResponse>, StatusCode> {
    let mut store = state.store.write().await;
    let updated = hierarchy::repair_parents(&mut store)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    drop(store);
    state.events.send(ClauseEvent::ParentsRepaired { updated });
    Ok(Json(RepairResponse { updated }))
}

async fn render_bylaws(
    State(state): State<AppState>,
    Query(params): Query<BylawsParams>,
) -> Html<String> {
    let store = state.store.read().await;
    let key = RenderCache::key(params.group.as_deref(), store.cache_version());
    if let Some(html) = state.cache.get(key) {
        return Html(html);
    }
    let html = render::render_page(&store, params.group.as_deref(), state.filter.as_ref());
    state.cache.insert(key, html.clone());
    Html(html)
}
