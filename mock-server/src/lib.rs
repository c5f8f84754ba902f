//! In-memory emulation of the Crisp "people" endpoints for one or more
//! websites.
//!
//! Profiles are stored as a generated `people_id` plus the raw JSON card, so
//! PUT replaces the whole card while PATCH merges only the supplied keys.
//! Path lookups accept either the generated `people_id` or the profile's
//! email, matching the vendor's identifier contract. Responses wrap payloads
//! in the `{"data": ...}` envelope the real API uses.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Collection endpoints slice results into pages of this size, 1-based.
pub const PAGE_SIZE: usize = 30;

/// One stored profile: generated identifier plus the caller-supplied card.
#[derive(Clone, Debug)]
pub struct StoredProfile {
    pub people_id: String,
    pub card: Map<String, Value>,
}

impl StoredProfile {
    fn email(&self) -> Option<&str> {
        self.card.get("email").and_then(Value::as_str)
    }

    /// Full profile JSON: the card with `people_id` added.
    fn to_json(&self) -> Value {
        let mut out = self.card.clone();
        out.insert("people_id".to_string(), json!(self.people_id));
        Value::Object(out)
    }
}

/// Per-website state. Profiles keep insertion order for stable listings.
#[derive(Default)]
pub struct Website {
    pub profiles: Vec<StoredProfile>,
    /// Conversation session ids linked to a profile, keyed by `people_id`.
    pub conversations: HashMap<String, Vec<String>>,
}

pub type Db = Arc<RwLock<HashMap<String, Website>>>;

pub fn app() -> Router {
    app_with_db(Arc::new(RwLock::new(HashMap::new())))
}

/// Build the router over caller-owned state, letting tests seed data
/// directly through the shared `Db` handle.
pub fn app_with_db(db: Db) -> Router {
    Router::new()
        .route("/website/{website_id}/people/stats", get(people_stats))
        .route(
            "/website/{website_id}/people/segments/{page}",
            get(list_segments),
        )
        .route(
            "/website/{website_id}/people/profiles/{page}",
            get(list_profiles),
        )
        .route("/website/{website_id}/people/profile", post(add_profile))
        .route(
            "/website/{website_id}/people/profile/{people_id}",
            get(get_profile)
                .put(save_profile)
                .patch(update_profile)
                .delete(remove_profile),
        )
        .route(
            "/website/{website_id}/people/conversations/{people_id}/list/{page}",
            get(list_conversations),
        )
        .route(
            "/website/{website_id}/people/export/profiles",
            post(export_profiles),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_db(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_db(db)).await
}

/// 1-based page slice of `items`.
fn page_slice<T: Clone>(items: &[T], page: u32) -> Vec<T> {
    let start = (page.max(1) as usize - 1) * PAGE_SIZE;
    items.iter().skip(start).take(PAGE_SIZE).cloned().collect()
}

fn find_profile<'a>(website: &'a Website, id: &str) -> Option<&'a StoredProfile> {
    website
        .profiles
        .iter()
        .find(|p| p.people_id == id || p.email() == Some(id))
}

fn find_profile_index(website: &Website, id: &str) -> Option<usize> {
    website
        .profiles
        .iter()
        .position(|p| p.people_id == id || p.email() == Some(id))
}

async fn people_stats(State(db): State<Db>, Path(website_id): Path<String>) -> Json<Value> {
    let db = db.read().await;
    let total = db.get(&website_id).map_or(0, |w| w.profiles.len());
    Json(json!({"data": {"total": total}}))
}

async fn list_segments(
    State(db): State<Db>,
    Path((website_id, page)): Path<(String, u32)>,
) -> Json<Value> {
    let db = db.read().await;
    // BTreeMap for a stable, name-ordered listing.
    let mut counts = std::collections::BTreeMap::new();
    if let Some(website) = db.get(&website_id) {
        for profile in &website.profiles {
            let segments = profile
                .card
                .get("segments")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str);
            for segment in segments {
                *counts.entry(segment.to_string()).or_insert(0u32) += 1;
            }
        }
    }
    let segments: Vec<Value> = counts
        .into_iter()
        .map(|(segment, count)| json!({"segment": segment, "count": count}))
        .collect();
    Json(json!({"data": page_slice(&segments, page)}))
}

#[derive(Deserialize)]
struct ListProfilesQuery {
    #[serde(default)]
    sort_field: String,
    #[serde(default)]
    sort_order: String,
    #[serde(default)]
    search_filter: String,
}

#[derive(Deserialize)]
struct SearchFilter {
    criterion: String,
    operator: String,
    #[serde(default)]
    query: Vec<String>,
}

/// Apply one search predicate to a card. Unknown criteria and operators
/// match nothing.
fn filter_matches(card: &Map<String, Value>, filter: &SearchFilter) -> bool {
    match (filter.criterion.as_str(), filter.operator.as_str()) {
        ("email", "equal") => card
            .get("email")
            .and_then(Value::as_str)
            .is_some_and(|email| filter.query.iter().any(|q| q == email)),
        ("email", "not_equal") => !card
            .get("email")
            .and_then(Value::as_str)
            .is_some_and(|email| filter.query.iter().any(|q| q == email)),
        ("segments", "has") => card
            .get("segments")
            .and_then(Value::as_array)
            .is_some_and(|segments| {
                segments
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|s| filter.query.iter().any(|q| q == s))
            }),
        _ => false,
    }
}

async fn list_profiles(
    State(db): State<Db>,
    Path((website_id, page)): Path<(String, u32)>,
    Query(query): Query<ListProfilesQuery>,
) -> Result<Json<Value>, StatusCode> {
    let filters: Vec<SearchFilter> = if query.search_filter.is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(&query.search_filter).map_err(|_| StatusCode::BAD_REQUEST)?
    };

    let db = db.read().await;
    let mut profiles: Vec<&StoredProfile> = db
        .get(&website_id)
        .map(|w| w.profiles.iter().collect())
        .unwrap_or_default();

    profiles.retain(|p| filters.iter().all(|f| filter_matches(&p.card, f)));

    if query.sort_field == "email" {
        profiles.sort_by_key(|p| p.email().unwrap_or_default().to_string());
        if query.sort_order == "desc" {
            profiles.reverse();
        }
    }

    let listed: Vec<Value> = profiles.iter().map(|p| p.to_json()).collect();
    Ok(Json(json!({"data": page_slice(&listed, page)})))
}

async fn add_profile(
    State(db): State<Db>,
    Path(website_id): Path<String>,
    Json(card): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let email = card
        .get("email")
        .and_then(Value::as_str)
        .ok_or(StatusCode::BAD_REQUEST)?
        .to_string();

    let mut db = db.write().await;
    let website = db.entry(website_id.clone()).or_default();
    if website.profiles.iter().any(|p| p.email() == Some(&email)) {
        return Err(StatusCode::CONFLICT);
    }

    let people_id = Uuid::new_v4().to_string();
    tracing::info!(%website_id, %people_id, %email, "profile created");
    website.profiles.push(StoredProfile { people_id: people_id.clone(), card });
    Ok((StatusCode::CREATED, Json(json!({"data": {"people_id": people_id}}))))
}

async fn get_profile(
    State(db): State<Db>,
    Path((website_id, people_id)): Path<(String, String)>,
) -> Result<Json<Value>, StatusCode> {
    let db = db.read().await;
    let website = db.get(&website_id).ok_or(StatusCode::NOT_FOUND)?;
    let profile = find_profile(website, &people_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({"data": profile.to_json()})))
}

async fn save_profile(
    State(db): State<Db>,
    Path((website_id, people_id)): Path<(String, String)>,
    Json(card): Json<Map<String, Value>>,
) -> Result<Json<Value>, StatusCode> {
    let mut db = db.write().await;
    let website = db.get_mut(&website_id).ok_or(StatusCode::NOT_FOUND)?;
    let index = find_profile_index(website, &people_id).ok_or(StatusCode::NOT_FOUND)?;
    website.profiles[index].card = card;
    Ok(Json(json!({"data": {}})))
}

async fn update_profile(
    State(db): State<Db>,
    Path((website_id, people_id)): Path<(String, String)>,
    Json(card): Json<Map<String, Value>>,
) -> Result<Json<Value>, StatusCode> {
    let mut db = db.write().await;
    let website = db.get_mut(&website_id).ok_or(StatusCode::NOT_FOUND)?;
    let index = find_profile_index(website, &people_id).ok_or(StatusCode::NOT_FOUND)?;
    for (key, value) in card {
        website.profiles[index].card.insert(key, value);
    }
    Ok(Json(json!({"data": {}})))
}

async fn remove_profile(
    State(db): State<Db>,
    Path((website_id, people_id)): Path<(String, String)>,
) -> Result<Json<Value>, StatusCode> {
    let mut db = db.write().await;
    let website = db.get_mut(&website_id).ok_or(StatusCode::NOT_FOUND)?;
    let index = find_profile_index(website, &people_id).ok_or(StatusCode::NOT_FOUND)?;
    let removed = website.profiles.remove(index);
    website.conversations.remove(&removed.people_id);
    tracing::info!(%website_id, people_id = %removed.people_id, "profile removed");
    Ok(Json(json!({"data": {}})))
}

async fn list_conversations(
    State(db): State<Db>,
    Path((website_id, people_id, page)): Path<(String, String, u32)>,
) -> Result<Json<Value>, StatusCode> {
    let db = db.read().await;
    let website = db.get(&website_id).ok_or(StatusCode::NOT_FOUND)?;
    let profile = find_profile(website, &people_id).ok_or(StatusCode::NOT_FOUND)?;
    let sessions = website
        .conversations
        .get(&profile.people_id)
        .cloned()
        .unwrap_or_default();
    Ok(Json(json!({"data": page_slice(&sessions, page)})))
}

async fn export_profiles(
    State(db): State<Db>,
    Path(website_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let db = db.read().await;
    let total = db.get(&website_id).map_or(0, |w| w.profiles.len());
    tracing::info!(%website_id, total, "export job enqueued");
    (StatusCode::ACCEPTED, Json(json!({"data": {}})))
}
