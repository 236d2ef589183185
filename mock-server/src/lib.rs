//! In-memory stand-in for the Gorse recommender API.
//!
//! Every request is appended to a journal before the `X-API-Key` check, so
//! tests can assert exactly what went over the wire, including rejected calls.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const DEFAULT_N: usize = 10;

/// One request as received, before authentication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub api_key: Option<String>,
    pub body: Option<String>,
}

#[derive(Default)]
struct Store {
    users: BTreeMap<String, Value>,
    items: BTreeMap<String, Value>,
    feedback: Vec<Value>,
    journal: Vec<RecordedRequest>,
}

/// Shared server state. Cloning shares the same store.
#[derive(Clone)]
pub struct MockState {
    api_key: Arc<str>,
    store: Arc<RwLock<Store>>,
}

impl MockState {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: Arc::from(api_key),
            store: Arc::new(RwLock::new(Store::default())),
        }
    }

    pub async fn journal(&self) -> Vec<RecordedRequest> {
        self.store.read().await.journal.clone()
    }

    /// Journal snapshot for callers outside the runtime.
    pub fn blocking_journal(&self) -> Vec<RecordedRequest> {
        self.store.blocking_read().journal.clone()
    }

    pub async fn feedback(&self) -> Vec<Value> {
        self.store.read().await.feedback.clone()
    }

    pub fn blocking_feedback(&self) -> Vec<Value> {
        self.store.blocking_read().feedback.clone()
    }
}

/// Options accepted by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(rename = "write-back-type")]
    pub write_back_type: Option<String>,
    #[serde(rename = "write-back-delay")]
    pub write_back_delay: Option<String>,
    pub n: Option<usize>,
    pub offset: Option<usize>,
}

impl ListParams {
    fn page<T>(&self, entries: Vec<T>) -> Vec<T> {
        entries
            .into_iter()
            .skip(self.offset.unwrap_or(0))
            .take(self.n.unwrap_or(DEFAULT_N))
            .collect()
    }
}

pub fn app(state: MockState) -> Router {
    Router::new()
        .route("/api/user/", post(insert_user))
        .route("/api/user/{user_id}", get(get_user).delete(delete_user))
        .route("/api/user/{user_id}/neighbors", get(user_neighbors))
        .route("/api/item/", post(insert_item))
        .route("/api/items", post(insert_items))
        .route("/api/item/{item_id}", get(get_item).delete(delete_item))
        .route("/api/item/{item_id}/neighbors", get(item_neighbors))
        .route("/api/item/{item_id}/neighbors/{category}", get(item_neighbors_in_category))
        .route("/api/feedback/", post(insert_feedback))
        .route("/api/latest/", get(latest))
        .route("/api/latest/{category}", get(latest_in_category))
        .route("/api/popular", get(popular))
        .route("/api/popular/{category}", get(popular_in_category))
        .route("/api/recommend/{user_id}", get(recommend))
        .route("/api/recommend/{user_id}/{category}", get(recommend_in_category))
        .layer(middleware::from_fn_with_state(state.clone(), record_and_authenticate))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

fn row_affected(count: usize) -> Json<Value> {
    Json(json!({ "RowAffected": count }))
}

async fn record_and_authenticate(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return error(StatusCode::BAD_REQUEST, "unreadable body").into_response(),
    };
    let api_key = parts
        .headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let recorded = RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        api_key: api_key.clone(),
        body: (!bytes.is_empty()).then(|| String::from_utf8_lossy(&bytes).into_owned()),
    };
    tracing::debug!(method = %recorded.method, path = %recorded.path, "request");
    state.store.write().await.journal.push(recorded);

    if api_key.as_deref() != Some(&*state.api_key) {
        return error(StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

// --- record helpers ---

fn str_field<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

fn required_id(record: &Value, field: &str) -> ApiResult<String> {
    str_field(record, field)
        .map(str::to_string)
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, &format!("missing {field}")))
}

fn string_set<'a>(record: &'a Value, field: &str) -> HashSet<&'a str> {
    record
        .get(field)
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Not hidden, and in `category` when one is given.
fn visible_in(item: &Value, category: Option<&str>) -> bool {
    let hidden = item.get("IsHidden").and_then(Value::as_bool).unwrap_or(false);
    !hidden && category.map_or(true, |c| string_set(item, "Categories").contains(c))
}

fn tags(record: &Value) -> HashSet<&str> {
    let mut set = string_set(record, "Labels");
    set.extend(string_set(record, "Categories"));
    set
}

fn shared_tags(a: &Value, b: &Value) -> usize {
    tags(a).intersection(&tags(b)).count()
}

impl Store {
    fn popularity(&self) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for feedback in &self.feedback {
            if let Some(item_id) = str_field(feedback, "ItemId") {
                *counts.entry(item_id).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Records of `pool` sharing labels or categories with `target`, best first.
fn neighbors(
    target_id: &str,
    target: &Value,
    pool: &BTreeMap<String, Value>,
    category: Option<&str>,
) -> Vec<Value> {
    let mut scored: Vec<(&String, usize)> = pool
        .iter()
        .filter(|(id, record)| id.as_str() != target_id && visible_in(record, category))
        .map(|(id, record)| (id, shared_tags(target, record)))
        .filter(|(_, score)| *score > 0)
        .collect();
    scored.sort_by_key(|&(id, score)| (Reverse(score), id.as_str()));
    scored
        .into_iter()
        .take(DEFAULT_N)
        .map(|(id, score)| json!({ "Id": id, "Score": score as f64 }))
        .collect()
}

// --- users ---

async fn insert_user(State(state): State<MockState>, Json(user): Json<Value>) -> ApiResult<Json<Value>> {
    let id = required_id(&user, "UserId")?;
    state.store.write().await.users.insert(id, user);
    Ok(row_affected(1))
}

async fn get_user(State(state): State<MockState>, Path(user_id): Path<String>) -> ApiResult<Json<Value>> {
    let store = state.store.read().await;
    store
        .users
        .get(&user_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, &format!("user {user_id} not found")))
}

async fn delete_user(State(state): State<MockState>, Path(user_id): Path<String>) -> Json<Value> {
    let removed = state.store.write().await.users.remove(&user_id).is_some();
    row_affected(usize::from(removed))
}

async fn user_neighbors(State(state): State<MockState>, Path(user_id): Path<String>) -> ApiResult<Json<Vec<Value>>> {
    let store = state.store.read().await;
    let user = store
        .users
        .get(&user_id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, &format!("user {user_id} not found")))?;
    Ok(Json(neighbors(&user_id, user, &store.users, None)))
}

// --- items ---

async fn insert_item(State(state): State<MockState>, Json(item): Json<Value>) -> ApiResult<Json<Value>> {
    let id = required_id(&item, "ItemId")?;
    state.store.write().await.items.insert(id, item);
    Ok(row_affected(1))
}

async fn insert_items(State(state): State<MockState>, Json(items): Json<Vec<Value>>) -> ApiResult<Json<Value>> {
    let ids = items
        .iter()
        .map(|item| required_id(item, "ItemId"))
        .collect::<ApiResult<Vec<_>>>()?;
    let count = items.len();
    let mut store = state.store.write().await;
    for (id, item) in ids.into_iter().zip(items) {
        store.items.insert(id, item);
    }
    Ok(row_affected(count))
}

async fn get_item(State(state): State<MockState>, Path(item_id): Path<String>) -> ApiResult<Json<Value>> {
    let store = state.store.read().await;
    store
        .items
        .get(&item_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, &format!("item {item_id} not found")))
}

async fn delete_item(State(state): State<MockState>, Path(item_id): Path<String>) -> Json<Value> {
    let removed = state.store.write().await.items.remove(&item_id).is_some();
    row_affected(usize::from(removed))
}

async fn item_neighbors(State(state): State<MockState>, Path(item_id): Path<String>) -> ApiResult<Json<Vec<Value>>> {
    item_neighbors_for(&state, &item_id, None).await
}

async fn item_neighbors_in_category(
    State(state): State<MockState>,
    Path((item_id, category)): Path<(String, String)>,
) -> ApiResult<Json<Vec<Value>>> {
    item_neighbors_for(&state, &item_id, Some(&category)).await
}

async fn item_neighbors_for(state: &MockState, item_id: &str, category: Option<&str>) -> ApiResult<Json<Vec<Value>>> {
    let store = state.store.read().await;
    let item = store
        .items
        .get(item_id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, &format!("item {item_id} not found")))?;
    Ok(Json(neighbors(item_id, item, &store.items, category)))
}

// --- feedback ---

async fn insert_feedback(State(state): State<MockState>, Json(feedback): Json<Vec<Value>>) -> ApiResult<Json<Value>> {
    for entry in &feedback {
        for field in ["FeedbackType", "UserId", "ItemId"] {
            required_id(entry, field)?;
        }
    }
    let count = feedback.len();
    state.store.write().await.feedback.extend(feedback);
    Ok(row_affected(count))
}

// --- recommendation lists ---

async fn latest(State(state): State<MockState>, Query(params): Query<ListParams>) -> Json<Vec<Value>> {
    latest_items(&state, None, &params).await
}

async fn latest_in_category(
    State(state): State<MockState>,
    Path(category): Path<String>,
    Query(params): Query<ListParams>,
) -> Json<Vec<Value>> {
    latest_items(&state, Some(&category), &params).await
}

async fn latest_items(state: &MockState, category: Option<&str>, params: &ListParams) -> Json<Vec<Value>> {
    let store = state.store.read().await;
    let mut items: Vec<(&String, &str)> = store
        .items
        .iter()
        .filter(|(_, item)| visible_in(item, category))
        .map(|(id, item)| (id, str_field(item, "Timestamp").unwrap_or_default()))
        .collect();
    items.sort_by_key(|&(id, timestamp)| (Reverse(timestamp), id.as_str()));
    let total = items.len();
    let scored = items
        .into_iter()
        .enumerate()
        .map(|(rank, (id, _))| json!({ "Id": id, "Score": (total - rank) as f64 }))
        .collect();
    Json(params.page(scored))
}

async fn popular(State(state): State<MockState>, Query(params): Query<ListParams>) -> Json<Vec<Value>> {
    popular_items(&state, None, &params).await
}

async fn popular_in_category(
    State(state): State<MockState>,
    Path(category): Path<String>,
    Query(params): Query<ListParams>,
) -> Json<Vec<Value>> {
    popular_items(&state, Some(&category), &params).await
}

async fn popular_items(state: &MockState, category: Option<&str>, params: &ListParams) -> Json<Vec<Value>> {
    let store = state.store.read().await;
    let counts = store.popularity();
    let mut items: Vec<(&String, usize)> = store
        .items
        .iter()
        .filter(|(_, item)| visible_in(item, category))
        .map(|(id, _)| (id, counts.get(id.as_str()).copied().unwrap_or(0)))
        .collect();
    items.sort_by_key(|&(id, count)| (Reverse(count), id.as_str()));
    let scored = items
        .into_iter()
        .map(|(id, count)| json!({ "Id": id, "Score": count as f64 }))
        .collect();
    Json(params.page(scored))
}

async fn recommend(
    State(state): State<MockState>,
    Path(user_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Json<Vec<Value>> {
    recommend_items(&state, &user_id, None, &params).await
}

async fn recommend_in_category(
    State(state): State<MockState>,
    Path((user_id, category)): Path<(String, String)>,
    Query(params): Query<ListParams>,
) -> Json<Vec<Value>> {
    recommend_items(&state, &user_id, Some(&category), &params).await
}

/// Unseen visible items, most popular first. With `write-back-type` the
/// returned items are recorded as feedback of that type.
async fn recommend_items(
    state: &MockState,
    user_id: &str,
    category: Option<&str>,
    params: &ListParams,
) -> Json<Vec<Value>> {
    let mut store = state.store.write().await;
    let ids: Vec<String> = {
        let seen: HashSet<&str> = store
            .feedback
            .iter()
            .filter(|f| str_field(f, "UserId") == Some(user_id))
            .filter_map(|f| str_field(f, "ItemId"))
            .collect();
        let counts = store.popularity();
        let mut candidates: Vec<(&String, usize)> = store
            .items
            .iter()
            .filter(|(id, item)| !seen.contains(id.as_str()) && visible_in(item, category))
            .map(|(id, _)| (id, counts.get(id.as_str()).copied().unwrap_or(0)))
            .collect();
        candidates.sort_by_key(|&(id, count)| (Reverse(count), id.as_str()));
        params
            .page(candidates)
            .into_iter()
            .map(|(id, _)| id.clone())
            .collect()
    };

    if let Some(feedback_type) = &params.write_back_type {
        let timestamp = Utc::now().to_rfc3339();
        for item_id in &ids {
            let mut record = json!({
                "FeedbackType": feedback_type,
                "UserId": user_id,
                "ItemId": item_id,
                "Timestamp": timestamp,
            });
            if let Some(delay) = &params.write_back_delay {
                record["WriteBackDelay"] = json!(delay);
            }
            store.feedback.push(record);
        }
    }

    Json(ids.into_iter().map(Value::String).collect())
}
