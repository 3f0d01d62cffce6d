//! In-memory stand-in for a Twitter-compatible API server.
//!
//! Speaks the GET-only `*.json` dialect the chirp client expects: Basic
//! auth, newest-first listings with `count`/`page`/`since_id`/`max_id`
//! paging, and write operations that take their input as query
//! parameters. Two fixture accounts exist: `finch`/`seedcracker` and
//! `wren`/`hedgerow`. The classic API keeps the `.json` suffix on the
//! last path segment, so trailing path parameters capture it and strip
//! it by hand.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

const CREATED_AT: &str = "Thu Jul 16 09:30:00 +0000 2009";

#[derive(Clone, Debug)]
pub struct Account {
    pub id: u64,
    pub screen_name: String,
    pub password: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiUser {
    pub id: u64,
    pub name: String,
    pub screen_name: String,
    pub url: Option<String>,
    pub profile_image_url: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub followers_count: u64,
    pub friends_count: u64,
    pub statuses_count: u64,
    pub created_at: String,
    pub protected: bool,
    pub utc_offset: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiStatus {
    pub id: u64,
    pub user: ApiUser,
    pub text: String,
    pub created_at: String,
    pub source: String,
    pub truncated: bool,
    pub favorited: bool,
    pub in_reply_to_status_id: Option<u64>,
    pub in_reply_to_user_id: Option<u64>,
    pub in_reply_to_screen_name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiDirectMessage {
    pub id: u64,
    pub sender: ApiUser,
    pub recipient: ApiUser,
    pub text: String,
    pub created_at: String,
}

#[derive(Clone, Debug)]
struct StoredStatus {
    id: u64,
    author: String,
    text: String,
    in_reply_to_status_id: Option<u64>,
}

#[derive(Clone, Debug)]
struct StoredMessage {
    id: u64,
    sender: String,
    recipient: String,
    text: String,
}

pub struct ServerState {
    accounts: Vec<Account>,
    statuses: Vec<StoredStatus>,
    messages: Vec<StoredMessage>,
    friends: HashMap<String, HashSet<String>>,
    blocks: HashMap<String, HashSet<String>>,
    favorites: HashMap<String, HashSet<u64>>,
    next_id: u64,
}

impl ServerState {
    fn new() -> Self {
        ServerState {
            accounts: vec![
                Account {
                    id: 1,
                    screen_name: "finch".to_string(),
                    password: "seedcracker".to_string(),
                    name: "Finch".to_string(),
                },
                Account {
                    id: 2,
                    screen_name: "wren".to_string(),
                    password: "hedgerow".to_string(),
                    name: "Wren".to_string(),
                },
            ],
            statuses: Vec::new(),
            messages: Vec::new(),
            friends: HashMap::new(),
            blocks: HashMap::new(),
            favorites: HashMap::new(),
            // Entity ids start well above the account ids.
            next_id: 100,
        }
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn account(&self, screen_name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.screen_name == screen_name)
    }

    fn account_by_id(&self, id: u64) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    fn follows(&self, who: &str, target: &str) -> bool {
        self.friends.get(who).is_some_and(|set| set.contains(target))
    }

    fn render_user(&self, account: &Account) -> ApiUser {
        ApiUser {
            id: account.id,
            name: account.name.clone(),
            screen_name: account.screen_name.clone(),
            url: None,
            profile_image_url: Some(format!(
                "http://example.test/avatars/{}.png",
                account.screen_name
            )),
            description: Some(format!("{} of the fixture flock", account.name)),
            location: None,
            followers_count: self
                .friends
                .values()
                .filter(|set| set.contains(&account.screen_name))
                .count() as u64,
            friends_count: self.friends.get(&account.screen_name).map_or(0, HashSet::len) as u64,
            statuses_count: self
                .statuses
                .iter()
                .filter(|s| s.author == account.screen_name)
                .count() as u64,
            created_at: CREATED_AT.to_string(),
            protected: false,
            utc_offset: None,
        }
    }

    fn render_status(&self, status: &StoredStatus, viewer: Option<&str>) -> Option<ApiStatus> {
        let author = self.account(&status.author)?;
        let favorited = viewer.is_some_and(|viewer| {
            self.favorites.get(viewer).is_some_and(|set| set.contains(&status.id))
        });
        let parent_author = status
            .in_reply_to_status_id
            .and_then(|id| self.statuses.iter().find(|s| s.id == id))
            .and_then(|parent| self.account(&parent.author));
        Some(ApiStatus {
            id: status.id,
            user: self.render_user(author),
            text: status.text.clone(),
            created_at: CREATED_AT.to_string(),
            source: "web".to_string(),
            truncated: false,
            favorited,
            in_reply_to_status_id: status.in_reply_to_status_id,
            in_reply_to_user_id: parent_author.map(|a| a.id),
            in_reply_to_screen_name: parent_author.map(|a| a.screen_name.clone()),
        })
    }

    fn render_message(&self, message: &StoredMessage) -> Option<ApiDirectMessage> {
        let sender = self.account(&message.sender)?;
        let recipient = self.account(&message.recipient)?;
        Some(ApiDirectMessage {
            id: message.id,
            sender: self.render_user(sender),
            recipient: self.render_user(recipient),
            text: message.text.clone(),
            created_at: CREATED_AT.to_string(),
        })
    }
}

pub type Db = Arc<RwLock<ServerState>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(ServerState::new()));
    Router::new()
        .route("/account/verify_credentials.json", get(verify_credentials))
        .route("/account/rate_limit_status.json", get(rate_limit_status))
        .route("/statuses/public_timeline.json", get(public_timeline))
        .route("/statuses/friends_timeline.json", get(friends_timeline))
        .route("/statuses/mentions.json", get(mentions))
        .route("/statuses/user_timeline.json", get(own_timeline))
        .route("/statuses/user_timeline/{user}", get(user_timeline))
        .route("/statuses/update.json", get(update_status))
        .route("/statuses/show/{id}", get(show_status))
        .route("/statuses/destroy/{id}", get(destroy_status))
        .route("/direct_messages.json", get(received_messages))
        .route("/direct_messages/sent.json", get(sent_messages))
        .route("/direct_messages/new.json", get(new_message))
        .route("/direct_messages/destroy/{id}", get(destroy_message))
        .route("/friendships/create/{user}", get(create_friendship))
        .route("/friendships/destroy/{user}", get(destroy_friendship))
        .route("/friendships/show.json", get(show_friendship))
        .route("/friends/ids.json", get(friends_ids))
        .route("/followers/ids.json", get(followers_ids))
        .route("/favorites.json", get(own_favorites))
        .route("/favorites/{user}", get(user_favorites))
        .route("/favorites/create/{id}", get(create_favorite))
        .route("/favorites/destroy/{id}", get(destroy_favorite))
        .route("/notifications/follow/{user}", get(follow_notifications))
        .route("/notifications/leave/{user}", get(leave_notifications))
        .route("/blocks/create/{user}", get(create_block))
        .route("/blocks/destroy/{user}", get(destroy_block))
        .route("/blocks/exists/{user}", get(block_exists))
        .route("/blocks/blocking.json", get(blocking_users))
        .route("/blocks/blocking/ids.json", get(blocking_ids))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

#[derive(Debug, Default, Deserialize)]
struct PageParams {
    count: Option<u64>,
    page: Option<u64>,
    since_id: Option<u64>,
    max_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct UpdateParams {
    status: String,
    in_reply_to_status_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct NewMessageParams {
    user: String,
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct FriendshipQuery {
    target_id: Option<u64>,
    target_screen_name: Option<String>,
    source_id: Option<u64>,
    source_screen_name: Option<String>,
}

fn authorized_account(state: &ServerState, headers: &HeaderMap) -> Option<Account> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    let (screen_name, password) = decoded.split_once(':')?;
    state
        .accounts
        .iter()
        .find(|a| a.screen_name == screen_name && a.password == password)
        .cloned()
}

fn viewer_name(viewer: &Option<Account>) -> Option<&str> {
    viewer.as_ref().map(|a| a.screen_name.as_str())
}

/// Trailing path parameters arrive as `name.json`.
fn strip_json(segment: &str) -> Option<&str> {
    segment.strip_suffix(".json")
}

fn parse_id(segment: &str) -> Option<u64> {
    strip_json(segment)?.parse().ok()
}

/// Newest-first slice of `rows` after cursor filtering: `since_id` is
/// exclusive, `max_id` inclusive, then page/count windowing applies.
fn paginate<T>(rows: Vec<T>, id_of: impl Fn(&T) -> u64, params: &PageParams) -> Vec<T> {
    let count = params.count.unwrap_or(20).clamp(1, 3200) as usize;
    let page = params.page.unwrap_or(1).max(1) as usize;
    let mut rows: Vec<T> = rows
        .into_iter()
        .filter(|row| {
            let id = id_of(row);
            params.since_id.is_none_or(|since| id > since)
                && params.max_id.is_none_or(|max| id <= max)
        })
        .collect();
    rows.sort_by_key(|row| std::cmp::Reverse(id_of(row)));
    rows.into_iter().skip((page - 1) * count).take(count).collect()
}

fn render_statuses(
    state: &ServerState,
    rows: &[StoredStatus],
    viewer: Option<&str>,
) -> Vec<ApiStatus> {
    rows.iter().filter_map(|s| state.render_status(s, viewer)).collect()
}

async fn verify_credentials(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<ApiUser>, StatusCode> {
    let state = db.read().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    Ok(Json(state.render_user(&me)))
}

async fn rate_limit_status() -> Json<Value> {
    Json(json!({
        "remaining_hits": 150,
        "hourly_limit": 150,
        "reset_time_in_seconds": 1247735400,
        "reset_time": CREATED_AT,
    }))
}

async fn public_timeline(
    State(db): State<Db>,
    Query(params): Query<PageParams>,
    headers: HeaderMap,
) -> Json<Vec<ApiStatus>> {
    let state = db.read().await;
    let viewer = authorized_account(&state, &headers);
    let rows = paginate(state.statuses.clone(), |s| s.id, &params);
    Json(render_statuses(&state, &rows, viewer_name(&viewer)))
}

async fn friends_timeline(
    State(db): State<Db>,
    Query(params): Query<PageParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApiStatus>>, StatusCode> {
    let state = db.read().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let visible: Vec<StoredStatus> = state
        .statuses
        .iter()
        .filter(|s| s.author == me.screen_name || state.follows(&me.screen_name, &s.author))
        .cloned()
        .collect();
    let rows = paginate(visible, |s| s.id, &params);
    Ok(Json(render_statuses(&state, &rows, Some(&me.screen_name))))
}

async fn mentions(
    State(db): State<Db>,
    Query(params): Query<PageParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApiStatus>>, StatusCode> {
    let state = db.read().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let needle = format!("@{}", me.screen_name);
    let mentioning: Vec<StoredStatus> = state
        .statuses
        .iter()
        .filter(|s| s.text.contains(&needle))
        .cloned()
        .collect();
    let rows = paginate(mentioning, |s| s.id, &params);
    Ok(Json(render_statuses(&state, &rows, Some(&me.screen_name))))
}

async fn own_timeline(
    State(db): State<Db>,
    Query(params): Query<PageParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApiStatus>>, StatusCode> {
    let state = db.read().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    Ok(Json(timeline_of(&state, &me.screen_name, &params, Some(&me.screen_name))))
}

async fn user_timeline(
    State(db): State<Db>,
    Path(raw): Path<String>,
    Query(params): Query<PageParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApiStatus>>, StatusCode> {
    let state = db.read().await;
    let name = strip_json(&raw).ok_or(StatusCode::BAD_REQUEST)?;
    let target = state.account(name).ok_or(StatusCode::NOT_FOUND)?.screen_name.clone();
    let viewer = authorized_account(&state, &headers);
    Ok(Json(timeline_of(&state, &target, &params, viewer_name(&viewer))))
}

fn timeline_of(
    state: &ServerState,
    author: &str,
    params: &PageParams,
    viewer: Option<&str>,
) -> Vec<ApiStatus> {
    let authored: Vec<StoredStatus> = state
        .statuses
        .iter()
        .filter(|s| s.author == author)
        .cloned()
        .collect();
    let rows = paginate(authored, |s| s.id, params);
    render_statuses(state, &rows, viewer)
}

async fn update_status(
    State(db): State<Db>,
    Query(input): Query<UpdateParams>,
    headers: HeaderMap,
) -> Result<Json<ApiStatus>, StatusCode> {
    let mut state = db.write().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let status = StoredStatus {
        id: state.take_id(),
        author: me.screen_name.clone(),
        text: input.status,
        in_reply_to_status_id: input.in_reply_to_status_id,
    };
    state.statuses.push(status.clone());
    state
        .render_status(&status, Some(&me.screen_name))
        .map(Json)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn show_status(
    State(db): State<Db>,
    Path(raw): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiStatus>, StatusCode> {
    let state = db.read().await;
    let id = parse_id(&raw).ok_or(StatusCode::BAD_REQUEST)?;
    let viewer = authorized_account(&state, &headers);
    let status = state.statuses.iter().find(|s| s.id == id).ok_or(StatusCode::NOT_FOUND)?;
    state
        .render_status(status, viewer_name(&viewer))
        .map(Json)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn destroy_status(
    State(db): State<Db>,
    Path(raw): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiStatus>, StatusCode> {
    let mut state = db.write().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let id = parse_id(&raw).ok_or(StatusCode::BAD_REQUEST)?;
    let position = state
        .statuses
        .iter()
        .position(|s| s.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    if state.statuses[position].author != me.screen_name {
        return Err(StatusCode::FORBIDDEN);
    }
    let removed = state.statuses.remove(position);
    state
        .render_status(&removed, Some(&me.screen_name))
        .map(Json)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn received_messages(
    State(db): State<Db>,
    Query(params): Query<PageParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApiDirectMessage>>, StatusCode> {
    messages_where(&db, &headers, &params, |message, me| message.recipient == me).await
}

async fn sent_messages(
    State(db): State<Db>,
    Query(params): Query<PageParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApiDirectMessage>>, StatusCode> {
    messages_where(&db, &headers, &params, |message, me| message.sender == me).await
}

async fn messages_where(
    db: &Db,
    headers: &HeaderMap,
    params: &PageParams,
    keep: impl Fn(&StoredMessage, &str) -> bool,
) -> Result<Json<Vec<ApiDirectMessage>>, StatusCode> {
    let state = db.read().await;
    let me = authorized_account(&state, headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let mine: Vec<StoredMessage> = state
        .messages
        .iter()
        .filter(|m| keep(m, &me.screen_name))
        .cloned()
        .collect();
    let rows = paginate(mine, |m| m.id, params);
    Ok(Json(rows.iter().filter_map(|m| state.render_message(m)).collect()))
}

async fn new_message(
    State(db): State<Db>,
    Query(input): Query<NewMessageParams>,
    headers: HeaderMap,
) -> Result<Json<ApiDirectMessage>, StatusCode> {
    let mut state = db.write().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    if state.account(&input.user).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    let message = StoredMessage {
        id: state.take_id(),
        sender: me.screen_name.clone(),
        recipient: input.user,
        text: input.text,
    };
    state.messages.push(message.clone());
    state.render_message(&message).map(Json).ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn destroy_message(
    State(db): State<Db>,
    Path(raw): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiDirectMessage>, StatusCode> {
    let mut state = db.write().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let id = parse_id(&raw).ok_or(StatusCode::BAD_REQUEST)?;
    let position = state
        .messages
        .iter()
        .position(|m| {
            m.id == id && (m.sender == me.screen_name || m.recipient == me.screen_name)
        })
        .ok_or(StatusCode::NOT_FOUND)?;
    let removed = state.messages.remove(position);
    state.render_message(&removed).map(Json).ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn create_friendship(
    State(db): State<Db>,
    Path(raw): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiUser>, StatusCode> {
    let mut state = db.write().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let name = strip_json(&raw).ok_or(StatusCode::BAD_REQUEST)?;
    let target = state.account(name).cloned().ok_or(StatusCode::NOT_FOUND)?;
    if target.screen_name == me.screen_name {
        return Err(StatusCode::FORBIDDEN);
    }
    state
        .friends
        .entry(me.screen_name)
        .or_default()
        .insert(target.screen_name.clone());
    Ok(Json(state.render_user(&target)))
}

async fn destroy_friendship(
    State(db): State<Db>,
    Path(raw): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiUser>, StatusCode> {
    let mut state = db.write().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let name = strip_json(&raw).ok_or(StatusCode::BAD_REQUEST)?;
    let target = state.account(name).cloned().ok_or(StatusCode::NOT_FOUND)?;
    if let Some(set) = state.friends.get_mut(&me.screen_name) {
        set.remove(&target.screen_name);
    }
    Ok(Json(state.render_user(&target)))
}

async fn show_friendship(
    State(db): State<Db>,
    Query(query): Query<FriendshipQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let state = db.read().await;
    if query.target_id.is_none() && query.target_screen_name.is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let target = match query.target_id {
        Some(id) => state.account_by_id(id),
        None => query.target_screen_name.as_deref().and_then(|name| state.account(name)),
    }
    .cloned()
    .ok_or(StatusCode::NOT_FOUND)?;
    let source = match (query.source_id, query.source_screen_name.as_deref()) {
        (Some(id), _) => state.account_by_id(id).cloned(),
        (None, Some(name)) => state.account(name).cloned(),
        (None, None) => authorized_account(&state, &headers),
    }
    .ok_or(StatusCode::BAD_REQUEST)?;

    let side = |a: &Account, b: &Account| {
        json!({
            "id": a.id,
            "screen_name": a.screen_name,
            "following": state.follows(&a.screen_name, &b.screen_name),
            "followed_by": state.follows(&b.screen_name, &a.screen_name),
        })
    };
    Ok(Json(json!({
        "relationship": {
            "source": side(&source, &target),
            "target": side(&target, &source),
        }
    })))
}

async fn friends_ids(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Vec<u64>>, StatusCode> {
    let state = db.read().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let mut ids: Vec<u64> = state
        .friends
        .get(&me.screen_name)
        .map(|set| {
            set.iter()
                .filter_map(|name| state.account(name))
                .map(|a| a.id)
                .collect()
        })
        .unwrap_or_default();
    ids.sort_unstable();
    Ok(Json(ids))
}

async fn followers_ids(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Vec<u64>>, StatusCode> {
    let state = db.read().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let mut ids: Vec<u64> = state
        .accounts
        .iter()
        .filter(|a| state.follows(&a.screen_name, &me.screen_name))
        .map(|a| a.id)
        .collect();
    ids.sort_unstable();
    Ok(Json(ids))
}

async fn own_favorites(
    State(db): State<Db>,
    Query(params): Query<PageParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApiStatus>>, StatusCode> {
    let state = db.read().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    Ok(Json(favorites_of(&state, &me.screen_name, &params)))
}

async fn user_favorites(
    State(db): State<Db>,
    Path(raw): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<ApiStatus>>, StatusCode> {
    let state = db.read().await;
    let name = strip_json(&raw).ok_or(StatusCode::BAD_REQUEST)?;
    let owner = state.account(name).ok_or(StatusCode::NOT_FOUND)?.screen_name.clone();
    Ok(Json(favorites_of(&state, &owner, &params)))
}

fn favorites_of(state: &ServerState, owner: &str, params: &PageParams) -> Vec<ApiStatus> {
    let marked: Vec<StoredStatus> = state
        .statuses
        .iter()
        .filter(|s| state.favorites.get(owner).is_some_and(|set| set.contains(&s.id)))
        .cloned()
        .collect();
    let rows = paginate(marked, |s| s.id, params);
    render_statuses(state, &rows, Some(owner))
}

async fn create_favorite(
    State(db): State<Db>,
    Path(raw): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiStatus>, StatusCode> {
    let mut state = db.write().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let id = parse_id(&raw).ok_or(StatusCode::BAD_REQUEST)?;
    let status = state
        .statuses
        .iter()
        .find(|s| s.id == id)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;
    state.favorites.entry(me.screen_name.clone()).or_default().insert(id);
    state
        .render_status(&status, Some(&me.screen_name))
        .map(Json)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn destroy_favorite(
    State(db): State<Db>,
    Path(raw): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiStatus>, StatusCode> {
    let mut state = db.write().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let id = parse_id(&raw).ok_or(StatusCode::BAD_REQUEST)?;
    let status = state
        .statuses
        .iter()
        .find(|s| s.id == id)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;
    if let Some(set) = state.favorites.get_mut(&me.screen_name) {
        set.remove(&id);
    }
    state
        .render_status(&status, Some(&me.screen_name))
        .map(Json)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn follow_notifications(
    State(db): State<Db>,
    Path(raw): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    enveloped_user(&db, &raw, &headers).await
}

async fn leave_notifications(
    State(db): State<Db>,
    Path(raw): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    enveloped_user(&db, &raw, &headers).await
}

/// The notifications endpoint family wraps its account response in a
/// `{"user": ...}` envelope.
async fn enveloped_user(
    db: &Db,
    raw: &str,
    headers: &HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let state = db.read().await;
    authorized_account(&state, headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let name = strip_json(raw).ok_or(StatusCode::BAD_REQUEST)?;
    let target = state.account(name).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({ "user": state.render_user(target) })))
}

async fn create_block(
    State(db): State<Db>,
    Path(raw): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiUser>, StatusCode> {
    let mut state = db.write().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let name = strip_json(&raw).ok_or(StatusCode::BAD_REQUEST)?;
    let target = state.account(name).cloned().ok_or(StatusCode::NOT_FOUND)?;
    if target.screen_name == me.screen_name {
        return Err(StatusCode::FORBIDDEN);
    }
    state
        .blocks
        .entry(me.screen_name.clone())
        .or_default()
        .insert(target.screen_name.clone());
    // Blocking severs the friendship in both directions.
    if let Some(set) = state.friends.get_mut(&me.screen_name) {
        set.remove(&target.screen_name);
    }
    if let Some(set) = state.friends.get_mut(&target.screen_name) {
        set.remove(&me.screen_name);
    }
    Ok(Json(state.render_user(&target)))
}

async fn destroy_block(
    State(db): State<Db>,
    Path(raw): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiUser>, StatusCode> {
    let mut state = db.write().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let name = strip_json(&raw).ok_or(StatusCode::BAD_REQUEST)?;
    let target = state.account(name).cloned().ok_or(StatusCode::NOT_FOUND)?;
    if let Some(set) = state.blocks.get_mut(&me.screen_name) {
        set.remove(&target.screen_name);
    }
    Ok(Json(state.render_user(&target)))
}

async fn block_exists(
    State(db): State<Db>,
    Path(raw): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiUser>, StatusCode> {
    let state = db.read().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let name = strip_json(&raw).ok_or(StatusCode::BAD_REQUEST)?;
    let target = state.account(name).ok_or(StatusCode::NOT_FOUND)?;
    // "Not blocking" is reported as 404, matching the classic API.
    if !state
        .blocks
        .get(&me.screen_name)
        .is_some_and(|set| set.contains(&target.screen_name))
    {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(state.render_user(target)))
}

async fn blocking_users(
    State(db): State<Db>,
    Query(params): Query<PageParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApiUser>>, StatusCode> {
    let state = db.read().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let blocked: Vec<Account> = state
        .accounts
        .iter()
        .filter(|a| {
            state
                .blocks
                .get(&me.screen_name)
                .is_some_and(|set| set.contains(&a.screen_name))
        })
        .cloned()
        .collect();
    let rows = paginate(blocked, |a| a.id, &params);
    Ok(Json(rows.iter().map(|a| state.render_user(a)).collect()))
}

async fn blocking_ids(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Vec<u64>>, StatusCode> {
    let state = db.read().await;
    let me = authorized_account(&state, &headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let mut ids: Vec<u64> = state
        .accounts
        .iter()
        .filter(|a| {
            state
                .blocks
                .get(&me.screen_name)
                .is_some_and(|set| set.contains(&a.screen_name))
        })
        .map(|a| a.id)
        .collect();
    ids.sort_unstable();
    Ok(Json(ids))
}
