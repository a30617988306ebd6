//! GReader transport (C13): the `axum` router, the token-or-session auth
//! middleware, and request/response (de)serialization for every endpoint
//! in §6's table. Modeled on the teacher's `middleware/auth.rs` — a
//! middleware that inserts the authenticated identity into request
//! extensions, and handlers that pull it back out.

use super::services::GReaderService;
use crate::persistence::SqliteStore;
use axum::extract::{FromRequest, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: SqliteStore,
    pub service: Arc<GReaderService>,
}

/// The user a request authenticated as, inserted into request extensions
/// by [`auth_middleware`].
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser(pub i64);

const TOKEN_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| TOKEN_CHARS[rng.gen_range(0..TOKEN_CHARS.len())] as char).collect()
}

pub fn router(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/reader/api/0/user-info", get(user_info))
        .route("/reader/api/0/subscription/list", get(subscription_list))
        .route("/reader/api/0/subscription/edit", post(subscription_edit))
        .route("/reader/api/0/tag/list", get(tag_list))
        .route("/reader/api/0/edit-tag", post(edit_tag))
        .route("/reader/api/0/mark-all-as-read", post(mark_all_as_read))
        .route("/reader/api/0/unread-count", get(unread_count))
        .route("/reader/api/0/stream/items/ids", get(stream_items_ids))
        .route("/reader/api/0/stream/contents", get(stream_contents).post(stream_contents))
        .route("/reader/api/0/stream/contents/*id", get(stream_contents_for_id).post(stream_contents_for_id))
        .route("/reader/api/0/stream/items/contents", get(stream_contents).post(stream_contents))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/accounts/ClientLogin", post(client_login))
        .route("/reader/api/0/token", get(issue_token))
        .route("/health/", get(health))
        .route("/api/youtube-proxy", get(crate::youtube_proxy::handler))
        .merge(authenticated)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(state.store.pool()).await {
        Ok(_) => (StatusCode::OK, Json(json!({"status": "healthy"}))).into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "unhealthy", "error": e.to_string()}))).into_response(),
    }
}

// --- Auth ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ClientLoginForm {
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "Passwd")]
    passwd: String,
}

async fn client_login(State(state): State<AppState>, Form(form): Form<ClientLoginForm>) -> impl IntoResponse {
    let Ok(Some(user)) = state.store.get_user_by_username_or_email(&form.email).await else {
        return (StatusCode::FORBIDDEN, "Error=BadAuthentication\n".to_string());
    };
    if bcrypt::verify(&form.passwd, &user.password_hash).unwrap_or(false) {
        let token = random_token(57);
        let _ = state
            .store
            .insert_auth_token(&crate::persistence::models::GReaderAuthToken {
                token: token.clone(),
                user_id: user.id,
                expires_at: None,
                created_at: chrono::Utc::now(),
            })
            .await;
        (StatusCode::OK, format!("SID={token}\nLSID=\nAuth={token}\n"))
    } else {
        (StatusCode::FORBIDDEN, "Error=BadAuthentication\n".to_string())
    }
}

async fn issue_token() -> impl IntoResponse {
    random_token(57)
}

async fn auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, Response> {
    let header_token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("GoogleLogin auth="))
        .map(str::to_string);

    let cookie_token = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| cookies.split(';').find_map(|c| c.trim().strip_prefix("greader_session=")))
        .map(str::to_string);

    let Some(token) = header_token.or(cookie_token) else {
        return Err(unauthorized(&request));
    };

    match state.store.find_auth_token(&token).await {
        Ok(Some(t)) if t.expires_at.map(|e| e > chrono::Utc::now()).unwrap_or(true) => {
            request.extensions_mut().insert(AuthedUser(t.user_id));
            Ok(next.run(request).await)
        }
        _ => Err(unauthorized(&request)),
    }
}

fn unauthorized(request: &Request) -> Response {
    let wants_json = request
        .headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("json"))
        .unwrap_or(false)
        || request.uri().path().ends_with("/ids")
        || request.uri().path().contains("contents");
    if wants_json {
        (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "Unauthorized\n").into_response()
    }
}

fn require_user(request: &Request) -> Option<i64> {
    request.extensions().get::<AuthedUser>().map(|u| u.0)
}

// --- User info ------------------------------------------------------------

async fn user_info(State(state): State<AppState>, request: Request) -> impl IntoResponse {
    let Some(user_id) = require_user(&request) else { return unauthorized(&request) };
    match state.store.get_user_by_id(user_id).await {
        Ok(Some(user)) => Json(json!({
            "userId": user.id.to_string(),
            "userName": user.username,
            "userProfileId": user.id.to_string(),
            "userEmail": user.email,
        }))
        .into_response(),
        _ => (StatusCode::NOT_FOUND, "Not found\n").into_response(),
    }
}

// --- Subscriptions -------------------------------------------------------

async fn subscription_list(State(state): State<AppState>, request: Request) -> impl IntoResponse {
    let Some(user_id) = require_user(&request) else { return unauthorized(&request) };
    match state.service.subscription_list(user_id).await {
        Ok(subs) => Json(json!({"subscriptions": subs})).into_response(),
        Err(e) => internal_error(e),
    }
}

// NB: serde_urlencoded (what axum's Form uses) doesn't collect repeated
// `a=`/`r=` keys into a Vec; a real GReader client sending more than one
// label per request needs a dedicated query-string parser here.
#[derive(Debug, Deserialize)]
struct SubscriptionEditForm {
    s: String,
    ac: String,
    t: Option<String>,
    #[serde(default)]
    a: Vec<String>,
    #[serde(default)]
    r: Vec<String>,
}

async fn subscription_edit(State(state): State<AppState>, request: Request) -> impl IntoResponse {
    let Some(user_id) = require_user(&request) else { return unauthorized(&request) };
    let Ok(Form(form)) = Form::<SubscriptionEditForm>::from_request(request, &state).await else {
        return (StatusCode::BAD_REQUEST, "Bad request\n").into_response();
    };
    let Some(feed_id) = form.s.strip_prefix("feed/").and_then(|s| s.parse::<i64>().ok()) else {
        return (StatusCode::BAD_REQUEST, "Bad request\n").into_response();
    };
    match state.service.subscription_edit(user_id, feed_id, &form.ac, form.t.as_deref(), &form.a, &form.r).await {
        Ok(()) => (StatusCode::OK, "OK\n").into_response(),
        Err(e) if e.to_string() == "forbidden" => (StatusCode::FORBIDDEN, "Forbidden\n").into_response(),
        Err(e) if e.to_string().contains("not found") => (StatusCode::NOT_FOUND, "Not found\n").into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "Bad request\n").into_response(),
    }
}

async fn tag_list(State(state): State<AppState>, request: Request) -> impl IntoResponse {
    let Some(user_id) = require_user(&request) else { return unauthorized(&request) };
    match state.service.tag_list(user_id).await {
        Ok(tags) => Json(json!({"tags": tags})).into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
struct EditTagForm {
    #[serde(default, rename = "i")]
    i: Vec<String>,
    #[serde(default, rename = "a")]
    a: Vec<String>,
    #[serde(default, rename = "r")]
    r: Vec<String>,
}

async fn edit_tag(State(state): State<AppState>, request: Request) -> impl IntoResponse {
    let Some(user_id) = require_user(&request) else { return unauthorized(&request) };
    let Ok(Form(form)) = Form::<EditTagForm>::from_request(request, &state).await else {
        return (StatusCode::BAD_REQUEST, "Bad request\n").into_response();
    };
    match state.service.edit_tag(user_id, &form.i, &form.a, &form.r).await {
        Ok(()) => (StatusCode::OK, "OK\n").into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "Bad request\n").into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct MarkAllReadForm {
    s: String,
    ts: Option<i64>,
}

async fn mark_all_as_read(State(state): State<AppState>, request: Request) -> impl IntoResponse {
    let Some(user_id) = require_user(&request) else { return unauthorized(&request) };
    let Ok(Form(form)) = Form::<MarkAllReadForm>::from_request(request, &state).await else {
        return (StatusCode::BAD_REQUEST, "Bad request\n").into_response();
    };
    match state.service.mark_all_as_read(user_id, &form.s, form.ts).await {
        Ok(()) => (StatusCode::OK, "OK\n").into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "Bad request\n").into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct UnreadCountQuery {
    all: Option<String>,
}

async fn unread_count(State(state): State<AppState>, Query(q): Query<UnreadCountQuery>, request: Request) -> impl IntoResponse {
    let Some(user_id) = require_user(&request) else { return unauthorized(&request) };
    let include_empty = q.all.as_deref() == Some("1");
    match state.service.unread_counts(user_id, include_empty).await {
        Ok(counts) => Json(json!({"max": 150, "unreadcounts": counts})).into_response(),
        Err(e) => internal_error(e),
    }
}

// --- Stream reads --------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StreamIdsQuery {
    s: Option<String>,
    n: Option<i64>,
    #[allow(dead_code)]
    ot: Option<i64>,
    #[allow(dead_code)]
    xt: Option<String>,
    #[allow(dead_code)]
    it: Option<String>,
    r: Option<String>,
    c: Option<i64>,
}

async fn stream_items_ids(State(state): State<AppState>, Query(q): Query<StreamIdsQuery>, request: Request) -> impl IntoResponse {
    let Some(user_id) = require_user(&request) else { return unauthorized(&request) };
    let oldest_first = q.r.as_deref() == Some("o");
    match state
        .service
        .stream_item_ids(user_id, q.s.as_deref().unwrap_or(""), q.n.unwrap_or(20), oldest_first, q.c)
        .await
    {
        Ok((ids, continuation)) => {
            let item_refs: Vec<_> = ids.into_iter().map(|id| json!({"id": id})).collect();
            let mut body = json!({"itemRefs": item_refs});
            if let Some(c) = continuation {
                body["continuation"] = json!(c.to_string());
            }
            Json(body).into_response()
        }
        Err(e) => internal_error(e),
    }
}

async fn stream_contents(State(state): State<AppState>, Query(q): Query<StreamIdsQuery>, request: Request) -> impl IntoResponse {
    render_stream_contents(state, q, request, None).await
}

async fn stream_contents_for_id(
    State(state): State<AppState>,
    axum::extract::Path(id): axum::extract::Path<String>,
    Query(q): Query<StreamIdsQuery>,
    request: Request,
) -> impl IntoResponse {
    render_stream_contents(state, q, request, Some(id)).await
}

async fn render_stream_contents(state: AppState, q: StreamIdsQuery, request: Request, path_id: Option<String>) -> Response {
    let Some(user_id) = require_user(&request) else { return unauthorized(&request) };
    let stream_id = path_id.or(q.s).unwrap_or_default();
    let oldest_first = q.r.as_deref() == Some("o");
    match state.service.stream_contents(user_id, &stream_id, q.n.unwrap_or(20), oldest_first, q.c).await {
        Ok((items, continuation)) => {
            let mut body = json!({
                "id": stream_id,
                "updated": chrono::Utc::now().timestamp(),
                "items": items,
            });
            if let Some(c) = continuation {
                body["continuation"] = json!(c.to_string());
            }
            Json(body).into_response()
        }
        Err(e) => internal_error(e),
    }
}

fn internal_error(e: anyhow::Error) -> Response {
    tracing::error!(error = %e, "greader transport error");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()}))).into_response()
}
