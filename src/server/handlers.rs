//! HTTP request handlers.

use crate::auth::validate_username;
use crate::catalog::{Catalog, Series};
use crate::db::{Comment, LeftOff, RecentItem, RecentKind, User};
use crate::error::{AppError, Result};
use crate::server::AppState;
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sid";

/// Successful mutation: `{"ok": true, ...body}`.
#[derive(Debug, Serialize)]
pub struct Ack<T: Serialize> {
    /// Always true.
    pub ok: bool,
    /// Response payload.
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Ack<T> {
    fn new(body: T) -> Json<Self> {
        Json(Self { ok: true, body })
    }
}

/// Empty payload.
#[derive(Debug, Serialize)]
pub struct Empty {}

// ============================================================================
// WEB PAGES
// ============================================================================

async fn serve_page(state: &AppState, name: &str) -> Result<Html<String>> {
    let path = state.page_path(name);
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            tracing::error!(page = %path.display(), error = %e, "Failed to load page");
            Err(AppError::Failed("Error loading page".to_string()))
        }
    }
}

/// Series list (home page).
pub async fn page_manga(State(state): State<AppState>) -> Result<Html<String>> {
    serve_page(&state, "manga.html").await
}

/// Chapter list of a series.
pub async fn page_chapters(State(state): State<AppState>) -> Result<Html<String>> {
    serve_page(&state, "chapters.html").await
}

/// Reader.
pub async fn page_reader(State(state): State<AppState>) -> Result<Html<String>> {
    serve_page(&state, "reader.html").await
}

/// Login and registration.
pub async fn page_auth(State(state): State<AppState>) -> Result<Html<String>> {
    serve_page(&state, "auth.html").await
}

/// Public profile.
pub async fn page_profile(State(state): State<AppState>) -> Result<Html<String>> {
    serve_page(&state, "profile.html").await
}

/// Account settings, for logged-in users only.
pub async fn page_account(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    if current_user(&state, &headers).await?.is_none() {
        return Ok(Redirect::to("/auth#login").into_response());
    }
    Ok(serve_page(&state, "account.html").await?.into_response())
}

/// Old login URL.
pub async fn redirect_login() -> Redirect {
    Redirect::to("/auth#login")
}

/// Old registration URL.
pub async fn redirect_register() -> Redirect {
    Redirect::to("/auth#register")
}

// ============================================================================
// CATALOG
// ============================================================================

/// Full catalog, rebuilt from disk on every request.
pub async fn manga_catalog(State(state): State<AppState>) -> Result<Json<Catalog>> {
    state.catalog().await.map(Json).map_err(|e| {
        tracing::error!(error = %e, "Error generating catalog");
        AppError::Failed("Failed to load manga data".to_string())
    })
}

/// One series with its chapters.
pub async fn manga_series(
    State(state): State<AppState>,
    Path(series_id): Path<String>,
) -> Result<Json<Series>> {
    let series = state.series(&series_id).await.map_err(|e| {
        tracing::error!(series = %series_id, error = %e, "Error generating series");
        AppError::Failed("Failed to load manga data".to_string())
    })?;

    series
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Series not found".to_string()))
}

// ============================================================================
// AUTH API
// ============================================================================

/// Credentials for login and registration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

/// User returned after login or registration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    /// User ID.
    pub id: String,
    /// Username.
    pub username: String,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

impl From<&User> for AuthUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            username: u.username.clone(),
            created_at: u.created_at,
        }
    }
}

/// `{ "user": ... }`.
#[derive(Debug, Serialize)]
pub struct UserBody<T: Serialize> {
    /// The user.
    pub user: T,
}

/// Register and log in.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> Result<impl IntoResponse> {
    let (user, token) = state.auth.register(&req.username, &req.password)?;

    Ok((
        [(header::SET_COOKIE, session_cookie(&state, &token))],
        Ack::new(UserBody {
            user: AuthUser::from(&user),
        }),
    ))
}

/// Log in.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> Result<impl IntoResponse> {
    let (user, token) = state.auth.login(&req.username, &req.password)?;
    tracing::debug!(user = %user.username, "Logged in");

    Ok((
        [(header::SET_COOKIE, session_cookie(&state, &token))],
        Ack::new(UserBody {
            user: AuthUser::from(&user),
        }),
    ))
}

/// Log out.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse> {
    if let Some(token) = extract_token(&headers) {
        state.auth.logout(&token)?;
    }

    Ok((
        [(header::SET_COOKIE, clear_cookie(&state))],
        Ack::new(Empty {}),
    ))
}

/// Account deletion request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteAccountRequest {
    /// Current password.
    pub password: String,
    /// Must be `DELETE`.
    pub confirm_text: String,
}

/// Delete the logged-in account.
pub async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DeleteAccountRequest>,
) -> Result<impl IntoResponse> {
    let user = require_user(&state, &headers).await?;
    state
        .auth
        .delete_account(&user.id, &req.password, &req.confirm_text)?;

    Ok((
        [(header::SET_COOKIE, clear_cookie(&state))],
        Ack::new(Empty {}),
    ))
}

// ============================================================================
// PROFILE API
// ============================================================================

/// The logged-in user's own view of their account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// User ID.
    pub id: String,
    /// Username.
    pub username: String,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
    /// Avatar URL.
    pub avatar_url: String,
    /// Bio.
    pub bio: String,
}

impl From<User> for UserSummary {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            created_at: u.created_at,
            avatar_url: u.avatar_url,
            bio: u.bio,
        }
    }
}

/// Current user, or `null`.
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserBody<Option<UserSummary>>>> {
    let user = current_user(&state, &headers).await?;
    Ok(Json(UserBody {
        user: user.map(UserSummary::from),
    }))
}

/// Profile update request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileRequest {
    /// New username, empty to keep.
    pub username: String,
    /// New bio.
    pub bio: String,
}

/// Update username and bio.
pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<Ack<UserBody<UserSummary>>>> {
    let user = require_user(&state, &headers).await?;

    let username = req.username.trim();
    let username = if username.is_empty() {
        None
    } else {
        validate_username(username)?;
        Some(username)
    };

    let bio = truncate_chars(req.bio.trim(), state.config.limits.bio_max_chars);

    let updated = state
        .db
        .update_profile(&user.id, username, &bio)?
        .ok_or_else(AppError::not_logged_in)?;

    Ok(Ack::new(UserBody {
        user: UserSummary::from(updated),
    }))
}

/// Avatar upload result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarBody {
    /// New avatar URL.
    pub avatar_url: String,
}

/// Upload an avatar (multipart field `avatar`).
pub async fn upload_avatar(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Ack<AvatarBody>>> {
    let user = require_user(&state, &headers).await?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("avatar") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        upload = Some((content_type, data));
        break;
    }

    let (content_type, data) =
        upload.ok_or_else(|| AppError::BadRequest("No file uploaded.".to_string()))?;

    let max = state.config.limits.avatar_max_bytes;
    if data.len() > max {
        return Err(AppError::BadRequest(format!(
            "Avatar must be at most {} KB.",
            max / 1024
        )));
    }

    let ext = avatar_extension(&content_type, &data)?;

    let dir = state.config.storage.avatars_dir();
    tokio::fs::create_dir_all(&dir).await?;

    // Drop avatars saved under another extension
    for other in AVATAR_EXTENSIONS.iter().filter(|e| **e != ext) {
        let stale = dir.join(format!("{}{}", user.id, other));
        if let Err(e) = tokio::fs::remove_file(&stale).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %stale.display(), error = %e, "Failed to remove old avatar");
        }
    }

    tokio::fs::write(dir.join(format!("{}{}", user.id, ext)), &data).await?;

    let avatar_url = format!(
        "/uploads/avatars/{}{}?t={}",
        user.id,
        ext,
        Utc::now().timestamp_millis()
    );

    let url = avatar_url.clone();
    state
        .db
        .update_user(&user.id, move |u| {
            u.avatar_url = url;
            Ok(())
        })?
        .ok_or_else(AppError::not_logged_in)?;

    tracing::info!(user = %user.username, bytes = data.len(), "Avatar updated");
    Ok(Ack::new(AvatarBody { avatar_url }))
}

/// Extensions avatars are stored under.
const AVATAR_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".webp", ".gif"];

/// Check an uploaded avatar and pick its file extension.
///
/// Both the declared content type and the sniffed bytes must be PNG, JPEG,
/// WebP or GIF. The extension follows the sniffed format.
pub(crate) fn avatar_extension(content_type: &str, data: &[u8]) -> Result<&'static str> {
    let rejected = || AppError::BadRequest("Only image files are allowed.".to_string());

    let declared = content_type.to_ascii_lowercase();
    if !matches!(
        declared.as_str(),
        "image/png" | "image/jpeg" | "image/jpg" | "image/webp" | "image/gif"
    ) {
        return Err(rejected());
    }

    match image::guess_format(data).map_err(|_| rejected())? {
        image::ImageFormat::Png => Ok(".png"),
        image::ImageFormat::Jpeg => Ok(".jpg"),
        image::ImageFormat::WebP => Ok(".webp"),
        image::ImageFormat::Gif => Ok(".gif"),
        _ => Err(rejected()),
    }
}

/// Public profile.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    /// User ID.
    pub id: String,
    /// Username.
    pub username: String,
    /// Avatar URL.
    pub avatar_url: String,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
    /// Bio.
    pub bio: String,
    /// Favorite series ids.
    pub favorites: Vec<String>,
}

/// Public profile of any user.
pub async fn user_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserBody<PublicProfile>>> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::BadRequest("id is required".to_string()));
    }

    let user = state
        .db
        .get_user_by_id(id)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserBody {
        user: PublicProfile {
            id: user.id,
            username: user.username,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
            bio: user.bio,
            favorites: user.favorites,
        },
    }))
}

/// Batch lookup request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BatchRequest {
    /// User IDs; anything but an array reads as empty.
    pub ids: Value,
}

/// Minimal user card.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCard {
    /// User ID.
    pub id: String,
    /// Username.
    pub username: String,
    /// Avatar URL.
    pub avatar_url: String,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

/// Batch lookup response.
#[derive(Debug, Serialize)]
pub struct UsersBody {
    /// Found users, in request order.
    pub users: Vec<UserCard>,
}

/// Look up several users at once (comment authors).
pub async fn users_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<UsersBody>> {
    let ids: Vec<String> = match req.ids {
        Value::Array(items) => items
            .iter()
            .filter_map(value_to_string)
            .filter(|s| !s.is_empty())
            .take(state.config.limits.batch_max)
            .collect(),
        _ => Vec::new(),
    };

    let users = state
        .db
        .get_users_by_ids(&ids)?
        .into_iter()
        .map(|u| UserCard {
            id: u.id,
            username: u.username,
            avatar_url: u.avatar_url,
            created_at: u.created_at,
        })
        .collect();

    Ok(Json(UsersBody { users }))
}

// ============================================================================
// FAVORITES API
// ============================================================================

/// Favorites list.
#[derive(Debug, Serialize)]
pub struct FavoritesBody {
    /// Series ids.
    pub favorites: Vec<String>,
}

/// Favorite request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FavoriteRequest {
    /// Series id.
    pub series_id: String,
}

/// List favorites.
pub async fn get_favorites(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<FavoritesBody>> {
    let user = require_user(&state, &headers).await?;
    Ok(Json(FavoritesBody {
        favorites: user.favorites,
    }))
}

/// Add a favorite.
pub async fn add_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<FavoriteRequest>,
) -> Result<Json<Ack<FavoritesBody>>> {
    let user = require_user(&state, &headers).await?;
    let series_id = required(&req.series_id, "seriesId is required")?;

    let favorites = state
        .db
        .update_user(&user.id, |u| {
            u.add_favorite(series_id);
            Ok(u.favorites.clone())
        })?
        .ok_or_else(AppError::not_logged_in)?;

    Ok(Ack::new(FavoritesBody { favorites }))
}

/// Remove a favorite.
pub async fn remove_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(series_id): Path<String>,
) -> Result<Json<Ack<FavoritesBody>>> {
    let user = require_user(&state, &headers).await?;
    let series_id = required(&series_id, "seriesId is required")?;

    let favorites = state
        .db
        .update_user(&user.id, |u| {
            u.remove_favorite(series_id);
            Ok(u.favorites.clone())
        })?
        .ok_or_else(AppError::not_logged_in)?;

    Ok(Ack::new(FavoritesBody { favorites }))
}

// ============================================================================
// RECENTLY VIEWED API
// ============================================================================

/// Recently viewed list.
#[derive(Debug, Serialize)]
pub struct RecentBody {
    /// Newest first.
    pub recent: Vec<RecentItem>,
}

/// Track request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecentRequest {
    /// `series` or `chapter`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Series id.
    pub series_id: String,
    /// Chapter id, for chapter entries.
    pub chapter_id: String,
}

/// List recently viewed.
pub async fn get_recent(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RecentBody>> {
    let user = require_user(&state, &headers).await?;
    Ok(Json(RecentBody {
        recent: user.recent_viewed,
    }))
}

/// Track a view.
pub async fn track_recent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RecentRequest>,
) -> Result<Json<Ack<RecentBody>>> {
    let user = require_user(&state, &headers).await?;

    let kind = req.kind.trim();
    let series_id = req.series_id.trim();
    let chapter_id = req.chapter_id.trim();

    if kind.is_empty() || series_id.is_empty() {
        return Err(AppError::BadRequest(
            "type and seriesId are required".to_string(),
        ));
    }
    let kind =
        RecentKind::parse(kind).ok_or_else(|| AppError::BadRequest("Invalid type".to_string()))?;
    if kind == RecentKind::Chapter && chapter_id.is_empty() {
        return Err(AppError::BadRequest(
            "chapterId is required for chapter type".to_string(),
        ));
    }

    let item = RecentItem::new(kind, series_id, chapter_id);
    let max = state.config.limits.recent_max;

    let recent = state
        .db
        .update_user(&user.id, move |u| {
            u.push_recent(item, max);
            Ok(u.recent_viewed.clone())
        })?
        .ok_or_else(AppError::not_logged_in)?;

    Ok(Ack::new(RecentBody { recent }))
}

/// Clear recently viewed.
pub async fn clear_recent(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Ack<RecentBody>>> {
    let user = require_user(&state, &headers).await?;

    state
        .db
        .update_user(&user.id, |u| {
            u.recent_viewed.clear();
            Ok(())
        })?
        .ok_or_else(AppError::not_logged_in)?;

    Ok(Ack::new(RecentBody { recent: Vec::new() }))
}

// ============================================================================
// LEFT OFF API
// ============================================================================

/// Reading position.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeftOffBody {
    /// Position, or `null`.
    pub left_off: Option<LeftOff>,
}

/// Save position request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeftOffRequest {
    /// Series id.
    pub series_id: String,
    /// Chapter id.
    pub chapter_id: String,
    /// Zero-based page index, number or numeric string.
    pub page_index: Value,
    /// Page count, number or numeric string.
    pub page_count: Value,
}

/// Get reading position.
pub async fn get_left_off(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LeftOffBody>> {
    let user = require_user(&state, &headers).await?;
    Ok(Json(LeftOffBody {
        left_off: user.left_off,
    }))
}

/// Save reading position.
pub async fn save_left_off(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LeftOffRequest>,
) -> Result<Json<Ack<LeftOffBody>>> {
    let user = require_user(&state, &headers).await?;

    let series_id = req.series_id.trim();
    let chapter_id = req.chapter_id.trim();
    if series_id.is_empty() || chapter_id.is_empty() {
        return Err(AppError::BadRequest(
            "seriesId and chapterId are required".to_string(),
        ));
    }

    let page_index = non_negative(&req.page_index)
        .ok_or_else(|| AppError::BadRequest("pageIndex must be >= 0".to_string()))?;
    let page_count = non_negative(&req.page_count)
        .ok_or_else(|| AppError::BadRequest("pageCount must be >= 0".to_string()))?;

    let left_off = LeftOff {
        series_id: series_id.to_string(),
        chapter_id: chapter_id.to_string(),
        page_index,
        page_count,
        at: Utc::now(),
    };

    let saved = left_off.clone();
    state
        .db
        .update_user(&user.id, move |u| {
            u.left_off = Some(saved);
            Ok(())
        })?
        .ok_or_else(AppError::not_logged_in)?;

    Ok(Ack::new(LeftOffBody {
        left_off: Some(left_off),
    }))
}

/// Clear reading position.
pub async fn clear_left_off(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Ack<LeftOffBody>>> {
    let user = require_user(&state, &headers).await?;

    state
        .db
        .update_user(&user.id, |u| {
            u.left_off = None;
            Ok(())
        })?
        .ok_or_else(AppError::not_logged_in)?;

    Ok(Ack::new(LeftOffBody { left_off: None }))
}

// ============================================================================
// COMMENTS API
// ============================================================================

/// Chapter selector.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChapterQuery {
    /// Series id.
    pub series_id: String,
    /// Chapter id.
    pub chapter_id: String,
}

/// Comment list.
#[derive(Debug, Serialize)]
pub struct CommentsBody {
    /// Oldest first.
    pub comments: Vec<Comment>,
}

/// Single comment.
#[derive(Debug, Serialize)]
pub struct CommentBody {
    /// The comment.
    pub comment: Comment,
}

/// New comment request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommentRequest {
    /// Series id.
    pub series_id: String,
    /// Chapter id.
    pub chapter_id: String,
    /// Comment text.
    pub text: String,
}

/// Comments on a chapter.
pub async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<ChapterQuery>,
) -> Result<Json<CommentsBody>> {
    let (series_id, chapter_id) = chapter_ids(&query.series_id, &query.chapter_id)?;

    let comments =
        state
            .db
            .list_comments(series_id, chapter_id, state.config.limits.comments_page)?;
    Ok(Json(CommentsBody { comments }))
}

/// Post a comment.
pub async fn add_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CommentRequest>,
) -> Result<Json<Ack<CommentBody>>> {
    let user = require_user(&state, &headers).await?;
    let (series_id, chapter_id) = chapter_ids(&req.series_id, &req.chapter_id)?;

    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("Comment cannot be empty".to_string()));
    }
    let max = state.config.limits.comment_max_chars;
    // UTF-16 code units
    if text.encode_utf16().count() > max {
        return Err(AppError::BadRequest(format!(
            "Comment is too long (max {} chars)",
            max
        )));
    }

    let comment = Comment {
        id: uuid::Uuid::new_v4().to_string(),
        series_id: series_id.to_string(),
        chapter_id: chapter_id.to_string(),
        user_id: user.id,
        username: user.username,
        text: text.to_string(),
        created_at: Utc::now(),
    };

    state.db.add_comment(&comment)?;
    Ok(Ack::new(CommentBody { comment }))
}

/// Delete one of your own comments.
pub async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Ack<Empty>>> {
    let user = require_user(&state, &headers).await?;
    let id = required(&id, "id is required")?;

    state.db.delete_comment(id, &user.id)?;
    Ok(Ack::new(Empty {}))
}

// ============================================================================
// HELPERS
// ============================================================================

/// Extract the session token from the `sid` cookie or a Bearer header.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .find(|token| !token.is_empty())
        .map(|s| s.to_string());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    })
}

/// Logged-in user, if any.
async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>> {
    match extract_token(headers) {
        Some(token) => state.auth.validate_token(&token),
        None => Ok(None),
    }
}

/// Logged-in user, or 401.
async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<User> {
    current_user(state, headers)
        .await?
        .ok_or_else(AppError::not_logged_in)
}

fn session_cookie(state: &AppState, token: &str) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        state.auth.session_seconds()
    );
    if state.config.auth.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_cookie(state: &AppState) -> String {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE
    );
    if state.config.auth.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Trimmed, non-empty field.
fn required<'a>(value: &'a str, message: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(message.to_string()));
    }
    Ok(value)
}

fn chapter_ids<'a>(series_id: &'a str, chapter_id: &'a str) -> Result<(&'a str, &'a str)> {
    let (series_id, chapter_id) = (series_id.trim(), chapter_id.trim());
    if series_id.is_empty() || chapter_id.is_empty() {
        return Err(AppError::BadRequest(
            "seriesId and chapterId are required".to_string(),
        ));
    }
    Ok((series_id, chapter_id))
}

/// Non-negative number given as a JSON number or numeric string, kept as
/// given. A blank string counts as 0.
fn non_negative(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => (n.as_f64()? >= 0.0).then(|| n.clone()),
        Value::String(s) => {
            let s = s.trim();
            let n = if s.is_empty() { 0.0 } else { s.parse::<f64>().ok()? };
            if !n.is_finite() || n < 0.0 {
                return None;
            }
            if n.fract() == 0.0 && n <= MAX_SAFE_INTEGER {
                Some(Number::from(n as u64))
            } else {
                Number::from_f64(n)
            }
        }
        _ => None,
    }
}

/// Largest integer an f64 holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
