use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::feed::FeedService;
use crate::app::follows::{CreatedFollow, FollowListEntry, FollowService};
use crate::app::pagination::{Page, PageRequest};
use crate::app::publications::{PublicationService, PublicationWithAuthor};
use crate::app::users::UserService;
use crate::domain::follow::Follow;
use crate::domain::publication::Publication;
use crate::domain::user::PublicUser;
use crate::http::{ApiError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

/// Pagination overrides accepted on every listing endpoint.
#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let status = if db { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub nick: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub user: PublicUser,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    const MIN_PASSWORD_LEN: usize = 8;
    const MAX_PASSWORD_LEN: usize = 128;

    let name = payload.name.unwrap_or_default();
    let nick = payload.nick.unwrap_or_default();
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    if name.trim().is_empty()
        || nick.trim().is_empty()
        || email.trim().is_empty()
        || password.is_empty()
    {
        return Err(ApiError::bad_request(
            "name, nick, email and password are required",
        ));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(
            "password must be at least 8 characters",
        ));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(ApiError::bad_request(
            "password must be at most 128 characters",
        ));
    }

    let service = AuthService::new(state.db.clone(), state.token_key, state.token_ttl_days);
    let user = service
        .register(name, payload.last_name, nick, email, password, payload.bio)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            status: "success",
            message: "user registered successfully",
            user: PublicUser::from(user),
        }),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct LoginUserSummary {
    pub id: Uuid,
    pub name: String,
    pub nick: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub user: LoginUserSummary,
    pub token: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("email and password are required"));
    }

    let service = AuthService::new(state.db.clone(), state.token_key, state.token_ttl_days);
    let (user, token) = service.login(&email, &password).await?;

    Ok(Json(LoginResponse {
        status: "success",
        message: "login successful",
        user: LoginUserSummary {
            id: user.id,
            name: user.name,
            nick: user.nick,
        },
        token,
    }))
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub user: PublicUser,
    pub following: Option<Follow>,
    pub follower: Option<Follow>,
}

/// A profile is always returned together with the relationship between the
/// caller and the profile owner, so clients can render the follow button
/// without a second round trip.
pub async fn profile(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = UserService::new(state.db.clone())
        .get_public(id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    let relationship = FollowService::new(state.db.clone())
        .pair_relationship(auth.user_id, id)
        .await;

    Ok(Json(ProfileResponse {
        status: "success",
        message: "user profile",
        user,
        following: relationship.following,
        follower: relationship.follower,
    }))
}

#[derive(Serialize)]
pub struct CountersResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub user_id: Uuid,
    pub following: i64,
    pub followers: i64,
    pub publications: i64,
}

pub async fn counters(
    auth: AuthUser,
    id: Option<Path<Uuid>>,
    State(state): State<AppState>,
) -> Result<Json<CountersResponse>, ApiError> {
    let user_id = id.map(|Path(id)| id).unwrap_or(auth.user_id);

    let follow_counts = FollowService::new(state.db.clone()).counts(user_id).await?;
    let publications = PublicationService::new(state.db.clone())
        .count_by_author(user_id)
        .await?;

    Ok(Json(CountersResponse {
        status: "success",
        message: "user counters",
        user_id,
        following: follow_counts.following,
        followers: follow_counts.followers,
        publications,
    }))
}

// ---------------------------------------------------------------------------
// Follow graph
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct FollowRequest {
    pub target_user_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct FollowCreatedResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub follow: CreatedFollow,
}

pub async fn follow_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<FollowRequest>,
) -> Result<(StatusCode, Json<FollowCreatedResponse>), ApiError> {
    let target_user_id = payload
        .target_user_id
        .ok_or_else(|| ApiError::bad_request("target_user_id is required"))?;

    let follow = FollowService::new(state.db.clone())
        .follow(auth.user_id, target_user_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(FollowCreatedResponse {
            status: "success",
            message: "user followed successfully",
            follow,
        }),
    ))
}

#[derive(Serialize)]
pub struct UnfollowResponse {
    pub status: &'static str,
    pub message: &'static str,
}

pub async fn unfollow_user(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<UnfollowResponse>, ApiError> {
    FollowService::new(state.db.clone())
        .unfollow(auth.user_id, id)
        .await?;

    Ok(Json(UnfollowResponse {
        status: "success",
        message: "user unfollowed successfully",
    }))
}

#[derive(Serialize)]
pub struct FollowListResponse {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(flatten)]
    pub page: Page<FollowListEntry>,
    /// Ids the caller follows / is followed by, regardless of whose list
    /// is being viewed. Clients use these to mark follow buttons.
    pub user_following: Vec<Uuid>,
    pub user_followers: Vec<Uuid>,
}

pub async fn list_following(
    auth: AuthUser,
    params: Option<Path<HashMap<String, String>>>,
    Query(query): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<FollowListResponse>, ApiError> {
    let params = params.map(|Path(params)| params).unwrap_or_default();
    let user_id = resolve_target_user(&params, auth.user_id)?;
    let page = PageRequest::from_raw(params.get("page").map(String::as_str), query.limit.as_deref());

    let service = FollowService::new(state.db.clone());
    let listing = service.list_following(user_id, page).await?;
    let sets = service.follow_id_sets(auth.user_id).await;

    Ok(Json(FollowListResponse {
        status: "success",
        message: "users you are following",
        page: listing,
        user_following: sets.following,
        user_followers: sets.followers,
    }))
}

pub async fn list_followers(
    auth: AuthUser,
    params: Option<Path<HashMap<String, String>>>,
    Query(query): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<FollowListResponse>, ApiError> {
    let params = params.map(|Path(params)| params).unwrap_or_default();
    let user_id = resolve_target_user(&params, auth.user_id)?;
    let page = PageRequest::from_raw(params.get("page").map(String::as_str), query.limit.as_deref());

    let service = FollowService::new(state.db.clone());
    let listing = service.list_followers(user_id, page).await?;
    let sets = service.follow_id_sets(auth.user_id).await;

    Ok(Json(FollowListResponse {
        status: "success",
        message: "users following you",
        page: listing,
        user_following: sets.following,
        user_followers: sets.followers,
    }))
}

/// Optional `:id` segment: an explicit target overrides the caller's own id.
fn resolve_target_user(
    params: &HashMap<String, String>,
    fallback: Uuid,
) -> Result<Uuid, ApiError> {
    match params.get("id") {
        Some(raw) => Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("invalid user id")),
        None => Ok(fallback),
    }
}

// ---------------------------------------------------------------------------
// Publications
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PublicationCreateRequest {
    pub text: Option<String>,
    pub file: Option<String>,
}

#[derive(Serialize)]
pub struct PublicationCreatedResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub publication: Publication,
}

pub async fn create_publication(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PublicationCreateRequest>,
) -> Result<(StatusCode, Json<PublicationCreatedResponse>), ApiError> {
    let text = payload
        .text
        .ok_or_else(|| ApiError::bad_request("you must send the text of the publication"))?;

    let publication = PublicationService::new(state.db.clone())
        .create(auth.user_id, text, payload.file)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PublicationCreatedResponse {
            status: "success",
            message: "publication created successfully",
            publication,
        }),
    ))
}

#[derive(Serialize)]
pub struct PublicationResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub publication: PublicationWithAuthor,
}

pub async fn show_publication(
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<PublicationResponse>, ApiError> {
    let publication = PublicationService::new(state.db.clone())
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("publication not found"))?;

    Ok(Json(PublicationResponse {
        status: "success",
        message: "publication found",
        publication,
    }))
}

#[derive(Serialize)]
pub struct PublicationDeletedResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub publication: Publication,
}

pub async fn delete_publication(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<PublicationDeletedResponse>, ApiError> {
    let publication = PublicationService::new(state.db.clone())
        .delete_own(id, auth.user_id)
        .await?
        .ok_or_else(|| {
            ApiError::not_found("publication not found or you are not allowed to delete it")
        })?;

    Ok(Json(PublicationDeletedResponse {
        status: "success",
        message: "publication deleted successfully",
        publication,
    }))
}

#[derive(Serialize)]
pub struct PublicationListResponse {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(flatten)]
    pub page: Page<PublicationWithAuthor>,
}

pub async fn list_user_publications(
    _auth: AuthUser,
    Path(params): Path<HashMap<String, String>>,
    Query(query): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<PublicationListResponse>, ApiError> {
    let user_id = params
        .get("id")
        .ok_or_else(|| ApiError::bad_request("user id is required"))
        .and_then(|raw| {
            Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("invalid user id"))
        })?;
    let page = PageRequest::from_raw(params.get("page").map(String::as_str), query.limit.as_deref());

    let publications = PublicationService::new(state.db.clone())
        .list_by_author(user_id, page)
        .await?;

    Ok(Json(PublicationListResponse {
        status: "success",
        message: "user publications",
        page: publications,
    }))
}

#[derive(Serialize)]
pub struct FeedResponse {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(flatten)]
    pub page: Page<PublicationWithAuthor>,
}

pub async fn feed(
    auth: AuthUser,
    page: Option<Path<String>>,
    Query(query): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<FeedResponse>, ApiError> {
    let page_raw = page.map(|Path(page)| page);
    let page = PageRequest::from_raw(page_raw.as_deref(), query.limit.as_deref());

    let publications = FeedService::new(state.db.clone())
        .build_feed(auth.user_id, page)
        .await?;

    Ok(Json(FeedResponse {
        status: "success",
        message: "publications feed",
        page: publications,
    }))
}
