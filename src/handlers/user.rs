//! 用户资料的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    handlers::{ApiJson, ApiPath},
    middleware::AppState,
    models::user::*,
    repository::UserRepository,
    services::MediaFolder,
};
use axum::{
    extract::State,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// 获取当前用户资料
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let repo = UserRepository::new(state.db.clone());
    let user = repo
        .find_by_id(&auth_context.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(UserResponse::from(user)))
}

/// 更新当前用户资料
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ApiJson(mut req): ApiJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.normalize_and_validate()?;

    // 头像为 data URI 时先上传，失败则本次不修改头像
    if let Some(avatar) = req.avatar.take() {
        req.avatar = state
            .media_service
            .resolve_image(&avatar, MediaFolder::Avatars)
            .await;
    }

    let repo = UserRepository::new(state.db.clone());
    let user = repo
        .update_profile(&auth_context.user_id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": UserResponse::from(user)
    })))
}

/// 获取指定用户的公开资料
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = UserRepository::new(state.db.clone());
    let user = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(UserResponse::from(user)))
}

/// 搜索用户
pub async fn search_users(
    State(state): State<Arc<AppState>>,
    ApiPath(query): ApiPath<String>,
) -> Result<impl IntoResponse, AppError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Json(Vec::<UserResponse>::new()));
    }

    let repo = UserRepository::new(state.db.clone());
    let users: Vec<UserResponse> = repo
        .search(query)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(users))
}
