//! 帖子的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    handlers::{ApiJson, ApiPath, ApiQuery},
    middleware::AppState,
    models::post::*,
    repository::PostRepository,
    services::MediaFolder,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

/// 分页列出公开帖子
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListPostsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let category = query.category_filter()?;
    let author = query.author_filter()?;
    let (page, limit) = (query.page(), query.limit());

    let repo = PostRepository::new(state.db.clone());
    let rows = repo
        .list(category, author, limit, query.offset())
        .await?;
    let total = repo.count(category, author).await?;

    // 一次查出本页所有评论，再按帖子分组
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut comments: HashMap<Uuid, Vec<CommentRow>> = HashMap::new();
    for comment in repo.comments_for(&ids).await? {
        comments.entry(comment.post_id).or_default().push(comment);
    }

    let posts = rows
        .into_iter()
        .map(|row| {
            let post_comments = comments.remove(&row.id).unwrap_or_default();
            PostResponse::from_row(row, post_comments)
        })
        .collect();

    Ok(Json(PostListResponse::new(posts, total, page, limit)))
}

/// 发布帖子
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ApiJson(mut req): ApiJson<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let category = req.normalize_and_validate()?;

    // 上传失败的图片直接跳过
    let mut images = Vec::with_capacity(req.images.len());
    for image in &req.images {
        if let Some(url) = state
            .media_service
            .resolve_image(image, MediaFolder::Posts)
            .await
        {
            images.push(url);
        }
    }

    let new_post = NewPost {
        author_id: auth_context.user_id,
        content: req.content,
        category,
        tags: req.tags,
        images,
    };

    let repo = PostRepository::new(state.db.clone());
    let id = repo.create(&new_post).await?;
    let row = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::internal_error("created post not found"))?;

    tracing::info!(post_id = %id, author_id = %auth_context.user_id, "Post created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Post created successfully",
            "post": PostResponse::from_row(row, Vec::new())
        })),
    ))
}

/// 点赞 / 取消点赞
pub async fn like_post(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PostRepository::new(state.db.clone());
    if !repo.exists(&id).await? {
        return Err(AppError::not_found("Post"));
    }

    let (liked, likes_count) = repo.toggle_like(&id, &auth_context.user_id).await?;

    Ok(Json(json!({
        "message": "Post updated",
        "likesCount": likes_count,
        "liked": liked
    })))
}

/// 评论
pub async fn comment_post(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(mut req): ApiJson<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.normalize_and_validate()?;

    let repo = PostRepository::new(state.db.clone());
    if !repo.exists(&id).await? {
        return Err(AppError::not_found("Post"));
    }

    repo.add_comment(&id, &auth_context.user_id, &req.content).await?;

    let comments: Vec<CommentResponse> = repo
        .comments_for(&[id])
        .await?
        .into_iter()
        .map(CommentResponse::from)
        .collect();

    Ok(Json(json!({
        "message": "Comment added successfully",
        "comments": comments
    })))
}

/// 分享
pub async fn share_post(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PostRepository::new(state.db.clone());
    if !repo.exists(&id).await? {
        return Err(AppError::not_found("Post"));
    }

    let shares_count = repo.share(&id, &auth_context.user_id).await?;

    Ok(Json(json!({
        "message": "Post shared successfully",
        "sharesCount": shares_count
    })))
}
