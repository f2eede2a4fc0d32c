//! Post domain models: feed entries with likes, comments and shares

use super::user::UserSummary;
use crate::error::{field_errors, AppError, FieldError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_LEN: usize = 30;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;

/// Post category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostCategory {
    Technical,
    Professional,
    #[serde(rename = "Industry News")]
    IndustryNews,
    #[default]
    General,
}

impl PostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostCategory::Technical => "Technical",
            PostCategory::Professional => "Professional",
            PostCategory::IndustryNews => "Industry News",
            PostCategory::General => "General",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Technical" => Some(PostCategory::Technical),
            "Professional" => Some(PostCategory::Professional),
            "Industry News" => Some(PostCategory::IndustryNews),
            "General" => Some(PostCategory::General),
            _ => None,
        }
    }
}

/// Post joined with its author summary, like set and share count
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub images: Vec<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Author
    pub author_name: String,
    pub author_avatar: String,
    pub author_job_title: String,
    pub author_company: String,

    // Engagement
    pub liked_by: Vec<Uuid>,
    pub shares_count: i64,
}

/// Comment joined with its commenter
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user_name: String,
    pub user_avatar: String,
}

/// Values for a new post after validation and image upload
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub content: String,
    pub category: PostCategory,
    pub tags: Vec<String>,
    pub images: Vec<String>,
}

/// Create post request
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 2000, message = "Content must be between 1-2000 characters"))]
    pub content: String,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Image URLs or `data:` URIs to upload
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreatePostRequest {
    /// Trim content and tags, keep the first ten tags, and resolve the category
    pub fn normalize_and_validate(&mut self) -> Result<PostCategory, AppError> {
        self.content = self.content.trim().to_string();
        self.tags = self
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .take(MAX_TAGS)
            .collect();
        self.images.retain(|i| !i.trim().is_empty());

        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e),
        };

        let category = match self.category.as_deref() {
            None => Some(PostCategory::default()),
            Some(c) => PostCategory::parse(c),
        };
        if category.is_none() {
            errors.push(FieldError::new("category", "Invalid category"));
        }

        if self.tags.iter().any(|t| t.chars().count() > MAX_TAG_LEN) {
            errors.push(FieldError::new(
                "tags",
                format!("Each tag must be at most {} characters", MAX_TAG_LEN),
            ));
        }

        match category {
            Some(category) if errors.is_empty() => Ok(category),
            _ => {
                errors.sort_by(|a, b| a.field.cmp(&b.field));
                Err(AppError::Validation(errors))
            }
        }
    }
}

/// Add comment request
#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 500, message = "Comment must be between 1-500 characters"))]
    pub content: String,
}

impl CommentRequest {
    pub fn normalize_and_validate(&mut self) -> Result<(), AppError> {
        self.content = self.content.trim().to_string();
        self.validate()?;
        Ok(())
    }
}

/// Feed query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub author: Option<String>,
}

impl ListPostsQuery {
    /// 1-based page number
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// `None` and `"all"` disable the category filter
    pub fn category_filter(&self) -> Result<Option<PostCategory>, AppError> {
        match self.category.as_deref() {
            None | Some("all") | Some("") => Ok(None),
            Some(c) => PostCategory::parse(c)
                .map(Some)
                .ok_or_else(|| AppError::field("category", "Invalid category")),
        }
    }

    pub fn author_filter(&self) -> Result<Option<Uuid>, AppError> {
        match self.author.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(a) => Uuid::parse_str(a)
                .map(Some)
                .map_err(|_| AppError::field("author", "Invalid author id")),
        }
    }
}

/// Comment as returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user: UserSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<CommentRow> for CommentResponse {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            user: UserSummary {
                id: row.user_id,
                name: row.user_name,
                avatar: row.user_avatar,
                job_title: None,
                company: None,
            },
            content: row.content,
            created_at: row.created_at,
        }
    }
}

/// Post as returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub author: UserSummary,
    pub content: String,
    pub images: Vec<String>,
    pub category: PostCategory,
    pub tags: Vec<String>,
    pub likes: Vec<Uuid>,
    pub likes_count: usize,
    pub comments: Vec<CommentResponse>,
    pub shares_count: i64,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostResponse {
    pub fn from_row(row: PostRow, comments: Vec<CommentRow>) -> Self {
        Self {
            id: row.id,
            author: UserSummary {
                id: row.author_id,
                name: row.author_name,
                avatar: row.author_avatar,
                job_title: Some(row.author_job_title),
                company: Some(row.author_company),
            },
            content: row.content,
            images: row.images,
            category: PostCategory::parse(&row.category).unwrap_or_default(),
            tags: row.tags,
            likes_count: row.liked_by.len(),
            likes: row.liked_by,
            comments: comments.into_iter().map(CommentResponse::from).collect(),
            shares_count: row.shares_count,
            is_public: row.is_public,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Paged feed response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub total_pages: i64,
    pub current_page: i64,
    pub total: i64,
}

impl PostListResponse {
    pub fn new(posts: Vec<PostResponse>, total: i64, page: i64, limit: i64) -> Self {
        Self {
            posts,
            total_pages: (total + limit - 1) / limit,
            current_page: page,
            total,
        }
    }
}
