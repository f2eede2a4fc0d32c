//! Post repository (数据库访问层)

use crate::{
    error::AppError,
    models::post::{CommentRow, NewPost, PostCategory, PostRow},
};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

/// 帖子 + 作者摘要 + 点赞列表 + 分享数
const POST_SELECT: &str = r#"
    SELECT
        p.id, p.author_id, p.content, p.images, p.category, p.tags, p.is_public,
        p.created_at, p.updated_at,
        u.name AS author_name,
        u.avatar AS author_avatar,
        u.job_title AS author_job_title,
        u.company AS author_company,
        COALESCE(
            (SELECT array_agg(l.user_id ORDER BY l.created_at) FROM post_likes l WHERE l.post_id = p.id),
            '{}'::uuid[]
        ) AS liked_by,
        (SELECT COUNT(*) FROM post_shares s WHERE s.post_id = p.id) AS shares_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

pub struct PostRepository {
    db: PgPool,
}

impl PostRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 创建帖子
    pub async fn create(&self, post: &NewPost) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, content, images, category, tags)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(post.author_id)
        .bind(&post.content)
        .bind(&post.images)
        .bind(post.category.as_str())
        .bind(&post.tags)
        .execute(&self.db)
        .await?;

        Ok(id)
    }

    /// 根据 ID 查找帖子
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<PostRow>, AppError> {
        let sql = format!("{} WHERE p.id = $1", POST_SELECT);
        let post = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(post)
    }

    /// 分页查询公开帖子，按时间倒序
    pub async fn list(
        &self,
        category: Option<PostCategory>,
        author: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostRow>, AppError> {
        let sql = format!(
            r#"{}
            WHERE p.is_public
              AND ($1::text IS NULL OR p.category = $1)
              AND ($2::uuid IS NULL OR p.author_id = $2)
            ORDER BY p.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            POST_SELECT
        );

        let posts = sqlx::query_as::<_, PostRow>(&sql)
            .bind(category.map(|c| c.as_str()))
            .bind(author)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await?;

        Ok(posts)
    }

    /// 统计符合条件的公开帖子数
    pub async fn count(
        &self,
        category: Option<PostCategory>,
        author: Option<Uuid>,
    ) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM posts p
            WHERE p.is_public
              AND ($1::text IS NULL OR p.category = $1)
              AND ($2::uuid IS NULL OR p.author_id = $2)
            "#,
        )
        .bind(category.map(|c| c.as_str()))
        .bind(author)
        .fetch_one(&self.db)
        .await?;

        Ok(total)
    }

    /// 帖子是否存在
    pub async fn exists(&self, id: &Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.db)
            .await?;

        Ok(exists)
    }

    /// 切换点赞状态，返回 (是否已点赞, 点赞总数)
    pub async fn toggle_like(&self, post_id: &Uuid, user_id: &Uuid) -> Result<(bool, i64), AppError> {
        let mut tx = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::Database(e)
        })?;

        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let liked = removed == 0;
        if liked {
            sqlx::query(
                "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit like toggle");
            AppError::Database(e)
        })?;

        Ok((liked, count))
    }

    /// 追加评论
    pub async fn add_comment(
        &self,
        post_id: &Uuid,
        user_id: &Uuid,
        content: &str,
    ) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO post_comments (id, post_id, user_id, content) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(post_id)
        .bind(user_id)
        .bind(content)
        .execute(&self.db)
        .await?;

        Ok(id)
    }

    /// 批量获取多个帖子的评论（按时间正序）
    pub async fn comments_for(&self, post_ids: &[Uuid]) -> Result<Vec<CommentRow>, AppError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let comments = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT
                c.id, c.post_id, c.user_id, c.content, c.created_at,
                u.name AS user_name,
                u.avatar AS user_avatar
            FROM post_comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.post_id = ANY($1)
            ORDER BY c.created_at
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(comments)
    }

    /// 记录分享（每个用户只计一次），返回分享总数
    pub async fn share(&self, post_id: &Uuid, user_id: &Uuid) -> Result<i64, AppError> {
        sqlx::query(
            "INSERT INTO post_shares (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_shares WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }
}
