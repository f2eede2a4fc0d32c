//! User repository (数据库访问层)

use crate::{db::is_unique_violation, error::AppError, models::user::*};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

/// 搜索结果上限
pub const SEARCH_LIMIT: i64 = 20;

pub struct UserRepository {
    db: PgPool,
}

impl UserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 根据邮箱查找用户（调用方需先规范化邮箱）
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// 根据 ID 查找用户
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// 创建用户，邮箱重复时返回 Conflict
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        avatar: &str,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, avatar)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(avatar)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("User already exists with this email".to_string())
            } else {
                AppError::Database(e)
            }
        })
    }

    /// 部分更新资料，未提供的字段保持不变
    pub async fn update_profile(
        &self,
        id: &Uuid,
        req: &UpdateProfileRequest,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET
                name = COALESCE($2, name),
                bio = COALESCE($3, bio),
                job_title = COALESCE($4, job_title),
                company = COALESCE($5, company),
                location = COALESCE($6, location),
                skills = COALESCE($7, skills),
                avatar = COALESCE($8, avatar),
                achievements = COALESCE($9, achievements),
                projects = COALESCE($10, projects),
                social_links = COALESCE($11, social_links),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.bio)
        .bind(&req.job_title)
        .bind(&req.company)
        .bind(&req.location)
        .bind(&req.skills)
        .bind(&req.avatar)
        .bind(req.achievements.clone().map(Json))
        .bind(req.projects.clone().map(Json))
        .bind(req.social_links.clone().map(Json))
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// 按姓名、职位、公司、技能做不区分大小写的子串搜索
    pub async fn search(&self, query: &str) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE name ILIKE $1 ESCAPE '\'
               OR job_title ILIKE $1 ESCAPE '\'
               OR company ILIKE $1 ESCAPE '\'
               OR EXISTS (SELECT 1 FROM unnest(skills) AS s WHERE s ILIKE $1 ESCAPE '\')
            ORDER BY name
            LIMIT $2
            "#,
        )
        .bind(like_pattern(query))
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }
}

/// 转义 LIKE 元字符，按字面子串匹配
pub fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
