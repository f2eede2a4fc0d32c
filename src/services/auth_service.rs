//! 认证服务：注册、登录

use crate::{
    auth::{jwt::JwtService, password::PasswordHasher},
    config::AppConfig,
    error::AppError,
    models::user::*,
    repository::user_repo::UserRepository,
    services::media_service::{MediaFolder, MediaService},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

/// 未知邮箱登录时参与比对的占位口令
const DUMMY_PASSWORD: &str = "gesture-talk-dummy-password";

pub struct AuthService {
    db: PgPool,
    jwt_service: Arc<JwtService>,
    hasher: PasswordHasher,
    media_service: Arc<MediaService>,
    config: Arc<AppConfig>,
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        db: PgPool,
        jwt_service: Arc<JwtService>,
        hasher: PasswordHasher,
        media_service: Arc<MediaService>,
        config: Arc<AppConfig>,
    ) -> Result<Self, AppError> {
        // 未知邮箱也做一次完整比对，使两条失败路径耗时一致
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;

        Ok(Self {
            db,
            jwt_service,
            hasher,
            media_service,
            config,
            dummy_hash,
        })
    }

    /// 用户注册
    pub async fn register(&self, mut req: RegisterRequest) -> Result<AuthResponse, AppError> {
        req.normalize_and_validate(&self.config.security)?;

        let user_repo = UserRepository::new(self.db.clone());

        // 提前检查邮箱，唯一索引兜底并发注册
        if user_repo.find_by_email(&req.email).await?.is_some() {
            record_auth_event("register", "conflict");
            return Err(AppError::Conflict(
                "User already exists with this email".to_string(),
            ));
        }

        let password_hash = self.hash_password(std::mem::take(&mut req.password)).await?;

        // 头像上传失败不影响注册
        let avatar = match req.avatar.as_deref() {
            Some(value) if !value.is_empty() => self
                .media_service
                .resolve_image(value, MediaFolder::Avatars)
                .await
                .unwrap_or_default(),
            _ => String::new(),
        };

        let user = user_repo
            .create(&req.name, &req.email, &password_hash, &avatar)
            .await
            .map_err(|e| {
                if matches!(e, AppError::Conflict(_)) {
                    record_auth_event("register", "conflict");
                }
                e
            })?;

        let token = self.jwt_service.issue(&user.id)?;
        record_auth_event("register", "success");
        info!(user_id = %user.id, "User registered");

        Ok(AuthResponse {
            message: "User registered successfully".to_string(),
            token,
            expires_in: self.jwt_service.expires_in(),
            user: UserResponse::from(user),
        })
    }

    /// 用户登录：邮箱不存在与密码错误返回相同的 401
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        let user_repo = UserRepository::new(self.db.clone());
        let email = normalize_email(&req.email);

        let user = user_repo.find_by_email(&email).await?;

        let stored = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash.clone(),
        };
        let matched = self.verify_password(req.password, stored).await?;

        let user = match user {
            Some(user) if matched => user,
            _ => {
                record_auth_event("login", "failure");
                warn!("Login failed: invalid credentials");
                return Err(AppError::Unauthorized);
            }
        };

        let token = self.jwt_service.issue(&user.id)?;
        record_auth_event("login", "success");
        info!(user_id = %user.id, "User logged in");

        Ok(AuthResponse {
            message: "Login successful".to_string(),
            token,
            expires_in: self.jwt_service.expires_in(),
            user: UserResponse::from(user),
        })
    }

    /// 哈希计算放到阻塞线程池，不占用异步工作线程
    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
    }

    async fn verify_password(&self, password: String, stored: String) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
    }
}

fn record_auth_event(event: &'static str, outcome: &'static str) {
    metrics::counter!("auth_events_total", "event" => event, "outcome" => outcome).increment(1);
}
