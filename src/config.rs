//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息
//! 进程启动时加载一次，之后只读共享，不支持热重载

use config::{Config, ConfigError, Environment};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

/// 示例配置中出现过的密钥，不能用于签发令牌
pub const PLACEHOLDER_JWT_SECRETS: &[&str] = &["change-this-secret-in-production-min-32-chars!"];

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:5000"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
    /// 请求体大小上限（字节），base64 图片走 JSON 请求体
    pub body_limit_bytes: usize,
    /// 允许的跨域来源，逗号分隔；"*" 表示任意来源
    pub cors_allowed_origins: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库连接 URL（使用 Secret 包装，防止日志泄露）
    pub url: Secret<String>,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 获取连接超时时间（秒）
    pub acquire_timeout_secs: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout_secs: u64,
    /// 连接最大生命周期（秒）
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// JWT 签名密钥（使用 Secret 包装，防止日志泄露）
    pub jwt_secret: Secret<String>,
    /// 令牌有效期（秒），过期后必须重新登录
    pub token_exp_secs: u64,
    /// Argon2 内存开销（KiB）
    pub hash_memory_kib: u32,
    /// Argon2 迭代次数
    pub hash_iterations: u32,
    /// Argon2 并行度
    pub hash_parallelism: u32,
    /// 密码最小长度（字符）
    pub password_min_length: u64,
    /// 密码最大长度（字符）
    pub password_max_length: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// 媒体托管服务的 cloud name，为空表示未配置上传
    #[serde(default)]
    pub cloud_name: String,
    /// API Key
    #[serde(default)]
    pub api_key: String,
    /// API Secret（使用 Secret 包装，防止日志泄露）
    pub api_secret: Secret<String>,
    /// 上传根目录，例如 "gesture-talk"
    pub folder_root: String,
    /// 上传 API 基础地址
    pub api_base_url: String,
    /// 单次上传超时（秒）
    pub upload_timeout_secs: u64,
    /// 解码后单张图片大小上限（字节）
    pub max_image_bytes: usize,
}

impl MediaConfig {
    /// 是否已配置上传凭证
    pub fn is_configured(&self) -> bool {
        !self.cloud_name.is_empty()
            && !self.api_key.is_empty()
            && !self.api_secret.expose_secret().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub media: MediaConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("server.addr", "0.0.0.0:5000")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default("server.body_limit_bytes", 50 * 1024 * 1024)?
            .set_default("server.cors_allowed_origins", "*")?
            .set_default("database.url", "postgresql://localhost:5432/gesture_talk")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("security.token_exp_secs", 7 * 24 * 3600)?
            .set_default("security.hash_memory_kib", 19456)?
            .set_default("security.hash_iterations", 2)?
            .set_default("security.hash_parallelism", 1)?
            .set_default("security.password_min_length", 6)?
            .set_default("security.password_max_length", 128)?
            // 媒体上传默认配置
            .set_default("media.cloud_name", "")?
            .set_default("media.api_key", "")?
            .set_default("media.api_secret", "")?
            .set_default("media.folder_root", "gesture-talk")?
            .set_default("media.api_base_url", "https://api.cloudinary.com/v1_1")?
            .set_default("media.upload_timeout_secs", 30)?
            .set_default("media.max_image_bytes", 10 * 1024 * 1024)?;

        // 从环境变量加载配置（前缀为 GT_）
        settings = settings.add_source(
            Environment::with_prefix("GT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 验证端口范围
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        // 验证数据库连接池配置
        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        // 验证 JWT 密钥长度（至少 32 字符），且不能沿用示例文件中的占位值
        let jwt_secret = self.security.jwt_secret.expose_secret();
        if jwt_secret.len() < 32 {
            return Err(ConfigError::Message(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }
        if PLACEHOLDER_JWT_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::Message(
                "JWT secret is a published placeholder; set GT_SECURITY__JWT_SECRET".to_string(),
            ));
        }

        // 验证令牌过期时间
        if self.security.token_exp_secs < 60 || self.security.token_exp_secs > 2_592_000 {
            return Err(ConfigError::Message(
                "token_exp_secs must be between 60 and 2592000 (1 minute to 30 days)".to_string(),
            ));
        }

        // 验证 Argon2 参数
        if argon2::Params::new(
            self.security.hash_memory_kib,
            self.security.hash_iterations,
            self.security.hash_parallelism,
            None,
        )
        .is_err()
        {
            return Err(ConfigError::Message(
                "Invalid Argon2 cost parameters (hash_memory_kib / hash_iterations / hash_parallelism)"
                    .to_string(),
            ));
        }

        // 验证密码策略
        if self.security.password_min_length < 6
            || self.security.password_max_length > 1024
            || self.security.password_min_length > self.security.password_max_length
        {
            return Err(ConfigError::Message(
                "password length bounds must satisfy 6 <= min <= max <= 1024".to_string(),
            ));
        }

        if self.media.max_image_bytes == 0 {
            return Err(ConfigError::Message("media.max_image_bytes must be > 0".to_string()));
        }

        Ok(())
    }
}
