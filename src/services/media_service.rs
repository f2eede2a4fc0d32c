//! 媒体上传服务：把 data URI 图片签名后转发给托管服务

use crate::{config::MediaConfig, error::AppError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::{collections::BTreeMap, time::Duration};
use tracing::{debug, warn};

/// 上传时请求的变换：限制尺寸、自动质量与格式
pub const UPLOAD_TRANSFORMATION: &str = "c_limit,w_800,h_800/q_auto:good/f_auto";

/// 上传目录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    Avatars,
    Posts,
}

impl MediaFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFolder::Avatars => "avatars",
            MediaFolder::Posts => "posts",
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    #[serde(default)]
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

pub struct MediaService {
    client: Client,
    config: MediaConfig,
}

impl MediaService {
    pub fn new(config: MediaConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.upload_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        if !config.is_configured() {
            warn!("Media upload credentials not configured, data URI images will be dropped");
        }

        Ok(Self { client, config })
    }

    /// 是否为 data URI（需要上传）；普通 URL 原样保留
    pub fn is_data_uri(value: &str) -> bool {
        value.starts_with("data:")
    }

    /// 校验 data URI：必须是 base64 编码的图片，解码后不超过大小上限
    pub fn validate_data_uri(&self, data_uri: &str) -> Result<(), AppError> {
        let (header, payload) = data_uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(','))
            .ok_or_else(|| AppError::BadRequest("Malformed data URI".to_string()))?;

        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| AppError::BadRequest("Image data must be base64 encoded".to_string()))?;
        if !mime.starts_with("image/") {
            return Err(AppError::BadRequest("Only image uploads are supported".to_string()));
        }

        // 先按编码长度粗略估算，避免解码明显超限的数据
        if payload.len() / 4 * 3 > self.config.max_image_bytes + 2 {
            return Err(AppError::BadRequest("Image is too large".to_string()));
        }

        let decoded = STANDARD
            .decode(payload)
            .map_err(|_| AppError::BadRequest("Invalid base64 image data".to_string()))?;
        if decoded.is_empty() {
            return Err(AppError::BadRequest("Image is empty".to_string()));
        }
        if decoded.len() > self.config.max_image_bytes {
            return Err(AppError::BadRequest("Image is too large".to_string()));
        }

        Ok(())
    }

    /// 计算请求签名：参数按键排序拼接为 k=v&... 后追加 API Secret，取 SHA-256 十六进制
    pub fn sign(&self, params: &BTreeMap<&str, String>) -> String {
        let to_sign = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.config.api_secret.expose_secret().as_bytes());
        hex::encode(hasher.finalize())
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    /// 带签名提交表单，返回 JSON 响应
    async fn signed_post<T: serde::de::DeserializeOwned>(
        &self,
        action: &str,
        mut params: BTreeMap<&str, String>,
        file: Option<&str>,
    ) -> Result<T, AppError> {
        if !self.config.is_configured() {
            return Err(AppError::Upload("media upload not configured".to_string()));
        }

        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        let signature = self.sign(&params);

        let mut form: Vec<(&str, String)> = params.into_iter().collect();
        form.push(("api_key", self.config.api_key.clone()));
        form.push(("signature_algorithm", "sha256".to_string()));
        form.push(("signature", signature));
        if let Some(file) = file {
            form.push(("file", file.to_string()));
        }

        let response = self
            .client
            .post(self.endpoint(action))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("{} request failed: {}", action, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upload(format!(
                "{} rejected with status {}: {}",
                action, status, body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Upload(format!("Invalid {} response: {}", action, e)))
    }

    /// 上传图片，返回 HTTPS 地址
    pub async fn upload_image(&self, data_uri: &str, folder: MediaFolder) -> Result<String, AppError> {
        self.validate_data_uri(data_uri)?;

        let mut params = BTreeMap::new();
        params.insert(
            "folder",
            format!("{}/{}", self.config.folder_root, folder.as_str()),
        );
        params.insert("transformation", UPLOAD_TRANSFORMATION.to_string());

        let uploaded: UploadResponse = self.signed_post("upload", params, Some(data_uri)).await?;
        debug!(public_id = %uploaded.public_id, "Image uploaded");

        Ok(uploaded.secure_url)
    }

    /// 删除已上传的图片
    pub async fn delete_image(&self, public_id: &str) -> Result<(), AppError> {
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());

        let destroyed: DestroyResponse = self.signed_post("destroy", params, None).await?;
        if destroyed.result != "ok" {
            return Err(AppError::Upload(format!("destroy returned {}", destroyed.result)));
        }

        Ok(())
    }

    /// data URI 上传后返回地址，上传失败时丢弃（返回 None）；普通 URL 原样返回
    pub async fn resolve_image(&self, value: &str, folder: MediaFolder) -> Option<String> {
        if !Self::is_data_uri(value) {
            return Some(value.to_string());
        }

        match self.upload_image(value, folder).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(folder = folder.as_str(), error = %e, "Image upload failed, dropping image");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, routing::post, Form, Json, Router};
    use secrecy::Secret;
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    type Received = Arc<Mutex<Vec<HashMap<String, String>>>>;

    /// 本地模拟托管服务：记录收到的表单，按固定 JSON 应答
    async fn spawn_media_stub(reply: serde_json::Value) -> (String, Received) {
        let received: Received = Arc::default();
        let reply = Arc::new(reply);

        let app = Router::new()
            .route(
                "/demo/image/{action}",
                post(
                    |State((received, reply)): State<(Received, Arc<serde_json::Value>)>,
                     Form(form): Form<HashMap<String, String>>| async move {
                        received.lock().unwrap().push(form);
                        Json((*reply).clone())
                    },
                ),
            )
            .with_state((received.clone(), reply));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), received)
    }

    fn test_config() -> MediaConfig {
        MediaConfig {
            cloud_name: "demo".to_string(),
            api_key: "1234".to_string(),
            api_secret: Secret::new("abcd".to_string()),
            folder_root: "gesture-talk".to_string(),
            api_base_url: "https://api.cloudinary.com/v1_1/".to_string(),
            upload_timeout_secs: 5,
            max_image_bytes: 16,
        }
    }

    #[test]
    fn test_sign_sorts_params_and_appends_secret() {
        let service = MediaService::new(test_config()).unwrap();
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("public_id", "sample_image".to_string());

        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(b"public_id=sample_image&timestamp=1315060510abcd");
            hex::encode(hasher.finalize())
        };
        assert_eq!(service.sign(&params), expected);
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let service = MediaService::new(test_config()).unwrap();
        assert_eq!(
            service.endpoint("upload"),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }

    #[test]
    fn test_is_data_uri() {
        assert!(MediaService::is_data_uri("data:image/png;base64,AAAA"));
        assert!(!MediaService::is_data_uri("https://res.cloudinary.com/demo/a.png"));
    }

    #[test]
    fn test_validate_data_uri() {
        let service = MediaService::new(test_config()).unwrap();
        let small = format!("data:image/png;base64,{}", STANDARD.encode([1u8; 8]));
        let large = format!("data:image/png;base64,{}", STANDARD.encode([1u8; 64]));

        assert!(service.validate_data_uri(&small).is_ok());
        assert!(service.validate_data_uri(&large).is_err());
        assert!(service.validate_data_uri("data:text/plain;base64,aGk=").is_err());
        assert!(service.validate_data_uri("data:image/png,raw").is_err());
        assert!(service.validate_data_uri("data:image/png;base64,!!!").is_err());
        assert!(service.validate_data_uri("data:image/png;base64").is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_upload_fails_and_is_dropped() {
        let mut config = test_config();
        config.cloud_name = String::new();
        let service = MediaService::new(config).unwrap();
        let uri = format!("data:image/png;base64,{}", STANDARD.encode([1u8; 8]));

        assert!(matches!(
            service.upload_image(&uri, MediaFolder::Avatars).await,
            Err(AppError::Upload(_))
        ));
        assert_eq!(service.resolve_image(&uri, MediaFolder::Posts).await, None);
        assert_eq!(
            service
                .resolve_image("https://img.example/a.png", MediaFolder::Posts)
                .await
                .as_deref(),
            Some("https://img.example/a.png")
        );
    }

    #[tokio::test]
    async fn test_delete_image_sends_signed_destroy() {
        let (base_url, received) = spawn_media_stub(serde_json::json!({ "result": "ok" })).await;
        let mut config = test_config();
        config.api_base_url = base_url;
        let service = MediaService::new(config).unwrap();

        service.delete_image("gesture-talk/posts/abc").await.unwrap();

        let forms = received.lock().unwrap();
        assert_eq!(forms.len(), 1);
        let form = &forms[0];
        assert_eq!(form["public_id"], "gesture-talk/posts/abc");
        assert_eq!(form["api_key"], "1234");
        assert_eq!(form["signature_algorithm"], "sha256");
        assert!(!form.contains_key("file"));

        let mut signed = BTreeMap::new();
        signed.insert("public_id", form["public_id"].clone());
        signed.insert("timestamp", form["timestamp"].clone());
        assert_eq!(form["signature"], service.sign(&signed));
    }

    #[tokio::test]
    async fn test_delete_image_reports_unexpected_result() {
        let (base_url, _) = spawn_media_stub(serde_json::json!({ "result": "not found" })).await;
        let mut config = test_config();
        config.api_base_url = base_url;
        let service = MediaService::new(config).unwrap();

        assert!(matches!(
            service.delete_image("missing").await,
            Err(AppError::Upload(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_image_posts_folder_and_transformation() {
        let (base_url, received) = spawn_media_stub(serde_json::json!({
            "secure_url": "https://res.example/avatars/a.png",
            "public_id": "gesture-talk/avatars/a"
        }))
        .await;
        let mut config = test_config();
        config.api_base_url = base_url;
        let service = MediaService::new(config).unwrap();
        let uri = format!("data:image/png;base64,{}", STANDARD.encode([1u8; 8]));

        let url = service
            .resolve_image(&uri, MediaFolder::Avatars)
            .await
            .unwrap();
        assert_eq!(url, "https://res.example/avatars/a.png");

        let forms = received.lock().unwrap();
        assert_eq!(forms[0]["folder"], "gesture-talk/avatars");
        assert_eq!(forms[0]["transformation"], UPLOAD_TRANSFORMATION);
        assert_eq!(forms[0]["file"], uri);
    }
}
