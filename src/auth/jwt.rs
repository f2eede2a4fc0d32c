//! JWT token issuing and verification
//! Stateless HS256 session tokens: no refresh, no server-side revocation

use crate::{config::SecurityConfig, error::AppError};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,

    /// JWT ID (unique token identifier)
    pub jti: String,
}

/// JWT service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_exp_secs: u64,
}

impl JwtService {
    /// Create JWT service from config
    pub fn from_config(config: &SecurityConfig) -> Result<Self, AppError> {
        let secret = config.jwt_secret.expose_secret();

        // Ensure secret is at least 32 bytes for HS256
        if secret.len() < 32 {
            return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            token_exp_secs: config.token_exp_secs,
        })
    }

    /// Token lifetime in seconds
    pub fn expires_in(&self) -> u64 {
        self.token_exp_secs
    }

    /// Issue a token for `user_id`, valid from now until the configured horizon
    pub fn issue(&self, user_id: &Uuid) -> Result<String, AppError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if it had been minted at `issued_at`
    pub fn issue_at(&self, user_id: &Uuid, issued_at: DateTime<Utc>) -> Result<String, AppError> {
        let expiration = issued_at + Duration::seconds(self.token_exp_secs as i64);

        let claims = Claims {
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: expiration.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode token: {:?}", e);
            AppError::Internal(format!("Failed to encode token: {}", e))
        })
    }

    /// Verify a token and return its subject.
    ///
    /// The signature is checked before any claim; every failure collapses
    /// into `Unauthorized`. The reason is only logged.
    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "expired",
                    ErrorKind::InvalidSignature => "bad_signature",
                    _ => "invalid",
                };
                tracing::debug!(reason, "Token verification failed");
                AppError::Unauthorized
            })?
            .claims;

        Uuid::parse_str(&claims.sub).map_err(|_| {
            tracing::debug!(reason = "bad_subject", "Token verification failed");
            AppError::Unauthorized
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn test_config() -> SecurityConfig {
        SecurityConfig {
            jwt_secret: Secret::new("test_secret_key_32_characters_long!".to_string()),
            token_exp_secs: 900,
            hash_memory_kib: 8,
            hash_iterations: 1,
            hash_parallelism: 1,
            password_min_length: 6,
            password_max_length: 128,
        }
    }

    /// Flip the first character of the signature segment to a different
    /// base64url character so the decoded signature bytes change.
    fn tamper_signature(token: &str) -> String {
        let (head, sig) = token.rsplit_once('.').unwrap();
        let mut chars: Vec<char> = sig.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        format!("{}.{}", head, chars.into_iter().collect::<String>())
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let service = JwtService::from_config(&test_config()).unwrap();
        let user_id = Uuid::new_v4();

        let token = service.issue(&user_id).unwrap();
        assert_eq!(service.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = JwtService::from_config(&test_config()).unwrap();
        let user_id = Uuid::new_v4();

        let token = service
            .issue_at(&user_id, Utc::now() - Duration::seconds(901))
            .unwrap();
        assert!(matches!(service.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let service = JwtService::from_config(&test_config()).unwrap();
        let token = service.issue(&Uuid::new_v4()).unwrap();

        let tampered = tamper_signature(&token);
        assert_ne!(tampered, token);
        assert!(matches!(service.verify(&tampered), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let service = JwtService::from_config(&test_config()).unwrap();
        let mut other = test_config();
        other.jwt_secret = Secret::new("another_secret_key_32_characters_long".to_string());
        let other = JwtService::from_config(&other).unwrap();

        let token = other.issue(&Uuid::new_v4()).unwrap();
        assert!(service.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let service = JwtService::from_config(&test_config()).unwrap();
        assert!(service.verify("invalid_token").is_err());
        assert!(service.verify("").is_err());
        assert!(service.verify("a.b.c").is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = test_config();
        config.jwt_secret = Secret::new("short".to_string());
        assert!(matches!(JwtService::from_config(&config), Err(AppError::Config(_))));
    }

    #[test]
    fn test_claims_carry_expiry_horizon() {
        let service = JwtService::from_config(&test_config()).unwrap();
        let token = service.issue(&Uuid::new_v4()).unwrap();

        let data = decode::<Claims>(&token, &service.decoding_key, &service.validation).unwrap();
        assert_eq!(data.claims.exp - data.claims.iat, 900);
    }
}
