//! User domain models

use crate::{
    config::SecurityConfig,
    error::{field_errors, AppError, FieldError},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

pub const MAX_SKILL_LEN: usize = 50;

/// Stored identity record. Deliberately not `Serialize`: only
/// [`UserResponse`] ever leaves the process.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,

    // Profile
    pub avatar: String,
    pub bio: String,
    pub job_title: String,
    pub company: String,
    pub location: String,
    pub skills: Vec<String>,
    pub achievements: Json<Vec<Achievement>>,
    pub projects: Json<Vec<Project>>,
    pub social_links: Json<SocialLinks>,

    // Metadata
    pub is_verified: bool,
    pub joined_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SocialLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Lowercase and trim an email so lookups are case-insensitive
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
}

impl RegisterRequest {
    /// Trim the name, normalize the email, then run every field rule.
    /// All failures are reported together.
    pub fn normalize_and_validate(&mut self, policy: &SecurityConfig) -> Result<(), AppError> {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);

        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e),
        };
        if let Some(err) = check_password_policy(&self.password, policy) {
            errors.push(err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            errors.sort_by(|a, b| a.field.cmp(&b.field));
            Err(AppError::Validation(errors))
        }
    }
}

/// Password length policy, counted in characters
pub fn check_password_policy(password: &str, policy: &SecurityConfig) -> Option<FieldError> {
    let len = password.chars().count() as u64;
    if len < policy.password_min_length || len > policy.password_max_length {
        return Some(FieldError::new(
            "password",
            format!(
                "Password must be between {}-{} characters",
                policy.password_min_length, policy.password_max_length
            ),
        ));
    }
    None
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Register / login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

/// Profile update request. Email and password are not updatable here.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,
    #[validate(length(max = 100, message = "Job title must be at most 100 characters"))]
    pub job_title: Option<String>,
    #[validate(length(max = 100, message = "Company must be at most 100 characters"))]
    pub company: Option<String>,
    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,
    #[validate(length(max = 20, message = "At most 20 skills are allowed"))]
    pub skills: Option<Vec<String>>,
    pub avatar: Option<String>,
    pub achievements: Option<Vec<Achievement>>,
    pub projects: Option<Vec<Project>>,
    pub social_links: Option<SocialLinks>,
}

impl UpdateProfileRequest {
    pub fn normalize_and_validate(&mut self) -> Result<(), AppError> {
        if let Some(name) = self.name.as_mut() {
            *name = name.trim().to_string();
        }
        if let Some(skills) = self.skills.as_mut() {
            skills.retain(|s| !s.trim().is_empty());
            for skill in skills.iter_mut() {
                *skill = skill.trim().to_string();
            }
        }

        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e),
        };
        if let Some(skills) = &self.skills {
            if skills.iter().any(|s| s.chars().count() > MAX_SKILL_LEN) {
                errors.push(FieldError::new(
                    "skills",
                    format!("Each skill must be at most {} characters", MAX_SKILL_LEN),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            errors.sort_by(|a, b| a.field.cmp(&b.field));
            Err(AppError::Validation(errors))
        }
    }
}

/// User response (without sensitive data)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub bio: String,
    pub job_title: String,
    pub company: String,
    pub location: String,
    pub skills: Vec<String>,
    pub achievements: Vec<Achievement>,
    pub projects: Vec<Project>,
    pub social_links: SocialLinks,
    pub is_verified: bool,
    pub joined_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar: user.avatar,
            bio: user.bio,
            job_title: user.job_title,
            company: user.company,
            location: user.location,
            skills: user.skills,
            achievements: user.achievements.0,
            projects: user.projects.0,
            social_links: user.social_links.0,
            is_verified: user.is_verified,
            joined_at: user.joined_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Short author / commenter projection embedded in posts
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}
