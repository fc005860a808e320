//! Data models for the URL shortener application
//!
//! This module defines the stored records (short links and accounts) and the
//! request/response payloads of the HTTP API. Request payloads carry their
//! validation rules through `validator` derives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// A shortened link as seen by the API
///
/// `click_count` is owned by the store's counter table and only moves through
/// redirect resolution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShortLink {
    /// Store-assigned identifier, never changes
    pub id: u64,

    /// Public path segment, unique across all links
    pub slug: String,

    /// Redirect target
    pub long_url: String,

    /// Number of resolved redirects
    #[serde(default)]
    pub click_count: u64,

    pub created_at: DateTime<Utc>,

    /// Creating account; `None` for anonymous links
    pub owner_id: Option<u64>,
}

/// Insert payload for a new link; the store assigns `id` and starts the counter at 0
#[derive(Debug, Clone)]
pub struct NewShortLink {
    pub slug: String,
    pub long_url: String,
    pub owner_id: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// A registered account as stored
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Account view returned to clients
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: u64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LinkStats {
    pub click_count: u64,
}

/// Slugs are limited to letters, digits, `-` and `_`
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("slug")
            .with_message("slug may only contain letters, digits, '-' and '_'".into()))
    }
}

/// Request payload for creating a new short URL
///
/// # Example
/// ```json
/// {
///   "longUrl": "https://example.com/very/long/url",
///   "slug": "my-link"
/// }
/// ```
#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateUrlRequest {
    #[validate(url(message = "longUrl must be a URL address"))]
    pub long_url: String,

    /// Optional custom slug. A random one is generated when absent.
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
}

/// Request payload for `PATCH /urls/{id}`; absent fields stay unchanged
#[derive(Deserialize, Validate, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUrlRequest {
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,

    #[validate(url(message = "longUrl must be a URL address"))]
    pub long_url: Option<String>,
}

#[derive(Deserialize, Validate, Debug)]
pub struct SignUpRequest {
    #[validate(email(message = "email must be an email"))]
    pub email: String,

    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Deserialize, Validate, Debug)]
pub struct SignInRequest {
    #[validate(email(message = "email must be an email"))]
    pub email: String,

    #[validate(length(min = 1, message = "password should not be empty"))]
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub access_token: String,
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_pattern() {
        assert!(validate_slug("abc123").is_ok());
        assert!(validate_slug("my-link_2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("has space").is_err());
        assert!(validate_slug("slash/y").is_err());
    }

    #[test]
    fn create_request_validation() {
        let ok = CreateUrlRequest {
            long_url: "https://example.com".into(),
            slug: None,
        };
        assert!(ok.validate().is_ok());

        let bad_url = CreateUrlRequest {
            long_url: "not a url".into(),
            slug: None,
        };
        assert!(bad_url.validate().is_err());

        let bad_slug = CreateUrlRequest {
            long_url: "https://example.com".into(),
            slug: Some("no spaces".into()),
        };
        assert!(bad_slug.validate().is_err());
    }

    #[test]
    fn link_serializes_camel_case() {
        let link = ShortLink {
            id: 1,
            slug: "abc123".into(),
            long_url: "https://example.com".into(),
            click_count: 0,
            created_at: Utc::now(),
            owner_id: Some(1),
        };
        let value = serde_json::to_value(&link).unwrap();
        assert_eq!(value["longUrl"], "https://example.com");
        assert_eq!(value["clickCount"], 0);
        assert_eq!(value["ownerId"], 1);
    }
}
