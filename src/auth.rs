//! Account registration, sign-in and bearer tokens
//!
//! Passwords are stored as bcrypt hashes. A successful sign-in returns an
//! HS256 JWT whose `sub` claim is the account id; [`AuthService::verify_token`]
//! turns such a token back into an [`AuthUser`].

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::model::{NewUser, PublicUser, SignInRequest, SignInResponse, SignUpRequest, User};
use crate::repository::UserRepository;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated caller, attached to requests by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
}

impl TryFrom<Claims> for AuthUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self> {
        let user_id = claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Unauthorized".to_string()))?;
        Ok(Self {
            user_id,
            email: claims.email,
        })
    }
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    keys: Arc<Keys>,
    token_ttl: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, secret: &str, token_ttl: Duration, bcrypt_cost: u32) -> Self {
        Self {
            users,
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
            token_ttl,
            bcrypt_cost,
        }
    }

    #[tracing::instrument(skip_all, fields(email = %request.email))]
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<PublicUser> {
        if self.users.find_user_by_email(&request.email).await?.is_some() {
            return Err(AppError::Unauthorized("Email already registered".to_string()));
        }

        let cost = self.bcrypt_cost;
        let password = request.password;
        let password_hash =
            tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;

        let user = self
            .users
            .insert_user(NewUser {
                email: request.email,
                password_hash,
                created_at: Utc::now(),
            })
            .await
            .map_err(|err| match err {
                // Lost a race with a concurrent sign-up for the same email.
                AppError::Conflict(_) => AppError::Unauthorized("Email already registered".to_string()),
                other => other,
            })?;

        tracing::info!(user_id = user.id, "account registered");
        Ok(user.into())
    }

    #[tracing::instrument(skip_all, fields(email = %request.email))]
    pub async fn sign_in(&self, request: SignInRequest) -> Result<SignInResponse> {
        let user = self
            .users
            .find_user_by_email(&request.email)
            .await?
            .ok_or_else(AppError::invalid_credentials)?;

        let password = request.password;
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
        if !matches {
            tracing::debug!(user_id = user.id, "password mismatch");
            return Err(AppError::invalid_credentials());
        }

        let access_token = self.issue_token(&user)?;
        Ok(SignInResponse {
            access_token,
            user: user.into(),
        })
    }

    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.keys.encoding)
            .map_err(|err| AppError::Internal(format!("token signing failed: {err}")))
    }

    pub fn verify_token(&self, token: &str) -> Result<AuthUser> {
        let data = decode::<Claims>(token, &self.keys.decoding, &Validation::default())?;
        data.claims.try_into()
    }
}
