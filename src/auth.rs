use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use chrono::Utc;
use futures_util::future::LocalBoxFuture;
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::ApiError;
use crate::models::User;
use crate::store::EventStore;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    #[serde(default)]
    exp: Option<i64>,
}

/// HS256 keys for the bearer tokens issued by the auth service. The token
/// subject is the username.
#[derive(Clone)]
pub struct JwtKeys {
    key: Hmac<Sha256>,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            key: Hmac::new_from_slice(secret.as_bytes())?,
        })
    }

    pub fn sign(&self, username: &str, ttl: Option<chrono::Duration>) -> Result<String, jwt::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: ttl.map(|ttl| (now + ttl).timestamp()),
        };
        claims.sign_with_key(&self.key)
    }

    /// Returns the username the token was issued to, if the signature holds
    /// and the token has not expired.
    pub fn verify(&self, token: &str) -> Option<String> {
        let claims: Claims = token.verify_with_key(&self.key).ok()?;
        if let Some(exp) = claims.exp {
            if exp < Utc::now().timestamp() {
                debug!("rejecting expired token for {}", claims.sub);
                return None;
            }
        }
        Some(claims.sub)
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    // tokens start with "Bearer " so strip that off
    value.strip_prefix("Bearer ").map(|token| token.trim().to_string())
}

/// The user behind the request's bearer token. Extracting it rejects the
/// request with 401 when the token is missing, invalid, or names an unknown
/// user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let keys = req.app_data::<web::Data<JwtKeys>>().cloned();
        let store = req.app_data::<web::Data<dyn EventStore>>().cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let (keys, store) = match (keys, store) {
                (Some(keys), Some(store)) => (keys, store),
                _ => return Err(ApiError::Internal("auth state not configured".to_string())),
            };
            let username = token
                .and_then(|token| keys.verify(&token))
                .ok_or(ApiError::Unauthorized)?;
            let user = web::block(move || store.find_user(&username)).await??;
            user.map(AuthUser).ok_or(ApiError::Unauthorized)
        })
    }
}
