//! Bearer token issuance and the `AuthenticatedUser` extractor.
//!
//! Every protected handler takes an [`AuthenticatedUser`] argument; the
//! identity it carries is passed explicitly into the store queries.

use actix_utils::future::{ready, Ready};
use actix_web::{dev::Payload, http::header, web::Data, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{errors::AppError, AppState};

pub const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: i64, expires_in: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        }
    }
}

/// HS256 signing material shared by all workers.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttl(secret, Duration::days(TOKEN_TTL_DAYS))
    }

    pub fn with_ttl(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::default(),
            ttl,
        }
    }

    pub fn issue(&self, user_id: i64) -> Result<String, AppError> {
        let claims = Claims::new(user_id, self.ttl);
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Resolves a token to the user it was issued for.
    pub fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                log::debug!("Rejected bearer token: {}", e);
                AppError::Unauthorized
            })?
            .claims;
        let id = claims.sub.parse().map_err(|_| AppError::Unauthorized)?;
        Ok(AuthenticatedUser { id })
    }
}

/// Identity of the caller, produced once per request from the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i64,
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<Data<AppState>>() else {
            log::error!("AppState missing from application data");
            return ready(Err(AppError::Unauthorized));
        };
        ready(
            bearer_token(req)
                .ok_or(AppError::Unauthorized)
                .and_then(|token| state.tokens.authenticate(token)),
        )
    }
}
