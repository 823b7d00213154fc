use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::error::{MatchError, MatchResult};
use crate::routes::AppState;
use crate::services::JwtIdentityProvider;

/// Caller identity resolved from the bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub uid: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = MatchError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> MatchResult<AuthenticatedUser> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| MatchError::Unavailable("identity provider not configured".into()))?;

    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = JwtIdentityProvider::bearer_token(header)?;
    let uid = state.identity.authenticate(token).map_err(|e| {
        tracing::info!("Rejected credential on {}: {}", req.path(), e);
        e
    })?;

    Ok(AuthenticatedUser { uid })
}
