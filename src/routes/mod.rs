// Route exports
pub mod auth;
pub mod matches;
pub mod preferences;

use actix_web::web;

use crate::core::MatchService;
use crate::services::JwtIdentityProvider;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: MatchService,
    pub identity: JwtIdentityProvider,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(preferences::configure),
    );
}
