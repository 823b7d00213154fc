use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::MatchError;
use crate::models::{
    CandidatesResponse, CheckMatchResponse, HealthResponse, LikeResponse, MatchesResponse,
    RawCandidateFilters, TargetRequest,
};
use crate::routes::auth::AuthenticatedUser;
use crate::routes::AppState;

/// Configure candidate, interest and match routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/candidates", web::get().to(get_candidates))
        .route("/likes", web::post().to(like))
        .route("/passes", web::post().to(pass))
        .route("/matches", web::get().to(get_matches))
        .route("/matches/reset", web::post().to(reset_matches))
        .route("/matches/{other_uid}", web::get().to(check_match))
        .route("/matches/{other_uid}", web::delete().to(unmatch));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let store_healthy = state.service.health_check().await;

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Candidate feed
///
/// GET /api/v1/candidates?location=&minBudget=&maxBudget=&gender=&minAge=&maxAge=
///
/// Malformed filter values are ignored rather than rejected. Repeated calls
/// may return different random subsets.
async fn get_candidates(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<RawCandidateFilters>,
) -> Result<HttpResponse, MatchError> {
    let filters = query.into_inner().into_filters();
    tracing::debug!("Candidate filters for {}: {:?}", user.uid, filters);

    let candidates = state.service.find_candidates(&user.uid, &filters).await?;

    Ok(HttpResponse::Ok().json(CandidatesResponse {
        count: candidates.len(),
        candidates,
    }))
}

/// POST /api/v1/likes
///
/// ```json
/// { "targetUid": "string" }
/// ```
async fn like(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<TargetRequest>,
) -> Result<HttpResponse, MatchError> {
    req.validate()?;

    let outcome = state.service.record_like(&user.uid, &req.target_uid).await?;

    Ok(HttpResponse::Ok().json(LikeResponse {
        mutual: outcome.mutual,
    }))
}

/// POST /api/v1/passes
async fn pass(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<TargetRequest>,
) -> Result<HttpResponse, MatchError> {
    req.validate()?;

    state.service.record_pass(&user.uid, &req.target_uid).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/matches
async fn get_matches(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, MatchError> {
    let matches = state.service.list_matches(&user.uid).await?;

    Ok(HttpResponse::Ok().json(MatchesResponse {
        count: matches.len(),
        matches,
    }))
}

/// GET /api/v1/matches/{other_uid}
async fn check_match(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, MatchError> {
    let other_uid = path.into_inner();
    let matched = state.service.check_match(&user.uid, &other_uid).await?;

    Ok(HttpResponse::Ok().json(CheckMatchResponse { other_uid, matched }))
}

/// DELETE /api/v1/matches/{other_uid}
async fn unmatch(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, MatchError> {
    state.service.unmatch(&user.uid, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/v1/matches/reset
async fn reset_matches(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, MatchError> {
    let summary = state.service.reset_all(&user.uid).await?;
    Ok(HttpResponse::Ok().json(summary))
}
