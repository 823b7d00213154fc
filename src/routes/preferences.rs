use actix_web::{web, HttpResponse};

use crate::error::MatchError;
use crate::models::UpsertPreferenceRequest;
use crate::routes::auth::AuthenticatedUser;
use crate::routes::AppState;

/// Configure preference routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/preferences/{uid}")
            .route(web::put().to(upsert_preference))
            .route(web::get().to(get_preference))
            .route(web::delete().to(delete_preference)),
    );
}

/// PUT /api/v1/preferences/{uid}
///
/// Create or replace the caller's own matching preference.
async fn upsert_preference(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    req: web::Json<UpsertPreferenceRequest>,
) -> Result<HttpResponse, MatchError> {
    let uid = path.into_inner();
    let preference = state
        .service
        .upsert_preference(&user.uid, &uid, req.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(preference))
}

/// GET /api/v1/preferences/{uid}
async fn get_preference(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, MatchError> {
    let preference = state.service.get_preference(&path).await?;
    Ok(HttpResponse::Ok().json(preference))
}

/// DELETE /api/v1/preferences/{uid}
async fn delete_preference(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, MatchError> {
    state.service.delete_preference(&user.uid, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}
