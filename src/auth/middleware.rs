use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::AppError;
use crate::store::UserDirectory;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

/// Verifies the bearer token and that its account is still active.
pub async fn auth_middleware<S>(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    S: UserDirectory + 'static,
{
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;
    let users = req
        .app_data::<Data<S>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("User store missing"))?;

    let auth_user = match AuthUser::from_headers(req.headers(), &config.jwt_secret) {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!(error = %e, path = req.path(), "Rejected unauthenticated request");
            let resp = e.error_response();
            return Ok(req.into_response(resp));
        }
    };

    match users.is_active_user(auth_user.user_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(user_id = auth_user.user_id, "Rejected token of inactive account");
            let resp = AppError::Unauthenticated("Account is inactive").error_response();
            return Ok(req.into_response(resp));
        }
        Err(e) => return Ok(req.into_response(e.error_response())),
    }

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}

/// Restricts clock-in/out to the school network. An empty allow-list lets everything through.
/// Only the socket peer counts; forwarding headers are client-controlled.
pub async fn ip_allow_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    if !config.attendance_ip_allowlist.is_empty() {
        let client = req.peer_addr().map(|addr| addr.ip());

        let allowed = client.is_some_and(|ip| config.attendance_ip_allowlist.contains(&ip));
        if !allowed {
            tracing::info!(client = ?client, path = req.path(), "Blocked by IP allow-list");
            let resp = AppError::Forbidden("Client address not allowed").error_response();
            return Ok(req.into_response(resp));
        }
    }

    next.call(req).await
}
