use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::settings::SettingsPatch;
use crate::service::settings as svc;
use crate::store::MySqlStore;
use actix_web::{HttpResponse, web};

/// Read the school configuration
#[utoipa::path(
    get,
    path = "/api/school-setting",
    responses(
        (status = 200, description = "Current settings, created with defaults on first read", body = SchoolSettings),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "School Setting"
)]
pub async fn get_settings(
    _auth: AuthUser,
    store: web::Data<MySqlStore>,
) -> Result<HttpResponse, AppError> {
    let settings = svc::get(store.get_ref()).await?;
    Ok(HttpResponse::Ok().json(settings))
}

/// Partially update the school configuration
///
/// Only the supplied fields of the supplied sub-groups change.
#[utoipa::path(
    put,
    path = "/api/school-setting",
    request_body = SettingsPatch,
    responses(
        (status = 200, description = "Updated settings", body = SchoolSettings),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "School Setting"
)]
pub async fn update_settings(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    payload: web::Json<SettingsPatch>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let settings = svc::update_partial(store.get_ref(), payload.into_inner()).await?;

    tracing::info!(admin_id = auth.user_id, "School settings updated");
    Ok(HttpResponse::Ok().json(settings))
}
