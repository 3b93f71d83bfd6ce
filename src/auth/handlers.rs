use crate::{
    auth::{auth::AuthUser, jwt::generate_access_token, password::verify_password},
    config::Config,
    error::AppError,
    model::user::{User, UserRow},
    models::{LoginReqDto, LoginResponse, LoginUser},
};
use actix_web::{HttpResponse, web};
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use validator::Validate;

pub(crate) const USER_COLUMNS: &str =
    "id, name, email, password, roles, phone, ic_number, position, is_active, created_at";

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    user.validate()?;

    debug!("Fetching user from database");

    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    let db_user = match sqlx::query_as::<_, UserRow>(&sql)
        .bind(user.email.trim().to_lowercase())
        .fetch_optional(pool.get_ref())
        .await?
    {
        Some(row) => {
            debug!(user_id = row.id, "User found");
            row
        }
        None => {
            info!("Invalid credentials: user not found");
            return Err(AppError::Unauthenticated("Invalid credentials"));
        }
    };

    if !db_user.is_active {
        info!(user_id = db_user.id, "Login refused: account inactive");
        return Err(AppError::Unauthenticated("Invalid credentials"));
    }

    if !verify_password(&user.password, &db_user.password) {
        info!("Invalid credentials: password mismatch");
        return Err(AppError::Unauthenticated("Invalid credentials"));
    }

    debug!("Generating access token");

    let token = generate_access_token(
        db_user.id,
        db_user.email.clone(),
        db_user.roles.0.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(anyhow::Error::from)?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
        // intentionally not failing login
    }

    info!(user_id = db_user.id, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user: LoginUser {
            id: db_user.id,
            name: db_user.name,
            role: db_user.roles.0,
        },
    }))
}

/// Profile of the signed-in caller
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User no longer exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, pool: web::Data<MySqlPool>) -> Result<HttpResponse, AppError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(auth.user_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or(AppError::NotFound("User"))?;
    if !row.is_active {
        return Err(AppError::Unauthenticated("Account is inactive"));
    }

    Ok(HttpResponse::Ok().json(User::from(row)))
}
