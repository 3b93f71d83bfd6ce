use crate::{
    auth::{auth::AuthUser, handlers::USER_COLUMNS, password::hash_password},
    error::AppError,
    model::{
        role::Role,
        user::{User, UserRow},
    },
    utils::db_utils::{SqlValue, UpdateBuilder, execute_update},
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{MySqlPool, types::Json};
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    #[validate(length(min = 1, max = 120))]
    #[schema(example = "Siti Aminah")]
    pub name: String,
    #[validate(email)]
    #[schema(example = "siti@sekolah.edu.my", format = "email")]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    #[schema(example = "rahsia123")]
    pub password: String,
    #[validate(length(min = 1))]
    pub roles: Vec<Role>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 20))]
    pub ic_number: Option<String>,
    #[validate(length(max = 120))]
    pub position: Option<String>,
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1))]
    pub roles: Option<Vec<Role>>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 20))]
    pub ic_number: Option<String>,
    #[validate(length(max = 120))]
    pub position: Option<String>,
    pub is_active: Option<bool>,
}

/// Fields a user may change on their own profile.
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 20))]
    pub ic_number: Option<String>,
    #[validate(length(max = 120))]
    pub position: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (max 100)
    pub per_page: Option<u32>,
    /// Only users holding this role
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    /// Matches name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub data: Vec<User>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Only a SUPERADMIN may hand out SUPERADMIN.
fn ensure_can_grant(auth: &AuthUser, roles: &[Role]) -> Result<(), AppError> {
    if roles.contains(&Role::Superadmin) {
        auth.require_any(&[Role::Superadmin])
            .map_err(|_| AppError::Forbidden("Only SUPERADMIN can grant SUPERADMIN"))?;
    }
    Ok(())
}

async fn fetch_user(pool: &MySqlPool, id: u64) -> Result<User, AppError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(User::from)
        .ok_or(AppError::NotFound("User"))
}

/// Register a staff account
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Validation error"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only"),
        (status = 409, description = "Email already registered")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    payload.validate()?;
    ensure_can_grant(&auth, &payload.roles)?;

    let req = payload.into_inner();
    let password = hash_password(&req.password)?;

    let result = sqlx::query(
        r#"
        INSERT INTO users
        (name, email, password, roles, phone, ic_number, position, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?, TRUE)
        "#,
    )
    .bind(req.name.trim())
    .bind(req.email.trim().to_lowercase())
    .bind(password)
    .bind(Json(&req.roles))
    .bind(req.phone)
    .bind(req.ic_number)
    .bind(req.position)
    .execute(pool.get_ref())
    .await
    .map_err(|e| AppError::from_unique(e, "Email already registered"))?;

    let user = fetch_user(pool.get_ref(), result.last_insert_id()).await?;
    info!(user_id = user.id, admin_id = auth.user_id, "User created");

    Ok(HttpResponse::Created().json(user))
}

/// Paginated staff directory
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Paginated user list", body = UserListResponse),
        (status = 403, description = "PENTADBIR/SUPERADMIN only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(role) = query.role {
        conditions.push("JSON_CONTAINS(roles, ?)");
        bindings.push(json!(role).to_string());
    }

    match query.is_active {
        Some(true) => conditions.push("is_active = TRUE"),
        Some(false) => conditions.push("is_active = FALSE"),
        None => {}
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("(name LIKE ? OR email LIKE ?)");
        let like = format!("%{search}%");
        bindings.push(like.clone());
        bindings.push(like);
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) AS total FROM users {where_clause}");
    debug!(sql = %count_sql, bindings = ?bindings, "Counting users");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count users");
        e
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {USER_COLUMNS} FROM users {where_clause} ORDER BY name ASC, id ASC LIMIT ? OFFSET ?"
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching users");

    let mut data_query = sqlx::query_as::<_, UserRow>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let rows = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch users");
        e
    })?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: rows.into_iter().map(User::from).collect(),
        page,
        per_page,
        total,
    }))
}

/// Single user
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User", body = User),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    auth.require_self_or_admin(user_id)?;

    let user = fetch_user(pool.get_ref(), user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Update a user's profile, roles or status
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(
        ("id" = u64, Path, description = "User ID")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Validation error or empty update"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already registered")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateUser>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    payload.validate()?;

    let user_id = path.into_inner();
    let req = payload.into_inner();

    if let Some(roles) = &req.roles {
        ensure_can_grant(&auth, roles)?;
    }
    let target = fetch_user(pool.get_ref(), user_id).await?;
    if target.roles.contains(&Role::Superadmin) {
        auth.require_any(&[Role::Superadmin])
            .map_err(|_| AppError::Forbidden("Only SUPERADMIN can modify SUPERADMIN"))?;
    }

    let roles = req
        .roles
        .map(|r| serde_json::to_string(&r).map(SqlValue::Json))
        .transpose()
        .map_err(anyhow::Error::from)?;

    let update = UpdateBuilder::new("users")
        .set("name", req.name.map(|n| n.trim().to_string()))
        .set("email", req.email.map(|e| e.trim().to_lowercase()))
        .set("roles", roles)
        .set("phone", req.phone)
        .set("ic_number", req.ic_number)
        .set("position", req.position)
        .set("is_active", req.is_active)
        .build("id", user_id)
        .ok_or_else(|| AppError::BadRequest("No fields provided for update".into()))?;

    execute_update(pool.get_ref(), update)
        .await
        .map_err(|e| AppError::from_unique(e, "Email already registered"))?;

    let user = fetch_user(pool.get_ref(), user_id).await?;
    info!(user_id, admin_id = auth.user_id, "User updated");

    Ok(HttpResponse::Ok().json(user))
}

/// Update the caller's own profile
#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Updated profile", body = User),
        (status = 400, description = "Validation error or empty update"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn update_me(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<UpdateProfile>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let req = payload.into_inner();

    let password = req.password.as_deref().map(hash_password).transpose()?;

    let update = UpdateBuilder::new("users")
        .set("name", req.name.map(|n| n.trim().to_string()))
        .set("phone", req.phone)
        .set("ic_number", req.ic_number)
        .set("position", req.position)
        .set("password", password)
        .build("id", auth.user_id)
        .ok_or_else(|| AppError::BadRequest("No fields provided for update".into()))?;

    execute_update(pool.get_ref(), update).await?;

    let user = fetch_user(pool.get_ref(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Deactivate a user
///
/// Accounts are never removed; attendance and evaluation history keep
/// pointing at them.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(
        ("id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deactivated"),
        (status = 400, description = "Cannot deactivate yourself"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let user_id = path.into_inner();
    if user_id == auth.user_id {
        return Err(AppError::BadRequest("Cannot deactivate your own account".into()));
    }

    let target = fetch_user(pool.get_ref(), user_id).await?;
    if target.roles.contains(&Role::Superadmin) {
        auth.require_any(&[Role::Superadmin])
            .map_err(|_| AppError::Forbidden("Only SUPERADMIN can modify SUPERADMIN"))?;
    }

    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await?;

    info!(user_id, admin_id = auth.user_id, "User deactivated");
    Ok(HttpResponse::NoContent().finish())
}
