use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::academic::{SchoolClass, Subject, TeachingAssignment},
    utils::db_utils::{UpdateBuilder, execute_update},
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

// -------------------- Classes --------------------

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClass {
    #[validate(length(min = 1, max = 60))]
    #[schema(example = "5 Bestari")]
    pub name: String,
    #[validate(range(min = 1, max = 6))]
    #[schema(example = 5)]
    pub grade_level: i32,
    #[validate(length(min = 4, max = 9))]
    #[schema(example = "2025")]
    pub academic_year: String,
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClass {
    #[validate(length(min = 1, max = 60))]
    pub name: Option<String>,
    #[validate(range(min = 1, max = 6))]
    pub grade_level: Option<i32>,
    #[validate(length(min = 4, max = 9))]
    pub academic_year: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ClassQuery {
    pub academic_year: Option<String>,
}

async fn fetch_class(pool: &MySqlPool, id: u64) -> Result<SchoolClass, AppError> {
    sqlx::query_as::<_, SchoolClass>(
        "SELECT id, name, grade_level, academic_year FROM classes WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Class"))
}

#[utoipa::path(
    post,
    path = "/api/classes",
    request_body = CreateClass,
    responses(
        (status = 201, description = "Class created", body = SchoolClass),
        (status = 400, description = "Validation error"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only"),
        (status = 409, description = "Class already exists for that year")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Academic"
)]
pub async fn create_class(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateClass>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    payload.validate()?;

    let result = sqlx::query("INSERT INTO classes (name, grade_level, academic_year) VALUES (?, ?, ?)")
        .bind(payload.name.trim())
        .bind(payload.grade_level)
        .bind(payload.academic_year.trim())
        .execute(pool.get_ref())
        .await
        .map_err(|e| AppError::from_unique(e, "Class already exists for that academic year"))?;

    let class = fetch_class(pool.get_ref(), result.last_insert_id()).await?;
    Ok(HttpResponse::Created().json(class))
}

#[utoipa::path(
    get,
    path = "/api/classes",
    params(ClassQuery),
    responses(
        (status = 200, description = "Classes ordered by grade then name", body = [SchoolClass])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Academic"
)]
pub async fn list_classes(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ClassQuery>,
) -> Result<HttpResponse, AppError> {
    let classes = match &query.academic_year {
        Some(year) => {
            sqlx::query_as::<_, SchoolClass>(
                "SELECT id, name, grade_level, academic_year FROM classes \
                 WHERE academic_year = ? ORDER BY grade_level, name",
            )
            .bind(year)
            .fetch_all(pool.get_ref())
            .await?
        }
        None => {
            sqlx::query_as::<_, SchoolClass>(
                "SELECT id, name, grade_level, academic_year FROM classes \
                 ORDER BY academic_year DESC, grade_level, name",
            )
            .fetch_all(pool.get_ref())
            .await?
        }
    };

    Ok(HttpResponse::Ok().json(classes))
}

#[utoipa::path(
    put,
    path = "/api/classes/{id}",
    params(
        ("id" = u64, Path, description = "Class ID")
    ),
    request_body = UpdateClass,
    responses(
        (status = 200, description = "Updated class", body = SchoolClass),
        (status = 400, description = "Validation error or empty update"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only"),
        (status = 404, description = "Class not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Academic"
)]
pub async fn update_class(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateClass>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    payload.validate()?;

    let id = path.into_inner();
    fetch_class(pool.get_ref(), id).await?;

    let req = payload.into_inner();
    let update = UpdateBuilder::new("classes")
        .set("name", req.name)
        .set("grade_level", req.grade_level)
        .set("academic_year", req.academic_year)
        .build("id", id)
        .ok_or_else(|| AppError::BadRequest("No fields provided for update".into()))?;

    execute_update(pool.get_ref(), update)
        .await
        .map_err(|e| AppError::from_unique(e, "Class already exists for that academic year"))?;

    Ok(HttpResponse::Ok().json(fetch_class(pool.get_ref(), id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/classes/{id}",
    params(
        ("id" = u64, Path, description = "Class ID")
    ),
    responses(
        (status = 204, description = "Class deleted"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only"),
        (status = 404, description = "Class not found"),
        (status = 409, description = "Class still has teaching assignments")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Academic"
)]
pub async fn delete_class(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let id = path.into_inner();
    let result = sqlx::query("DELETE FROM classes WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| AppError::from_in_use(e, "Class still has teaching assignments"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Class"));
    }

    info!(class_id = id, admin_id = auth.user_id, "Class deleted");
    Ok(HttpResponse::NoContent().finish())
}

// -------------------- Subjects --------------------

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubject {
    #[validate(length(min = 1, max = 16))]
    #[schema(example = "MT")]
    pub code: String,
    #[validate(length(min = 1, max = 120))]
    #[schema(example = "Matematik")]
    pub name: String,
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubject {
    #[validate(length(min = 1, max = 16))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
}

async fn fetch_subject(pool: &MySqlPool, id: u64) -> Result<Subject, AppError> {
    sqlx::query_as::<_, Subject>("SELECT id, code, name FROM subjects WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Subject"))
}

#[utoipa::path(
    post,
    path = "/api/subjects",
    request_body = CreateSubject,
    responses(
        (status = 201, description = "Subject created", body = Subject),
        (status = 400, description = "Validation error"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only"),
        (status = 409, description = "Subject code already used")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Academic"
)]
pub async fn create_subject(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateSubject>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    payload.validate()?;

    let result = sqlx::query("INSERT INTO subjects (code, name) VALUES (?, ?)")
        .bind(payload.code.trim().to_uppercase())
        .bind(payload.name.trim())
        .execute(pool.get_ref())
        .await
        .map_err(|e| AppError::from_unique(e, "Subject code already used"))?;

    let subject = fetch_subject(pool.get_ref(), result.last_insert_id()).await?;
    Ok(HttpResponse::Created().json(subject))
}

#[utoipa::path(
    get,
    path = "/api/subjects",
    responses(
        (status = 200, description = "Subjects ordered by code", body = [Subject])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Academic"
)]
pub async fn list_subjects(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    let subjects = sqlx::query_as::<_, Subject>("SELECT id, code, name FROM subjects ORDER BY code")
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(subjects))
}

#[utoipa::path(
    put,
    path = "/api/subjects/{id}",
    params(
        ("id" = u64, Path, description = "Subject ID")
    ),
    request_body = UpdateSubject,
    responses(
        (status = 200, description = "Updated subject", body = Subject),
        (status = 400, description = "Validation error or empty update"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only"),
        (status = 404, description = "Subject not found"),
        (status = 409, description = "Subject code already used")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Academic"
)]
pub async fn update_subject(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateSubject>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    payload.validate()?;

    let id = path.into_inner();
    fetch_subject(pool.get_ref(), id).await?;

    let req = payload.into_inner();
    let update = UpdateBuilder::new("subjects")
        .set("code", req.code.map(|c| c.trim().to_uppercase()))
        .set("name", req.name)
        .build("id", id)
        .ok_or_else(|| AppError::BadRequest("No fields provided for update".into()))?;

    execute_update(pool.get_ref(), update)
        .await
        .map_err(|e| AppError::from_unique(e, "Subject code already used"))?;

    Ok(HttpResponse::Ok().json(fetch_subject(pool.get_ref(), id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/subjects/{id}",
    params(
        ("id" = u64, Path, description = "Subject ID")
    ),
    responses(
        (status = 204, description = "Subject deleted"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only"),
        (status = 404, description = "Subject not found"),
        (status = 409, description = "Subject still has teaching assignments")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Academic"
)]
pub async fn delete_subject(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let id = path.into_inner();
    let result = sqlx::query("DELETE FROM subjects WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| AppError::from_in_use(e, "Subject still has teaching assignments"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Subject"));
    }

    info!(subject_id = id, admin_id = auth.user_id, "Subject deleted");
    Ok(HttpResponse::NoContent().finish())
}

// -------------------- Teaching assignments --------------------

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignment {
    pub teacher_id: u64,
    pub class_id: u64,
    pub subject_id: u64,
    #[validate(length(min = 4, max = 9))]
    #[schema(example = "2025")]
    pub academic_year: String,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentQuery {
    /// Defaults to the caller for GURU
    pub teacher_id: Option<u64>,
    pub class_id: Option<u64>,
    pub academic_year: Option<String>,
}

const ASSIGNMENT_COLUMNS: &str = "id, teacher_id, class_id, subject_id, academic_year";

#[utoipa::path(
    post,
    path = "/api/assignments",
    request_body = CreateAssignment,
    responses(
        (status = 201, description = "Assignment created", body = TeachingAssignment),
        (status = 400, description = "Validation error or unknown teacher/class/subject"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only"),
        (status = 409, description = "Assignment already exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Academic"
)]
pub async fn create_assignment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateAssignment>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    payload.validate()?;

    let teacher_active: Option<bool> =
        sqlx::query_scalar("SELECT is_active FROM users WHERE id = ?")
            .bind(payload.teacher_id)
            .fetch_optional(pool.get_ref())
            .await?;
    if teacher_active != Some(true) {
        return Err(AppError::BadRequest("Teacher does not exist or is inactive".into()));
    }
    fetch_class(pool.get_ref(), payload.class_id).await?;
    fetch_subject(pool.get_ref(), payload.subject_id).await?;

    let result = sqlx::query(
        "INSERT INTO teaching_assignments (teacher_id, class_id, subject_id, academic_year) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(payload.teacher_id)
    .bind(payload.class_id)
    .bind(payload.subject_id)
    .bind(payload.academic_year.trim())
    .execute(pool.get_ref())
    .await
    .map_err(|e| AppError::from_unique(e, "Assignment already exists"))?;

    let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM teaching_assignments WHERE id = ?");
    let assignment = sqlx::query_as::<_, TeachingAssignment>(&sql)
        .bind(result.last_insert_id())
        .fetch_one(pool.get_ref())
        .await?;

    Ok(HttpResponse::Created().json(assignment))
}

#[utoipa::path(
    get,
    path = "/api/assignments",
    params(AssignmentQuery),
    responses(
        (status = 200, description = "Matching assignments", body = [TeachingAssignment]),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Academic"
)]
pub async fn list_assignments(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AssignmentQuery>,
) -> Result<HttpResponse, AppError> {
    let teacher_id = if auth.is_admin() {
        query.teacher_id
    } else {
        let id = query.teacher_id.unwrap_or(auth.user_id);
        auth.require_self_or_admin(id)?;
        Some(id)
    };

    let mut conditions = Vec::new();
    if teacher_id.is_some() {
        conditions.push("teacher_id = ?");
    }
    if query.class_id.is_some() {
        conditions.push("class_id = ?");
    }
    if query.academic_year.is_some() {
        conditions.push("academic_year = ?");
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM teaching_assignments {where_clause} ORDER BY id");

    let mut q = sqlx::query_as::<_, TeachingAssignment>(&sql);
    if let Some(id) = teacher_id {
        q = q.bind(id);
    }
    if let Some(id) = query.class_id {
        q = q.bind(id);
    }
    if let Some(year) = &query.academic_year {
        q = q.bind(year);
    }

    let assignments = q.fetch_all(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(assignments))
}

#[utoipa::path(
    delete,
    path = "/api/assignments/{id}",
    params(
        ("id" = u64, Path, description = "Assignment ID")
    ),
    responses(
        (status = 204, description = "Assignment deleted"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only"),
        (status = 404, description = "Assignment not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Academic"
)]
pub async fn delete_assignment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let result = sqlx::query("DELETE FROM teaching_assignments WHERE id = ?")
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Assignment"));
    }

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn class_grade_above_six_is_rejected() {
        let req: CreateClass = serde_json::from_value(json!({
            "name": "7 Cerdik",
            "gradeLevel": 7,
            "academicYear": "2025"
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("grade_level"));
    }

    #[test]
    fn partial_class_update_validates_only_present_fields() {
        let req: UpdateClass = serde_json::from_value(json!({ "name": "5 Bijak" })).unwrap();
        assert!(req.validate().is_ok());

        let req: UpdateClass = serde_json::from_value(json!({ "name": "" })).unwrap();
        assert!(req.validate().is_err());
    }
}
