use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::cerapan::{Answer, NewTask, Question};
use crate::service::cerapan as svc;
use crate::store::MySqlStore;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskReq {
    #[schema(example = 12)]
    pub teacher_id: u64,
    #[validate(length(min = 1, max = 64))]
    #[schema(example = "SKPMG2-4.1")]
    pub template_id: String,
    #[validate(length(min = 1, max = 32))]
    #[schema(example = "2025-P1")]
    pub period: String,
    #[validate(length(min = 1, max = 120))]
    #[schema(example = "Matematik")]
    pub subject: String,
    #[validate(length(min = 1, max = 120))]
    #[schema(example = "5 Bestari")]
    pub class_name: String,
    pub questions: Vec<Question>,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitReportReq {
    pub answers: Vec<Answer>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    /// Administrators may list another teacher's tasks
    pub teacher_id: Option<u64>,
}

/// Assign a self-evaluation task to a teacher
#[utoipa::path(
    post,
    path = "/api/cerapan/tasks",
    request_body = CreateTaskReq,
    responses(
        (status = 201, description = "Task created", body = EvaluationTask),
        (status = 400, description = "Validation error"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only"),
        (status = 404, description = "Teacher not found or inactive")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Cerapan"
)]
pub async fn create_task(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    payload: web::Json<CreateTaskReq>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    payload.validate()?;

    let req = payload.into_inner();
    let task = svc::create_task(
        store.get_ref(),
        NewTask {
            teacher_id: req.teacher_id,
            template_id: req.template_id,
            period: req.period,
            subject: req.subject,
            class_name: req.class_name,
            questions: req.questions,
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(task))
}

/// Pending and completed tasks of a teacher
#[utoipa::path(
    get,
    path = "/api/cerapan/tasks",
    params(TaskQuery),
    responses(
        (status = 200, description = "Task list", body = TaskList),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Cerapan"
)]
pub async fn list_tasks(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    query: web::Query<TaskQuery>,
) -> Result<HttpResponse, AppError> {
    let teacher_id = query.teacher_id.unwrap_or(auth.user_id);
    auth.require_self_or_admin(teacher_id)?;

    let tasks = svc::list_tasks(store.get_ref(), teacher_id).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Submit answers for every question of a task
#[utoipa::path(
    post,
    path = "/api/cerapan/tasks/{id}/report",
    params(
        ("id" = u64, Path, description = "Task ID")
    ),
    request_body = SubmitReportReq,
    responses(
        (status = 201, description = "Report accepted", body = EvaluationReport),
        (status = 400, description = "Unanswered or unknown questions"),
        (status = 403, description = "Task belongs to another teacher"),
        (status = 404, description = "Task not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Cerapan"
)]
pub async fn submit_report(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    path: web::Path<u64>,
    payload: web::Json<SubmitReportReq>,
) -> Result<HttpResponse, AppError> {
    let report = svc::submit_report(
        store.get_ref(),
        auth.user_id,
        path.into_inner(),
        payload.into_inner().answers,
    )
    .await?;

    Ok(HttpResponse::Created().json(report))
}

/// Submitted report of a task
#[utoipa::path(
    get,
    path = "/api/cerapan/tasks/{id}/report",
    params(
        ("id" = u64, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Report", body = EvaluationReport),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Task or report not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Cerapan"
)]
pub async fn get_report(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let report =
        svc::get_report(store.get_ref(), auth.user_id, auth.is_admin(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}
