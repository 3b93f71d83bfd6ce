use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::AppError;
use crate::model::attendance::AttendanceRecord;
use crate::service::attendance as svc;
use crate::service::report::{
    AttendanceSummary, DayGroup, ReportDay, SortOrder, build_report, group_feed, summarize,
};
use crate::store::{AttendanceStore, SettingsStore, UserDirectory};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Storage the attendance routes run against.
pub trait AttendanceBackend: AttendanceStore + SettingsStore + UserDirectory + 'static {}

impl<T> AttendanceBackend for T where T: AttendanceStore + SettingsStore + UserDirectory + 'static {}

#[derive(Deserialize, ToSchema)]
pub struct ClockInReq {
    #[serde(rename = "userID")]
    #[schema(example = 12)]
    pub user_id: u64,
    /// Defaults to the server clock when omitted.
    #[serde(rename = "clockInTime")]
    #[schema(example = "2025-01-02T08:14:00+08:00", format = "date-time", value_type = Option<String>)]
    pub clock_in_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct ClockOutReq {
    #[serde(rename = "userID")]
    #[schema(example = 12)]
    pub user_id: u64,
    #[serde(rename = "clockOutTime")]
    #[schema(example = "2025-01-02T17:05:00+08:00", format = "date-time", value_type = Option<String>)]
    pub clock_out_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct ManualEntryReq {
    #[serde(rename = "userID")]
    #[schema(example = 12)]
    pub user_id: u64,
    #[schema(example = "2025-01-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[serde(rename = "clockInTime")]
    #[schema(example = "2025-01-02T07:58:00+08:00", format = "date-time", value_type = String)]
    pub clock_in_time: DateTime<Utc>,
    #[serde(rename = "clockOutTime")]
    #[schema(example = "2025-01-02T17:00:00+08:00", format = "date-time", value_type = String)]
    pub clock_out_time: DateTime<Utc>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    #[param(example = "2025-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[param(example = "2025-01-31", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    /// Day ordering of the grouped feed, `desc` by default
    pub order: Option<SortOrder>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    #[param(example = "2025-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[param(example = "2025-01-03", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    /// Limit to one user; administrators get every active user otherwise
    pub user_id: Option<u64>,
    pub order: Option<SortOrder>,
}

/// Longest range a report may span.
const MAX_REPORT_DAYS: i64 = 366;

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceRecord>,
    /// The same records grouped by day with IN/OUT entries
    pub days: Vec<DayGroup>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceReportResponse {
    /// Every day of the range; users without a record that day are ABSENT.
    /// Absence is derived for display and never stored.
    pub days: Vec<ReportDay>,
    pub summary: Vec<AttendanceSummary>,
}

/// Clock-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/clockin",
    request_body = ClockInReq,
    responses(
        (status = 200, description = "Clocked in", body = AttendanceRecord),
        (status = 400, description = "Already clocked in today", body = Object, example = json!({
            "error": "ALREADY_CLOCKED_IN",
            "message": "Already clocked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden (role or IP allow-list)"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_in<S: AttendanceBackend>(
    auth: AuthUser,
    store: web::Data<S>,
    config: web::Data<Config>,
    payload: web::Json<ClockInReq>,
) -> Result<HttpResponse, AppError> {
    auth.require_self_or_admin(payload.user_id)?;

    let at = payload.clock_in_time.unwrap_or_else(Utc::now);
    let record = svc::clock_in(store.get_ref(), payload.user_id, at, config.school_offset).await?;

    Ok(HttpResponse::Ok().json(record))
}

/// Clock-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance/clockout",
    request_body = ClockOutReq,
    responses(
        (status = 200, description = "Clocked out", body = AttendanceRecord),
        (status = 400, description = "No active clock-in found for today", body = Object, example = json!({
            "error": "NOT_CLOCKED_IN",
            "message": "No active clock-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden (role or IP allow-list)"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_out<S: AttendanceBackend>(
    auth: AuthUser,
    store: web::Data<S>,
    config: web::Data<Config>,
    payload: web::Json<ClockOutReq>,
) -> Result<HttpResponse, AppError> {
    auth.require_self_or_admin(payload.user_id)?;

    let at = payload.clock_out_time.unwrap_or_else(Utc::now);
    let record = svc::clock_out(store.get_ref(), payload.user_id, at, config.school_offset).await?;

    Ok(HttpResponse::Ok().json(record))
}

/// Administrator backfill of a whole day
#[utoipa::path(
    post,
    path = "/api/attendance/manual",
    request_body = ManualEntryReq,
    responses(
        (status = 200, description = "Entry saved", body = AttendanceRecord),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only"),
        (status = 404, description = "User not found or inactive")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn manual_entry<S: AttendanceBackend>(
    auth: AuthUser,
    store: web::Data<S>,
    config: web::Data<Config>,
    payload: web::Json<ManualEntryReq>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let record = svc::manual_entry(
        store.get_ref(),
        payload.user_id,
        payload.date,
        payload.clock_in_time,
        payload.clock_out_time,
        config.school_offset,
    )
    .await?;

    tracing::info!(admin_id = auth.user_id, user_id = payload.user_id, "Manual attendance recorded");
    Ok(HttpResponse::Ok().json(record))
}

/// Attendance of every user in a date range
#[utoipa::path(
    get,
    path = "/api/attendance/all",
    params(RangeQuery),
    responses(
        (status = 200, description = "Records in range", body = AttendanceListResponse),
        (status = 400, description = "startDate after endDate"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_all<S: AttendanceBackend>(
    auth: AuthUser,
    store: web::Data<S>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let data = svc::range_query(store.get_ref(), None, query.start_date, query.end_date).await?;
    let days = group_feed(&data, query.order.unwrap_or_default());

    Ok(HttpResponse::Ok().json(AttendanceListResponse { data, days }))
}

/// Attendance of one user in a date range
#[utoipa::path(
    get,
    path = "/api/attendance/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID"),
        RangeQuery
    ),
    responses(
        (status = 200, description = "Records in range", body = AttendanceListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_for_user<S: AttendanceBackend>(
    auth: AuthUser,
    store: web::Data<S>,
    path: web::Path<u64>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    auth.require_self_or_admin(user_id)?;

    let data =
        svc::range_query(store.get_ref(), Some(user_id), query.start_date, query.end_date).await?;
    let days = group_feed(&data, query.order.unwrap_or_default());

    Ok(HttpResponse::Ok().json(AttendanceListResponse { data, days }))
}

/// Today's record of a user, `null` when not clocked in yet
#[utoipa::path(
    get,
    path = "/api/attendance/{user_id}/today",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Today's record or null", body = AttendanceRecord),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today<S: AttendanceBackend>(
    auth: AuthUser,
    store: web::Data<S>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    auth.require_self_or_admin(user_id)?;

    let record = svc::today(store.get_ref(), user_id, Utc::now(), config.school_offset).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Day-by-day report with derived absences and per-user totals
#[utoipa::path(
    get,
    path = "/api/attendance/report",
    params(ReportQuery),
    responses(
        (status = 200, description = "Report", body = AttendanceReportResponse),
        (status = 400, description = "startDate after endDate"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn report<S: AttendanceBackend>(
    auth: AuthUser,
    store: web::Data<S>,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, AppError> {
    if (query.end_date - query.start_date).num_days() > MAX_REPORT_DAYS {
        return Err(AppError::BadRequest(format!(
            "Report range cannot exceed {MAX_REPORT_DAYS} days"
        )));
    }

    let user_ids: Vec<u64> = match query.user_id {
        Some(user_id) => {
            auth.require_self_or_admin(user_id)?;
            vec![user_id]
        }
        None if auth.is_admin() => store.active_user_ids().await?,
        None => vec![auth.user_id],
    };

    let records = svc::range_query(
        store.get_ref(),
        query.user_id.or((!auth.is_admin()).then_some(auth.user_id)),
        query.start_date,
        query.end_date,
    )
    .await?;

    let order = query.order.unwrap_or_default();
    let days = build_report(&user_ids, &records, query.start_date, query.end_date, order);
    let summary = summarize(&user_ids, &days);

    Ok(HttpResponse::Ok().json(AttendanceReportResponse { days, summary }))
}

/// Remove a stored record
#[utoipa::path(
    delete,
    path = "/api/attendance/record/{id}",
    params(
        ("id" = u64, Path, description = "Attendance record ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 403, description = "PENTADBIR/SUPERADMIN only"),
        (status = 404, description = "Attendance not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn delete_record<S: AttendanceBackend>(
    auth: AuthUser,
    store: web::Data<S>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let id = path.into_inner();
    if !store.delete(id).await? {
        return Err(AppError::NotFound("Attendance"));
    }

    tracing::info!(admin_id = auth.user_id, id, "Attendance record deleted");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Successfully deleted"
    })))
}
