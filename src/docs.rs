use crate::api::academic::{CreateAssignment, CreateClass, CreateSubject, UpdateClass, UpdateSubject};
use crate::api::attendance::{
    AttendanceListResponse, AttendanceReportResponse, ClockInReq, ClockOutReq, ManualEntryReq,
};
use crate::api::cerapan::{CreateTaskReq, SubmitReportReq};
use crate::api::user::{CreateUser, UpdateProfile, UpdateUser, UserListResponse};
use crate::model::academic::{SchoolClass, Subject, TeachingAssignment};
use crate::model::attendance::{AttendanceRecord, AttendanceType};
use crate::model::cerapan::{Answer, EvaluationReport, EvaluationTask, Question, TaskStatus};
use crate::model::role::Role;
use crate::model::settings::{
    AttendanceSetting, AttendanceSettingPatch, BasicInfo, BasicInfoPatch, NotificationSetting,
    NotificationSettingPatch, ObservationSetting, ObservationSettingPatch, SchoolSettings,
    SettingsPatch,
};
use crate::model::user::User;
use crate::models::{LoginReqDto, LoginResponse, LoginUser};
use crate::service::cerapan::TaskList;
use crate::service::report::{
    AttendanceSummary, DayGroup, FeedAction, FeedEntry, ReportDay, SortOrder, UserDay,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sekolah API",
        version = "1.0.0",
        description = r#"
## School Management Backend

Staff attendance, school configuration and teacher self-evaluation (Cerapan).

### 🔹 Key Features
- **Attendance**
  - Clock-in / clock-out with ON_TIME / LATE classification
  - Manual backfill by administrators
  - Day-grouped history and reports with derived absences
- **School Setting**
  - Single configuration document, partially updatable
- **Cerapan**
  - Evaluation tasks with a question snapshot and submitted reports
- **Users & Academic data**
  - Staff accounts, classes, subjects and teaching assignments

### 🔐 Security
Endpoints are protected using **JWT Bearer authentication**.
Roles: **GURU**, **PENTADBIR**, **SUPERADMIN**. Clock-in/out can be limited
to the school network.

### 📦 Response Format
- JSON with camelCase fields
- Errors as `{"error": KIND, "message": ...}`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::me,

        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::manual_entry,
        crate::api::attendance::list_all,
        crate::api::attendance::list_for_user,
        crate::api::attendance::today,
        crate::api::attendance::report,
        crate::api::attendance::delete_record,

        crate::api::settings::get_settings,
        crate::api::settings::update_settings,

        crate::api::cerapan::create_task,
        crate::api::cerapan::list_tasks,
        crate::api::cerapan::submit_report,
        crate::api::cerapan::get_report,

        crate::api::user::create_user,
        crate::api::user::list_users,
        crate::api::user::get_user,
        crate::api::user::update_user,
        crate::api::user::update_me,
        crate::api::user::delete_user,

        crate::api::academic::create_class,
        crate::api::academic::list_classes,
        crate::api::academic::update_class,
        crate::api::academic::delete_class,
        crate::api::academic::create_subject,
        crate::api::academic::list_subjects,
        crate::api::academic::update_subject,
        crate::api::academic::delete_subject,
        crate::api::academic::create_assignment,
        crate::api::academic::list_assignments,
        crate::api::academic::delete_assignment
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            LoginUser,
            Role,
            User,
            CreateUser,
            UpdateUser,
            UpdateProfile,
            UserListResponse,
            AttendanceType,
            AttendanceRecord,
            ClockInReq,
            ClockOutReq,
            ManualEntryReq,
            AttendanceListResponse,
            AttendanceReportResponse,
            SortOrder,
            FeedAction,
            FeedEntry,
            DayGroup,
            UserDay,
            ReportDay,
            AttendanceSummary,
            SchoolSettings,
            BasicInfo,
            ObservationSetting,
            AttendanceSetting,
            NotificationSetting,
            SettingsPatch,
            BasicInfoPatch,
            ObservationSettingPatch,
            AttendanceSettingPatch,
            NotificationSettingPatch,
            TaskStatus,
            Question,
            Answer,
            EvaluationTask,
            EvaluationReport,
            TaskList,
            CreateTaskReq,
            SubmitReportReq,
            SchoolClass,
            Subject,
            TeachingAssignment,
            CreateClass,
            UpdateClass,
            CreateSubject,
            UpdateSubject,
            CreateAssignment
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign-in and current profile"),
        (name = "Attendance", description = "Clock-in/out, history and reports"),
        (name = "School Setting", description = "School configuration document"),
        (name = "Cerapan", description = "Teacher self-evaluation"),
        (name = "Users", description = "Staff accounts"),
        (name = "Academic", description = "Classes, subjects and teaching assignments"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/attendance/clockin"));
        assert!(doc.paths.paths.contains_key("/api/school-setting"));
        assert!(doc.paths.paths.contains_key("/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/attendance/record/{id}"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
