use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{MySqlPool, types::Json};

use crate::error::AppError;
use crate::model::{
    attendance::{AttendanceRecord, AttendanceUpsert},
    cerapan::{Answer, EvaluationReport, EvaluationTask, NewReport, NewTask, Question, TaskStatus},
    settings::{
        AttendanceSetting, BasicInfo, NotificationSetting, ObservationSetting, SETTINGS_ID,
        SchoolSettings, SettingsPatch,
    },
};
use crate::store::{AttendanceStore, CerapanStore, SettingsStore, UserDirectory};

/// Repository implementation over the shared MySQL pool.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/* =========================
Attendance
========================= */

#[derive(sqlx::FromRow)]
struct AttendanceRow {
    id: u64,
    user_id: u64,
    attendance_date: NaiveDate,
    time_in: Option<DateTime<Utc>>,
    time_out: Option<DateTime<Utc>>,
    attendance_type: Option<String>,
}

impl From<AttendanceRow> for AttendanceRecord {
    fn from(row: AttendanceRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            attendance_date: row.attendance_date,
            time_in: row.time_in,
            time_out: row.time_out,
            attendance_type: row.attendance_type.and_then(|t| t.parse().ok()),
        }
    }
}

const ATTENDANCE_COLUMNS: &str =
    "id, user_id, attendance_date, time_in, time_out, attendance_type";

impl AttendanceStore for MySqlStore {
    async fn find_for_day(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE user_id = ? AND attendance_date = ?"
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn upsert(&self, entry: &AttendanceUpsert) -> Result<AttendanceRecord, AppError> {
        sqlx::query(
            r#"
            INSERT INTO attendance (user_id, attendance_date, time_in, time_out, attendance_type)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                time_in = VALUES(time_in),
                time_out = VALUES(time_out),
                attendance_type = VALUES(attendance_type)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.attendance_date)
        .bind(entry.time_in)
        .bind(entry.time_out)
        .bind(entry.attendance_type.map(|t| t.to_string()))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_missing_parent(e, "User"))?;

        self.find_for_day(entry.user_id, entry.attendance_date)
            .await?
            .ok_or(AppError::NotFound("Attendance"))
    }

    async fn find_in_range(
        &self,
        user_id: Option<u64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let rows = match user_id {
            Some(user_id) => {
                let sql = format!(
                    "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
                     WHERE user_id = ? AND attendance_date BETWEEN ? AND ? \
                     ORDER BY attendance_date, id"
                );
                sqlx::query_as::<_, AttendanceRow>(&sql)
                    .bind(user_id)
                    .bind(start)
                    .bind(end)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
                     WHERE attendance_date BETWEEN ? AND ? \
                     ORDER BY attendance_date, user_id"
                );
                sqlx::query_as::<_, AttendanceRow>(&sql)
                    .bind(start)
                    .bind(end)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: u64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/* =========================
School settings
========================= */

#[derive(sqlx::FromRow)]
struct SettingsRow {
    basic_info: Json<BasicInfo>,
    observation_setting: Json<ObservationSetting>,
    attendance_setting: Json<AttendanceSetting>,
    notification_setting: Json<NotificationSetting>,
}

impl From<SettingsRow> for SchoolSettings {
    fn from(r: SettingsRow) -> Self {
        Self {
            basic_info: r.basic_info.0,
            observation_setting: r.observation_setting.0,
            attendance_setting: r.attendance_setting.0,
            notification_setting: r.notification_setting.0,
        }
    }
}

impl SettingsStore for MySqlStore {
    async fn load(&self) -> Result<Option<SchoolSettings>, AppError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            SELECT basic_info, observation_setting, attendance_setting, notification_setting
            FROM school_settings
            WHERE id = ?
            "#,
        )
        .bind(SETTINGS_ID)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SchoolSettings::from))
    }

    async fn insert_if_absent(&self, defaults: &SchoolSettings) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT IGNORE INTO school_settings
                (id, basic_info, observation_setting, attendance_setting, notification_setting)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(SETTINGS_ID)
        .bind(Json(&defaults.basic_info))
        .bind(Json(&defaults.observation_setting))
        .bind(Json(&defaults.attendance_setting))
        .bind(Json(&defaults.notification_setting))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn apply_patch(&self, patch: &SettingsPatch) -> Result<Option<SchoolSettings>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serialises concurrent patches; each one merges into the latest document.
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            SELECT basic_info, observation_setting, attendance_setting, notification_setting
            FROM school_settings
            WHERE id = ?
            FOR UPDATE
            "#,
        )
        .bind(SETTINGS_ID)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = row.map(SchoolSettings::from) else {
            return Ok(None);
        };
        let next = current.merged(patch)?;

        sqlx::query(
            r#"
            UPDATE school_settings
            SET basic_info = ?, observation_setting = ?, attendance_setting = ?, notification_setting = ?
            WHERE id = ?
            "#,
        )
        .bind(Json(&next.basic_info))
        .bind(Json(&next.observation_setting))
        .bind(Json(&next.attendance_setting))
        .bind(Json(&next.notification_setting))
        .bind(SETTINGS_ID)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(next))
    }
}

/* =========================
Users
========================= */

impl UserDirectory for MySqlStore {
    async fn is_active_user(&self, user_id: u64) -> Result<bool, AppError> {
        let active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(active == Some(true))
    }

    async fn active_user_ids(&self) -> Result<Vec<u64>, AppError> {
        let ids = sqlx::query_scalar::<_, u64>(
            "SELECT id FROM users WHERE is_active = TRUE ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

/* =========================
Cerapan
========================= */

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: u64,
    teacher_id: u64,
    template_id: String,
    period: String,
    subject: String,
    class_name: String,
    questions: Json<Vec<Question>>,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<TaskRow> for EvaluationTask {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            teacher_id: row.teacher_id,
            template_id: row.template_id,
            period: row.period,
            subject: row.subject,
            class_name: row.class_name,
            questions: row.questions.0,
            status: row.status.parse().unwrap_or(TaskStatus::Pending),
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReportRow {
    id: u64,
    task_id: u64,
    teacher_id: u64,
    answers: Json<Vec<Answer>>,
    submitted_at: DateTime<Utc>,
}

impl From<ReportRow> for EvaluationReport {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            task_id: row.task_id,
            teacher_id: row.teacher_id,
            answers: row.answers.0,
            submitted_at: row.submitted_at,
        }
    }
}

const TASK_COLUMNS: &str =
    "id, teacher_id, template_id, period, subject, class_name, questions, status, created_at";

impl CerapanStore for MySqlStore {
    async fn insert_task(&self, task: &NewTask) -> Result<EvaluationTask, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO cerapan_tasks
                (teacher_id, template_id, period, subject, class_name, questions, status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task.teacher_id)
        .bind(&task.template_id)
        .bind(&task.period)
        .bind(&task.subject)
        .bind(&task.class_name)
        .bind(Json(&task.questions))
        .bind(TaskStatus::Pending.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from_missing_parent(e, "User") {
            AppError::Database(e) => AppError::from_unique(e, "Task already exists for this period"),
            mapped => mapped,
        })?;

        self.find_task(result.last_insert_id())
            .await?
            .ok_or(AppError::NotFound("Task"))
    }

    async fn find_task(&self, id: u64) -> Result<Option<EvaluationTask>, AppError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM cerapan_tasks WHERE id = ?");
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn tasks_for_teacher(&self, teacher_id: u64) -> Result<Vec<EvaluationTask>, AppError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM cerapan_tasks WHERE teacher_id = ? ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(teacher_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_report(&self, report: &NewReport) -> Result<EvaluationReport, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO cerapan_reports (task_id, teacher_id, answers)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(report.task_id)
        .bind(report.teacher_id)
        .bind(Json(&report.answers))
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique(e, "Report already submitted"))?;

        sqlx::query("UPDATE cerapan_tasks SET status = ? WHERE id = ?")
            .bind(TaskStatus::Completed.to_string())
            .bind(report.task_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.find_report(report.task_id)
            .await?
            .ok_or(AppError::NotFound("Report"))
    }

    async fn find_report(&self, task_id: u64) -> Result<Option<EvaluationReport>, AppError> {
        let row = sqlx::query_as::<_, ReportRow>(
            r#"
            SELECT id, task_id, teacher_id, answers, submitted_at
            FROM cerapan_reports
            WHERE task_id = ?
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
