//! Repository traits the services are written against.
//!
//! `MySqlStore` backs the running server; tests swap in `MemoryStore`.

use chrono::NaiveDate;

use crate::error::AppError;
use crate::model::{
    attendance::{AttendanceRecord, AttendanceUpsert},
    cerapan::{EvaluationReport, EvaluationTask, NewReport, NewTask},
    settings::{SchoolSettings, SettingsPatch},
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

pub use mysql::MySqlStore;

pub trait AttendanceStore {
    async fn find_for_day(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError>;

    /// Insert or overwrite the record keyed by (`user_id`, `attendance_date`).
    async fn upsert(&self, entry: &AttendanceUpsert) -> Result<AttendanceRecord, AppError>;

    /// Records with `attendance_date` in `[start, end]`; `None` means every user.
    async fn find_in_range(
        &self,
        user_id: Option<u64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError>;

    async fn delete(&self, id: u64) -> Result<bool, AppError>;
}

pub trait SettingsStore {
    async fn load(&self) -> Result<Option<SchoolSettings>, AppError>;

    /// Stores `defaults` unless a document already exists.
    async fn insert_if_absent(&self, defaults: &SchoolSettings) -> Result<(), AppError>;

    /// Merges `patch` into the stored document as one atomic step and returns the result.
    /// `None` when no document exists yet.
    async fn apply_patch(&self, patch: &SettingsPatch) -> Result<Option<SchoolSettings>, AppError>;
}

/// Lookups against the staff accounts.
pub trait UserDirectory {
    async fn is_active_user(&self, user_id: u64) -> Result<bool, AppError>;

    async fn active_user_ids(&self) -> Result<Vec<u64>, AppError>;
}

pub trait CerapanStore {
    async fn insert_task(&self, task: &NewTask) -> Result<EvaluationTask, AppError>;

    async fn find_task(&self, id: u64) -> Result<Option<EvaluationTask>, AppError>;

    async fn tasks_for_teacher(&self, teacher_id: u64) -> Result<Vec<EvaluationTask>, AppError>;

    /// Stores the report and marks its task completed.
    async fn insert_report(&self, report: &NewReport) -> Result<EvaluationReport, AppError>;

    async fn find_report(&self, task_id: u64) -> Result<Option<EvaluationReport>, AppError>;
}
