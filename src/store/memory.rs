use chrono::{NaiveDate, Utc};
use std::sync::Mutex;

use crate::error::AppError;
use crate::model::{
    attendance::{AttendanceRecord, AttendanceUpsert},
    cerapan::{EvaluationReport, EvaluationTask, NewReport, NewTask, TaskStatus},
    settings::{SchoolSettings, SettingsPatch},
};
use crate::store::{AttendanceStore, CerapanStore, SettingsStore, UserDirectory};

/// In-process store for service tests.
#[derive(Default)]
pub struct MemoryStore {
    /// `(user id, is_active)`
    users: Mutex<Vec<(u64, bool)>>,
    attendance: Mutex<Vec<AttendanceRecord>>,
    settings: Mutex<Option<SchoolSettings>>,
    tasks: Mutex<Vec<EvaluationTask>>,
    reports: Mutex<Vec<EvaluationReport>>,
}

impl MemoryStore {
    pub fn with_settings(settings: SchoolSettings) -> Self {
        let store = Self::default();
        *store.settings.lock().unwrap() = Some(settings);
        store
    }

    /// Registers a staff account for the existence and active checks.
    pub fn with_user(self, user_id: u64, is_active: bool) -> Self {
        self.users.lock().unwrap().push((user_id, is_active));
        self
    }

    pub fn attendance_rows(&self) -> Vec<AttendanceRecord> {
        self.attendance.lock().unwrap().clone()
    }
}

impl AttendanceStore for MemoryStore {
    async fn find_for_day(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        Ok(self
            .attendance
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user_id == user_id && r.attendance_date == date)
            .cloned())
    }

    async fn upsert(&self, entry: &AttendanceUpsert) -> Result<AttendanceRecord, AppError> {
        let mut rows = self.attendance.lock().unwrap();
        let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;

        let record = match rows
            .iter()
            .position(|r| r.user_id == entry.user_id && r.attendance_date == entry.attendance_date)
        {
            Some(i) => {
                let existing = &mut rows[i];
                existing.time_in = entry.time_in;
                existing.time_out = entry.time_out;
                existing.attendance_type = entry.attendance_type;
                existing.clone()
            }
            None => {
                let record = AttendanceRecord {
                    id: next_id,
                    user_id: entry.user_id,
                    attendance_date: entry.attendance_date,
                    time_in: entry.time_in,
                    time_out: entry.time_out,
                    attendance_type: entry.attendance_type,
                };
                rows.push(record.clone());
                record
            }
        };

        Ok(record)
    }

    async fn find_in_range(
        &self,
        user_id: Option<u64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        Ok(self
            .attendance
            .lock()
            .unwrap()
            .iter()
            .filter(|r| user_id.is_none_or(|id| r.user_id == id))
            .filter(|r| r.attendance_date >= start && r.attendance_date <= end)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: u64) -> Result<bool, AppError> {
        let mut rows = self.attendance.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.id != id);
        Ok(rows.len() != before)
    }
}

impl SettingsStore for MemoryStore {
    async fn load(&self) -> Result<Option<SchoolSettings>, AppError> {
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn insert_if_absent(&self, defaults: &SchoolSettings) -> Result<(), AppError> {
        self.settings
            .lock()
            .unwrap()
            .get_or_insert_with(|| defaults.clone());
        Ok(())
    }

    async fn apply_patch(&self, patch: &SettingsPatch) -> Result<Option<SchoolSettings>, AppError> {
        let mut slot = self.settings.lock().unwrap();
        let Some(current) = slot.as_ref() else {
            return Ok(None);
        };
        let next = current.merged(patch)?;
        *slot = Some(next.clone());
        Ok(Some(next))
    }
}

impl UserDirectory for MemoryStore {
    async fn is_active_user(&self, user_id: u64) -> Result<bool, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .any(|&(id, active)| id == user_id && active))
    }

    async fn active_user_ids(&self) -> Result<Vec<u64>, AppError> {
        let mut ids: Vec<u64> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, active)| *active)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

impl CerapanStore for MemoryStore {
    async fn insert_task(&self, task: &NewTask) -> Result<EvaluationTask, AppError> {
        let mut tasks = self.tasks.lock().unwrap();
        let stored = EvaluationTask {
            id: tasks.len() as u64 + 1,
            teacher_id: task.teacher_id,
            template_id: task.template_id.clone(),
            period: task.period.clone(),
            subject: task.subject.clone(),
            class_name: task.class_name.clone(),
            questions: task.questions.clone(),
            status: TaskStatus::Pending,
            created_at: Utc::now(),
        };
        tasks.push(stored.clone());
        Ok(stored)
    }

    async fn find_task(&self, id: u64) -> Result<Option<EvaluationTask>, AppError> {
        Ok(self.tasks.lock().unwrap().iter().find(|t| t.id == id).cloned())
    }

    async fn tasks_for_teacher(&self, teacher_id: u64) -> Result<Vec<EvaluationTask>, AppError> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.teacher_id == teacher_id)
            .cloned()
            .collect())
    }

    async fn insert_report(&self, report: &NewReport) -> Result<EvaluationReport, AppError> {
        let mut reports = self.reports.lock().unwrap();
        if reports.iter().any(|r| r.task_id == report.task_id) {
            return Err(AppError::Conflict("Report already submitted".to_string()));
        }

        let stored = EvaluationReport {
            id: reports.len() as u64 + 1,
            task_id: report.task_id,
            teacher_id: report.teacher_id,
            answers: report.answers.clone(),
            submitted_at: Utc::now(),
        };
        reports.push(stored.clone());

        if let Some(task) = self
            .tasks
            .lock()
            .unwrap()
            .iter_mut()
            .find(|t| t.id == report.task_id)
        {
            task.status = TaskStatus::Completed;
        }

        Ok(stored)
    }

    async fn find_report(&self, task_id: u64) -> Result<Option<EvaluationReport>, AppError> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.task_id == task_id)
            .cloned())
    }
}
