use serde::Serialize;
use std::collections::HashSet;
use utoipa::ToSchema;
use validator::{ValidationError, ValidationErrors};

use crate::error::AppError;
use crate::model::cerapan::{
    Answer, EvaluationReport, EvaluationTask, NewReport, NewTask, TaskStatus,
};
use crate::service::ensure_active_user;
use crate::store::{CerapanStore, UserDirectory};

/// Highest score on the observation rubric.
pub const MAX_SCORE: u8 = 4;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    pub pending: Vec<EvaluationTask>,
    pub completed: Vec<EvaluationTask>,
}

fn invalid(field: &'static str, code: &'static str, message: String) -> ValidationErrors {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    errors
}

pub async fn create_task<S: CerapanStore + UserDirectory>(
    store: &S,
    task: NewTask,
) -> Result<EvaluationTask, AppError> {
    if task.questions.is_empty() {
        return Err(invalid("questions", "length", "At least one question is required".into()).into());
    }

    let mut seen = HashSet::new();
    if let Some(dup) = task.questions.iter().find(|q| !seen.insert(q.id.as_str())) {
        return Err(invalid("questions", "duplicate_id", format!("Duplicate question id {}", dup.id)).into());
    }

    ensure_active_user(store, task.teacher_id).await?;
    let created = store.insert_task(&task).await?;
    tracing::info!(task_id = created.id, teacher_id = created.teacher_id, "Cerapan task created");
    Ok(created)
}

pub async fn list_tasks<S: CerapanStore>(store: &S, teacher_id: u64) -> Result<TaskList, AppError> {
    let (completed, pending) = store
        .tasks_for_teacher(teacher_id)
        .await?
        .into_iter()
        .partition(|t| t.status == TaskStatus::Completed);

    Ok(TaskList { pending, completed })
}

/// Every snapshot question answered once, nothing outside the snapshot, scores in range.
pub fn check_answers(task: &EvaluationTask, answers: &[Answer]) -> Result<(), ValidationErrors> {
    let known: HashSet<&str> = task.questions.iter().map(|q| q.id.as_str()).collect();
    let mut given = HashSet::new();

    for answer in answers {
        if !known.contains(answer.question_id.as_str()) {
            return Err(invalid(
                "answers",
                "unknown_question",
                format!("Question {} is not part of this task", answer.question_id),
            ));
        }
        if !given.insert(answer.question_id.as_str()) {
            return Err(invalid(
                "answers",
                "duplicate_answer",
                format!("Question {} answered more than once", answer.question_id),
            ));
        }
        if answer.score > MAX_SCORE {
            return Err(invalid(
                "answers",
                "range",
                format!("Score for {} must be between 0 and {MAX_SCORE}", answer.question_id),
            ));
        }
    }

    let missing: Vec<&str> = task
        .questions
        .iter()
        .map(|q| q.id.as_str())
        .filter(|id| !given.contains(id))
        .collect();
    if !missing.is_empty() {
        return Err(invalid(
            "answers",
            "incomplete",
            format!("Unanswered questions: {}", missing.join(", ")),
        ));
    }

    Ok(())
}

pub async fn submit_report<S: CerapanStore>(
    store: &S,
    teacher_id: u64,
    task_id: u64,
    answers: Vec<Answer>,
) -> Result<EvaluationReport, AppError> {
    let task = store
        .find_task(task_id)
        .await?
        .ok_or(AppError::NotFound("Task"))?;

    if task.teacher_id != teacher_id {
        return Err(AppError::Forbidden("Task belongs to another teacher"));
    }
    if task.status == TaskStatus::Completed {
        return Err(AppError::BadRequest("Task already completed".to_string()));
    }
    check_answers(&task, &answers)?;

    let report = store
        .insert_report(&NewReport {
            task_id,
            teacher_id,
            answers,
        })
        .await?;

    tracing::info!(task_id, teacher_id, "Cerapan report submitted");
    Ok(report)
}

/// Report for a task; teachers see only their own, administrators see all.
pub async fn get_report<S: CerapanStore>(
    store: &S,
    caller_id: u64,
    is_admin: bool,
    task_id: u64,
) -> Result<EvaluationReport, AppError> {
    let task = store
        .find_task(task_id)
        .await?
        .ok_or(AppError::NotFound("Task"))?;

    if !is_admin && task.teacher_id != caller_id {
        return Err(AppError::Forbidden("Task belongs to another teacher"));
    }

    store
        .find_report(task_id)
        .await?
        .ok_or(AppError::NotFound("Report"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cerapan::Question;
    use crate::store::memory::MemoryStore;

    fn store() -> MemoryStore {
        MemoryStore::default().with_user(3, true).with_user(4, true)
    }

    fn new_task(teacher_id: u64, ids: &[&str]) -> NewTask {
        NewTask {
            teacher_id,
            template_id: "SKPMG2-4.1".to_string(),
            period: "2025-P1".to_string(),
            subject: "Matematik".to_string(),
            class_name: "5 Bestari".to_string(),
            questions: ids
                .iter()
                .map(|id| Question {
                    id: id.to_string(),
                    text: format!("Aspek {id}"),
                })
                .collect(),
        }
    }

    fn answer(id: &str, score: u8) -> Answer {
        Answer {
            question_id: id.to_string(),
            score,
            remark: None,
        }
    }

    #[actix_web::test]
    async fn fewer_answers_than_questions_is_rejected() {
        let store = store();
        let task = create_task(&store, new_task(3, &["Q1", "Q2", "Q3"])).await.unwrap();

        let err = submit_report(&store, 3, task.id, vec![answer("Q1", 3), answer("Q2", 4)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "VALIDATION");
        assert!(store.find_report(task.id).await.unwrap().is_none());

        let listed = list_tasks(&store, 3).await.unwrap();
        assert_eq!(listed.pending.len(), 1);
        assert!(listed.completed.is_empty());
    }

    #[actix_web::test]
    async fn complete_submission_completes_task() {
        let store = store();
        let task = create_task(&store, new_task(3, &["Q1", "Q2"])).await.unwrap();

        let report = submit_report(&store, 3, task.id, vec![answer("Q2", 2), answer("Q1", 4)])
            .await
            .unwrap();
        assert_eq!(report.answers.len(), 2);

        let listed = list_tasks(&store, 3).await.unwrap();
        assert!(listed.pending.is_empty());
        assert_eq!(listed.completed.len(), 1);

        let err = submit_report(&store, 3, task.id, vec![answer("Q1", 1), answer("Q2", 1)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "VALIDATION");
    }

    #[actix_web::test]
    async fn other_teachers_cannot_submit_or_read() {
        let store = store();
        let task = create_task(&store, new_task(3, &["Q1"])).await.unwrap();

        let err = submit_report(&store, 4, task.id, vec![answer("Q1", 1)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "FORBIDDEN");

        submit_report(&store, 3, task.id, vec![answer("Q1", 1)]).await.unwrap();
        assert_eq!(get_report(&store, 4, false, task.id).await.unwrap_err().kind(), "FORBIDDEN");
        assert!(get_report(&store, 4, true, task.id).await.is_ok());
    }

    #[actix_web::test]
    async fn missing_task_is_not_found() {
        let store = store();
        let err = submit_report(&store, 3, 99, vec![]).await.unwrap_err();
        assert_eq!(err.kind(), "NOT_FOUND");
    }

    #[actix_web::test]
    async fn task_needs_unique_questions() {
        let store = store();
        assert!(create_task(&store, new_task(3, &[])).await.is_err());
        assert!(create_task(&store, new_task(3, &["Q1", "Q1"])).await.is_err());
    }

    #[actix_web::test]
    async fn task_for_unknown_or_inactive_teacher_is_not_found() {
        let store = store().with_user(5, false);

        let err = create_task(&store, new_task(42, &["Q1"])).await.unwrap_err();
        assert_eq!(err.kind(), "NOT_FOUND");
        let err = create_task(&store, new_task(5, &["Q1"])).await.unwrap_err();
        assert_eq!(err.kind(), "NOT_FOUND");
        assert!(list_tasks(&store, 42).await.unwrap().pending.is_empty());
    }

    #[test]
    fn answers_outside_snapshot_or_range_are_rejected() {
        let task = EvaluationTask {
            id: 1,
            teacher_id: 3,
            template_id: "T".to_string(),
            period: "P".to_string(),
            subject: "S".to_string(),
            class_name: "C".to_string(),
            questions: vec![Question {
                id: "Q1".to_string(),
                text: "t".to_string(),
            }],
            status: TaskStatus::Pending,
            created_at: chrono::Utc::now(),
        };

        assert!(check_answers(&task, &[answer("Q1", 4)]).is_ok());
        assert!(check_answers(&task, &[answer("Q1", 5)]).is_err());
        assert!(check_answers(&task, &[answer("Q1", 1), answer("Q9", 1)]).is_err());
        assert!(check_answers(&task, &[answer("Q1", 1), answer("Q1", 2)]).is_err());
        assert!(check_answers(&task, &[]).is_err());
    }
}
