use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[schema(example = "Q1")]
    pub id: String,
    #[schema(example = "Objektif pembelajaran dinyatakan dengan jelas")]
    pub text: String,
}

/// A self-evaluation assignment. `questions` is a snapshot taken when the
/// task is created, so later template edits do not change what a teacher answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationTask {
    pub id: u64,
    pub teacher_id: u64,
    pub template_id: String,
    pub period: String,
    pub subject: String,
    pub class_name: String,
    pub questions: Vec<Question>,
    pub status: TaskStatus,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    #[schema(example = 3)]
    pub score: u8,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub id: u64,
    pub task_id: u64,
    pub teacher_id: u64,
    pub answers: Vec<Answer>,
    #[schema(format = "date-time", value_type = String)]
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub teacher_id: u64,
    pub template_id: String,
    pub period: String,
    pub subject: String,
    pub class_name: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub task_id: u64,
    pub teacher_id: u64,
    pub answers: Vec<Answer>,
}
