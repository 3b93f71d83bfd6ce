use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    pub id: u64,
    #[schema(example = "5 Bestari")]
    pub name: String,
    #[schema(example = 5)]
    pub grade_level: i32,
    #[schema(example = "2025")]
    pub academic_year: String,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: u64,
    #[schema(example = "MT")]
    pub code: String,
    #[schema(example = "Matematik")]
    pub name: String,
}

/// Which teacher teaches which subject to which class in a given year.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeachingAssignment {
    pub id: u64,
    pub teacher_id: u64,
    pub class_id: u64,
    pub subject_id: u64,
    pub academic_year: String,
}
