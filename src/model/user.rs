use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;

use crate::model::role::Role;

/// Row of the `users` table, password hash included.
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub roles: Json<Vec<Role>>,
    pub phone: Option<String>,
    pub ic_number: Option<String>,
    pub position: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 12,
    "name": "Siti Aminah",
    "email": "siti@sekolah.edu.my",
    "roles": ["GURU"],
    "phone": "+60123456789",
    "icNumber": null,
    "position": "Guru Matematik",
    "isActive": true,
    "createdAt": "2025-01-01T00:00:00Z"
}))]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub phone: Option<String>,
    pub ic_number: Option<String>,
    pub position: Option<String>,
    pub is_active: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            roles: row.roles.0,
            phone: row.phone,
            ic_number: row.ic_number,
            position: row.position,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}
