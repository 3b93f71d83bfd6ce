use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Already clocked in today")]
    AlreadyClockedIn,

    #[error("No active clock-in found for today")]
    NotClockedIn,

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Machine-readable kind carried in the `error` field of the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => "VALIDATION",
            AppError::AlreadyClockedIn => "ALREADY_CLOCKED_IN",
            AppError::NotClockedIn => "NOT_CLOCKED_IN",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Database(_) | AppError::Internal(_) => "INTERNAL",
        }
    }

    /// Maps a duplicate-key violation to `Conflict`, anything else to `Database`.
    pub fn from_unique(e: sqlx::Error, message: &str) -> Self {
        match Constraint::of(&e) {
            Some(Constraint::Duplicate) => AppError::Conflict(message.to_string()),
            _ => AppError::Database(e),
        }
    }

    /// Maps a delete blocked by child rows to `Conflict`.
    pub fn from_in_use(e: sqlx::Error, message: &str) -> Self {
        match Constraint::of(&e) {
            Some(Constraint::InUse) => AppError::Conflict(message.to_string()),
            _ => AppError::Database(e),
        }
    }

    /// Maps an insert pointing at a missing parent row to `NotFound`.
    pub fn from_missing_parent(e: sqlx::Error, entity: &'static str) -> Self {
        match Constraint::of(&e) {
            Some(Constraint::MissingParent) => AppError::NotFound(entity),
            _ => AppError::Database(e),
        }
    }
}

/// MySQL integrity violations that callers turn into client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Constraint {
    Duplicate,
    InUse,
    MissingParent,
}

impl Constraint {
    fn of(e: &sqlx::Error) -> Option<Self> {
        let sqlx::Error::Database(db_err) = e else {
            return None;
        };
        db_err
            .try_downcast_ref::<MySqlDatabaseError>()
            .and_then(|m| Self::from_number(m.number()))
    }

    fn from_number(number: u16) -> Option<Self> {
        match number {
            // ER_DUP_ENTRY
            1062 => Some(Self::Duplicate),
            // ER_ROW_IS_REFERENCED(_2)
            1217 | 1451 => Some(Self::InUse),
            // ER_NO_REFERENCED_ROW(_2)
            1216 | 1452 => Some(Self::MissingParent),
            _ => None,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::AlreadyClockedIn
            | AppError::NotClockedIn => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(errors) => json!({
                "error": self.kind(),
                "message": self.to_string(),
                "fields": errors,
            }),
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                json!({
                    "error": self.kind(),
                    "message": "Something went wrong, Contact with system admin",
                })
            }
            _ => json!({
                "error": self.kind(),
                "message": self.to_string(),
            }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use validator::ValidationError;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(AppError::AlreadyClockedIn.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotClockedIn.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Unauthenticated("Missing token").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden("Admin only").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("User").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn internal_errors_hide_details() {
        let resp = AppError::Internal(anyhow::anyhow!("secret connection string")).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("INTERNAL"));
        assert!(!text.contains("secret connection string"));
    }

    #[actix_web::test]
    async fn validation_errors_carry_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("workStartTime", ValidationError::new("time_format"));
        let resp = AppError::from(errors).error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "VALIDATION");
        assert!(value["fields"].get("workStartTime").is_some());
    }

    #[test]
    fn mysql_error_numbers_split_duplicates_from_foreign_keys() {
        assert_eq!(Constraint::from_number(1062), Some(Constraint::Duplicate));
        assert_eq!(Constraint::from_number(1451), Some(Constraint::InUse));
        assert_eq!(Constraint::from_number(1452), Some(Constraint::MissingParent));
        assert_eq!(Constraint::from_number(1213), None);
    }

    #[test]
    fn non_database_errors_stay_internal() {
        let err = AppError::from_unique(sqlx::Error::RowNotFound, "duplicate");
        assert_eq!(err.kind(), "INTERNAL");
        let err = AppError::from_missing_parent(sqlx::Error::RowNotFound, "User");
        assert_eq!(err.kind(), "INTERNAL");
    }
}
