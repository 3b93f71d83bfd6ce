pub mod attendance;
pub mod cerapan;
pub mod report;
pub mod settings;

use crate::error::AppError;
use crate::store::UserDirectory;

/// Fails with `NotFound("User")` unless `user_id` names an active account.
pub async fn ensure_active_user<S: UserDirectory>(store: &S, user_id: u64) -> Result<(), AppError> {
    if store.is_active_user(user_id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound("User"))
    }
}
