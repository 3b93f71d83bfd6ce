use chrono::{Datelike, Utc};

use crate::error::AppError;
use crate::model::settings::{SchoolSettings, SettingsPatch};
use crate::store::SettingsStore;

/// Returns the singleton, persisting defaults the first time it is read.
pub async fn get<S: SettingsStore>(store: &S) -> Result<SchoolSettings, AppError> {
    if let Some(settings) = store.load().await? {
        return Ok(settings);
    }

    let defaults = SchoolSettings::with_defaults(Utc::now().year());
    store.insert_if_absent(&defaults).await?;
    tracing::info!("School settings initialised with defaults");

    // a concurrent first read may have won the insert
    store
        .load()
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("School settings missing after insert")))
}

/// Merges the supplied leaf fields into the stored document and returns the result.
/// The merge happens inside the store so concurrent patches to different leaves both land.
pub async fn update_partial<S: SettingsStore>(
    store: &S,
    patch: SettingsPatch,
) -> Result<SchoolSettings, AppError> {
    patch.validate_fields()?;

    get(store).await?;
    store
        .apply_patch(&patch)
        .await?
        .ok_or(AppError::NotFound("School settings"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::settings::{AttendanceSettingPatch, BasicInfoPatch};
    use crate::store::memory::MemoryStore;
    use actix_web::rt::task::yield_now;

    /// Suspends before every store call so two updates interleave their reads and writes.
    struct YieldingStore(MemoryStore);

    impl SettingsStore for YieldingStore {
        async fn load(&self) -> Result<Option<SchoolSettings>, AppError> {
            yield_now().await;
            self.0.load().await
        }

        async fn insert_if_absent(&self, defaults: &SchoolSettings) -> Result<(), AppError> {
            yield_now().await;
            self.0.insert_if_absent(defaults).await
        }

        async fn apply_patch(
            &self,
            patch: &SettingsPatch,
        ) -> Result<Option<SchoolSettings>, AppError> {
            yield_now().await;
            self.0.apply_patch(patch).await
        }
    }

    #[actix_web::test]
    async fn first_read_persists_defaults() {
        let store = MemoryStore::default();
        assert!(store.load().await.unwrap().is_none());

        let settings = get(&store).await.unwrap();
        assert_eq!(settings.attendance_setting.work_start_time, "08:00");
        assert_eq!(settings.attendance_setting.work_end_time, "17:00");
        assert_eq!(settings.basic_info.academic_year, Utc::now().year().to_string());
        assert_eq!(store.load().await.unwrap(), Some(settings));
    }

    #[actix_web::test]
    async fn threshold_update_leaves_everything_else() {
        let store = MemoryStore::default();
        let before = get(&store).await.unwrap();

        let after = update_partial(
            &store,
            SettingsPatch {
                attendance_setting: Some(AttendanceSettingPatch {
                    late_threshold_minutes: Some(30),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(after.attendance_setting.late_threshold_minutes, 30);
        assert_eq!(
            serde_json::to_vec(&after.basic_info).unwrap(),
            serde_json::to_vec(&before.basic_info).unwrap()
        );
        assert_eq!(after.observation_setting, before.observation_setting);
        assert_eq!(after.notification_setting, before.notification_setting);
        assert_eq!(after.attendance_setting.work_start_time, before.attendance_setting.work_start_time);
        assert_eq!(after.attendance_setting.work_end_time, before.attendance_setting.work_end_time);
        assert_eq!(store.load().await.unwrap(), Some(after));
    }

    #[actix_web::test]
    async fn sequential_patches_accumulate() {
        let store = MemoryStore::default();
        update_partial(
            &store,
            SettingsPatch {
                basic_info: Some(BasicInfoPatch {
                    school_name: Some("SK Taman Melati".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let settings = update_partial(
            &store,
            SettingsPatch {
                attendance_setting: Some(AttendanceSettingPatch {
                    work_start_time: Some("07:30".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(settings.basic_info.school_name, "SK Taman Melati");
        assert_eq!(settings.attendance_setting.work_start_time, "07:30");
    }

    #[actix_web::test]
    async fn rejects_end_before_start_without_saving() {
        let store = MemoryStore::default();
        let before = get(&store).await.unwrap();

        let err = update_partial(
            &store,
            SettingsPatch {
                attendance_setting: Some(AttendanceSettingPatch {
                    work_end_time: Some("07:00".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "VALIDATION");
        assert_eq!(store.load().await.unwrap(), Some(before));
    }

    #[actix_web::test]
    async fn interleaved_updates_to_different_leaves_both_persist() {
        let store = YieldingStore(MemoryStore::default());
        get(&store).await.unwrap();

        let rename = update_partial(
            &store,
            SettingsPatch {
                basic_info: Some(BasicInfoPatch {
                    school_name: Some("SK Bukit Indah".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let threshold = update_partial(
            &store,
            SettingsPatch {
                attendance_setting: Some(AttendanceSettingPatch {
                    late_threshold_minutes: Some(30),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let (a, b) = futures::join!(rename, threshold);
        a.unwrap();
        b.unwrap();

        let stored = store.load().await.unwrap().unwrap();
        assert_eq!(stored.basic_info.school_name, "SK Bukit Indah");
        assert_eq!(stored.attendance_setting.late_threshold_minutes, 30);
    }
}
