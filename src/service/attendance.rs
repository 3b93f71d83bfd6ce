use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::error::AppError;
use crate::model::attendance::{AttendanceRecord, AttendanceType, AttendanceUpsert};
use crate::model::settings::SchoolSettings;
use crate::service::settings;
use crate::service::ensure_active_user;
use crate::store::{AttendanceStore, SettingsStore, UserDirectory};

/// Calendar day of `at` in school-local time.
pub fn local_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// ON_TIME / LATE for a clock-in, judged on school-local wall time.
pub fn classify(
    settings: &SchoolSettings,
    time_in: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<AttendanceType, AppError> {
    let rule = settings.attendance_setting.lateness_rule().ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "stored workStartTime {:?} is not HH:MM",
            settings.attendance_setting.work_start_time
        ))
    })?;

    Ok(rule.classify(time_in.with_timezone(&offset).time()))
}

pub async fn clock_in<S>(
    store: &S,
    user_id: u64,
    at: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<AttendanceRecord, AppError>
where
    S: AttendanceStore + SettingsStore + UserDirectory,
{
    ensure_active_user(store, user_id).await?;

    let day = local_day(at, offset);
    let existing = store.find_for_day(user_id, day).await?;

    let entry = match existing {
        Some(record) if record.is_open() => return Err(AppError::AlreadyClockedIn),
        // Re-entering after a clock-out reopens the day; the first clock-in stands.
        Some(AttendanceRecord {
            time_in: Some(first_in),
            attendance_type: Some(kind),
            ..
        }) => AttendanceUpsert {
            user_id,
            attendance_date: day,
            time_in: Some(first_in),
            time_out: None,
            attendance_type: Some(kind),
        },
        _ => {
            let settings = settings::get(store).await?;
            AttendanceUpsert {
                user_id,
                attendance_date: day,
                time_in: Some(at),
                time_out: None,
                attendance_type: Some(classify(&settings, at, offset)?),
            }
        }
    };

    let record = store.upsert(&entry).await?;
    tracing::info!(user_id, date = %day, kind = ?record.attendance_type, "Clocked in");
    Ok(record)
}

pub async fn clock_out<S>(
    store: &S,
    user_id: u64,
    at: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<AttendanceRecord, AppError>
where
    S: AttendanceStore,
{
    let day = local_day(at, offset);
    let record = match store.find_for_day(user_id, day).await? {
        Some(record) if record.is_open() => record,
        _ => return Err(AppError::NotClockedIn),
    };

    if record.time_in.is_some_and(|time_in| at < time_in) {
        return Err(AppError::BadRequest(
            "clockOutTime cannot be earlier than clockInTime".to_string(),
        ));
    }

    let record = store
        .upsert(&AttendanceUpsert {
            user_id,
            attendance_date: day,
            time_in: record.time_in,
            time_out: Some(at),
            attendance_type: record.attendance_type,
        })
        .await?;

    tracing::info!(user_id, date = %day, "Clocked out");
    Ok(record)
}

/// Administrator backfill: writes both times for `date`, ignoring open/closed state.
pub async fn manual_entry<S>(
    store: &S,
    user_id: u64,
    date: NaiveDate,
    time_in: DateTime<Utc>,
    time_out: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<AttendanceRecord, AppError>
where
    S: AttendanceStore + SettingsStore + UserDirectory,
{
    if local_day(time_in, offset) != date || local_day(time_out, offset) != date {
        return Err(AppError::BadRequest(format!(
            "clockInTime and clockOutTime must fall on {date}"
        )));
    }
    if time_out < time_in {
        return Err(AppError::BadRequest(
            "clockOutTime cannot be earlier than clockInTime".to_string(),
        ));
    }
    ensure_active_user(store, user_id).await?;

    let settings = settings::get(store).await?;
    let record = store
        .upsert(&AttendanceUpsert {
            user_id,
            attendance_date: date,
            time_in: Some(time_in),
            time_out: Some(time_out),
            attendance_type: Some(classify(&settings, time_in, offset)?),
        })
        .await?;

    tracing::info!(user_id, date = %date, "Manual attendance entry saved");
    Ok(record)
}

pub async fn today<S: AttendanceStore>(
    store: &S,
    user_id: u64,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<Option<AttendanceRecord>, AppError> {
    store.find_for_day(user_id, local_day(now, offset)).await
}

pub async fn range_query<S: AttendanceStore>(
    store: &S,
    user_id: Option<u64>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<AttendanceRecord>, AppError> {
    if start > end {
        return Err(AppError::BadRequest(
            "startDate cannot be after endDate".to_string(),
        ));
    }

    store.find_in_range(user_id, start, end).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::TimeZone;

    fn myt() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    /// School-local wall time on 2025-01-`day`.
    fn on(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        myt()
            .with_ymd_and_hms(2025, 1, day, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        on(2, h, m)
    }

    fn store() -> MemoryStore {
        MemoryStore::with_settings(SchoolSettings::with_defaults(2025))
            .with_user(7, true)
            .with_user(8, true)
    }

    #[actix_web::test]
    async fn clock_in_before_cutoff_is_on_time() {
        let store = store();
        let record = clock_in(&store, 7, at(8, 14), myt()).await.unwrap();

        assert_eq!(record.attendance_type, Some(AttendanceType::OnTime));
        assert_eq!(record.attendance_date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(record.time_in, Some(at(8, 14)));
        assert!(record.time_out.is_none());
        assert_eq!(store.attendance_rows().len(), 1);
    }

    #[actix_web::test]
    async fn clock_in_after_cutoff_is_late() {
        let store = store();
        let record = clock_in(&store, 7, at(8, 16), myt()).await.unwrap();
        assert_eq!(record.attendance_type, Some(AttendanceType::Late));
    }

    #[actix_web::test]
    async fn uses_school_day_not_utc_day() {
        let store = store();
        // 07:00 local on the 2nd is 23:00 UTC on the 1st.
        let record = clock_in(&store, 7, at(7, 0), myt()).await.unwrap();
        assert_eq!(record.attendance_date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
    }

    #[actix_web::test]
    async fn double_clock_in_is_rejected_and_record_kept() {
        let store = store();
        let first = clock_in(&store, 7, at(7, 50), myt()).await.unwrap();

        let err = clock_in(&store, 7, at(9, 0), myt()).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyClockedIn));
        assert_eq!(store.attendance_rows(), vec![first]);
    }

    #[actix_web::test]
    async fn clock_out_without_clock_in_fails() {
        let store = store();
        let err = clock_out(&store, 7, at(17, 0), myt()).await.unwrap_err();
        assert!(matches!(err, AppError::NotClockedIn));
        assert!(store.attendance_rows().is_empty());
    }

    #[actix_web::test]
    async fn clock_out_closes_the_day() {
        let store = store();
        clock_in(&store, 7, at(7, 55), myt()).await.unwrap();
        let record = clock_out(&store, 7, at(17, 5), myt()).await.unwrap();

        assert_eq!(record.time_out, Some(at(17, 5)));
        assert_eq!(record.attendance_type, Some(AttendanceType::OnTime));

        let err = clock_out(&store, 7, at(17, 10), myt()).await.unwrap_err();
        assert!(matches!(err, AppError::NotClockedIn));
    }

    #[actix_web::test]
    async fn clock_in_after_clock_out_keeps_first_time_in() {
        let store = store();
        clock_in(&store, 7, at(7, 55), myt()).await.unwrap();
        clock_out(&store, 7, at(12, 0), myt()).await.unwrap();

        let reopened = clock_in(&store, 7, at(13, 0), myt()).await.unwrap();
        assert_eq!(reopened.time_in, Some(at(7, 55)));
        assert_eq!(reopened.attendance_type, Some(AttendanceType::OnTime));
        assert!(reopened.is_open());
        assert_eq!(store.attendance_rows().len(), 1);
    }

    #[actix_web::test]
    async fn threshold_comes_from_current_settings() {
        let mut settings = SchoolSettings::with_defaults(2025);
        settings.attendance_setting.work_start_time = "07:30".to_string();
        settings.attendance_setting.late_threshold_minutes = 10;
        let store = MemoryStore::with_settings(settings).with_user(7, true);

        let record = clock_in(&store, 7, at(7, 41), myt()).await.unwrap();
        assert_eq!(record.attendance_type, Some(AttendanceType::Late));
    }

    #[actix_web::test]
    async fn manual_entry_overwrites_and_reclassifies() {
        let store = store();
        clock_in(&store, 7, at(9, 0), myt()).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let record = manual_entry(&store, 7, day, at(7, 58), at(17, 0), myt())
            .await
            .unwrap();

        assert_eq!(record.attendance_type, Some(AttendanceType::OnTime));
        assert_eq!(record.time_out, Some(at(17, 0)));
        assert_eq!(store.attendance_rows().len(), 1);
    }

    #[actix_web::test]
    async fn manual_entry_rejects_reversed_times() {
        let store = store();
        let day = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let err = manual_entry(&store, 7, day, at(17, 0), at(8, 0), myt())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "VALIDATION");
        assert!(store.attendance_rows().is_empty());
    }

    #[actix_web::test]
    async fn manual_entry_times_must_fall_on_the_given_day() {
        let store = store();
        let day = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();

        let err = manual_entry(&store, 7, day, on(3, 8, 0), on(3, 17, 0), myt())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "VALIDATION");

        let err = manual_entry(&store, 7, day, on(2, 8, 0), on(3, 1, 0), myt())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "VALIDATION");
        assert!(store.attendance_rows().is_empty());

        // 00:30 local on the 2nd is still the 1st in UTC
        let record = manual_entry(&store, 7, day, on(2, 0, 30), on(2, 9, 0), myt())
            .await
            .unwrap();
        assert_eq!(record.attendance_date, day);
    }

    #[actix_web::test]
    async fn unknown_or_inactive_users_cannot_clock_in() {
        let store = store().with_user(9, false);

        let err = clock_in(&store, 42, at(8, 0), myt()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("User")));
        let err = clock_in(&store, 9, at(8, 0), myt()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("User")));

        let day = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let err = manual_entry(&store, 42, day, at(8, 0), at(17, 0), myt())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NOT_FOUND");
        assert!(store.attendance_rows().is_empty());
    }

    #[actix_web::test]
    async fn range_query_is_inclusive_and_per_user() {
        let store = store();
        for (user, day) in [(7, 1), (7, 2), (7, 3), (7, 4), (8, 2)] {
            let d = NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
            manual_entry(&store, user, d, on(day, 8, 0), on(day, 17, 0), myt())
                .await
                .unwrap();
        }

        let start = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();

        let mine = range_query(&store, Some(7), start, end).await.unwrap();
        assert_eq!(mine.len(), 2);

        let everyone = range_query(&store, None, start, end).await.unwrap();
        assert_eq!(everyone.len(), 3);

        let err = range_query(&store, None, end, start).await.unwrap_err();
        assert_eq!(err.kind(), "VALIDATION");
    }
}
