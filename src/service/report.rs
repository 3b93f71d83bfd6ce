//! Display shaping for attendance history.
//!
//! Absence is derived here, at presentation time: a user with no stored
//! record on a day inside the requested range is reported as ABSENT. Nothing
//! produced by this module is ever written back to storage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceRecord, AttendanceType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeedAction {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub record_id: u64,
    pub user_id: u64,
    pub action: FeedAction,
    #[schema(format = "date-time", value_type = String)]
    pub at: DateTime<Utc>,
    pub attendance_type: Option<AttendanceType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayGroup {
    #[schema(format = "date", value_type = String)]
    pub date: NaiveDate,
    pub entries: Vec<FeedEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDay {
    pub user_id: u64,
    pub status: AttendanceType,
    pub record: Option<AttendanceRecord>,
    pub entries: Vec<FeedEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportDay {
    #[schema(format = "date", value_type = String)]
    pub date: NaiveDate,
    pub users: Vec<UserDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub user_id: u64,
    pub on_time: u32,
    pub late: u32,
    pub absent: u32,
    pub total_days: u32,
    /// Present days over range days, one decimal place.
    pub percentage: f64,
}

/// IN entry for the clock-in and, when present, an OUT entry for the clock-out.
pub fn entries_for(record: &AttendanceRecord) -> Vec<FeedEntry> {
    [
        (FeedAction::In, record.time_in),
        (FeedAction::Out, record.time_out),
    ]
    .into_iter()
    .filter_map(|(action, at)| {
        at.map(|at| FeedEntry {
            record_id: record.id,
            user_id: record.user_id,
            action,
            at,
            attendance_type: record.attendance_type,
        })
    })
    .collect()
}

fn sort_entries(entries: &mut [FeedEntry], order: SortOrder) {
    entries.sort_by(|a, b| match order {
        SortOrder::Asc => a.at.cmp(&b.at),
        SortOrder::Desc => b.at.cmp(&a.at),
    });
}

/// Groups stored records into per-day feeds; days without records are omitted.
pub fn group_feed(records: &[AttendanceRecord], order: SortOrder) -> Vec<DayGroup> {
    let mut days: BTreeMap<NaiveDate, Vec<FeedEntry>> = BTreeMap::new();
    for record in records {
        days.entry(record.attendance_date)
            .or_default()
            .extend(entries_for(record));
    }

    let mut groups: Vec<DayGroup> = days
        .into_iter()
        .map(|(date, mut entries)| {
            sort_entries(&mut entries, order);
            DayGroup { date, entries }
        })
        .collect();

    if order == SortOrder::Desc {
        groups.reverse();
    }
    groups
}

/// One group per calendar day in `[start, end]`, one row per requested user.
pub fn build_report(
    user_ids: &[u64],
    records: &[AttendanceRecord],
    start: NaiveDate,
    end: NaiveDate,
    order: SortOrder,
) -> Vec<ReportDay> {
    let by_key: BTreeMap<(NaiveDate, u64), &AttendanceRecord> = records
        .iter()
        .map(|r| ((r.attendance_date, r.user_id), r))
        .collect();

    let mut days: Vec<ReportDay> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| ReportDay {
            date,
            users: user_ids
                .iter()
                .map(|&user_id| match by_key.get(&(date, user_id)) {
                    Some(record) => {
                        let mut entries = entries_for(record);
                        sort_entries(&mut entries, order);
                        UserDay {
                            user_id,
                            status: record.attendance_type.unwrap_or(AttendanceType::OnTime),
                            record: Some((*record).clone()),
                            entries,
                        }
                    }
                    None => UserDay {
                        user_id,
                        status: AttendanceType::Absent,
                        record: None,
                        entries: Vec::new(),
                    },
                })
                .collect(),
        })
        .collect();

    if order == SortOrder::Desc {
        days.reverse();
    }
    days
}

pub fn summarize(user_ids: &[u64], report: &[ReportDay]) -> Vec<AttendanceSummary> {
    user_ids
        .iter()
        .map(|&user_id| {
            let mut summary = AttendanceSummary {
                user_id,
                on_time: 0,
                late: 0,
                absent: 0,
                total_days: 0,
                percentage: 0.0,
            };

            for row in report
                .iter()
                .flat_map(|day| day.users.iter())
                .filter(|u| u.user_id == user_id)
            {
                summary.total_days += 1;
                match row.status {
                    AttendanceType::OnTime => summary.on_time += 1,
                    AttendanceType::Late => summary.late += 1,
                    AttendanceType::Absent => summary.absent += 1,
                }
            }

            if summary.total_days > 0 {
                let present = f64::from(summary.on_time + summary.late);
                let pct = present / f64::from(summary.total_days) * 100.0;
                summary.percentage = (pct * 10.0).round() / 10.0;
            }
            summary
        })
        .collect()
}
