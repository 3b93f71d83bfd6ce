use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::model::attendance::AttendanceType;

/// Well-known key of the singleton settings row.
pub const SETTINGS_ID: &str = "global";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfo {
    pub school_name: String,
    pub school_code: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    #[schema(example = "Asia/Kuala_Lumpur")]
    pub timezone: String,
    #[schema(example = "ms")]
    pub language: String,
    #[schema(example = "2025")]
    pub academic_year: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservationSetting {
    pub default_duration_minutes: u32,
    pub reminder_lead_days: u32,
    pub allow_self_evaluation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSetting {
    #[schema(example = "08:00")]
    pub work_start_time: String,
    #[schema(example = "17:00")]
    pub work_end_time: String,
    #[schema(example = 15)]
    pub late_threshold_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSetting {
    pub email_enabled: bool,
    pub push_enabled: bool,
    pub sms_enabled: bool,
    pub retention_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchoolSettings {
    pub basic_info: BasicInfo,
    pub observation_setting: ObservationSetting,
    pub attendance_setting: AttendanceSetting,
    pub notification_setting: NotificationSetting,
}

impl SchoolSettings {
    pub fn with_defaults(academic_year: i32) -> Self {
        Self {
            basic_info: BasicInfo {
                school_name: "Sekolah".to_string(),
                school_code: String::new(),
                address: String::new(),
                phone: String::new(),
                email: String::new(),
                timezone: "Asia/Kuala_Lumpur".to_string(),
                language: "ms".to_string(),
                academic_year: academic_year.to_string(),
            },
            observation_setting: ObservationSetting {
                default_duration_minutes: 60,
                reminder_lead_days: 3,
                allow_self_evaluation: true,
            },
            attendance_setting: AttendanceSetting {
                work_start_time: "08:00".to_string(),
                work_end_time: "17:00".to_string(),
                late_threshold_minutes: 15,
            },
            notification_setting: NotificationSetting {
                email_enabled: true,
                push_enabled: false,
                sms_enabled: false,
                retention_days: 30,
            },
        }
    }

    /// Overwrites only the leaf fields present in `patch`.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(p) = &patch.basic_info {
            let b = &mut self.basic_info;
            if let Some(v) = &p.school_name {
                b.school_name = v.clone();
            }
            if let Some(v) = &p.school_code {
                b.school_code = v.clone();
            }
            if let Some(v) = &p.address {
                b.address = v.clone();
            }
            if let Some(v) = &p.phone {
                b.phone = v.clone();
            }
            if let Some(v) = &p.email {
                b.email = v.clone();
            }
            if let Some(v) = &p.timezone {
                b.timezone = v.clone();
            }
            if let Some(v) = &p.language {
                b.language = v.clone();
            }
            if let Some(v) = &p.academic_year {
                b.academic_year = v.clone();
            }
        }

        if let Some(p) = &patch.observation_setting {
            let o = &mut self.observation_setting;
            if let Some(v) = &p.default_duration_minutes {
                o.default_duration_minutes = *v;
            }
            if let Some(v) = &p.reminder_lead_days {
                o.reminder_lead_days = *v;
            }
            if let Some(v) = &p.allow_self_evaluation {
                o.allow_self_evaluation = *v;
            }
        }

        if let Some(p) = &patch.attendance_setting {
            let a = &mut self.attendance_setting;
            if let Some(v) = &p.work_start_time {
                a.work_start_time = v.clone();
            }
            if let Some(v) = &p.work_end_time {
                a.work_end_time = v.clone();
            }
            if let Some(v) = &p.late_threshold_minutes {
                a.late_threshold_minutes = *v;
            }
        }

        if let Some(p) = &patch.notification_setting {
            let n = &mut self.notification_setting;
            if let Some(v) = &p.email_enabled {
                n.email_enabled = *v;
            }
            if let Some(v) = &p.push_enabled {
                n.push_enabled = *v;
            }
            if let Some(v) = &p.sms_enabled {
                n.sms_enabled = *v;
            }
            if let Some(v) = &p.retention_days {
                n.retention_days = *v;
            }
        }
    }

    /// `workEndTime` must come after `workStartTime`.
    pub fn check_work_hours(&self) -> Result<(), ValidationErrors> {
        let a = &self.attendance_setting;
        match (parse_hhmm(&a.work_start_time), parse_hhmm(&a.work_end_time)) {
            (Some(start), Some(end)) if start < end => Ok(()),
            _ => {
                let mut errors = ValidationErrors::new();
                errors.add("workEndTime", ValidationError::new("must_follow_work_start"));
                Err(errors)
            }
        }
    }

    /// Copy of the document with `patch` applied, rejected when the result is inconsistent.
    pub fn merged(&self, patch: &SettingsPatch) -> Result<Self, ValidationErrors> {
        let mut next = self.clone();
        next.apply(patch);
        next.check_work_hours()?;
        Ok(next)
    }
}

/* =========================
Partial update payloads
========================= */

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfoPatch {
    #[validate(length(min = 1, max = 200))]
    pub school_name: Option<String>,
    #[validate(length(max = 32))]
    pub school_code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1))]
    pub timezone: Option<String>,
    #[validate(length(min = 2, max = 8))]
    pub language: Option<String>,
    #[validate(length(min = 4, max = 9))]
    pub academic_year: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservationSettingPatch {
    #[validate(range(min = 1, max = 480))]
    pub default_duration_minutes: Option<u32>,
    #[validate(range(max = 90))]
    pub reminder_lead_days: Option<u32>,
    pub allow_self_evaluation: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSettingPatch {
    #[schema(example = "07:30")]
    pub work_start_time: Option<String>,
    #[schema(example = "16:30")]
    pub work_end_time: Option<String>,
    #[validate(range(max = 240))]
    #[schema(example = 30)]
    pub late_threshold_minutes: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettingPatch {
    pub email_enabled: Option<bool>,
    pub push_enabled: Option<bool>,
    pub sms_enabled: Option<bool>,
    #[validate(range(min = 1, max = 3650))]
    pub retention_days: Option<u32>,
}

/// Body of `PUT /school-setting`; every sub-group is optional.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({ "attendanceSetting": { "lateThresholdMinutes": 30 } }))]
pub struct SettingsPatch {
    pub basic_info: Option<BasicInfoPatch>,
    pub observation_setting: Option<ObservationSettingPatch>,
    pub attendance_setting: Option<AttendanceSettingPatch>,
    pub notification_setting: Option<NotificationSettingPatch>,
}

impl SettingsPatch {
    /// Field-level validation of every supplied sub-group.
    pub fn validate_fields(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let nested = [
            self.basic_info.as_ref().map(Validate::validate),
            self.observation_setting.as_ref().map(Validate::validate),
            self.attendance_setting.as_ref().map(Validate::validate),
            self.notification_setting.as_ref().map(Validate::validate),
        ];
        for result in nested.into_iter().flatten() {
            if let Err(e) = result {
                for (field, kinds) in e.field_errors() {
                    for kind in kinds {
                        errors.add(camel_field(&field), kind.clone());
                    }
                }
            }
        }

        if let Some(a) = &self.attendance_setting {
            for (field, value) in [
                ("workStartTime", &a.work_start_time),
                ("workEndTime", &a.work_end_time),
            ] {
                if let Some(v) = value {
                    if parse_hhmm(v).is_none() {
                        errors.add(field, ValidationError::new("time_format"));
                    }
                }
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn camel_field(field: &str) -> &'static str {
    match field {
        "school_name" | "schoolName" => "schoolName",
        "school_code" | "schoolCode" => "schoolCode",
        "email" => "email",
        "timezone" => "timezone",
        "language" => "language",
        "academic_year" | "academicYear" => "academicYear",
        "default_duration_minutes" | "defaultDurationMinutes" => "defaultDurationMinutes",
        "reminder_lead_days" | "reminderLeadDays" => "reminderLeadDays",
        "late_threshold_minutes" | "lateThresholdMinutes" => "lateThresholdMinutes",
        "retention_days" | "retentionDays" => "retentionDays",
        _ => "settings",
    }
}

pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Cut-off after which a clock-in counts as late.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatenessRule {
    cutoff_secs: u32,
}

impl LatenessRule {
    pub fn new(work_start: NaiveTime, threshold_minutes: u32) -> Self {
        Self {
            cutoff_secs: work_start.num_seconds_from_midnight() + threshold_minutes * 60,
        }
    }

    /// Strictly after the cut-off is late; the cut-off instant itself is on time.
    pub fn classify(&self, local_time: NaiveTime) -> AttendanceType {
        if local_time.num_seconds_from_midnight() > self.cutoff_secs {
            AttendanceType::Late
        } else {
            AttendanceType::OnTime
        }
    }
}

impl AttendanceSetting {
    pub fn lateness_rule(&self) -> Option<LatenessRule> {
        parse_hhmm(&self.work_start_time).map(|t| LatenessRule::new(t, self.late_threshold_minutes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn threshold_is_inclusive() {
        let rule = LatenessRule::new(t(8, 0), 15);
        assert_eq!(rule.classify(t(8, 14)), AttendanceType::OnTime);
        assert_eq!(rule.classify(t(8, 15)), AttendanceType::OnTime);
        assert_eq!(rule.classify(t(8, 16)), AttendanceType::Late);
        assert_eq!(rule.classify(t(7, 2)), AttendanceType::OnTime);
        assert_eq!(
            rule.classify(NaiveTime::from_hms_opt(8, 15, 1).unwrap()),
            AttendanceType::Late
        );
    }

    #[test]
    fn partial_patch_touches_one_leaf() {
        let before = SchoolSettings::with_defaults(2025);
        let mut after = before.clone();
        after.apply(&SettingsPatch {
            attendance_setting: Some(AttendanceSettingPatch {
                late_threshold_minutes: Some(30),
                ..Default::default()
            }),
            ..Default::default()
        });

        assert_eq!(after.attendance_setting.late_threshold_minutes, 30);
        assert_eq!(after.attendance_setting.work_start_time, before.attendance_setting.work_start_time);
        assert_eq!(after.attendance_setting.work_end_time, before.attendance_setting.work_end_time);
        assert_eq!(after.basic_info, before.basic_info);
        assert_eq!(after.observation_setting, before.observation_setting);
        assert_eq!(after.notification_setting, before.notification_setting);
    }

    #[test]
    fn merge_rejects_end_before_start_and_keeps_original() {
        let before = SchoolSettings::with_defaults(2025);
        let patch = SettingsPatch {
            attendance_setting: Some(AttendanceSettingPatch {
                work_start_time: Some("18:00".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let errors = before.merged(&patch).unwrap_err();
        assert!(errors.field_errors().contains_key("workEndTime"));
        assert_eq!(before.attendance_setting.work_start_time, "08:00");
    }

    #[test]
    fn rejects_malformed_times() {
        let patch: SettingsPatch = serde_json::from_value(serde_json::json!({
            "attendanceSetting": { "workStartTime": "8am", "lateThresholdMinutes": 999 }
        }))
        .unwrap();

        let errors = patch.validate_fields().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("workStartTime"));
        assert!(fields.contains_key("lateThresholdMinutes"));
    }

    #[test]
    fn defaults_use_given_year() {
        let s = SchoolSettings::with_defaults(2026);
        assert_eq!(s.basic_info.academic_year, "2026");
        assert_eq!(s.attendance_setting.work_start_time, "08:00");
        assert_eq!(s.attendance_setting.late_threshold_minutes, 15);
    }
}
