use chrono::{NaiveTime, Weekday};
use serde::Serialize;
use utoipa::ToSchema;

use super::content::ContentType;

/// One slot of the fixed weekly social publishing schedule
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduleEntry {
    #[schema(value_type = String, example = "Mon")]
    #[serde(serialize_with = "serialize_weekday")]
    pub weekday: Weekday,
    #[schema(value_type = String, example = "07:00")]
    #[serde(serialize_with = "serialize_time")]
    pub time: NaiveTime,
    pub content_type: ContentType,
    #[schema(value_type = String)]
    pub label: &'static str,
    #[schema(value_type = String)]
    pub hashtag: &'static str,
}

fn serialize_weekday<S: serde::Serializer>(day: &Weekday, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(day)
}

fn serialize_time<S: serde::Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&time.format("%H:%M"))
}

fn slot(weekday: Weekday, hour: u32, content_type: ContentType, hashtag: &'static str) -> ScheduleEntry {
    ScheduleEntry {
        weekday,
        time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN),
        content_type,
        label: content_type.label(),
        hashtag,
    }
}

/// Weekday slots, Monday through Friday, one per content type.
pub fn weekly_schedule() -> Vec<ScheduleEntry> {
    vec![
        slot(Weekday::Mon, 7, ContentType::DailyLife, "#엘리안 샘의 월요 편지"),
        slot(Weekday::Tue, 8, ContentType::Artistic, "#오늘의 운동"),
        slot(Weekday::Wed, 20, ContentType::Philosophy, "#사색의 운동"),
        slot(Weekday::Thu, 21, ContentType::WorkShowcase, "#엘리안샘의 Gym"),
        slot(Weekday::Fri, 21, ContentType::Interview, "#엘리안샘의 스토리"),
    ]
}
