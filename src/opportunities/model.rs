use serde::Serialize;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(with = "iso_date")]
    pub date: Date,
    /// `HH:MM`, 24-hour.
    pub time: String,
    /// Hours.
    pub duration: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub delete_date: Option<OffsetDateTime>,
}

impl Opportunity {
    pub fn same_key(&self, title: &str, date: Date) -> bool {
        self.title == title && self.date == date
    }
}
