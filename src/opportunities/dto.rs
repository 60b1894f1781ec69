use serde::Deserialize;
use serde_json::Value;
use time::Date;
use uuid::Uuid;

use crate::{
    error::Violations,
    validation::{self, coerce_duration, parse_date, required},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityRequest {
    pub organizer_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    pub time: Option<String>,
    pub duration: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidOpportunity {
    pub organizer_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: Date,
    pub time: String,
    pub duration: f64,
}

impl OpportunityRequest {
    pub fn validate(self) -> Result<ValidOpportunity, Violations> {
        let mut v = Violations::new();

        let organizer_id = required(&mut v, "organizerId", self.organizer_id).and_then(|raw| {
            let parsed = Uuid::parse_str(&raw).ok();
            if parsed.is_none() {
                v.push("organizerId", "must be a valid id");
            }
            parsed
        });
        let title = required(&mut v, "title", self.title);
        let description = required(&mut v, "description", self.description);
        let location = required(&mut v, "location", self.location);

        let date = required(&mut v, "date", self.date).and_then(|raw| {
            let parsed = parse_date(&raw);
            if parsed.is_none() {
                v.push("date", "must be a date formatted YYYY-MM-DD");
            }
            parsed
        });

        let time = required(&mut v, "time", self.time);
        if let Some(t) = &time {
            if !validation::is_valid_time(t) {
                v.push("time", "must be HH:MM (24-hour)");
            }
        }

        let duration = match self.duration.filter(|d| !d.is_null()) {
            None => {
                v.push("duration", "is required");
                None
            }
            Some(raw) => match coerce_duration(&raw) {
                Some(hours) if validation::is_valid_duration(hours) => Some(hours),
                _ => {
                    v.push("duration", "must be a non-negative number");
                    None
                }
            },
        };

        v.into_result()?;

        match (organizer_id, title, description, location, date, time, duration) {
            (
                Some(organizer_id),
                Some(title),
                Some(description),
                Some(location),
                Some(date),
                Some(time),
                Some(duration),
            ) => Ok(ValidOpportunity {
                organizer_id,
                title,
                description,
                location,
                date,
                time,
                duration,
            }),
            _ => Err(Violations::single("body", "incomplete opportunity")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(time: &str, duration: Value) -> OpportunityRequest {
        serde_json::from_value(json!({
            "organizerId": Uuid::new_v4().to_string(),
            "title": "Beach cleanup",
            "description": "Bring gloves",
            "location": "North Beach",
            "date": "2026-11-14",
            "time": time,
            "duration": duration
        }))
        .unwrap()
    }

    #[test]
    fn time_and_duration_bounds() {
        assert!(body("23:59", json!(0)).validate().is_ok());
        assert!(body("24:00", json!(1)).validate().unwrap_err().contains("time"));
        assert!(body("10:00", json!(-1)).validate().unwrap_err().contains("duration"));
    }

    #[test]
    fn duration_must_be_a_number() {
        let err = body("10:00", json!("2")).validate().unwrap_err();
        assert_eq!(err.fields(), vec!["duration"]);
    }

    #[test]
    fn reports_bad_ids_and_dates() {
        let mut req = body("10:00", json!(2.5));
        req.organizer_id = Some("organizer-1".into());
        req.date = Some("14/11/2026".into());
        let err = req.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["organizerId", "date"]);
    }

    #[test]
    fn reports_every_missing_field() {
        let err = OpportunityRequest::default().validate().unwrap_err();
        assert_eq!(
            err.fields(),
            vec!["organizerId", "title", "description", "location", "date", "time", "duration"]
        );
    }
}
