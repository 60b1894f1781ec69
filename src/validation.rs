use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use time::{macros::format_description, Date};

use crate::{error::Violations, users::model::AccountType};

pub const MIN_GRADUATION_YEAR: i32 = 1900;
pub const MAX_GRADUATION_YEAR: i32 = 2035;
pub const MIN_PASSWORD_LEN: usize = 12;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref PHONE_RE: Regex =
        Regex::new(r"^\(?[0-9]{3}\)?[0-9]{3}-?[0-9]{4}$|^[0-9]{3}\.[0-9]{3}\.[0-9]{4}$").unwrap();
    static ref TIME_RE: Regex = Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Accepts `(123)456-7890`, `1234567890` and `123.456.7890`.
pub fn is_valid_phone_number(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

pub fn is_valid_time(time: &str) -> bool {
    TIME_RE.is_match(time)
}

pub fn is_valid_duration(hours: f64) -> bool {
    hours.is_finite() && hours >= 0.0
}

pub fn is_valid_graduation_year(year: i32) -> bool {
    (MIN_GRADUATION_YEAR..=MAX_GRADUATION_YEAR).contains(&year)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<Date> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Graduation years arrive as JSON numbers or numeric strings.
pub fn coerce_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

/// Durations must be real JSON numbers; strings are not coerced.
pub fn coerce_duration(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Checks the password precondition: length, both cases, a digit and a symbol.
pub fn check_password_strength(password: &str) -> Result<(), String> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LEN;
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let symbol = password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    if long_enough && upper && lower && digit && symbol {
        Ok(())
    } else {
        Err(format!(
            "must be {MIN_PASSWORD_LEN}+ characters with an uppercase letter, a lowercase letter, a number and a symbol"
        ))
    }
}

/// Reads a required text field, recording a violation when absent or blank.
pub fn required(violations: &mut Violations, field: &str, value: Option<String>) -> Option<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            violations.push(field, "is required");
            None
        }
    }
}

pub fn account_type(violations: &mut Violations, value: Option<String>) -> Option<AccountType> {
    let raw = required(violations, "accountType", value)?;
    match raw.parse::<AccountType>() {
        Ok(t) => Some(t),
        Err(()) => {
            violations.push("accountType", "must be one of student, organizer, admin");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last@example.org"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("@c.com"));
    }

    #[test]
    fn phone_pattern() {
        assert!(is_valid_phone_number("(123)456-7890"));
        assert!(is_valid_phone_number("1234567890"));
        assert!(is_valid_phone_number("123.456.7890"));
        assert!(!is_valid_phone_number("123-45-678"));
        assert!(!is_valid_phone_number("phone"));
    }

    #[test]
    fn time_is_24_hour() {
        assert!(is_valid_time("00:00"));
        assert!(is_valid_time("23:59"));
        assert!(!is_valid_time("24:00"));
        assert!(!is_valid_time("9:30"));
        assert!(!is_valid_time("12:60"));
        // Non-ASCII digits, which Postgres rejects too.
        assert!(!is_valid_time("1\u{0663}:0\u{0665}"));
    }

    #[test]
    fn duration_non_negative() {
        assert!(is_valid_duration(0.0));
        assert!(is_valid_duration(2.5));
        assert!(!is_valid_duration(-1.0));
        assert!(!is_valid_duration(f64::NAN));
    }

    #[test]
    fn date_parsing() {
        let d = parse_date("2026-05-01").expect("valid date");
        assert_eq!(d.year(), 2026);
        assert!(parse_date("2026-13-01").is_none());
        assert!(parse_date("May 1st").is_none());
    }

    #[test]
    fn year_coercion() {
        assert_eq!(coerce_year(&json!("2026")), Some(2026));
        assert_eq!(coerce_year(&json!(2026)), Some(2026));
        assert_eq!(coerce_year(&json!("soon")), None);
        assert_eq!(coerce_year(&json!(2026.5)), None);
        assert_eq!(coerce_year(&json!(null)), None);
    }

    #[test]
    fn duration_coercion_rejects_strings() {
        assert_eq!(coerce_duration(&json!(1.5)), Some(1.5));
        assert_eq!(coerce_duration(&json!(0)), Some(0.0));
        assert_eq!(coerce_duration(&json!("2")), None);
    }

    #[test]
    fn password_strength() {
        assert!(check_password_strength("Str0ng!Passw0rd").is_ok());
        assert!(check_password_strength("Sh0rt!").is_err());
        assert!(check_password_strength("alllowercase1!x").is_err());
        assert!(check_password_strength("ALLUPPERCASE1!X").is_err());
        assert!(check_password_strength("NoDigitsHere!!").is_err());
        assert!(check_password_strength("NoSymbols12345").is_err());
    }

    #[test]
    fn required_trims_and_flags_blank() {
        let mut v = Violations::new();
        assert_eq!(required(&mut v, "title", Some("  Beach cleanup ".into())).as_deref(), Some("Beach cleanup"));
        assert!(required(&mut v, "location", Some("   ".into())).is_none());
        assert!(required(&mut v, "description", None).is_none());
        assert_eq!(v.fields(), vec!["location", "description"]);
    }

    #[test]
    fn account_type_enum() {
        let mut v = Violations::new();
        assert_eq!(account_type(&mut v, Some("organizer".into())), Some(AccountType::Organizer));
        assert!(account_type(&mut v, Some("volunteer".into())).is_none());
        assert!(v.contains("accountType"));
    }
}
