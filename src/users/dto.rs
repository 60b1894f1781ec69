use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::Violations,
    users::model::AccountType,
    validation::{self, check_password_strength, coerce_year, normalize_email, required},
};

/// Body of `POST /api/users` and `PUT /api/users/:id`. Every field is optional
/// at the JSON level so missing fields are reported together, not one by one.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone_number: Option<String>,
    pub account_type: Option<String>,
    /// Number or numeric string.
    pub graduation_year: Option<Value>,
}

/// Profile fields after validation and coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub account_type: AccountType,
    pub graduation_year: Option<i32>,
}

#[derive(Debug)]
pub struct ValidUser {
    pub profile: UserProfile,
    pub password: Option<String>,
}

impl UserRequest {
    pub fn validate(self, password_required: bool) -> Result<ValidUser, Violations> {
        let mut v = Violations::new();

        let first_name = required(&mut v, "firstName", self.first_name);
        let last_name = required(&mut v, "lastName", self.last_name);

        let email = required(&mut v, "email", self.email).map(|e| normalize_email(&e));
        if let Some(e) = &email {
            if !validation::is_valid_email(e) {
                v.push("email", "must be a valid email address");
            }
        }

        let phone_number = required(&mut v, "phoneNumber", self.phone_number);
        if let Some(p) = &phone_number {
            if !validation::is_valid_phone_number(p) {
                v.push("phoneNumber", "must be (123)456-7890, 1234567890, or 123.456.7890");
            }
        }

        let account_type = validation::account_type(&mut v, self.account_type);

        let graduation_year = match account_type {
            Some(AccountType::Student) => match self.graduation_year.filter(|y| !y.is_null()) {
                None => {
                    v.push("graduationYear", "is required for students");
                    None
                }
                Some(raw) => match coerce_year(&raw) {
                    Some(year) if validation::is_valid_graduation_year(year) => Some(year),
                    _ => {
                        v.push("graduationYear", "must be an integer year between 1900 and 2035");
                        None
                    }
                },
            },
            _ => None,
        };

        let password = match self.password {
            Some(p) => {
                if let Err(reason) = check_password_strength(&p) {
                    v.push("password", reason);
                }
                Some(p)
            }
            None if password_required => {
                v.push("password", "is required");
                None
            }
            None => None,
        };

        v.into_result()?;

        // All present once no violation was recorded.
        match (first_name, last_name, email, phone_number, account_type) {
            (Some(first_name), Some(last_name), Some(email), Some(phone_number), Some(account_type)) => {
                Ok(ValidUser {
                    profile: UserProfile {
                        first_name,
                        last_name,
                        email,
                        phone_number,
                        account_type,
                        graduation_year,
                    },
                    password,
                })
            }
            _ => Err(Violations::single("body", "incomplete user")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> UserRequest {
        serde_json::from_value(body).expect("deserialize")
    }

    fn student_body() -> Value {
        json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": " Ada@B.com ",
            "password": "Str0ng!Passw0rd",
            "phoneNumber": "123.456.7890",
            "accountType": "student",
            "graduationYear": "2026"
        })
    }

    #[test]
    fn coerces_year_and_normalizes_email() {
        let valid = request(student_body()).validate(true).expect("valid");
        assert_eq!(valid.profile.email, "ada@b.com");
        assert_eq!(valid.profile.graduation_year, Some(2026));
        assert_eq!(valid.profile.account_type, AccountType::Student);
        assert!(valid.password.is_some());
    }

    #[test]
    fn graduation_year_dropped_for_non_students() {
        let mut body = student_body();
        body["accountType"] = json!("organizer");
        let valid = request(body).validate(true).expect("valid");
        assert_eq!(valid.profile.graduation_year, None);
    }

    #[test]
    fn students_need_a_usable_year() {
        let mut body = student_body();
        body.as_object_mut().unwrap().remove("graduationYear");
        let err = request(body).validate(true).unwrap_err();
        assert_eq!(err.fields(), vec!["graduationYear"]);

        let mut body = student_body();
        body["graduationYear"] = json!("next year");
        assert!(request(body).validate(true).unwrap_err().contains("graduationYear"));

        let mut body = student_body();
        body["graduationYear"] = json!(1850);
        assert!(request(body).validate(true).unwrap_err().contains("graduationYear"));
    }

    #[test]
    fn reports_every_missing_field() {
        let err = UserRequest::default().validate(true).unwrap_err();
        assert_eq!(
            err.fields(),
            vec!["firstName", "lastName", "email", "phoneNumber", "accountType", "password"]
        );
    }

    #[test]
    fn rejects_bad_formats() {
        let mut body = student_body();
        body["email"] = json!("a@b");
        body["phoneNumber"] = json!("555");
        body["accountType"] = json!("volunteer");
        body["password"] = json!("weak");
        let err = request(body).validate(true).unwrap_err();
        assert_eq!(err.fields(), vec!["email", "phoneNumber", "accountType", "password"]);
    }

    #[test]
    fn password_optional_on_update() {
        let mut body = student_body();
        body.as_object_mut().unwrap().remove("password");
        let valid = request(body).validate(false).expect("valid without password");
        assert!(valid.password.is_none());
    }
}
