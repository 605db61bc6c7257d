// Submitted forms and their rules

use chrono::NaiveDate;
use daybook_core::Error;
use daybook_validation::{
    EMAIL_RX, Validatable, Validation, check_date, matches, min_chars, min_max_integer, not_blank,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::NewDay;

pub const BLANK: &str = "This field cannot be blank";
pub const INVALID_EMAIL: &str = "This field must be a valid email address";
pub const SHORT_PASSWORD: &str = "This field must be at least 8 characters long";
pub const DUPLICATE_EMAIL: &str = "Email address is already in use";
pub const BAD_CREDENTIALS: &str = "Email or password is incorrect";
pub const INCORRECT_VALUE: &str = "This field contains incorrect value";
pub const INCORRECT_DATE: &str = "This field contains incorrect date";

pub const DATE_LAYOUT: &str = "YYYY-MM-DD";
const NUTRIENT_MAX: i64 = 100_000;
const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DayCreateForm {
    #[serde(deserialize_with = "blank_as_zero")]
    pub calories: i64,
    #[serde(deserialize_with = "blank_as_zero")]
    pub proteins: i64,
    #[serde(deserialize_with = "blank_as_zero")]
    pub fats: i64,
    #[serde(deserialize_with = "blank_as_zero")]
    pub carbs: i64,
    #[serde(deserialize_with = "blank_as_zero")]
    pub fibre: i64,
    pub date: String,
    #[serde(skip_deserializing)]
    pub validation: Validation,
}

/// An empty numeric input counts as zero, like a field that was left out.
fn blank_as_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse()
        .map_err(|e| serde::de::Error::custom(format!("invalid number {:?}: {}", raw, e)))
}

impl DayCreateForm {
    pub fn validate(&mut self) {
        for (field, value) in [
            ("calories", self.calories),
            ("proteins", self.proteins),
            ("fats", self.fats),
            ("carbs", self.carbs),
            ("fibre", self.fibre),
        ] {
            let ok = min_max_integer(value, 0, NUTRIENT_MAX);
            self.check_field(ok, field, INCORRECT_VALUE);
        }

        let ok = check_date(&self.date, DATE_LAYOUT);
        self.check_field(ok, "date", INCORRECT_DATE);
    }

    /// The record to store. Only meaningful once the form is valid.
    pub fn to_new_day(&self) -> Result<NewDay, Error> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|e| Error::BadRequest(format!("date {:?}: {}", self.date, e)))?;

        Ok(NewDay {
            calories: self.calories,
            proteins: self.proteins,
            fats: self.fats,
            carbs: self.carbs,
            fibre: self.fibre,
            date,
        })
    }
}

impl Validatable for DayCreateForm {
    fn validation(&self) -> &Validation {
        &self.validation
    }

    fn validation_mut(&mut self) -> &mut Validation {
        &mut self.validation
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserSignupForm {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_deserializing)]
    pub validation: Validation,
}

impl UserSignupForm {
    pub fn validate(&mut self) {
        let ok = not_blank(&self.name);
        self.check_field(ok, "name", BLANK);

        let ok = not_blank(&self.email);
        self.check_field(ok, "email", BLANK);
        let ok = matches(&self.email, &EMAIL_RX);
        self.check_field(ok, "email", INVALID_EMAIL);

        let ok = not_blank(&self.password);
        self.check_field(ok, "password", BLANK);
        let ok = min_chars(&self.password, MIN_PASSWORD_CHARS);
        self.check_field(ok, "password", SHORT_PASSWORD);
    }
}

impl Validatable for UserSignupForm {
    fn validation(&self) -> &Validation {
        &self.validation
    }

    fn validation_mut(&mut self) -> &mut Validation {
        &mut self.validation
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserLoginForm {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_deserializing)]
    pub validation: Validation,
}

impl UserLoginForm {
    pub fn validate(&mut self) {
        let ok = not_blank(&self.email);
        self.check_field(ok, "email", BLANK);
        let ok = matches(&self.email, &EMAIL_RX);
        self.check_field(ok, "email", INVALID_EMAIL);

        let ok = not_blank(&self.password);
        self.check_field(ok, "password", BLANK);
    }
}

impl Validatable for UserLoginForm {
    fn validation(&self) -> &Validation {
        &self.validation
    }

    fn validation_mut(&mut self) -> &mut Validation {
        &mut self.validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daybook_core::parse_form;

    #[test]
    fn test_day_form_decodes_and_validates() {
        let mut form: DayCreateForm = parse_form(
            b"calories=2100&proteins=120&fats=70&carbs=240&fibre=35&date=2024-02-29",
        )
        .unwrap();
        form.validate();

        assert!(form.valid());
        assert_eq!(form.to_new_day().unwrap().date.to_string(), "2024-02-29");
    }

    #[test]
    fn test_day_form_errors() {
        let mut form: DayCreateForm =
            parse_form(b"calories=-1&proteins=100001&fats=0&carbs=0&fibre=0&date=2023-02-29")
                .unwrap();
        form.validate();

        let errors = form.validation().field_errors();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors["calories"], INCORRECT_VALUE);
        assert_eq!(errors["proteins"], INCORRECT_VALUE);
        assert_eq!(errors["date"], INCORRECT_DATE);
    }

    #[test]
    fn test_day_form_rejects_non_numbers() {
        assert!(parse_form::<DayCreateForm>(b"calories=lots").is_err());
        assert!(parse_form::<DayCreateForm>(b"calories=+").is_err());
    }

    #[test]
    fn test_day_form_blank_numbers_are_zero() {
        let form: DayCreateForm =
            parse_form(b"calories=2000&proteins=&fats=1&date=2024-01-01").unwrap();

        assert_eq!(form.calories, 2000);
        assert_eq!(form.proteins, 0);
        assert_eq!(form.carbs, 0);
        assert_eq!(form.fats, 1);
    }

    #[test]
    fn test_signup_first_error_per_field() {
        let mut form: UserSignupForm = parse_form(b"name=&email=&password=").unwrap();
        form.validate();

        let v = form.validation();
        assert_eq!(v.field_error("name"), Some(BLANK));
        assert_eq!(v.field_error("email"), Some(BLANK));
        assert_eq!(v.field_error("password"), Some(BLANK));
    }

    #[test]
    fn test_signup_messages() {
        let mut form: UserSignupForm =
            parse_form(b"name=Alice&email=not+an+email&password=short").unwrap();
        form.validate();

        let v = form.validation();
        assert_eq!(v.field_error("name"), None);
        assert_eq!(v.field_error("email"), Some(INVALID_EMAIL));
        assert_eq!(v.field_error("password"), Some(SHORT_PASSWORD));
    }

    #[test]
    fn test_login_form_keeps_password_out_of_output() {
        let mut form: UserLoginForm =
            parse_form(b"email=alice%40example.com&password=secret").unwrap();
        form.validate();
        assert!(form.valid());

        let json = serde_json::to_value(&form).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "alice@example.com");
    }
}
