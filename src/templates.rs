// Page rendering
//
// Pages are rendered as JSON documents. Every page carries the same common
// fields so a front end can draw navigation, flash messages and forms.

use chrono::{Datelike, Utc};
use daybook_core::{Error, HttpResponse, RequestContext};
use daybook_session::FLASH_KEY;
use serde::Serialize;

use crate::models::{Day, User};

#[derive(Debug, Serialize)]
pub struct TemplateData {
    pub page: &'static str,
    pub current_year: i32,
    pub flash: Option<String>,
    pub is_authenticated: bool,
    pub csrf_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<Day>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<Day>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl TemplateData {
    /// Common data for `page`. Consumes the pending flash message.
    pub fn new(page: &'static str, ctx: &RequestContext) -> Self {
        Self {
            page,
            current_year: Utc::now().year(),
            flash: ctx.session().and_then(|s| s.pop_string(FLASH_KEY)),
            is_authenticated: ctx.is_authenticated(),
            csrf_token: ctx.csrf_token().map(str::to_string),
            form: None,
            day: None,
            days: None,
            user: None,
        }
    }

    pub fn with_form<T: Serialize>(mut self, form: &T) -> Result<Self, Error> {
        let value = serde_json::to_value(form).map_err(|e| Error::Serialization(e.to_string()))?;
        self.form = Some(value);
        Ok(self)
    }

    pub fn with_day(mut self, day: Day) -> Self {
        self.day = Some(day);
        self
    }

    pub fn with_days(mut self, days: Vec<Day>) -> Self {
        self.days = Some(days);
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn render(&self, status: u16) -> Result<HttpResponse, Error> {
        HttpResponse::new(status).with_json(self)
    }
}
