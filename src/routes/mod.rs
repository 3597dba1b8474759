pub mod admin;
pub mod auth;
pub mod exercises;
pub mod home;
pub mod profile;
pub mod rewards;
pub mod users;
pub mod workouts;

use askama::Template;
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::extractors::PageContext;
use crate::forms::{BoundForm, Field};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .merge(auth::router())
        .merge(exercises::router())
        .merge(workouts::router())
        .merge(profile::router())
        .merge(users::router())
        .merge(rewards::router())
        .merge(admin::router())
}

/// Every simple form page shares one layout.
#[derive(Template)]
#[template(path = "pages/form.html")]
pub struct FormPage {
    pub ctx: PageContext,
    pub title: String,
    pub intro: String,
    pub action: String,
    pub submit: &'static str,
    pub fields: Vec<Field>,
    pub non_field_errors: Vec<String>,
}

pub struct FormSpec {
    pub title: String,
    pub intro: String,
    pub action: String,
    pub submit: &'static str,
}

impl FormSpec {
    pub fn new(title: impl Into<String>, action: impl Into<String>, submit: &'static str) -> Self {
        Self {
            title: title.into(),
            intro: String::new(),
            action: action.into(),
            submit,
        }
    }

    pub fn intro(mut self, intro: impl Into<String>) -> Self {
        self.intro = intro.into();
        self
    }

    pub fn render(self, ctx: PageContext, form: &BoundForm, fields: Vec<Field>) -> Response {
        let non_field_errors = form.non_field_errors();
        ctx.render(|ctx| FormPage {
            ctx,
            title: self.title,
            intro: self.intro,
            action: self.action,
            submit: self.submit,
            fields,
            non_field_errors,
        })
    }
}
