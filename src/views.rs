//! Askama page definitions. Every page carries the signed-in username (for
//! the navigation) and the pending flash message.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::campgrounds::repo::{Campground, Comment};
use crate::flash::Flash;

pub fn render<T: Template>(template: T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "template render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
        }
    }
}

#[derive(Template)]
#[template(path = "campgrounds/index.html")]
pub struct CampgroundsIndex {
    pub campgrounds: Vec<Campground>,
    pub current_user: Option<String>,
    pub flash: Option<Flash>,
}

#[derive(Template)]
#[template(path = "campgrounds/new.html")]
pub struct CampgroundNew {
    pub current_user: Option<String>,
    pub flash: Option<Flash>,
}

#[derive(Template)]
#[template(path = "campgrounds/show.html")]
pub struct CampgroundShow {
    pub campground: Campground,
    pub comments: Vec<Comment>,
    pub can_modify: bool,
    pub current_user: Option<String>,
    pub flash: Option<Flash>,
}

#[derive(Template)]
#[template(path = "campgrounds/edit.html")]
pub struct CampgroundEdit {
    pub campground: Campground,
    pub current_user: Option<String>,
    pub flash: Option<Flash>,
}

#[derive(Template)]
#[template(path = "auth/register.html")]
pub struct Register {
    pub error: Option<String>,
    pub current_user: Option<String>,
    pub flash: Option<Flash>,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct Login {
    pub error: Option<String>,
    pub current_user: Option<String>,
    pub flash: Option<Flash>,
}

#[derive(Template)]
#[template(path = "auth/forgot.html")]
pub struct Forgot {
    pub current_user: Option<String>,
    pub flash: Option<Flash>,
}

#[derive(Template)]
#[template(path = "auth/reset.html")]
pub struct Reset {
    pub token: String,
    pub current_user: Option<String>,
    pub flash: Option<Flash>,
}
