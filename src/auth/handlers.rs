use axum::{
    extract::{FromRef, Path, State},
    http::{header::HOST, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::CookieJar;
use rand::RngCore;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        forms::{is_valid_email, ForgotForm, LoginForm, RegisterForm, ResetForm},
        session::{self, MaybeUser, SessionKeys},
    },
    flash,
    state::AppState,
    users::repo::{is_unique_violation, NewUser, User},
    views,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
        .route("/forgot", get(forgot_form).post(forgot))
        .route("/reset/:token", get(reset_form).post(reset))
}

async fn register_form(jar: CookieJar, MaybeUser(user): MaybeUser) -> Response {
    let (jar, pending) = flash::take(jar);
    let page = views::Register {
        error: None,
        current_user: user.map(|u| u.username),
        flash: pending,
    };
    (jar, views::render(page)).into_response()
}

#[instrument(skip(state, jar, payload))]
async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(mut payload): Form<RegisterForm>,
) -> Response {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if let Some(problem) = registration_problem(&payload) {
        return register_error(StatusCode::BAD_REQUEST, problem);
    }

    // Friendlier than surfacing the unique-constraint violation.
    match User::find_by_username(&state.db, &payload.username).await {
        Ok(Some(_)) => {
            warn!(username = %payload.username, "username already registered");
            return register_error(StatusCode::CONFLICT, "That username is already taken");
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "username lookup failed");
            return register_error(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong");
        }
    }
    if let Ok(Some(_)) = User::find_by_email(&state.db, &payload.email).await {
        warn!(email = %payload.email, "email already registered");
        return register_error(StatusCode::CONFLICT, "That email is already registered");
    }

    let hash = match state.passwords.hash(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "password hashing failed");
            return register_error(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong");
        }
    };

    let new = NewUser {
        username: payload.username,
        email: payload.email,
        first_name: payload.first_name.filter(|s| !s.is_empty()),
        last_name: payload.last_name.filter(|s| !s.is_empty()),
        avatar: payload.avatar.filter(|s| !s.is_empty()),
    };
    let user = match User::create(&state.db, &new, &hash).await {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            return register_error(StatusCode::CONFLICT, "That username or email is already taken");
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return register_error(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong");
        }
    };

    info!(user_id = %user.id, username = %user.username, "user registered");
    let message = format!("Welcome to Tentpost, {}!", user.username);
    sign_in(&state, jar, &user, &message)
}

fn registration_problem(payload: &RegisterForm) -> Option<&'static str> {
    if payload.username.is_empty() {
        return Some("Username is required");
    }
    if !is_valid_email(&payload.email) {
        return Some("Invalid email address");
    }
    if payload.password.len() < 8 {
        return Some("Password must be at least 8 characters");
    }
    None
}

fn register_error(status: StatusCode, message: &str) -> Response {
    let page = views::Register {
        error: Some(message.to_string()),
        current_user: None,
        flash: None,
    };
    (status, views::render(page)).into_response()
}

async fn login_form(jar: CookieJar, MaybeUser(user): MaybeUser) -> Response {
    let (jar, pending) = flash::take(jar);
    let page = views::Login {
        error: None,
        current_user: user.map(|u| u.username),
        flash: pending,
    };
    (jar, views::render(page)).into_response()
}

#[instrument(skip(state, jar, payload))]
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(payload): Form<LoginForm>,
) -> Response {
    let user = match User::find_by_username(&state.db, payload.username.trim()).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(username = %payload.username, "login unknown username");
            return login_error();
        }
        Err(e) => {
            error!(error = %e, "login lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response();
        }
    };

    match state.passwords.verify(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id = %user.id, "login invalid password");
            return login_error();
        }
        Err(e) => {
            error!(error = %e, "password verify failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response();
        }
    }

    info!(user_id = %user.id, username = %user.username, "user logged in");
    let message = format!("Welcome back, {}!", user.username);
    sign_in(&state, jar, &user, &message)
}

fn login_error() -> Response {
    let page = views::Login {
        error: Some("Invalid username or password".to_string()),
        current_user: None,
        flash: None,
    };
    (StatusCode::UNAUTHORIZED, views::render(page)).into_response()
}

fn sign_in(state: &AppState, jar: CookieJar, user: &User, message: &str) -> Response {
    let keys = SessionKeys::from_ref(state);
    let token = match keys.sign(user.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "session sign failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response();
        }
    };
    let jar = flash::set(jar.add(session::session_cookie(token)), "success", message);
    (jar, Redirect::to("/campgrounds")).into_response()
}

async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(session::expired_session_cookie());
    let jar = flash::set(jar, "success", "Logged you out!");
    (jar, Redirect::to("/campgrounds"))
}

async fn forgot_form(jar: CookieJar, MaybeUser(user): MaybeUser) -> Response {
    let (jar, pending) = flash::take(jar);
    let page = views::Forgot {
        current_user: user.map(|u| u.username),
        flash: pending,
    };
    (jar, views::render(page)).into_response()
}

#[instrument(skip(state, jar, payload))]
async fn forgot(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Form(payload): Form<ForgotForm>,
) -> Response {
    let email = payload.email.trim().to_lowercase();
    let user = match User::find_by_email(&state.db, &email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            let jar = flash::set(jar, "error", "No account with that email address exists");
            return (jar, Redirect::to("/forgot")).into_response();
        }
        Err(e) => {
            error!(error = %e, "forgot lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response();
        }
    };

    let token = reset_token();
    let expires = OffsetDateTime::now_utc() + Duration::hours(1);
    if let Err(e) = User::set_reset_token(&state.db, user.id, &token, expires).await {
        error!(error = %e, "storing reset token failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response();
    }

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let body = format!(
        "You are receiving this because you (or someone else) requested a password reset \
         for your account.\n\nFollow this link to complete the process:\n\n\
         http://{host}/reset/{token}\n\nIf you did not request this, ignore this email \
         and your password will remain unchanged."
    );
    if let Err(e) = state
        .mailer
        .send(&user.email, "Tentpost password reset", &body)
        .await
    {
        error!(error = %e, "sending reset email failed");
        let jar = flash::set(jar, "error", "Failed to send the reset email, try again later");
        return (jar, Redirect::to("/forgot")).into_response();
    }

    info!(user_id = %user.id, "password reset email sent");
    let message = format!("An e-mail has been sent to {} with further instructions", user.email);
    let jar = flash::set(jar, "success", &message);
    (jar, Redirect::to("/forgot")).into_response()
}

fn reset_token() -> String {
    let mut buf = [0u8; 20];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

async fn reset_form(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(token): Path<String>,
) -> Response {
    match User::find_by_valid_reset_token(&state.db, &token).await {
        Ok(Some(_)) => {
            let (jar, pending) = flash::take(jar);
            let page = views::Reset {
                token,
                current_user: None,
                flash: pending,
            };
            (jar, views::render(page)).into_response()
        }
        Ok(None) => {
            let jar = flash::set(jar, "error", "Password reset token is invalid or has expired");
            (jar, Redirect::to("/forgot")).into_response()
        }
        Err(e) => {
            error!(error = %e, "reset token lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
        }
    }
}

#[instrument(skip(state, jar, payload))]
async fn reset(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(token): Path<String>,
    Form(payload): Form<ResetForm>,
) -> Response {
    let user = match User::find_by_valid_reset_token(&state.db, &token).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            let jar = flash::set(jar, "error", "Password reset token is invalid or has expired");
            return (jar, Redirect::to("/forgot")).into_response();
        }
        Err(e) => {
            error!(error = %e, "reset token lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response();
        }
    };

    if payload.password != payload.confirm {
        let jar = flash::set(jar, "error", "Passwords do not match");
        return (jar, Redirect::to(&format!("/reset/{token}"))).into_response();
    }
    if payload.password.len() < 8 {
        let jar = flash::set(jar, "error", "Password must be at least 8 characters");
        return (jar, Redirect::to(&format!("/reset/{token}"))).into_response();
    }

    let hash = match state.passwords.hash(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "password hashing failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response();
        }
    };
    if let Err(e) = User::reset_password(&state.db, user.id, &hash).await {
        error!(error = %e, "applying password reset failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response();
    }

    // Confirmation mail is best-effort.
    let body = format!(
        "Hello,\n\nThis is a confirmation that the password for your account {} has just \
         been changed.",
        user.email
    );
    if let Err(e) = state
        .mailer
        .send(&user.email, "Your password has been changed", &body)
        .await
    {
        warn!(error = %e, "confirmation email failed");
    }

    info!(user_id = %user.id, "password reset completed");
    sign_in(&state, jar, &user, "Success! Your password has been changed")
}
