use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use axum_extra::extract::CookieJar;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    forms::parse_listing,
    ownership::{check_campground_ownership, owns_or_admin, Gate},
    repo::{Campground, CampgroundChanges, NewCampground},
};
use crate::{
    auth::session::{CurrentUser, MaybeUser},
    flash,
    media::{asset_public_id, is_image_filename},
    state::AppState,
    views,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/campgrounds", get(index).post(create))
        .route("/campgrounds/new", get(new_form))
        .route("/campgrounds/:id", get(show).put(update).delete(destroy))
        .route("/campgrounds/:id/edit", get(edit_form))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

fn flash_redirect(jar: CookieJar, kind: &str, message: &str, to: &str) -> Response {
    let jar = flash::set(jar, kind, message);
    (jar, Redirect::to(to)).into_response()
}

/// Ownership gate shared by edit/update/delete. Returns the fetched row on
/// success, or the ready-made redirect response on failure.
async fn gate(
    state: &AppState,
    jar: CookieJar,
    user: &crate::users::repo::User,
    id: Uuid,
) -> Result<(CookieJar, Campground), Response> {
    match check_campground_ownership(&state.db, id, user).await {
        Ok(Gate::Allowed(c)) => Ok((jar, c)),
        Ok(Gate::NotFound) => {
            warn!(%id, "campground not found");
            Err(flash_redirect(jar, "error", "Campground not found", "/campgrounds"))
        }
        Ok(Gate::Denied(id)) => {
            warn!(%id, user_id = %user.id, "ownership check denied");
            Err(flash_redirect(
                jar,
                "error",
                "You don't have permission to do that",
                &format!("/campgrounds/{id}"),
            ))
        }
        Err(e) => {
            error!(error = %e, %id, "ownership check failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response())
        }
    }
}

#[instrument(skip(state, jar))]
async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
    MaybeUser(user): MaybeUser,
) -> Response {
    let campgrounds = match Campground::list_all(&state.db).await {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, "listing campgrounds failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response();
        }
    };
    let (jar, pending) = flash::take(jar);
    let page = views::CampgroundsIndex {
        campgrounds,
        current_user: user.map(|u| u.username),
        flash: pending,
    };
    (jar, views::render(page)).into_response()
}

async fn new_form(jar: CookieJar, CurrentUser(user): CurrentUser) -> Response {
    let (jar, pending) = flash::take(jar);
    let page = views::CampgroundNew {
        current_user: Some(user.username),
        flash: pending,
    };
    (jar, views::render(page)).into_response()
}

#[instrument(skip(state, jar, mp))]
async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    mp: Multipart,
) -> Response {
    let upload = match parse_listing(mp).await {
        Ok(u) => u,
        Err(msg) => return flash_redirect(jar, "error", &msg, "/campgrounds/new"),
    };
    let Some(image) = upload.image else {
        return flash_redirect(jar, "error", "An image is required", "/campgrounds/new");
    };
    // File-type filter runs before any upload or persistence.
    if !is_image_filename(&image.filename) {
        return flash_redirect(jar, "error", "Only image files are allowed", "/campgrounds/new");
    }

    let place = match state.geocoder.forward(&upload.location).await {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, location = %upload.location, "geocoding failed");
            return flash_redirect(jar, "error", &e.to_string(), "/campgrounds/new");
        }
    };

    let image_url = match state
        .images
        .upload(&image.filename, image.body, &image.content_type)
        .await
    {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, "image upload failed");
            return flash_redirect(jar, "error", &e.to_string(), "/campgrounds/new");
        }
    };

    let new = NewCampground::compose(upload.name, upload.description, place, image_url, &user);
    match Campground::create(&state.db, &new).await {
        Ok(campground) => {
            info!(campground_id = %campground.id, user_id = %user.id, "campground created");
            let jar = flash::set(jar, "success", "Successfully added a new campground!");
            (jar, Redirect::to(&format!("/campgrounds/{}", campground.id))).into_response()
        }
        Err(e) => {
            error!(error = %e, "persisting campground failed");
            flash_redirect(jar, "error", "Something went wrong", "/campgrounds/new")
        }
    }
}

#[instrument(skip(state, jar))]
async fn show(
    State(state): State<AppState>,
    jar: CookieJar,
    MaybeUser(user): MaybeUser,
    Path(id): Path<Uuid>,
) -> Response {
    let campground = match Campground::find(&state.db, id).await {
        Ok(Some(c)) => c,
        Ok(None) => {
            warn!(%id, "campground not found");
            return flash_redirect(jar, "error", "Campground not found", "/campgrounds");
        }
        Err(e) => {
            error!(error = %e, %id, "fetching campground failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response();
        }
    };
    let comments = match Campground::comments_for(&state.db, id).await {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, %id, "fetching comments failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response();
        }
    };

    let can_modify = user
        .as_ref()
        .map(|u| owns_or_admin(u, campground.author_id))
        .unwrap_or(false);
    let (jar, pending) = flash::take(jar);
    let page = views::CampgroundShow {
        campground,
        comments,
        can_modify,
        current_user: user.map(|u| u.username),
        flash: pending,
    };
    (jar, views::render(page)).into_response()
}

#[instrument(skip(state, jar))]
async fn edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Response {
    let (jar, campground) = match gate(&state, jar, &user, id).await {
        Ok(v) => v,
        Err(response) => return response,
    };
    let (jar, pending) = flash::take(jar);
    let page = views::CampgroundEdit {
        campground,
        current_user: Some(user.username),
        flash: pending,
    };
    (jar, views::render(page)).into_response()
}

#[instrument(skip(state, jar, mp))]
async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> Response {
    let (jar, _existing) = match gate(&state, jar, &user, id).await {
        Ok(v) => v,
        Err(response) => return response,
    };
    let edit_page = format!("/campgrounds/{id}/edit");

    let upload = match parse_listing(mp).await {
        Ok(u) => u,
        Err(msg) => return flash_redirect(jar, "error", &msg, &edit_page),
    };

    // The submitted location is re-geocoded even when unchanged.
    let place = match state.geocoder.forward(&upload.location).await {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, location = %upload.location, "geocoding failed");
            return flash_redirect(jar, "error", &e.to_string(), &edit_page);
        }
    };

    let mut changes = CampgroundChanges {
        name: upload.name,
        description: upload.description,
        location: place.formatted_address,
        lat: place.lat,
        lng: place.lng,
        image: None,
    };

    if let Some(image) = upload.image {
        if !is_image_filename(&image.filename) {
            return flash_redirect(jar, "error", "Only image files are allowed", &edit_page);
        }
        let new_url = match state
            .images
            .upload(&image.filename, image.body, &image.content_type)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "replacement image upload failed");
                return flash_redirect(jar, "error", &e.to_string(), &edit_page);
            }
        };

        // Separate read to derive the old asset id; not transactional with
        // the update below.
        match Campground::find(&state.db, id).await {
            Ok(Some(old)) => {
                if let Some(public_id) = asset_public_id(&old.image) {
                    if let Err(e) = state.images.delete(&public_id).await {
                        warn!(error = %e, %public_id, "old asset delete failed");
                    }
                }
            }
            Ok(None) => warn!(%id, "campground vanished before old image lookup"),
            Err(e) => warn!(error = %e, %id, "old image lookup failed"),
        }
        changes.image = Some(new_url);
    }

    match Campground::update(&state.db, id, &changes).await {
        Ok(_) => {
            info!(campground_id = %id, user_id = %user.id, "campground updated");
            flash_redirect(jar, "success", "Successfully Updated!", &format!("/campgrounds/{id}"))
        }
        Err(e) => {
            error!(error = %e, %id, "updating campground failed");
            flash_redirect(jar, "error", "Something went wrong", &edit_page)
        }
    }
}

#[instrument(skip(state, jar))]
async fn destroy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Response {
    let (jar, _campground) = match gate(&state, jar, &user, id).await {
        Ok(v) => v,
        Err(response) => return response,
    };

    // Comments and the remote image are left in place; the redirect happens
    // regardless of outcome.
    match Campground::remove(&state.db, id).await {
        Ok(_) => info!(campground_id = %id, user_id = %user.id, "campground deleted"),
        Err(e) => error!(error = %e, %id, "deleting campground failed"),
    }
    (jar, Redirect::to("/campgrounds")).into_response()
}
