use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::geocode::GeocodedPlace;
use crate::users::repo::User;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Campground {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub description: String,
    pub location: String,
    pub lat: f64,
    pub lng: f64,
    pub author_id: Uuid,
    pub author_username: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub campground_id: Uuid,
    pub author_id: Option<Uuid>,
    pub author_username: String,
    pub body: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCampground {
    pub name: String,
    pub image: String,
    pub description: String,
    pub location: String,
    pub lat: f64,
    pub lng: f64,
    pub author_id: Uuid,
    pub author_username: String,
}

impl NewCampground {
    /// Assemble the persisted payload: the location triple comes from one
    /// geocoding result, the image URL from the completed upload, and the
    /// author snapshot from the requesting user.
    pub fn compose(
        name: String,
        description: String,
        place: GeocodedPlace,
        image: String,
        author: &User,
    ) -> Self {
        Self {
            name,
            image,
            description,
            location: place.formatted_address,
            lat: place.lat,
            lng: place.lng,
            author_id: author.id,
            author_username: author.username.clone(),
        }
    }
}

/// Field set applied by the update operation. `image: None` leaves the
/// stored URL untouched.
#[derive(Debug, Clone)]
pub struct CampgroundChanges {
    pub name: String,
    pub description: String,
    pub location: String,
    pub lat: f64,
    pub lng: f64,
    pub image: Option<String>,
}

impl Campground {
    pub async fn list_all(db: &PgPool) -> Result<Vec<Campground>, sqlx::Error> {
        sqlx::query_as::<_, Campground>(
            r#"
            SELECT id, name, image, description, location, lat, lng,
                   author_id, author_username, created_at
            FROM campgrounds
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await
    }

    pub async fn find(db: &PgPool, id: Uuid) -> Result<Option<Campground>, sqlx::Error> {
        sqlx::query_as::<_, Campground>(
            r#"
            SELECT id, name, image, description, location, lat, lng,
                   author_id, author_username, created_at
            FROM campgrounds
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn comments_for(db: &PgPool, id: Uuid) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, campground_id, author_id, author_username, body, created_at
            FROM comments
            WHERE campground_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(db)
        .await
    }

    pub async fn create(db: &PgPool, new: &NewCampground) -> Result<Campground, sqlx::Error> {
        sqlx::query_as::<_, Campground>(
            r#"
            INSERT INTO campgrounds
                (name, image, description, location, lat, lng, author_id, author_username)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, image, description, location, lat, lng,
                      author_id, author_username, created_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.image)
        .bind(&new.description)
        .bind(&new.location)
        .bind(new.lat)
        .bind(new.lng)
        .bind(new.author_id)
        .bind(&new.author_username)
        .fetch_one(db)
        .await
    }

    /// Plain last-write-wins update; no version token guards concurrent
    /// writers.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        changes: &CampgroundChanges,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE campgrounds
            SET name = $2, description = $3, location = $4, lat = $5, lng = $6,
                image = COALESCE($7, image)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(&changes.location)
        .bind(changes.lat)
        .bind(changes.lng)
        .bind(&changes.image)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Removes the row only. Comments and the remote image are left behind.
    pub async fn remove(db: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM campgrounds WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn camper(username: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            email: format!("{username}@example.com"),
            password_hash: "x".into(),
            avatar: crate::users::repo::DEFAULT_AVATAR.into(),
            first_name: None,
            last_name: None,
            reset_password_token: None,
            reset_password_expires: None,
            is_admin: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn compose_takes_the_location_triple_from_one_geocode_result() {
        let author = camper("ranger");
        let place = GeocodedPlace {
            lat: 37.87,
            lng: -119.54,
            formatted_address: "Yosemite National Park, CA".into(),
        };
        let new = NewCampground::compose(
            "Upper Pines".into(),
            "Tall trees, short walk to the river.".into(),
            place,
            "https://host/img1.jpg".into(),
            &author,
        );
        assert_eq!(new.lat, 37.87);
        assert_eq!(new.lng, -119.54);
        assert_eq!(new.location, "Yosemite National Park, CA");
        assert_eq!(new.image, "https://host/img1.jpg");
        assert_eq!(new.author_id, author.id);
        assert_eq!(new.author_username, "ranger");
        assert_eq!(new.name, "Upper Pines");
    }
}
