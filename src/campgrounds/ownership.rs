//! Ownership guard for mutating campground routes: fetch the row, then
//! allow only the recorded author or an admin. Read-then-decide with no
//! locking; a concurrent delete can still win the race.

use sqlx::PgPool;
use uuid::Uuid;

use super::repo::Campground;
use crate::users::repo::User;

#[derive(Debug)]
pub enum Gate {
    Allowed(Campground),
    NotFound,
    Denied(Uuid),
}

pub fn owns_or_admin(user: &User, author_id: Uuid) -> bool {
    user.is_admin || user.id == author_id
}

pub async fn check_campground_ownership(
    db: &PgPool,
    id: Uuid,
    user: &User,
) -> Result<Gate, sqlx::Error> {
    match Campground::find(db, id).await? {
        None => Ok(Gate::NotFound),
        Some(c) if owns_or_admin(user, c.author_id) => Ok(Gate::Allowed(c)),
        Some(c) => Ok(Gate::Denied(c.id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn user(is_admin: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: "camper".into(),
            email: "camper@example.com".into(),
            password_hash: "x".into(),
            avatar: crate::users::repo::DEFAULT_AVATAR.into(),
            first_name: None,
            last_name: None,
            reset_password_token: None,
            reset_password_expires: None,
            is_admin,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn the_author_may_mutate() {
        let u = user(false);
        assert!(owns_or_admin(&u, u.id));
    }

    #[test]
    fn an_admin_may_mutate_anything() {
        let u = user(true);
        assert!(owns_or_admin(&u, Uuid::new_v4()));
    }

    #[test]
    fn anyone_else_is_denied() {
        let u = user(false);
        assert!(!owns_or_admin(&u, Uuid::new_v4()));
    }
}
