//! One-shot flash messages carried on a short-lived cookie: set on redirect,
//! read and cleared on the next rendered page.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

const FLASH_COOKIE: &str = "tentpost_flash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: String,
    pub message: String,
}

/// Queue a flash message for the next page view.
pub fn set(jar: CookieJar, kind: &str, message: &str) -> CookieJar {
    let value = format!("{}:{}", kind, urlencoding::encode(message));
    jar.add(
        Cookie::build((FLASH_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    )
}

/// Pop the pending flash message, clearing the cookie.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let flash = jar.get(FLASH_COOKIE).and_then(|c| decode(c.value()));
    let jar = if flash.is_some() {
        jar.remove(Cookie::build(FLASH_COOKIE).path("/").build())
    } else {
        jar
    };
    (jar, flash)
}

fn decode(value: &str) -> Option<Flash> {
    let (kind, encoded) = value.split_once(':')?;
    let message = urlencoding::decode(encoded).ok()?.into_owned();
    Some(Flash {
        kind: kind.to_string(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_take_roundtrip() {
        let jar = set(CookieJar::new(), "error", "You don't have permission to do that");
        let (jar, flash) = take(jar);
        let flash = flash.expect("flash should be present");
        assert_eq!(flash.kind, "error");
        assert_eq!(flash.message, "You don't have permission to do that");
        let (_, again) = take(jar);
        assert!(again.is_none());
    }

    #[test]
    fn decode_tolerates_colons_in_message() {
        let jar = set(CookieJar::new(), "success", "Updated: all good");
        let (_, flash) = take(jar);
        assert_eq!(flash.unwrap().message, "Updated: all good");
    }

    #[test]
    fn take_on_empty_jar_is_none() {
        let (_, flash) = take(CookieJar::new());
        assert!(flash.is_none());
    }
}
