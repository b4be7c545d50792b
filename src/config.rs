use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_minutes: i64,
}

/// Credentials for the image-hosting provider. The account name itself is a
/// fixed constant in `media.rs`; only the key pair comes from the
/// environment.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderConfig {
    pub api_key: String,
}

/// SMTP settings for password-reset mail. All optional: an unconfigured
/// mailer logs and skips instead of failing the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub media: MediaConfig,
    pub geocoder: GeocoderConfig,
    pub smtp: SmtpConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "tentpost".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
        };
        let media = MediaConfig {
            api_key: std::env::var("CLOUDINARY_API_KEY")?,
            api_secret: std::env::var("CLOUDINARY_API_SECRET")?,
        };
        let geocoder = GeocoderConfig {
            api_key: std::env::var("GEOCODER_API_KEY")?,
        };
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").ok(),
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            from_address: std::env::var("SMTP_FROM").ok(),
        };
        Ok(Self {
            database_url,
            session,
            media,
            geocoder,
            smtp,
        })
    }
}
