//! Image hosting adapter: upload a browser-submitted file to the remote
//! asset host and get back the canonical URL; delete a previously uploaded
//! asset by its derived identifier.

use axum::async_trait;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::MediaConfig;

/// Hosting account name. Fixed, not configurable.
const CLOUD_NAME: &str = "img-up";

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Only image files are allowed")]
    NotAnImage,
    #[error("Image upload failed, try again later")]
    Provider(String),
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload an image, returning its canonical secure URL.
    async fn upload(
        &self,
        filename: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, UploadError>;

    /// Remove a previously uploaded asset. Callers treat this as
    /// best-effort; failures are logged, never surfaced.
    async fn delete(&self, public_id: &str) -> Result<(), UploadError>;
}

/// Accept only filenames with an image extension. Checked before any upload
/// or persistence happens.
pub fn is_image_filename(filename: &str) -> bool {
    lazy_static! {
        static ref IMAGE_RE: Regex = Regex::new(r"(?i)\.(jpg|jpeg|png|gif)$").unwrap();
    }
    IMAGE_RE.is_match(filename)
}

/// Derive the provider identifier of a stored asset from its URL: the last
/// path segment with the file extension stripped. This assumes the
/// provider's URL shape; a URL from elsewhere derives a wrong identifier
/// silently.
pub fn asset_public_id(url: &str) -> Option<String> {
    let segment = url.rsplit('/').next()?;
    let id = segment.split('.').next()?;
    if id.is_empty() {
        return None;
    }
    Some(id.to_string())
}

// --- provider wire types ---

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

pub struct CloudinaryHost {
    client: reqwest::Client,
    api_key: String,
    api_secret: String,
}

impl CloudinaryHost {
    pub fn new(config: &MediaConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| UploadError::Provider(e.to_string()))?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{API_BASE}/{CLOUD_NAME}/image/{action}")
    }

    fn unix_timestamp() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Request signature: sha-256 hex over the alphabetically ordered
/// `key=value` pairs joined with `&`, with the API secret appended.
fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by_key(|(k, _)| *k);
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let digest = Sha256::digest(format!("{joined}{api_secret}").as_bytes());
    hex::encode(digest)
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(
        &self,
        filename: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, UploadError> {
        if !is_image_filename(filename) {
            return Err(UploadError::NotAnImage);
        }
        let timestamp = Self::unix_timestamp().to_string();
        let signature = sign_params(
            &[("timestamp", &timestamp), ("signature_algorithm", "sha256")],
            &self.api_secret,
        );

        let file = reqwest::multipart::Part::bytes(body.to_vec())
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| UploadError::Provider(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Provider(e.to_string()))?;
        if !response.status().is_success() {
            return Err(UploadError::Provider(format!("http {}", response.status())));
        }
        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Provider(e.to_string()))?;
        Ok(body.secure_url)
    }

    async fn delete(&self, public_id: &str) -> Result<(), UploadError> {
        let timestamp = Self::unix_timestamp().to_string();
        let signature = sign_params(
            &[
                ("public_id", public_id),
                ("timestamp", &timestamp),
                ("signature_algorithm", "sha256"),
            ],
            &self.api_secret,
        );

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("api_key", &self.api_key),
                ("timestamp", &timestamp),
                ("signature_algorithm", "sha256"),
                ("signature", &signature),
            ])
            .send()
            .await
            .map_err(|e| UploadError::Provider(e.to_string()))?;
        if !response.status().is_success() {
            return Err(UploadError::Provider(format!("http {}", response.status())));
        }
        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Provider(e.to_string()))?;
        if body.result != "ok" {
            return Err(UploadError::Provider(format!("destroy result {}", body.result)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_filenames_pass_the_filter() {
        assert!(is_image_filename("tent.jpg"));
        assert!(is_image_filename("tent.JPEG"));
        assert!(is_image_filename("a.b.png"));
        assert!(is_image_filename("river.gif"));
    }

    #[test]
    fn non_image_filenames_are_rejected() {
        assert!(!is_image_filename("notes.txt"));
        assert!(!is_image_filename("archive.jpg.zip"));
        assert!(!is_image_filename("no_extension"));
        assert!(!is_image_filename(""));
    }

    #[test]
    fn public_id_is_last_segment_sans_extension() {
        assert_eq!(
            asset_public_id("https://res.cloudinary.com/img-up/image/upload/v42/abc123.jpg"),
            Some("abc123".to_string())
        );
        assert_eq!(
            asset_public_id("https://host/img1.jpg"),
            Some("img1".to_string())
        );
    }

    #[test]
    fn public_id_takes_everything_before_the_first_dot() {
        assert_eq!(
            asset_public_id("https://host/photo.backup.png"),
            Some("photo".to_string())
        );
    }

    #[test]
    fn public_id_of_extensionless_segment_is_the_segment() {
        assert_eq!(asset_public_id("https://host/rawid"), Some("rawid".to_string()));
    }

    #[test]
    fn public_id_of_trailing_slash_is_none() {
        assert_eq!(asset_public_id("https://host/dir/"), None);
    }

    #[test]
    fn signature_is_deterministic_and_order_independent() {
        let a = sign_params(&[("timestamp", "1000"), ("public_id", "abc")], "s3cret");
        let b = sign_params(&[("public_id", "abc"), ("timestamp", "1000")], "s3cret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sign_params(&[("timestamp", "1000"), ("public_id", "abc")], "other"));
    }
}
