use axum::extract::Multipart;
use bytes::Bytes;

/// The multipart body of the create/update forms. `image` is absent when
/// the browser submits the file input empty.
#[derive(Debug, Default)]
pub struct ListingUpload {
    pub name: String,
    pub description: String,
    pub location: String,
    pub image: Option<ImageUpload>,
}

#[derive(Debug)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub body: Bytes,
}

pub async fn parse_listing(mut mp: Multipart) -> Result<ListingUpload, String> {
    let mut upload = ListingUpload::default();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|_| "Invalid form submission".to_string())?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "name" => upload.name = field.text().await.map_err(bad_field)?,
            "description" => upload.description = field.text().await.map_err(bad_field)?,
            "location" => upload.location = field.text().await.map_err(bad_field)?,
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let body = field.bytes().await.map_err(bad_field)?;
                if filename.is_empty() || body.is_empty() {
                    continue;
                }
                upload.image = Some(ImageUpload {
                    filename,
                    content_type,
                    body,
                });
            }
            _ => {}
        }
    }

    if upload.name.trim().is_empty()
        || upload.description.trim().is_empty()
        || upload.location.trim().is_empty()
    {
        return Err("Name, description and location are all required".to_string());
    }
    Ok(upload)
}

fn bad_field(_: axum::extract::multipart::MultipartError) -> String {
    "Invalid form submission".to_string()
}
