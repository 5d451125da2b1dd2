//! Product image upload and validation.
//!
//! Uploads are checked locally against an [`ImagePolicy`] before any bytes
//! leave the machine. The server publishes its own policy at
//! `GET /images/config`; until it is fetched the built-in defaults apply.

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use super::{ApiClient, ApiError};
use crate::models::ApiMessage;

/// Default maximum upload size (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// MIME types accepted when the server has not said otherwise.
pub const DEFAULT_ALLOWED_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Errors from the image helpers.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image is {size} bytes, maximum is {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("unsupported image type {0}")]
    UnsupportedType(String),

    #[error("image is empty")]
    Empty,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// A third-party host suggested for users who prefer linking to uploading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHost {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Upload constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePolicy {
    pub max_file_size: u64,
    pub allowed_types: Vec<String>,
    #[serde(default)]
    pub suggested_services: Vec<ImageHost>,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_types: DEFAULT_ALLOWED_TYPES.iter().map(|t| (*t).to_owned()).collect(),
            suggested_services: vec![
                ImageHost {
                    name: "ImgBB".to_owned(),
                    url: "https://imgbb.com/".to_owned(),
                    description: Some("Free image hosting with API support".to_owned()),
                },
                ImageHost {
                    name: "PostImages".to_owned(),
                    url: "https://postimages.org/".to_owned(),
                    description: Some("Simple drag & drop image hosting".to_owned()),
                },
                ImageHost {
                    name: "Imgur".to_owned(),
                    url: "https://imgur.com/".to_owned(),
                    description: Some("Popular image hosting platform".to_owned()),
                },
            ],
        }
    }
}

impl ImagePolicy {
    /// Check an upload's type and size.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError`] if the upload is empty, too large, or of a type
    /// the policy does not allow.
    pub fn validate(&self, content_type: &str, size: u64) -> Result<(), ImageError> {
        if size == 0 {
            return Err(ImageError::Empty);
        }
        if size > self.max_file_size {
            return Err(ImageError::TooLarge {
                size,
                max: self.max_file_size,
            });
        }
        let content_type = content_type.trim().to_ascii_lowercase();
        if !self.allowed_types.iter().any(|t| *t == content_type) {
            return Err(ImageError::UnsupportedType(content_type));
        }
        Ok(())
    }
}

/// A file to upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Server answer to a successful upload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    #[serde(alias = "imageUrl")]
    pub url: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
struct ValidateUrlRequest<'a> {
    url: &'a str,
}

impl ApiClient {
    /// `GET /images/config`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    #[instrument(skip(self))]
    pub async fn image_policy(&self) -> Result<ImagePolicy, ApiError> {
        self.get("/images/config").await
    }

    /// `POST /images/validate-url`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the server rejects the URL.
    #[instrument(skip(self))]
    pub async fn validate_image_url(&self, url: &str) -> Result<ApiMessage, ApiError> {
        self.post("/images/validate-url", &ValidateUrlRequest { url })
            .await
    }

    /// `POST /images/upload` (multipart, field `image`)
    ///
    /// # Errors
    ///
    /// Returns [`ImageError`] if local validation fails or the upload is
    /// rejected.
    #[instrument(skip_all, fields(file = %upload.file_name, bytes = upload.bytes.len()))]
    pub async fn upload_image(
        &self,
        policy: &ImagePolicy,
        upload: ImageUpload,
    ) -> Result<UploadedImage, ImageError> {
        let size = u64::try_from(upload.bytes.len()).unwrap_or(u64::MAX);
        policy.validate(&upload.content_type, size)?;

        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)
            .map_err(ApiError::from)?;
        let form = Form::new().part("image", part);

        let request = self
            .request(Method::POST, "/images/upload", &[])?
            .multipart(form);
        let uploaded: UploadedImage = self.send(request).await?;
        info!(url = %uploaded.url, "Image uploaded");
        Ok(uploaded)
    }
}
