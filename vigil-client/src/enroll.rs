//! Face enrollment: a person's name plus the photos captured for them,
//! uploaded as one multipart request.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use reqwest::multipart::{Form, Part};
use reqwest::Method;

use crate::context::ApiClient;
use crate::error::{ClientError, Result};
use crate::validate;
use crate::wire;

pub const UPLOAD_PATH: &str = "/api/uploadapi";
pub const NAME_FIELD: &str = "name";
pub const IMAGE_FIELD: &str = "pic";

#[derive(Debug, Clone, Default)]
pub struct Enrollment {
    person_name: String,
    images: Vec<PathBuf>,
}

impl Enrollment {
    pub fn new(person_name: impl Into<String>) -> Self {
        Self {
            person_name: person_name.into(),
            images: Vec::new(),
        }
    }

    pub fn person_name(&self) -> &str {
        &self.person_name
    }

    pub fn set_person_name(&mut self, name: impl Into<String>) {
        self.person_name = name.into();
    }

    pub fn add_image(&mut self, path: impl Into<PathBuf>) {
        self.images.push(path.into());
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn clear(&mut self) {
        self.person_name.clear();
        self.images.clear();
    }

    /// Send the name and every captured image. The capture is cleared only
    /// once the backend accepts it, so a failed upload can be retried as is.
    pub async fn upload(&mut self, api: &ApiClient) -> Result<()> {
        validate::required("Person's name", &self.person_name)?;
        api.require_session()?;

        let form = self.build_form().await?;
        let resp = api
            .authed_raw(Method::POST, UPLOAD_PATH)?
            .multipart(form)
            .send()
            .await?;
        wire::check(resp).await?;

        log::info!(
            "uploaded {} image(s) for {}",
            self.images.len(),
            self.person_name.trim()
        );
        self.clear();
        Ok(())
    }

    async fn build_form(&self) -> Result<Form> {
        let mut form = Form::new().text(NAME_FIELD, self.person_name.trim().to_string());
        for (index, path) in self.images.iter().enumerate() {
            let bytes = load_jpeg(path).await?;
            let part = Part::bytes(bytes)
                .file_name(format!("image_{index}.jpg"))
                .mime_str("image/jpeg")?;
            form = form.part(IMAGE_FIELD, part);
        }
        Ok(form)
    }
}

/// Read an image file as JPEG bytes. JPEG input passes through untouched;
/// anything else `image` can decode is re-encoded.
pub async fn load_jpeg(path: &Path) -> Result<Vec<u8>> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
        path: path.display().to_string(),
        source,
    })?;
    if matches!(image::guess_format(&bytes), Ok(ImageFormat::Jpeg)) {
        return Ok(bytes);
    }

    let image_err = |source: image::ImageError| ClientError::Image {
        path: path.display().to_string(),
        source,
    };
    let decoded = image::load_from_memory(&bytes).map_err(image_err)?;
    let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());
    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Jpeg).map_err(image_err)?;
    log::debug!("re-encoded {} as jpeg", path.display());
    Ok(out.into_inner())
}
