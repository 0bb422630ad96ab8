use std::path::Path;

use reqwest::multipart::{Form, Part};
use tracing::instrument;

use crate::core::client::ApiClient;
use crate::core::error::Error;
use crate::token::store::TokenStore;

#[derive(Clone, Debug)]
pub struct ImageService<S> {
    client: ApiClient<S>,
}

impl<S: TokenStore> ImageService<S> {
    pub fn new(client: ApiClient<S>) -> Self {
        Self { client }
    }

    /// Uploads the file at `local_path` as the `file` field of a multipart
    /// form. Returns the UUID the backend assigned to the image.
    #[instrument(skip(self))]
    pub async fn upload_image(
        &self,
        local_path: &Path,
        filename: &str,
        mime_type: &str,
    ) -> Result<String, Error> {
        let bytes = tokio::fs::read(local_path).await?;

        let part = Part::bytes(bytes)
            .file_name(filename.to_owned())
            .mime_str(mime_type)?;

        let uuid: String = self
            .client
            .post_multipart("/image", Form::new().part("file", part))
            .await?;

        tracing::debug!("Uploaded {}, UUID: {}", filename, uuid);

        Ok(uuid)
    }

    /// Like [`upload_image`](Self::upload_image), taking the name from the
    /// path and the MIME type from its extension.
    pub async fn upload_file(&self, local_path: &Path) -> Result<String, Error> {
        let filename = local_path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("upload-{}", chrono::Utc::now().timestamp_millis()));

        let mime_type = mime_type_for(&filename);

        self.upload_image(local_path, &filename, mime_type).await
    }

    /// Where the image can be fetched from. Never touches the network.
    pub fn get_image_url(&self, uuid: Option<&str>) -> Option<String> {
        uuid.filter(|u| !u.is_empty())
            .map(|u| format!("{}/image/{}", self.client.base_url(), u))
    }
}

pub fn mime_type_for(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
