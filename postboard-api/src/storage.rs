use async_trait::async_trait;
use axum::body::Bytes;
use std::{
    ffi::OsStr,
    fmt::Debug,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Path prefix under which [`LocalStorage`] uploads are served.
pub const UPLOADS_ROUTE: &str = "/uploads";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Writing the image failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("The storage backend returned no location for the image")]
    MissingLocation,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Somewhere to put uploaded images. Returns the public URL of the stored blob.
#[async_trait]
pub trait ObjectStorage: Debug + Send + Sync {
    async fn store_image(&self, image: ImageUpload) -> Result<String, StorageError>;
}

/// Writes images into a directory that is served at [`UPLOADS_ROUTE`].
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct LocalStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalStorage {
    #[must_use]
    pub fn new(root: PathBuf, public_url: &str) -> Self {
        Self {
            root,
            public_url: public_url.trim_end_matches('/').to_owned(),
        }
    }

    /// A fresh file name that keeps the extension of the uploaded file.
    fn object_key(file_name: Option<&str>) -> String {
        let id = Uuid::new_v4();
        match file_name
            .map(Path::new)
            .and_then(Path::extension)
            .and_then(OsStr::to_str)
        {
            Some(extension) => format!("{id}.{extension}"),
            None => id.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn store_image(&self, image: ImageUpload) -> Result<String, StorageError> {
        let key = Self::object_key(image.file_name.as_deref());

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&key), &image.bytes).await?;

        let location = format!("{}{UPLOADS_ROUTE}/{key}", self.public_url);
        info!(
            %location,
            content_type = ?image.content_type,
            bytes = image.bytes.len(),
            "Stored image"
        );

        Ok(location)
    }
}
