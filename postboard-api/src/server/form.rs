use crate::{
    server::{Result, ServerError},
    storage::ImageUpload,
};
use axum::extract::{FromRequest, Multipart, Request, multipart::Field};
use postboard_common::model::{ModelValidationError, post::PostFields};
use tracing::trace;

/// The multipart form used to create and edit posts.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostForm {
    pub fields: PostFields,
    pub image: Option<ImageUpload>,
}

impl PostForm {
    /// Reads the whole body. Unknown parts are skipped and an empty `image`
    /// part counts as no image.
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("title") => form.fields.title = Some(read_text(field, "title").await?),
                Some("content") => {
                    form.fields.content = Some(read_text(field, "content").await?);
                }
                Some("tags") => form.fields.tags = Some(read_text(field, "tags").await?),
                Some("image") => {
                    let file_name = field.file_name().map(str::to_owned);
                    let content_type = field.content_type().map(str::to_owned);
                    let bytes = field.bytes().await?;

                    form.image = (!bytes.is_empty()).then_some(ImageUpload {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                name => trace!(?name, "Skipping unknown form field"),
            }
        }

        Ok(form)
    }
}

/// Unlike [`Field::text`], rejects invalid UTF-8 instead of replacing it.
async fn read_text(field: Field<'_>, name: &'static str) -> Result<String> {
    let bytes = field.bytes().await?;
    let text =
        String::from_utf8(bytes.to_vec()).map_err(|_| ModelValidationError::InvalidUtf8(name))?;

    Ok(text)
}

impl<S> FromRequest<S> for PostForm
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(request, state).await?;
        Self::read(multipart).await
    }
}
