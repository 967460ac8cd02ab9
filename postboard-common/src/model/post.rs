use crate::model::{Id, ModelValidationError, comment::Comment, text::NonEmptyText};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: NonEmptyText,
    pub content: NonEmptyText,
    pub tags: Tags,
    pub liked: bool,
    pub image: String,
    pub comments: Vec<Comment>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Tags as submitted: a comma separated string split verbatim.
///
/// No trimming or filtering happens, so `""` becomes `[""]` and `"a,"` becomes
/// `["a", ""]`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    #[must_use]
    pub fn split(input: &str) -> Self {
        Self(input.split(',').map(str::to_owned).collect())
    }

    #[must_use]
    pub fn get(&self) -> &[String] {
        &self.0
    }
}

impl<T: Into<String>> FromIterator<T> for Tags {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Raw text fields of a post form, before validation.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostFields {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<String>,
}

/// A validated post that still lacks its image.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewPost {
    pub title: NonEmptyText,
    pub content: NonEmptyText,
    pub tags: Tags,
}

/// Fields to overwrite on an existing post. `None` keeps the current value.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostPatch {
    pub title: Option<NonEmptyText>,
    pub content: Option<NonEmptyText>,
    pub tags: Option<Tags>,
}

impl PostFields {
    pub fn into_new_post(self) -> Result<NewPost, ModelValidationError> {
        let title = required("title", self.title)?;
        let content = required("content", self.content)?;
        let tags = Tags::split(self.tags.as_deref().unwrap_or_default());

        Ok(NewPost {
            title,
            content,
            tags,
        })
    }

    /// Empty values count as omitted, so a field can never be cleared.
    #[must_use]
    pub fn into_patch(self) -> PostPatch {
        PostPatch {
            title: self.title.and_then(|title| NonEmptyText::new(title).ok()),
            content: self.content.and_then(|content| NonEmptyText::new(content).ok()),
            tags: self
                .tags
                .filter(|tags| !tags.is_empty())
                .map(|tags| Tags::split(&tags)),
        }
    }
}

fn required(
    field: &'static str,
    value: Option<String>,
) -> Result<NonEmptyText, ModelValidationError> {
    value
        .and_then(|value| NonEmptyText::new(value).ok())
        .ok_or(ModelValidationError::Required(field))
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
pub struct LikeState {
    pub liked: bool,
}

/// One page of the post listing.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct PostPage {
    /// Number of posts matching the search, before pagination.
    pub total: usize,
    pub page: i64,
    pub limit: i64,
    pub data: Vec<Post>,
}

#[cfg(test)]
mod tests {
    use crate::model::{
        ModelValidationError,
        post::{PostFields, Tags},
    };

    fn fields(title: Option<&str>, content: Option<&str>, tags: Option<&str>) -> PostFields {
        PostFields {
            title: title.map(str::to_owned),
            content: content.map(str::to_owned),
            tags: tags.map(str::to_owned),
        }
    }

    #[test]
    fn tags_split_naively() {
        assert_eq!(Tags::split("rust,web").get(), ["rust", "web"]);
        assert_eq!(Tags::split("").get(), [""]);
        assert_eq!(Tags::split(",a,").get(), ["", "a", ""]);
        assert_eq!(Tags::split(" a , b").get(), [" a ", " b"]);
    }

    #[test]
    fn new_post_requires_title_and_content() {
        assert_eq!(
            fields(None, Some("body"), None).into_new_post(),
            Err(ModelValidationError::Required("title"))
        );
        assert_eq!(
            fields(Some(""), Some("body"), None).into_new_post(),
            Err(ModelValidationError::Required("title"))
        );
        assert_eq!(
            fields(Some("title"), Some(""), None).into_new_post(),
            Err(ModelValidationError::Required("content"))
        );

        let post = fields(Some("title"), Some("body"), None)
            .into_new_post()
            .unwrap();
        assert_eq!(post.title.get(), "title");
        assert_eq!(post.content.get(), "body");
        assert_eq!(post.tags.get(), [""]);
    }

    #[test]
    fn patch_treats_empty_as_omitted() {
        let patch = fields(Some(""), Some("new body"), Some("")).into_patch();

        assert_eq!(patch.title, None);
        assert_eq!(patch.content.unwrap().get(), "new body");
        assert_eq!(patch.tags, None);

        let patch = fields(None, None, Some("a,b")).into_patch();
        assert_eq!(patch.tags.unwrap().get(), ["a", "b"]);
    }
}
