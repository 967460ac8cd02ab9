use crate::query::{self, PostQuery};
use postboard_common::{
    model::{
        Id, PostboardSnowflakeGenerator,
        comment::CommentMarker,
        post::{NewPost, Post, PostMarker, PostPage, PostPatch, Tags},
        text::NonEmptyText,
    },
    snowflake::{ProcessId, WorkerId},
};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum StoreError {
    #[error("Post with id {0} was not found.")]
    PostNotFound(Id<PostMarker>),
    #[error("Comment with id {comment_id} was not found on post {post_id}.")]
    CommentNotFound {
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    },
}

/// The in-memory table of posts, in insertion order.
///
/// Every operation holds the lock only for its own duration, so callers must
/// not expect two calls to observe the same state.
#[derive(Debug)]
pub struct PostStore {
    table: Mutex<PostTable>,
}

#[derive(Debug)]
pub(crate) struct PostTable {
    pub(crate) posts: Vec<Post>,
    pub(crate) snowflake_generator: PostboardSnowflakeGenerator,
}

impl PostTable {
    pub(crate) fn post(&self, id: Id<PostMarker>) -> Result<&Post> {
        self.posts
            .iter()
            .find(|post| post.id == id)
            .ok_or(StoreError::PostNotFound(id))
    }

    pub(crate) fn post_mut(&mut self, id: Id<PostMarker>) -> Result<&mut Post> {
        self.posts
            .iter_mut()
            .find(|post| post.id == id)
            .ok_or(StoreError::PostNotFound(id))
    }

    pub(crate) fn generate_id<Marker>(&mut self) -> Id<Marker> {
        Id::new(self.snowflake_generator.generate())
    }
}

impl PostStore {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        let table = PostTable {
            posts: Vec::new(),
            snowflake_generator: PostboardSnowflakeGenerator::new(worker_id, process_id),
        };

        Self {
            table: Mutex::new(table),
        }
    }

    pub(crate) fn table(&self) -> MutexGuard<'_, PostTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds the "Hello World" post with id `1`, unless a post with that id exists.
    pub fn seed_example_post(&self) {
        let id = Id::from(1);
        let mut table = self.table();
        if table.post(id).is_ok() {
            return;
        }

        let now = OffsetDateTime::now_utc();
        table.posts.push(Post {
            id,
            title: NonEmptyText::new_unchecked("Hello World".to_owned()),
            content: NonEmptyText::new_unchecked("This is my first post".to_owned()),
            tags: ["first-post", "hello-world"].into_iter().collect::<Tags>(),
            liked: false,
            image: "https://picsum.photos/200".to_owned(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        });
        debug!(post_id = %id, "Seeded example post");
    }

    #[must_use]
    pub fn fetch_post(&self, id: Id<PostMarker>) -> Option<Post> {
        self.table().post(id).ok().cloned()
    }

    pub fn ensure_post(&self, id: Id<PostMarker>) -> Result<()> {
        self.table().post(id).map(|_| ())
    }

    /// A snapshot of every post, in insertion order.
    #[must_use]
    pub fn posts(&self) -> Vec<Post> {
        self.table().posts.clone()
    }

    #[must_use]
    pub fn list_posts(&self, query: &PostQuery) -> PostPage {
        query::list_posts(&self.table().posts, query)
    }

    #[must_use]
    pub fn create_post(&self, post: NewPost, image: String) -> Post {
        let mut table = self.table();
        let id = table.generate_id();
        let now = OffsetDateTime::now_utc();

        let post = Post {
            id,
            title: post.title,
            content: post.content,
            tags: post.tags,
            liked: false,
            image,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        table.posts.push(post.clone());
        debug!(post_id = %id, "Created post");

        post
    }

    pub fn update_post(
        &self,
        id: Id<PostMarker>,
        patch: PostPatch,
        image: Option<String>,
    ) -> Result<Post> {
        let mut table = self.table();
        let post = table.post_mut(id)?;

        if let Some(title) = patch.title {
            post.title = title;
        }
        if let Some(content) = patch.content {
            post.content = content;
        }
        if let Some(tags) = patch.tags {
            post.tags = tags;
        }
        if let Some(image) = image {
            post.image = image;
        }
        post.updated_at = OffsetDateTime::now_utc();
        debug!(post_id = %id, "Updated post");

        Ok(post.clone())
    }

    /// Removes the post together with all of its comments.
    pub fn delete_post(&self, id: Id<PostMarker>) -> Result<Post> {
        let mut table = self.table();
        let index = table
            .posts
            .iter()
            .position(|post| post.id == id)
            .ok_or(StoreError::PostNotFound(id))?;

        let post = table.posts.remove(index);
        debug!(post_id = %id, comments = post.comments.len(), "Deleted post");

        Ok(post)
    }

    /// Returns the new state of the flag.
    pub fn set_liked(&self, id: Id<PostMarker>, liked: bool) -> Result<bool> {
        let mut table = self.table();
        let post = table.post_mut(id)?;
        post.liked = liked;

        Ok(post.liked)
    }

    pub fn like_post(&self, id: Id<PostMarker>) -> Result<bool> {
        self.set_liked(id, true)
    }

    pub fn dislike_post(&self, id: Id<PostMarker>) -> Result<bool> {
        self.set_liked(id, false)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{
        query::PostQuery,
        store::{PostStore, StoreError},
    };
    use postboard_common::{
        model::{
            Id,
            post::{NewPost, Post, PostPatch, Tags},
            text::NonEmptyText,
        },
        snowflake::{ProcessId, WorkerId},
    };

    pub(crate) fn store() -> PostStore {
        PostStore::new(WorkerId::default(), ProcessId::default())
    }

    pub(crate) fn text(text: &str) -> NonEmptyText {
        NonEmptyText::try_from(text).unwrap()
    }

    pub(crate) fn create(store: &PostStore, title: &str) -> Post {
        let post = NewPost {
            title: text(title),
            content: text("some content"),
            tags: Tags::split("a,b"),
        };
        store.create_post(post, format!("https://img.example/{title}.png"))
    }

    #[test]
    fn created_posts_are_found_until_deleted() {
        let store = store();
        let first = create(&store, "first");
        let second = create(&store, "second");

        assert_ne!(first.id, second.id);
        assert!(!first.liked);
        assert!(first.comments.is_empty());
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(store.fetch_post(first.id), Some(first.clone()));
        assert_eq!(store.posts(), [first.clone(), second.clone()]);

        assert_eq!(store.delete_post(first.id), Ok(first.clone()));
        assert_eq!(store.fetch_post(first.id), None);
        assert_eq!(
            store.delete_post(first.id),
            Err(StoreError::PostNotFound(first.id))
        );
        assert_eq!(store.posts(), [second]);
    }

    #[test]
    fn update_keeps_omitted_fields() {
        let store = store();
        let post = create(&store, "before");

        let patch = PostPatch {
            title: Some(text("after")),
            ..PostPatch::default()
        };
        let updated = store.update_post(post.id, patch, None).unwrap();

        assert_eq!(updated.title.get(), "after");
        assert_eq!(updated.content, post.content);
        assert_eq!(updated.tags, post.tags);
        assert_eq!(updated.image, post.image);
        assert_eq!(updated.created_at, post.created_at);
        assert!(updated.updated_at >= post.updated_at);

        let fetched = store.fetch_post(post.id).unwrap();
        assert_eq!(fetched, updated);
        assert_eq!(
            Post {
                title: post.title.clone(),
                updated_at: post.updated_at,
                ..fetched
            },
            post
        );
    }

    #[test]
    fn update_replaces_image_and_tags() {
        let store = store();
        let post = create(&store, "post");

        let patch = PostPatch {
            tags: Some(Tags::split("x")),
            ..PostPatch::default()
        };
        let updated = store
            .update_post(post.id, patch, Some("https://img.example/new.png".to_owned()))
            .unwrap();

        assert_eq!(updated.tags.get(), ["x"]);
        assert_eq!(updated.image, "https://img.example/new.png");
        assert_eq!(updated.title, post.title);
    }

    #[test]
    fn update_unknown_post() {
        let store = store();
        let id = Id::from(42);

        assert_eq!(
            store.update_post(id, PostPatch::default(), None),
            Err(StoreError::PostNotFound(id))
        );
    }

    #[test]
    fn like_dislike_like() {
        let store = store();
        let post = create(&store, "post");

        assert_eq!(store.like_post(post.id), Ok(true));
        assert_eq!(store.dislike_post(post.id), Ok(false));
        assert_eq!(store.dislike_post(post.id), Ok(false));
        assert_eq!(store.like_post(post.id), Ok(true));
        assert!(store.fetch_post(post.id).unwrap().liked);

        let missing = Id::from(7);
        assert_eq!(store.like_post(missing), Err(StoreError::PostNotFound(missing)));
    }

    #[test]
    fn seeded_post() {
        let store = store();
        store.seed_example_post();
        store.seed_example_post();

        let posts = store.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id.to_string(), "1");
        assert_eq!(posts[0].title.get(), "Hello World");
        assert_eq!(posts[0].tags.get(), ["first-post", "hello-world"]);
        assert_eq!(posts[0].image, "https://picsum.photos/200");
    }

    #[test]
    fn listing_never_mutates_the_store() {
        let store = store();
        for title in ["c", "a", "b"] {
            create(&store, title);
        }
        let before = store.posts();

        let query = PostQuery {
            sort: Some("title-asc".to_owned()),
            limit: 1,
            ..PostQuery::default()
        };
        let page = store.list_posts(&query);

        assert_eq!(page.total, 3);
        assert_eq!(page.data[0].title.get(), "a");
        assert_eq!(store.posts(), before);
    }
}
