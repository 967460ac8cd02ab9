use crate::store::{PostStore, Result, StoreError};
use postboard_common::model::{
    Id,
    comment::{Comment, CommentMarker},
    post::PostMarker,
    text::NonEmptyText,
};
use time::OffsetDateTime;
use tracing::debug;

impl PostStore {
    /// Comments of the post, oldest first.
    pub fn fetch_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        Ok(self.table().post(post_id)?.comments.clone())
    }

    pub fn ensure_comment(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    ) -> Result<()> {
        let table = self.table();
        let post = table.post(post_id)?;
        if post.comments.iter().any(|comment| comment.id == comment_id) {
            Ok(())
        } else {
            Err(StoreError::CommentNotFound {
                post_id,
                comment_id,
            })
        }
    }

    pub fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        content: NonEmptyText,
    ) -> Result<Comment> {
        let mut table = self.table();
        // Checked before an id is spent.
        table.post(post_id)?;

        let now = OffsetDateTime::now_utc();
        let comment = Comment {
            id: table.generate_id(),
            content,
            created_at: now,
            updated_at: now,
        };
        table.post_mut(post_id)?.comments.push(comment.clone());
        debug!(%post_id, comment_id = %comment.id, "Created comment");

        Ok(comment)
    }

    pub fn update_comment(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
        content: NonEmptyText,
    ) -> Result<Comment> {
        let mut table = self.table();
        let comment = table
            .post_mut(post_id)?
            .comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
            .ok_or(StoreError::CommentNotFound {
                post_id,
                comment_id,
            })?;

        comment.content = content;
        comment.updated_at = OffsetDateTime::now_utc();
        debug!(%post_id, %comment_id, "Updated comment");

        Ok(comment.clone())
    }

    pub fn delete_comment(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    ) -> Result<Comment> {
        let mut table = self.table();
        let comments = &mut table.post_mut(post_id)?.comments;
        let index = comments
            .iter()
            .position(|comment| comment.id == comment_id)
            .ok_or(StoreError::CommentNotFound {
                post_id,
                comment_id,
            })?;

        let comment = comments.remove(index);
        debug!(%post_id, %comment_id, "Deleted comment");

        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use crate::store::{
        StoreError,
        tests::{create, store, text},
    };
    use postboard_common::model::Id;

    #[test]
    fn comments_keep_insertion_order() {
        let store = store();
        let post = create(&store, "post");

        assert_eq!(store.fetch_comments(post.id), Ok(Vec::new()));

        let first = store.create_comment(post.id, text("first")).unwrap();
        let second = store.create_comment(post.id, text("second")).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.content.get(), "first");
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(store.fetch_comments(post.id), Ok(vec![first.clone(), second]));
        assert_eq!(store.fetch_post(post.id).unwrap().comments[0], first);
    }

    #[test]
    fn comments_are_scoped_to_their_post() {
        let store = store();
        let post = create(&store, "post");
        let other = create(&store, "other");
        let comment = store.create_comment(post.id, text("hello")).unwrap();

        assert_eq!(store.fetch_comments(other.id), Ok(Vec::new()));
        assert_eq!(
            store.update_comment(other.id, comment.id, text("changed")),
            Err(StoreError::CommentNotFound {
                post_id: other.id,
                comment_id: comment.id,
            })
        );
        assert_eq!(
            store.delete_comment(other.id, comment.id),
            Err(StoreError::CommentNotFound {
                post_id: other.id,
                comment_id: comment.id,
            })
        );
    }

    #[test]
    fn update_comment() {
        let store = store();
        let post = create(&store, "post");
        let comment = store.create_comment(post.id, text("before")).unwrap();

        let updated = store
            .update_comment(post.id, comment.id, text("after"))
            .unwrap();

        assert_eq!(updated.id, comment.id);
        assert_eq!(updated.content.get(), "after");
        assert_eq!(updated.created_at, comment.created_at);
        assert!(updated.updated_at >= comment.updated_at);
        assert_eq!(store.fetch_comments(post.id), Ok(vec![updated]));
    }

    #[test]
    fn missing_post_is_reported_before_missing_comment() {
        let store = store();
        let post_id = Id::from(5);
        let comment_id = Id::from(6);

        assert_eq!(
            store.fetch_comments(post_id),
            Err(StoreError::PostNotFound(post_id))
        );
        assert_eq!(
            store.create_comment(post_id, text("hi")),
            Err(StoreError::PostNotFound(post_id))
        );
        assert_eq!(
            store.ensure_comment(post_id, comment_id),
            Err(StoreError::PostNotFound(post_id))
        );
        assert_eq!(
            store.update_comment(post_id, comment_id, text("hi")),
            Err(StoreError::PostNotFound(post_id))
        );
        assert_eq!(
            store.delete_comment(post_id, comment_id),
            Err(StoreError::PostNotFound(post_id))
        );
    }

    #[test]
    fn delete_comment() {
        let store = store();
        let post = create(&store, "post");
        let first = store.create_comment(post.id, text("first")).unwrap();
        let second = store.create_comment(post.id, text("second")).unwrap();

        assert_eq!(store.ensure_comment(post.id, first.id), Ok(()));
        assert_eq!(store.delete_comment(post.id, first.id), Ok(first.clone()));
        assert_eq!(store.fetch_comments(post.id), Ok(vec![second]));
        assert_eq!(
            store.delete_comment(post.id, first.id),
            Err(StoreError::CommentNotFound {
                post_id: post.id,
                comment_id: first.id,
            })
        );
    }

    #[test]
    fn deleting_a_post_discards_its_comments() {
        let store = store();
        let post = create(&store, "post");
        store.create_comment(post.id, text("one")).unwrap();
        store.create_comment(post.id, text("two")).unwrap();

        let deleted = store.delete_post(post.id).unwrap();
        assert_eq!(deleted.comments.len(), 2);

        assert_eq!(
            store.fetch_comments(post.id),
            Err(StoreError::PostNotFound(post.id))
        );
    }
}
