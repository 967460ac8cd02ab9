use crate::{
    server::{
        Result, ServerError, ServerRouter,
        form::PostForm,
        json::{Created, Json},
        query::Query,
    },
    storage::ObjectStorage,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use postboard_common::model::{
    Id,
    post::{LikeState, Post, PostMarker, PostPage},
};
use postboard_store::{
    PostQuery, PostStore, StoreError,
    query::{DEFAULT_LIMIT, DEFAULT_PAGE},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
        .typed_post(like_post)
        .typed_post(dislike_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/like", rejection(ServerError))]
struct LikePostPath {
    id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/dislike", rejection(ServerError))]
struct DislikePostPath {
    id: Id<PostMarker>,
}

/// Raw listing parameters. Numbers that do not parse fall back to their defaults.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct ListPostsQuery {
    search: Option<String>,
    sort: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

impl From<ListPostsQuery> for PostQuery {
    fn from(value: ListPostsQuery) -> Self {
        let number = |raw: Option<String>, default: i64| {
            raw.and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            search: value.search,
            sort: value.sort,
            page: number(value.page, DEFAULT_PAGE),
            limit: number(value.limit, DEFAULT_LIMIT),
        }
    }
}

async fn list_posts(
    PostsPath(): PostsPath,
    State(store): State<Arc<PostStore>>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PostPage>> {
    let page = store.list_posts(&query.into());

    Ok(Json(page))
}

async fn create_post(
    PostsPath(): PostsPath,
    State(store): State<Arc<PostStore>>,
    State(storage): State<Arc<dyn ObjectStorage>>,
    PostForm { fields, image }: PostForm,
) -> Result<Created<Post>> {
    let new_post = fields.into_new_post()?;
    let image = image.ok_or(ServerError::ImageRequired)?;

    let location = storage.store_image(image).await?;
    let post = store.create_post(new_post, location);
    info!(post_id = %post.id, image = %post.image, "Created post");

    Ok(Created(post))
}

async fn get_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<PostStore>>,
) -> Result<Json<Post>> {
    let post = store.fetch_post(id).ok_or(StoreError::PostNotFound(id))?;

    Ok(Json(post))
}

async fn update_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<PostStore>>,
    State(storage): State<Arc<dyn ObjectStorage>>,
    PostForm { fields, image }: PostForm,
) -> Result<Json<Post>> {
    let patch = fields.into_patch();
    store.ensure_post(id)?;

    let location = match image {
        Some(image) => Some(storage.store_image(image).await?),
        None => None,
    };
    let post = store.update_post(id, patch, location)?;
    info!(post_id = %id, "Updated post");

    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<PostStore>>,
) -> Result<StatusCode> {
    let post = store.delete_post(id)?;
    info!(post_id = %id, comments = post.comments.len(), "Deleted post");

    Ok(StatusCode::NO_CONTENT)
}

async fn like_post(
    LikePostPath { id }: LikePostPath,
    State(store): State<Arc<PostStore>>,
) -> Result<Json<LikeState>> {
    let liked = store.like_post(id)?;

    Ok(Json(LikeState { liked }))
}

async fn dislike_post(
    DislikePostPath { id }: DislikePostPath,
    State(store): State<Arc<PostStore>>,
) -> Result<Json<LikeState>> {
    let liked = store.dislike_post(id)?;

    Ok(Json(LikeState { liked }))
}
