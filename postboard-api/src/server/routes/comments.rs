use crate::server::{
    Result, ServerError, ServerRouter,
    json::{Created, Json},
};
use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
};
use axum_extra::routing::{RouterExt, TypedPath};
use postboard_common::model::{
    Id, ModelValidationError,
    comment::{Comment, CommentMarker},
    post::PostMarker,
    text::NonEmptyText,
};
use postboard_store::PostStore;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_comments)
        .typed_post(create_comment)
        .typed_put(update_comment)
        .typed_delete(delete_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{post_id}", rejection(ServerError))]
struct CommentsPath {
    post_id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{post_id}/{comment_id}", rejection(ServerError))]
struct CommentPath {
    post_id: Id<PostMarker>,
    comment_id: Id<CommentMarker>,
}

/// Any JSON body, or `null` when the request carries no JSON at all, so that
/// a missing post is reported before a bad body.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
struct CommentBody(Value);

impl CommentBody {
    fn into_content(self) -> Result<NonEmptyText, ModelValidationError> {
        let Value::Object(mut body) = self.0 else {
            return Err(ModelValidationError::Required("content"));
        };

        match body.remove("content") {
            Some(Value::String(content)) => {
                NonEmptyText::new(content).map_err(|_| ModelValidationError::Required("content"))
            }
            _ => Err(ModelValidationError::Required("content")),
        }
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok())
    else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

impl<S> FromRequest<S> for CommentBody
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = has_json_content_type(request.headers());
        let bytes = Bytes::from_request(request, state).await?;

        if !is_json || bytes.is_empty() {
            return Ok(Self(Value::Null));
        }

        let Json(body) = Json::<Value>::from_bytes(&bytes)?;
        Ok(Self(body))
    }
}

async fn list_comments(
    CommentsPath { post_id }: CommentsPath,
    State(store): State<Arc<PostStore>>,
) -> Result<Json<Vec<Comment>>> {
    let comments = store.fetch_comments(post_id)?;

    Ok(Json(comments))
}

async fn create_comment(
    CommentsPath { post_id }: CommentsPath,
    State(store): State<Arc<PostStore>>,
    body: CommentBody,
) -> Result<Created<Comment>> {
    store.ensure_post(post_id)?;
    let content = body.into_content()?;

    let comment = store.create_comment(post_id, content)?;
    info!(%post_id, comment_id = %comment.id, "Created comment");

    Ok(Created(comment))
}

async fn update_comment(
    CommentPath {
        post_id,
        comment_id,
    }: CommentPath,
    State(store): State<Arc<PostStore>>,
    body: CommentBody,
) -> Result<Json<Comment>> {
    store.ensure_comment(post_id, comment_id)?;
    let content = body.into_content()?;

    let comment = store.update_comment(post_id, comment_id, content)?;
    info!(%post_id, %comment_id, "Updated comment");

    Ok(Json(comment))
}

async fn delete_comment(
    CommentPath {
        post_id,
        comment_id,
    }: CommentPath,
    State(store): State<Arc<PostStore>>,
) -> Result<StatusCode> {
    store.delete_comment(post_id, comment_id)?;
    info!(%post_id, %comment_id, "Deleted comment");

    Ok(StatusCode::NO_CONTENT)
}
