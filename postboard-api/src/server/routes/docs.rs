//! Self-describing listing of the HTTP API.

use crate::server::{Result, ServerError, ServerRouter, json::Json};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use serde_json::{Value, json};

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_docs)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/docs", rejection(ServerError))]
struct DocsPath();

async fn get_docs(DocsPath(): DocsPath) -> Result<Json<Value>> {
    Ok(Json(docs()))
}

fn docs() -> Value {
    let post_id = json!({ "id": "String - Post ID" });
    let post_response = json!({
        "id": "Post ID",
        "title": "Post title",
        "content": "Post content",
        "tags": "Array of tags",
        "liked": "Boolean - Whether the post is liked",
        "image": "URL of the post image",
        "comments": "Array of comments",
        "createdAt": "Post creation date",
        "updatedAt": "Post update date",
    });
    let comment_ids = json!({
        "postId": "String - Post ID",
        "commentId": "String - Comment ID",
    });
    let comment_response = json!({
        "id": "Comment ID",
        "content": "Comment content",
        "createdAt": "Comment creation date",
        "updatedAt": "Comment update date",
    });

    json!({
        "posts": {
            "getAll": {
                "method": "GET",
                "route": "/posts",
                "description": "Get all posts with optional search, sort, and pagination",
                "queryParams": {
                    "search": "String (Optional) - Search posts by title or content",
                    "sort": "String (Optional) - Sort posts by property (e.g., 'title-asc')",
                    "page": "Number (Optional) - Page number for pagination (default: 1)",
                    "limit": "Number (Optional) - Number of posts per page (default: 10)",
                },
                "response": {
                    "total": "Total number of filtered posts",
                    "page": "Current page number",
                    "limit": "Number of posts per page",
                    "data": "Array of paginated posts",
                },
            },
            "getOne": {
                "method": "GET",
                "route": "/posts/:id",
                "description": "Get a single post by ID",
                "params": post_id,
                "response": post_response,
            },
            "create": {
                "method": "POST",
                "route": "/posts",
                "description": "Create a new post with image upload (multipart/form-data)",
                "bodyParams": {
                    "title": "String - Post title",
                    "content": "String - Post content",
                    "tags": "String - Optional comma-separated tags",
                    "image": "File - Image file to upload",
                },
                "response": post_response,
            },
            "edit": {
                "method": "PUT",
                "route": "/posts/:id",
                "description": "Edit an existing post with optional image upload (multipart/form-data)",
                "params": post_id,
                "bodyParams": {
                    "title": "String (Optional) - New title",
                    "content": "String (Optional) - New content",
                    "tags": "String (Optional) - New comma-separated tags",
                    "image": "File (Optional) - New image to upload",
                },
                "response": post_response,
            },
            "delete": {
                "method": "DELETE",
                "route": "/posts/:id",
                "description": "Delete a post and its comments by ID",
                "params": post_id,
                "response": { "status": "204 No Content" },
            },
            "like": {
                "method": "POST",
                "route": "/posts/:id/like",
                "description": "Like a post by ID",
                "params": post_id,
                "response": { "liked": "Boolean - Whether the post is liked" },
            },
            "dislike": {
                "method": "POST",
                "route": "/posts/:id/dislike",
                "description": "Dislike a post by ID",
                "params": post_id,
                "response": { "liked": "Boolean - Whether the post is liked" },
            },
        },
        "comments": {
            "getAll": {
                "method": "GET",
                "route": "/comments/:postId",
                "description": "Get all comments for a specific post",
                "params": { "postId": "String - Post ID" },
                "response": { "comments": "Array of comments" },
            },
            "create": {
                "method": "POST",
                "route": "/comments/:postId",
                "description": "Add a comment to a specific post",
                "params": { "postId": "String - Post ID" },
                "bodyParams": { "content": "String - Comment content" },
                "response": comment_response,
            },
            "edit": {
                "method": "PUT",
                "route": "/comments/:postId/:commentId",
                "description": "Edit a specific comment on a post",
                "params": comment_ids,
                "bodyParams": { "content": "String - Updated comment content" },
                "response": comment_response,
            },
            "delete": {
                "method": "DELETE",
                "route": "/comments/:postId/:commentId",
                "description": "Delete a specific comment from a post",
                "params": comment_ids,
                "response": { "status": "204 No Content" },
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use crate::server::tests::{empty, memory_app, send};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn docs_describe_every_route() {
        let (app, _, _) = memory_app();

        let (status, docs) = send(&app, empty("GET", "/docs")).await;
        assert_eq!(status, StatusCode::OK);

        let posts = docs["posts"].as_object().unwrap();
        let comments = docs["comments"].as_object().unwrap();
        assert_eq!(posts.len(), 7);
        assert_eq!(comments.len(), 4);
        assert_eq!(posts["getAll"]["route"], "/posts");
        assert_eq!(comments["edit"]["method"], "PUT");
    }
}
