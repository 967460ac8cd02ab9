use crate::server::ServerRouter;

mod comments;
mod docs;
mod posts;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(docs::routes())
}
