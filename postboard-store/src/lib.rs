//! The in-memory post store: posts with their comments, and the listing query engine.

pub mod comments;
pub mod query;
pub mod store;

pub use query::PostQuery;
pub use store::{PostStore, Result, StoreError};
