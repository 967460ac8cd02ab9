//! Search, sort and pagination over the post listing.

use postboard_common::model::post::{Post, PostPage};
use std::{cmp::Ordering, ops::Range};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostQuery {
    /// Case-insensitive substring of the title or content. Empty means no filter.
    pub search: Option<String>,
    /// `"<field>-<asc|desc>"`, see [`Sort::parse`].
    pub sort: Option<String>,
    pub page: i64,
    pub limit: i64,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            search: None,
            sort: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum SortField {
    Id,
    Title,
    Content,
    Tags,
    Liked,
    Image,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Field names as they appear in the JSON representation of a post.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let field = match name {
            "id" => Self::Id,
            "title" => Self::Title,
            "content" => Self::Content,
            "tags" => Self::Tags,
            "liked" => Self::Liked,
            "image" => Self::Image,
            "createdAt" => Self::CreatedAt,
            "updatedAt" => Self::UpdatedAt,
            _ => return None,
        };

        Some(field)
    }

    fn compare(self, a: &Post, b: &Post) -> Ordering {
        match self {
            Self::Id => a.id.to_string().cmp(&b.id.to_string()),
            Self::Title => a.title.cmp(&b.title),
            Self::Content => a.content.cmp(&b.content),
            Self::Tags => a.tags.get().join(",").cmp(&b.tags.get().join(",")),
            Self::Liked => a.liked.cmp(&b.liked),
            Self::Image => a.image.cmp(&b.image),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Sort {
    /// `None` for unknown fields, which compare every post as equal.
    pub field: Option<SortField>,
    pub order: SortOrder,
}

impl Sort {
    /// The field is everything before the first `-` and the direction runs up
    /// to the second one. Returns `None` unless the direction is exactly `asc`
    /// or `desc`.
    #[must_use]
    pub fn parse(sort: &str) -> Option<Self> {
        let mut parts = sort.split('-');
        let field = parts.next()?;
        let direction = parts.next()?;
        let order = match direction {
            "asc" => SortOrder::Ascending,
            "desc" => SortOrder::Descending,
            _ => return None,
        };

        Some(Self {
            field: SortField::parse(field),
            order,
        })
    }

    #[must_use]
    pub fn compare(self, a: &Post, b: &Post) -> Ordering {
        let Some(field) = self.field else {
            return Ordering::Equal;
        };

        let ordering = field.compare(a, b);
        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// Filters, sorts and slices `posts` without touching the slice itself.
#[must_use]
pub fn list_posts(posts: &[Post], query: &PostQuery) -> PostPage {
    let mut matching: Vec<&Post> = match query.search.as_deref().filter(|term| !term.is_empty()) {
        Some(term) => {
            let needle = term.to_lowercase();
            posts
                .iter()
                .filter(|post| {
                    post.title.get().to_lowercase().contains(&needle)
                        || post.content.get().to_lowercase().contains(&needle)
                })
                .collect()
        }
        None => posts.iter().collect(),
    };

    if let Some(sort) = query.sort.as_deref().and_then(Sort::parse) {
        // Stable, so equal posts keep their insertion order.
        matching.sort_by(|a, b| sort.compare(a, b));
    }

    let total = matching.len();
    let data = matching[page_range(total, query.page, query.limit)]
        .iter()
        .map(|&post| post.clone())
        .collect();

    PostPage {
        total,
        page: query.page,
        limit: query.limit,
        data,
    }
}

/// `[(page - 1) * limit, (page - 1) * limit + limit)` with negative bounds
/// counting back from `len`. A start past the end yields an empty range.
fn page_range(len: usize, page: i64, limit: i64) -> Range<usize> {
    let start = page.saturating_sub(1).saturating_mul(limit);
    let end = start.saturating_add(limit);

    let start = resolve_index(start, len);
    let end = resolve_index(end, len);

    start..end.max(start)
}

fn resolve_index(index: i64, len: usize) -> usize {
    if index < 0 {
        let back = usize::try_from(index.unsigned_abs()).unwrap_or(usize::MAX);
        len.saturating_sub(back)
    } else {
        usize::try_from(index).map_or(len, |index| index.min(len))
    }
}
