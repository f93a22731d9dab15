use crate::database::retry;
use crate::schema::Post;
use crate::services::Result;
use crate::types::{CategoryId, PostId};
use crate::App;

use super::PostListItem;

/// Zero-based row offset for a 1-based page number. Page numbers
/// below 1 are clamped to the first page.
pub(crate) fn page_offset(page: u32, page_size: u32) -> i64 {
    i64::from(page.max(1) - 1) * i64::from(page_size)
}

/// Published posts, newest first. Never returns unpublished posts,
/// regardless of who is asking.
#[derive(Debug)]
pub struct ListPublishedPosts {
    /// 1-based page number.
    pub page: u32,
    /// Defaults to the configured public page size.
    pub page_size: Option<u32>,
}

impl ListPublishedPosts {
    #[tracing::instrument(skip_all, fields(request = ?self), name = "services.posts.list_published")]
    pub async fn perform(self, app: &App) -> Result<Vec<PostListItem>> {
        let page_size = self
            .page_size
            .unwrap_or(app.config.pagination.public_page_size);
        let offset = page_offset(self.page, page_size);

        let items = retry::with_backoff("posts.list_published", || async {
            let mut conn = app.db_read().await?;
            let posts = Post::list_published(&mut conn, offset, i64::from(page_size)).await?;
            PostListItem::load_many(&mut conn, posts).await
        })
        .await?;

        Ok(items)
    }
}

/// Posts flagged for promotional placement, still published-only.
#[derive(Debug)]
pub struct ListFeaturedPosts {
    pub count: u32,
}

impl ListFeaturedPosts {
    #[tracing::instrument(skip_all, fields(request = ?self), name = "services.posts.list_featured")]
    pub async fn perform(self, app: &App) -> Result<Vec<PostListItem>> {
        let items = retry::with_backoff("posts.list_featured", || async {
            let mut conn = app.db_read().await?;
            let posts = Post::list_featured(&mut conn, i64::from(self.count)).await?;
            PostListItem::load_many(&mut conn, posts).await
        })
        .await?;

        Ok(items)
    }
}

#[derive(Debug)]
pub struct ListRecentPosts {
    pub count: u32,
}

impl ListRecentPosts {
    #[tracing::instrument(skip_all, fields(request = ?self), name = "services.posts.list_recent")]
    pub async fn perform(self, app: &App) -> Result<Vec<PostListItem>> {
        let items = retry::with_backoff("posts.list_recent", || async {
            let mut conn = app.db_read().await?;
            let posts = Post::list_recent(&mut conn, i64::from(self.count)).await?;
            PostListItem::load_many(&mut conn, posts).await
        })
        .await?;

        Ok(items)
    }
}

#[derive(Debug)]
pub struct ListMostViewedPosts {
    pub count: u32,
}

impl ListMostViewedPosts {
    #[tracing::instrument(skip_all, fields(request = ?self), name = "services.posts.list_most_viewed")]
    pub async fn perform(self, app: &App) -> Result<Vec<PostListItem>> {
        let items = retry::with_backoff("posts.list_most_viewed", || async {
            let mut conn = app.db_read().await?;
            let posts = Post::list_most_viewed(&mut conn, i64::from(self.count)).await?;
            PostListItem::load_many(&mut conn, posts).await
        })
        .await?;

        Ok(items)
    }
}

/// Published posts within one category, same pagination contract as
/// [`ListPublishedPosts`].
#[derive(Debug)]
pub struct ListPostsByCategory {
    pub category_id: CategoryId,
    pub page: u32,
    pub page_size: Option<u32>,
}

impl ListPostsByCategory {
    #[tracing::instrument(skip_all, fields(request = ?self), name = "services.posts.list_by_category")]
    pub async fn perform(self, app: &App) -> Result<Vec<PostListItem>> {
        let page_size = self
            .page_size
            .unwrap_or(app.config.pagination.public_page_size);
        let offset = page_offset(self.page, page_size);

        let items = retry::with_backoff("posts.list_by_category", || async {
            let mut conn = app.db_read().await?;
            let posts = Post::list_by_category(
                &mut conn,
                self.category_id,
                offset,
                i64::from(page_size),
            )
            .await?;
            PostListItem::load_many(&mut conn, posts).await
        })
        .await?;

        Ok(items)
    }
}

/// Other published posts sharing at least one tag with the source
/// post. A missing source post yields an empty list, not a failure.
#[derive(Debug)]
pub struct ListRelatedPosts {
    pub post_id: PostId,
    pub count: u32,
}

impl ListRelatedPosts {
    #[tracing::instrument(skip_all, fields(request = ?self), name = "services.posts.list_related")]
    pub async fn perform(self, app: &App) -> Result<Vec<PostListItem>> {
        let items = retry::with_backoff("posts.list_related", || async {
            let mut conn = app.db_read().await?;
            let posts = Post::list_related(&mut conn, self.post_id, i64::from(self.count)).await?;
            PostListItem::load_many(&mut conn, posts).await
        })
        .await?;

        Ok(items)
    }
}

/// Every post regardless of publish state, for the admin listing.
#[derive(Debug)]
pub struct ListAllPosts {
    pub page: u32,
    pub page_size: Option<u32>,
}

impl ListAllPosts {
    #[tracing::instrument(skip_all, fields(request = ?self), name = "services.posts.list_all")]
    pub async fn perform(self, app: &App) -> Result<Vec<PostListItem>> {
        let page_size = self
            .page_size
            .unwrap_or(app.config.pagination.admin_page_size);
        let offset = page_offset(self.page, page_size);

        let items = retry::with_backoff("posts.list_all", || async {
            let mut conn = app.db_read_prefer_primary().await?;
            let posts = Post::list_all(&mut conn, offset, i64::from(page_size)).await?;
            PostListItem::load_many(&mut conn, posts).await
        })
        .await?;

        Ok(items)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostCounts {
    pub total: i64,
    pub published: i64,
}

#[derive(Debug)]
pub struct CountPosts;

impl CountPosts {
    #[tracing::instrument(skip_all, name = "services.posts.count")]
    pub async fn perform(self, app: &App) -> Result<PostCounts> {
        let counts = retry::with_backoff("posts.count", || async {
            let mut conn = app.db_read().await?;
            let total = Post::count(&mut conn).await?;
            let published = Post::count_published(&mut conn).await?;
            Ok(PostCounts { total, published })
        })
        .await?;

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::page_offset;

    #[test]
    fn offsets_are_one_based_pages() {
        // page 2 with size 6 covers items 7..=12
        assert_eq!(page_offset(1, 6), 0);
        assert_eq!(page_offset(2, 6), 6);
        assert_eq!(page_offset(5, 10), 40);
    }

    #[test]
    fn page_zero_is_clamped_to_the_first_page() {
        assert_eq!(page_offset(0, 6), 0);
    }
}
