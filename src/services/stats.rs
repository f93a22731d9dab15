use crate::database::retry;
use crate::schema::{Category, Post, Tag};
use crate::services::Result;
use crate::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentStats {
    pub posts: i64,
    pub published_posts: i64,
    pub categories: i64,
    pub tags: i64,
}

/// Headline numbers for the admin dashboard. Reads prefer the primary
/// so a freshly saved post is reflected immediately, like the rest of
/// the admin surface.
#[derive(Debug)]
pub struct GetContentStats;

impl GetContentStats {
    #[tracing::instrument(skip_all, name = "services.stats.content")]
    pub async fn perform(self, app: &App) -> Result<ContentStats> {
        let stats = retry::with_backoff("stats.content", || async {
            let mut conn = app.db_read_prefer_primary().await?;
            let posts = Post::count(&mut conn).await?;
            let published_posts = Post::count_published(&mut conn).await?;
            let categories = Category::count(&mut conn).await?;
            let tags = Tag::count(&mut conn).await?;
            Ok(ContentStats {
                posts,
                published_posts,
                categories,
                tags,
            })
        })
        .await?;

        Ok(stats)
    }
}
