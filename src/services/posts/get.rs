use crate::database::retry;
use crate::schema::Post;
use crate::services::Result;
use crate::types::PostId;
use crate::App;

use super::PostView;

/// Fetches a single post with its author, category, tags and approved
/// comments. Absence is a normal outcome, not an error.
#[derive(Debug)]
pub struct GetPost {
    pub id: PostId,
}

impl GetPost {
    #[tracing::instrument(skip_all, fields(request = ?self), name = "services.posts.get")]
    pub async fn perform(self, app: &App) -> Result<Option<PostView>> {
        let view = retry::with_backoff("posts.get", || async {
            let mut conn = app.db_read().await?;
            let Some(post) = Post::find(&mut conn, self.id).await? else {
                return Ok(None);
            };
            PostView::load(&mut conn, post).await.map(Some)
        })
        .await?;

        Ok(view)
    }
}

/// Resolves a post by its human-readable slug, case-insensitively.
///
/// The slug is recomputed from stored titles at query time rather
/// than read from a denormalized column, so a title rename changes
/// the externally visible slug immediately. Only published posts
/// resolve.
#[derive(Debug)]
pub struct GetPostBySlug<'a> {
    pub slug: &'a str,
}

impl GetPostBySlug<'_> {
    #[tracing::instrument(skip_all, fields(request = ?self), name = "services.posts.get_by_slug")]
    pub async fn perform(self, app: &App) -> Result<Option<PostView>> {
        let view = retry::with_backoff("posts.get_by_slug", || async {
            let mut conn = app.db_read().await?;
            let Some(post) = Post::find_published_by_slug(&mut conn, self.slug).await? else {
                return Ok(None);
            };
            PostView::load(&mut conn, post).await.map(Some)
        })
        .await?;

        Ok(view)
    }
}
