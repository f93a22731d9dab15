use crate::database::retry;
use crate::schema::Post;
use crate::services::{Error, Result};
use crate::types::PostId;
use crate::App;

/// Removes a post. Tag links, likes and comments go away with the row
/// (cascade); the featured image asset is removed afterwards.
#[derive(Debug)]
pub struct DeletePost {
    pub id: PostId,
}

impl DeletePost {
    #[tracing::instrument(skip_all, fields(request = ?self), name = "services.posts.delete")]
    pub async fn perform(self, app: &App) -> Result<()> {
        let deleted = retry::with_backoff("posts.delete", || async {
            let mut conn = app.db_write().await?;
            Post::delete(&mut conn, self.id).await
        })
        .await?;

        let Some(deleted) = deleted else {
            return Err(Error::NotFound);
        };

        if let Some(reference) = deleted.featured_image.as_deref() {
            // best-effort; a missing asset is not an error
            app.images.delete(reference).await;
        }

        Ok(())
    }
}
