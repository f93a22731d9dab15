use crate::database::{retry, ErrorExt};
use crate::schema::{Post, PostLike};
use crate::services::{Error, Result};
use crate::types::{PostId, UserId};
use crate::App;

/// Atomic `view_count += 1`. Expressed as a column-level delta so
/// concurrent increments never lose updates; incrementing a missing
/// post is a no-op.
#[derive(Debug)]
pub struct IncrementViewCount {
    pub post_id: PostId,
}

impl IncrementViewCount {
    #[tracing::instrument(skip_all, fields(request = ?self), name = "services.posts.increment_view")]
    pub async fn perform(self, app: &App) -> Result<()> {
        retry::with_backoff("posts.increment_view", || async {
            let mut conn = app.db_write().await?;
            Post::increment_view_count(&mut conn, self.post_id).await
        })
        .await?;

        Ok(())
    }
}

enum Outcome {
    Toggled(bool),
    NotFound,
}

/// Flips the like state for one authenticated identity on one post
/// and returns the resulting state (`true` = now liked).
///
/// The check-then-act race against the composite key is resolved in
/// the storage layer: a concurrent duplicate insert loses to the key
/// and is treated as a no-op, and the counter delta commits in the
/// same transaction as the row change.
#[derive(Debug)]
pub struct ToggleLike {
    pub post_id: PostId,
    pub user_id: UserId,
}

impl ToggleLike {
    #[tracing::instrument(skip_all, fields(request = ?self), name = "services.posts.toggle_like")]
    pub async fn perform(self, app: &App) -> Result<bool> {
        let outcome = retry::with_backoff("posts.toggle_like", || async {
            let mut tx = app.primary_db.begin().await?;

            if Post::find(&mut *tx, self.post_id).await?.is_none() {
                return Ok(Outcome::NotFound);
            }

            let liked = if PostLike::remove(&mut *tx, self.post_id, self.user_id).await? {
                Post::adjust_like_count(&mut *tx, self.post_id, -1).await?;
                false
            } else {
                if PostLike::insert(&mut *tx, self.post_id, self.user_id).await? {
                    Post::adjust_like_count(&mut *tx, self.post_id, 1).await?;
                }
                true
            };

            tx.commit().await.into_db_error()?;
            Ok(Outcome::Toggled(liked))
        })
        .await?;

        match outcome {
            Outcome::Toggled(liked) => Ok(liked),
            Outcome::NotFound => Err(Error::NotFound),
        }
    }
}
