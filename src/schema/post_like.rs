use chrono::NaiveDateTime;
use sqlx::FromRow;

use crate::{
    database::{Connection, ErrorExt, Result},
    types::{PostId, UserId},
};

/// One like per (post, user), enforced by the composite primary key.
/// Likes require an authenticated identity.
#[derive(Debug, FromRow, PartialEq, Eq, Clone)]
pub struct PostLike {
    pub post_id: PostId,
    pub user_id: UserId,
    pub created_at: NaiveDateTime,
}

impl PostLike {
    /// Inserts a like row. Returns `false` when the row already
    /// existed; a concurrent duplicate insert loses to the composite
    /// key and is treated as a no-op rather than an error.
    #[tracing::instrument(skip_all, name = "db.post_likes.insert")]
    pub async fn insert(conn: &mut Connection, post_id: PostId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query(
            r#"INSERT INTO "post_likes" (post_id, user_id) VALUES ($1, $2)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(post_id)
        .bind(user_id)
        .execute(conn)
        .await
        .into_db_error()?;
        Ok(result.rows_affected() > 0)
    }

    /// Removes a like row. Returns `false` when there was nothing to
    /// remove.
    #[tracing::instrument(skip_all, name = "db.post_likes.remove")]
    pub async fn remove(conn: &mut Connection, post_id: PostId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM "post_likes" WHERE post_id = $1 AND user_id = $2"#)
            .bind(post_id)
            .bind(user_id)
            .execute(conn)
            .await
            .into_db_error()?;
        Ok(result.rows_affected() > 0)
    }
}
