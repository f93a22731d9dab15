use chrono::NaiveDateTime;
use sqlx::FromRow;

use crate::{
    database::{Connection, ErrorExt, Result},
    types::{CommentId, PostId, UserId},
};

#[derive(Debug, FromRow, PartialEq, Eq, Clone)]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub is_approved: bool,
    pub created_at: NaiveDateTime,
    pub post_id: PostId,
    pub author_id: UserId,
    pub parent_comment_id: Option<CommentId>,
}

impl Comment {
    #[tracing::instrument(skip_all, name = "db.comments.find")]
    pub async fn find(conn: &mut Connection, id: CommentId) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(r#"SELECT * FROM "comments" WHERE id = $1"#)
            .bind(id)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }

    /// Only approved comments are ever handed to public rendering.
    #[tracing::instrument(skip_all, name = "db.comments.list_approved")]
    pub async fn list_approved_for_post(
        conn: &mut Connection,
        post_id: PostId,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"SELECT * FROM "comments"
               WHERE post_id = $1 AND is_approved
               ORDER BY created_at"#,
        )
        .bind(post_id)
        .fetch_all(conn)
        .await
        .into_db_error()
    }

    #[tracing::instrument(skip_all, name = "db.comments.approve")]
    pub async fn approve(conn: &mut Connection, id: CommentId) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"UPDATE "comments" SET is_approved = TRUE WHERE id = $1 RETURNING *"#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .into_db_error()
    }
}

#[derive(Debug)]
pub struct InsertComment<'a> {
    pub content: &'a str,
    pub post_id: PostId,
    pub author_id: UserId,
    pub parent_comment_id: Option<CommentId>,
}

impl InsertComment<'_> {
    /// New comments start unapproved; moderation flips the flag.
    #[tracing::instrument(skip_all, name = "db.comments.insert")]
    pub async fn insert(&self, conn: &mut Connection) -> Result<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"INSERT INTO "comments" (id, content, post_id, author_id, parent_comment_id)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(CommentId::generate())
        .bind(self.content)
        .bind(self.post_id)
        .bind(self.author_id)
        .bind(self.parent_comment_id)
        .fetch_one(conn)
        .await
        .into_db_error()
    }
}
