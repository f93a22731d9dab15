use crate::database::{retry, ErrorExt};
use crate::schema::{comment, Comment, Post};
use crate::services::{Error, Result};
use crate::types::{CommentId, PostId, UserId};
use crate::util::ValidationError;
use crate::App;

const CONTENT_MAX: usize = 2000;

/// Submits a comment on a post. Comments start unapproved and stay
/// out of public rendering until moderation approves them.
#[derive(Debug)]
pub struct SubmitComment {
    pub post_id: PostId,
    pub author_id: UserId,
    pub content: String,
    /// Threading: a reply must point at a comment on the same post.
    pub parent_comment_id: Option<CommentId>,
}

enum Outcome {
    Submitted(Comment),
    MissingPost,
    BadParent,
}

impl SubmitComment {
    #[tracing::instrument(skip_all, fields(post_id = %self.post_id), name = "services.comments.submit")]
    pub async fn perform(self, app: &App) -> Result<Comment> {
        let mut fields = ValidationError::builder();
        fields.check_text("content", &self.content, CONTENT_MAX);
        fields.into_result().map_err(Error::from)?;

        let outcome = retry::with_backoff("comments.submit", || async {
            let mut tx = app.primary_db.begin().await?;

            if Post::find(&mut *tx, self.post_id).await?.is_none() {
                return Ok(Outcome::MissingPost);
            }

            if let Some(parent_id) = self.parent_comment_id {
                match Comment::find(&mut *tx, parent_id).await? {
                    Some(parent) if parent.post_id == self.post_id => {}
                    _ => return Ok(Outcome::BadParent),
                }
            }

            let comment = comment::InsertComment {
                content: &self.content,
                post_id: self.post_id,
                author_id: self.author_id,
                parent_comment_id: self.parent_comment_id,
            }
            .insert(&mut *tx)
            .await?;

            tx.commit().await.into_db_error()?;
            Ok(Outcome::Submitted(comment))
        })
        .await?;

        match outcome {
            Outcome::Submitted(comment) => Ok(comment),
            Outcome::MissingPost => Err(Error::NotFound),
            Outcome::BadParent => Err(ValidationError::field(
                "parent_comment_id",
                "must reference a comment on the same post",
            )
            .into()),
        }
    }
}

/// Moderation: flips a pending comment to approved.
#[derive(Debug)]
pub struct ApproveComment {
    pub id: CommentId,
}

impl ApproveComment {
    #[tracing::instrument(skip_all, fields(request = ?self), name = "services.comments.approve")]
    pub async fn perform(self, app: &App) -> Result<Comment> {
        let approved = retry::with_backoff("comments.approve", || async {
            let mut conn = app.db_write().await?;
            Comment::approve(&mut conn, self.id).await
        })
        .await?;

        approved.ok_or(Error::NotFound)
    }
}
