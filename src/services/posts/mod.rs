use std::collections::HashMap;

use crate::database::{self, Connection};
use crate::schema::{Category, Comment, Post, Tag, User};
use crate::util::ValidationError;

mod create;
mod delete;
mod engagement;
mod get;
mod list;
mod update;

pub use create::{CreatePost, ImageUpload};
pub use delete::DeletePost;
pub use engagement::{IncrementViewCount, ToggleLike};
pub use get::{GetPost, GetPostBySlug};
pub use list::{
    CountPosts, ListAllPosts, ListFeaturedPosts, ListMostViewedPosts, ListPostsByCategory,
    ListPublishedPosts, ListRecentPosts, ListRelatedPosts, PostCounts,
};
pub use update::UpdatePost;

pub(crate) const TITLE_MAX: usize = 160;
pub(crate) const SUMMARY_MAX: usize = 2000;
pub(crate) const TAG_NAME_MAX: usize = 80;

/// A post prepared for listing pages: the record plus its author,
/// category and tags, assembled whole before it is handed to the
/// rendering layer.
#[derive(Debug, Clone)]
pub struct PostListItem {
    pub post: Post,
    pub author: User,
    pub category: Category,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: Comment,
    pub author: User,
}

/// A single post prepared for its public page, approved comments
/// included.
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: Post,
    pub author: User,
    pub category: Category,
    pub tags: Vec<Tag>,
    pub comments: Vec<CommentView>,
}

impl PostListItem {
    /// Attaches authors, categories and tags to a page of posts.
    /// Authors and categories repeat heavily across a page, so lookups
    /// are memoized per call.
    pub(crate) async fn load_many(
        conn: &mut Connection,
        posts: Vec<Post>,
    ) -> database::Result<Vec<Self>> {
        let mut authors = HashMap::new();
        let mut categories = HashMap::new();
        let mut items = Vec::with_capacity(posts.len());

        for post in posts {
            let author = match authors.get(&post.author_id) {
                Some(user) => user,
                None => {
                    let user = User::get(&mut *conn, post.author_id).await?;
                    authors.entry(post.author_id).or_insert(user)
                }
            }
            .clone();

            let category = match categories.get(&post.category_id) {
                Some(category) => category,
                None => {
                    let category = Category::get(&mut *conn, post.category_id).await?;
                    categories.entry(post.category_id).or_insert(category)
                }
            }
            .clone();

            let tags = Tag::list_for_post(&mut *conn, post.id).await?;
            items.push(Self {
                post,
                author,
                category,
                tags,
            });
        }

        Ok(items)
    }
}

impl PostView {
    pub(crate) async fn load(conn: &mut Connection, post: Post) -> database::Result<Self> {
        let author = User::get(&mut *conn, post.author_id).await?;
        let category = Category::get(&mut *conn, post.category_id).await?;
        let tags = Tag::list_for_post(&mut *conn, post.id).await?;

        let mut comment_authors: HashMap<_, User> = HashMap::new();
        let mut comments = Vec::new();
        for comment in Comment::list_approved_for_post(&mut *conn, post.id).await? {
            let author = match comment_authors.get(&comment.author_id) {
                Some(user) => user,
                None => {
                    let user = User::get(&mut *conn, comment.author_id).await?;
                    comment_authors.entry(comment.author_id).or_insert(user)
                }
            }
            .clone();
            comments.push(CommentView { comment, author });
        }

        Ok(Self {
            post,
            author,
            category,
            tags,
            comments,
        })
    }
}

/// Field rules shared by create and update; enforced here so callers
/// get a predictable error object instead of a storage constraint
/// violation.
pub(crate) fn validate_post_fields(
    title: &str,
    content: &str,
    summary: Option<&str>,
    tag_names: &[String],
) -> Result<(), ValidationError> {
    let mut fields = ValidationError::builder();
    fields.check_text("title", title, TITLE_MAX);
    fields.check_text("content", content, usize::MAX);
    if let Some(summary) = summary {
        if !summary.is_empty() {
            fields.check_text("summary", summary, SUMMARY_MAX);
        }
    }
    for name in tag_names {
        let name = name.trim();
        if name.chars().count() > TAG_NAME_MAX {
            fields.insert(
                "tags",
                format!("{name:?} must be at most {TAG_NAME_MAX} characters"),
            );
        }
    }
    fields.into_result()
}

#[cfg(test)]
mod tests {
    use super::validate_post_fields;

    #[test]
    fn rejects_missing_required_fields() {
        let error = validate_post_fields("", "<p>x</p>", None, &[]).unwrap_err();
        assert!(!error.messages_for("title").is_empty());

        let error = validate_post_fields("Hello", "", None, &[]).unwrap_err();
        assert!(!error.messages_for("content").is_empty());
    }

    #[test]
    fn rejects_oversized_title_and_summary() {
        let long_title = "t".repeat(161);
        let error = validate_post_fields(&long_title, "<p>x</p>", None, &[]).unwrap_err();
        assert!(!error.messages_for("title").is_empty());

        let long_summary = "s".repeat(2001);
        let error =
            validate_post_fields("Hello", "<p>x</p>", Some(&long_summary), &[]).unwrap_err();
        assert!(!error.messages_for("summary").is_empty());
    }

    #[test]
    fn rejects_oversized_tag_names() {
        let tags = vec!["rust".to_string(), "t".repeat(81)];
        let error = validate_post_fields("Hello", "<p>x</p>", None, &tags).unwrap_err();
        assert!(!error.messages_for("tags").is_empty());

        // surrounding whitespace is not counted against the limit
        let tags = vec![format!("  {}  ", "t".repeat(80))];
        assert!(validate_post_fields("Hello", "<p>x</p>", None, &tags).is_ok());
    }

    #[test]
    fn accepts_reasonable_input() {
        let tags = vec!["rust".to_string()];
        assert!(validate_post_fields("Hello World", "<p>x</p>", Some("a post"), &tags).is_ok());
    }
}
