use chrono::NaiveDateTime;
use sqlx::FromRow;

use crate::{
    database::{Connection, ErrorExt, Result},
    types::{CategoryId, PostId, UserId},
    util::slugify,
};

/// SQL twin of [`slugify`], used wherever a stored title has to be
/// compared against a slug without denormalizing a slug column.
const SLUG_OF_TITLE: &str = r"regexp_replace(lower(replace(title, ' ', '-')), '-{2,}', '-', 'g')";

#[derive(Debug, FromRow, PartialEq, Eq, Clone)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub featured_image: Option<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub view_count: i32,
    pub like_count: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub published_at: Option<NaiveDateTime>,
    pub author_id: UserId,
    pub category_id: CategoryId,
}

impl Post {
    /// The slug is a pure function of the stored title, derived on
    /// read. Renaming the title changes it immediately.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.title)
    }

    #[tracing::instrument(skip_all, name = "db.posts.find")]
    pub async fn find(conn: &mut Connection, id: PostId) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(r#"SELECT * FROM "posts" WHERE id = $1"#)
            .bind(id)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }

    #[tracing::instrument(skip(conn), name = "db.posts.find_published_by_slug")]
    pub async fn find_published_by_slug(conn: &mut Connection, slug: &str) -> Result<Option<Self>> {
        let query =
            format!(r#"SELECT * FROM "posts" WHERE is_published AND {SLUG_OF_TITLE} = lower($1)"#);
        sqlx::query_as::<_, Self>(&query)
            .bind(slug)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }

    /// Finds any post (published or not) whose title derives the given
    /// slug, excluding one id. Backs the duplicate-slug rejection.
    #[tracing::instrument(skip(conn), name = "db.posts.find_slug_collision")]
    pub async fn find_slug_collision(
        conn: &mut Connection,
        slug: &str,
        exclude: Option<PostId>,
    ) -> Result<Option<PostId>> {
        let query = format!(
            r#"SELECT id FROM "posts"
               WHERE {SLUG_OF_TITLE} = lower($1) AND ($2::uuid IS NULL OR id <> $2)
               LIMIT 1"#
        );
        sqlx::query_scalar::<_, PostId>(&query)
            .bind(slug)
            .bind(exclude)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }

    /// Published posts, newest first, 0-based offset.
    #[tracing::instrument(skip_all, name = "db.posts.list_published")]
    pub async fn list_published(conn: &mut Connection, offset: i64, limit: i64) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"SELECT * FROM "posts" WHERE is_published
               ORDER BY published_at DESC
               OFFSET $1 LIMIT $2"#,
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(conn)
        .await
        .into_db_error()
    }

    #[tracing::instrument(skip_all, name = "db.posts.list_featured")]
    pub async fn list_featured(conn: &mut Connection, limit: i64) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"SELECT * FROM "posts" WHERE is_published AND is_featured
               ORDER BY published_at DESC
               LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(conn)
        .await
        .into_db_error()
    }

    #[tracing::instrument(skip_all, name = "db.posts.list_recent")]
    pub async fn list_recent(conn: &mut Connection, limit: i64) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"SELECT * FROM "posts" WHERE is_published
               ORDER BY published_at DESC
               LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(conn)
        .await
        .into_db_error()
    }

    #[tracing::instrument(skip_all, name = "db.posts.list_most_viewed")]
    pub async fn list_most_viewed(conn: &mut Connection, limit: i64) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"SELECT * FROM "posts" WHERE is_published
               ORDER BY view_count DESC
               LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(conn)
        .await
        .into_db_error()
    }

    #[tracing::instrument(skip_all, name = "db.posts.list_by_category")]
    pub async fn list_by_category(
        conn: &mut Connection,
        category_id: CategoryId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"SELECT * FROM "posts" WHERE is_published AND category_id = $1
               ORDER BY published_at DESC
               OFFSET $2 LIMIT $3"#,
        )
        .bind(category_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(conn)
        .await
        .into_db_error()
    }

    /// Other published posts sharing at least one tag with the source
    /// post, newest first.
    #[tracing::instrument(skip_all, name = "db.posts.list_related")]
    pub async fn list_related(conn: &mut Connection, id: PostId, limit: i64) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"SELECT p.* FROM "posts" p
               WHERE p.is_published AND p.id <> $1 AND EXISTS (
                   SELECT 1 FROM "post_tags" pt
                   INNER JOIN "post_tags" src ON src.tag_id = pt.tag_id
                   WHERE pt.post_id = p.id AND src.post_id = $1
               )
               ORDER BY p.published_at DESC
               LIMIT $2"#,
        )
        .bind(id)
        .bind(limit)
        .fetch_all(conn)
        .await
        .into_db_error()
    }

    /// Every post regardless of publish state, for the admin listing.
    #[tracing::instrument(skip_all, name = "db.posts.list_all")]
    pub async fn list_all(conn: &mut Connection, offset: i64, limit: i64) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"SELECT * FROM "posts"
               ORDER BY created_at DESC
               OFFSET $1 LIMIT $2"#,
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(conn)
        .await
        .into_db_error()
    }

    #[tracing::instrument(skip_all, name = "db.posts.count")]
    pub async fn count(conn: &mut Connection) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "posts""#)
            .fetch_one(conn)
            .await
            .into_db_error()
    }

    #[tracing::instrument(skip_all, name = "db.posts.count_published")]
    pub async fn count_published(conn: &mut Connection) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "posts" WHERE is_published"#)
            .fetch_one(conn)
            .await
            .into_db_error()
    }

    /// Atomic column-level increment. A load-then-save here would lose
    /// updates under concurrency.
    #[tracing::instrument(skip_all, name = "db.posts.increment_view_count")]
    pub async fn increment_view_count(conn: &mut Connection, id: PostId) -> Result<bool> {
        let result = sqlx::query(r#"UPDATE "posts" SET view_count = view_count + 1 WHERE id = $1"#)
            .bind(id)
            .execute(conn)
            .await
            .into_db_error()?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomic like-counter delta, clamped so it never goes negative.
    #[tracing::instrument(skip_all, name = "db.posts.adjust_like_count")]
    pub async fn adjust_like_count(conn: &mut Connection, id: PostId, delta: i32) -> Result<()> {
        sqlx::query(
            r#"UPDATE "posts" SET like_count = GREATEST(like_count + $2, 0) WHERE id = $1"#,
        )
        .bind(id)
        .bind(delta)
        .execute(conn)
        .await
        .into_db_error()?;
        Ok(())
    }

    /// Removes the post, returning the deleted row so the caller can
    /// clean up its image asset. Join rows go away via cascade.
    #[tracing::instrument(skip_all, name = "db.posts.delete")]
    pub async fn delete(conn: &mut Connection, id: PostId) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(r#"DELETE FROM "posts" WHERE id = $1 RETURNING *"#)
            .bind(id)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }
}

#[derive(Debug)]
pub struct InsertPost<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub summary: Option<&'a str>,
    pub featured_image: Option<&'a str>,
    pub is_published: bool,
    pub is_featured: bool,
    pub author_id: UserId,
    pub category_id: CategoryId,
}

impl InsertPost<'_> {
    /// `published_at` is stamped at creation iff the post is born
    /// published.
    #[tracing::instrument(skip_all, name = "db.posts.insert")]
    pub async fn insert(&self, conn: &mut Connection) -> Result<Post> {
        sqlx::query_as::<_, Post>(
            r#"INSERT INTO "posts"
                   (id, title, content, summary, featured_image, is_published,
                    is_featured, published_at, author_id, category_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7,
                       CASE WHEN $6 THEN (NOW() AT TIME ZONE 'utc') END, $8, $9)
               RETURNING *"#,
        )
        .bind(PostId::generate())
        .bind(self.title)
        .bind(self.content)
        .bind(self.summary)
        .bind(self.featured_image)
        .bind(self.is_published)
        .bind(self.is_featured)
        .bind(self.author_id)
        .bind(self.category_id)
        .fetch_one(conn)
        .await
        .into_db_error()
    }
}

#[derive(Debug)]
pub struct UpdatePost<'a> {
    pub id: PostId,
    pub title: &'a str,
    pub content: &'a str,
    pub summary: Option<&'a str>,
    pub featured_image: Option<&'a str>,
    pub is_published: bool,
    pub is_featured: bool,
    pub category_id: CategoryId,
    /// Optimistic concurrency token: the `updated_at` the caller
    /// loaded. A row that moved on since then will not match.
    pub expected_updated_at: NaiveDateTime,
}

impl UpdatePost<'_> {
    /// Applies the mutable fields. Returns `None` when no row matched,
    /// which means the post is either gone or was updated concurrently;
    /// the caller distinguishes the two.
    ///
    /// `published_at` is set exactly once, on the first transition to
    /// published, and never overwritten or cleared afterwards.
    #[tracing::instrument(skip_all, name = "db.posts.update")]
    pub async fn update(&self, conn: &mut Connection) -> Result<Option<Post>> {
        sqlx::query_as::<_, Post>(
            r#"UPDATE "posts" SET
                   title = $2,
                   content = $3,
                   summary = $4,
                   featured_image = $5,
                   is_published = $6,
                   is_featured = $7,
                   category_id = $8,
                   updated_at = (NOW() AT TIME ZONE 'utc'),
                   published_at = COALESCE(
                       published_at,
                       CASE WHEN $6 THEN (NOW() AT TIME ZONE 'utc') END
                   )
               WHERE id = $1 AND updated_at = $9
               RETURNING *"#,
        )
        .bind(self.id)
        .bind(self.title)
        .bind(self.content)
        .bind(self.summary)
        .bind(self.featured_image)
        .bind(self.is_published)
        .bind(self.is_featured)
        .bind(self.category_id)
        .bind(self.expected_updated_at)
        .fetch_optional(conn)
        .await
        .into_db_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: &str) -> Post {
        Post {
            id: PostId::generate(),
            title: title.into(),
            content: "<p>x</p>".into(),
            summary: None,
            featured_image: None,
            is_published: true,
            is_featured: false,
            view_count: 0,
            like_count: 0,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
            published_at: Some(NaiveDateTime::default()),
            author_id: UserId::generate(),
            category_id: CategoryId::generate(),
        }
    }

    #[test]
    fn slug_follows_the_title() {
        let mut subject = post("Hello World");
        assert_eq!(subject.slug(), "hello-world");

        subject.title = "Hello  Renamed World".into();
        assert_eq!(subject.slug(), "hello-renamed-world");
    }
}
