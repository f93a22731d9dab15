use chrono::NaiveDateTime;
use sqlx::FromRow;

use crate::{
    database::{Connection, ErrorExt, Result},
    types::{PostId, TagId},
    util::slugify,
};

#[derive(Debug, FromRow, PartialEq, Eq, Clone)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub created_at: NaiveDateTime,
}

impl Tag {
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// Tag resolution is exact-match-or-create; no fuzzy matching.
    #[tracing::instrument(skip(conn), name = "db.tags.by_name")]
    pub async fn by_name(conn: &mut Connection, name: &str) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(r#"SELECT * FROM "tags" WHERE name = $1"#)
            .bind(name)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }

    /// Resolves a tag name to its row, creating it when absent.
    ///
    /// A concurrent create of the same name loses the insert to the
    /// unique index and falls back to reading the winner's row.
    #[tracing::instrument(skip(conn), name = "db.tags.find_or_create")]
    pub async fn find_or_create(conn: &mut Connection, name: &str) -> Result<Self> {
        let inserted = sqlx::query_as::<_, Self>(
            r#"INSERT INTO "tags" (id, name) VALUES ($1, $2)
               ON CONFLICT (name) DO NOTHING
               RETURNING *"#,
        )
        .bind(TagId::generate())
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
        .into_db_error()?;

        if let Some(tag) = inserted {
            return Ok(tag);
        }

        sqlx::query_as::<_, Self>(r#"SELECT * FROM "tags" WHERE name = $1"#)
            .bind(name)
            .fetch_one(conn)
            .await
            .into_db_error()
    }

    #[tracing::instrument(skip_all, name = "db.tags.list")]
    pub async fn list_all(conn: &mut Connection) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(r#"SELECT * FROM "tags" ORDER BY name"#)
            .fetch_all(conn)
            .await
            .into_db_error()
    }

    #[tracing::instrument(skip_all, name = "db.tags.list_for_post")]
    pub async fn list_for_post(conn: &mut Connection, post_id: PostId) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"SELECT t.* FROM "tags" t
               INNER JOIN "post_tags" pt ON pt.tag_id = t.id
               WHERE pt.post_id = $1
               ORDER BY t.name"#,
        )
        .bind(post_id)
        .fetch_all(conn)
        .await
        .into_db_error()
    }

    #[tracing::instrument(skip_all, name = "db.tags.count")]
    pub async fn count(conn: &mut Connection) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "tags""#)
            .fetch_one(conn)
            .await
            .into_db_error()
    }

    #[tracing::instrument(skip_all, name = "db.tags.link")]
    pub async fn link_to_post(conn: &mut Connection, post_id: PostId, tag_id: TagId) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO "post_tags" (post_id, tag_id) VALUES ($1, $2)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(post_id)
        .bind(tag_id)
        .execute(conn)
        .await
        .into_db_error()?;
        Ok(())
    }

    #[tracing::instrument(skip_all, name = "db.tags.unlink_all")]
    pub async fn unlink_all_from_post(conn: &mut Connection, post_id: PostId) -> Result<()> {
        sqlx::query(r#"DELETE FROM "post_tags" WHERE post_id = $1"#)
            .bind(post_id)
            .execute(conn)
            .await
            .into_db_error()?;
        Ok(())
    }
}
