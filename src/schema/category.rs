use chrono::NaiveDateTime;
use sqlx::FromRow;

use crate::{
    database::{Connection, ErrorExt, Result},
    types::CategoryId,
    util::slugify,
};

#[derive(Debug, FromRow, PartialEq, Eq, Clone)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Category {
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    #[tracing::instrument(skip_all, name = "db.categories.find")]
    pub async fn find(conn: &mut Connection, id: CategoryId) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(r#"SELECT * FROM "categories" WHERE id = $1"#)
            .bind(id)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }

    /// Like [`Category::find`] but the row is known to exist (a post
    /// references it); absence surfaces as a storage error.
    #[tracing::instrument(skip_all, name = "db.categories.get")]
    pub async fn get(conn: &mut Connection, id: CategoryId) -> Result<Self> {
        sqlx::query_as::<_, Self>(r#"SELECT * FROM "categories" WHERE id = $1"#)
            .bind(id)
            .fetch_one(conn)
            .await
            .into_db_error()
    }

    #[tracing::instrument(skip(conn), name = "db.categories.by_name")]
    pub async fn by_name(conn: &mut Connection, name: &str) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(r#"SELECT * FROM "categories" WHERE name = $1"#)
            .bind(name)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }

    #[tracing::instrument(skip_all, name = "db.categories.list")]
    pub async fn list_all(conn: &mut Connection) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(r#"SELECT * FROM "categories" ORDER BY name"#)
            .fetch_all(conn)
            .await
            .into_db_error()
    }

    #[tracing::instrument(skip_all, name = "db.categories.count")]
    pub async fn count(conn: &mut Connection) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "categories""#)
            .fetch_one(conn)
            .await
            .into_db_error()
    }
}

#[derive(Debug)]
pub struct InsertCategory<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub color: Option<&'a str>,
}

impl InsertCategory<'_> {
    /// Returns `None` when the name is already taken; a concurrent
    /// create of the same name loses the insert to the unique index
    /// instead of surfacing a constraint violation.
    #[tracing::instrument(skip_all, name = "db.categories.insert")]
    pub async fn insert(&self, conn: &mut Connection) -> Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            r#"INSERT INTO "categories" (id, name, description, color)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (name) DO NOTHING
               RETURNING *"#,
        )
        .bind(CategoryId::generate())
        .bind(self.name)
        .bind(self.description)
        .bind(self.color)
        .fetch_optional(conn)
        .await
        .into_db_error()
    }
}
