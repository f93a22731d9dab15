use chrono::NaiveDateTime;
use sqlx::FromRow;

use crate::{
    database::{Connection, ErrorExt, Result},
    types::UserId,
};

/// An authenticated account as this crate sees it. Credential checks
/// happen in the identity provider; this record only carries the
/// fields content operations need.
#[derive(Debug, FromRow, PartialEq, Eq, Clone)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    #[must_use]
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{first} {last}").trim().to_string()
    }

    #[tracing::instrument(skip_all, name = "db.users.find")]
    pub async fn find(conn: &mut Connection, id: UserId) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(r#"SELECT * FROM "users" WHERE id = $1"#)
            .bind(id)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }

    /// Like [`User::find`] but the row is known to exist (a foreign
    /// key points at it); absence surfaces as a storage error.
    #[tracing::instrument(skip_all, name = "db.users.get")]
    pub async fn get(conn: &mut Connection, id: UserId) -> Result<Self> {
        sqlx::query_as::<_, Self>(r#"SELECT * FROM "users" WHERE id = $1"#)
            .bind(id)
            .fetch_one(conn)
            .await
            .into_db_error()
    }

    #[tracing::instrument(skip(conn), name = "db.users.by_email")]
    pub async fn by_email(conn: &mut Connection, email: &str) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(r#"SELECT * FROM "users" WHERE email = $1"#)
            .bind(email)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }

    /// Role membership is a flat mapping from user id to role names.
    #[tracing::instrument(skip_all, name = "db.users.roles")]
    pub async fn roles(conn: &mut Connection, id: UserId) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"SELECT role_name FROM "user_roles" WHERE user_id = $1 ORDER BY role_name"#,
        )
        .bind(id)
        .fetch_all(conn)
        .await
        .into_db_error()
    }

    #[tracing::instrument(skip_all, name = "db.users.assign_role")]
    pub async fn assign_role(conn: &mut Connection, id: UserId, role: &str) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO "user_roles" (user_id, role_name) VALUES ($1, $2)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(id)
        .bind(role)
        .execute(conn)
        .await
        .into_db_error()?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct InsertUser<'a> {
    pub email: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

impl InsertUser<'_> {
    #[tracing::instrument(skip_all, name = "db.users.insert")]
    pub async fn insert(&self, conn: &mut Connection) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO "users" (id, email, first_name, last_name)
               VALUES ($1, $2, $3, $4)
               RETURNING *"#,
        )
        .bind(UserId::generate())
        .bind(self.email)
        .bind(self.first_name)
        .bind(self.last_name)
        .fetch_one(conn)
        .await
        .into_db_error()
    }
}

/// Role rows keyed by name; the set {Admin, Author, User} is
/// guaranteed by the seed routine.
pub struct Role;

impl Role {
    #[tracing::instrument(skip(conn), name = "db.roles.ensure")]
    pub async fn ensure(conn: &mut Connection, name: &str) -> Result<()> {
        sqlx::query(r#"INSERT INTO "roles" (name) VALUES ($1) ON CONFLICT DO NOTHING"#)
            .bind(name)
            .execute(conn)
            .await
            .into_db_error()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::User;
    use crate::types::UserId;
    use chrono::NaiveDateTime;

    fn user(first: Option<&str>, last: Option<&str>) -> User {
        User {
            id: UserId::generate(),
            email: "author@inkcap.dev".into(),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            bio: None,
            profile_image: None,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn display_name_trims_missing_parts() {
        assert_eq!(user(Some("Ada"), Some("Lovelace")).display_name(), "Ada Lovelace");
        assert_eq!(user(Some("Ada"), None).display_name(), "Ada");
        assert_eq!(user(None, Some("Lovelace")).display_name(), "Lovelace");
        assert_eq!(user(None, None).display_name(), "");
    }
}
