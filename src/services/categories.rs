use crate::database::retry;
use crate::schema::{category, Category};
use crate::services::Result;
use crate::types::CategoryId;
use crate::util::{validation::is_valid_hex_color, ValidationError};
use crate::App;

const NAME_MAX: usize = 80;
const DESCRIPTION_MAX: usize = 255;

#[derive(Debug)]
pub struct ListCategories;

impl ListCategories {
    #[tracing::instrument(skip_all, name = "services.categories.list")]
    pub async fn perform(self, app: &App) -> Result<Vec<Category>> {
        let categories = retry::with_backoff("categories.list", || async {
            let mut conn = app.db_read().await?;
            Category::list_all(&mut conn).await
        })
        .await?;

        Ok(categories)
    }
}

#[derive(Debug)]
pub struct GetCategory {
    pub id: CategoryId,
}

impl GetCategory {
    #[tracing::instrument(skip_all, fields(request = ?self), name = "services.categories.get")]
    pub async fn perform(self, app: &App) -> Result<Option<Category>> {
        let category = retry::with_backoff("categories.get", || async {
            let mut conn = app.db_read().await?;
            Category::find(&mut conn, self.id).await
        })
        .await?;

        Ok(category)
    }
}

/// Creates a category; the name must be unique at write time.
#[derive(Debug)]
pub struct CreateCategory {
    pub name: String,
    pub description: Option<String>,
    /// Hex color used for the category badge, e.g. `#007bff`.
    pub color: Option<String>,
}

enum Outcome {
    Created(Category),
    NameTaken,
}

impl CreateCategory {
    #[tracing::instrument(skip_all, name = "services.categories.create")]
    pub async fn perform(self, app: &App) -> Result<Category> {
        self.validate()?;

        let outcome = retry::with_backoff("categories.create", || async {
            let mut conn = app.db_write().await?;

            // The unique index arbitrates duplicate names, so two
            // concurrent creates cannot both pass a pre-check.
            let inserted = category::InsertCategory {
                name: &self.name,
                description: self.description.as_deref(),
                color: self.color.as_deref(),
            }
            .insert(&mut conn)
            .await?;

            Ok(match inserted {
                Some(category) => Outcome::Created(category),
                None => Outcome::NameTaken,
            })
        })
        .await?;

        match outcome {
            Outcome::Created(category) => Ok(category),
            Outcome::NameTaken => {
                Err(ValidationError::field("name", "is already in use").into())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let mut fields = ValidationError::builder();
        fields.check_text("name", &self.name, NAME_MAX);
        if let Some(description) = self.description.as_deref() {
            if description.chars().count() > DESCRIPTION_MAX {
                fields.insert(
                    "description",
                    format!("must be at most {DESCRIPTION_MAX} characters"),
                );
            }
        }
        if let Some(color) = self.color.as_deref() {
            if !is_valid_hex_color(color) {
                fields.insert("color", "must be a hex color like #007bff");
            }
        }
        Ok(fields.into_result()?)
    }
}
