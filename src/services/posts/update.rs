use chrono::NaiveDateTime;

use crate::database::{retry, ErrorExt};
use crate::schema::{post, Category, Post, Tag};
use crate::services::{Error, Result};
use crate::types::{CategoryId, PostId};
use crate::util::{slugify, ValidationError};
use crate::App;

use super::create::{discard_image, normalized_tag_names, validate_fields};
use super::ImageUpload;

/// Applies the mutable fields of a post and replaces its entire tag
/// set, all in one transaction.
///
/// Uses optimistic concurrency: `expected_updated_at` is the value the
/// caller loaded, and a row that moved on since then produces a
/// conflict instead of a silent overwrite.
#[derive(Debug)]
pub struct UpdatePost {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub category_id: CategoryId,
    pub tag_names: Vec<String>,
    pub expected_updated_at: NaiveDateTime,
    /// Replaces the featured image when set; the previous asset is
    /// removed after the row is saved.
    pub featured_image: Option<ImageUpload>,
    /// Clears the featured image (and removes its asset) when no
    /// replacement is supplied.
    pub remove_featured_image: bool,
}

enum Outcome {
    Updated {
        post: Post,
        old_image: Option<String>,
    },
    NotFound,
    Conflict,
    MissingCategory,
    SlugTaken,
}

impl UpdatePost {
    #[tracing::instrument(skip_all, fields(id = %self.id), name = "services.posts.update")]
    pub async fn perform(self, app: &App) -> Result<Post> {
        validate_fields(
            &self.title,
            &self.content,
            self.summary.as_deref(),
            &self.tag_names,
        )?;
        let slug = slugify(&self.title);

        let new_image_ref = match &self.featured_image {
            Some(upload) => Some(
                app.images
                    .save(upload.bytes.clone(), &upload.content_type, "featured")
                    .await?,
            ),
            None => None,
        };

        let outcome = retry::with_backoff("posts.update", || async {
            let mut tx = app.primary_db.begin().await?;

            let Some(current) = Post::find(&mut *tx, self.id).await? else {
                return Ok(Outcome::NotFound);
            };

            if Category::find(&mut *tx, self.category_id).await?.is_none() {
                return Ok(Outcome::MissingCategory);
            }

            if Post::find_slug_collision(&mut *tx, &slug, Some(self.id))
                .await?
                .is_some()
            {
                return Ok(Outcome::SlugTaken);
            }

            let image_ref = match (&new_image_ref, self.remove_featured_image) {
                (Some(new_ref), _) => Some(new_ref.as_str()),
                (None, true) => None,
                (None, false) => current.featured_image.as_deref(),
            };

            let updated = post::UpdatePost {
                id: self.id,
                title: &self.title,
                content: &self.content,
                summary: self.summary.as_deref(),
                featured_image: image_ref,
                is_published: self.is_published,
                is_featured: self.is_featured,
                category_id: self.category_id,
                expected_updated_at: self.expected_updated_at,
            }
            .update(&mut *tx)
            .await?;

            // The row exists but did not match the expected token.
            let Some(updated) = updated else {
                return Ok(Outcome::Conflict);
            };

            // All-or-nothing tag replacement; a failure part way rolls
            // the whole set back with the transaction.
            Tag::unlink_all_from_post(&mut *tx, self.id).await?;
            for name in normalized_tag_names(&self.tag_names) {
                let tag = Tag::find_or_create(&mut *tx, name).await?;
                Tag::link_to_post(&mut *tx, self.id, tag.id).await?;
            }

            tx.commit().await.into_db_error()?;

            let replaced = new_image_ref.is_some() || self.remove_featured_image;
            Ok(Outcome::Updated {
                post: updated,
                old_image: current.featured_image.filter(|_| replaced),
            })
        })
        .await;

        match outcome {
            Ok(Outcome::Updated { post, old_image }) => {
                // Replaced or removed assets are deleted only once the
                // row is safely committed.
                discard_image(app, old_image.as_deref()).await;
                Ok(post)
            }
            Ok(Outcome::NotFound) => {
                discard_image(app, new_image_ref.as_deref()).await;
                Err(Error::NotFound)
            }
            Ok(Outcome::Conflict) => {
                discard_image(app, new_image_ref.as_deref()).await;
                Err(Error::Conflict)
            }
            Ok(Outcome::MissingCategory) => {
                discard_image(app, new_image_ref.as_deref()).await;
                Err(ValidationError::field("category", "does not exist").into())
            }
            Ok(Outcome::SlugTaken) => {
                discard_image(app, new_image_ref.as_deref()).await;
                Err(ValidationError::field(
                    "title",
                    "another post already uses the same URL slug",
                )
                .into())
            }
            Err(report) => {
                discard_image(app, new_image_ref.as_deref()).await;
                Err(report.into())
            }
        }
    }
}
