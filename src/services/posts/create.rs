use mime::Mime;

use crate::database::{retry, ErrorExt};
use crate::schema::{post, Category, Post, Tag};
use crate::services::{Error, Result};
use crate::types::{CategoryId, UserId};
use crate::util::{slugify, ValidationError};
use crate::App;

/// An uploaded featured image, exactly as received from the caller.
#[derive(Debug)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: Mime,
}

/// Creates a post on behalf of an authenticated author, resolving tag
/// names to rows (exact match or create) and linking them in the same
/// transaction.
#[derive(Debug)]
pub struct CreatePost {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub author_id: UserId,
    pub category_id: CategoryId,
    pub tag_names: Vec<String>,
    pub featured_image: Option<ImageUpload>,
}

enum Outcome {
    Created(Post),
    MissingCategory,
    SlugTaken,
}

impl CreatePost {
    #[tracing::instrument(skip_all, name = "services.posts.create")]
    pub async fn perform(self, app: &App) -> Result<Post> {
        validate_fields(
            &self.title,
            &self.content,
            self.summary.as_deref(),
            &self.tag_names,
        )?;
        let slug = slugify(&self.title);

        // The image is stored before the post row exists so a rejected
        // upload never mutates the database at all.
        let image_ref = match &self.featured_image {
            Some(upload) => Some(
                app.images
                    .save(upload.bytes.clone(), &upload.content_type, "featured")
                    .await?,
            ),
            None => None,
        };

        let outcome = retry::with_backoff("posts.create", || async {
            let mut tx = app.primary_db.begin().await?;

            if Category::find(&mut *tx, self.category_id).await?.is_none() {
                return Ok(Outcome::MissingCategory);
            }

            if Post::find_slug_collision(&mut *tx, &slug, None).await?.is_some() {
                return Ok(Outcome::SlugTaken);
            }

            let post = post::InsertPost {
                title: &self.title,
                content: &self.content,
                summary: self.summary.as_deref(),
                featured_image: image_ref.as_deref(),
                is_published: self.is_published,
                is_featured: self.is_featured,
                author_id: self.author_id,
                category_id: self.category_id,
            }
            .insert(&mut *tx)
            .await?;

            for name in normalized_tag_names(&self.tag_names) {
                let tag = Tag::find_or_create(&mut *tx, name).await?;
                Tag::link_to_post(&mut *tx, post.id, tag.id).await?;
            }

            tx.commit().await.into_db_error()?;
            Ok(Outcome::Created(post))
        })
        .await;

        match outcome {
            Ok(Outcome::Created(post)) => Ok(post),
            Ok(Outcome::MissingCategory) => {
                discard_image(app, image_ref.as_deref()).await;
                Err(ValidationError::field("category", "does not exist").into())
            }
            Ok(Outcome::SlugTaken) => {
                discard_image(app, image_ref.as_deref()).await;
                Err(ValidationError::field(
                    "title",
                    "another post already uses the same URL slug",
                )
                .into())
            }
            Err(report) => {
                discard_image(app, image_ref.as_deref()).await;
                Err(report.into())
            }
        }
    }
}

pub(super) fn validate_fields(
    title: &str,
    content: &str,
    summary: Option<&str>,
    tag_names: &[String],
) -> Result<()> {
    super::validate_post_fields(title, content, summary, tag_names).map_err(Error::from)
}

/// Tag names are matched exactly (case-sensitive), deduplicated and
/// stripped of surrounding whitespace; empties are dropped.
pub(super) fn normalized_tag_names(names: &[String]) -> Vec<&str> {
    let mut seen = Vec::new();
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Removes an asset stored for an operation that did not go through.
pub(super) async fn discard_image(app: &App, reference: Option<&str>) {
    if let Some(reference) = reference {
        app.images.delete(reference).await;
    }
}
