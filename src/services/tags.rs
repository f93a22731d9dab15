use crate::database::retry;
use crate::schema::Tag;
use crate::services::Result;
use crate::App;

/// Every tag, alphabetical, for tag clouds and the admin tag picker.
#[derive(Debug)]
pub struct ListTags;

impl ListTags {
    #[tracing::instrument(skip_all, name = "services.tags.list")]
    pub async fn perform(self, app: &App) -> Result<Vec<Tag>> {
        let tags = retry::with_backoff("tags.list", || async {
            let mut conn = app.db_read().await?;
            Tag::list_all(&mut conn).await
        })
        .await?;

        Ok(tags)
    }
}
