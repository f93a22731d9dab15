//! End-to-end tests against a real Postgres database.
//!
//! These are ignored by default; point `DATABASE_URL` at a disposable
//! database and run `cargo test -- --ignored` to exercise them.

use std::num::{NonZeroU32, NonZeroU64};

use inkcap::config;
use inkcap::database::migrations;
use inkcap::schema::{user, Post, User};
use inkcap::services::{categories, comments, posts, stats, tags};
use inkcap::types::{CategoryId, UserId};
use inkcap::App;
use uuid::Uuid;

async fn test_app() -> (App, tempfile::TempDir) {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for these tests");

    let media_dir = tempfile::tempdir().unwrap();
    let config = config::App {
        db: config::Database {
            primary: config::DbPoolConfig {
                min_idle: None,
                pool_size: NonZeroU32::new(5).unwrap(),
                url: url.into(),
            },
            replica: None,
            enforce_tls: false,
            timeout_secs: NonZeroU64::new(5).unwrap(),
        },
        uploads: config::Uploads {
            root_dir: media_dir.path().to_path_buf(),
            ..Default::default()
        },
        pagination: Default::default(),
    };

    let app = App::new(config).await.unwrap();
    app.primary_db.wait_until_healthy().await.unwrap();
    migrations::run_pending(&app.primary_db).await.unwrap();
    (app, media_dir)
}

/// Rows are shared across test runs, so every fixture gets a unique
/// suffix to keep emails, names and slugs from colliding.
fn unique(label: &str) -> String {
    format!("{label} {}", Uuid::new_v4())
}

async fn create_author(app: &App) -> UserId {
    let mut conn = app.db_write().await.unwrap();
    let email = format!("author-{}@example.com", Uuid::new_v4());
    let author = user::InsertUser {
        email: &email,
        first_name: Some("Test"),
        last_name: Some("Author"),
    }
    .insert(&mut conn)
    .await
    .unwrap();
    author.id
}

async fn create_category(app: &App) -> CategoryId {
    let category = categories::CreateCategory {
        name: unique("Category"),
        description: None,
        color: Some("#007bff".into()),
    }
    .perform(app)
    .await
    .unwrap();
    category.id
}

fn new_post(title: String, author_id: UserId, category_id: CategoryId) -> posts::CreatePost {
    posts::CreatePost {
        title,
        content: "<p>body</p>".into(),
        summary: Some("a summary".into()),
        is_published: true,
        is_featured: false,
        author_id,
        category_id,
        tag_names: vec![],
        featured_image: None,
    }
}

fn update_from(post: &Post) -> posts::UpdatePost {
    posts::UpdatePost {
        id: post.id,
        title: post.title.clone(),
        content: post.content.clone(),
        summary: post.summary.clone(),
        is_published: post.is_published,
        is_featured: post.is_featured,
        category_id: post.category_id,
        tag_names: vec![],
        expected_updated_at: post.updated_at,
        featured_image: None,
        remove_featured_image: false,
    }
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn publish_timestamp_is_set_once() {
    let (app, _media) = test_app().await;
    let author = create_author(&app).await;
    let category = create_category(&app).await;

    let mut request = new_post(unique("Draft first"), author, category);
    request.is_published = false;
    let draft = request.perform(&app).await.unwrap();
    assert!(draft.published_at.is_none());

    let mut publish = update_from(&draft);
    publish.is_published = true;
    let published = publish.perform(&app).await.unwrap();
    let stamped = published.published_at.expect("publishing sets the timestamp");

    // A later edit, even one that unpublishes, keeps the original stamp.
    let mut unpublish = update_from(&published);
    unpublish.is_published = false;
    let unpublished = unpublish.perform(&app).await.unwrap();
    assert_eq!(unpublished.published_at, Some(stamped));

    let republished = {
        let mut request = update_from(&unpublished);
        request.is_published = true;
        request.perform(&app).await.unwrap()
    };
    assert_eq!(republished.published_at, Some(stamped));
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn stale_update_is_rejected() {
    let (app, _media) = test_app().await;
    let author = create_author(&app).await;
    let category = create_category(&app).await;

    let post = new_post(unique("Concurrent edits"), author, category)
        .perform(&app)
        .await
        .unwrap();

    // First writer wins and bumps updated_at.
    let mut first = update_from(&post);
    first.summary = Some("first edit".into());
    first.perform(&app).await.unwrap();

    // Second writer still holds the original token.
    let mut second = update_from(&post);
    second.summary = Some("second edit".into());
    let error = second.perform(&app).await.unwrap_err();
    assert!(error.is_conflict(), "expected a conflict, got {error}");
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn toggle_like_round_trips() {
    let (app, _media) = test_app().await;
    let author = create_author(&app).await;
    let reader = create_author(&app).await;
    let category = create_category(&app).await;

    let post = new_post(unique("Likeable"), author, category)
        .perform(&app)
        .await
        .unwrap();

    let liked = posts::ToggleLike {
        post_id: post.id,
        user_id: reader,
    }
    .perform(&app)
    .await
    .unwrap();
    assert!(liked);

    let liked = posts::ToggleLike {
        post_id: post.id,
        user_id: reader,
    }
    .perform(&app)
    .await
    .unwrap();
    assert!(!liked);

    let current = posts::GetPost { id: post.id }
        .perform(&app)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.post.like_count, 0);
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn toggling_a_missing_post_is_not_found() {
    let (app, _media) = test_app().await;
    let reader = create_author(&app).await;

    let error = posts::ToggleLike {
        post_id: inkcap::types::PostId::generate(),
        user_id: reader,
    }
    .perform(&app)
    .await
    .unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn concurrent_view_increments_all_land() {
    let (app, _media) = test_app().await;
    let author = create_author(&app).await;
    let category = create_category(&app).await;

    let post = new_post(unique("Popular"), author, category)
        .perform(&app)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..100 {
        let app = app.clone();
        let post_id = post.id;
        handles.push(tokio::spawn(async move {
            posts::IncrementViewCount { post_id }.perform(&app).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let current = posts::GetPost { id: post.id }
        .perform(&app)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.post.view_count, 100);
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn slug_lookup_serves_published_posts_only() {
    let (app, _media) = test_app().await;
    let author = create_author(&app).await;
    let category = create_category(&app).await;

    let published = new_post(unique("Hello World"), author, category)
        .perform(&app)
        .await
        .unwrap();

    let found = posts::GetPostBySlug {
        slug: &published.slug(),
    }
    .perform(&app)
    .await
    .unwrap()
    .expect("published post is reachable by slug");
    assert_eq!(found.post.id, published.id);
    assert_eq!(found.category.id, category);

    let mut draft = new_post(unique("Hidden Draft"), author, category);
    draft.is_published = false;
    let draft = draft.perform(&app).await.unwrap();

    let found = posts::GetPostBySlug {
        slug: &draft.slug(),
    }
    .perform(&app)
    .await
    .unwrap();
    assert!(found.is_none(), "drafts are invisible to slug lookups");
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn duplicate_slugs_are_rejected() {
    let (app, _media) = test_app().await;
    let author = create_author(&app).await;
    let category = create_category(&app).await;

    let title = unique("One Slug Only");
    new_post(title.clone(), author, category)
        .perform(&app)
        .await
        .unwrap();

    let error = new_post(title, author, category)
        .perform(&app)
        .await
        .unwrap_err();
    let validation = error.validation().expect("a field-level rejection");
    assert!(!validation.messages_for("title").is_empty());
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn duplicate_category_names_are_rejected() {
    let (app, _media) = test_app().await;
    let name = unique("Category");

    categories::CreateCategory {
        name: name.clone(),
        description: None,
        color: None,
    }
    .perform(&app)
    .await
    .unwrap();

    let error = categories::CreateCategory {
        name,
        description: Some("different description, same name".into()),
        color: None,
    }
    .perform(&app)
    .await
    .unwrap_err();
    let validation = error.validation().expect("a field-level rejection");
    assert!(!validation.messages_for("name").is_empty());
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn tag_listing_and_content_stats_reflect_new_content() {
    let (app, _media) = test_app().await;
    let author = create_author(&app).await;
    let category = create_category(&app).await;
    let tag = unique("tag");

    let before = stats::GetContentStats.perform(&app).await.unwrap();

    let mut request = new_post(unique("Tagged"), author, category);
    request.tag_names = vec![tag.clone()];
    request.perform(&app).await.unwrap();

    let listed = tags::ListTags.perform(&app).await.unwrap();
    assert!(listed.iter().any(|t| t.name == tag));

    // other tests may write concurrently, so the counts are monotonic
    // rather than exact
    let after = stats::GetContentStats.perform(&app).await.unwrap();
    assert!(after.posts > before.posts);
    assert!(after.published_posts > before.published_posts);
    assert!(after.tags > before.tags);
    assert!(after.categories >= 1);
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn category_pages_have_a_fixed_size() {
    let (app, _media) = test_app().await;
    let author = create_author(&app).await;
    let category = create_category(&app).await;

    for n in 0..8 {
        new_post(unique(&format!("Paged {n}")), author, category)
            .perform(&app)
            .await
            .unwrap();
    }

    let page = |page| posts::ListPostsByCategory {
        category_id: category,
        page,
        page_size: None,
    };

    // default public page size is 6
    assert_eq!(page(1).perform(&app).await.unwrap().len(), 6);
    assert_eq!(page(2).perform(&app).await.unwrap().len(), 2);
    assert!(page(3).perform(&app).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn related_posts_share_a_tag() {
    let (app, _media) = test_app().await;
    let author = create_author(&app).await;
    let category = create_category(&app).await;
    let tag = unique("tag");

    let mut source = new_post(unique("Source"), author, category);
    source.tag_names = vec![tag.clone()];
    let source = source.perform(&app).await.unwrap();

    let mut sibling = new_post(unique("Sibling"), author, category);
    sibling.tag_names = vec![tag];
    let sibling = sibling.perform(&app).await.unwrap();

    // same category, no shared tag
    new_post(unique("Stranger"), author, category)
        .perform(&app)
        .await
        .unwrap();

    let related = posts::ListRelatedPosts {
        post_id: source.id,
        count: 10,
    }
    .perform(&app)
    .await
    .unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].post.id, sibling.id);
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn comments_wait_for_approval() {
    let (app, _media) = test_app().await;
    let author = create_author(&app).await;
    let commenter = create_author(&app).await;
    let category = create_category(&app).await;

    let post = new_post(unique("Discussed"), author, category)
        .perform(&app)
        .await
        .unwrap();

    let comment = comments::SubmitComment {
        post_id: post.id,
        author_id: commenter,
        content: "great post".into(),
        parent_comment_id: None,
    }
    .perform(&app)
    .await
    .unwrap();
    assert!(!comment.is_approved);

    let view = posts::GetPost { id: post.id }
        .perform(&app)
        .await
        .unwrap()
        .unwrap();
    assert!(view.comments.is_empty(), "pending comments stay hidden");

    comments::ApproveComment { id: comment.id }
        .perform(&app)
        .await
        .unwrap();

    let view = posts::GetPost { id: post.id }
        .perform(&app)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.comments.len(), 1);
    assert_eq!(view.comments[0].comment.id, comment.id);
    assert_eq!(view.comments[0].author.id, commenter);
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn replies_must_stay_on_the_same_post() {
    let (app, _media) = test_app().await;
    let author = create_author(&app).await;
    let commenter = create_author(&app).await;
    let category = create_category(&app).await;

    let first = new_post(unique("Thread A"), author, category)
        .perform(&app)
        .await
        .unwrap();
    let second = new_post(unique("Thread B"), author, category)
        .perform(&app)
        .await
        .unwrap();

    let parent = comments::SubmitComment {
        post_id: first.id,
        author_id: commenter,
        content: "parent".into(),
        parent_comment_id: None,
    }
    .perform(&app)
    .await
    .unwrap();

    let error = comments::SubmitComment {
        post_id: second.id,
        author_id: commenter,
        content: "cross-thread reply".into(),
        parent_comment_id: Some(parent.id),
    }
    .perform(&app)
    .await
    .unwrap_err();
    assert!(error.validation().is_some());
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn deleting_a_post_removes_its_dependents() {
    let (app, _media) = test_app().await;
    let author = create_author(&app).await;
    let commenter = create_author(&app).await;
    let category = create_category(&app).await;

    let mut request = new_post(unique("Short Lived"), author, category);
    request.tag_names = vec![unique("tag")];
    let post = request.perform(&app).await.unwrap();

    comments::SubmitComment {
        post_id: post.id,
        author_id: commenter,
        content: "soon gone".into(),
        parent_comment_id: None,
    }
    .perform(&app)
    .await
    .unwrap();

    posts::DeletePost { id: post.id }.perform(&app).await.unwrap();

    assert!(posts::GetPost { id: post.id }
        .perform(&app)
        .await
        .unwrap()
        .is_none());

    // a second delete has nothing left to remove
    let error = posts::DeletePost { id: post.id }
        .perform(&app)
        .await
        .unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn seeding_twice_changes_nothing() {
    let (app, _media) = test_app().await;

    inkcap::seed::run(&app).await.unwrap();
    inkcap::seed::run(&app).await.unwrap();

    let mut conn = app.db_write().await.unwrap();
    let admin = User::by_email(&mut conn, inkcap::seed::ADMIN_EMAIL)
        .await
        .unwrap()
        .expect("admin account exists");
    let roles = User::roles(&mut conn, admin.id).await.unwrap();
    assert!(roles.contains(&"Admin".to_string()));
}
