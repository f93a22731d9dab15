//! Development/bootstrap data. Every step is check-then-create so the
//! routine can run on every startup without piling up duplicates.

use error_stack::Report;

use crate::database::{self, Connection, ErrorExt};
use crate::schema::{category, post, user, Category, Post, Tag, User};
use crate::types::{CategoryId, UserId};
use crate::util::slugify;
use crate::App;

pub const ROLES: &[&str] = &["Admin", "Author", "User"];
pub const ADMIN_EMAIL: &str = "admin@inkcap.dev";

const CATEGORIES: &[(&str, &str, &str)] = &[
    ("Tech", "Posts about technology and software", "#007bff"),
    ("Programming", "Languages, tooling and code", "#6f42c1"),
    ("Lifestyle", "Notes on everyday life", "#28a745"),
    ("Travel", "Trips and places worth writing about", "#fd7e14"),
];

struct SamplePost {
    title: &'static str,
    content: &'static str,
    summary: &'static str,
    category: &'static str,
    tags: &'static [&'static str],
    featured: bool,
}

const POSTS: &[SamplePost] = &[
    SamplePost {
        title: "Hello World",
        content: "<p>Welcome to the blog. This is the first published post.</p>",
        summary: "The obligatory first post.",
        category: "Tech",
        tags: &["announcements"],
        featured: true,
    },
    SamplePost {
        title: "Why Counters Need Atomic Updates",
        content: "<p>A read-modify-write loop loses increments under load. \
                  Push the arithmetic into the database instead.</p>",
        summary: "Column-level deltas beat load-then-save.",
        category: "Tech",
        tags: &["databases", "concurrency"],
        featured: false,
    },
    SamplePost {
        title: "Packing Light for a Long Weekend",
        content: "<p>One bag, three days, no checked luggage.</p>",
        summary: "A short packing checklist.",
        category: "Travel",
        tags: &["packing"],
        featured: false,
    },
];

/// Seeds roles, the admin account, starter categories and a handful of
/// published posts. Safe to call repeatedly.
#[tracing::instrument(skip_all, name = "seed.run")]
pub async fn run(app: &App) -> database::Result<()> {
    let mut tx = app.primary_db.begin().await?;

    for role in ROLES {
        user::Role::ensure(&mut tx, role).await?;
    }

    let admin = ensure_admin(&mut tx).await?;
    let categories = ensure_categories(&mut tx).await?;
    ensure_posts(&mut tx, admin, &categories).await?;

    tx.commit().await.into_db_error()?;
    tracing::info!("seed data is in place");
    Ok(())
}

async fn ensure_admin(conn: &mut Connection) -> database::Result<UserId> {
    if let Some(existing) = User::by_email(&mut *conn, ADMIN_EMAIL).await? {
        return Ok(existing.id);
    }

    tracing::info!(email = ADMIN_EMAIL, "creating admin account");
    let admin = user::InsertUser {
        email: ADMIN_EMAIL,
        first_name: Some("Site"),
        last_name: Some("Admin"),
    }
    .insert(&mut *conn)
    .await?;

    User::assign_role(conn, admin.id, "Admin").await?;
    Ok(admin.id)
}

async fn ensure_categories(
    conn: &mut Connection,
) -> database::Result<Vec<(String, CategoryId)>> {
    let mut out = Vec::with_capacity(CATEGORIES.len());
    for (name, description, color) in CATEGORIES {
        let inserted = category::InsertCategory {
            name,
            description: Some(description),
            color: Some(color),
        }
        .insert(&mut *conn)
        .await?;

        let category = match inserted {
            Some(created) => created,
            // already present; read the existing row
            None => Category::by_name(&mut *conn, name).await?.ok_or_else(|| {
                Report::new(database::Error::Internal(sqlx::Error::RowNotFound))
                    .attach_printable(format!("seed category {name:?} is missing"))
            })?,
        };
        out.push((category.name, category.id));
    }
    Ok(out)
}

async fn ensure_posts(
    conn: &mut Connection,
    author_id: UserId,
    categories: &[(String, CategoryId)],
) -> database::Result<()> {
    for sample in POSTS {
        let slug = slugify(sample.title);
        if Post::find_slug_collision(&mut *conn, &slug, None)
            .await?
            .is_some()
        {
            continue;
        }

        let category_id = categories
            .iter()
            .find(|(name, _)| name == sample.category)
            .map(|(_, id)| *id)
            .ok_or_else(|| {
                Report::new(database::Error::Internal(sqlx::Error::RowNotFound))
                    .attach_printable(format!("seed category {:?} is missing", sample.category))
            })?;

        let created = post::InsertPost {
            title: sample.title,
            content: sample.content,
            summary: Some(sample.summary),
            featured_image: None,
            is_published: true,
            is_featured: sample.featured,
            author_id,
            category_id,
        }
        .insert(&mut *conn)
        .await?;

        for tag_name in sample.tags {
            let tag = Tag::find_or_create(&mut *conn, tag_name).await?;
            Tag::link_to_post(&mut *conn, created.id, tag.id).await?;
        }
    }
    Ok(())
}
