/// Derives the URL slug for a title.
///
/// Slugs are never persisted; they are recomputed from the stored title
/// on every read so a title rename changes the externally visible slug
/// immediately. The SQL used by slug lookups
/// (`regexp_replace(lower(replace(title, ' ', '-')), '-{2,}', '-', 'g')`)
/// must stay equivalent to this function.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = false;

    for ch in title.chars() {
        let ch = if ch == ' ' { '-' } else { ch };
        if ch == '-' {
            if !last_was_hyphen {
                slug.push('-');
            }
            last_was_hyphen = true;
        } else {
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
            last_was_hyphen = false;
        }
    }

    slug
}
