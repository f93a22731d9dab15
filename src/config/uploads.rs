use error_stack::{Report, Result};
use mime::Mime;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Featured image upload limits.
#[derive(Debug, Deserialize)]
pub struct Uploads {
    /// Hard cap on an uploaded file, in bytes.
    ///
    /// **Environment variables**:
    /// - `INKCAP_UPLOADS_MAX_SIZE_BYTES`
    #[serde(default = "Uploads::default_max_size_bytes")]
    pub max_size_bytes: u64,
    /// MIME type allow-list for uploaded images.
    ///
    /// **Environment variables**:
    /// - `INKCAP_UPLOADS_ALLOWED_TYPES`
    #[serde(default = "Uploads::default_allowed_types")]
    pub allowed_types: Vec<String>,
    /// Directory where image assets are written.
    ///
    /// **Environment variables**:
    /// - `INKCAP_UPLOADS_ROOT_DIR`
    #[serde(default = "Uploads::default_root_dir")]
    pub root_dir: PathBuf,
}

#[derive(Debug, Error)]
#[error("invalid uploads configuration")]
pub struct InvalidUploads;

impl Uploads {
    const DEFAULT_MAX_SIZE_BYTES: u64 = 2 * 1024 * 1024;

    fn default_max_size_bytes() -> u64 {
        Self::DEFAULT_MAX_SIZE_BYTES
    }

    fn default_allowed_types() -> Vec<String> {
        ["image/jpeg", "image/png", "image/gif", "image/webp"]
            .map(String::from)
            .to_vec()
    }

    fn default_root_dir() -> PathBuf {
        PathBuf::from("media")
    }

    pub fn validate(&self) -> Result<(), InvalidUploads> {
        if self.max_size_bytes == 0 {
            return Err(Report::new(InvalidUploads)
                .attach_printable("uploads.max_size_bytes must be greater than zero"));
        }

        for entry in &self.allowed_types {
            entry.parse::<Mime>().map_err(|e| {
                Report::new(InvalidUploads)
                    .attach_printable(format!("uploads.allowed_types entry {entry:?}: {e}"))
            })?;
        }

        Ok(())
    }
}

impl Default for Uploads {
    fn default() -> Self {
        Self {
            max_size_bytes: Self::default_max_size_bytes(),
            allowed_types: Self::default_allowed_types(),
            root_dir: Self::default_root_dir(),
        }
    }
}

/// Page sizes handed to the listing operations.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    /// Posts per page on public listings.
    ///
    /// **Environment variables**:
    /// - `INKCAP_PAGINATION_PUBLIC_PAGE_SIZE`
    #[serde(default = "Pagination::default_public_page_size")]
    pub public_page_size: u32,
    /// Posts per page on the admin listing.
    ///
    /// **Environment variables**:
    /// - `INKCAP_PAGINATION_ADMIN_PAGE_SIZE`
    #[serde(default = "Pagination::default_admin_page_size")]
    pub admin_page_size: u32,
}

impl Pagination {
    const fn default_public_page_size() -> u32 {
        6
    }

    const fn default_admin_page_size() -> u32 {
        10
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            public_page_size: Self::default_public_page_size(),
            admin_page_size: Self::default_admin_page_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Uploads;

    #[test]
    fn default_allow_list_parses() {
        assert!(Uploads::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_size_and_bad_mime() {
        let config = Uploads {
            max_size_bytes: 0,
            ..Uploads::default()
        };
        assert!(config.validate().is_err());

        let config = Uploads {
            allowed_types: vec!["not a mime".into()],
            ..Uploads::default()
        };
        assert!(config.validate().is_err());
    }
}
