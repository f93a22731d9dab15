use error_stack::{Report, Result, ResultExt};
use serde::Deserialize;

use super::ParseError;
use crate::util::figment::FigmentErrorAttachable;

#[derive(Debug, Deserialize)]
pub struct App {
    pub db: super::Database,
    #[serde(default)]
    pub uploads: super::Uploads,
    #[serde(default)]
    pub pagination: super::Pagination,
}

impl App {
    pub fn load() -> Result<Self, ParseError> {
        dotenvy::dotenv().ok();

        let config = Self::figment()
            .extract::<Self>()
            .map_err(|e| Report::new(ParseError).attach_figment_error(e))?;

        config.uploads.validate().change_context(ParseError)?;
        Ok(config)
    }
}

impl App {
    const DEFAULT_CONFIG_FILE: &'static str = "inkcap.toml";

    /// Creates the default [`figment::Figment`] used to load the
    /// configuration. Split out so tests can extract from a [`Jail`].
    ///
    /// [`Jail`]: figment::Jail
    pub(crate) fn figment() -> figment::Figment {
        use figment::{
            providers::{Env, Format, Toml},
            Figment,
        };

        Figment::new()
            .merge(Toml::file(Self::DEFAULT_CONFIG_FILE))
            // The env provider splits on every underscore, which mangles
            // multi-word keys, so those are mapped by hand.
            .merge(Env::prefixed("INKCAP_").map(|v| match v.as_str() {
                "DB_PRIMARY_MIN_IDLE" => "db.primary.min_idle".into(),
                "DB_PRIMARY_POOL_SIZE" => "db.primary.pool_size".into(),

                "DB_REPLICA_MIN_IDLE" => "db.replica.min_idle".into(),
                "DB_REPLICA_POOL_SIZE" => "db.replica.pool_size".into(),

                "DB_ENFORCE_TLS" => "db.enforce_tls".into(),
                "DB_TIMEOUT_SECS" => "db.timeout_secs".into(),

                "UPLOADS_MAX_SIZE_BYTES" => "uploads.max_size_bytes".into(),
                "UPLOADS_ALLOWED_TYPES" => "uploads.allowed_types".into(),
                "UPLOADS_ROOT_DIR" => "uploads.root_dir".into(),

                "PAGINATION_PUBLIC_PAGE_SIZE" => "pagination.public_page_size".into(),
                "PAGINATION_ADMIN_PAGE_SIZE" => "pagination.admin_page_size".into(),

                _ => v.as_str().replace('_', ".").into(),
            }))
            // Environment variable aliases
            .merge(Env::raw().map(|v| match v.as_str() {
                "DATABASE_URL" => "db.primary.url".into(),
                _ => v.into(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::num::{NonZeroU32, NonZeroU64};

    #[test]
    fn env_aliases() {
        Jail::expect_with(|jail| {
            jail.set_env("DATABASE_URL", "postgres://localhost/inkcap");

            jail.set_env("INKCAP_DB_PRIMARY_MIN_IDLE", "2");
            jail.set_env("INKCAP_DB_PRIMARY_POOL_SIZE", "12");

            jail.set_env("INKCAP_DB_REPLICA_URL", "postgres://replica/inkcap");
            jail.set_env("INKCAP_DB_REPLICA_POOL_SIZE", "4");

            jail.set_env("INKCAP_DB_ENFORCE_TLS", "false");
            jail.set_env("INKCAP_DB_TIMEOUT_SECS", "30");

            jail.set_env("INKCAP_UPLOADS_MAX_SIZE_BYTES", "1048576");
            jail.set_env("INKCAP_PAGINATION_PUBLIC_PAGE_SIZE", "9");

            let config: App = App::figment().extract()?;
            assert_eq!(config.db.primary.url.as_str(), "postgres://localhost/inkcap");
            assert_eq!(
                config.db.primary.min_idle,
                Some(NonZeroU32::new(2).unwrap())
            );
            assert_eq!(config.db.primary.pool_size, NonZeroU32::new(12).unwrap());

            let replica = config.db.replica.as_ref().unwrap();
            assert_eq!(replica.url.as_str(), "postgres://replica/inkcap");
            assert_eq!(replica.pool_size, NonZeroU32::new(4).unwrap());

            assert!(!config.db.enforce_tls);
            assert_eq!(config.db.timeout_secs, NonZeroU64::new(30).unwrap());

            assert_eq!(config.uploads.max_size_bytes, 1_048_576);
            assert_eq!(config.pagination.public_page_size, 9);
            Ok(())
        });
    }

    #[test]
    fn defaults_apply_without_optional_sections() {
        Jail::expect_with(|jail| {
            jail.set_env("DATABASE_URL", "postgres://localhost/inkcap");

            let config: App = App::figment().extract()?;
            assert_eq!(config.uploads.max_size_bytes, 2 * 1024 * 1024);
            assert_eq!(config.pagination.public_page_size, 6);
            assert_eq!(config.pagination.admin_page_size, 10);
            Ok(())
        });
    }
}
