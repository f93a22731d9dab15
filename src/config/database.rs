use serde::Deserialize;
use std::num::{NonZeroU32, NonZeroU64};

use crate::util::Sensitive;

#[derive(Debug, Deserialize)]
pub struct Database {
    /// Writable primary database.
    pub primary: DbPoolConfig,
    /// A read-only replica used for serving reads without touching
    /// the primary.
    #[serde(default)]
    pub replica: Option<DbPoolConfig>,
    /// Forces all database connections to be encrypted with TLS
    /// (if possible).
    ///
    /// **Environment variables**:
    /// - `INKCAP_DB_ENFORCE_TLS`
    #[serde(default = "DbPoolConfig::default_enforce_tls")]
    pub enforce_tls: bool,
    /// How long to wait for the database to acknowledge or establish
    /// a connection before giving up.
    ///
    /// **Environment variables**:
    /// - `INKCAP_DB_TIMEOUT_SECS`
    #[serde(default = "DbPoolConfig::default_pool_timeout_secs")]
    pub timeout_secs: NonZeroU64,
}

/// Configuration for connecting to one Postgres database.
#[derive(Debug, Deserialize)]
pub struct DbPoolConfig {
    /// Minimum idle connections kept around so a burst of requests
    /// does not pay the connection setup cost.
    ///
    /// **Environment variables**:
    /// - `INKCAP_DB_PRIMARY_MIN_IDLE`
    /// - `INKCAP_DB_REPLICA_MIN_IDLE`
    #[serde(default)]
    pub min_idle: Option<NonZeroU32>,
    /// Maximum pool size.
    ///
    /// **Environment variables**:
    /// - `INKCAP_DB_PRIMARY_POOL_SIZE`
    /// - `INKCAP_DB_REPLICA_POOL_SIZE`
    #[serde(default = "DbPoolConfig::default_pool_size")]
    pub pool_size: NonZeroU32,
    /// Connection URL for the Postgres database.
    ///
    /// **Environment variables**:
    /// - `INKCAP_DB_PRIMARY_URL` or `DATABASE_URL`
    /// - `INKCAP_DB_REPLICA_URL`
    pub url: Sensitive<String>,
}

impl DbPoolConfig {
    const DEFAULT_POOL_SIZE: u32 = 5;
    const DEFAULT_POOL_TIMEOUT_SECS: u64 = 5;

    // Required by serde
    const fn default_pool_size() -> NonZeroU32 {
        match NonZeroU32::new(Self::DEFAULT_POOL_SIZE) {
            Some(n) => n,
            None => panic!("DEFAULT_POOL_SIZE is accidentally set to 0"),
        }
    }

    const fn default_pool_timeout_secs() -> NonZeroU64 {
        match NonZeroU64::new(Self::DEFAULT_POOL_TIMEOUT_SECS) {
            Some(n) => n,
            None => panic!("DEFAULT_POOL_TIMEOUT_SECS is accidentally set to 0"),
        }
    }

    const fn default_enforce_tls() -> bool {
        true
    }
}
