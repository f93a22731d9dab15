use thiserror::Error;

mod app;
mod database;
mod uploads;

pub use app::App;
pub use database::{Database, DbPoolConfig};
pub use uploads::{Pagination, Uploads};

#[derive(Debug, Error)]
#[error("Failed to load configuration")]
pub struct ParseError;
