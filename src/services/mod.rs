pub mod categories;
pub mod comments;
pub mod error;
pub mod posts;
pub mod stats;
pub mod tags;

pub use error::{Error, Result};
