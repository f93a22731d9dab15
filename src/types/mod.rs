pub mod id;

pub use id::{CategoryId, CommentId, PostId, TagId, UserId};
