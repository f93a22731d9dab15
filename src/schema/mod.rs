pub mod category;
pub mod comment;
pub mod post;
pub mod post_like;
pub mod tag;
pub mod user;

pub use category::Category;
pub use comment::Comment;
pub use post::Post;
pub use post_like::PostLike;
pub use tag::Tag;
pub use user::User;
