pub mod figment;
pub mod sensitive;
pub mod slug;
pub mod validation;

pub use sensitive::Sensitive;
pub use slug::slugify;
pub use validation::ValidationError;
