use std::fmt::Display;
use uuid::Uuid;

macro_rules! ids {
    { $( $Ident:ident, )* } => {$(
        #[derive(
            Debug, serde::Deserialize, serde::Serialize, Clone, Copy,
            PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $Ident(pub Uuid);

        impl $Ident {
            /// Generates a fresh random identifier.
            ///
            /// All identifiers are random UUIDs, never sequential, so
            /// they leak nothing about insertion order or row counts.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl From<Uuid> for $Ident {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl Display for $Ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                Display::fmt(&self.0, f)
            }
        }
    )*};
}

ids! {
    UserId,
    PostId,
    CategoryId,
    TagId,
    CommentId,
}
