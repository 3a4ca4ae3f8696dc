//! Identifiers of objects owned by an account.

use serde::{Deserialize, Serialize};

macro_rules! ownership_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            #[inline]
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

ownership_id!(
    /// Reference to a post written by the account.
    PostId
);
ownership_id!(
    /// Reference to a comment written by the account.
    CommentId
);
ownership_id!(
    /// Reference to a bookmark held by the account.
    FavoriteId
);
