use nanoid::nanoid;
use serde::{Deserialize, Serialize};

/// Generate a 12-character nanoid for entity IDs
pub fn generate_id() -> String {
    nanoid!(12)
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub const fn from_string(id: String) -> Self {
                Self(id)
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// User ID, issued by the platform's identity service (JWT `sub`)
    UserId
);

string_id!(
    /// Room ID (nanoid unless assigned by the caller)
    RoomId
);

string_id!(
    /// Owning event ID from the CRUD platform
    EventId
);

string_id!(
    /// Media stream ID announced by a browser client
    StreamId
);

impl RoomId {
    #[must_use]
    pub fn new() -> Self {
        Self(generate_id())
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}
