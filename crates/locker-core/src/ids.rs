//! Platform snowflake ids.
//!
//! Each id is a transparent `u64` so snapshot maps serialize as
//! `{"<id>": <count>}`.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake_id!(
    /// Community space (guild) id.
    GuildId
);
snowflake_id!(
    /// Text channel id.
    ChannelId
);
snowflake_id!(
    /// Member or bot account id.
    UserId
);
snowflake_id!(
    /// Posted message id.
    MessageId
);

impl ChannelId {
    /// Channel reference syntax rendered as a link by chat clients.
    pub fn mention(self) -> String {
        format!("<#{}>", self.0)
    }
}

impl UserId {
    /// Member reference syntax that pings the member.
    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }
}
