use serde::{Deserialize, Serialize};

use super::document::ValidationError;

/// String-backed enum: the literal is both the serde name and the
/// `as_str`/`FromStr`/`Display` form.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| ValidationError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    })
            }
        }
    };
}

str_enum!(ExchangeRole {
    Reader => "reader",
    Assistant => "assistant",
});

str_enum!(ExchangeOutcome {
    Answered => "answered",
    Refused => "refused",
    Failed => "failed",
});
