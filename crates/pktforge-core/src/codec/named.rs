//! Open enumerations of protocol codes.
//!
//! A named number is a transparent newtype over its wire code. Well-known
//! codes get associated constants and a display name; any other code is
//! still a valid value, so new codes never need a code change to decode.

/// Declare a named-number newtype.
///
/// ```
/// use pktforge_core::named_number;
///
/// named_number! {
///     /// Demo codes.
///     pub struct Colour(u8) {
///         RED = 1 => "red",
///         BLUE = 2 => "blue",
///     }
/// }
///
/// assert_eq!(Colour::RED.name(), "red");
/// assert_eq!(Colour(9).name(), "unknown");
/// assert_eq!(Colour::BLUE.to_string(), "2 (blue)");
/// ```
#[macro_export]
macro_rules! named_number {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($repr:ty) {
            $( $(#[$cmeta:meta])* $konst:ident = $value:expr => $label:expr, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $repr);

        #[allow(dead_code)]
        impl $name {
            $( $(#[$cmeta])* pub const $konst: $name = $name($value); )*

            pub const fn value(self) -> $repr {
                self.0
            }

            /// Display name for well-known codes.
            pub fn known_name(self) -> Option<&'static str> {
                $( if self.0 == $value { return Some($label); } )*
                None
            }

            pub fn name(self) -> &'static str {
                self.known_name().unwrap_or("unknown")
            }
        }

        impl From<$repr> for $name {
            fn from(value: $repr) -> Self {
                $name(value)
            }
        }

        impl From<$name> for $repr {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} ({})", self.0, self.name())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    named_number! {
        pub struct Demo(u16) {
            ONE = 1 => "one",
            BIG = 0x8000 => "big",
        }
    }

    #[test]
    fn known_and_unknown_codes() {
        assert_eq!(Demo::ONE.known_name(), Some("one"));
        assert_eq!(Demo(7).known_name(), None);
        assert_eq!(Demo::from(0x8000u16), Demo::BIG);
        assert_eq!(u16::from(Demo::BIG), 0x8000);
        assert_eq!(Demo(7).to_string(), "7 (unknown)");
    }

    #[test]
    fn serializes_as_bare_code() {
        assert_eq!(serde_json::to_value(Demo::ONE).unwrap(), serde_json::json!(1));
    }
}
