//! Display/FromStr for string-backed domain enums
//!
//! Enums such as [`EventStatus`](crate::EventStatus) and
//! [`WindowBoundaryPolicy`](crate::WindowBoundaryPolicy) travel through
//! configuration files, SQLite columns and the provider wire format as plain
//! strings.
//!
//! ```rust
//! use eventsync_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum LetterState {
//!     Pending,
//!     Resubmitted,
//! }
//!
//! impl_domain_status_conversions!(LetterState {
//!     Pending => "pending",
//!     Resubmitted => "resubmitted",
//! });
//!
//! assert_eq!("PENDING".parse::<LetterState>().unwrap(), LetterState::Pending);
//! ```

/// Implements `Display` (canonical lowercase form) and case-insensitive
/// `FromStr` for a fieldless enum.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
