//! `define_port_error!`: adapter error enums that know their domain mapping.
//!
//! Each variant names the [`ErrorCode`](crate::domain::ErrorCode) it surfaces
//! as and its display message:
//!
//! ```text
//! Connection { message: String } => ServiceUnavailable, "offline: {message}",
//! ```
//!
//! The macro derives `thiserror::Error`, adds a snake_case constructor per
//! variant (`Error::connection("text")`, fields take `impl Into<T>`), a
//! `code()` accessor, and `into_domain()` which turns the failure into a
//! domain [`Error`](crate::domain::Error) carrying the display message.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            #[doc = "Build [`Self::" $variant "`]."]
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        ::paste::paste! {
            #[doc = "Build [`Self::" $variant "`]."]
            pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                Self::$variant { $($field: $field.into()),* }
            }
        }
    };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )?
                    => $code:ident, $message:literal
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*

            /// Domain error code this failure surfaces as.
            #[must_use]
            pub const fn code(&self) -> $crate::domain::ErrorCode {
                match self {
                    $( Self::$variant { .. } => $crate::domain::ErrorCode::$code, )*
                }
            }

            /// Domain error with this failure's code and display message.
            #[must_use]
            pub fn into_domain(self) -> $crate::domain::Error {
                $crate::domain::Error::new(self.code(), self.to_string())
            }
        }
    };
}

pub(crate) use define_port_error;
