//! UUID-backed identifiers for catalogue entities.

/// Declare a `Copy` newtype over [`uuid::Uuid`] that serialises as a string.
macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Access the inner UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Parse a path or payload identifier.
            ///
            /// Unparseable input names nothing that could exist, so it maps
            /// to `NotFound` rather than a validation failure.
            pub fn parse_existing(raw: &str) -> Result<Self, $crate::domain::Error> {
                raw.trim().parse().map_err(|_| {
                    $crate::domain::Error::not_found(format!(
                        concat!($label, " with id {} not found"),
                        raw.trim()
                    ))
                })
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_identifier!(
    /// Identifier of a course.
    CourseId,
    "Course"
);

uuid_identifier!(
    /// Identifier of a category.
    CategoryId,
    "Category"
);
