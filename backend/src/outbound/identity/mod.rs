//! Identity service outbound adapter.
//!
//! A thin HTTP implementation of the `IdentityDirectory` port. Circuit
//! breaking and the placeholder fallback live in the domain resolver.

mod http_directory;

pub use http_directory::{HttpIdentityDirectory, IdentityClientError, SELF_PATH};
